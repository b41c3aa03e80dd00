use crate::Result;
use std::env;

/// Steam Community login session, read once from the environment and handed
/// to the HTTP client explicitly. Nothing in the crate reads cookies from
/// ambient state after construction.
#[derive(Clone)]
pub struct Session {
    session_id: String,
    login_secure: String,
}

impl Session {
    /// Builds a session from `STEAM_SESSION_ID` and `STEAM_LOGIN_SECURE`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            session_id: env::var("STEAM_SESSION_ID")?,
            login_secure: env::var("STEAM_LOGIN_SECURE")?,
        })
    }

    pub fn new(session_id: impl Into<String>, login_secure: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            login_secure: login_secure.into(),
        }
    }

    /// The `sessionid` value, also sent as a query parameter by the
    /// crafting and selling endpoints.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Value for the `Cookie` header.
    pub fn cookie_header(&self) -> String {
        format!(
            "sessionid={}; steamLoginSecure={}",
            self.session_id, self.login_secure
        )
    }
}
