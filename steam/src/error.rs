use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No Steam session credentials are attached to this client")]
    MissingCredentials,

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode query string: {0}")]
    Query(#[from] serde_qs::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] env::VarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed page content: {0}")]
    PageFormat(String),
}
