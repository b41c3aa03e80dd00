use crate::endpoint::Endpoint;
use crate::listings::ListingHash;
use crate::schema::{
    BoosterCreationResponse, Inventory, MarketSearchResponse, OrderHistogram, PriceOverview,
    SellResponse,
};
use crate::session::Session;
use crate::{Error, Result};
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

const BASE_URL: &str = "https://steamcommunity.com";

/// App id of the Steam Community item space (trading cards, boosters, gems).
pub const COMMUNITY_APP_ID: u32 = 753;
/// Context id of the community item inventory.
pub const COMMUNITY_CONTEXT_ID: u32 = 6;

/// Steam wallet currency id used for price lookups; 3 is EUR.
const WALLET_CURRENCY_ID: u32 = 3;

/// Client for the Steam Community endpoints.
///
/// Requests succeed only on HTTP 200. Any other status is logged and
/// surfaces as `Ok(None)` so a stale cookie or a rate limit does not abort
/// a whole run, while transport and decoding problems stay hard errors.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Client without credentials; only the public market endpoints and
    /// public inventories will respond.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            session: None,
        }
    }

    /// Client that attaches the session cookie to every request.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
            ..Self::new()
        }
    }

    /// Points the client at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The attached session, or [`Error::MissingCredentials`].
    pub fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::MissingCredentials)
    }

    /// Loads the community inventory of a profile. Works without
    /// credentials for public inventories; the session cookie is attached
    /// when present.
    pub async fn fetch_inventory(&self, profile_id: &str) -> Result<Option<Inventory>> {
        let url = Url::parse(&format!(
            "{}/profiles/{}/inventory/json/{}/{}/",
            self.base_url, profile_id, COMMUNITY_APP_ID, COMMUNITY_CONTEXT_ID
        ))?;

        let inventory = self.get_json(url, None).await?;
        if inventory.is_none() {
            log::warn!("Inventory for profile {profile_id} could not be loaded");
        }
        Ok(inventory)
    }

    /// Converts owned gems into one booster pack for `app_id`. Single
    /// attempt; a 401 usually means the cookie went stale.
    pub async fn create_booster(&self, app_id: u32) -> Result<Option<BoosterCreationResponse>> {
        let session = self.session()?;
        let query = json!({
            "sessionid": session.session_id(),
            "appid": app_id.to_string(),
            "series": "1",
            "tradability_preference": "2",
        });

        let response = self
            .get_json(self.url(Endpoint::CreateBooster)?, Some(query))
            .await?;
        if response.is_none() {
            log::warn!("Creation of a booster pack failed (appID = {app_id})");
        }
        Ok(response)
    }

    /// Lists one unit of an owned asset on the market at `price_cents`,
    /// the amount the buyer will pay.
    pub async fn sell_item(
        &self,
        asset_id: &str,
        price_cents: u32,
    ) -> Result<Option<SellResponse>> {
        let session = self.session()?;
        let query = json!({
            "sessionid": session.session_id(),
            "appid": COMMUNITY_APP_ID.to_string(),
            "contextid": COMMUNITY_CONTEXT_ID.to_string(),
            "asset_id": asset_id,
            "amount": "1",
            "price": price_cents.to_string(),
        });

        let response = self
            .get_json(self.url(Endpoint::SellItem)?, Some(query))
            .await?;
        if response.is_none() {
            log::warn!("Asset {asset_id} could not be listed for {price_cents} cents");
        }
        Ok(response)
    }

    /// One page of the booster-pack market search, `count` rows starting
    /// at `start`.
    pub async fn fetch_search_page(
        &self,
        start: usize,
        count: usize,
    ) -> Result<Option<MarketSearchResponse>> {
        let query = json!({
            "appid": COMMUNITY_APP_ID,
            "category_753_item_class[]": "tag_item_class_5",
            "norender": 1,
            "start": start,
            "count": count,
        });

        self.get_json(self.url(Endpoint::MarketSearch)?, Some(query))
            .await
    }

    /// Price summary for one market listing in the wallet currency.
    pub async fn fetch_price_overview(
        &self,
        market_hash_name: &str,
    ) -> Result<Option<PriceOverview>> {
        let query = json!({
            "appid": COMMUNITY_APP_ID,
            "currency": WALLET_CURRENCY_ID,
            "market_hash_name": market_hash_name,
        });

        self.get_json(self.url(Endpoint::PriceOverview)?, Some(query))
            .await
    }

    /// Order book summary for an item name id (see
    /// [`fetch_item_nameid`](crate::fetch_item_nameid)).
    pub async fn fetch_order_histogram(&self, item_nameid: u64) -> Result<Option<OrderHistogram>> {
        let query = json!({
            "language": "english",
            "currency": WALLET_CURRENCY_ID,
            "item_nameid": item_nameid,
            "two_factor": 0,
        });

        self.get_json(self.url(Endpoint::OrderHistogram)?, Some(query))
            .await
    }

    /// Raw HTML of the market listing page for a hash.
    pub async fn fetch_listing_page(&self, listing_hash: &ListingHash) -> Result<Option<String>> {
        let mut url = self.url(Endpoint::Listings)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(listing_hash.as_str());

        self.get_text(url).await
    }

    /// Raw HTML of the booster creator page. Requires credentials; without
    /// them Steam serves a login page with no creator data on it.
    pub async fn fetch_booster_creator_page(&self) -> Result<Option<String>> {
        self.session()?;
        let page = self.get_text(self.url(Endpoint::BoosterCreator)?).await?;
        if page.is_none() {
            log::warn!("Booster creator page could not be loaded");
        }
        Ok(page)
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, endpoint))?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: Option<Value>,
    ) -> Result<Option<T>> {
        match self.get_response(url, query).await? {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    async fn get_text(&self, url: Url) -> Result<Option<String>> {
        match self.get_response(url, None).await? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }

    async fn get_response(
        &self,
        mut url: Url,
        query: Option<Value>,
    ) -> Result<Option<reqwest::Response>> {
        if let Some(query) = query {
            url.set_query(Some(&serde_qs::to_string(&query)?));
        }

        let mut request = self.client.get(url.clone());
        if let Some(session) = &self.session {
            request = request.header(COOKIE, session.cookie_header());
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::OK {
            Ok(Some(response))
        } else {
            log::warn!("Request to {} failed with status {status}", url.path());
            Ok(None)
        }
    }
}
