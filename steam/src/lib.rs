//! Client for the Steam Community market and trading-card endpoints, plus
//! the arbitrage table built on top of them: what each owned badge costs to
//! craft in gems versus what its booster pack currently sells for.

mod arbitrage;
mod badges;
mod endpoint;
mod error;
mod gems;
mod http;
mod inventory;
mod listings;
mod schema;
mod session;

pub use arbitrage::{
    aggregate_badge_data, load_aggregated_badge_data, match_badges_with_listings, AggregatedBadge,
    AggregationConfig, BadgeMatch,
};
pub use badges::{fetch_badge_details, BadgeDetail};
pub use error::Error;
pub use gems::{
    get_gem_price, parse_price_text, GemPriceOptions, GEMS_PER_SACK, SACK_OF_GEMS_HASH,
};
pub use http::{HttpClient, COMMUNITY_APP_ID, COMMUNITY_CONTEXT_ID};
pub use inventory::retrieve_asset_id;
pub use listings::{
    fetch_item_nameid, fetch_item_nameid_batch, filter_dubious_listings, load_all_listings,
    update_all_listings, Listing, ListingCatalog, ListingHash, DEFAULT_LISTINGS_CACHE,
};
pub use schema::{
    AssetDescription, BoosterCreationResponse, Inventory, InventoryAsset, MarketSearchResponse,
    OrderHistogram, PriceOverview, PurchaseResult, SearchResult, SellResponse,
};
pub use session::Session;

pub type Result<T> = std::result::Result<T, Error>;
