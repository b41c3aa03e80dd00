use strum_macros::{Display, EnumString};

/// Paths on the Steam Community host used by the client.
#[derive(Debug, Clone, Copy, EnumString, Display)]
pub(crate) enum Endpoint {
    #[strum(serialize = "/tradingcards/ajaxcreatebooster/")]
    CreateBooster,
    #[strum(serialize = "/tradingcards/boostercreator/")]
    BoosterCreator,
    #[strum(serialize = "/market/sellitem/")]
    SellItem,
    #[strum(serialize = "/market/search/render/")]
    MarketSearch,
    #[strum(serialize = "/market/priceoverview/")]
    PriceOverview,
    #[strum(serialize = "/market/itemordershistogram")]
    OrderHistogram,
    #[strum(serialize = "/market/listings/753/")]
    Listings,
}
