use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Community inventory snapshot (app 753, context 6) as served by the
/// legacy `inventory/json` endpoint. Amounts and ids are stringly typed on
/// the wire and kept that way.
#[derive(Deserialize, Debug)]
pub struct Inventory {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "rgInventory", deserialize_with = "map_or_empty")]
    pub assets: HashMap<String, InventoryAsset>,
    #[serde(rename = "rgDescriptions", deserialize_with = "map_or_empty")]
    pub descriptions: HashMap<String, AssetDescription>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct InventoryAsset {
    pub id: String,
    pub classid: String,
    pub instanceid: String,
    pub amount: String,
    pub pos: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssetDescription {
    pub appid: String,
    pub classid: String,
    pub instanceid: String,
    #[serde(default)]
    pub market_hash_name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub marketable: i32,
}

/// An empty inventory is served as `[]` where a populated one is an object,
/// so both shapes have to decode.
fn map_or_empty<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrSeq<T> {
        Map(HashMap<String, T>),
        Seq(#[allow(dead_code)] Vec<IgnoredAny>),
    }

    Ok(match MapOrSeq::deserialize(deserializer)? {
        MapOrSeq::Map(map) => map,
        MapOrSeq::Seq(_) => HashMap::new(),
    })
}

/// Payload of `/tradingcards/ajaxcreatebooster/`. Sibling fields such as
/// `tradable_goo_amount` flip between string and number depending on the
/// account, so only the stable ones are decoded.
#[derive(Deserialize, Debug)]
pub struct BoosterCreationResponse {
    pub purchase_result: Option<PurchaseResult>,
    /// Remaining gem balance after the craft, as served.
    pub goo_amount: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PurchaseResult {
    /// Asset id of the freshly crafted booster pack.
    pub communityitemid: Option<String>,
    pub appid: Option<u32>,
    pub purchaseid: Option<String>,
    pub success: Option<i64>,
}

/// Payload of `/market/sellitem/`.
#[derive(Deserialize, Debug)]
pub struct SellResponse {
    pub success: bool,
    #[serde(default)]
    pub requires_confirmation: i64,
}

/// One page of `/market/search/render/` results.
#[derive(Deserialize, Debug)]
pub struct MarketSearchResponse {
    pub success: bool,
    pub total_count: usize,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SearchResult {
    pub hash_name: String,
    /// Current lowest ask in minor currency units.
    pub sell_price: i64,
    #[serde(default)]
    pub sell_listings: i64,
}

/// Payload of `/market/priceoverview/`. Prices are display strings in the
/// requested wallet currency, e.g. `"0,42€"`.
#[derive(Deserialize, Debug)]
pub struct PriceOverview {
    pub success: bool,
    pub lowest_price: Option<String>,
    pub median_price: Option<String>,
    pub volume: Option<String>,
}

/// Order book summary from `/market/itemordershistogram`.
#[derive(Deserialize, Debug)]
pub struct OrderHistogram {
    pub success: i64,
    pub highest_buy_order: Option<String>,
    pub lowest_sell_order: Option<String>,
}

impl OrderHistogram {
    /// Highest standing buy order in minor units, when present and numeric.
    pub fn highest_buy_order_cents(&self) -> Option<i64> {
        self.highest_buy_order.as_deref().and_then(|v| v.parse().ok())
    }

    /// Lowest standing sell order in minor units, when present and numeric.
    pub fn lowest_sell_order_cents(&self) -> Option<i64> {
        self.lowest_sell_order.as_deref().and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_inventory_is_served_as_arrays() {
        let inventory: Inventory = serde_json::from_value(json!({
            "success": false,
            "rgInventory": [],
            "rgDescriptions": [],
        }))
        .unwrap();

        assert!(inventory.assets.is_empty());
        assert!(inventory.descriptions.is_empty());
    }

    #[test]
    fn booster_creation_payload_decodes() {
        let response: BoosterCreationResponse = serde_json::from_value(json!({
            "purchase_result": {
                "communityitemid": "21470000000000000",
                "appid": 685400,
                "purchaseid": "22120000000000000",
                "success": 1,
                "rwgrsn": -2
            },
            "goo_amount": "22793",
            "tradable_goo_amount": "22793",
            "untradable_goo_amount": 0
        }))
        .unwrap();

        let result = response.purchase_result.unwrap();
        assert_eq!(result.communityitemid.as_deref(), Some("21470000000000000"));
        assert_eq!(result.appid, Some(685400));
        assert_eq!(response.goo_amount.as_deref(), Some("22793"));
    }

    #[test]
    fn histogram_orders_parse_to_cents() {
        let histogram: OrderHistogram = serde_json::from_value(json!({
            "success": 1,
            "highest_buy_order": "127",
            "lowest_sell_order": "143"
        }))
        .unwrap();

        assert_eq!(histogram.highest_buy_order_cents(), Some(127));
        assert_eq!(histogram.lowest_sell_order_cents(), Some(143));

        let empty: OrderHistogram = serde_json::from_value(json!({ "success": 1 })).unwrap();
        assert_eq!(empty.highest_buy_order_cents(), None);
    }
}
