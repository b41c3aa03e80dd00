use crate::badges::{fetch_badge_details, BadgeDetail};
use crate::gems::{get_gem_price, GemPriceOptions};
use crate::http::HttpClient;
use crate::listings::{
    filter_dubious_listings, load_all_listings, update_all_listings, ListingCatalog, ListingHash,
    DEFAULT_LISTINGS_CACHE,
};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// How a badge was tied to a market listing, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeMatch {
    /// The hash's leading app id equals the badge's app id.
    ById(ListingHash),
    /// Fallback: the hash's derived name equals the badge name exactly.
    ByName(ListingHash),
    Unmatched,
}

impl BadgeMatch {
    pub fn listing_hash(&self) -> Option<&ListingHash> {
        match self {
            BadgeMatch::ById(hash) | BadgeMatch::ByName(hash) => Some(hash),
            BadgeMatch::Unmatched => None,
        }
    }
}

/// One row of the arbitrage table: crafting cost against the market ask.
#[derive(Debug, Clone)]
pub struct AggregatedBadge {
    pub name: String,
    pub listing_hash: ListingHash,
    /// Gems required to craft the pack.
    pub gem_amount: i64,
    /// Cost of those gems in major currency units.
    pub gem_price: f64,
    /// Current lowest ask for the pack in major currency units.
    pub sell_price: f64,
    pub next_creation_time: Option<String>,
}

/// Knobs for [`load_aggregated_badge_data`].
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Re-walk the search pages even when a cache exists.
    pub refresh_listings: bool,
    pub listings_cache: PathBuf,
    pub gem_price: GemPriceOptions,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            refresh_listings: false,
            listings_cache: PathBuf::from(DEFAULT_LISTINGS_CACHE),
            gem_price: GemPriceOptions::default(),
        }
    }
}

/// Ties each badge to a listing hash. Exact app-id matches win over exact
/// name matches; everything else is `Unmatched`. Both lookup tables are
/// built last-write-wins in catalog order, so a duplicate derived id or
/// name resolves to the lexicographically last hash.
pub fn match_badges_with_listings(
    badges: &BTreeMap<u32, BadgeDetail>,
    listings: &ListingCatalog,
) -> BTreeMap<u32, BadgeMatch> {
    let mut by_app_id: HashMap<u32, &ListingHash> = HashMap::new();
    let mut by_app_name: HashMap<&str, &ListingHash> = HashMap::new();

    for hash in listings.keys() {
        if let Some(app_id) = hash.app_id() {
            by_app_id.insert(app_id, hash);
        }
        by_app_name.insert(hash.app_name(), hash);
    }

    let mut matches = BTreeMap::new();
    for (&app_id, detail) in badges {
        let outcome = if let Some(&hash) = by_app_id.get(&app_id) {
            BadgeMatch::ById(hash.clone())
        } else if let Some(&hash) = by_app_name.get(detail.name.as_str()) {
            log::info!("Matched {} (appID = {app_id}) by name instead of id", detail.name);
            BadgeMatch::ByName(hash.clone())
        } else {
            log::info!("No listing matches {} (appID = {app_id})", detail.name);
            BadgeMatch::Unmatched
        };
        matches.insert(app_id, outcome);
    }

    matches
}

/// Builds the arbitrage table from matched badges. Unmatched badges and
/// matches whose hash has no catalog row are skipped, not reported.
pub fn aggregate_badge_data(
    badges: &BTreeMap<u32, BadgeDetail>,
    matches: &BTreeMap<u32, BadgeMatch>,
    listings: &ListingCatalog,
    gem_unit_price: f64,
) -> BTreeMap<u32, AggregatedBadge> {
    let mut aggregated = BTreeMap::new();

    for (&app_id, detail) in badges {
        let Some(hash) = matches.get(&app_id).and_then(BadgeMatch::listing_hash) else {
            continue;
        };
        let Some(listing) = listings.get(hash) else {
            continue;
        };

        aggregated.insert(
            app_id,
            AggregatedBadge {
                name: detail.name.clone(),
                listing_hash: hash.clone(),
                gem_amount: detail.gem_value,
                gem_price: detail.gem_value as f64 * gem_unit_price,
                sell_price: listing.sell_price as f64 / 100.0,
                next_creation_time: detail.next_creation_time.clone(),
            },
        );
    }

    aggregated
}

/// End-to-end arbitrage table: badge details, the filtered listing
/// catalog, matching and the gem price, in that order. A missing gem price
/// or an empty badge table short-circuits to an empty result.
pub async fn load_aggregated_badge_data(
    client: &HttpClient,
    config: &AggregationConfig,
) -> Result<BTreeMap<u32, AggregatedBadge>> {
    let badges = fetch_badge_details(client).await?;
    if badges.is_empty() {
        log::warn!("No craftable badges to aggregate");
        return Ok(BTreeMap::new());
    }

    let listings = if config.refresh_listings || !config.listings_cache.exists() {
        update_all_listings(client, &config.listings_cache).await?
    } else {
        load_all_listings(&config.listings_cache)?
    };
    let listings = filter_dubious_listings(listings);

    let matches = match_badges_with_listings(&badges, &listings);

    let Some(gem_unit_price) = get_gem_price(client, config.gem_price).await? else {
        log::warn!("Gem price unavailable, skipping aggregation");
        return Ok(BTreeMap::new());
    };

    Ok(aggregate_badge_data(&badges, &matches, &listings, gem_unit_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::Listing;

    fn badge(name: &str, gem_value: i64) -> BadgeDetail {
        BadgeDetail {
            name: name.to_string(),
            gem_value,
            next_creation_time: None,
        }
    }

    fn catalog(entries: &[(&str, i64)]) -> ListingCatalog {
        entries
            .iter()
            .map(|&(hash, sell_price)| {
                (
                    ListingHash::from(hash),
                    Listing {
                        sell_listings: 1,
                        sell_price,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn id_matches_win_over_name_matches() {
        let badges = BTreeMap::from([(10, badge("A", 100))]);
        // "99-A" would match by name, but "10-Foo" carries the right id.
        let listings = catalog(&[("10-Foo Booster Pack", 100), ("99-A Booster Pack", 100)]);

        let matches = match_badges_with_listings(&badges, &listings);
        assert_eq!(
            matches[&10],
            BadgeMatch::ById(ListingHash::from("10-Foo Booster Pack"))
        );
    }

    #[test]
    fn name_matching_is_the_fallback() {
        let badges = BTreeMap::from([(42, badge("Starbound", 1000))]);
        let listings = catalog(&[("211820-Starbound Booster Pack", 46)]);

        let matches = match_badges_with_listings(&badges, &listings);
        assert_eq!(
            matches[&42],
            BadgeMatch::ByName(ListingHash::from("211820-Starbound Booster Pack"))
        );
    }

    #[test]
    fn duplicate_derived_ids_resolve_to_the_last_catalog_row() {
        let badges = BTreeMap::from([(10, badge("Whatever", 100))]);
        let listings = catalog(&[("10-A Booster Pack", 1), ("10-B Booster Pack", 2)]);

        let matches = match_badges_with_listings(&badges, &listings);
        assert_eq!(
            matches[&10],
            BadgeMatch::ById(ListingHash::from("10-B Booster Pack"))
        );
    }

    #[test]
    fn unmatched_badges_are_reported_and_skipped_by_aggregation() {
        let badges = BTreeMap::from([(77, badge("Nowhere To Be Found", 500))]);
        let listings = catalog(&[("10-A Booster Pack", 100)]);

        let matches = match_badges_with_listings(&badges, &listings);
        assert_eq!(matches[&77], BadgeMatch::Unmatched);

        let aggregated = aggregate_badge_data(&badges, &matches, &listings, 0.01);
        assert!(!aggregated.contains_key(&77));
    }

    #[test]
    fn matches_without_a_catalog_row_are_skipped() {
        let badges = BTreeMap::from([(10, badge("A", 100))]);
        let listings = catalog(&[("10-A Booster Pack", 100)]);
        let matches = BTreeMap::from([(
            10,
            BadgeMatch::ById(ListingHash::from("10-Gone Booster Pack")),
        )]);

        let aggregated = aggregate_badge_data(&badges, &matches, &listings, 0.01);
        assert!(aggregated.is_empty());
    }

    #[test]
    fn aggregation_arithmetic_scales_gems_and_cents() {
        let badges = BTreeMap::from([(5, badge("X", 100))]);
        let listings = catalog(&[("5-X Booster Pack", 250)]);

        let matches = match_badges_with_listings(&badges, &listings);
        let aggregated = aggregate_badge_data(&badges, &matches, &listings, 0.02);

        let row = &aggregated[&5];
        assert_eq!(row.gem_amount, 100);
        assert!((row.gem_price - 2.0).abs() < 1e-9);
        assert!((row.sell_price - 2.5).abs() < 1e-9);
    }

    #[test]
    fn a_matched_badge_produces_one_full_row() {
        let badges = BTreeMap::from([(10, badge("A", 5))]);
        let listings = catalog(&[("10-A", 100)]);

        let matches = match_badges_with_listings(&badges, &listings);
        let aggregated = aggregate_badge_data(&badges, &matches, &listings, 0.1);

        let row = &aggregated[&10];
        assert_eq!(row.name, "A");
        assert_eq!(row.listing_hash, ListingHash::from("10-A"));
        assert_eq!(row.gem_amount, 5);
        assert!((row.gem_price - 0.5).abs() < 1e-9);
        assert!((row.sell_price - 1.0).abs() < 1e-9);
        assert_eq!(row.next_creation_time, None);
    }

    mod pipeline {
        use super::*;
        use crate::session::Session;
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client(server: &MockServer) -> HttpClient {
            HttpClient::with_session(Session::new("testsession", "testsecret"))
                .with_base_url(server.uri())
        }

        fn config(cache: PathBuf) -> AggregationConfig {
            AggregationConfig {
                listings_cache: cache,
                ..AggregationConfig::default()
            }
        }

        fn creator_page(entries: serde_json::Value) -> String {
            format!(
                r#"<html><script>CBoosterCreatorPage.Init({entries}, "22793", "22793", "0");</script></html>"#
            )
        }

        #[tokio::test]
        async fn builds_the_arbitrage_table_end_to_end() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/tradingcards/boostercreator/"))
                .respond_with(ResponseTemplate::new(200).set_body_string(creator_page(
                    serde_json::json!([
                        { "appid": 10, "name": "A", "series": 1, "price": "5" },
                        { "appid": 77, "name": "Nowhere To Be Found", "series": 1, "price": "500" }
                    ]),
                )))
                .mount(&server)
                .await;
            // The category row shares badge 77's id; filtering must drop it
            // before matching can pick it up.
            Mock::given(method("GET"))
                .and(path("/market/search/render/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "success": true,
                    "total_count": 2,
                    "results": [
                        { "hash_name": "10-A", "sell_price": 100, "sell_listings": 3 },
                        {
                            "hash_name": "77-#Economy_TradingCards_Type_GameType",
                            "sell_price": 50,
                            "sell_listings": 1
                        }
                    ]
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/market/priceoverview/"))
                .and(query_param("market_hash_name", "753-Sack of Gems"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "success": true,
                    "lowest_price": "100,00€"
                })))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path().join("listings.json"));

            let table = load_aggregated_badge_data(&client(&server), &config)
                .await
                .unwrap();

            assert_eq!(table.len(), 1);
            assert!(!table.contains_key(&77));

            let row = &table[&10];
            assert_eq!(row.name, "A");
            assert_eq!(row.listing_hash, ListingHash::from("10-A"));
            assert_eq!(row.gem_amount, 5);
            assert!((row.gem_price - 0.5).abs() < 1e-9);
            assert!((row.sell_price - 1.0).abs() < 1e-9);
        }

        #[tokio::test]
        async fn a_failed_creator_page_yields_an_empty_table() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/tradingcards/boostercreator/"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path().join("listings.json"));

            let table = load_aggregated_badge_data(&client(&server), &config)
                .await
                .unwrap();

            assert!(table.is_empty());
            // Returned before the search walk, so no cache file appeared.
            assert!(!config.listings_cache.exists());
        }

        #[tokio::test]
        async fn a_missing_gem_price_yields_an_empty_table() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/tradingcards/boostercreator/"))
                .respond_with(ResponseTemplate::new(200).set_body_string(creator_page(
                    serde_json::json!([
                        { "appid": 10, "name": "A", "series": 1, "price": "5" }
                    ]),
                )))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/market/search/render/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "success": true,
                    "total_count": 1,
                    "results": [
                        { "hash_name": "10-A", "sell_price": 100, "sell_listings": 3 }
                    ]
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/market/priceoverview/"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path().join("listings.json"));

            let table = load_aggregated_badge_data(&client(&server), &config)
                .await
                .unwrap();

            assert!(table.is_empty());
            // The walk ran and cached its page before the price lookup failed.
            assert!(config.listings_cache.exists());
        }
    }
}
