use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use steam::{
    fetch_item_nameid_batch, load_aggregated_badge_data, retrieve_asset_id, AggregatedBadge,
    AggregationConfig, GemPriceOptions, HttpClient, ListingHash, Session,
};

/// Cut the market takes out of a sale; the buyer pays the ask, the seller
/// receives ask / (1 + fee).
const MARKET_FEE: f64 = 0.15;

/// How many of the best-ranked rows get an order-book follow-up.
const ORDER_BOOK_SAMPLES: usize = 5;

pub(crate) struct Trader {
    http: HttpClient,
    profile_id: String,
    config: AggregationConfig,
    craft_app_id: Option<u32>,
}

impl Trader {
    pub fn new() -> Result<Self> {
        let http = match Session::from_env() {
            Ok(session) => HttpClient::with_session(session),
            Err(e) => {
                warn!("No Steam session in the environment ({e}); running unauthenticated");
                HttpClient::new()
            }
        };

        let config = AggregationConfig {
            refresh_listings: env_flag("REFRESH_LISTINGS"),
            listings_cache: env::var("LISTINGS_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(steam::DEFAULT_LISTINGS_CACHE)),
            gem_price: GemPriceOptions {
                enforced_sack_price: env_number("SACK_OF_GEMS_PRICE"),
                minimum_sack_price: env_number("MIN_SACK_OF_GEMS_PRICE"),
            },
        };

        Ok(Self {
            http,
            profile_id: env::var("STEAM_PROFILE_ID").context("STEAM_PROFILE_ID is not set")?,
            config,
            craft_app_id: env::var("CRAFT_APP_ID").ok().and_then(|v| v.parse().ok()),
        })
    }

    pub async fn run(&self) -> Result<()> {
        let badge_data = load_aggregated_badge_data(&self.http, &self.config).await?;
        if badge_data.is_empty() {
            warn!("No aggregated badge data, nothing to analyze");
            return Ok(());
        }

        let ranked = rank_candidates(&badge_data);
        let profitable = ranked.iter().filter(|c| c.is_profitable()).count();
        info!(
            "{} badges have a matched listing, {profitable} look profitable after fees",
            ranked.len()
        );
        for candidate in &ranked {
            info!("{candidate}");
        }

        self.check_order_books(&ranked).await?;

        if let Some(app_id) = self.craft_app_id {
            self.craft_and_sell(app_id, &badge_data).await?;
        }

        Ok(())
    }

    /// Pulls the order book for the top-ranked rows and logs what an
    /// instant sell into the highest buy order would net.
    async fn check_order_books(&self, ranked: &[Candidate<'_>]) -> Result<()> {
        let top: Vec<ListingHash> = ranked
            .iter()
            .take(ORDER_BOOK_SAMPLES)
            .map(|candidate| candidate.badge.listing_hash.clone())
            .collect();
        let nameids = fetch_item_nameid_batch(&self.http, &top).await?;

        for candidate in ranked.iter().take(ORDER_BOOK_SAMPLES) {
            let Some(&nameid) = nameids.get(&candidate.badge.listing_hash) else {
                continue;
            };
            let Some(histogram) = self.http.fetch_order_histogram(nameid).await? else {
                continue;
            };
            let Some(bid_cents) = histogram.highest_buy_order_cents() else {
                continue;
            };

            let bid = bid_cents as f64 / 100.0;
            info!(
                "{}: highest buy order {bid:.2}, nets {:.2} against a craft cost of {:.2}",
                candidate.badge.listing_hash,
                bid / (1.0 + MARKET_FEE),
                candidate.badge.gem_price
            );
        }

        Ok(())
    }

    /// Crafts one booster for `app_id` and lists it at the aggregated ask.
    /// Each step is a single attempt; a refused step ends the chain early
    /// without failing the run.
    async fn craft_and_sell(
        &self,
        app_id: u32,
        badge_data: &BTreeMap<u32, AggregatedBadge>,
    ) -> Result<()> {
        let badge = badge_data
            .get(&app_id)
            .ok_or_else(|| anyhow!("appID {app_id} has no aggregated badge entry"))?;

        info!(
            "Crafting a booster for {} (appID = {app_id}, {} gems)",
            badge.name, badge.gem_amount
        );
        let Some(creation) = self.http.create_booster(app_id).await? else {
            return Ok(());
        };
        if let Some(goo) = &creation.goo_amount {
            info!("Crafted; {goo} gems left");
        }
        if let Some(item_id) = creation
            .purchase_result
            .as_ref()
            .and_then(|result| result.communityitemid.as_deref())
        {
            info!("New community item {item_id}");
        }

        let Some(inventory) = self.http.fetch_inventory(&self.profile_id).await? else {
            return Ok(());
        };
        let Some(asset_id) = retrieve_asset_id(&inventory, &badge.listing_hash) else {
            warn!("No inventory asset found for {}", badge.listing_hash);
            return Ok(());
        };

        let price_cents = (badge.sell_price * 100.0).round() as u32;
        info!(
            "Listing asset {asset_id} ({}) for {price_cents} cents",
            badge.listing_hash
        );
        if let Some(sale) = self.http.sell_item(&asset_id, price_cents).await? {
            info!(
                "Sell response: success = {}, requires confirmation = {}",
                sale.success, sale.requires_confirmation
            );
        }

        Ok(())
    }
}

fn rank_candidates(badge_data: &BTreeMap<u32, AggregatedBadge>) -> Vec<Candidate<'_>> {
    let mut candidates: Vec<_> = badge_data
        .iter()
        .map(|(&app_id, badge)| Candidate { app_id, badge })
        .collect();
    candidates.sort_by(|a, b| b.ratio().total_cmp(&a.ratio()));
    candidates
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_number(name: &str) -> Option<f64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

struct Candidate<'a> {
    app_id: u32,
    badge: &'a AggregatedBadge,
}

impl Candidate<'_> {
    /// Seller payout at the current ask, after the market's cut.
    fn net_sell_price(&self) -> f64 {
        self.badge.sell_price / (1.0 + MARKET_FEE)
    }

    fn is_profitable(&self) -> bool {
        self.net_sell_price() > self.badge.gem_price
    }

    fn ratio(&self) -> f64 {
        if self.badge.gem_price > 0.0 {
            self.net_sell_price() / self.badge.gem_price
        } else {
            f64::INFINITY
        }
    }
}

impl fmt::Display for Candidate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appID {:>7}  {:<40}  craft {:>6.2}  ask {:>6.2}  net {:>6.2}  x{:.2}",
            self.app_id,
            self.badge.name,
            self.badge.gem_price,
            self.badge.sell_price,
            self.net_sell_price(),
            self.ratio()
        )?;
        if let Some(time) = &self.badge.next_creation_time {
            write!(f, "  (next craft {time})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregated(name: &str, gem_price: f64, sell_price: f64) -> AggregatedBadge {
        AggregatedBadge {
            name: name.to_string(),
            listing_hash: ListingHash::from("10-A Booster Pack"),
            gem_amount: 1000,
            gem_price,
            sell_price,
            next_creation_time: None,
        }
    }

    #[test]
    fn profitability_accounts_for_the_market_fee() {
        let breakeven = aggregated("A", 1.0, 1.15);
        let candidate = Candidate {
            app_id: 10,
            badge: &breakeven,
        };
        assert!(!candidate.is_profitable());

        let good = aggregated("B", 1.0, 2.30);
        let candidate = Candidate {
            app_id: 10,
            badge: &good,
        };
        assert!(candidate.is_profitable());
        assert!((candidate.ratio() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_puts_the_best_ratio_first() {
        let a = aggregated("A", 1.0, 1.15);
        let b = aggregated("B", 1.0, 2.30);
        let badge_data = BTreeMap::from([(1, a), (2, b)]);

        let ranked = rank_candidates(&badge_data);
        assert_eq!(ranked[0].app_id, 2);
        assert_eq!(ranked[1].app_id, 1);
    }
}
