use crate::http::HttpClient;
use crate::Result;
use derive_more::{Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

/// Marker found in hashes that point at a whole trading-card category
/// instead of one game's booster pack. Such rows break app-name matching
/// and are filtered out of the catalog.
const DUBIOUS_MARKER: &str = "#Economy_TradingCards_";

/// Suffix booster-pack hashes carry after the game name.
const BOOSTER_SUFFIX: &str = " Booster Pack";

/// Opening of the JS call on a listing page whose first argument is the
/// item name id used by the order book endpoints.
const NAMEID_MARKER: &str = "Market_LoadOrderSpread(";

const SEARCH_PAGE_SIZE: usize = 100;

/// Pause between page fetches; the market endpoints rate-limit hard.
const PAGE_DELAY: Duration = Duration::from_millis(1500);

/// Default on-disk location of the listing catalog cache.
pub const DEFAULT_LISTINGS_CACHE: &str = "data/listings.json";

/// Composite market hash of a booster pack: `"<app id>-<name>"`. A few
/// rows carry a category suffix instead of a proper name, and some hashes
/// have no leading app id at all.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Display, From, Into, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ListingHash(String);

impl ListingHash {
    /// Leading app id, when the hash starts with one.
    pub fn app_id(&self) -> Option<u32> {
        self.0.split_once('-')?.0.parse().ok()
    }

    /// Name part of the hash: everything after the first `-`, minus the
    /// booster-pack suffix. Empty when the hash has no `-`.
    pub fn app_name(&self) -> &str {
        let name = self.0.split_once('-').map_or("", |(_, rest)| rest);
        name.strip_suffix(BOOSTER_SUFFIX).unwrap_or(name)
    }

    /// True for hashes that denote a trading-card category rather than a
    /// specific game's booster pack.
    pub fn is_dubious(&self) -> bool {
        self.0.contains(DUBIOUS_MARKER)
    }
}

impl From<&str> for ListingHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

/// Market state of one listing, prices in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub sell_listings: i64,
    pub sell_price: i64,
}

/// The booster-pack catalog, keyed by listing hash. Ordered so filtering
/// and lookup-table construction stay deterministic.
pub type ListingCatalog = BTreeMap<ListingHash, Listing>;

/// Walks every booster-pack search page into a fresh catalog and caches it
/// at `cache`. A failed page ends the walk with what was collected so far.
pub async fn update_all_listings(client: &HttpClient, cache: &Path) -> Result<ListingCatalog> {
    let mut catalog = ListingCatalog::new();
    let mut start = 0;

    loop {
        let Some(page) = client.fetch_search_page(start, SEARCH_PAGE_SIZE).await? else {
            break;
        };

        for result in page.results {
            catalog.insert(
                ListingHash::from(result.hash_name),
                Listing {
                    sell_listings: result.sell_listings,
                    sell_price: result.sell_price,
                },
            );
        }

        start += SEARCH_PAGE_SIZE;
        if start >= page.total_count {
            break;
        }
        sleep(PAGE_DELAY).await;
    }

    log::info!("Fetched {} booster pack listings", catalog.len());
    store_all_listings(&catalog, cache)?;
    Ok(catalog)
}

/// Reads the catalog cache written by [`update_all_listings`].
pub fn load_all_listings(cache: &Path) -> Result<ListingCatalog> {
    Ok(serde_json::from_str(&fs::read_to_string(cache)?)?)
}

fn store_all_listings(catalog: &ListingCatalog, cache: &Path) -> Result<()> {
    if let Some(parent) = cache.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(cache, serde_json::to_string(catalog)?)?;
    Ok(())
}

/// Drops category-style hashes from the catalog, preserving the order of
/// everything else.
pub fn filter_dubious_listings(catalog: ListingCatalog) -> ListingCatalog {
    let total = catalog.len();
    let filtered: ListingCatalog = catalog
        .into_iter()
        .filter(|(hash, _)| {
            if hash.is_dubious() {
                log::debug!("Omitting dubious listing hash: {hash}");
                false
            } else {
                true
            }
        })
        .collect();

    log::info!(
        "{} market listings kept, {} omitted for a dubious hash",
        filtered.len(),
        total - filtered.len()
    );
    filtered
}

/// Item name id for one listing: a single page fetch plus extraction, with
/// misses logged and returned as `None`.
pub async fn fetch_item_nameid(client: &HttpClient, hash: &ListingHash) -> Result<Option<u64>> {
    let Some(page) = client.fetch_listing_page(hash).await? else {
        return Ok(None);
    };

    let nameid = extract_item_nameid(&page);
    if nameid.is_none() {
        log::warn!("No item name id found on the listing page for {hash}");
    }
    Ok(nameid)
}

/// Sequential name-id lookup for a batch of hashes, keyed by hash. Misses
/// are simply absent from the result.
pub async fn fetch_item_nameid_batch(
    client: &HttpClient,
    hashes: &[ListingHash],
) -> Result<BTreeMap<ListingHash, u64>> {
    let mut nameids = BTreeMap::new();
    for hash in hashes {
        if let Some(nameid) = fetch_item_nameid(client, hash).await? {
            nameids.insert(hash.clone(), nameid);
        }
        sleep(PAGE_DELAY).await;
    }
    Ok(nameids)
}

fn extract_item_nameid(page: &str) -> Option<u64> {
    let call = &page[page.find(NAMEID_MARKER)? + NAMEID_MARKER.len()..];
    let args = &call[..call.find(')')?];
    args.trim().parse().ok()
}
