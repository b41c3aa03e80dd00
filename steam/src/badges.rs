use crate::http::HttpClient;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Opening of the JS call whose first argument lists every craftable badge.
const BOOSTER_DATA_MARKER: &str = "CBoosterCreatorPage.Init(";

/// Crafting details for one owned game, scraped from the booster creator
/// page.
#[derive(Debug, Clone)]
pub struct BadgeDetail {
    pub name: String,
    /// Gems required to craft one booster pack.
    pub gem_value: i64,
    /// Cooldown display time, present while crafting is unavailable.
    pub next_creation_time: Option<String>,
}

/// Raw creator entry as embedded in the page script. Unknown siblings such
/// as `series` are ignored.
#[derive(Deserialize, Debug)]
struct BoosterEntry {
    appid: u32,
    name: String,
    /// Gem cost, served stringly and not always numeric.
    price: String,
    #[serde(default)]
    unavailable: bool,
    available_at_time: Option<String>,
}

/// Badge creation details keyed by app id. An HTTP failure on the page
/// fetch yields an empty map; a page without creator data is an error.
pub async fn fetch_badge_details(client: &HttpClient) -> Result<BTreeMap<u32, BadgeDetail>> {
    match client.fetch_booster_creator_page().await? {
        Some(page) => parse_badge_creation_details(&page),
        None => Ok(BTreeMap::new()),
    }
}

fn parse_badge_creation_details(page: &str) -> Result<BTreeMap<u32, BadgeDetail>> {
    let mut details = BTreeMap::new();

    for entry in extract_booster_entries(page)? {
        let Ok(gem_value) = entry.price.parse() else {
            log::warn!(
                "Skipping badge entry for {} (appID = {}): unusable gem value {:?}",
                entry.name,
                entry.appid,
                entry.price
            );
            continue;
        };

        let next_creation_time = if entry.unavailable {
            entry.available_at_time
        } else {
            None
        };

        details.insert(
            entry.appid,
            BadgeDetail {
                name: entry.name,
                gem_value,
                next_creation_time,
            },
        );
    }

    Ok(details)
}

/// Pulls the JSON array passed to the creator init call. Game names may
/// contain brackets, so the scan has to be string-aware.
fn extract_booster_entries(page: &str) -> Result<Vec<BoosterEntry>> {
    let call = page
        .find(BOOSTER_DATA_MARKER)
        .map(|at| &page[at + BOOSTER_DATA_MARKER.len()..])
        .ok_or_else(|| Error::PageFormat("no booster creator data on page".into()))?;
    let open = call
        .find('[')
        .ok_or_else(|| Error::PageFormat("booster creator data has no array".into()))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (at, c) in call[open..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(serde_json::from_str(&call[open..=open + at])?);
                }
            }
            _ => {}
        }
    }

    Err(Error::PageFormat("unterminated booster creator data".into()))
}
