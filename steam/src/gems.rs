use crate::http::HttpClient;
use crate::Result;

/// Market hash of the sack-of-gems listing.
pub const SACK_OF_GEMS_HASH: &str = "753-Sack of Gems";

/// Gems contained in one sack.
pub const GEMS_PER_SACK: f64 = 1000.0;

/// Overrides for the sack-of-gems price source.
#[derive(Debug, Clone, Copy, Default)]
pub struct GemPriceOptions {
    /// Use this sack price instead of fetching one from the market.
    pub enforced_sack_price: Option<f64>,
    /// Floor applied to the effective sack price, guarding the arbitrage
    /// math against a momentarily aberrant listing.
    pub minimum_sack_price: Option<f64>,
}

/// Price of a single gem in major currency units, derived from the sack
/// listing. `None` when no usable price could be retrieved.
pub async fn get_gem_price(client: &HttpClient, options: GemPriceOptions) -> Result<Option<f64>> {
    let sack_price = match options.enforced_sack_price {
        Some(price) => Some(price),
        None => fetch_sack_price(client).await?,
    };

    Ok(sack_price.map(|price| {
        let floored = match options.minimum_sack_price {
            Some(minimum) => price.max(minimum),
            None => price,
        };
        floored / GEMS_PER_SACK
    }))
}

async fn fetch_sack_price(client: &HttpClient) -> Result<Option<f64>> {
    let Some(overview) = client.fetch_price_overview(SACK_OF_GEMS_HASH).await? else {
        return Ok(None);
    };

    let price = overview.lowest_price.as_deref().and_then(parse_price_text);
    if price.is_none() {
        log::warn!(
            "No usable price in the gem sack overview: {:?}",
            overview.lowest_price
        );
    }
    Ok(price)
}

/// Parses a display price such as `0,46€`, `$0.63` or `1.234,56€`. The
/// last separator is taken as the decimal mark; every other separator is a
/// grouping character and dropped.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: Vec<char> = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let last_separator = cleaned.iter().rposition(|c| *c == ',' || *c == '.');

    let mut normalized = String::with_capacity(cleaned.len());
    for (at, c) in cleaned.iter().enumerate() {
        match c {
            ',' | '.' => {
                if Some(at) == last_separator {
                    normalized.push('.');
                }
            }
            digit => normalized.push(*digit),
        }
    }

    normalized.parse().ok()
}
