use crate::listings::ListingHash;
use crate::schema::Inventory;

/// Finds the asset id of the inventory item backing a market listing.
///
/// Two scans, first match wins in each: item descriptions by market hash
/// name, then inventory entries by the captured `classid`/`instanceid`
/// pair. Several assets sharing a class and instance are not
/// disambiguated; whichever the scan hits first is returned.
pub fn retrieve_asset_id(inventory: &Inventory, listing_hash: &ListingHash) -> Option<String> {
    let description = inventory
        .descriptions
        .values()
        .find(|description| description.market_hash_name == listing_hash.as_str())?;

    log::debug!(
        "Listing {listing_hash} maps to class {} / instance {} ({}, marketable = {})",
        description.classid,
        description.instanceid,
        description.item_type,
        description.marketable
    );

    inventory
        .assets
        .values()
        .find(|asset| {
            asset.classid == description.classid && asset.instanceid == description.instanceid
        })
        .map(|asset| asset.id.clone())
}
