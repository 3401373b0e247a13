//! Integration tests for the STAC client.
//!
//! Tests marked `#[ignore]` require network access to real STAC catalogs.
//! Run with: `cargo test -p vistack-cloud -- --ignored stac`

use chrono::NaiveDate;
use vistack_cloud::stac_client::{StacCatalog, StacClient, StacClientOptions};
use vistack_cloud::stac_models::StacSearchParams;

fn january_2022() -> StacSearchParams {
    StacSearchParams::new()
        .bbox(-3.71, 40.41, -3.69, 40.43)
        .date_range(
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(),
        )
        .collections(&["sentinel-2-l2a"])
        .max_cloud_cover(75.0)
        .sort_by_datetime()
        .limit(10)
}

/// Search Earth Search for Sentinel-2 L2A over Madrid.
#[tokio::test]
#[ignore]
async fn stac_earth_search_sentinel2() {
    let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default())
        .expect("failed to create client");

    let items = client.search_all(&january_2022()).await.expect("search failed");
    println!("Found {} items", items.len());
    assert!(!items.is_empty(), "should find at least one item");

    let mut last = None;
    for item in &items {
        let acquired = item.acquired().expect("item datetime");
        println!("  {} dt={} cc={:?}", item.id, acquired, item.cloud_cover());
        assert!(item.cloud_cover().unwrap_or(100.0) <= 75.0);
        assert!(item.asset("red").is_some() && item.asset("scl").is_some());
        if let Some(prev) = last {
            assert!(prev <= acquired, "results should be sorted ascending");
        }
        last = Some(acquired);
    }
}

/// Search Planetary Computer and sign one asset.
#[tokio::test]
#[ignore]
async fn stac_planetary_computer_signing() {
    let client = StacClient::new(StacCatalog::PlanetaryComputer, StacClientOptions::default())
        .expect("failed to create client");

    let page = client.search(&january_2022()).await.expect("search failed");
    assert!(!page.is_empty(), "should find at least one item");

    let href = &page.features[0].asset("B04").expect("red band").href;
    let signed = client.sign_asset_href(href).await.expect("signing failed");
    assert!(signed.contains("sig="), "signed URL should carry a SAS token");
}

/// Pagination respects max_items.
#[tokio::test]
#[ignore]
async fn stac_pagination_max_items() {
    let options = StacClientOptions {
        max_items: 3,
        ..Default::default()
    };
    let client = StacClient::new(StacCatalog::EarthSearch, options).expect("failed to create client");

    let items = client
        .search_all(&january_2022().limit(1))
        .await
        .expect("search failed");
    assert!(items.len() <= 3);
}
