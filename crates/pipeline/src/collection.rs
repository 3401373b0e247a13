//! Collection assembly: filter and order acquisitions

use tracing::{debug, info};
use vistack_core::Acquisition;

use crate::catalog::{CatalogQuery, ImageCatalog};
use crate::error::Result;

/// Query `catalog` and keep what matches `query`, oldest first.
pub fn assemble_collection<C>(catalog: &C, query: &CatalogQuery) -> Result<Vec<Acquisition>>
where
    C: ImageCatalog + ?Sized,
{
    let candidates = catalog.query(query)?;
    let total = candidates.len();
    let collection = select_acquisitions(candidates, query);

    info!(
        matched = collection.len(),
        candidates = total,
        interval = %query.interval,
        "assembled collection"
    );
    for acq in &collection {
        debug!(id = %acq.id, acquired = %acq.acquired, cloud_cover = ?acq.cloud_cover, "collection member");
    }
    Ok(collection)
}

/// Apply the date, cloud and spatial filters, then sort by acquisition
/// time. The sort is stable, so equal timestamps keep catalog order.
///
/// Unknown cloud cover fails the cloud filter.
pub fn select_acquisitions(candidates: Vec<Acquisition>, query: &CatalogQuery) -> Vec<Acquisition> {
    let bbox = query.aoi.bbox();
    let mut kept: Vec<Acquisition> = candidates
        .into_iter()
        .filter(|a| query.interval.contains(&a.acquired))
        .filter(|a| a.cloud_cover.is_some_and(|cc| cc <= query.max_cloud_cover))
        .filter(|a| a.footprint.intersects(&bbox))
        .collect();
    kept.sort_by_key(|a| a.acquired);
    kept
}
