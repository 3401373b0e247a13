//! [`ImageCatalog`] backed by a STAC API

use std::collections::BTreeSet;

use tracing::{debug, info};
use vistack_cloud::blocking::StacClientBlocking;
use vistack_cloud::{AssetKeys, StacClientOptions, StacItem, StacSearchParams};
use vistack_core::{Acquisition, SpectralBand};

use crate::aoi::AreaOfInterest;
use crate::catalog::{CatalogQuery, ImageCatalog};
use crate::config::CatalogSettings;
use crate::error::{PipelineError, Result};

/// Largest page the public STAC APIs accept
const PAGE_LIMIT: usize = 100;

/// Searches a STAC collection and downloads band assets on demand.
///
/// Item metadata is filtered before any asset is fetched, so only
/// matching scenes are downloaded.
pub struct StacImageCatalog {
    client: StacClientBlocking,
    collection: String,
    assets: AssetKeys,
    page_size: usize,
}

impl StacImageCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self> {
        let options = StacClientOptions {
            max_items: settings.max_items,
            ..Default::default()
        };
        let client = StacClientBlocking::new(settings.catalog(), options)?;
        Ok(Self {
            client,
            collection: settings.collection.clone(),
            assets: settings.asset_keys(),
            page_size: settings.max_items.clamp(1, PAGE_LIMIT),
        })
    }

    fn base_params(&self, aoi: &AreaOfInterest, limit: usize) -> StacSearchParams {
        StacSearchParams::new()
            .intersects(aoi.to_geojson())
            .collections(&[self.collection.as_str()])
            .sort_by_datetime()
            .limit(limit as u32)
    }

    fn load(&self, item: &StacItem, bands: &[SpectralBand], aoi: &AreaOfInterest) -> Result<Acquisition> {
        let bbox = aoi.bbox();
        Ok(self.client.load_acquisition(item, &self.assets, bands, Some(&bbox))?)
    }
}

impl ImageCatalog for StacImageCatalog {
    fn query(&self, query: &CatalogQuery) -> Result<Vec<Acquisition>> {
        let params = self
            .base_params(&query.aoi, self.page_size)
            .date_range(query.interval.start(), query.interval.end())
            .max_cloud_cover(query.max_cloud_cover);

        let items = self.client.search_all(&params)?;
        let total = items.len();
        let matching: Vec<&StacItem> = items
            .iter()
            .filter(|item| item.acquired().is_some_and(|t| query.interval.contains(&t)))
            .filter(|item| item.cloud_cover().is_some_and(|cc| cc <= query.max_cloud_cover))
            .collect();
        info!(items = total, matching = matching.len(), "STAC search");

        let mut bands: BTreeSet<SpectralBand> = query.bands.iter().copied().collect();
        // The red band anchors each acquisition's grid.
        bands.insert(SpectralBand::Red);
        let bands: Vec<SpectralBand> = bands.into_iter().collect();

        matching
            .into_iter()
            .map(|item| {
                debug!(id = %item.id, "loading acquisition");
                self.load(item, &bands, &query.aoi)
            })
            .collect()
    }

    fn reference_acquisition(&self, aoi: &AreaOfInterest) -> Result<Acquisition> {
        let page = self.client.search(&self.base_params(aoi, 1))?;
        let item = page.features.first().ok_or_else(|| {
            PipelineError::Catalog(format!(
                "no {} item intersects the area of interest",
                self.collection
            ))
        })?;
        debug!(id = %item.id, "reference acquisition");
        self.load(item, &[SpectralBand::Red], aoi)
    }
}
