//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async [`StacClient`] with a Tokio runtime so callers don't need
//! to manage their own async runtime.

#[cfg(feature = "native")]
mod inner {
    use vistack_core::{Acquisition, BBox, SpectralBand};

    use crate::assets::{load_acquisition, AssetKeys};
    use crate::error::{CloudError, Result};
    use crate::stac_client::{StacCatalog, StacClient, StacClientOptions};
    use crate::stac_models::{StacItem, StacItemCollection, StacSearchParams};

    /// Blocking wrapper around [`StacClient`].
    ///
    /// Uses an internal single-threaded Tokio runtime.
    pub struct StacClientBlocking {
        rt: tokio::runtime::Runtime,
        inner: StacClient,
    }

    impl StacClientBlocking {
        pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CloudError::Network(e.to_string()))?;

            let inner = StacClient::new(catalog, options)?;
            Ok(Self { rt, inner })
        }

        pub fn catalog(&self) -> &StacCatalog {
            self.inner.catalog()
        }

        /// Execute a single search request (blocking).
        pub fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
            self.rt.block_on(self.inner.search(params))
        }

        /// Search with automatic pagination (blocking).
        pub fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
            self.rt.block_on(self.inner.search_all(params))
        }

        /// Download an asset (blocking).
        pub fn fetch_asset(&self, href: &str) -> Result<Vec<u8>> {
            self.rt.block_on(self.inner.fetch_asset(href))
        }

        /// Download `item`'s band assets and build an acquisition (blocking).
        pub fn load_acquisition(
            &self,
            item: &StacItem,
            keys: &AssetKeys,
            bands: &[SpectralBand],
            clip: Option<&BBox>,
        ) -> Result<Acquisition> {
            load_acquisition(item, keys, bands, clip, |href| self.fetch_asset(href))
        }
    }
}

#[cfg(feature = "native")]
pub use inner::*;
