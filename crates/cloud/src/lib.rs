//! # vistack Cloud
//!
//! STAC catalog access for vistack.
//!
//! - Async STAC Item Search with POST/GET pagination and bounded retry
//! - Planetary Computer asset signing
//! - Asset download (HTTP or local path) and decoding into an
//!   [`Acquisition`](vistack_core::Acquisition)
//!
//! ## Features
//!
//! - `native` (default): blocking API via a tokio current-thread runtime

pub mod assets;
pub mod error;
pub mod stac_client;
pub mod stac_models;
pub mod sync_api;

pub use assets::{load_acquisition, AssetKeys};
pub use error::{CloudError, Result};
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacItem, StacItemCollection, StacSearchParams};

/// Blocking API re-exported as `blocking` module (native only).
#[cfg(feature = "native")]
pub mod blocking {
    pub use crate::sync_api::*;
}
