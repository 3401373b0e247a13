//! Job configuration file support.
//!
//! A job is described in TOML. [`PipelineConfig`] mirrors the file; callers
//! may override fields (e.g. from the command line) and then call
//! [`PipelineConfig::validate`], which parses every value once and yields
//! an immutable [`JobSpec`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vistack_algorithms::imagery::{QualityClass, QualityMask, SpectralIndex};
use vistack_cloud::{AssetKeys, StacCatalog};
use vistack_core::GeoPoint;

use crate::aoi::AreaOfInterest;
use crate::error::{PipelineError, Result};
use crate::interval::DateInterval;
use crate::request::{ExportTask, StackRequest, DEFAULT_MAX_CLOUD_COVER, DEFAULT_MAX_PIXELS, DEFAULT_SCALE_M};

/// Job configuration as read from file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub area: AreaSettings,
    pub dates: DateSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub indices: IndexSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Point and buffer radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSettings {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default = "default_buffer_m")]
    pub buffer_m: f64,
}

/// `[start, end)`; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSettings {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Local root standing in for cloud storage
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_scale_m")]
    pub scale_m: f64,
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            output_dir: default_output_dir(),
            scale_m: default_scale_m(),
            max_pixels: default_max_pixels(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default = "default_index_names")]
    pub names: Vec<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            names: default_index_names(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_max_cloud_cover")]
    pub max_cloud_cover: f64,
    #[serde(default = "default_accepted_classes")]
    pub accepted_classes: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            max_cloud_cover: default_max_cloud_cover(),
            accepted_classes: default_accepted_classes(),
        }
    }
}

/// STAC endpoint and asset naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// `"es"`, `"pc"` or a STAC API root URL
    #[serde(default = "default_catalog_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Asset key per band. When absent, the catalog's own names are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<AssetKeys>,
}

impl CatalogSettings {
    pub fn catalog(&self) -> StacCatalog {
        StacCatalog::from_str_or_url(&self.url)
    }

    /// Configured asset keys, or the defaults of the selected catalog.
    pub fn asset_keys(&self) -> AssetKeys {
        self.assets
            .clone()
            .unwrap_or_else(|| AssetKeys::for_catalog(&self.catalog()))
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            collection: default_collection(),
            max_items: default_max_items(),
            assets: None,
        }
    }
}

fn default_buffer_m() -> f64 {
    500.0
}

fn default_folder() -> String {
    "vistack".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_scale_m() -> f64 {
    DEFAULT_SCALE_M
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

fn default_index_names() -> Vec<String> {
    vec!["NDVI".to_string()]
}

fn default_max_cloud_cover() -> f64 {
    DEFAULT_MAX_CLOUD_COVER
}

fn default_accepted_classes() -> Vec<String> {
    QualityMask::default().accepted().map(|c| c.name().to_string()).collect()
}

fn default_catalog_url() -> String {
    "es".to_string()
}

fn default_collection() -> String {
    "sentinel-2-l2a".to_string()
}

fn default_max_items() -> usize {
    500
}

impl PipelineConfig {
    /// Load a job configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Check and parse every setting. Nothing is queried before this passes.
    pub fn validate(&self) -> Result<JobSpec> {
        let aoi = AreaOfInterest::new(
            GeoPoint::new(self.area.longitude, self.area.latitude),
            self.area.buffer_m,
        )
        .map_err(config_err)?;

        let interval = DateInterval::new(self.dates.start, self.dates.end).map_err(config_err)?;

        if self.indices.names.is_empty() {
            return Err(PipelineError::Config("no indices requested".into()));
        }
        let mut indices = Vec::with_capacity(self.indices.names.len());
        for name in &self.indices.names {
            let index: SpectralIndex = name.parse().map_err(config_err)?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }

        let cloud = self.filter.max_cloud_cover;
        if !(0.0..=100.0).contains(&cloud) {
            return Err(PipelineError::Config(format!(
                "max_cloud_cover = {} must be within [0, 100]",
                cloud
            )));
        }

        let classes = self
            .filter
            .accepted_classes
            .iter()
            .map(|c| c.parse::<QualityClass>())
            .collect::<vistack_core::Result<Vec<_>>>()
            .map_err(config_err)?;

        let scale = self.export.scale_m;
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(PipelineError::Config(format!("scale_m = {} must be positive", scale)));
        }
        if self.export.max_pixels == 0 {
            return Err(PipelineError::Config("max_pixels must be positive".into()));
        }
        if self.export.folder.trim().is_empty() {
            return Err(PipelineError::Config("export folder must not be empty".into()));
        }

        Ok(JobSpec {
            indices,
            aoi,
            interval,
            max_cloud_cover: cloud,
            mask: QualityMask::new(classes),
            scale_m: scale,
            folder: self.export.folder.clone(),
            output_dir: self.export.output_dir.clone(),
            max_pixels: self.export.max_pixels,
            catalog: self.catalog.clone(),
        })
    }
}

fn config_err(e: vistack_core::Error) -> PipelineError {
    PipelineError::Config(e.to_string())
}

/// A validated, immutable job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    indices: Vec<SpectralIndex>,
    aoi: AreaOfInterest,
    interval: DateInterval,
    max_cloud_cover: f64,
    mask: QualityMask,
    scale_m: f64,
    folder: String,
    output_dir: PathBuf,
    max_pixels: u64,
    catalog: CatalogSettings,
}

impl JobSpec {
    pub fn indices(&self) -> &[SpectralIndex] {
        &self.indices
    }

    pub fn aoi(&self) -> &AreaOfInterest {
        &self.aoi
    }

    pub fn interval(&self) -> &DateInterval {
        &self.interval
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn catalog(&self) -> &CatalogSettings {
        &self.catalog
    }

    /// The stack request for one index.
    pub fn request(&self, index: SpectralIndex) -> StackRequest {
        StackRequest::new(index, self.aoi, self.interval)
            .max_cloud_cover(self.max_cloud_cover)
            .mask(self.mask.clone())
            .scale_m(self.scale_m)
    }

    /// One export task per requested index, in configuration order.
    pub fn tasks(&self) -> Vec<ExportTask> {
        self.indices
            .iter()
            .map(|&index| ExportTask::new(self.request(index), self.folder.clone()).max_pixels(self.max_pixels))
            .collect()
    }
}
