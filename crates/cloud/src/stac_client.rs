//! Async STAC client for searching spatio-temporal asset catalogs.
//!
//! Supports Planetary Computer and Earth Search out of the box, plus
//! arbitrary STAC API endpoints via [`StacCatalog::Custom`].

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CloudError, Result};
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

// ---------------------------------------------------------------------------
// Catalog enum
// ---------------------------------------------------------------------------

/// Well-known STAC catalogs plus custom endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StacCatalog {
    /// Microsoft Planetary Computer STAC API.
    PlanetaryComputer,
    /// AWS Earth Search (Element 84).
    EarthSearch,
    /// Any STAC API endpoint (root URL, e.g. `"https://my-stac.example.com/api/v1"`).
    Custom(String),
}

impl StacCatalog {
    /// Return the full POST `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => {
                "https://planetarycomputer.microsoft.com/api/stac/v1/search".to_string()
            }
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// Parse a shorthand string into a catalog.
    ///
    /// Recognized shorthands: `"pc"`, `"planetary-computer"`, `"es"`,
    /// `"earth-search"`. Anything else is treated as a custom URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Whether this catalog requires SAS token signing for asset access.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`StacClient`].
#[derive(Debug, Clone)]
pub struct StacClientOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    /// Maximum retries on transient failures (default 3).
    pub max_retries: u32,
    /// Maximum total items to fetch across pages (default 100).
    pub max_items: usize,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_items: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for STAC Item Search and asset download.
pub struct StacClient {
    catalog: StacCatalog,
    client: reqwest::Client,
    options: StacClientOptions,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            catalog,
            client,
            options,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &StacClientOptions {
        &self.options
    }

    // ── Single-page search ──────────────────────────────────────────

    /// Execute a single search request and return one page of results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        let url = self.catalog.search_url();
        self.post_search(&url, params).await
    }

    // ── Paginated search ────────────────────────────────────────────

    /// Search with automatic pagination, collecting up to `max_items` items.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let mut all_items: Vec<StacItem> = Vec::new();
        let max = self.options.max_items;

        let mut page = self.search(params).await?;
        let mut pages = 1usize;

        loop {
            let next = page.next_link().cloned();
            all_items.append(&mut page.features);

            if all_items.len() >= max {
                if drops_results(all_items.len(), max, next.is_some()) {
                    warn!(
                        max,
                        pages,
                        "STAC search stopped at max_items; later items were dropped"
                    );
                }
                break;
            }

            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    pages += 1;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        all_items.truncate(max);
        debug!(items = all_items.len(), pages, "STAC search complete");
        Ok(all_items)
    }

    // ── Assets ──────────────────────────────────────────────────────

    /// Sign an asset href for Planetary Computer via the `/sign` endpoint.
    ///
    /// For other catalogs, and for local paths, the href is returned unchanged.
    pub async fn sign_asset_href(&self, href: &str) -> Result<String> {
        if !self.catalog.needs_signing() || !is_remote(href) {
            return Ok(href.to_string());
        }
        self.sign_pc_href(href).await
    }

    /// Download a whole asset. `href` may be an `http(s)://` URL, a
    /// `file://` URL or a plain filesystem path.
    pub async fn fetch_asset(&self, href: &str) -> Result<Vec<u8>> {
        if !is_remote(href) {
            let path = href.strip_prefix("file://").unwrap_or(href);
            debug!(path, "reading local asset");
            return std::fs::read(Path::new(path))
                .map_err(|e| CloudError::Core(vistack_core::Error::Io(e)));
        }

        let href = self.sign_asset_href(href).await?;
        debug!(href = %href, "downloading asset");
        let resp = self.client.get(&href).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(CloudError::Network(format!(
                "asset download returned HTTP {}: {}",
                status, href
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    // ── Private helpers ─────────────────────────────────────────────

    async fn post_search(&self, url: &str, params: &StacSearchParams) -> Result<StacItemCollection> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s, 2s, ...
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(attempt, ?delay, "retrying STAC search");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(params)
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let body = r
                        .text()
                        .await
                        .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;
                    let col: StacItemCollection = serde_json::from_str(&body).map_err(|e| {
                        CloudError::Network(format!("parsing STAC response: {e}"))
                    })?;
                    return Ok(col);
                }
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().await.unwrap_or_default();
                    last_err = Some(CloudError::Network(format!(
                        "STAC search returned HTTP {}: {}",
                        status,
                        body.chars().take(500).collect::<String>()
                    )));
                    // Client errors won't change on retry
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_err = Some(CloudError::Network(format!("STAC search request failed: {e}")));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CloudError::Network("STAC search failed".into())))
    }

    /// Follow a pagination link. Handles both POST (body/merge) and GET links.
    async fn follow_next(
        &self,
        link: &StacLink,
        original_params: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();

        if method == "POST" {
            let body = next_page_body(link, original_params)?;
            let merged: StacSearchParams = serde_json::from_value(body)
                .map_err(|e| CloudError::Network(format!("parsing merged params: {e}")))?;
            self.post_search(&link.href, &merged).await
        } else {
            let resp = self
                .client
                .get(&link.href)
                .send()
                .await
                .map_err(|e| CloudError::Network(format!("GET pagination: {e}")))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(CloudError::Network(format!(
                    "STAC pagination returned HTTP {}: {}",
                    status,
                    body.chars().take(500).collect::<String>()
                )));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| CloudError::Network(format!("reading pagination body: {e}")))?;
            serde_json::from_str(&body)
                .map_err(|e| CloudError::Network(format!("parsing pagination response: {e}")))
        }
    }

    /// Sign a single href via the Planetary Computer `/api/sas/v1/sign` endpoint.
    async fn sign_pc_href(&self, href: &str) -> Result<String> {
        let resp = self
            .client
            .get("https://planetarycomputer.microsoft.com/api/sas/v1/sign")
            .query(&[("href", href)])
            .send()
            .await
            .map_err(|e| CloudError::Auth(format!("PC sign request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudError::Auth(format!(
                "PC sign returned HTTP {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CloudError::Auth(format!("parsing PC sign response: {e}")))?;

        body["href"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CloudError::Auth("PC sign response missing 'href' field".into()))
    }
}

fn is_remote(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// Request body for a POST `next` link: the link body alone, or overlaid
/// on the original params when `merge` is set.
fn next_page_body(link: &StacLink, original: &StacSearchParams) -> Result<serde_json::Value> {
    let to_value = |p: &StacSearchParams| {
        serde_json::to_value(p).map_err(|e| CloudError::Network(format!("serializing params: {e}")))
    };

    match (&link.body, link.merge.unwrap_or(false)) {
        (Some(link_body), true) => {
            let mut base = to_value(original)?;
            if let (Some(base_obj), Some(link_obj)) = (base.as_object_mut(), link_body.as_object()) {
                for (k, v) in link_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            Ok(base)
        }
        (Some(link_body), false) => Ok(link_body.clone()),
        (None, _) => to_value(original),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Whether stopping at `max` items leaves matching items behind.
fn drops_results(collected: usize, max: usize, has_next: bool) -> bool {
    collected > max || (collected == max && has_next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_detected() {
        // Last page ended exactly at the limit
        assert!(!drops_results(100, 100, false));
        assert!(drops_results(100, 100, true));
        // Page overshot the limit
        assert!(drops_results(150, 100, false));
        assert!(!drops_results(40, 100, true));
    }

    #[test]
    fn catalog_search_urls() {
        assert_eq!(
            StacCatalog::PlanetaryComputer.search_url(),
            "https://planetarycomputer.microsoft.com/api/stac/v1/search"
        );
        assert_eq!(
            StacCatalog::EarthSearch.search_url(),
            "https://earth-search.aws.element84.com/v1/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://example.com/stac".into()).search_url(),
            "https://example.com/stac/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://example.com/stac/search/".into()).search_url(),
            "https://example.com/stac/search"
        );
    }

    #[test]
    fn catalog_from_str_or_url() {
        assert_eq!(StacCatalog::from_str_or_url("PC"), StacCatalog::PlanetaryComputer);
        assert_eq!(StacCatalog::from_str_or_url("earth-search"), StacCatalog::EarthSearch);
        // Custom URLs keep their case
        assert_eq!(
            StacCatalog::from_str_or_url("https://My-Stac.com/v1"),
            StacCatalog::Custom("https://My-Stac.com/v1".into())
        );
    }

    #[test]
    fn needs_signing() {
        assert!(StacCatalog::PlanetaryComputer.needs_signing());
        assert!(!StacCatalog::EarthSearch.needs_signing());
    }

    #[test]
    fn merged_next_body_keeps_filters() {
        let params = StacSearchParams::new()
            .bbox(0.0, 0.0, 1.0, 1.0)
            .collections(&["sentinel-2-l2a"]);
        let link = StacLink {
            rel: "next".into(),
            href: "https://example.com/search".into(),
            method: Some("POST".into()),
            body: Some(serde_json::json!({"token": "next:abc"})),
            merge: Some(true),
            type_: None,
        };

        let body = next_page_body(&link, &params).unwrap();
        assert_eq!(body["token"], "next:abc");
        assert_eq!(body["collections"][0], "sentinel-2-l2a");

        let replaced = next_page_body(&StacLink { merge: None, ..link }, &params).unwrap();
        assert!(replaced.get("collections").is_none());
    }

    #[tokio::test]
    async fn fetch_local_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B04.tif");
        std::fs::write(&path, b"II*\0").unwrap();

        let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default()).unwrap();
        let bytes = client.fetch_asset(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"II*\0");

        let url = format!("file://{}", path.display());
        assert_eq!(client.fetch_asset(&url).await.unwrap().len(), 4);
        assert!(client.fetch_asset("/no/such/asset.tif").await.is_err());
    }
}
