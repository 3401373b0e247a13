//! Coordinate Reference System handling

mod utm;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub use utm::{parse_utm_epsg, utm_to_wgs84, wgs84_to_utm};

/// Coordinate Reference System representation.
///
/// vistack only transforms between EPSG:4326 and the WGS84 UTM zones
/// (EPSG 326xx / 327xx), which covers Sentinel-2 and Landsat products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT representation, kept verbatim when read from a file
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    pub fn is_geographic(&self) -> bool {
        self.epsg == Some(4326)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }

    /// Project a WGS84 (lon, lat) position into this CRS.
    pub fn from_wgs84(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        match self.epsg {
            Some(4326) => Ok((lon, lat)),
            Some(code) => match parse_utm_epsg(code) {
                Some((zone, north)) => Ok(wgs84_to_utm(lon, lat, zone, north)),
                None => Err(Error::UnsupportedCrs(self.identifier())),
            },
            None => Err(Error::UnsupportedCrs(self.identifier())),
        }
    }

    /// Convert a position in this CRS back to WGS84 (lon, lat).
    pub fn to_wgs84(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self.epsg {
            Some(4326) => Ok((x, y)),
            Some(code) => match parse_utm_epsg(code) {
                Some((zone, north)) => Ok(utm_to_wgs84(x, y, zone, north)),
                None => Err(Error::UnsupportedCrs(self.identifier())),
            },
            None => Err(Error::UnsupportedCrs(self.identifier())),
        }
    }

    /// Transform a position from this CRS into `target`.
    pub fn transform_to(&self, target: &CRS, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.is_equivalent(target) {
            return Ok((x, y));
        }
        let (lon, lat) = self.to_wgs84(x, y)?;
        target.from_wgs84(lon, lat)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32630);
        assert_eq!(crs.epsg(), Some(32630));
        assert_eq!(crs.identifier(), "EPSG:32630");
        assert!(!crs.is_geographic());
    }

    #[test]
    fn test_transform_between_utm_zones() {
        // Madrid sits in zone 30; the same point expressed in zone 31 must
        // come back to the same lon/lat.
        let z30 = CRS::from_epsg(32630);
        let z31 = CRS::from_epsg(32631);
        let (e30, n30) = z30.from_wgs84(-3.7037, 40.4168).unwrap();
        let (e31, n31) = z30.transform_to(&z31, e30, n30).unwrap();
        let (lon, lat) = z31.to_wgs84(e31, n31).unwrap();
        assert_relative_eq!(lon, -3.7037, epsilon = 1e-8);
        assert_relative_eq!(lat, 40.4168, epsilon = 1e-8);
    }

    #[test]
    fn test_unsupported_crs() {
        let merc = CRS::from_epsg(3857);
        assert!(matches!(
            merc.from_wgs84(0.0, 0.0),
            Err(Error::UnsupportedCrs(_))
        ));
    }
}
