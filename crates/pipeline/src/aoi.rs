//! Circular area of interest around a point

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use vistack_core::{BBox, Error, GeoPoint, Result, CRS};

/// Vertices of the polygon approximating the circle
pub const RING_VERTICES: usize = 64;

/// A circle of `radius_m` metres around `center` (WGS84).
///
/// Built once from configuration and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    center: GeoPoint,
    radius_m: f64,
}

impl AreaOfInterest {
    pub fn new(center: GeoPoint, radius_m: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&center.lon) {
            return Err(invalid("longitude", center.lon, "must be within [-180, 180]"));
        }
        if !(-90.0..=90.0).contains(&center.lat) {
            return Err(invalid("latitude", center.lat, "must be within [-90, 90]"));
        }
        if !(radius_m > 0.0 && radius_m.is_finite()) {
            return Err(invalid("buffer_m", radius_m, "must be positive"));
        }
        Ok(Self { center, radius_m })
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// True when (lon, lat) lies within the circle.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.center.distance_m(&GeoPoint::new(lon, lat)) <= self.radius_m
    }

    /// Counter-clockwise polygon enclosing the circle, first vertex not
    /// repeated. Vertices sit on the circumscribed polygon so the whole
    /// circle is inside.
    pub fn ring(&self) -> Vec<GeoPoint> {
        let r = self.radius_m / (PI / RING_VERTICES as f64).cos();
        (0..RING_VERTICES)
            .map(|i| {
                let bearing = 360.0 - i as f64 * 360.0 / RING_VERTICES as f64;
                self.center.destination(bearing, r)
            })
            .collect()
    }

    /// WGS84 envelope of the circle.
    pub fn bbox(&self) -> BBox {
        BBox::enclosing(self.ring().iter().map(|p| (p.lon, p.lat)))
            .unwrap_or_else(|| BBox::new(self.center.lon, self.center.lat, self.center.lon, self.center.lat))
    }

    /// Envelope of the circle in `crs`.
    pub fn bbox_in(&self, crs: &CRS) -> Result<BBox> {
        let projected = self
            .ring()
            .iter()
            .map(|p| crs.from_wgs84(p.lon, p.lat))
            .collect::<Result<Vec<_>>>()?;
        BBox::enclosing(projected).ok_or_else(|| Error::Other("empty area of interest".into()))
    }

    /// GeoJSON Polygon of [`ring`](Self::ring), closed.
    pub fn to_geojson(&self) -> serde_json::Value {
        let mut coords: Vec<[f64; 2]> = self.ring().iter().map(|p| [p.lon, p.lat]).collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [coords],
        })
    }
}

fn invalid(name: &'static str, value: f64, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
