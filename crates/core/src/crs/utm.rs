//! Pure-Rust WGS84 <-> UTM conversion using Krüger's series in the third
//! flattening `n` (Karney 2011, third order), good to about a millimetre
//! within 3000 km of the central meridian. That covers reprojecting between
//! neighbouring zones.
//!
//! No libproj: Sentinel-2 and Landsat tiles are delivered in UTM, and the
//! area of interest is given in WGS84, so these two directions are all the
//! stacking step needs.

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Series coefficients derived from the third flattening.
struct Kruger {
    /// First eccentricity
    e: f64,
    /// Rectifying radius scaled by k0
    k0a: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl Kruger {
    fn wgs84() -> Self {
        let n = F / (2.0 - F);
        let n2 = n * n;
        let n3 = n2 * n;
        Self {
            e: (F * (2.0 - F)).sqrt(),
            k0a: K0 * A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
pub fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let k = Kruger::wgs84();
    let lat = lat_deg.to_radians();
    let dlon = lon_deg.to_radians() - central_meridian(zone);

    // Conformal latitude, as its tangent
    let sin_lat = lat.sin();
    let t = (sin_lat.atanh() - k.e * (k.e * sin_lat).atanh()).sinh();
    let xi_p = t.atan2(dlon.cos());
    let eta_p = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, a) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi += a * (m * xi_p).sin() * (m * eta_p).cosh();
        eta += a * (m * xi_p).cos() * (m * eta_p).sinh();
    }

    let easting = FALSE_EASTING + k.k0a * eta;
    let northing = k.k0a * xi;
    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// Convert UTM (easting, northing) in metres back to WGS84
/// (longitude, latitude) in degrees.
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let k = Kruger::wgs84();
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };
    let xi = y / k.k0a;
    let eta = (easting - FALSE_EASTING) / k.k0a;

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, b) in k.beta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi_p -= b * (m * xi).sin() * (m * eta).cosh();
        eta_p -= b * (m * xi).cos() * (m * eta).sinh();
    }

    // Conformal latitude, then geodetic
    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut lat = chi;
    for (j, d) in k.delta.iter().enumerate() {
        lat += d * (2.0 * (j + 1) as f64 * chi).sin();
    }
    let lon = central_meridian(zone) + eta_p.sinh().atan2(xi_p.cos());

    (lon.to_degrees(), lat.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    #[test]
    fn parse_utm_zones() {
        assert_eq!(parse_utm_epsg(32630), Some((30, true)));
        assert_eq!(parse_utm_epsg(32721), Some((21, false)));
        assert_eq!(parse_utm_epsg(4326), None);
        assert_eq!(parse_utm_epsg(32600), None);
        assert_eq!(parse_utm_epsg(32761), None);
    }

    // pyproj: Transformer.from_crs(4326, 32630, always_xy=True)
    //   .transform(-3.7037, 40.4168) → (440298.94, 4474257.31)
    #[test]
    fn madrid_forward() {
        let (e, n) = wgs84_to_utm(-3.7037, 40.4168, 30, true);
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    #[test]
    fn madrid_inverse() {
        let (lon, lat) = utm_to_wgs84(440_298.94, 4_474_257.31, 30, true);
        assert_close(lon, -3.7037, 1e-5, "lon");
        assert_close(lat, 40.4168, 1e-5, "lat");
    }

    #[test]
    fn southern_hemisphere_roundtrip() {
        let (e, n) = wgs84_to_utm(-58.3816, -34.6037, 21, false);
        assert_close(e, 373_317.50, 1.0, "easting");
        assert_close(n, 6_170_036.17, 1.0, "northing");
        let (lon, lat) = utm_to_wgs84(e, n, 21, false);
        assert_close(lon, -58.3816, 1e-6, "lon");
        assert_close(lat, -34.6037, 1e-6, "lat");
    }

    #[test]
    fn equator_central_meridian() {
        let (e, n) = wgs84_to_utm(-3.0, 0.0, 30, true);
        assert_close(e, 500_000.0, 0.01, "easting at CM");
        assert_close(n, 0.0, 0.01, "northing at equator");
    }

    #[test]
    fn roundtrip_far_from_central_meridian() {
        // Madrid expressed in zone 31, about 6.7 degrees east of it
        let (e, n) = wgs84_to_utm(-3.7037, 40.4168, 31, true);
        let (lon, lat) = utm_to_wgs84(e, n, 31, true);
        assert_close(lon, -3.7037, 1e-8, "lon");
        assert_close(lat, 40.4168, 1e-8, "lat");
    }

    #[test]
    fn roundtrip_grid_within_zone() {
        for lat in [-80.0, -45.5, -0.1, 0.0, 12.3, 40.4, 71.0, 84.0] {
            for dlon in [-3.5, -1.0, 0.0, 0.7, 3.5] {
                let north = lat >= 0.0;
                let (e, n) = wgs84_to_utm(-3.0 + dlon, lat, 30, north);
                let (lon2, lat2) = utm_to_wgs84(e, n, 30, north);
                assert_close(lon2, -3.0 + dlon, 1e-9, "lon");
                assert_close(lat2, lat, 1e-9, "lat");
            }
        }
    }
}
