//! Geographic projection math.
//!
//! All public functions take and return degrees; conversion to radians is
//! internal. Longitudes live in [-180, 180], latitudes in [-90, 90].

/// Forward orthographic projection of spherical coordinates onto the plane,
/// as seen from infinite distance along the axis through `(lon0, lat0)`.
pub fn orthographic(r: f64, lon_deg: f64, lat_deg: f64, lon0_deg: f64, lat0_deg: f64) -> (f64, f64) {
    let (l, l0) = (lon_deg.to_radians(), lon0_deg.to_radians());
    let (p, p0) = (lat_deg.to_radians(), lat0_deg.to_radians());

    let x = r * p.cos() * (l - l0).sin();
    let y = r * (p0.cos() * p.sin() - p0.sin() * p.cos() * (l - l0).cos());

    (x, y)
}

/// Inverse orthographic projection: recover `(lon, lat)` in degrees from a
/// planar point `(x, y)` on a hemisphere photograph of radius `r` centred on
/// `(lon0, lat0)`.
///
/// `rho/r` is clamped into [-1, 1] before the arcsine so floating round-off
/// at the disc rim cannot push it outside the valid domain. At `rho == 0`
/// the latitude formula degenerates to `lat0`; a substitute denominator of 1
/// avoids the division by zero there.
pub fn inverse_orthographic(x: f64, y: f64, r: f64, lon0_deg: f64, lat0_deg: f64) -> (f64, f64) {
    let l0 = lon0_deg.to_radians();
    let (sin_p0, cos_p0) = lat0_deg.to_radians().sin_cos();

    let rho = (x * x + y * y).sqrt();
    let c = (rho / r).clamp(-1.0, 1.0).asin();
    let (sin_c, cos_c) = c.sin_cos();

    let denom = if rho == 0.0 { 1.0 } else { rho };

    let lat = (cos_c * sin_p0 + y * sin_c * cos_p0 / denom).asin();
    let lon = l0 + (x * sin_c).atan2(rho * cos_c * cos_p0 - y * sin_c * sin_p0);

    (lon.to_degrees(), lat.to_degrees())
}

/// Equirectangular (cylindrical) mapping from pixel coordinates to
/// `(lon, lat)` in degrees.
///
/// The raster's own pixel extents are the scale reference, so the mapping is
/// self-calibrating per image: `(0, 0)` maps to `(-180, -90)` and
/// `(max_x, max_y)` to `(180, 90)`. Row 0 is the southmost row.
pub fn equirectangular(px: f64, py: f64, max_x: f64, max_y: f64) -> (f64, f64) {
    let lon = px * (360.0 / max_x) - 180.0;
    let lat = py * (180.0 / max_y) - 90.0;
    (lon, lat)
}

/// Convert geographic coordinates to 3D cartesian coordinates on a sphere of
/// radius `r`, via the colatitude (90 degrees minus latitude).
pub fn geo_to_cartesian(r: f64, lon_deg: f64, lat_deg: f64) -> [f64; 3] {
    let theta = lon_deg.to_radians();
    let p = (90.0 - lat_deg).to_radians();

    let (sin_p, cos_p) = p.sin_cos();
    let (sin_t, cos_t) = theta.sin_cos();

    [r * sin_p * cos_t, r * sin_p * sin_t, r * cos_p]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn orthographic_round_trip_inside_hemisphere() {
        let r = 90.0;
        let (lon0, lat0) = (-90.0, 0.0);

        for &(lon, lat) in &[(-90.0, 0.0), (-120.0, 35.0), (-45.0, -60.0), (-91.5, 0.25)] {
            let (x, y) = orthographic(r, lon, lat, lon0, lat0);
            let (lon_r, lat_r) = inverse_orthographic(x, y, r, lon0, lat0);
            let (x2, y2) = orthographic(r, lon_r, lat_r, lon0, lat0);

            assert!((x - x2).abs() < TOL, "x {} vs {}", x, x2);
            assert!((y - y2).abs() < TOL, "y {} vs {}", y, y2);
        }
    }

    #[test]
    fn inverse_orthographic_at_projection_center() {
        // rho == 0 exercises the zero-division guard.
        let (lon, lat) = inverse_orthographic(0.0, 0.0, 50.0, 90.0, 30.0);
        assert!((lon - 90.0).abs() < TOL);
        assert!((lat - 30.0).abs() < TOL);
    }

    #[test]
    fn inverse_orthographic_clamps_rim_round_off() {
        // A point fractionally outside the disc must not produce NaN.
        let r = 100.0;
        let (lon, lat) = inverse_orthographic(r * (1.0 + 1e-14), 0.0, r, 0.0, 0.0);
        assert!(lon.is_finite() && lat.is_finite());
        assert!((lon - 90.0).abs() < 1e-6);
    }

    #[test]
    fn equirectangular_bounds() {
        let (lon, lat) = equirectangular(0.0, 0.0, 360.0, 180.0);
        assert!((lon + 180.0).abs() < TOL);
        assert!((lat + 90.0).abs() < TOL);

        let (lon, lat) = equirectangular(360.0, 180.0, 360.0, 180.0);
        assert!((lon - 180.0).abs() < TOL);
        assert!((lat - 90.0).abs() < TOL);
    }

    #[test]
    fn geo_to_cartesian_poles_and_equator() {
        let r = 10.0;

        let north = geo_to_cartesian(r, 0.0, 90.0);
        assert!(north[0].abs() < TOL && north[1].abs() < TOL);
        assert!((north[2] - r).abs() < TOL);

        let equator = geo_to_cartesian(r, 0.0, 0.0);
        assert!((equator[0] - r).abs() < TOL);
        assert!(equator[1].abs() < TOL && equator[2].abs() < TOL);

        let side = geo_to_cartesian(r, 90.0, 0.0);
        assert!((side[1] - r).abs() < TOL);
    }
}
