//! WGS-84 geodetic <-> Earth-Centered-Fixed conversions.
//!
//! Consumed by the rest of the crate as an opaque primitive: 3-vector in,
//! 3-vector out. Geodetic vectors are `[lat_deg, lon_deg, hae_m]`, ECF
//! vectors are `[x, y, z]` in meters.

/// WGS84 semi-major axis (meters)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared
const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Convert geodetic coordinates `[lat_deg, lon_deg, hae_m]` to ECF `[x, y, z]`.
pub fn geodetic_to_ecf(llh: [f64; 3]) -> [f64; 3] {
    let lat_rad = llh[0].to_radians();
    let lon_rad = llh[1].to_radians();
    let hae = llh[2];

    // prime vertical radius of curvature
    let n = WGS84_A / (1.0 - WGS84_E2 * lat_rad.sin().powi(2)).sqrt();

    let x = (n + hae) * lat_rad.cos() * lon_rad.cos();
    let y = (n + hae) * lat_rad.cos() * lon_rad.sin();
    let z = (n * (1.0 - WGS84_E2) + hae) * lat_rad.sin();

    [x, y, z]
}

/// Convert ECF coordinates `[x, y, z]` to geodetic `[lat_deg, lon_deg, hae_m]`.
///
/// Iterative latitude refinement; converges well below 1e-6 degrees and
/// 1e-3 meters for points near the Earth's surface.
pub fn ecf_to_geodetic(ecf: [f64; 3]) -> [f64; 3] {
    let [x, y, z] = ecf;
    let lon_rad = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    if p < 1e-9 {
        // polar axis: latitude is +/-90, height measured from the pole
        let b = WGS84_A * (1.0 - WGS84_E2).sqrt();
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return [lat, lon_rad.to_degrees(), z.abs() - b];
    }

    // bootstrap with the spherical estimate, then refine
    let mut lat_rad = (z / p).atan();
    let mut hae = 0.0;
    for _ in 0..10 {
        let sin_lat = lat_rad.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        hae = p / lat_rad.cos() - n;
        let next = (z / (p * (1.0 - WGS84_E2 * n / (n + hae)))).atan();
        if (next - lat_rad).abs() < 1e-14 {
            lat_rad = next;
            break;
        }
        lat_rad = next;
    }

    [lat_rad.to_degrees(), lon_rad.to_degrees(), hae]
}
