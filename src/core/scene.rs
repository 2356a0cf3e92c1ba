//! Externally supplied collection context consumed by the derivation
//! passes: image-formation geometry at the scene center, grid axis
//! weighting/bandwidth, and the pulse timeline.

use crate::core::poly::Poly1d;
use serde::{Deserialize, Serialize};

/// Side of the flight track the sensor looks toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideOfTrack {
    Left,
    Right,
}

impl SideOfTrack {
    /// Signed look factor: +1 for left-looking, -1 for right-looking.
    pub fn look(&self) -> f64 {
        match self {
            SideOfTrack::Left => 1.0,
            SideOfTrack::Right => -1.0,
        }
    }
}

/// Image-formation geometry evaluated at the scene center point.
/// Angles are in degrees, ranges in meters, velocity in m/s ECF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScpCoa {
    pub side_of_track: SideOfTrack,
    pub slope_ang: f64,
    pub graze_ang: f64,
    pub doppler_cone_ang: f64,
    pub slant_range: f64,
    pub scp_time: f64,
    pub arp_vel: [f64; 3],
}

impl ScpCoa {
    pub fn arp_speed(&self) -> f64 {
        let [vx, vy, vz] = self.arp_vel;
        (vx * vx + vy * vy + vz * vz).sqrt()
    }
}

/// One image-grid axis: sampled aperture weighting, impulse response
/// bandwidth (cycles/m), and spatial-frequency center/offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridAxis {
    pub wgt_funct: Option<Vec<f64>>,
    pub imp_resp_bw: f64,
    pub k_ctr: Option<f64>,
    pub delta_k_coa_const: f64,
}

impl GridAxis {
    /// Weighting noise factor `1 + var/mean^2` of the sampled weight
    /// function; unity for uniform or absent weighting.
    pub fn weight_noise_factor(&self) -> f64 {
        match &self.wgt_funct {
            Some(w) if !w.is_empty() => {
                let mean = w.iter().sum::<f64>() / w.len() as f64;
                if mean == 0.0 {
                    return 1.0;
                }
                let var = w.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
                    / w.len() as f64;
                1.0 + var / (mean * mean)
            }
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub row: GridAxis,
    pub col: GridAxis,
}

/// Pulse timeline; the IPP polynomial maps collect time (s) to
/// cumulative pulse index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub ipp_poly: Option<Poly1d>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_sign() {
        assert_eq!(SideOfTrack::Left.look(), 1.0);
        assert_eq!(SideOfTrack::Right.look(), -1.0);
    }

    #[test]
    fn test_uniform_weight_factor_is_unity() {
        let axis = GridAxis {
            wgt_funct: Some(vec![0.7; 64]),
            imp_resp_bw: 1.0,
            k_ctr: None,
            delta_k_coa_const: 0.0,
        };
        assert_relative_eq!(axis.weight_noise_factor(), 1.0);
    }

    #[test]
    fn test_absent_weight_factor_is_unity() {
        let axis = GridAxis {
            wgt_funct: None,
            imp_resp_bw: 1.0,
            k_ctr: None,
            delta_k_coa_const: 0.0,
        };
        assert_eq!(axis.weight_noise_factor(), 1.0);
    }

    #[test]
    fn test_tapered_weight_factor_exceeds_unity() {
        let axis = GridAxis {
            wgt_funct: Some(vec![0.5, 1.0, 1.0, 0.5]),
            imp_resp_bw: 1.0,
            k_ctr: None,
            delta_k_coa_const: 0.0,
        };
        // mean 0.75, var 0.0625
        assert_relative_eq!(axis.weight_noise_factor(), 1.0 + 0.0625 / 0.5625);
    }
}
