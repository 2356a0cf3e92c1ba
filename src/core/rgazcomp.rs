//! Range/azimuth compensation block: the azimuth scale factor and the
//! slow-time to azimuth-frequency polynomial, derivable from collection
//! geometry and the pulse timeline.

use crate::core::model::{FieldValue, Object};
use crate::core::poly::Poly1d;
use crate::core::scene::{Grid, ScpCoa, Timeline};
use crate::core::schema::{FieldKind, FieldSpec, NumFormat, Schema};
use crate::io::xml::XmlElement;
use crate::types::{MetaResult, ValidationMode};
use serde_json::Value;

/// Agreement tolerance between a populated azimuth scale factor and the
/// value recomputed from geometry.
const AZ_SF_TOLERANCE: f64 = 1e-3;

pub static RG_AZ_COMP: Schema = Schema {
    tag: "RgAzComp",
    fields: &[
        FieldSpec {
            name: "AzSF",
            kind: FieldKind::Double {
                format: NumFormat::Sig(10),
            },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "KazPoly",
            kind: FieldKind::Poly1d,
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

#[derive(Debug, Clone, PartialEq)]
pub struct RgAzComp {
    obj: Object,
}

impl RgAzComp {
    pub fn new() -> RgAzComp {
        RgAzComp::with_mode(ValidationMode::Strict)
    }

    pub fn with_mode(mode: ValidationMode) -> RgAzComp {
        RgAzComp {
            obj: Object::with_mode(&RG_AZ_COMP, mode),
        }
    }

    pub fn object(&self) -> &Object {
        &self.obj
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    pub fn az_sf(&self) -> Option<f64> {
        self.obj.get_double("AzSF")
    }

    pub fn kaz_poly(&self) -> Option<&Poly1d> {
        self.obj.get_poly1("KazPoly")
    }

    /// Fill absent members from collection geometry and timing.
    ///
    /// The azimuth scale factor is `-look * sin(cone) / slant_range` with
    /// `look` being -1 right-looking and +1 left-looking. A populated
    /// value is never overwritten; disagreement with the recomputed one
    /// beyond tolerance is logged. The azimuth-frequency polynomial is
    /// the IPP polynomial scaled by
    /// `look * krg_coa * |ARP vel| * sin(cone) / (slant_range * st_rate)`
    /// where `krg_coa` is the row spatial-frequency center plus its
    /// constant center-of-aperture offset and `st_rate` is the pulse
    /// rate at scene-center time.
    pub fn derive_parameters(
        &mut self,
        grid: &Grid,
        timeline: &Timeline,
        scpcoa: &ScpCoa,
    ) -> MetaResult<()> {
        let look = scpcoa.side_of_track.look();
        let cone_sin = scpcoa.doppler_cone_ang.to_radians().sin();
        let az_sf = -look * cone_sin / scpcoa.slant_range;
        match self.az_sf() {
            None => self.obj.set("AzSF", FieldValue::Double(az_sf))?,
            Some(existing) => {
                if (existing - az_sf).abs() > AZ_SF_TOLERANCE {
                    log::warn!(
                        "populated AzSF {} disagrees with geometry-derived value {}",
                        existing,
                        az_sf
                    );
                }
            }
        }

        if self.kaz_poly().is_none() {
            let (Some(k_ctr), Some(ipp_poly)) = (grid.row.k_ctr, timeline.ipp_poly.as_ref())
            else {
                log::debug!("KazPoly left unset: row KCtr or IPP polynomial unavailable");
                return Ok(());
            };
            let st_rate_coa = ipp_poly.derivative_eval(scpcoa.scp_time, 1);
            if st_rate_coa == 0.0 {
                log::warn!("KazPoly left unset: pulse rate is zero at scene-center time");
                return Ok(());
            }
            let krg_coa = k_ctr + grid.row.delta_k_coa_const;
            let factor = look * krg_coa * scpcoa.arp_speed() * cone_sin
                / (scpcoa.slant_range * st_rate_coa);
            self.obj
                .set("KazPoly", FieldValue::Poly1d(ipp_poly.scaled(factor)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> MetaResult<()> {
        self.obj.validate()
    }

    pub fn to_node(&self) -> MetaResult<XmlElement> {
        self.obj.to_node_tagged("RgAzComp")
    }

    pub fn from_node(node: &XmlElement, mode: ValidationMode) -> MetaResult<RgAzComp> {
        Ok(RgAzComp {
            obj: Object::from_node(&RG_AZ_COMP, node, mode)?,
        })
    }

    pub fn to_map(&self) -> MetaResult<Value> {
        self.obj.to_map()
    }

    pub fn from_map(value: &Value, mode: ValidationMode) -> MetaResult<RgAzComp> {
        Ok(RgAzComp {
            obj: Object::from_map(&RG_AZ_COMP, value, mode)?,
        })
    }
}

impl Default for RgAzComp {
    fn default() -> Self {
        RgAzComp::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::{GridAxis, SideOfTrack};
    use approx::assert_relative_eq;

    fn context() -> (Grid, Timeline, ScpCoa) {
        let axis = |k_ctr: Option<f64>| GridAxis {
            wgt_funct: None,
            imp_resp_bw: 1.0,
            k_ctr,
            delta_k_coa_const: 0.5,
        };
        let grid = Grid {
            row: axis(Some(10.0)),
            col: axis(None),
        };
        let timeline = Timeline {
            // 2000 pulses/s plus a slow drift
            ipp_poly: Some(Poly1d::from_coefs(vec![0.0, 2000.0, 1.0])),
        };
        let scpcoa = ScpCoa {
            side_of_track: SideOfTrack::Right,
            slope_ang: 30.0,
            graze_ang: 25.0,
            doppler_cone_ang: 90.0,
            slant_range: 800_000.0,
            scp_time: 2.0,
            arp_vel: [7000.0, 0.0, 0.0],
        };
        (grid, timeline, scpcoa)
    }

    #[test]
    fn test_az_sf_sign_follows_look() {
        let (grid, timeline, mut scpcoa) = context();
        let mut comp = RgAzComp::new();
        comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();
        // right-looking: -(-1) * sin(90) / 800 km
        assert_relative_eq!(comp.az_sf().unwrap(), 1.0 / 800_000.0);

        scpcoa.side_of_track = SideOfTrack::Left;
        let mut comp = RgAzComp::new();
        comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();
        assert_relative_eq!(comp.az_sf().unwrap(), -1.0 / 800_000.0);
    }

    #[test]
    fn test_populated_az_sf_not_overwritten() {
        let (grid, timeline, scpcoa) = context();
        let mut comp = RgAzComp::new();
        comp.object_mut()
            .set("AzSF", FieldValue::Double(0.125))
            .unwrap();
        comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();
        assert_eq!(comp.az_sf(), Some(0.125));
    }

    #[test]
    fn test_kaz_poly_scaling() {
        let (grid, timeline, scpcoa) = context();
        let mut comp = RgAzComp::new();
        comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();

        let st_rate = 2000.0 + 2.0 * 2.0; // d/dt(2000 t + t^2) at t = 2
        let factor = -1.0 * 10.5 * 7000.0 * 1.0 / (800_000.0 * st_rate);
        let kaz = comp.kaz_poly().unwrap();
        assert_relative_eq!(kaz.eval(1.0), (2000.0 + 1.0) * factor);
    }

    #[test]
    fn test_kaz_poly_needs_timing() {
        let (grid, _, scpcoa) = context();
        let mut comp = RgAzComp::new();
        comp.derive_parameters(&grid, &Timeline::default(), &scpcoa)
            .unwrap();
        assert!(comp.kaz_poly().is_none());
        // AzSF still derivable from geometry alone
        assert!(comp.az_sf().is_some());
    }

    #[test]
    fn test_derive_then_roundtrip() {
        let (grid, timeline, scpcoa) = context();
        let mut comp = RgAzComp::new();
        comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();
        assert!(comp.validate().is_ok());

        let map = comp.to_map().unwrap();
        let back = RgAzComp::from_map(&map, ValidationMode::Strict).unwrap();
        assert_eq!(back, comp);
    }
}
