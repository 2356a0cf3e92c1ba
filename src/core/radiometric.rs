//! Radiometric calibration block: thermal noise level and the family of
//! pixel-power scale-factor polynomials (RCS, sigma-0, beta-0, gamma-0),
//! with a consistency pass that fills absent members from whichever one
//! is populated.

use crate::core::model::{FieldValue, Object};
use crate::core::poly::Poly2d;
use crate::core::scene::{Grid, ScpCoa};
use crate::core::schema::{FieldKind, FieldSpec, Schema};
use crate::io::xml::XmlElement;
use crate::types::{MetaError, MetaResult, ValidationMode};
use serde_json::Value;

/// Thermal noise reference: an absolute/relative classification label
/// and the noise polynomial over image coordinates.
pub static NOISE_LEVEL: Schema = Schema {
    tag: "NoiseLevel",
    fields: &[
        FieldSpec {
            name: "NoiseLevelType",
            kind: FieldKind::EnumText {
                values: &["ABSOLUTE", "RELATIVE"],
            },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "NoisePoly",
            kind: FieldKind::Poly2d,
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

pub static RADIOMETRIC: Schema = Schema {
    tag: "Radiometric",
    fields: &[
        FieldSpec {
            name: "NoiseLevel",
            kind: FieldKind::Nested {
                schema: &NOISE_LEVEL,
            },
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "RCSSFPoly",
            kind: FieldKind::Poly2d,
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "SigmaZeroSFPoly",
            kind: FieldKind::Poly2d,
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "BetaZeroSFPoly",
            kind: FieldKind::Poly2d,
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "GammaZeroSFPoly",
            kind: FieldKind::Poly2d,
            required: false,
            attribute: false,
        },
    ],
    choices: &[],
};

/// Classify a noise polynomial: a unit constant term marks the
/// polynomial as relative to the scene-center noise level, anything
/// else (including an empty coefficient matrix) is an absolute power
/// level.
fn classify_noise(poly: &Poly2d) -> &'static str {
    match poly.coefs().get([0, 0]) {
        Some(&c) if c == 1.0 => "RELATIVE",
        _ => "ABSOLUTE",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Radiometric {
    obj: Object,
}

impl Radiometric {
    pub fn new() -> Radiometric {
        Radiometric::with_mode(ValidationMode::Strict)
    }

    pub fn with_mode(mode: ValidationMode) -> Radiometric {
        Radiometric {
            obj: Object::with_mode(&RADIOMETRIC, mode),
        }
    }

    pub fn object(&self) -> &Object {
        &self.obj
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    /// Install the noise block. With no explicit label the polynomial is
    /// classified from its constant term.
    pub fn set_noise_level(&mut self, label: Option<&str>, poly: Poly2d) -> MetaResult<()> {
        let label = label.unwrap_or_else(|| classify_noise(&poly));
        let mut noise = Object::with_mode(&NOISE_LEVEL, self.obj.mode());
        noise.set("NoiseLevelType", FieldValue::Text(label.to_string()))?;
        noise.set("NoisePoly", FieldValue::Poly2d(poly))?;
        self.obj.set("NoiseLevel", FieldValue::Object(noise))
    }

    pub fn noise_level(&self) -> Option<&Object> {
        self.obj.get_object("NoiseLevel")
    }

    /// Label an unlabeled noise polynomial from its constant term. Runs on
    /// every construction path, so parsed documents carrying a bare
    /// `NoisePoly` are healed before validation can see the missing label.
    fn label_noise_level(&mut self) -> MetaResult<()> {
        let Some(noise) = self.obj.get_object("NoiseLevel") else {
            return Ok(());
        };
        if noise.get_text("NoiseLevelType").is_some() {
            return Ok(());
        }
        let Some(poly) = noise.get_poly2("NoisePoly") else {
            return Ok(());
        };
        let label = classify_noise(poly);
        let mut noise = noise.clone();
        noise.set("NoiseLevelType", FieldValue::Text(label.to_string()))?;
        self.obj.set("NoiseLevel", FieldValue::Object(noise))
    }

    pub fn rcs_sf_poly(&self) -> Option<&Poly2d> {
        self.obj.get_poly2("RCSSFPoly")
    }

    pub fn sigma_zero_sf_poly(&self) -> Option<&Poly2d> {
        self.obj.get_poly2("SigmaZeroSFPoly")
    }

    pub fn beta_zero_sf_poly(&self) -> Option<&Poly2d> {
        self.obj.get_poly2("BetaZeroSFPoly")
    }

    pub fn gamma_zero_sf_poly(&self) -> Option<&Poly2d> {
        self.obj.get_poly2("GammaZeroSFPoly")
    }

    pub fn set_sf_poly(&mut self, name: &str, poly: Poly2d) -> MetaResult<()> {
        self.obj.set(name, FieldValue::Poly2d(poly))
    }

    /// Fill absent fields from whichever members are populated, using the
    /// scene-center geometry. An unlabeled noise polynomial is classified
    /// first; with no scale-factor polynomial populated the rest of the
    /// pass is a no-op.
    ///
    /// The slant-plane pixel area is
    /// `area_sp = (wgt_f_rg * wgt_f_az) / (Row.ImpRespBW * Col.ImpRespBW)`
    /// where each `wgt_f` is the weighting noise factor of its axis. The
    /// beta-0 polynomial is recovered first (sources in priority order:
    /// RCS / area_sp, sigma-0 / cos(slope), gamma-0 * sin(graze) /
    /// cos(slope)), then the remaining members follow from it. Populated
    /// fields are never overwritten, so the pass is idempotent.
    pub fn derive_parameters(&mut self, grid: &Grid, scpcoa: &ScpCoa) -> MetaResult<()> {
        self.label_noise_level()?;

        if self.beta_zero_sf_poly().is_none()
            && self.rcs_sf_poly().is_none()
            && self.sigma_zero_sf_poly().is_none()
            && self.gamma_zero_sf_poly().is_none()
        {
            return Ok(());
        }

        let area_sp = grid.row.weight_noise_factor() * grid.col.weight_noise_factor()
            / (grid.row.imp_resp_bw * grid.col.imp_resp_bw);
        if !area_sp.is_finite() || area_sp <= 0.0 {
            return Err(MetaError::type_mismatch(
                "Radiometric",
                "impulse response bandwidths yield no valid pixel area",
            ));
        }
        let slope_cos = scpcoa.slope_ang.to_radians().cos();
        let graze_sin = scpcoa.graze_ang.to_radians().sin();

        if self.beta_zero_sf_poly().is_none() {
            let beta = if let Some(rcs) = self.rcs_sf_poly() {
                Some(rcs.scaled(1.0 / area_sp))
            } else if let Some(sigma) = self.sigma_zero_sf_poly() {
                Some(sigma.scaled(1.0 / slope_cos))
            } else {
                self.gamma_zero_sf_poly()
                    .map(|gamma| gamma.scaled(graze_sin / slope_cos))
            };
            if let Some(beta) = beta {
                self.obj.set("BetaZeroSFPoly", FieldValue::Poly2d(beta))?;
            }
        }

        if let Some(beta) = self.beta_zero_sf_poly().cloned() {
            if self.rcs_sf_poly().is_none() {
                self.obj
                    .set("RCSSFPoly", FieldValue::Poly2d(beta.scaled(area_sp)))?;
            }
            if self.sigma_zero_sf_poly().is_none() {
                self.obj.set(
                    "SigmaZeroSFPoly",
                    FieldValue::Poly2d(beta.scaled(slope_cos)),
                )?;
            }
            if self.gamma_zero_sf_poly().is_none() {
                self.obj.set(
                    "GammaZeroSFPoly",
                    FieldValue::Poly2d(beta.scaled(slope_cos / graze_sin)),
                )?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> MetaResult<()> {
        self.obj.validate()
    }

    pub fn to_node(&self) -> MetaResult<XmlElement> {
        self.obj.to_node_tagged("Radiometric")
    }

    pub fn from_node(node: &XmlElement, mode: ValidationMode) -> MetaResult<Radiometric> {
        let mut rad = Radiometric {
            obj: Object::from_node(&RADIOMETRIC, node, mode)?,
        };
        rad.label_noise_level()?;
        Ok(rad)
    }

    pub fn to_map(&self) -> MetaResult<Value> {
        self.obj.to_map()
    }

    pub fn from_map(value: &Value, mode: ValidationMode) -> MetaResult<Radiometric> {
        let mut rad = Radiometric {
            obj: Object::from_map(&RADIOMETRIC, value, mode)?,
        };
        rad.label_noise_level()?;
        Ok(rad)
    }
}

impl Default for Radiometric {
    fn default() -> Self {
        Radiometric::new()
    }
}
