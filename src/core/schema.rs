use crate::types::{MetaError, MetaResult};

/// Numeric text format declared per field.
///
/// `Dec(n)` emits fixed decimal notation with `n` fractional digits (never
/// scientific). `Sig(n)` emits `n` significant digits, switching to
/// scientific notation for very large or very small magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumFormat {
    Dec(u32),
    Sig(u32),
}

impl NumFormat {
    pub fn format(&self, value: f64) -> String {
        match *self {
            NumFormat::Dec(digits) => format!("{:.*}", digits as usize, value),
            NumFormat::Sig(digits) => format_sig(value, digits),
        }
    }
}

/// Format a value with the given number of significant digits, in the manner
/// of the `%G` printf conversion: plain decimal when the exponent is small,
/// scientific otherwise, with trailing zeros trimmed.
pub fn format_sig(value: f64, sig: u32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let sig = sig.max(1) as i32;
    let exp = value.abs().log10().floor() as i32;
    if exp < -4 || exp >= sig {
        let formatted = format!("{:.*e}", (sig - 1) as usize, value);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                format!("{}e{}", trim_trailing_zeros(mantissa), exponent)
            }
            None => formatted,
        }
    } else {
        let decimals = (sig - 1 - exp).max(0) as usize;
        trim_trailing_zeros(&format!("{:.*}", decimals, value))
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Wrap a value into the symmetric modular range `(-limit, limit]`.
///
/// A longitude of 190 with limit 180 stores as -170; exactly 180 stays 180.
pub fn wrap_modular(value: f64, limit: f64) -> f64 {
    let span = 2.0 * limit;
    let mut v = (value + limit) % span;
    if v <= 0.0 {
        v += span;
    }
    v - limit
}

/// How array element indices are assigned and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Plain 0-based integer position.
    ZeroBased,
    /// 1-based integer position, the SICD convention for vertex arrays.
    OneBased,
    /// The four fixed clockwise corner-point labels.
    CornerStrings,
}

/// Clockwise corner labels for image corner-point arrays.
pub const CORNER_LABELS: [&str; 4] = ["1:FRFC", "2:FRLC", "3:LRLC", "4:LRFC"];

/// The declared kind of a schema field. Each kind carries its own
/// conversion, validation, and serialization behavior.
#[derive(Debug)]
pub enum FieldKind {
    /// Unbounded float with a declared text format.
    Double { format: NumFormat },
    /// Float restricted to a closed range.
    BoundedDouble {
        min: f64,
        max: f64,
        format: NumFormat,
    },
    /// Float wrapped into `(-limit, limit]` rather than rejected.
    ModularDouble { limit: f64, format: NumFormat },
    /// Integer, optionally range-bounded (bounds inclusive).
    Int { bounds: Option<(i64, i64)> },
    /// Free-form string.
    Text,
    /// String restricted to a declared value set; matching is
    /// case-insensitive and canonicalized to the declared casing.
    EnumText { values: &'static [&'static str] },
    /// One-variable polynomial (custom node shape).
    Poly1d,
    /// Two-variable polynomial (custom node shape).
    Poly2d,
    /// Per-axis X/Y/Z polynomial triple.
    XyzPoly,
    /// Scene center point with paired ECF/geodetic representations.
    Scp,
    /// Nested object with its own schema.
    Nested { schema: &'static Schema },
    /// Ordered array of nested objects, serialized as repeated children.
    Array {
        elem: &'static Schema,
        child_tag: &'static str,
        min_len: usize,
        index: IndexKind,
    },
    /// Ordered name/value string pairs, serialized as repeated children
    /// carrying a `name` attribute.
    Params { child_tag: &'static str },
}

impl FieldKind {
    /// Whether values of this kind serialize as short scalar text (and so
    /// may be carried in an XML attribute).
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::Double { .. }
                | FieldKind::BoundedDouble { .. }
                | FieldKind::ModularDouble { .. }
                | FieldKind::Int { .. }
                | FieldKind::Text
                | FieldKind::EnumText { .. }
        )
    }

    /// Validate (and where declared, coerce) a scalar value.
    pub fn check_double(&self, field: &str, value: f64) -> MetaResult<f64> {
        match *self {
            FieldKind::Double { .. } => Ok(value),
            FieldKind::BoundedDouble { min, max, .. } => {
                if value < min || value > max {
                    Err(MetaError::RangeViolation {
                        field: field.to_string(),
                        value,
                        min,
                        max,
                    })
                } else {
                    Ok(value)
                }
            }
            FieldKind::ModularDouble { limit, .. } => Ok(wrap_modular(value, limit)),
            _ => Err(MetaError::type_mismatch(field, "field is not a float kind")),
        }
    }

    pub fn check_int(&self, field: &str, value: i64) -> MetaResult<i64> {
        match *self {
            FieldKind::Int { bounds } => match bounds {
                Some((min, max)) if value < min || value > max => {
                    Err(MetaError::RangeViolation {
                        field: field.to_string(),
                        value: value as f64,
                        min: min as f64,
                        max: max as f64,
                    })
                }
                _ => Ok(value),
            },
            _ => Err(MetaError::type_mismatch(
                field,
                "field is not an integer kind",
            )),
        }
    }

    /// Canonicalize a string against the declared value set.
    pub fn check_text(&self, field: &str, value: &str) -> MetaResult<String> {
        match *self {
            FieldKind::Text => Ok(value.to_string()),
            FieldKind::EnumText { values } => values
                .iter()
                .find(|v| v.eq_ignore_ascii_case(value))
                .map(|v| v.to_string())
                .ok_or_else(|| MetaError::InvalidEnumValue {
                    field: field.to_string(),
                    value: value.to_string(),
                }),
            _ => Err(MetaError::type_mismatch(field, "field is not a text kind")),
        }
    }

    /// Numeric format for this kind, when one is declared.
    pub fn format(&self) -> Option<NumFormat> {
        match *self {
            FieldKind::Double { format }
            | FieldKind::BoundedDouble { format, .. }
            | FieldKind::ModularDouble { format, .. } => Some(format),
            _ => None,
        }
    }
}

/// One named field of an object schema.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Scalar fields marked true serialize as XML attributes of the parent
    /// element instead of child elements.
    pub attribute: bool,
}

/// A declared set of mutually exclusive optional fields.
#[derive(Debug)]
pub struct ChoiceSpec {
    pub required: bool,
    pub members: &'static [&'static str],
}

/// Static schema for one object-model type: the ordered field list plus
/// choice-group declarations. Serialization walks `fields` in order.
#[derive(Debug)]
pub struct Schema {
    pub tag: &'static str,
    pub fields: &'static [FieldSpec],
    pub choices: &'static [ChoiceSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modular_wrap() {
        assert_eq!(wrap_modular(190.0, 180.0), -170.0);
        assert_eq!(wrap_modular(180.0, 180.0), 180.0);
        assert_eq!(wrap_modular(-190.0, 180.0), 170.0);
        assert_eq!(wrap_modular(45.0, 180.0), 45.0);
        assert_eq!(wrap_modular(100.0, 90.0), -80.0);
    }

    #[test]
    fn test_enum_canonicalization() {
        let kind = FieldKind::EnumText {
            values: &["ABSOLUTE", "RELATIVE"],
        };
        assert_eq!(kind.check_text("t", "relative").unwrap(), "RELATIVE");
        assert_eq!(kind.check_text("t", "ABSOLUTE").unwrap(), "ABSOLUTE");
        assert!(matches!(
            kind.check_text("t", "UNKNOWN"),
            Err(MetaError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_bounded_double() {
        let kind = FieldKind::BoundedDouble {
            min: -90.0,
            max: 90.0,
            format: NumFormat::Dec(8),
        };
        assert_eq!(kind.check_double("Lat", 45.0).unwrap(), 45.0);
        assert!(matches!(
            kind.check_double("Lat", 91.0),
            Err(MetaError::RangeViolation { .. })
        ));
    }

    #[test]
    fn test_bounded_int() {
        let kind = FieldKind::Int {
            bounds: Some((1, 4)),
        };
        assert_eq!(kind.check_int("index", 3).unwrap(), 3);
        assert!(kind.check_int("index", 5).is_err());
    }

    #[test]
    fn test_format_dec() {
        assert_eq!(NumFormat::Dec(4).format(1.0), "1.0000");
        assert_eq!(NumFormat::Dec(8).format(-12.5), "-12.50000000");
    }

    #[test]
    fn test_format_sig() {
        assert_eq!(format_sig(0.0, 10), "0");
        assert_eq!(format_sig(1.5, 10), "1.5");
        assert_eq!(format_sig(-2.25, 10), "-2.25");
        assert_eq!(format_sig(123456.0, 10), "123456");
        // ten significant digits survive a text round trip
        let v = 0.000123456789123;
        let parsed: f64 = format_sig(v, 10).parse().unwrap();
        assert!((parsed - v).abs() / v < 1e-9);
        // large magnitudes switch to scientific notation
        let big = 1.25e15;
        let text = format_sig(big, 10);
        assert!(text.contains('e'));
        assert_eq!(text.parse::<f64>().unwrap(), big);
    }
}
