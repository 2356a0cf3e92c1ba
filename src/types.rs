use serde::{Deserialize, Serialize};

/// Validation policy selected at construction time.
///
/// Strict mode fails fast on bad field values and refuses to serialize an
/// invalid object graph. Lenient mode logs the problem, nulls the offending
/// field, and keeps going with whatever is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationMode {
    #[default]
    Strict,
    Lenient,
}

impl ValidationMode {
    pub fn is_strict(self) -> bool {
        self == ValidationMode::Strict
    }
}

/// Error types for metadata model operations
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("type mismatch for field '{field}': {detail}")]
    TypeMismatch { field: String, detail: String },

    #[error("value {value} for field '{field}' is outside bounds [{min}, {max}]")]
    RangeViolation {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid value '{value}' for enum field '{field}'")]
    InvalidEnumValue { field: String, value: String },

    #[error("required field '{0}' is missing")]
    MissingRequiredField(String),

    #[error("array field '{field}' has {actual} elements, minimum is {minimum}")]
    ArrayLengthViolation {
        field: String,
        actual: usize,
        minimum: usize,
    },

    #[error("choice fields {0:?} are simultaneously populated")]
    ChoiceViolation(Vec<String>),

    #[error("validation error: {0}")]
    Validation(Box<MetaError>),

    #[error("no field '{0}' in schema")]
    UnknownField(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),
}

impl MetaError {
    pub(crate) fn type_mismatch(field: &str, detail: impl Into<String>) -> Self {
        MetaError::TypeMismatch {
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result type for metadata model operations
pub type MetaResult<T> = Result<T, MetaError>;
