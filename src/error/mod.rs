use thiserror::Error;

#[derive(Error, Debug)]
pub enum BodyCompError {
    /// A cohort vector or forcing matrix does not match the cohort size
    #[error("Dimension mismatch in {field}: expected {expected}, found {found}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// Invalid parameter value
    #[error("Invalid parameter: {param} = {value}")]
    InvalidParameter { param: String, value: String },

    /// The integrator requested a forcing row the table does not hold
    #[error("Forcing row {index} requested but the table only has {rows} rows")]
    ForcingOutOfBounds { index: usize, rows: usize },

    #[error("Unsupported interpolation mode: {0}")]
    UnsupportedInterpolation(String),

    #[error("Invalid breakpoints: {reason}")]
    InvalidBreakpoints { reason: String },

    #[error("Error writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error serializing to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl BodyCompError {
    pub(crate) fn mismatch(field: impl Into<String>, expected: usize, found: usize) -> Self {
        BodyCompError::DimensionMismatch {
            field: field.into(),
            expected,
            found,
        }
    }

    pub(crate) fn invalid(param: impl Into<String>, value: impl ToString) -> Self {
        BodyCompError::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
        }
    }
}
