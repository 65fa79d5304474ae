use thiserror::Error;

#[derive(Debug, Error)]
pub enum BizMetricsError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BizMetricsError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        BizMetricsError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BizMetricsError {
    fn from(e: serde_json::Error) -> Self {
        BizMetricsError::SerializationError(e.to_string())
    }
}
