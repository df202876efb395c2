use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Innovation covariance is not invertible")]
    SingularInnovation,

    #[error("Assignment Error: {0}")]
    Assignment(String),
}

impl Error {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
