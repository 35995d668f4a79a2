use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("invalid retry policy: {msg}")]
    InvalidPolicy { msg: String },
}

/// derive_builder reports missing fields and failed validation as plain strings.
impl From<String> for PolicyError {
    fn from(msg: String) -> Self {
        PolicyError::InvalidPolicy { msg }
    }
}
