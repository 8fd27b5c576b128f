use crate::problem::Problem;
use thiserror::Error;

/// Infrastructure errors raised outside the provisioning engine: configuration
/// loading, descriptor decoding and diagnostic serialization.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("The descriptor is not a valid component descriptor: {0}")]
    DescriptorError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<config::ConfigError> for ProvisionerError {
    fn from(error: config::ConfigError) -> Self {
        ProvisionerError::ConfigurationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for ProvisionerError {
    fn from(error: serde_yaml::Error) -> Self {
        ProvisionerError::DescriptorError(error.to_string())
    }
}

impl From<serde_json::Error> for ProvisionerError {
    fn from(error: serde_json::Error) -> Self {
        ProvisionerError::SerializationError(error.to_string())
    }
}

/// Crossing into the engine keeps the error as the problem's cause
impl From<ProvisionerError> for Problem {
    fn from(error: ProvisionerError) -> Self {
        Problem::from_error(error)
    }
}

pub type Result<T> = std::result::Result<T, ProvisionerError>;
