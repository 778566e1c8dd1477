use crate::domain::ProtocolDesyncError;
use crate::frameworks::config::ConfigurationError;
use crate::interface_adapters::net::ConnectionError;
use thiserror::Error;

/// Fatal errors that end the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    ProtocolDesync(#[from] ProtocolDesyncError),
    #[error("runtime task failed")]
    Task(#[from] tokio::task::JoinError),
}
