use thiserror::Error;

use crate::adapters::gateway::GatewayError;
use crate::adapters::state_store::StateStoreError;
use crate::app::reports::ExportError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to initialize state store: {0}")]
    StateStore(#[from] StateStoreError),
    #[error("remote data gateway failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("runtime failure: {0}")]
    Runtime(String),
}

impl AppError {
    pub fn logging_init<E: std::fmt::Display>(error: E) -> Self {
        Self::LoggingInit(error.to_string())
    }

    pub fn config<E: std::fmt::Display>(error: E) -> Self {
        Self::Config(error.to_string())
    }

    pub fn runtime<E: std::fmt::Display>(error: E) -> Self {
        Self::Runtime(error.to_string())
    }
}
