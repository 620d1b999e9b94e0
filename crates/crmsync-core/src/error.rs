//! Error types for crmsync-core

use thiserror::Error;

use crate::client::RemoteOperation;
use crate::sync::SyncStage;

/// Result type alias for crmsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in crmsync-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration, mapping, or identifying value
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of what's invalid
        message: String,
    },

    /// A search, create, or update call against the CRM failed
    #[error("{operation} request failed: {message}")]
    RemoteApi {
        /// Which remote call failed
        operation: RemoteOperation,
        /// Remote-reported or transport error message
        message: String,
    },

    /// A sync pipeline stage failed
    #[error("{}: {}", .stage.context(), .source)]
    Orchestration {
        /// Stage that failed
        stage: SyncStage,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Template rendering error
    #[error("template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Configuration`] from a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Build a [`Error::RemoteApi`] for the given operation
    pub fn remote(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            operation,
            message: message.into(),
        }
    }

    /// Wrap this error with the pipeline stage it occurred in
    pub fn at_stage(self, stage: SyncStage) -> Self {
        Self::Orchestration {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage wrapping
    pub fn root(&self) -> &Error {
        match self {
            Self::Orchestration { source, .. } => source.root(),
            other => other,
        }
    }

    /// The pipeline stage that failed, if this error came out of a sync run
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            Self::Orchestration { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the mapping, input data, or config file must be fixed
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root(),
            Self::Configuration { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::TemplateError(_)
        )
    }

    /// Whether the CRM rejected a call or could not be reached
    pub fn is_remote(&self) -> bool {
        matches!(self.root(), Self::RemoteApi { .. })
    }
}
