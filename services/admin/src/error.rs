//! services/admin/src/error.rs
//!
//! Defines the primary error type for the admin client.

use crate::config::ConfigError;
use payjobber_admin_core::ports::PortError;
use payjobber_admin_core::upload::ValidationError;

/// The primary error type for the `admin` service.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Input refused locally, before any request was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Represents a standard Input/Output error (e.g., reading the selected file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdminError {
    /// The status line an operator sees for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AdminError::Port(PortError::Unauthorized) => {
                "Session expired. Please log in again.".to_string()
            }
            AdminError::Port(PortError::Forbidden) => {
                "You do not have permission to perform this action.".to_string()
            }
            AdminError::Port(PortError::Unreachable(_)) => {
                "Could not reach the server. Check the API URL.".to_string()
            }
            AdminError::Port(PortError::Rejected { status, detail }) => match detail {
                Some(detail) => detail.clone(),
                None => format!("The server could not complete the request (status {}).", status),
            },
            AdminError::Port(PortError::Storage(_)) => {
                "Local session storage is unavailable.".to_string()
            }
            AdminError::Port(PortError::Unexpected(_)) => {
                "Unexpected response from the server.".to_string()
            }
            AdminError::Validation(err) => err.to_string(),
            AdminError::Io(err) => format!("Could not access the file: {}", err),
            AdminError::Config(err) => err.to_string(),
        }
    }

    /// True when the failure means the stored session is no longer valid.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, AdminError::Port(PortError::Unauthorized))
    }
}
