//! crates/payjobber_admin_core/src/ports.rs
//!
//! Defines the service contracts (traits) the admin flows depend on.
//! The backend API and the local key-value store sit behind these traits so
//! the flows never see HTTP or file-system details.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{
    Credentials, DocumentType, PolicyAcceptanceRecord, Session, UploadFile, UploadHistory,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The backend answered 401: the credentials or token are not valid.
    #[error("Unauthorized")]
    Unauthorized,
    /// The backend answered 403.
    #[error("Forbidden")]
    Forbidden,
    /// No response was received at all.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    /// Any other non-success status.
    #[error("Backend rejected the request with status {status}")]
    Rejected { status: u16, detail: Option<String> },
    /// The local key-value store could not be read or written.
    #[error("Storage unavailable: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The backend-provided detail text, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            PortError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Receives upload progress as a percentage in `0..=100`.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AdminBackend: Send + Sync {
    // --- Auth ---
    async fn login(&self, credentials: &Credentials) -> PortResult<Session>;

    // --- Availability uploads ---
    /// Sends the file as multipart form data; returns the backend message.
    async fn upload_multipart(
        &self,
        file: &UploadFile,
        token: Option<&str>,
        progress: ProgressSink,
    ) -> PortResult<Option<String>>;

    /// Sends the file base64-encoded inside a JSON body.
    async fn upload_base64(&self, file: &UploadFile, token: Option<&str>)
        -> PortResult<Option<String>>;

    // --- History ---
    async fn upload_history(&self, token: Option<&str>) -> PortResult<UploadHistory>;

    async fn download_annotated(&self, upload_id: &str, token: Option<&str>) -> PortResult<Vec<u8>>;

    async fn policy_history(
        &self,
        document_type: DocumentType,
        document_number: &str,
        token: Option<&str>,
    ) -> PortResult<Vec<PolicyAcceptanceRecord>>;
}

/// A string key-value store that survives between runs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn remove(&self, key: &str) -> PortResult<()>;
}
