//! services/admin/src/flows/history.rs
//!
//! Read-only history views: past availability uploads (with the annotated
//! spreadsheet download) and policy acceptance events per document holder.

use crate::error::AdminError;
use crate::flows::session::SessionStore;
use crate::flows::state::AppState;
use payjobber_admin_core::domain::{
    DocumentType, PolicyAcceptanceRecord, StatusMessage, UploadHistory,
};
use payjobber_admin_core::ports::{AdminBackend, PortError};
use payjobber_admin_core::upload::ValidationError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Local file name for the annotated spreadsheet of an upload.
pub fn download_file_name(upload_id: &str) -> String {
    let safe: String = upload_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("retiros_anotado_{}.xlsx", safe)
}

//=========================================================================================
// Upload History
//=========================================================================================

pub struct UploadHistoryView {
    backend: Arc<dyn AdminBackend>,
    session: SessionStore,
    download_dir: PathBuf,
}

impl UploadHistoryView {
    pub fn new(state: &AppState) -> Self {
        Self {
            backend: state.backend.clone(),
            session: state.session.clone(),
            download_dir: state.config.download_dir.clone(),
        }
    }

    /// Fetches the operator's upload history. Nothing is cached between loads.
    pub async fn load(&self) -> Result<UploadHistory, AdminError> {
        let token = self.session.token();
        let history = self
            .backend
            .upload_history(token.as_deref())
            .await
            .map_err(|e| self.failed("load the upload history", e))?;
        info!(entries = history.entries.len(), "Upload history loaded");
        Ok(history)
    }

    /// Downloads the annotated spreadsheet for `upload_id` and saves it in
    /// the download directory. Returns the saved path.
    pub async fn download(&self, upload_id: &str) -> Result<PathBuf, AdminError> {
        let token = self.session.token();
        let bytes = self
            .backend
            .download_annotated(upload_id, token.as_deref())
            .await
            .map_err(|e| self.failed("download the annotated file", e))?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(download_file_name(upload_id));
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "Annotated file saved");
        Ok(path)
    }

    fn failed(&self, action: &str, err: PortError) -> AdminError {
        error!("Could not {}: {:?}", action, err);
        self.session.observe_failure(&err);
        err.into()
    }
}

//=========================================================================================
// Policy Acceptance History
//=========================================================================================

/// Result of one policy history query.
#[derive(Debug, Clone)]
pub struct PolicyHistory {
    pub records: Vec<PolicyAcceptanceRecord>,
    /// Set when there is nothing to show.
    pub message: Option<StatusMessage>,
}

pub struct PolicyHistoryView {
    backend: Arc<dyn AdminBackend>,
    session: SessionStore,
}

impl PolicyHistoryView {
    pub fn new(state: &AppState) -> Self {
        Self {
            backend: state.backend.clone(),
            session: state.session.clone(),
        }
    }

    pub async fn query(
        &self,
        document_type: DocumentType,
        document_number: &str,
    ) -> Result<PolicyHistory, AdminError> {
        let document_number = document_number.trim();
        if document_number.is_empty() {
            return Err(ValidationError::MissingInput(
                "Please enter a document number".to_string(),
            )
            .into());
        }

        let token = self.session.token();
        let records = self
            .backend
            .policy_history(document_type, document_number, token.as_deref())
            .await
            .map_err(|e| {
                error!("Could not load the policy history: {:?}", e);
                self.session.observe_failure(&e);
                AdminError::from(e)
            })?;

        info!(%document_type, records = records.len(), "Policy history loaded");
        let message = records
            .is_empty()
            .then(|| StatusMessage::info("No records found in the history"));
        Ok(PolicyHistory { records, message })
    }
}
