//! services/admin/src/flows/upload.rs
//!
//! The availability upload flow: select a spreadsheet, validate it locally,
//! send it, and report progress and the outcome.

use crate::error::AdminError;
use crate::flows::session::SessionStore;
use crate::flows::state::AppState;
use payjobber_admin_core::domain::{StatusMessage, UploadFile};
use payjobber_admin_core::ports::{AdminBackend, PortError, ProgressSink};
use payjobber_admin_core::upload::{self, format_bytes, UploadState, ValidationError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const DEFAULT_SUCCESS_MESSAGE: &str = "File uploaded successfully";

/// How a call to `UploadFlow::upload` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Nothing was sent: no file was ready or an upload was in flight.
    Skipped,
    Succeeded(StatusMessage),
    Failed(StatusMessage),
}

pub struct UploadFlow {
    backend: Arc<dyn AdminBackend>,
    session: SessionStore,
    clear_delay: Duration,
    state: UploadState,
    selected: Option<UploadFile>,
    message: Option<StatusMessage>,
    progress: Arc<watch::Sender<u8>>,
}

impl UploadFlow {
    pub fn new(state: &AppState) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            backend: state.backend.clone(),
            session: state.session.clone(),
            clear_delay: state.config.upload_clear_delay,
            state: UploadState::Idle,
            selected: None,
            message: None,
            progress: Arc::new(progress),
        }
    }

    pub fn state(&self) -> UploadState {
        match self.state {
            UploadState::Uploading { .. } => UploadState::Uploading {
                progress: *self.progress.borrow(),
            },
            other => other,
        }
    }

    pub fn selected(&self) -> Option<&UploadFile> {
        self.selected.as_ref()
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    /// Progress of the current upload, 0 to 100.
    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    //=====================================================================================
    // Selection
    //=====================================================================================

    /// Validates and selects an in-memory file.
    pub fn select(&mut self, file: UploadFile) -> Result<(), ValidationError> {
        self.state = UploadState::Validating;
        if let Err(e) = upload::validate(&file.name, file.size()) {
            self.discard(e.to_string());
            return Err(e);
        }

        info!(file = %file.name, size = file.size(), "File selected");
        self.message = Some(StatusMessage::info(format!(
            "Selected file: {} ({})",
            file.name,
            format_bytes(file.size())
        )));
        self.selected = Some(file);
        self.progress.send_replace(0);
        self.state = UploadState::Ready;
        Ok(())
    }

    /// Selects a file from disk. The size is checked from metadata before
    /// the content is read. Any failure leaves the flow idle with nothing
    /// selected.
    pub async fn select_path(&mut self, path: &Path) -> Result<(), AdminError> {
        self.state = UploadState::Validating;
        match read_candidate(path).await {
            Ok(file) => Ok(self.select(file)?),
            Err(e) => {
                self.discard(e.user_message());
                Err(e)
            }
        }
    }

    fn discard(&mut self, reason: String) {
        warn!("File rejected: {}", reason);
        self.selected = None;
        self.message = Some(StatusMessage::error(reason));
        self.progress.send_replace(0);
        self.state = UploadState::Idle;
    }

    pub fn remove_selected(&mut self) {
        self.selected = None;
        self.progress.send_replace(0);
        self.state = UploadState::Idle;
    }

    pub fn reset(&mut self) {
        self.remove_selected();
        self.message = None;
    }

    //=====================================================================================
    // Submission
    //=====================================================================================

    /// Sends the selected file. A seek failure on the multipart path is
    /// retried once as base64 JSON.
    pub async fn upload(&mut self) -> UploadOutcome {
        let file = match (&self.selected, self.state) {
            (Some(file), UploadState::Ready) => file.clone(),
            _ => return UploadOutcome::Skipped,
        };

        self.progress.send_replace(0);
        self.state = UploadState::Uploading { progress: 0 };
        self.message = None;

        let token = self.session.token();
        info!(file = %file.name, size = file.size(), "Uploading availability file");

        let sink: ProgressSink = {
            let progress = self.progress.clone();
            Arc::new(move |pct| {
                progress.send_replace(pct);
            })
        };

        let result = match self
            .backend
            .upload_multipart(&file, token.as_deref(), sink)
            .await
        {
            Err(e) if upload::is_seek_failure(&e) => {
                info!("Multipart upload could not be read by the backend; resending as base64 JSON");
                self.backend.upload_base64(&file, token.as_deref()).await
            }
            other => other,
        };

        match result {
            Ok(message) => {
                let text = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
                info!(file = %file.name, "Upload finished: {}", text);
                self.progress.send_replace(100);
                self.state = UploadState::Success;
                let message = StatusMessage::success(text);
                self.message = Some(message.clone());
                UploadOutcome::Succeeded(message)
            }
            Err(e) => {
                error!(file = %file.name, "Upload failed: {:?}", e);
                self.session.observe_failure(&e);
                let message = StatusMessage::error(failure_text(&e));
                self.remove_selected();
                self.message = Some(message.clone());
                UploadOutcome::Failed(message)
            }
        }
    }

    /// Returns a successful upload to `Idle` once the clear delay has passed.
    /// The success message stays.
    pub async fn settle(&mut self) {
        if self.state != UploadState::Success {
            return;
        }
        if !self.clear_delay.is_zero() {
            tokio::time::sleep(self.clear_delay).await;
        }
        self.remove_selected();
    }
}

async fn read_candidate(path: &Path) -> Result<UploadFile, AdminError> {
    let not_a_file = || {
        AdminError::Validation(ValidationError::MissingInput(format!(
            "'{}' is not a file",
            path.display()
        )))
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(not_a_file)?
        .to_string();

    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(not_a_file());
    }
    upload::validate(&name, metadata.len())?;

    let bytes = tokio::fs::read(path).await?;
    Ok(UploadFile::new(name, bytes))
}

fn failure_text(err: &PortError) -> String {
    match err {
        PortError::Unauthorized => "Session expired. Please log in again.".to_string(),
        PortError::Forbidden => "You do not have permission to upload files.".to_string(),
        PortError::Unreachable(_) => "Could not reach the server.".to_string(),
        other => format!("Upload failed: {}", other.detail().unwrap_or("Unknown error")),
    }
}
