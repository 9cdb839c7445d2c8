//! crates/payjobber_admin_core/src/domain.rs
//!
//! Defines the pure, core data structures for the admin client.
//! These structs are independent of any storage or wire format.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime};
use std::fmt;

//=========================================================================================
// Session
//=========================================================================================

/// The role the backend assigned to the logged-in operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    /// Any other role, kept verbatim so routes can require it by name.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Other(raw) => raw,
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        if raw == "admin" {
            Role::Admin
        } else {
            Role::Other(raw.to_string())
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client-held record of an authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub token_type: String,
    pub role: Role,
    pub username: String,
}

/// What the session store currently holds. Every field may be missing,
/// only the token decides whether the operator is authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub token_type: Option<String>,
    pub role: Option<String>,
    pub username: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// Only used for the login request - never persisted
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

//=========================================================================================
// Uploads
//=========================================================================================

/// A spreadsheet selected by the operator, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Display-normalized status of a past upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Success,
    Error,
    Pending,
}

impl UploadStatus {
    /// Maps a backend status string onto the fixed vocabulary.
    /// Unrecognized values fall back to `Pending`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "success" | "succeeded" | "successful" | "ok" | "completed" | "completado"
            | "exitoso" | "exito" | "éxito" => UploadStatus::Success,
            "error" | "failed" | "failure" | "fallido" | "fallo" => UploadStatus::Error,
            _ => UploadStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Success => "success",
            UploadStatus::Error => "error",
            UploadStatus::Pending => "pending",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            UploadStatus::Success => "✓",
            UploadStatus::Error => "✗",
            UploadStatus::Pending => "⏳",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadStatus::Success => "✓ Success",
            UploadStatus::Error => "✗ Error",
            UploadStatus::Pending => "⏳ Pending",
        }
    }
}

/// A single past upload as shown in the history view.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadLog {
    pub id: u64,
    pub upload_id: String,
    pub filename: String,
    pub date: String,
    pub time: String,
    pub status: UploadStatus,
    pub records_processed: u64,
    pub records_error: u64,
    pub error_message: Option<String>,
    pub processing_time: Option<String>,
}

/// One page of upload history as returned for the current operator.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadHistory {
    pub username: Option<String>,
    pub total_uploads: u64,
    pub entries: Vec<UploadLog>,
}

//=========================================================================================
// Policy acceptance
//=========================================================================================

/// Identity document kinds accepted by the policy history lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentType {
    #[default]
    Dni,
    Ce,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Dni => "DNI",
            DocumentType::Ce => "CE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DNI" => Some(DocumentType::Dni),
            "CE" => Some(DocumentType::Ce),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single policy acceptance event for one document holder.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAcceptanceRecord {
    pub log_id: String,
    pub timestamp: String,
    pub policy_version: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub accepted: bool,
    /// Any further fields the backend sent, rendered as text.
    pub extra: Vec<(String, String)>,
}

impl PolicyAcceptanceRecord {
    /// Renders the timestamp as `dd/mm/yyyy HH:MM:SS`, or returns it
    /// untouched when it is not a recognizable date-time.
    pub fn display_timestamp(&self) -> String {
        const DISPLAY: &str = "%d/%m/%Y %H:%M:%S";
        let raw = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return dt.format(DISPLAY).to_string();
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
                return dt.format(DISPLAY).to_string();
            }
        }
        self.timestamp.clone()
    }
}

//=========================================================================================
// Operator-facing messages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

/// A status line shown to the operator after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Info, text: text.into() }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Error, text: text.into() }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_normalizes_to_pending() {
        assert_eq!(UploadStatus::normalize("weird"), UploadStatus::Pending);
        assert_eq!(UploadStatus::normalize(""), UploadStatus::Pending);
    }

    #[test]
    fn status_matching_ignores_case_and_padding() {
        assert_eq!(UploadStatus::normalize("  SUCCESS "), UploadStatus::Success);
        assert_eq!(UploadStatus::normalize("Error"), UploadStatus::Error);
        assert_eq!(UploadStatus::normalize("ÉXITO"), UploadStatus::Success);
        assert_eq!(UploadStatus::normalize("pending"), UploadStatus::Pending);
    }

    #[test]
    fn role_keeps_unknown_names() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("auditor").as_str(), "auditor");
    }

    #[test]
    fn snapshot_requires_non_empty_token() {
        let mut snapshot = SessionSnapshot {
            role: Some("admin".into()),
            ..Default::default()
        };
        assert!(!snapshot.is_authenticated());
        snapshot.token = Some(String::new());
        assert!(!snapshot.is_authenticated());
        snapshot.token = Some("T".into());
        assert!(snapshot.is_authenticated());
    }

    #[test]
    fn timestamps_render_in_day_first_order() {
        let mut record = PolicyAcceptanceRecord {
            log_id: "1".into(),
            timestamp: "2024-01-15T10:30:45Z".into(),
            policy_version: "v1".into(),
            ip_address: None,
            user_agent: None,
            accepted: true,
            extra: Vec::new(),
        };
        assert_eq!(record.display_timestamp(), "15/01/2024 10:30:45");

        record.timestamp = "2024-01-15 10:30:45.123".into();
        assert_eq!(record.display_timestamp(), "15/01/2024 10:30:45");

        record.timestamp = "yesterday".into();
        assert_eq!(record.display_timestamp(), "yesterday");
    }

    #[test]
    fn document_type_parses_case_insensitively() {
        assert_eq!(DocumentType::parse("dni"), Some(DocumentType::Dni));
        assert_eq!(DocumentType::parse(" Ce "), Some(DocumentType::Ce));
        assert_eq!(DocumentType::parse("passport"), None);
        assert_eq!(DocumentType::default().as_str(), "DNI");
    }
}
