//! crates/payjobber_admin_core/src/upload.rs
//!
//! Client-side rules for the availability upload: what files are accepted,
//! the states an upload moves through, and when the JSON fallback applies.

use crate::ports::PortError;

/// Largest accepted spreadsheet, in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// Reasons input is refused before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The file exceeds the maximum allowed size (10 MB).")]
    TooLarge { size: u64, limit: u64 },
    #[error("Invalid format. Select an .xlsx or .xls file.")]
    UnsupportedExtension { extension: Option<String> },
    #[error("{0}")]
    MissingInput(String),
}

/// Where the upload flow currently is. A failed upload goes straight back
/// to `Idle`; the failure is carried by the flow's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Validating,
    Ready,
    Uploading { progress: u8 },
    Success,
}

/// Lowercased text after the last `.` of a file name, if there is a dot.
/// A leading dot counts, so `.xlsx` has the extension `xlsx`.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Checks a candidate file by name and size. Size is checked first.
pub fn validate(name: &str, size: u64) -> Result<(), ValidationError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let extension = extension_of(name);
    match extension.as_deref() {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext) => Ok(()),
        _ => Err(ValidationError::UnsupportedExtension { extension }),
    }
}

/// Content type to declare for a spreadsheet that came without one.
pub fn default_content_type(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("xls") => XLS_CONTENT_TYPE,
        _ => XLSX_CONTENT_TYPE,
    }
}

/// Rounded percentage of `loaded` over `total`, capped at 100.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (loaded.min(total) as f64 * 100.0 / total as f64).round();
    pct as u8
}

/// The backend failure that the base64 JSON resubmission works around:
/// a 400 whose detail mentions seeking in the uploaded stream.
pub fn is_seek_failure(err: &PortError) -> bool {
    matches!(
        err,
        PortError::Rejected { status: 400, detail: Some(detail) } if detail.contains("seek")
    )
}

/// Human-readable byte count, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}
