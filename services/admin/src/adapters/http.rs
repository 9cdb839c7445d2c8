//! services/admin/src/adapters/http.rs
//!
//! This module contains the backend adapter, the concrete implementation of
//! the `AdminBackend` port from the `core` crate. It speaks the backend's
//! REST contract with `reqwest` and maps wire records into domain types.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use payjobber_admin_core::domain::{
    Credentials, DocumentType, PolicyAcceptanceRecord, Role, Session, UploadFile, UploadHistory,
    UploadLog, UploadStatus,
};
use payjobber_admin_core::ports::{AdminBackend, PortError, PortResult, ProgressSink};
use payjobber_admin_core::upload::{default_content_type, progress_percent};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

const LOGIN_ENDPOINT: &str = "/admin/login";
const UPLOAD_ENDPOINT: &str = "/retiros/disponibilidad/cargar";
const UPLOAD_HISTORY_ENDPOINT: &str = "/retiros/disponibilidad/historial";
const DOWNLOAD_ENDPOINT: &str = "/retiros/descargar/excel";
const POLICY_HISTORY_ENDPOINT: &str = "/politicas/historial";

/// Size of each body chunk handed to the connection; progress is reported per chunk.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AdminBackend` port over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` for the given base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request, attaching the bearer token when one is given, and
    /// turns every non-success status into a `PortError`.
    async fn send(&self, request: RequestBuilder, token: Option<&str>) -> PortResult<Response> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(transport_error)?;
        check_status(response).await
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginRecord {
    access_token: String,
    token_type: String,
    role: String,
    username: String,
}
impl LoginRecord {
    fn to_domain(self) -> Session {
        Session {
            token: self.access_token,
            token_type: self.token_type,
            role: Role::from(self.role.as_str()),
            username: self.username,
        }
    }
}

#[derive(Serialize)]
struct Base64UploadBody<'a> {
    filename: &'a str,
    content: String,
    content_type: &'a str,
}

#[derive(Deserialize)]
struct UploadResponseRecord {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct UploadHistoryRecord {
    #[serde(default)]
    ok: Option<Value>,
    #[serde(default)]
    username: Option<Value>,
    #[serde(default)]
    total_uploads: Option<Value>,
    #[serde(default)]
    historial: Option<Vec<Value>>,
}
impl UploadHistoryRecord {
    fn to_domain(self) -> UploadHistory {
        let entries: Vec<UploadLog> = self
            .historial
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<UploadLogRecord>(item) {
                Ok(record) => Some(record.to_domain()),
                Err(e) => {
                    warn!("Skipping unreadable upload history entry: {}", e);
                    None
                }
            })
            .collect();
        UploadHistory {
            username: self.username.as_ref().and_then(value_text),
            total_uploads: self
                .total_uploads
                .as_ref()
                .and_then(value_u64)
                .unwrap_or(entries.len() as u64),
            entries,
        }
    }
}

/// One history entry. Every field is read loosely: numbers may arrive as
/// strings and any field may be missing or null.
#[derive(Deserialize)]
struct UploadLogRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    upload_id: Option<Value>,
    #[serde(default, alias = "file_name", alias = "nombre_archivo")]
    filename: Option<Value>,
    #[serde(default, alias = "fecha", alias = "upload_date")]
    date: Option<Value>,
    #[serde(default, alias = "hora", alias = "upload_time")]
    time: Option<Value>,
    #[serde(default, alias = "estado")]
    status: Option<Value>,
    #[serde(default, alias = "registros_procesados")]
    records_processed: Option<Value>,
    #[serde(default, alias = "registros_error")]
    records_error: Option<Value>,
    #[serde(default, alias = "mensaje_error")]
    error_message: Option<Value>,
    #[serde(default, alias = "tiempo_procesamiento")]
    processing_time: Option<Value>,
}
impl UploadLogRecord {
    fn to_domain(self) -> UploadLog {
        let text = |field: &Option<Value>| field.as_ref().and_then(value_text);
        let count = |field: &Option<Value>| field.as_ref().and_then(value_u64).unwrap_or_default();

        let id = count(&self.id);
        let upload_id = text(&self.upload_id).unwrap_or_else(|| id.to_string());
        UploadLog {
            id,
            upload_id,
            filename: text(&self.filename).unwrap_or_default(),
            date: text(&self.date).unwrap_or_default(),
            time: text(&self.time).unwrap_or_default(),
            status: UploadStatus::normalize(text(&self.status).as_deref().unwrap_or_default()),
            records_processed: count(&self.records_processed),
            records_error: count(&self.records_error),
            error_message: text(&self.error_message).filter(|m| !m.is_empty()),
            processing_time: text(&self.processing_time),
        }
    }
}

/// Picks the history list out of whichever envelope the backend used.
fn policy_entries(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => match (obj.remove("historial"), obj.remove("data")) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn policy_record(item: Value) -> Option<PolicyAcceptanceRecord> {
    let Value::Object(mut fields) = item else {
        return None;
    };
    let mut take = |keys: &[&str]| keys.iter().find_map(|k| fields.remove(*k));

    let log_id = take(&["log_id", "id"]).as_ref().and_then(value_text).unwrap_or_default();
    let timestamp = take(&["timestamp", "fecha"]).as_ref().and_then(value_text).unwrap_or_default();
    let policy_version = take(&["version_politica", "policy_version"])
        .as_ref()
        .and_then(value_text)
        .unwrap_or_default();
    let ip_address = take(&["ip_address"]).as_ref().and_then(value_text);
    let user_agent = take(&["user_agent"]).as_ref().and_then(value_text);
    let accepted = match take(&["accepted", "aceptado"]) {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "si" | "sí" | "yes"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    };

    Some(PolicyAcceptanceRecord {
        log_id,
        timestamp,
        policy_version,
        ip_address,
        user_agent,
        accepted,
        extra: extra_fields(fields),
    })
}

fn extra_fields(fields: Map<String, Value>) -> Vec<(String, String)> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let text = value_text(&value).unwrap_or_default();
            (key, text)
        })
        .collect()
}

/// Plain text for a scalar JSON value; other values are rendered as JSON.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// A non-negative integer given as a JSON number or a numeric string.
fn value_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//=========================================================================================
// Status and Transport Error Mapping
//=========================================================================================

fn transport_error(err: reqwest::Error) -> PortError {
    if err.is_builder() || err.is_decode() {
        PortError::Unexpected(err.to_string())
    } else {
        PortError::Unreachable(err.to_string())
    }
}

async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
        StatusCode::FORBIDDEN => Err(PortError::Forbidden),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!(status = status.as_u16(), detail = ?detail, "Backend rejected the request");
            Err(PortError::Rejected {
                status: status.as_u16(),
                detail,
            })
        }
    }
}

/// The `detail` (or `message`) field of an error body, as text.
fn error_detail(body: &str) -> Option<String> {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    obj.get("detail")
        .and_then(value_text)
        .or_else(|| obj.get("message").and_then(value_text))
        .filter(|d| !d.is_empty())
}

async fn upload_message(response: Response) -> PortResult<Option<String>> {
    let body = response.text().await.map_err(transport_error)?;
    Ok(serde_json::from_str::<UploadResponseRecord>(&body)
        .ok()
        .and_then(|r| r.message))
}

/// Streams `bytes` in chunks, reporting the share handed over so far.
fn progress_body(bytes: Bytes, progress: ProgressSink) -> reqwest::Body {
    let total = bytes.len() as u64;
    let stream = async_stream::stream! {
        let mut offset = 0;
        while offset < bytes.len() {
            let end = (offset + UPLOAD_CHUNK_SIZE).min(bytes.len());
            let chunk = bytes.slice(offset..end);
            offset = end;
            progress(progress_percent(offset as u64, total));
            yield Ok::<Bytes, std::io::Error>(chunk);
        }
    };
    reqwest::Body::wrap_stream(stream)
}

//=========================================================================================
// `AdminBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl AdminBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> PortResult<Session> {
        let body = LoginBody {
            username: &credentials.username,
            password: &credentials.password,
        };
        let response = self
            .send(self.client.post(self.url(LOGIN_ENDPOINT)).json(&body), None)
            .await?;
        let record: LoginRecord = response.json().await.map_err(transport_error)?;
        Ok(record.to_domain())
    }

    async fn upload_multipart(
        &self,
        file: &UploadFile,
        token: Option<&str>,
        progress: ProgressSink,
    ) -> PortResult<Option<String>> {
        let content_type = file
            .content_type
            .as_deref()
            .unwrap_or_else(|| default_content_type(&file.name));
        debug!(file = %file.name, size = file.size(), "Sending multipart upload");

        let part = multipart::Part::stream_with_length(progress_body(file.bytes.clone(), progress), file.size())
            .file_name(file.name.clone())
            .mime_str(content_type)
            .map_err(|e| PortError::Unexpected(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .send(self.client.post(self.url(UPLOAD_ENDPOINT)).multipart(form), token)
            .await?;
        upload_message(response).await
    }

    async fn upload_base64(
        &self,
        file: &UploadFile,
        token: Option<&str>,
    ) -> PortResult<Option<String>> {
        let body = Base64UploadBody {
            filename: &file.name,
            content: STANDARD.encode(&file.bytes),
            content_type: file
                .content_type
                .as_deref()
                .unwrap_or_else(|| default_content_type(&file.name)),
        };
        debug!(file = %file.name, "Sending base64 JSON upload");

        let response = self
            .send(self.client.post(self.url(UPLOAD_ENDPOINT)).json(&body), token)
            .await?;
        upload_message(response).await
    }

    async fn upload_history(&self, token: Option<&str>) -> PortResult<UploadHistory> {
        let response = self
            .send(self.client.get(self.url(UPLOAD_HISTORY_ENDPOINT)), token)
            .await?;
        let record: UploadHistoryRecord = response.json().await.map_err(transport_error)?;
        if record.ok == Some(Value::Bool(false)) {
            warn!("Upload history answered with ok=false");
        }
        Ok(record.to_domain())
    }

    async fn download_annotated(&self, upload_id: &str, token: Option<&str>) -> PortResult<Vec<u8>> {
        let url = self.url(&format!("{}/{}", DOWNLOAD_ENDPOINT, urlencoding::encode(upload_id)));
        let response = self.send(self.client.get(url), token).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    async fn policy_history(
        &self,
        document_type: DocumentType,
        document_number: &str,
        token: Option<&str>,
    ) -> PortResult<Vec<PolicyAcceptanceRecord>> {
        let url = self.url(&format!(
            "{}/{}/{}",
            POLICY_HISTORY_ENDPOINT,
            document_type.as_str(),
            urlencoding::encode(document_number)
        ));
        let response = self.send(self.client.get(url), token).await?;
        let body: Value = response.json().await.map_err(transport_error)?;
        Ok(policy_entries(body).into_iter().filter_map(policy_record).collect())
    }
}
