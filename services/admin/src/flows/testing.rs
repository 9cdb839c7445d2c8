//! Scripted doubles for the core ports, used by the flow tests.

use crate::adapters::MemoryStorage;
use crate::config::Config;
use crate::flows::state::AppState;
use async_trait::async_trait;
use payjobber_admin_core::domain::{
    Credentials, DocumentType, PolicyAcceptanceRecord, Session, UploadFile, UploadHistory,
};
use payjobber_admin_core::ports::{
    AdminBackend, KeyValueStore, PortError, PortResult, ProgressSink,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded backend call, with the token it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login { username: String },
    Multipart { file: String, token: Option<String> },
    Base64 { file: String, token: Option<String> },
    UploadHistory { token: Option<String> },
    Download { upload_id: String, token: Option<String> },
    PolicyHistory { document: String, token: Option<String> },
}

/// A backend that answers from queued results and records every call.
/// Calls with nothing queued fail with `PortError::Unexpected`.
#[derive(Default)]
pub struct StubBackend {
    login: Mutex<VecDeque<PortResult<Session>>>,
    multipart: Mutex<VecDeque<PortResult<Option<String>>>>,
    base64: Mutex<VecDeque<PortResult<Option<String>>>>,
    history: Mutex<VecDeque<PortResult<UploadHistory>>>,
    download: Mutex<VecDeque<PortResult<Vec<u8>>>>,
    policies: Mutex<VecDeque<PortResult<Vec<PolicyAcceptanceRecord>>>>,
    calls: Mutex<Vec<Call>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(self, result: PortResult<Session>) -> Self {
        self.login.lock().unwrap().push_back(result);
        self
    }

    pub fn with_multipart(self, result: PortResult<Option<String>>) -> Self {
        self.multipart.lock().unwrap().push_back(result);
        self
    }

    pub fn with_base64(self, result: PortResult<Option<String>>) -> Self {
        self.base64.lock().unwrap().push_back(result);
        self
    }

    pub fn with_history(self, result: PortResult<UploadHistory>) -> Self {
        self.history.lock().unwrap().push_back(result);
        self
    }

    pub fn with_download(self, result: PortResult<Vec<u8>>) -> Self {
        self.download.lock().unwrap().push_back(result);
        self
    }

    pub fn with_policies(self, result: PortResult<Vec<PolicyAcceptanceRecord>>) -> Self {
        self.policies.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn next<T>(queue: &Mutex<VecDeque<PortResult<T>>>) -> PortResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(PortError::Unexpected("no scripted response".into())))
}

#[async_trait]
impl AdminBackend for StubBackend {
    async fn login(&self, credentials: &Credentials) -> PortResult<Session> {
        self.record(Call::Login {
            username: credentials.username.clone(),
        });
        next(&self.login)
    }

    async fn upload_multipart(
        &self,
        file: &UploadFile,
        token: Option<&str>,
        progress: ProgressSink,
    ) -> PortResult<Option<String>> {
        self.record(Call::Multipart {
            file: file.name.clone(),
            token: token.map(String::from),
        });
        progress(50);
        next(&self.multipart)
    }

    async fn upload_base64(
        &self,
        file: &UploadFile,
        token: Option<&str>,
    ) -> PortResult<Option<String>> {
        self.record(Call::Base64 {
            file: file.name.clone(),
            token: token.map(String::from),
        });
        next(&self.base64)
    }

    async fn upload_history(&self, token: Option<&str>) -> PortResult<UploadHistory> {
        self.record(Call::UploadHistory {
            token: token.map(String::from),
        });
        next(&self.history)
    }

    async fn download_annotated(&self, upload_id: &str, token: Option<&str>) -> PortResult<Vec<u8>> {
        self.record(Call::Download {
            upload_id: upload_id.to_string(),
            token: token.map(String::from),
        });
        next(&self.download)
    }

    async fn policy_history(
        &self,
        document_type: DocumentType,
        document_number: &str,
        token: Option<&str>,
    ) -> PortResult<Vec<PolicyAcceptanceRecord>> {
        self.record(Call::PolicyHistory {
            document: format!("{}/{}", document_type, document_number),
            token: token.map(String::from),
        });
        next(&self.policies)
    }
}

/// A key-value store where every operation fails, like a disabled browser store.
pub struct BrokenStorage;

impl KeyValueStore for BrokenStorage {
    fn get(&self, _key: &str) -> PortResult<Option<String>> {
        Err(PortError::Storage("disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> PortResult<()> {
        Err(PortError::Storage("disabled".into()))
    }

    fn remove(&self, _key: &str) -> PortResult<()> {
        Err(PortError::Storage("disabled".into()))
    }
}

/// Shared state over a stub backend and an in-memory session store, with no
/// upload clear delay.
pub fn test_state(backend: Arc<StubBackend>) -> AppState {
    test_state_in(backend, Path::new("."))
}

/// Like `test_state`, saving downloads into `download_dir`.
pub fn test_state_in(backend: Arc<StubBackend>, download_dir: &Path) -> AppState {
    let mut config = Config::from_lookup(|_| None).expect("default config");
    config.upload_clear_delay = Duration::ZERO;
    config.download_dir = download_dir.to_path_buf();
    AppState::new(Arc::new(config), backend, Arc::new(MemoryStorage::new()))
}
