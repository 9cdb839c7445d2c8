//! services/admin/src/flows/state.rs
//!
//! Defines the client's shared state, handed to every flow.

use crate::adapters::{FileStorage, HttpBackend};
use crate::config::Config;
use crate::error::AdminError;
use crate::flows::session::SessionStore;
use payjobber_admin_core::guard::RouteTable;
use payjobber_admin_core::ports::{AdminBackend, KeyValueStore};
use std::sync::Arc;

/// The shared state, created once at startup and passed to all flows.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn AdminBackend>,
    pub session: SessionStore,
    pub routes: Arc<RouteTable>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the state from explicit ports.
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn AdminBackend>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            session: SessionStore::new(storage, backend.clone()),
            backend,
            routes: Arc::new(RouteTable::default()),
            config,
        }
    }

    /// Wires the HTTP backend and the file-backed session store from config.
    pub fn from_config(config: Arc<Config>) -> Result<Self, AdminError> {
        let backend = Arc::new(HttpBackend::new(config.api_url.clone(), config.request_timeout)?);
        let storage = Arc::new(FileStorage::new(config.session_file.clone()));
        Ok(Self::new(config, backend, storage))
    }
}
