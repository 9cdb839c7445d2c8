//! services/admin/src/flows/session.rs
//!
//! The session store: the operator's token, token type, role and username,
//! persisted through the `KeyValueStore` port.

use payjobber_admin_core::domain::{Credentials, Session, SessionSnapshot};
use payjobber_admin_core::ports::{AdminBackend, KeyValueStore, PortError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TOKEN_KEY: &str = "access_token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
pub const ROLE_KEY: &str = "role";
pub const USERNAME_KEY: &str = "username";

const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, TOKEN_TYPE_KEY, ROLE_KEY, USERNAME_KEY];

/// Why a login attempt did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Network unreachable")]
    NetworkUnreachable,
    #[error("Login failed: {detail:?} (status {status:?})")]
    Server {
        status: Option<u16>,
        detail: Option<String>,
    },
}

impl From<PortError> for AuthError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unauthorized => AuthError::InvalidCredentials,
            PortError::Unreachable(_) => AuthError::NetworkUnreachable,
            PortError::Forbidden => AuthError::Server {
                status: Some(403),
                detail: None,
            },
            PortError::Rejected { status, detail } => AuthError::Server {
                status: Some(status),
                detail,
            },
            other => AuthError::Server {
                status: None,
                detail: Some(other.to_string()),
            },
        }
    }
}

/// Handle to the persisted session, shared by every flow.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    backend: Arc<dyn AdminBackend>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, backend: Arc<dyn AdminBackend>) -> Self {
        Self { storage, backend }
    }

    /// Submits credentials to the backend. Does not persist anything.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.backend.login(credentials).await.map_err(AuthError::from)
    }

    /// Persists all four session fields. Storage failures are logged and
    /// swallowed.
    pub fn save_session(&self, session: &Session) {
        let entries = [
            (TOKEN_KEY, session.token.as_str()),
            (TOKEN_TYPE_KEY, session.token_type.as_str()),
            (ROLE_KEY, session.role.as_str()),
            (USERNAME_KEY, session.username.as_str()),
        ];
        for (key, value) in entries {
            if let Err(e) = self.storage.set(key, value) {
                warn!("Could not save the session ({}): {}", key, e);
                return;
            }
        }
        info!(username = %session.username, role = %session.role, "Session saved");
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("Could not read {} from the session store: {}", key, e);
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn token_type(&self) -> Option<String> {
        self.read(TOKEN_TYPE_KEY)
    }

    pub fn role(&self) -> Option<String> {
        self.read(ROLE_KEY)
    }

    pub fn username(&self) -> Option<String> {
        self.read(USERNAME_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token(),
            token_type: self.token_type(),
            role: self.role(),
            username: self.username(),
        }
    }

    /// Clears every session field. Safe to call with no session.
    pub fn logout(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!("Could not clear {} from the session store: {}", key, e);
            }
        }
        debug!("Session cleared");
    }

    /// Drops the session when a backend call reports it expired.
    /// Returns whether the session was cleared.
    pub fn observe_failure(&self, err: &PortError) -> bool {
        if matches!(err, PortError::Unauthorized) {
            warn!("Backend reported the session as expired; clearing it");
            self.logout();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::flows::testing::{BrokenStorage, StubBackend};
    use payjobber_admin_core::domain::Role;

    fn admin_session() -> Session {
        Session {
            token: "T".into(),
            token_type: "bearer".into(),
            role: Role::Admin,
            username: "admin".into(),
        }
    }

    fn store_with(storage: Arc<dyn KeyValueStore>, backend: StubBackend) -> SessionStore {
        SessionStore::new(storage, Arc::new(backend))
    }

    #[tokio::test]
    async fn login_then_save_stores_exact_fields() {
        let backend = StubBackend::new().with_login(Ok(admin_session()));
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone(), backend);

        let credentials = Credentials {
            username: "admin".into(),
            password: "123456".into(),
        };
        let session = store.login(&credentials).await.unwrap();
        store.save_session(&session);

        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("T"));
        assert_eq!(storage.get(TOKEN_TYPE_KEY).unwrap().as_deref(), Some("bearer"));
        assert_eq!(storage.get(ROLE_KEY).unwrap().as_deref(), Some("admin"));
        assert_eq!(storage.get(USERNAME_KEY).unwrap().as_deref(), Some("admin"));
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn login_failures_map_to_auth_errors() {
        let credentials = Credentials {
            username: "admin".into(),
            password: "wrong".into(),
        };
        let cases = [
            (PortError::Unauthorized, AuthError::InvalidCredentials),
            (PortError::Unreachable("refused".into()), AuthError::NetworkUnreachable),
            (
                PortError::Rejected { status: 500, detail: Some("boom".into()) },
                AuthError::Server { status: Some(500), detail: Some("boom".into()) },
            ),
        ];
        for (port_error, expected) in cases {
            let store = store_with(
                Arc::new(MemoryStorage::new()),
                StubBackend::new().with_login(Err(port_error)),
            );
            assert_eq!(store.login(&credentials).await.unwrap_err(), expected);
            assert!(!store.is_authenticated());
        }
    }

    #[test]
    fn logout_clears_every_field_and_is_idempotent() {
        let store = store_with(Arc::new(MemoryStorage::new()), StubBackend::new());
        store.logout();

        store.save_session(&admin_session());
        assert!(store.is_authenticated());

        store.logout();
        store.logout();
        assert_eq!(store.snapshot(), SessionSnapshot::default());
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.role(), None);
        assert_eq!(store.username(), None);
        assert_eq!(store.token_type(), None);
    }

    #[test]
    fn broken_storage_never_reaches_the_caller() {
        let store = store_with(Arc::new(BrokenStorage), StubBackend::new());
        store.save_session(&admin_session());
        assert_eq!(store.token(), None);
        assert!(!store.is_authenticated());
        store.logout();
    }

    #[test]
    fn only_unauthorized_clears_the_session() {
        let store = store_with(Arc::new(MemoryStorage::new()), StubBackend::new());
        store.save_session(&admin_session());

        assert!(!store.observe_failure(&PortError::Forbidden));
        assert!(store.is_authenticated());

        assert!(store.observe_failure(&PortError::Unauthorized));
        assert!(!store.is_authenticated());
    }
}
