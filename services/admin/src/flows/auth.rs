//! services/admin/src/flows/auth.rs
//!
//! The login flow: credentials in, session saved, landing page out.

use crate::flows::session::{AuthError, SessionStore};
use crate::flows::state::AppState;
use payjobber_admin_core::domain::{Credentials, Role, Session, StatusMessage};
use payjobber_admin_core::guard::{ADMIN_HOME_PATH, DASHBOARD_PATH, LOGIN_PATH};
use tracing::{error, info};

/// What a successful login hands back to the front-end.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub message: StatusMessage,
    pub landing_page: &'static str,
}

pub struct LoginFlow {
    session: SessionStore,
}

impl LoginFlow {
    pub fn new(state: &AppState) -> Self {
        Self {
            session: state.session.clone(),
        }
    }

    /// Logs in and saves the session. Every failure is returned as the
    /// message to show.
    pub async fn submit(&self, username: &str, password: &str) -> Result<LoginOutcome, StatusMessage> {
        if username.is_empty() || password.is_empty() {
            return Err(StatusMessage::error("Username and password are required"));
        }

        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };

        let session = self.session.login(&credentials).await.map_err(|e| {
            error!("Login failed: {:?}", e);
            StatusMessage::error(match e {
                AuthError::InvalidCredentials => "Incorrect username or password",
                AuthError::NetworkUnreachable => "Could not reach the server. Check the API URL.",
                AuthError::Server { .. } => "Authentication failed. Please try again.",
            })
        })?;

        self.session.save_session(&session);
        info!(username = %session.username, "Login successful");

        Ok(LoginOutcome {
            message: StatusMessage::success(format!("Welcome {}!", session.username)),
            landing_page: landing_page(&session.role),
            session,
        })
    }

    /// Ends the session and returns the page to show next.
    pub fn logout(&self) -> &'static str {
        self.session.logout();
        info!("Logged out");
        LOGIN_PATH
    }
}

/// Where an operator lands right after logging in.
pub fn landing_page(role: &Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_HOME_PATH,
        Role::Other(_) => DASHBOARD_PATH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{test_state, Call, StubBackend};
    use payjobber_admin_core::domain::MessageKind;
    use payjobber_admin_core::ports::PortError;
    use std::sync::Arc;

    fn session(role: Role) -> Session {
        Session {
            token: "T".into(),
            token_type: "bearer".into(),
            role,
            username: "admin".into(),
        }
    }

    #[tokio::test]
    async fn admin_lands_on_withdrawals() {
        let backend = Arc::new(StubBackend::new().with_login(Ok(session(Role::Admin))));
        let state = test_state(backend.clone());
        let flow = LoginFlow::new(&state);

        let outcome = flow.submit("admin", "123456").await.unwrap();
        assert_eq!(outcome.landing_page, ADMIN_HOME_PATH);
        assert_eq!(outcome.message.kind, MessageKind::Success);
        assert_eq!(outcome.message.text, "Welcome admin!");
        assert!(state.session.is_authenticated());
        assert_eq!(backend.calls(), vec![Call::Login { username: "admin".into() }]);
    }

    #[tokio::test]
    async fn other_roles_land_on_dashboard() {
        let backend = Arc::new(
            StubBackend::new().with_login(Ok(session(Role::Other("supervisor".into())))),
        );
        let state = test_state(backend);
        let outcome = LoginFlow::new(&state).submit("admin", "123456").await.unwrap();
        assert_eq!(outcome.landing_page, DASHBOARD_PATH);
        assert_eq!(state.session.role().as_deref(), Some("supervisor"));
    }

    #[tokio::test]
    async fn empty_credentials_never_reach_the_backend() {
        let backend = Arc::new(StubBackend::new());
        let state = test_state(backend.clone());
        let message = LoginFlow::new(&state).submit("admin", "").await.unwrap_err();
        assert!(message.is_error());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn failures_become_distinct_messages() {
        let mut texts = Vec::new();
        for err in [
            PortError::Unauthorized,
            PortError::Unreachable("refused".into()),
            PortError::Rejected { status: 500, detail: None },
        ] {
            let state = test_state(Arc::new(StubBackend::new().with_login(Err(err))));
            let message = LoginFlow::new(&state).submit("admin", "x").await.unwrap_err();
            assert!(message.is_error());
            assert!(!state.session.is_authenticated());
            texts.push(message.text);
        }
        texts.dedup();
        assert_eq!(texts.len(), 3);
    }

    #[tokio::test]
    async fn logout_returns_to_login() {
        let state = test_state(Arc::new(StubBackend::new().with_login(Ok(session(Role::Admin)))));
        let flow = LoginFlow::new(&state);
        flow.submit("admin", "123456").await.unwrap();
        assert_eq!(flow.logout(), LOGIN_PATH);
        assert!(!state.session.is_authenticated());
    }
}
