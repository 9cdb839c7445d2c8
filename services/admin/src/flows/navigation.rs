//! services/admin/src/flows/navigation.rs
//!
//! Applies the route guard to navigation attempts using the live session.

use crate::flows::session::SessionStore;
use crate::flows::state::AppState;
use payjobber_admin_core::guard::{self, GuardDecision, Redirect, RouteTable};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Navigator {
    session: SessionStore,
    routes: Arc<RouteTable>,
}

impl Navigator {
    pub fn new(state: &AppState) -> Self {
        Self {
            session: state.session.clone(),
            routes: state.routes.clone(),
        }
    }

    /// Decides one attempt to open `target`.
    pub fn navigate(&self, target: &str) -> GuardDecision {
        let access = self.routes.access_for(target);
        let decision = guard::check(&self.session.snapshot(), target, &access);
        match &decision {
            GuardDecision::Allow => debug!(path = target, "Navigation allowed"),
            GuardDecision::RedirectTo(redirect) => {
                info!(path = target, redirect = %redirect.path(), "Navigation redirected")
            }
        }
        decision
    }

    /// Like `navigate`, but as a `Result` for use with `?`.
    pub fn require(&self, target: &str) -> Result<(), Redirect> {
        match self.navigate(target) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::RedirectTo(redirect) => Err(redirect),
        }
    }
}
