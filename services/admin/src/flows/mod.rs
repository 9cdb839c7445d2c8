pub mod auth;
pub mod history;
pub mod navigation;
pub mod session;
pub mod state;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the flow entry points so the binary can wire them up directly.
pub use auth::LoginFlow;
pub use history::{PolicyHistoryView, UploadHistoryView};
pub use navigation::Navigator;
pub use session::SessionStore;
pub use state::AppState;
pub use upload::{UploadFlow, UploadOutcome};
