pub mod domain;
pub mod guard;
pub mod ports;
pub mod upload;

pub use domain::{
    Credentials, DocumentType, MessageKind, PolicyAcceptanceRecord, Role, Session,
    SessionSnapshot, StatusMessage, UploadFile, UploadHistory, UploadLog, UploadStatus,
};
pub use guard::{Access, GuardDecision, Redirect, Route, RouteTable};
pub use ports::{AdminBackend, KeyValueStore, PortError, PortResult, ProgressSink};
pub use upload::{UploadState, ValidationError};
