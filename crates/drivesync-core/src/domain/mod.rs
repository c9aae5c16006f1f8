//! Domain entities and business rules
//!
//! - Newtypes for validated paths and remote identifiers
//! - The change model consumed by the apply engine
//! - The export table for cloud-native documents
//! - Domain-specific error types

pub mod change;
pub mod errors;
pub mod export;
pub mod newtypes;

pub use change::{Change, ChangeOp, ChangeState, FileMeta};
pub use errors::DomainError;
pub use export::{export_format_for, ExportFormat, DEFAULT_EXPORT, EXPORT_TABLE};
pub use newtypes::{RelativePath, RemoteId};
