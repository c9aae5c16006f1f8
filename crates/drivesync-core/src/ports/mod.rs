//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the apply engine depends on, whose
//! implementations live in adapter crates or in the binary.
//!
//! ## Ports Overview
//!
//! - [`IRemoteTransport`] - Remote metadata lookup and content streaming
//! - [`IChangeResolver`] - Computes the ordered change list for a pull
//! - [`IProgressReporter`] - Start/done/finish progress notifications
//! - [`IConfirmation`] - Gate between planning and applying a pull

pub mod change_resolver;
pub mod confirmation;
pub mod progress;
pub mod remote_transport;

pub use change_resolver::IChangeResolver;
pub use confirmation::{AutoConfirm, IConfirmation};
pub use progress::IProgressReporter;
pub use remote_transport::{ByteStream, ContentSource, IRemoteTransport, RemoteEntry};
