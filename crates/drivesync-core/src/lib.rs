//! drivesync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Change`, `FileMeta`, `ChangeOp`, `ChangeState`, the export table
//! - **Port definitions** - Traits for adapters: `IRemoteTransport`, `IChangeResolver`,
//!   `IProgressReporter`, `IConfirmation`
//! - **Configuration** - YAML-backed typed configuration
//!
//! # Architecture
//!
//! The domain module contains pure data and invariants with no I/O.
//! Ports define trait interfaces that adapter crates implement; the
//! apply engine in `drivesync-sync` only talks to the outside world
//! through them.

pub mod config;
pub mod domain;
pub mod ports;
