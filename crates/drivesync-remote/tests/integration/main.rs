//! Integration tests for drivesync-remote
//!
//! Uses wiremock to simulate the drive API and verifies metadata lookups,
//! folder listings, streaming downloads and a full apply run over HTTP.

mod common;

mod test_apply_over_http;
mod test_metadata;
mod test_downloads;
