//! Integration tests for ScanBridge.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the card service (in-memory KV is fine)
//! SCANBRIDGE_BASE_URL=http://localhost:3000 cargo run -p scanbridge-server
//!
//! # Run integration tests
//! cargo test -p scanbridge-integration-tests -- --ignored
//! ```
//!
//! Tests target the server at `SCANBRIDGE_BASE_URL` (default
//! `http://localhost:3000`). Each test scopes its cards under a fresh
//! random owner id, so runs don't interfere with each other or with
//! existing data - but note the quota tests do create ten cards per run
//! against whatever namespace the server is configured with.
