//! Integration tests for zanime
//!
//! Tests are organized by component:
//! - animeworld_test: AnimeWorld client probing and episode listings
//! - catalog_test: Search fan-out across providers
//! - resolver_test: Full resolution pipeline (candidates, alternates, fallback, proxy, language)
//! - server_test: axum routes driven in-process via `oneshot`
//! - cli_test: Argument parsing, JSON output and command exit codes

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
