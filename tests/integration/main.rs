//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the event directory and drive
//! the fetcher, the scanners and full harvest runs end-to-end.

mod fetch_tests;
mod harvest_tests;
