//! Integration tests for drivemirror-drive
//!
//! Uses wiremock to simulate the Google Drive v3 and OAuth token endpoints
//! and verifies end-to-end behavior of listing, creation, resumable
//! upload, deletion and credential renewal.

mod common;

mod test_auth;
mod test_listing;
mod test_mutations;
