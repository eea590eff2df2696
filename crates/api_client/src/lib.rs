//! Test case API client.
//!
//! Single source of truth for the records wire contract: list a team's
//! test cases, update one test case, and the bearer token stored on disk.
//!
//! Blocking. No retries. Implements the engine's `RecordStore`.

mod auth;
mod client;

pub use auth::{AuthCredentials, CredentialStore};
pub use client::{records_from_json, ApiClient, ApiError};
