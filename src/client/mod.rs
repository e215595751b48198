//! HTTP client for the shared RSVP store.
//!
//! This module provides the `RemoteClient` used by the sync layer to read and
//! replace the server-side collection. The client never retries on its own;
//! retry policy belongs to the caller.

pub mod error;
pub mod remote;

pub use error::ApiError;
pub use remote::{PushReceipt, RemoteClient, RemoteSnapshot};
