//! Local cache store for offline RSVP access.
//!
//! This module provides the `LocalCache` that keeps the device's view of the
//! RSVP collection between runs. Each key is a separate JSON file in the cache
//! directory:
//! - `entries.json` - the full collection
//! - `current_user.json` - this device's own entry
//! - `pending.json` - a local change the server has not confirmed
//! - `device_id` - the per-device identifier (plain text)

pub mod store;

pub use store::{CachedData, LocalCache};
