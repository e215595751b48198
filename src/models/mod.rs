//! Data models for the RSVP service.
//!
//! Field names follow the invitation page's JSON records so browser clients and
//! the sync client share one wire format.

mod entry;
mod payload;

pub use entry::*;
pub use payload::*;
