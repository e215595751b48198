//! Request and response bodies for the RSVP endpoints.
//!
//! Shared by the server handlers and the remote store client.

use serde::{Deserialize, Serialize};

use super::RsvpEntry;

/// Body of `GET /api/rsvp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesPayload {
    #[serde(default)]
    pub entries: Vec<RsvpEntry>,
}

/// Body of `POST /api/rsvp`: a wholesale replacement of the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEntriesRequest {
    #[serde(default)]
    pub entries: Option<Vec<RsvpEntry>>,
    /// Revision the writer last observed; a mismatch rejects the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_revision: Option<i64>,
}

/// Acknowledgement of a collection write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub message: String,
    pub count: usize,
}

/// Query of `GET /api/rsvp/check-user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub angkatan: Option<String>,
}

/// Result of a logical identity lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityMatch {
    pub exists: bool,
    #[serde(alias = "user")]
    pub entry: Option<RsvpEntry>,
}

/// Body of `POST /api/rsvp/save-user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveUserRequest {
    #[serde(default)]
    pub user: Option<RsvpEntry>,
}

/// Query of `GET /api/rsvp/load-user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub id: Option<String>,
}

/// Body of `GET /api/rsvp/load-user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub user: Option<RsvpEntry>,
}

/// Plain acknowledgement carrying only a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}
