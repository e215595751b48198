//! Remote store client for the RSVP server's `/api/rsvp` routes.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::api::ApiResponse;
use crate::models::{Ack, EntriesPayload, IdentityMatch, RsvpEntry, SaveReceipt, UserPayload};

use super::ApiError;

/// The server's collection together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct RemoteSnapshot {
    pub entries: Vec<RsvpEntry>,
    pub revision: i64,
}

/// Result of a successful collection write.
#[derive(Debug, Clone, Copy)]
pub struct PushReceipt {
    pub count: usize,
    pub revision: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushBody<'a> {
    entries: &'a [RsvpEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_revision: Option<i64>,
}

#[derive(Serialize)]
struct SaveUserBody<'a> {
    user: &'a RsvpEntry,
}

/// Client for the shared RSVP store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
}

impl RemoteClient {
    /// Create a client for the server at `base_url`; every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = Self::check_response(response).await?;
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        if !parsed.success {
            return Err(ApiError::InvalidResponse(
                "Server reported failure".to_string(),
            ));
        }
        Ok(parsed)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::parse(response).await
    }

    // ===== Collection =====

    /// Fetch the collection and the revision it was read at.
    pub async fn fetch_snapshot(&self) -> Result<RemoteSnapshot, ApiError> {
        let response: ApiResponse<EntriesPayload> = self.get("/api/rsvp", &[]).await?;
        debug!(
            count = response.data.entries.len(),
            revision = response.revision_id,
            "Fetched remote collection"
        );

        Ok(RemoteSnapshot {
            entries: response.data.entries,
            revision: response.revision_id,
        })
    }

    /// Fetch the collection. Any failure yields an empty list, so an empty
    /// result may mean "unavailable" as well as "no entries".
    pub async fn fetch_entries(&self) -> Vec<RsvpEntry> {
        match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot.entries,
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote collection");
                Vec::new()
            }
        }
    }

    /// Replace the collection, optionally only if the server is still at `expected_revision`.
    pub async fn push_snapshot(
        &self,
        entries: &[RsvpEntry],
        expected_revision: Option<i64>,
    ) -> Result<PushReceipt, ApiError> {
        let body = PushBody {
            entries,
            expected_revision,
        };
        let response: ApiResponse<SaveReceipt> = self.post("/api/rsvp", &body).await?;

        Ok(PushReceipt {
            count: response.data.count,
            revision: response.revision_id,
        })
    }

    /// Replace the collection unconditionally (last writer wins).
    pub async fn push_entries(&self, entries: &[RsvpEntry]) -> bool {
        match self.push_snapshot(entries, None).await {
            Ok(receipt) => {
                debug!(count = receipt.count, revision = receipt.revision, "Pushed collection");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to push collection");
                false
            }
        }
    }

    /// Look up an existing entry by name and cohort. Failures read as "no match".
    pub async fn find_entry_by_identity(&self, name: &str, cohort: &str) -> Option<RsvpEntry> {
        let result: Result<ApiResponse<IdentityMatch>, ApiError> = self
            .get("/api/rsvp/check-user", &[("name", name), ("angkatan", cohort)])
            .await;

        match result {
            Ok(response) if response.data.exists => response.data.entry,
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to check for existing guest");
                None
            }
        }
    }

    // ===== Per-device record =====

    pub async fn save_user(&self, user: &RsvpEntry) -> Result<(), ApiError> {
        let _: ApiResponse<Ack> = self
            .post("/api/rsvp/save-user", &SaveUserBody { user })
            .await?;
        Ok(())
    }

    pub async fn load_user(&self, id: &str) -> Result<Option<RsvpEntry>, ApiError> {
        let response: ApiResponse<UserPayload> =
            self.get("/api/rsvp/load-user", &[("id", id)]).await?;
        Ok(response.data.user)
    }
}
