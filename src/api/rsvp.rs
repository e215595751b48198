//! Collection API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{EntriesPayload, IdentityMatch, IdentityQuery, SaveEntriesRequest, SaveReceipt};
use crate::AppState;

/// GET /api/rsvp - Load the full collection.
pub async fn load_entries(State(state): State<AppState>) -> ApiResult<EntriesPayload> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_entries().await {
        Ok(entries) => success(EntriesPayload { entries }, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/rsvp - Replace the full collection.
pub async fn save_entries(
    State(state): State<AppState>,
    body: Result<Json<SaveEntriesRequest>, JsonRejection>,
) -> ApiResult<SaveReceipt> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error(
                AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text())),
                revision_id,
            )
        }
    };

    let Some(entries) = request.entries else {
        return error(
            AppError::Validation("Invalid data format".to_string()),
            revision_id,
        );
    };

    match state
        .repo
        .replace_entries(&entries, request.expected_revision)
        .await
    {
        Ok(new_revision) => {
            tracing::info!(
                count = entries.len(),
                revision = new_revision,
                "RSVP data saved"
            );
            success(
                SaveReceipt {
                    message: "Data saved successfully".to_string(),
                    count: entries.len(),
                },
                new_revision,
            )
        }
        Err(e) => {
            let current = state.repo.get_revision_id().await.unwrap_or(revision_id);
            error(e, current)
        }
    }
}

/// GET /api/rsvp/check-user - Look up a guest by name and cohort.
pub async fn check_user(
    State(state): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> ApiResult<IdentityMatch> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let (Some(name), Some(angkatan)) = (query.name, query.angkatan) else {
        return success(
            IdentityMatch {
                exists: false,
                entry: None,
            },
            revision_id,
        );
    };

    if name.trim().is_empty() || angkatan.trim().is_empty() {
        return success(
            IdentityMatch {
                exists: false,
                entry: None,
            },
            revision_id,
        );
    }

    match state.repo.find_by_identity(&name, &angkatan).await {
        Ok(entry) => success(
            IdentityMatch {
                exists: entry.is_some(),
                entry,
            },
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}
