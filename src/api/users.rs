//! Per-device user record endpoints.

use axum::{
    extract::{Query, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::models::{Ack, SaveUserRequest, UserPayload, UserQuery};
use crate::AppState;

/// POST /api/rsvp/save-user - Store a device's own entry.
pub async fn save_user(
    State(state): State<AppState>,
    Json(request): Json<SaveUserRequest>,
) -> ApiResult<Ack> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Records without an id are accepted and ignored
    if let Some(user) = request.user.filter(|u| !u.id.is_empty()) {
        if let Err(e) = state.repo.save_user(&user).await {
            return error(e, revision_id);
        }
    }

    success(
        Ack {
            message: "User data saved successfully".to_string(),
        },
        revision_id,
    )
}

/// GET /api/rsvp/load-user - Load a device's own entry.
pub async fn load_user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<UserPayload> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let Some(id) = query.id.filter(|id| !id.is_empty()) else {
        return success(UserPayload { user: None }, revision_id);
    };

    match state.repo.load_user(&id).await {
        Ok(user) => success(UserPayload { user }, revision_id),
        Err(e) => error(e, revision_id),
    }
}
