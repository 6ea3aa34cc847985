//! User profile request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{UpdateAccountRequest, UserProfile};

/// `GET /api/v1/users/current-user`: the profile resolved by the auth middleware.
pub async fn current_user_handler(
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> Json<UserProfile> {
    Json(user.0.profile.into())
}

/// `PATCH /api/v1/users/update-account`: set fullname and email.
pub async fn update_account_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<UpdateAccountRequest>,
) -> AppResult<Json<UserProfile>> {
    let profile = state
        .sessions
        .update_account_details(&user.0.account_id, &body.fullname, &body.email)
        .await?;
    Ok(Json(profile.into()))
}
