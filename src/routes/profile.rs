use axum::{Router, extract::State, routing::get};

use crate::{
    dto::profile::{ProfileResponse, UpdateProfileRequest},
    error::AppResult,
    extract::Json,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::profile_service::{get_profile, update_profile},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(show).put(update))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile of the caller", body = ApiResponse<ProfileResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let resp = get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<ProfileResponse>),
        (status = 400, description = "Name or address missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let resp = update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}
