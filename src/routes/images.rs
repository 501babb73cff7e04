use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{error::AppResult, extract::Path, services::image_service, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_image))
}

#[utoipa::path(
    get,
    path = "/api/images/{id}",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Decoded image bytes", content_type = "image/*"),
        (status = 404, description = "Image not found")
    ),
    tag = "Images"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (content_type, bytes) = image_service::get_image(&state, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        bytes,
    ))
}
