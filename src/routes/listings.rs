use axum::{
    Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::listings::{
        ImageUpload, ListingEnvelope, ListingForm, ListingList, ListingUploadForm, MAX_IMAGES,
        RentListingRequest,
    },
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    middleware::auth::AuthUser,
    response::{ApiResponse, MessageData},
    routes::params::ListingQuery,
    services::{listing_service, rental_service},
    state::AppState,
};

const IMAGE_FIELD: &str = "images";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings).post(create_listing))
        .route("/my-listings", get(my_listings))
        .route("/my-rentals", get(my_rentals))
        .route(
            "/{id}",
            get(get_listing).put(update_listing).delete(delete_listing),
        )
        .route("/{id}/rent", post(rent_listing))
        .route("/{id}/return", post(return_listing))
}

/// Split a multipart body into text fields and image files. Empty file parts
/// (an untouched file input) are skipped.
pub async fn read_listing_form(mut multipart: Multipart) -> AppResult<ListingForm> {
    let mut form = ListingForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == IMAGE_FIELD {
            if form.images.len() == MAX_IMAGES {
                return Err(AppError::bad_request(format!(
                    "At most {MAX_IMAGES} images are allowed"
                )));
            }
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }
            form.images.push(ImageUpload {
                filename,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

#[utoipa::path(
    post,
    path = "/api/listings",
    request_body(content = ListingUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Listing created", body = ApiResponse<ListingEnvelope>),
        (status = 400, description = "Missing fields, bad price or bad images")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<ListingEnvelope>>)> {
    let form = read_listing_form(multipart).await?;
    let resp = listing_service::create_listing(&state, &user, form).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingQuery),
    responses(
        (status = 200, description = "All listings, newest first", body = ApiResponse<ListingList>)
    ),
    tag = "Listings"
)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::list_listings(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/listings/my-listings",
    responses(
        (status = 200, description = "Listings sold by the caller", body = ApiResponse<ListingList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn my_listings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::list_my_listings(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/listings/my-rentals",
    responses(
        (status = 200, description = "Listings rented by the caller", body = ApiResponse<ListingList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn my_rentals(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::list_my_rentals(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing owned by the caller", body = ApiResponse<ListingEnvelope>),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn get_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ListingEnvelope>>> {
    let resp = listing_service::get_listing(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body(content = ListingUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated listing", body = ApiResponse<ListingEnvelope>),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn update_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ListingEnvelope>>> {
    let form = read_listing_form(multipart).await?;
    let resp = listing_service::update_listing(&state, &user, id, form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing and its images deleted", body = ApiResponse<MessageData>),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn delete_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = listing_service::delete_listing(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/rent",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = RentListingRequest,
    responses(
        (status = 200, description = "Listing rented", body = ApiResponse<ListingEnvelope>),
        (status = 400, description = "Not rentable"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Rentals"
)]
pub async fn rent_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RentListingRequest>,
) -> AppResult<Json<ApiResponse<ListingEnvelope>>> {
    let resp = rental_service::rent_listing(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/return",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing returned", body = ApiResponse<ListingEnvelope>),
        (status = 400, description = "Listing is not rented"),
        (status = 403, description = "Caller is not the renter")
    ),
    security(("bearer_auth" = [])),
    tag = "Rentals"
)]
pub async fn return_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ListingEnvelope>>> {
    let resp = rental_service::return_listing(&state, &user, id).await?;
    Ok(Json(resp))
}
