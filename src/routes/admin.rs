//! Admin surface. Responses are bare JSON documents rather than the
//! `{success, data}` envelope; errors still use the envelope.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AdminLoginResponse, AdminOrderPage, AdminUserUpdate, CreateContentRequest, Dashboard,
            UpdateContentRequest, UpdateListingStatusRequest, UpdateOrderStatusRequest,
            UpdateSettingsRequest,
        },
        auth::LoginRequest,
    },
    error::AppResult,
    extract::{Json, Path, Query},
    middleware::auth::AdminUser,
    models::{Content, Listing, Order, Settings, User},
    response::MessageData,
    routes::params::AdminOrderQuery,
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/orders", get(list_orders))
        .route("/orders/{id}/status", put(update_order_status))
        .route("/listings", get(list_listings))
        .route("/listings/{id}", axum::routing::delete(delete_listing))
        .route("/listings/{id}/status", put(update_listing_status))
        .route("/content", get(list_content).post(create_content))
        .route("/content/{id}", put(update_content).delete(delete_content))
        .route("/settings", get(get_settings).put(update_settings))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Admin token", body = AdminLoginResponse),
        (status = 401, description = "Invalid credentials or not an admin")
    ),
    tag = "Admin"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AdminLoginResponse>> {
    let resp = admin_service::admin_login(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/logout",
    responses((status = 200, description = "Logged out", body = MessageData)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn logout(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<MessageData>> {
    let resp = admin_service::admin_logout(&state, &admin).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Counts, revenue and recent activity", body = Dashboard),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Dashboard>> {
    let resp = admin_service::dashboard(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "All users", body = Vec<User>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<User>>> {
    let resp = admin_service::list_users(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let resp = admin_service::get_user(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid or duplicate values"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUserUpdate>,
) -> AppResult<Json<User>> {
    let resp = admin_service::update_user(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User, listings and images deleted", body = MessageData),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageData>> {
    let resp = admin_service::delete_user(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(AdminOrderQuery),
    responses((status = 200, description = "Paginated orders", body = AdminOrderPage)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminOrderQuery>,
) -> AppResult<Json<AdminOrderPage>> {
    let resp = admin_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Updated order", body = Order),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<Order>> {
    let resp = admin_service::update_order_status(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/listings",
    responses((status = 200, description = "All listings", body = Vec<Listing>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_listings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<Listing>>> {
    let resp = admin_service::list_listings(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/listings/{id}/status",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = UpdateListingStatusRequest,
    responses(
        (status = 200, description = "Updated listing", body = Listing),
        (status = 400, description = "Status not settable"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_listing_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListingStatusRequest>,
) -> AppResult<Json<Listing>> {
    let resp = admin_service::update_listing_status(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing and images deleted", body = MessageData),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_listing(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageData>> {
    let resp = admin_service::delete_listing(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/content",
    responses((status = 200, description = "All content", body = Vec<Content>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_content(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<Content>>> {
    let resp = admin_service::list_content(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/content",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Content created", body = Content),
        (status = 400, description = "Missing fields or slug in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_content(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateContentRequest>,
) -> AppResult<(StatusCode, Json<Content>)> {
    let resp = admin_service::create_content(&state, &admin, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/content/{id}",
    params(("id" = Uuid, Path, description = "Content ID")),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Updated content", body = Content),
        (status = 404, description = "Content not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_content(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContentRequest>,
) -> AppResult<Json<Content>> {
    let resp = admin_service::update_content(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/content/{id}",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Content deleted", body = MessageData),
        (status = 404, description = "Content not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_content(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageData>> {
    let resp = admin_service::delete_content(&state, &admin, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, description = "Site settings", body = Settings)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Settings>> {
    let resp = admin_service::get_settings(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Saved settings", body = Settings),
        (status = 400, description = "Invalid value")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> AppResult<Json<Settings>> {
    let resp = admin_service::update_settings(&state, &admin, payload).await?;
    Ok(Json(resp))
}
