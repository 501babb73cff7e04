use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            AdminLoginResponse, AdminOrderPage, AdminUserUpdate, CreateContentRequest, Dashboard,
            DashboardStats, UpdateContentRequest, UpdateListingStatusRequest,
            UpdateOrderStatusRequest, UpdateSettingsRequest, slugify,
        },
        auth::LoginRequest,
    },
    entity::{
        Contents, Listings, Orders, Settings as SettingsEntity, Users,
        contents::{ActiveModel as ContentActive, Column as ContentCol, Model as ContentModel},
        listings::{ActiveModel as ListingActive, Column as ListingCol},
        orders::{ActiveModel as OrderActive, Column as OrderCol},
        settings::{ActiveModel as SettingsActive, Model as SettingsModel},
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{
        Content, ContentStatus, ContentType, Listing, ListingStatus, Order, OrderStatus, Role,
        Settings, User,
    },
    response::MessageData,
    routes::params::AdminOrderQuery,
    services::{
        auth_service::{authenticate, issue_token, user_from_entity},
        listing_service::{populate, remove_listing},
        order_service::with_items,
        stored,
    },
    state::AppState,
};

const SETTINGS_ID: i32 = 1;
const RECENT_LIMIT: u64 = 5;

pub async fn admin_login(state: &AppState, payload: LoginRequest) -> AppResult<AdminLoginResponse> {
    let user = authenticate(state, payload).await?;
    if user.role != Role::Admin {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    audit::record(
        state,
        Some(user.id),
        "admin_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let token = issue_token(&state.config, user.id, user.role)?;
    Ok(AdminLoginResponse { token, admin: user })
}

/// Tokens are stateless; logout only leaves an audit trail.
pub async fn admin_logout(state: &AppState, admin: &AuthUser) -> AppResult<MessageData> {
    audit::record(
        state,
        Some(admin.user_id),
        "admin_logout",
        "users",
        serde_json::json!({ "user_id": admin.user_id }),
    )
    .await;
    Ok(MessageData::new("Logged out successfully"))
}

pub async fn dashboard(state: &AppState) -> AppResult<Dashboard> {
    let total_users = Users::find().count(&state.orm).await?;
    let total_listings = Listings::find().count(&state.orm).await?;
    let total_orders = Orders::find().count(&state.orm).await?;
    let total_content = Contents::find().count(&state.orm).await?;

    let revenue: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders WHERE status <> $1",
    )
    .bind(OrderStatus::Cancelled.as_str())
    .fetch_one(&state.pool)
    .await?;

    let recent_users = Users::find()
        .order_by_desc(UserCol::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let recent_orders = Orders::find()
        .order_by_desc(OrderCol::OrderDate)
        .limit(RECENT_LIMIT)
        .all(&state.orm)
        .await?;
    let recent_orders = with_items(&state.orm, recent_orders).await?;

    Ok(Dashboard {
        stats: DashboardStats {
            total_users,
            total_listings,
            total_orders,
            total_content,
            revenue,
        },
        recent_users,
        recent_orders,
    })
}

pub async fn list_users(state: &AppState) -> AppResult<Vec<User>> {
    Users::find()
        .order_by_desc(UserCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect()
}

pub async fn get_user(state: &AppState, id: Uuid) -> AppResult<User> {
    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    user_from_entity(user)
}

pub async fn update_user(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: AdminUserUpdate,
) -> AppResult<User> {
    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let username = payload.username.map(|u| u.trim().to_string());
    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(username) = &username {
        if !(3..=30).contains(&username.chars().count()) {
            return Err(AppError::bad_request(
                "Username must be between 3 and 30 characters",
            ));
        }
    }
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(AppError::bad_request("Please enter a valid email"));
        }
    }

    let mut clash = Condition::any();
    if let Some(username) = &username {
        clash = clash.add(UserCol::Username.eq(username.as_str()));
    }
    if let Some(email) = &email {
        clash = clash.add(UserCol::Email.eq(email.as_str()));
    }
    if username.is_some() || email.is_some() {
        let taken = Users::find()
            .filter(clash)
            .filter(UserCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if taken.is_some() {
            return Err(AppError::bad_request("Username or email is already taken"));
        }
    }

    let mut active: UserActive = existing.into();
    if let Some(username) = username {
        active.username = Set(username);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(role) = payload.role {
        active.role = Set(role.as_str().to_string());
    }
    if let Some(name) = payload.name {
        active.profile_name = Set(Some(name));
    }
    if let Some(address) = payload.address {
        active.profile_address = Set(Some(address));
    }
    active.updated_at = Set(Utc::now().into());
    let user = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(admin.user_id),
        "admin_user_update",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    user_from_entity(user)
}

pub async fn delete_user(state: &AppState, admin: &AuthUser, id: Uuid) -> AppResult<MessageData> {
    if admin.user_id == id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    let txn = state.orm.begin().await?;
    Users::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    // Listings the user is renting go back on the market.
    let released = Listings::update_many()
        .col_expr(ListingCol::Status, Expr::value(ListingStatus::Available.as_str()))
        .col_expr(ListingCol::RenterId, Expr::value(Option::<Uuid>::None))
        .col_expr(ListingCol::RentalStartDate, Expr::value(Option::<DateTime<Utc>>::None))
        .col_expr(ListingCol::RentalEndDate, Expr::value(Option::<DateTime<Utc>>::None))
        .col_expr(ListingCol::RentalQuantity, Expr::value(Option::<i32>::None))
        .col_expr(ListingCol::RentalTotalAmount, Expr::value(Option::<i64>::None))
        .col_expr(ListingCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(ListingCol::RenterId.eq(id))
        .filter(ListingCol::Status.eq(ListingStatus::Rented.as_str()))
        .exec(&txn)
        .await?
        .rows_affected;

    let listing_ids: Vec<Uuid> = Listings::find()
        .filter(ListingCol::SellerId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();
    let mut removed_images = 0;
    for listing_id in &listing_ids {
        removed_images += remove_listing(&txn, *listing_id).await?;
    }
    Users::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %id,
        listings = listing_ids.len(),
        rentals_released = released,
        "user deleted by admin"
    );
    audit::record(
        state,
        Some(admin.user_id),
        "admin_user_delete",
        "users",
        serde_json::json!({
            "user_id": id,
            "listings_removed": listing_ids.len(),
            "images_removed": removed_images,
            "rentals_released": released,
        }),
    )
    .await;

    Ok(MessageData::new("User deleted successfully"))
}

pub async fn list_orders(state: &AppState, query: AdminOrderQuery) -> AppResult<AdminOrderPage> {
    let (page_index, per_page) = query.pagination().normalize();

    let mut finder = Orders::find().order_by_desc(OrderCol::OrderDate);
    if let Some(status) = query.status {
        finder = finder.filter(OrderCol::Status.eq(status.as_str()));
    }

    let paginator = finder.paginate(&state.orm, per_page);
    let total = paginator.num_items().await?;
    let models = paginator.fetch_page(page_index).await?;
    let orders = with_items(&state.orm, models).await?;

    Ok(AdminOrderPage {
        orders,
        total,
        page: page_index + 1,
        per_page,
    })
}

pub async fn update_order_status(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<Order> {
    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let previous = existing.status.clone();

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(admin.user_id),
        "admin_order_status",
        "orders",
        serde_json::json!({
            "order_id": id,
            "from": previous,
            "to": payload.status,
        }),
    )
    .await;

    with_items(&state.orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order"))
}

pub async fn list_listings(state: &AppState) -> AppResult<Vec<Listing>> {
    let models = Listings::find()
        .order_by_desc(ListingCol::CreatedAt)
        .all(&state.orm)
        .await?;
    populate(&state.orm, models).await
}

/// Moving a rented listing to any other status ends the rental.
pub async fn update_listing_status(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateListingStatusRequest,
) -> AppResult<Listing> {
    if payload.status == ListingStatus::Rented {
        return Err(AppError::bad_request(
            "Listings become rented only through a rental",
        ));
    }

    let txn = state.orm.begin().await?;
    let existing = Listings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;
    let previous: ListingStatus = stored(&existing.status)?;

    let mut active: ListingActive = existing.into();
    active.status = Set(payload.status.as_str().to_string());
    if previous == ListingStatus::Rented {
        active.renter_id = Set(None);
        active.rental_start_date = Set(None);
        active.rental_end_date = Set(None);
        active.rental_quantity = Set(None);
        active.rental_total_amount = Set(None);
    }
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(admin.user_id),
        "admin_listing_status",
        "listings",
        serde_json::json!({ "listing_id": id, "from": previous, "to": payload.status }),
    )
    .await;

    populate(&state.orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Listing"))
}

pub async fn delete_listing(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
) -> AppResult<MessageData> {
    let txn = state.orm.begin().await?;
    let removed_images = remove_listing(&txn, id).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(admin.user_id),
        "admin_listing_delete",
        "listings",
        serde_json::json!({ "listing_id": id, "images_removed": removed_images }),
    )
    .await;

    Ok(MessageData::new("Listing deleted successfully"))
}

pub async fn list_content(state: &AppState) -> AppResult<Vec<Content>> {
    Contents::find()
        .order_by_desc(ContentCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(content_from_entity)
        .collect()
}

pub async fn create_content(
    state: &AppState,
    admin: &AuthUser,
    payload: CreateContentRequest,
) -> AppResult<Content> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("Content is required"));
    }
    let slug = resolve_slug(payload.slug.as_deref(), &title)?;
    ensure_slug_free(state, &slug, None).await?;

    let model = ContentActive {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        slug: Set(slug),
        content: Set(payload.content),
        content_type: Set(payload
            .content_type
            .unwrap_or(ContentType::Post)
            .as_str()
            .to_string()),
        status: Set(payload
            .status
            .unwrap_or(ContentStatus::Draft)
            .as_str()
            .to_string()),
        author_id: Set(admin.user_id),
        featured_image: Set(payload.featured_image),
        tags: Set(serde_json::json!(payload.tags)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(admin.user_id),
        "content_create",
        "contents",
        serde_json::json!({ "content_id": model.id, "slug": model.slug }),
    )
    .await;

    content_from_entity(model)
}

pub async fn update_content(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateContentRequest,
) -> AppResult<Content> {
    let existing = Contents::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Content"))?;

    let mut active: ContentActive = existing.into();
    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::bad_request("Title cannot be empty"));
        }
        active.title = Set(title);
    }
    if let Some(slug) = payload.slug {
        let slug = slugify(&slug);
        if slug.is_empty() {
            return Err(AppError::bad_request("Slug cannot be empty"));
        }
        ensure_slug_free(state, &slug, Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    if let Some(content_type) = payload.content_type {
        active.content_type = Set(content_type.as_str().to_string());
    }
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(featured_image) = payload.featured_image {
        active.featured_image = Set(Some(featured_image));
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(serde_json::json!(tags));
    }
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(admin.user_id),
        "content_update",
        "contents",
        serde_json::json!({ "content_id": id }),
    )
    .await;

    content_from_entity(model)
}

pub async fn delete_content(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
) -> AppResult<MessageData> {
    let result = Contents::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Content"));
    }

    audit::record(
        state,
        Some(admin.user_id),
        "content_delete",
        "contents",
        serde_json::json!({ "content_id": id }),
    )
    .await;

    Ok(MessageData::new("Content deleted successfully"))
}

pub async fn get_settings(state: &AppState) -> AppResult<Settings> {
    let settings = SettingsEntity::find_by_id(SETTINGS_ID)
        .one(&state.orm)
        .await?
        .map(settings_from_entity)
        .unwrap_or_default();
    Ok(settings)
}

pub async fn update_settings(
    state: &AppState,
    admin: &AuthUser,
    payload: UpdateSettingsRequest,
) -> AppResult<Settings> {
    let mut settings = get_settings(state).await?;
    apply_settings(&mut settings, payload)?;
    let now = Utc::now();

    let existing = SettingsEntity::find_by_id(SETTINGS_ID)
        .one(&state.orm)
        .await?;
    let is_new = existing.is_none();
    let mut active: SettingsActive = match existing {
        Some(model) => model.into(),
        None => SettingsActive {
            id: Set(SETTINGS_ID),
            ..Default::default()
        },
    };
    active.site_name = Set(settings.site_name.clone());
    active.site_description = Set(settings.site_description.clone());
    active.maintenance_mode = Set(settings.maintenance_mode);
    active.allow_registration = Set(settings.allow_registration);
    active.email_notifications = Set(settings.email_notifications);
    active.theme = Set(settings.theme.clone());
    active.contact_email = Set(settings.contact_email.clone());
    active.social_links = Set(settings.social_links.clone());
    active.analytics = Set(settings.analytics.clone());
    active.updated_at = Set(now.into());

    let model = if is_new {
        active.insert(&state.orm).await?
    } else {
        active.update(&state.orm).await?
    };

    audit::record(
        state,
        Some(admin.user_id),
        "settings_update",
        "settings",
        serde_json::json!({ "allow_registration": model.allow_registration }),
    )
    .await;

    Ok(settings_from_entity(model))
}

fn apply_settings(settings: &mut Settings, payload: UpdateSettingsRequest) -> AppResult<()> {
    if let Some(site_name) = payload.site_name {
        let site_name = site_name.trim().to_string();
        if site_name.is_empty() {
            return Err(AppError::bad_request("Site name cannot be empty"));
        }
        settings.site_name = site_name;
    }
    if let Some(site_description) = payload.site_description {
        settings.site_description = site_description;
    }
    if let Some(maintenance_mode) = payload.maintenance_mode {
        settings.maintenance_mode = maintenance_mode;
    }
    if let Some(allow_registration) = payload.allow_registration {
        settings.allow_registration = allow_registration;
    }
    if let Some(email_notifications) = payload.email_notifications {
        settings.email_notifications = email_notifications;
    }
    if let Some(theme) = payload.theme {
        settings.theme = theme;
    }
    if let Some(contact_email) = payload.contact_email {
        let contact_email = contact_email.trim().to_string();
        if !contact_email.is_empty() && !contact_email.contains('@') {
            return Err(AppError::bad_request("Contact email is not valid"));
        }
        settings.contact_email = contact_email;
    }
    if let Some(social_links) = payload.social_links {
        if !social_links.is_object() {
            return Err(AppError::bad_request("socialLinks must be an object"));
        }
        settings.social_links = social_links;
    }
    if let Some(analytics) = payload.analytics {
        if !analytics.is_object() {
            return Err(AppError::bad_request("analytics must be an object"));
        }
        settings.analytics = analytics;
    }
    Ok(())
}

fn resolve_slug(requested: Option<&str>, title: &str) -> AppResult<String> {
    let slug = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slugify(slug),
        None => slugify(title),
    };
    if slug.is_empty() {
        return Err(AppError::bad_request(
            "Slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

async fn ensure_slug_free(state: &AppState, slug: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Contents::find().filter(ContentCol::Slug.eq(slug));
    if let Some(id) = except {
        finder = finder.filter(ContentCol::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::bad_request("Slug is already in use"));
    }
    Ok(())
}

fn content_from_entity(model: ContentModel) -> AppResult<Content> {
    let tags: Vec<String> = serde_json::from_value(model.tags)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt tags on content {}: {e}", model.id)))?;
    Ok(Content {
        id: model.id,
        title: model.title,
        slug: model.slug,
        content: model.content,
        content_type: stored(&model.content_type)?,
        status: stored(&model.status)?,
        author_id: model.author_id,
        featured_image: model.featured_image,
        tags,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn settings_from_entity(model: SettingsModel) -> Settings {
    Settings {
        site_name: model.site_name,
        site_description: model.site_description,
        maintenance_mode: model.maintenance_mode,
        allow_registration: model.allow_registration,
        email_notifications: model.email_notifications,
        theme: model.theme,
        contact_email: model.contact_email,
        social_links: model.social_links,
        analytics: model.analytics,
        updated_at: Some(model.updated_at.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_falls_back_to_title() {
        assert_eq!(resolve_slug(None, "Shipping Policy").unwrap(), "shipping-policy");
        assert_eq!(resolve_slug(Some("  "), "FAQ").unwrap(), "faq");
        assert_eq!(resolve_slug(Some("My Custom Slug"), "ignored").unwrap(), "my-custom-slug");
        assert!(resolve_slug(None, "!!!").is_err());
    }

    #[test]
    fn settings_patch_only_touches_given_fields() {
        let mut settings = Settings::default();
        apply_settings(
            &mut settings,
            UpdateSettingsRequest {
                allow_registration: Some(false),
                theme: Some("dark".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!settings.allow_registration);
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.site_name, "Marketplace");
        assert!(settings.email_notifications);
    }

    #[test]
    fn settings_reject_bad_values() {
        let mut settings = Settings::default();
        let blank_name = UpdateSettingsRequest {
            site_name: Some("  ".into()),
            ..Default::default()
        };
        assert!(apply_settings(&mut settings, blank_name).is_err());

        let bad_links = UpdateSettingsRequest {
            social_links: Some(serde_json::json!(["x"])),
            ..Default::default()
        };
        assert!(apply_settings(&mut settings, bad_links).is_err());

        let bad_email = UpdateSettingsRequest {
            contact_email: Some("nobody".into()),
            ..Default::default()
        };
        assert!(apply_settings(&mut settings, bad_email).is_err());
    }
}
