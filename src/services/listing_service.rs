use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::listings::{
        ListingChanges, ListingDraft, ListingEnvelope, ListingForm, ListingList, NewListing,
        PriceFields, validate_images,
    },
    entity::{
        Listings, Users,
        listings::{ActiveModel as ListingActive, Column, Model as ListingModel},
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Image, Listing, ListingStatus, Price, SellerSummary},
    response::{ApiResponse, MessageData},
    routes::params::{ListingQuery, ListingSortBy, SortOrder},
    services::{image_service, stored},
    state::AppState,
};

pub async fn create_listing(
    state: &AppState,
    user: &AuthUser,
    form: ListingForm,
) -> AppResult<ApiResponse<ListingEnvelope>> {
    let ListingForm { fields, images } = form;
    if images.is_empty() {
        return Err(AppError::bad_request("At least one image is required"));
    }
    validate_images(&images)?;
    let new = NewListing::from_fields(&fields)?;

    let txn = state.orm.begin().await?;
    let image_ids = image_service::store_images(&txn, images).await?;

    let mut active = ListingActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        title: Set(new.title),
        description: Set(new.description),
        listing_type: Set(new.listing_type.as_str().to_string()),
        category: Set(new.category),
        condition: Set(new.condition.as_str().to_string()),
        status: Set(ListingStatus::Available.as_str().to_string()),
        location: Set(new.location),
        delivery_available: Set(new.delivery_available),
        contact_info: Set(new.contact_info),
        price_amount: NotSet,
        price_per_day: NotSet,
        price_per_week: NotSet,
        price_per_month: NotSet,
        security_deposit: NotSet,
        delivery_charges: NotSet,
        renter_id: Set(None),
        rental_start_date: Set(None),
        rental_end_date: Set(None),
        rental_quantity: Set(None),
        rental_total_amount: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    };
    set_price(&mut active, &new.price);
    let listing = active.insert(&txn).await?;
    image_service::link_images(&txn, listing.id, &image_ids).await?;
    txn.commit().await?;

    tracing::info!(listing_id = %listing.id, images = image_ids.len(), "listing created");
    audit::record(
        state,
        Some(user.user_id),
        "listing_create",
        "listings",
        serde_json::json!({ "listing_id": listing.id }),
    )
    .await;

    let listing = load_listing(&state.orm, listing.id).await?;
    Ok(ApiResponse::success(ListingEnvelope { listing }))
}

pub async fn list_listings(
    state: &AppState,
    query: ListingQuery,
) -> AppResult<ApiResponse<ListingList>> {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Category).ilike(category.clone()));
    }
    if let Some(listing_type) = query.listing_type {
        condition = condition.add(Column::ListingType.eq(listing_type.as_str()));
    }
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    let sort_col = match query.sort_by.unwrap_or(ListingSortBy::CreatedAt) {
        ListingSortBy::CreatedAt => Column::CreatedAt,
        ListingSortBy::Title => Column::Title,
    };
    let mut finder = Listings::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let models = finder.all(&state.orm).await?;
    let listings = populate(&state.orm, models).await?;
    Ok(ApiResponse::success(ListingList { listings }))
}

pub async fn list_my_listings(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ListingList>> {
    let models = Listings::find()
        .filter(Column::SellerId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?;
    let listings = populate(&state.orm, models).await?;
    Ok(ApiResponse::success(ListingList { listings }))
}

pub async fn list_my_rentals(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ListingList>> {
    let models = Listings::find()
        .filter(Column::RenterId.eq(user.user_id))
        .order_by_desc(Column::RentalStartDate)
        .all(&state.orm)
        .await?;
    let listings = populate(&state.orm, models).await?;
    Ok(ApiResponse::success(ListingList { listings }))
}

pub async fn get_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ListingEnvelope>> {
    let model = Listings::find()
        .filter(Column::Id.eq(id))
        .filter(Column::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;
    let listing = populate(&state.orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Listing"))?;
    Ok(ApiResponse::success(ListingEnvelope { listing }))
}

pub async fn update_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    form: ListingForm,
) -> AppResult<ApiResponse<ListingEnvelope>> {
    let ListingForm { fields, images } = form;
    validate_images(&images)?;
    let changes = ListingChanges::from_fields(&fields)?;

    let txn = state.orm.begin().await?;
    let existing = Listings::find()
        .filter(Column::Id.eq(id))
        .filter(Column::SellerId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;

    let mut draft = draft_from_entity(&existing)?;
    draft.apply(changes)?;
    let price = draft.validated_price()?;

    let replaced_images = !images.is_empty();
    if replaced_images {
        let old_ids = image_service::image_ids_for_listing(&txn, id).await?;
        image_service::delete_images(&txn, &old_ids).await?;
        let new_ids = image_service::store_images(&txn, images).await?;
        image_service::link_images(&txn, id, &new_ids).await?;
    }

    let mut active: ListingActive = existing.into();
    active.title = Set(draft.title);
    active.description = Set(draft.description);
    active.listing_type = Set(draft.listing_type.as_str().to_string());
    active.category = Set(draft.category);
    active.condition = Set(draft.condition.as_str().to_string());
    active.location = Set(draft.location);
    active.delivery_available = Set(draft.delivery_available);
    active.contact_info = Set(draft.contact_info);
    active.status = Set(draft.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    set_price(&mut active, &price);
    active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "listing_update",
        "listings",
        serde_json::json!({ "listing_id": id, "images_replaced": replaced_images }),
    )
    .await;

    let listing = load_listing(&state.orm, id).await?;
    Ok(ApiResponse::success(ListingEnvelope { listing }))
}

pub async fn delete_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    let txn = state.orm.begin().await?;
    let existing = Listings::find()
        .filter(Column::Id.eq(id))
        .filter(Column::SellerId.eq(user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;
    let removed_images = remove_listing(&txn, existing.id).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "listing_delete",
        "listings",
        serde_json::json!({ "listing_id": id, "images_removed": removed_images }),
    )
    .await;

    Ok(ApiResponse::success(MessageData::new(
        "Listing deleted successfully",
    )))
}

/// Delete a listing and every image it references; returns the number of
/// image rows removed.
pub(crate) async fn remove_listing<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<u64> {
    let image_ids = image_service::image_ids_for_listing(conn, id).await?;
    let result = Listings::delete_by_id(id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Listing"));
    }
    image_service::delete_images(conn, &image_ids).await
}

pub(crate) async fn load_listing<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Listing> {
    let model = Listings::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;
    populate(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Listing"))
}

/// Attach seller usernames and image payloads to listing rows.
pub(crate) async fn populate<C: ConnectionTrait>(
    conn: &C,
    models: Vec<ListingModel>,
) -> AppResult<Vec<Listing>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let listing_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let seller_ids: Vec<Uuid> = models
        .iter()
        .map(|m| m.seller_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let sellers: HashMap<Uuid, String> = Users::find()
        .filter(UserCol::Id.is_in(seller_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();
    let mut images = image_service::images_for_listings(conn, &listing_ids).await?;

    models
        .into_iter()
        .map(|model| {
            let username = sellers.get(&model.seller_id).cloned().unwrap_or_default();
            let listing_images = images.remove(&model.id).unwrap_or_default();
            listing_from_entity(model, username, listing_images)
        })
        .collect()
}

fn set_price(active: &mut ListingActive, price: &Price) {
    active.price_amount = Set(price.amount);
    active.price_per_day = Set(price.per_day);
    active.price_per_week = Set(price.per_week);
    active.price_per_month = Set(price.per_month);
    active.security_deposit = Set(price.security_deposit);
    active.delivery_charges = Set(price.delivery_charges);
}

pub(crate) fn price_from_entity(model: &ListingModel) -> Price {
    Price {
        amount: model.price_amount,
        per_day: model.price_per_day,
        per_week: model.price_per_week,
        per_month: model.price_per_month,
        security_deposit: model.security_deposit,
        delivery_charges: model.delivery_charges,
    }
}

fn draft_from_entity(model: &ListingModel) -> AppResult<ListingDraft> {
    Ok(ListingDraft {
        title: model.title.clone(),
        description: model.description.clone(),
        listing_type: stored(&model.listing_type)?,
        price: PriceFields::from(&price_from_entity(model)),
        category: model.category.clone(),
        condition: stored(&model.condition)?,
        location: model.location.clone(),
        delivery_available: model.delivery_available,
        contact_info: model.contact_info.clone(),
        status: stored(&model.status)?,
    })
}

fn listing_from_entity(
    model: ListingModel,
    seller_username: String,
    images: Vec<Image>,
) -> AppResult<Listing> {
    Ok(Listing {
        price: price_from_entity(&model),
        listing_type: stored(&model.listing_type)?,
        condition: stored(&model.condition)?,
        status: stored(&model.status)?,
        id: model.id,
        seller: SellerSummary {
            id: model.seller_id,
            username: seller_username,
        },
        title: model.title,
        description: model.description,
        category: model.category,
        images,
        location: model.location,
        delivery_available: model.delivery_available,
        contact_info: model.contact_info,
        renter_id: model.renter_id,
        rental_start_date: model.rental_start_date.map(|d| d.with_timezone(&Utc)),
        rental_end_date: model.rental_end_date.map(|d| d.with_timezone(&Utc)),
        rental_quantity: model.rental_quantity,
        rental_total_amount: model.rental_total_amount,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
