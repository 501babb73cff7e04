use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::listings::{ListingEnvelope, RentListingRequest},
    entity::{Listings, listings::ActiveModel as ListingActive},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ListingStatus, ListingType, Price, RentalPeriod},
    response::ApiResponse,
    services::{
        listing_service::{load_listing, price_from_entity},
        stored,
    },
    state::AppState,
};

pub const MAX_RENTAL_QUANTITY: i32 = 100;

/// Dates and amount a rent request resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalQuote {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quantity: i32,
    pub total_amount: i64,
}

pub async fn rent_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RentListingRequest,
) -> AppResult<ApiResponse<ListingEnvelope>> {
    let txn = state.orm.begin().await?;
    let listing = Listings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;

    ensure_rentable(
        stored(&listing.listing_type)?,
        stored(&listing.status)?,
        listing.seller_id,
        user.user_id,
    )?;
    let quote = quote_rental(
        &price_from_entity(&listing),
        listing.delivery_available,
        &payload,
        Utc::now(),
    )?;

    let mut active: ListingActive = listing.into();
    active.status = Set(ListingStatus::Rented.as_str().to_string());
    active.renter_id = Set(Some(user.user_id));
    active.rental_start_date = Set(Some(quote.start.into()));
    active.rental_end_date = Set(Some(quote.end.into()));
    active.rental_quantity = Set(Some(quote.quantity));
    active.rental_total_amount = Set(Some(quote.total_amount));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(listing_id = %id, renter = %user.user_id, total = quote.total_amount, "listing rented");
    audit::record(
        state,
        Some(user.user_id),
        "listing_rent",
        "listings",
        serde_json::json!({
            "listing_id": id,
            "duration": payload.duration,
            "quantity": quote.quantity,
            "total_amount": quote.total_amount,
        }),
    )
    .await;

    let listing = load_listing(&state.orm, id).await?;
    Ok(ApiResponse::success(ListingEnvelope { listing }))
}

pub async fn return_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ListingEnvelope>> {
    let txn = state.orm.begin().await?;
    let listing = Listings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))?;

    ensure_returnable(stored(&listing.status)?, listing.renter_id, user.user_id)?;

    let mut active: ListingActive = listing.into();
    active.status = Set(ListingStatus::Available.as_str().to_string());
    active.renter_id = Set(None);
    active.rental_start_date = Set(None);
    active.rental_end_date = Set(None);
    active.rental_quantity = Set(None);
    active.rental_total_amount = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "listing_return",
        "listings",
        serde_json::json!({ "listing_id": id }),
    )
    .await;

    let listing = load_listing(&state.orm, id).await?;
    Ok(ApiResponse::success(ListingEnvelope { listing }))
}

pub fn ensure_rentable(
    listing_type: ListingType,
    status: ListingStatus,
    seller_id: Uuid,
    renter_id: Uuid,
) -> AppResult<()> {
    if listing_type != ListingType::Rental {
        return Err(AppError::bad_request("Only rental listings can be rented"));
    }
    if seller_id == renter_id {
        return Err(AppError::bad_request("You cannot rent your own listing"));
    }
    match status {
        ListingStatus::Available => Ok(()),
        ListingStatus::Rented => Err(AppError::bad_request("Listing is already rented")),
        _ => Err(AppError::bad_request("Listing is not available for rent")),
    }
}

/// A listing that is not rented is a 400 for everyone; a rented one may only
/// be returned by its renter.
pub fn ensure_returnable(
    status: ListingStatus,
    renter_id: Option<Uuid>,
    caller: Uuid,
) -> AppResult<()> {
    if status != ListingStatus::Rented {
        return Err(AppError::bad_request("Listing is not currently rented"));
    }
    if renter_id != Some(caller) {
        return Err(AppError::Forbidden(
            "Only the renter can return this listing".into(),
        ));
    }
    Ok(())
}

pub fn quote_rental(
    price: &Price,
    delivery_available: bool,
    request: &RentListingRequest,
    now: DateTime<Utc>,
) -> AppResult<RentalQuote> {
    let quantity = request.quantity.unwrap_or(1);
    if !(1..=MAX_RENTAL_QUANTITY).contains(&quantity) {
        return Err(AppError::bad_request(format!(
            "Quantity must be between 1 and {MAX_RENTAL_QUANTITY}"
        )));
    }

    let rate = match request.duration {
        RentalPeriod::Daily => price.per_day,
        RentalPeriod::Weekly => price.per_week,
        RentalPeriod::Monthly => price.per_month,
    }
    .ok_or_else(|| AppError::bad_request("Listing has no rate for this duration"))?;

    let delivery = if delivery_available {
        price.delivery_charges
    } else {
        0
    };
    let total_amount = rate
        .checked_mul(i64::from(quantity))
        .and_then(|v| v.checked_add(price.security_deposit.unwrap_or(0)))
        .and_then(|v| v.checked_add(delivery))
        .ok_or_else(|| AppError::bad_request("Rental total is out of range"))?;

    let start = request.start_date.unwrap_or(now);
    let end = start + Duration::days(request.duration.days() * i64::from(quantity));

    Ok(RentalQuote {
        start,
        end,
        quantity,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn rental_price() -> Price {
        Price {
            per_day: Some(10),
            per_week: Some(60),
            per_month: Some(200),
            security_deposit: Some(50),
            delivery_charges: 15,
            ..Price::default()
        }
    }

    fn request(duration: RentalPeriod, quantity: Option<i32>) -> RentListingRequest {
        RentListingRequest {
            duration,
            quantity,
            start_date: None,
        }
    }

    #[test]
    fn weekly_quote_covers_quantity_deposit_and_delivery() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let quote =
            quote_rental(&rental_price(), true, &request(RentalPeriod::Weekly, Some(2)), now)
                .unwrap();
        assert_eq!(quote.start, now);
        assert_eq!(quote.end, now + Duration::days(14));
        assert_eq!(quote.quantity, 2);
        assert_eq!(quote.total_amount, 60 * 2 + 50 + 15);
    }

    #[test]
    fn delivery_is_only_charged_when_available() {
        let now = Utc::now();
        let quote =
            quote_rental(&rental_price(), false, &request(RentalPeriod::Daily, None), now)
                .unwrap();
        assert_eq!(quote.quantity, 1);
        assert_eq!(quote.total_amount, 10 + 50);
        assert_eq!(quote.end - quote.start, Duration::days(1));
    }

    #[test]
    fn explicit_start_date_is_kept() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let req = RentListingRequest {
            duration: RentalPeriod::Monthly,
            quantity: Some(3),
            start_date: Some(start),
        };
        let quote = quote_rental(&rental_price(), false, &req, Utc::now()).unwrap();
        assert_eq!(quote.start, start);
        assert_eq!(quote.end, start + Duration::days(90));
        assert_eq!(quote.total_amount, 200 * 3 + 50);
    }

    #[test]
    fn quantity_outside_bounds_is_rejected() {
        let now = Utc::now();
        for quantity in [0, -1, 101] {
            let result = quote_rental(
                &rental_price(),
                false,
                &request(RentalPeriod::Daily, Some(quantity)),
                now,
            );
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn rentable_checks() {
        let seller = Uuid::new_v4();
        let renter = Uuid::new_v4();

        assert!(ensure_rentable(ListingType::Rental, ListingStatus::Available, seller, renter).is_ok());
        assert!(matches!(
            ensure_rentable(ListingType::Sale, ListingStatus::Available, seller, renter),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ensure_rentable(ListingType::Rental, ListingStatus::Available, seller, seller),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ensure_rentable(ListingType::Rental, ListingStatus::Rented, seller, renter),
            Err(AppError::BadRequest(msg)) if msg.contains("already rented")
        ));
        assert!(ensure_rentable(ListingType::Rental, ListingStatus::Inactive, seller, renter).is_err());
    }

    #[test]
    fn only_current_renter_may_return() {
        let renter = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(ensure_returnable(ListingStatus::Rented, Some(renter), renter).is_ok());
        assert!(matches!(
            ensure_returnable(ListingStatus::Rented, Some(renter), stranger),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_returnable(ListingStatus::Available, None, renter),
            Err(AppError::BadRequest(_))
        ));
    }
}
