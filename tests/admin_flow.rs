mod common;

use marketplace_api::{
    dto::{
        admin::{
            AdminUserUpdate, CreateContentRequest, UpdateContentRequest,
            UpdateListingStatusRequest, UpdateOrderStatusRequest, UpdateSettingsRequest,
        },
        auth::{LoginRequest, RegisterRequest},
        orders::CreateOrderRequest,
    },
    entity::{Images, Listings, Orders},
    error::AppError,
    models::{ContentStatus, ContentType, ListingStatus, OrderItem, OrderItemType, OrderStatus, RentalPeriod, Role},
    routes::params::AdminOrderQuery,
    services::{admin_service, auth_service, listing_service, order_service, rental_service},
};
use sea_orm::EntityTrait;

fn login(email: String) -> LoginRequest {
    LoginRequest {
        email,
        password: common::PASSWORD.into(),
    }
}

#[tokio::test]
async fn admin_login_requires_admin_role() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, Role::Admin).await?;
    let user = common::create_user(&state, Role::User).await?;

    let err = admin_service::admin_login(&state, login(format!("{}@example.com", user.username)))
        .await
        .err()
        .expect("non-admin login");
    assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));

    let resp =
        admin_service::admin_login(&state, login(format!("{}@example.com", admin.username))).await?;
    assert_eq!(resp.admin.role, Role::Admin);
    assert!(!resp.token.is_empty());

    let out = admin_service::admin_logout(&state, &admin).await?;
    assert_eq!(out.message, "Logged out successfully");

    Ok(())
}

#[tokio::test]
async fn admin_manages_users_orders_and_listings() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, Role::Admin).await?;
    let seller = common::create_user(&state, Role::User).await?;
    let renter = common::create_user(&state, Role::User).await?;

    let order = order_service::create_order(
        &state,
        &renter,
        CreateOrderRequest {
            items: vec![OrderItem {
                product_id: "p-1".into(),
                name: "Desk".into(),
                price: 90,
                quantity: 1,
                item_type: OrderItemType::Buy,
                image: String::new(),
            }],
            total_amount: Some(90),
            delivery_address: Some("5 Elm St".into()),
        },
    )
    .await?
    .data
    .expect("order")
    .order;

    let dashboard = admin_service::dashboard(&state).await?;
    assert!(dashboard.stats.total_users >= 3);
    assert!(dashboard.stats.total_orders >= 1);
    assert!(dashboard.stats.revenue >= 90);
    assert!(dashboard.recent_users.len() <= 5);
    assert!(dashboard.recent_orders.len() <= 5);

    let page = admin_service::list_orders(
        &state,
        AdminOrderQuery {
            page: Some(1),
            per_page: Some(500),
            status: Some(OrderStatus::Pending),
        },
    )
    .await?;
    assert_eq!(page.per_page, 100);
    assert!(page.orders.iter().all(|o| o.status == OrderStatus::Pending));

    let shipped = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?;
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let renamed = common::unique_name("renamed");
    let updated = admin_service::update_user(
        &state,
        &admin,
        seller.user_id,
        AdminUserUpdate {
            username: Some(renamed.clone()),
            name: Some("Shop Owner".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(updated.username, renamed);
    assert_eq!(updated.profile.name, "Shop Owner");

    let err = admin_service::update_user(
        &state,
        &admin,
        seller.user_id,
        AdminUserUpdate {
            username: Some(renter.username.clone()),
            ..Default::default()
        },
    )
    .await
    .err()
    .expect("username clash");
    assert!(matches!(err, AppError::BadRequest(_)));

    let rental = listing_service::create_listing(
        &state,
        &seller,
        common::rental_form("Ladder", false, vec![common::png("ladder.png")]),
    )
    .await?
    .data
    .expect("listing")
    .listing;
    rental_service::rent_listing(
        &state,
        &renter,
        rental.id,
        marketplace_api::dto::listings::RentListingRequest {
            duration: RentalPeriod::Daily,
            quantity: None,
            start_date: None,
        },
    )
    .await?;

    let err = admin_service::update_listing_status(
        &state,
        &admin,
        rental.id,
        UpdateListingStatusRequest {
            status: ListingStatus::Rented,
        },
    )
    .await
    .err()
    .expect("manual rented status");
    assert!(matches!(err, AppError::BadRequest(_)));

    let inactive = admin_service::update_listing_status(
        &state,
        &admin,
        rental.id,
        UpdateListingStatusRequest {
            status: ListingStatus::Inactive,
        },
    )
    .await?;
    assert_eq!(inactive.status, ListingStatus::Inactive);
    assert_eq!(inactive.renter_id, None);
    assert_eq!(inactive.rental_start_date, None);

    let err = admin_service::delete_user(&state, &admin, admin.user_id)
        .await
        .err()
        .expect("self delete");
    assert!(matches!(err, AppError::BadRequest(_)));

    let image_id = rental.images[0].id;
    admin_service::delete_user(&state, &admin, seller.user_id).await?;
    assert!(Listings::find_by_id(rental.id).one(&state.orm).await?.is_none());
    assert!(Images::find_by_id(image_id).one(&state.orm).await?.is_none());
    let err = admin_service::get_user(&state, seller.user_id)
        .await
        .err()
        .expect("deleted user");
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn admin_content_and_settings() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, Role::Admin).await?;
    let suffix = common::unique_name("");

    let created = admin_service::create_content(
        &state,
        &admin,
        CreateContentRequest {
            title: format!("Spring Sale {suffix}"),
            slug: None,
            content: "Everything must go".into(),
            content_type: None,
            status: None,
            featured_image: None,
            tags: vec!["sale".into()],
        },
    )
    .await?;
    assert_eq!(created.slug, format!("spring-sale-{suffix}"));
    assert_eq!(created.content_type, ContentType::Post);
    assert_eq!(created.status, ContentStatus::Draft);
    assert_eq!(created.tags, ["sale"]);
    assert_eq!(created.author_id, admin.user_id);

    let err = admin_service::create_content(
        &state,
        &admin,
        CreateContentRequest {
            title: "Another".into(),
            slug: Some(created.slug.clone()),
            content: "Body".into(),
            content_type: Some(ContentType::Page),
            status: None,
            featured_image: None,
            tags: vec![],
        },
    )
    .await
    .err()
    .expect("slug clash");
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Slug is already in use"));

    let published = admin_service::update_content(
        &state,
        &admin,
        created.id,
        UpdateContentRequest {
            status: Some(ContentStatus::Published),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(published.status, ContentStatus::Published);
    assert_eq!(published.slug, created.slug);

    admin_service::delete_content(&state, &admin, created.id).await?;
    let err = admin_service::delete_content(&state, &admin, created.id)
        .await
        .err()
        .expect("already deleted");
    assert!(matches!(err, AppError::NotFound(_)));

    let err = admin_service::update_settings(
        &state,
        &admin,
        UpdateSettingsRequest {
            site_name: Some("  ".into()),
            ..Default::default()
        },
    )
    .await
    .err()
    .expect("blank site name");
    assert!(matches!(err, AppError::BadRequest(_)));

    let closed = admin_service::update_settings(
        &state,
        &admin,
        UpdateSettingsRequest {
            allow_registration: Some(false),
            ..Default::default()
        },
    )
    .await?;
    assert!(!closed.allow_registration);

    let username = common::unique_name("closed");
    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            email: format!("{username}@example.com"),
            username,
            password: "hunter22".into(),
        },
    )
    .await
    .err()
    .expect("registration closed");
    assert!(matches!(err, AppError::Forbidden(_)));

    let reopened = admin_service::update_settings(
        &state,
        &admin,
        UpdateSettingsRequest {
            allow_registration: Some(true),
            ..Default::default()
        },
    )
    .await?;
    assert!(reopened.allow_registration);
    assert_eq!(admin_service::get_settings(&state).await?.site_name, reopened.site_name);

    Ok(())
}

#[tokio::test]
async fn deleting_a_buyer_keeps_orders_and_releases_rentals() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, Role::Admin).await?;
    let seller = common::create_user(&state, Role::User).await?;
    let renter = common::create_user(&state, Role::User).await?;

    let order = order_service::create_order(
        &state,
        &renter,
        CreateOrderRequest {
            items: vec![OrderItem {
                product_id: "p-2".into(),
                name: "Chair".into(),
                price: 45,
                quantity: 2,
                item_type: OrderItemType::Buy,
                image: String::new(),
            }],
            total_amount: Some(90),
            delivery_address: Some("7 Pine St".into()),
        },
    )
    .await?
    .data
    .expect("order")
    .order;

    let rental = listing_service::create_listing(
        &state,
        &seller,
        common::rental_form("Trailer", false, vec![common::png("trailer.png")]),
    )
    .await?
    .data
    .expect("listing")
    .listing;
    rental_service::rent_listing(
        &state,
        &renter,
        rental.id,
        marketplace_api::dto::listings::RentListingRequest {
            duration: RentalPeriod::Weekly,
            quantity: Some(1),
            start_date: None,
        },
    )
    .await?;

    admin_service::delete_user(&state, &admin, renter.user_id).await?;

    let kept = Orders::find_by_id(order.id)
        .one(&state.orm)
        .await?
        .expect("order survives the buyer");
    assert_eq!(kept.user_id, None);
    assert_eq!(kept.total_amount, 90);

    let released = listing_service::get_listing(&state, &seller, rental.id)
        .await?
        .data
        .expect("listing")
        .listing;
    assert_eq!(released.status, ListingStatus::Available);
    assert_eq!(released.renter_id, None);
    assert_eq!(released.rental_start_date, None);
    assert_eq!(released.rental_total_amount, None);

    let next = common::create_user(&state, Role::User).await?;
    let rented = rental_service::rent_listing(
        &state,
        &next,
        rental.id,
        marketplace_api::dto::listings::RentListingRequest {
            duration: RentalPeriod::Daily,
            quantity: None,
            start_date: None,
        },
    )
    .await?
    .data
    .expect("listing")
    .listing;
    assert_eq!(rented.renter_id, Some(next.user_id));

    Ok(())
}
