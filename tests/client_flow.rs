mod common;

use marketplace_api::{
    client::{ClientError, CartItem, CartStore, MarketplaceClient, browse::{BrowseFilter, BrowseSort}},
    dto::{auth::RegisterRequest, listings::NewListing},
    models::{ListingCondition, ListingStatus, ListingType, OrderItemType, OrderStatus, Price},
    routes::{create_app, params::ListingQuery},
};
use tokio::net::TcpListener;

async fn spawn_server(state: marketplace_api::state::AppState) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(format!("http://{addr}"))
}

fn desk(title: &str) -> NewListing {
    NewListing {
        title: title.to_string(),
        description: "Standing desk, electric".into(),
        listing_type: ListingType::Sale,
        price: Price {
            amount: Some(180),
            ..Default::default()
        },
        category: "Furniture".into(),
        condition: ListingCondition::Good,
        location: "Austin".into(),
        delivery_available: false,
        contact_info: "desk@example.com".into(),
    }
}

#[tokio::test]
async fn browse_cart_and_checkout_over_http() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let base_url = spawn_server(state).await?;

    let mut seller = MarketplaceClient::new(&base_url);
    assert!(seller.health().await?);
    let seller_name = common::unique_name("seller");
    seller
        .register(&RegisterRequest {
            username: seller_name.clone(),
            email: format!("{seller_name}@example.com"),
            password: "hunter22".into(),
        })
        .await?;

    let title = common::unique_name("Standing desk ");
    let listing = seller
        .create_listing(&desk(&title), vec![common::png("desk.png")])
        .await?;
    assert_eq!(listing.status, ListingStatus::Available);
    assert_eq!(listing.images.len(), 1);

    let image = seller.image(listing.images[0].id).await?;
    assert_eq!(image, common::png("desk.png").bytes);

    let mut buyer = MarketplaceClient::new(&base_url);
    let buyer_name = common::unique_name("buyer");
    buyer
        .register(&RegisterRequest {
            username: buyer_name.clone(),
            email: format!("{buyer_name}@example.com"),
            password: "hunter22".into(),
        })
        .await?;
    buyer.logout();
    buyer
        .login(&format!("{buyer_name}@example.com"), "hunter22")
        .await?;
    assert!(buyer.token().is_some());
    let me = buyer.me().await?;
    assert_eq!(me.username, buyer_name);

    let found = buyer
        .listings(&ListingQuery {
            q: Some(title.clone()),
            listing_type: Some(ListingType::Sale),
            ..Default::default()
        })
        .await?;
    assert_eq!(found.len(), 1);
    let filter = BrowseFilter {
        max_price: Some(200),
        available_only: true,
        sort: BrowseSort::PriceLowToHigh,
        ..Default::default()
    };
    assert_eq!(filter.apply(&found).len(), 1);

    match buyer.listing(listing.id).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected a 404 for another seller's listing, got {:?}", other.map(|l| l.id)),
    }

    let mut cart = CartStore::in_memory();
    let item = CartItem::from_listing(&found[0], OrderItemType::Buy).expect("sale item");
    cart.add(item.clone())?;
    cart.add(item)?;
    assert_eq!(cart.item_count(), 2);
    assert_eq!(cart.subtotal(), 360);

    let order = buyer.checkout(&mut cart, "9 Congress Ave").await?;
    assert!(cart.is_empty());
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, 360);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);

    let history = buyer.orders().await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, order.id);

    seller.delete_listing(listing.id).await?;
    match seller.image(listing.images[0].id).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 404),
        other => panic!("image should be gone, got {:?}", other.map(|b| b.len())),
    }

    buyer.logout();
    assert!(matches!(buyer.orders().await, Err(ClientError::NotAuthenticated)));

    Ok(())
}
