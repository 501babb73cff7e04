mod common;

use chrono::Duration;
use marketplace_api::{
    dto::orders::CreateOrderRequest,
    error::AppError,
    models::{OrderItem, OrderItemType, OrderStatus, Role},
    services::order_service,
};

fn item(name: &str, price: i64, quantity: i32) -> OrderItem {
    OrderItem {
        product_id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        price,
        quantity,
        item_type: OrderItemType::Buy,
        image: String::new(),
    }
}

#[tokio::test]
async fn orders_create_list_and_scope() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let buyer = common::create_user(&state, Role::User).await?;
    let other = common::create_user(&state, Role::User).await?;

    let err = order_service::create_order(
        &state,
        &buyer,
        CreateOrderRequest {
            items: vec![],
            total_amount: Some(10),
            delivery_address: Some("1 Main St".into()),
        },
    )
    .await
    .err()
    .expect("empty order");
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::create_order(
        &state,
        &buyer,
        CreateOrderRequest {
            items: vec![item("Lamp", 40, 1)],
            total_amount: Some(40),
            delivery_address: Some("   ".into()),
        },
    )
    .await
    .err()
    .expect("blank address");
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = order_service::create_order(
        &state,
        &buyer,
        CreateOrderRequest {
            items: vec![item("Lamp", 40, 1), item("Rug", 120, 2)],
            total_amount: Some(280),
            delivery_address: Some(" 1 Main St ".into()),
        },
    )
    .await?
    .data
    .expect("order")
    .order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.user_id, Some(buyer.user_id));
    assert_eq!(order.delivery_address, "1 Main St");
    assert_eq!(order.estimated_delivery - order.order_date, Duration::days(5));
    let names: Vec<_> = order.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["Lamp", "Rug"]);

    let history = order_service::list_orders(&state, &buyer)
        .await?
        .data
        .expect("orders")
        .orders;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].items.len(), 2);

    let fetched = order_service::get_order(&state, &buyer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(fetched.total_amount, 280);

    let err = order_service::get_order(&state, &other, order.id)
        .await
        .err()
        .expect("foreign order");
    assert!(matches!(err, AppError::NotFound(_)));

    let empty = order_service::list_orders(&state, &other)
        .await?
        .data
        .expect("orders")
        .orders;
    assert!(empty.is_empty());

    Ok(())
}
