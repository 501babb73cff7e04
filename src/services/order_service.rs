use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderEnvelope, OrderList},
    entity::{
        OrderItems, Orders,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    response::ApiResponse,
    services::stored,
    state::AppState,
};

pub const DELIVERY_DAYS: i64 = 5;

/// A checkout request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidOrder {
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub delivery_address: String,
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderEnvelope>> {
    let order = validate_order(payload)?;
    let order_date = Utc::now();

    let txn = state.orm.begin().await?;
    let model = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user.user_id)),
        total_amount: Set(order.total_amount),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        delivery_address: Set(order.delivery_address),
        order_date: Set(order_date.into()),
        estimated_delivery: Set(estimated_delivery(order_date).into()),
        updated_at: Set(order_date.into()),
    }
    .insert(&txn)
    .await?;

    let rows = order.items.iter().enumerate().map(|(position, item)| OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(model.id),
        product_id: Set(item.product_id.clone()),
        name: Set(item.name.clone()),
        price: Set(item.price),
        quantity: Set(item.quantity),
        item_type: Set(item.item_type.as_str().to_string()),
        image: Set(item.image.clone()),
        position: Set(position as i32),
    });
    OrderItems::insert_many(rows)
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(order_id = %model.id, user_id = %user.user_id, "order created");
    audit::record(
        state,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({
            "order_id": model.id,
            "total_amount": model.total_amount,
            "items": order.items.len(),
        }),
    )
    .await;

    let order = order_from_entity(model, order.items)?;
    Ok(ApiResponse::success(OrderEnvelope { order }))
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let models = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?;
    let orders = with_items(&state.orm, models).await?;
    Ok(ApiResponse::success(OrderList { orders }))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderEnvelope>> {
    let model = Orders::find()
        .filter(OrderCol::Id.eq(id))
        .filter(OrderCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let order = with_items(&state.orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order"))?;
    Ok(ApiResponse::success(OrderEnvelope { order }))
}

pub fn estimated_delivery(order_date: DateTime<Utc>) -> DateTime<Utc> {
    order_date + Duration::days(DELIVERY_DAYS)
}

pub fn validate_order(payload: CreateOrderRequest) -> AppResult<ValidOrder> {
    if payload.items.is_empty() {
        return Err(AppError::bad_request("Order must contain at least one item"));
    }
    if let Some(item) = payload
        .items
        .iter()
        .find(|item| item.quantity < 1 || item.price < 0)
    {
        return Err(AppError::bad_request(format!(
            "Invalid quantity or price for item {}",
            item.product_id
        )));
    }
    let total_amount = match payload.total_amount {
        Some(total) if total > 0 => total,
        _ => return Err(AppError::bad_request("Total amount must be positive")),
    };
    let delivery_address = payload
        .delivery_address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::bad_request("Delivery address is required"))?;

    Ok(ValidOrder {
        items: payload.items,
        total_amount,
        delivery_address,
    })
}

/// Load item snapshots for each order, keeping the order of `models`.
pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|o| o.id).collect();
    let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .order_by_asc(OrderItemCol::OrderId)
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?
    {
        let order_id = row.order_id;
        items
            .entry(order_id)
            .or_default()
            .push(item_from_entity(row)?);
    }

    models
        .into_iter()
        .map(|model| {
            let order_items = items.remove(&model.id).unwrap_or_default();
            order_from_entity(model, order_items)
        })
        .collect()
}

pub(crate) fn order_from_entity(model: OrderModel, items: Vec<OrderItem>) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        items,
        total_amount: model.total_amount,
        status: stored(&model.status)?,
        delivery_address: model.delivery_address,
        order_date: model.order_date.with_timezone(&Utc),
        estimated_delivery: model.estimated_delivery.with_timezone(&Utc),
    })
}

fn item_from_entity(model: OrderItemModel) -> AppResult<OrderItem> {
    Ok(OrderItem {
        item_type: stored(&model.item_type)?,
        product_id: model.product_id,
        name: model.name,
        price: model.price,
        quantity: model.quantity,
        image: model.image,
    })
}
