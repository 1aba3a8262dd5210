use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{now_millis, NewOrder, Order, OrderId, OrderStatusType, OrderUpdate, TradeId},
    traits::OrderStoreError,
};

/// Inserts a new order with status `WaitPay`. This is not atomic with anything else you do on the connection. Embed
/// the call in a transaction and pass `&mut *tx` if you need that.
///
/// A clash on the trade id is reported as [`OrderStoreError::DuplicateTradeId`] so that the caller can pick another.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let now = now_millis();
    let trade_id = order.trade_id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                trade_id,
                order_id,
                currency,
                token,
                amount,
                actual_amount,
                status,
                start_time,
                expiration_time,
                notify_url,
                redirect_url,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(order.trade_id)
    .bind(order.order_id)
    .bind(order.currency)
    .bind(order.token)
    .bind(order.amount)
    .bind(order.actual_amount)
    .bind(OrderStatusType::WaitPay.to_string())
    .bind(order.start_time)
    .bind(order.expiration_time)
    .bind(order.notify_url)
    .bind(order.redirect_url)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(OrderStoreError::DuplicateTradeId(trade_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_trade_id(
    trade_id: &TradeId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE trade_id = $1")
        .bind(trade_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Returns the last entry in the orders table for the corresponding `order_id`
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Resulting orders are ordered by insertion, oldest first
pub async fn fetch_orders_by_status(
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status = $1 ORDER BY id ASC")
        .bind(status.to_string())
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Applies `update` in a single statement, guarded on the order's current status. Returns `None` when no row
/// matched, either because the order does not exist or because its status is no longer `expected`.
pub async fn update_order_if_status(
    trade_id: &TradeId,
    expected: OrderStatusType,
    update: OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for order {trade_id}. Update request skipped.");
        return Err(OrderStoreError::EmptyUpdate(trade_id.clone()));
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(now_millis());
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(hash) = update.block_transaction_id {
        builder.push(", block_transaction_id = ");
        builder.push_bind(hash);
    }
    if let Some(expiration_time) = update.expiration_time {
        builder.push(", expiration_time = ");
        builder.push_bind(expiration_time);
    }
    builder.push(" WHERE trade_id = ");
    builder.push_bind(trade_id.as_str());
    builder.push(" AND status = ");
    builder.push_bind(expected.to_string());
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    trace!("🗃️ Result of update_order_if_status: {order:?}");
    Ok(order)
}
