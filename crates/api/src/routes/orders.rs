//! Order endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::Order;
use serde::Serialize;

use super::parse_id;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub status: String,
    pub version: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            item_id: order.item_id.to_string(),
            status: order.status.to_string(),
            version: order.version.as_i64(),
        }
    }
}

/// POST /orders/{item_id}: reserves the item for the caller.
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .orders
        .reserve(parse_id(&item_id, "item")?, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.show(parse_id(&id, "order")?, &user_id).await?;
    Ok(Json(order.into()))
}

/// GET /orders: the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list(&user_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orders.cancel(parse_id(&id, "order")?, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
