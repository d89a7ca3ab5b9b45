//! Item endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ItemId;
use domain::Item;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub title: String,
    pub price: i64,
}

impl ItemRequest {
    fn validate(self) -> Result<(String, i64), ApiError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ApiError::BadRequest("title must not be empty".to_string()));
        }
        if self.price < 0 {
            return Err(ApiError::BadRequest("price must not be negative".to_string()));
        }
        Ok((title.to_string(), self.price))
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub user_id: String,
    pub version: i64,
    pub reserved_by: Option<String>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title,
            price: item.price,
            user_id: item.user_id.to_string(),
            version: item.version.as_i64(),
            reserved_by: item.reserved_by.map(|o| o.to_string()),
        }
    }
}

/// POST /items
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    body: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let Json(req) = body?;
    let (title, price) = req.validate()?;
    let item = state.items.create(user_id, title, price).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PUT /items/{id}
#[tracing::instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    let Json(req) = body?;
    let (title, price) = req.validate()?;
    let item = state.items.update(item_id, &user_id, title, price).await?;
    Ok(Json(item.into()))
}

/// GET /items/{id}
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = state.items.show(parse_id(&id, "item")?).await?;
    Ok(Json(item.into()))
}

/// GET /items, unreserved items only.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state.items.available().await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}
