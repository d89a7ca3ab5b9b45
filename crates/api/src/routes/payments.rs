//! Payment endpoint.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::Payment;
use serde::Serialize;

use super::parse_id;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub charge_id: String,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            order_id: payment.order_id.to_string(),
            charge_id: payment.charge_id.to_string(),
        }
    }
}

/// POST /payments/{order_id}: charges the order's amount.
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = state
        .payments
        .pay(parse_id(&order_id, "order")?, &user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}
