use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Deserialize;

use super::{auth::CurrentUser, error::json_error, AppState, ApiResponse};
use crate::services::CheckoutOutcome;
use crate::{CommerceError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: String,
    pub language: Option<String>,
    pub bank_code: Option<String>,
}

pub async fn create_payment_url(
    State(s): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    body: std::result::Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Redirect> {
    let Json(req) = body?;
    let url = s
        .checkout
        .payment_url(&user.id, &req.order_id, &client_ip(&headers), req.language, req.bank_code)
        .await?;
    Ok(Redirect::to(&url))
}

pub async fn vnpay_return(State(s): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    match s.checkout.reconcile(&params).await {
        Ok(CheckoutOutcome::Completed { order, .. }) => {
            ApiResponse::with_message("Payment successful, order updated and cart cleared", order).into_response()
        }
        Ok(CheckoutOutcome::AlreadySettled { order }) => {
            ApiResponse::with_message("Payment already processed", Some(order)).into_response()
        }
        Ok(CheckoutOutcome::Failed { .. }) => json_error(StatusCode::BAD_REQUEST, "Payment failed, order canceled"),
        Err(e @ CommerceError::SignatureMismatch) => json_error(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => e.into_response(),
    }
}

/// First hop of `X-Forwarded-For`, falling back to loopback.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("127.0.0.1")
        .to_string()
}
