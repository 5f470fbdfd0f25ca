use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::{auth::CurrentUser, AppState, ApiResponse};
use crate::domain::Order;
use crate::services::PlaceOrderInput;
use crate::Result;

pub async fn place_order(
    State(s): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: std::result::Result<Json<PlaceOrderInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    let Json(input) = body?;
    let order = s.orders.place(&user.id, input).await?;
    Ok((StatusCode::CREATED, ApiResponse::data(order)))
}

pub async fn get_order(
    State(s): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>> {
    Ok(ApiResponse::data(s.orders.get(&user.id, &id).await?))
}
