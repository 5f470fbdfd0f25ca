use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use super::{auth::CurrentUser, AppState, ApiResponse};
use crate::domain::{Cart, Size};
use crate::services::{CartItemInput, CartView};
use crate::{CommerceError, Result};

pub async fn get_cart(State(s): State<AppState>, Extension(user): Extension<CurrentUser>) -> Result<Json<ApiResponse<CartView>>> {
    Ok(ApiResponse::data(s.cart.get(&user.id).await?))
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: std::result::Result<Json<CartItemInput>, JsonRejection>,
) -> Result<Json<ApiResponse<Cart>>> {
    let Json(input) = body?;
    let cart = s.cart.add(&user.id, input).await?;
    Ok(ApiResponse::with_message("Product added to cart", Some(cart)))
}

pub async fn update_cart(
    State(s): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: std::result::Result<Json<CartItemInput>, JsonRejection>,
) -> Result<Json<ApiResponse<Cart>>> {
    let Json(input) = body?;
    Ok(ApiResponse::data(s.cart.update(&user.id, input).await?))
}

pub async fn remove_from_cart(
    State(s): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((product_id, size)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Cart>>> {
    let size = size.parse::<Size>().map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
    Ok(ApiResponse::data(s.cart.remove(&user.id, &product_id, size).await?))
}

pub async fn clear_cart(State(s): State<AppState>, Extension(user): Extension<CurrentUser>) -> Result<Json<ApiResponse<Cart>>> {
    let cart = s.cart.clear(&user.id).await?;
    Ok(ApiResponse::with_message("Cart cleared", Some(cart)))
}

pub async fn count_cart(State(s): State<AppState>, Extension(user): Extension<CurrentUser>) -> Result<Json<ApiResponse<Value>>> {
    let count = s.cart.count(&user.id).await?;
    Ok(ApiResponse::data(json!({ "count": count })))
}
