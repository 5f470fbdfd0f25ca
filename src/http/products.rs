use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{AppState, ApiResponse};
use crate::domain::Product;
use crate::services::{CreateProductInput, ListParams, ProductPage};
use crate::Result;

pub async fn list_products(State(s): State<AppState>, Query(params): Query<ListParams>) -> Result<Json<ApiResponse<ProductPage>>> {
    Ok(ApiResponse::data(s.catalog.list(params).await?))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<ApiResponse<Product>>> {
    Ok(ApiResponse::data(s.catalog.get(&id).await?))
}

pub async fn create_product(
    State(s): State<AppState>,
    body: std::result::Result<Json<CreateProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    let Json(input) = body?;
    let product = s.catalog.create(input).await?;
    Ok((StatusCode::CREATED, ApiResponse::data(product)))
}
