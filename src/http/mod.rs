//! HTTP surface: routing, authentication and the JSON envelope.

pub mod auth;
mod cart;
pub mod error;
mod orders;
mod payments;
mod products;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::events::EventPublisher;
use crate::services::{CartService, CatalogService, CheckoutService, OrderService};
use crate::store::Stores;
use auth::JwtVerifier;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub checkout: CheckoutService,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(stores: Stores, config: &AppConfig, events: EventPublisher) -> Self {
        let Stores { catalog, carts, orders } = stores;
        Self {
            catalog: CatalogService::new(catalog.clone(), config.payment.currency.clone(), events.clone()),
            cart: CartService::new(catalog.clone(), carts.clone(), events.clone()),
            orders: OrderService::new(catalog.clone(), carts.clone(), orders.clone(), config.payment.currency.clone(), events.clone()),
            checkout: CheckoutService::new(catalog, carts, orders, config.payment.clone(), config.stock_failure_policy, events),
            jwt: Arc::new(JwtVerifier::hs256(&config.jwt_secret)),
        }
    }
}

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self { success: true, message: None, data: Some(data) })
    }

    pub fn with_message(message: impl Into<String>, data: Option<T>) -> Json<Self> {
        Json(Self { success: true, message: Some(message.into()), data })
    }
}

pub fn build_app(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/products", post(products::create_product))
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/update", put(cart::update_cart))
        .route("/cart/clear", post(cart::clear_cart))
        .route("/cart/count", get(cart::count_cart))
        .route("/cart/:product_id/:size", delete(cart::remove_from_cart))
        .route("/orders", post(orders::place_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/payments/create_payment_url", post(payments::create_payment_url))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_user));

    // Public: catalog browsing, and the gateway callback, which its signature authenticates.
    let api = user_routes
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/payments/vnpay_return", get(payments::vnpay_return));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({ "status": "healthy" })) }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
