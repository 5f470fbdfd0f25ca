mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{mint_jwt, signed_return, TestApp};
use fashion_commerce::domain::Size;
use fashion_commerce::http::build_app;

fn router(app: &TestApp) -> Router {
    build_app(app.state.clone())
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", mint_jwt(user)));
    }
    match body {
        Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = send(&router(&app), request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn cart_routes_require_a_valid_token() {
    let app = TestApp::new();
    let router = router(&app);

    let (status, body) = send(&router, request(Method::GET, "/api/cart/count", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let forged = Request::builder()
        .uri("/api/cart/count")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_round_trip_over_http() {
    let app = TestApp::new();
    let p = app.seed_product("Cardigan", 350_000, &[(Size::M, 4)]).await;
    let router = router(&app);

    let (status, body) = send(&router, request(Method::GET, "/api/cart", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let add = json!({ "productId": p.id(), "quantity": 2, "size": "M" });
    let (status, body) = send(&router, request(Method::POST, "/api/cart/add", Some("u1"), Some(add))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["products"][0]["quantity"], 2);

    let (_, body) = send(&router, request(Method::GET, "/api/cart/count", Some("u1"), None)).await;
    assert_eq!(body["data"]["count"], 1);

    let update = json!({ "productId": p.id(), "quantity": 4, "size": "M" });
    let (status, body) = send(&router, request(Method::PUT, "/api/cart/update", Some("u1"), Some(update))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"][0]["quantity"], 4);

    let (status, body) = send(&router, request(Method::GET, "/api/cart", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"][0]["product"]["name"], "Cardigan");

    let uri = format!("/api/cart/{}/M", p.id());
    let (status, body) = send(&router, request(Method::DELETE, &uri, Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"].as_array().map(Vec::len), Some(0));

    let (status, _) = send(&router, request(Method::POST, "/api/cart/clear", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);

    // Carts are per user.
    let (_, body) = send(&router, request(Method::GET, "/api/cart/count", Some("u2"), None)).await;
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn cart_errors_map_to_status_codes() {
    let app = TestApp::new();
    let p = app.seed_product("Vest", 100_000, &[(Size::S, 1)]).await;
    let router = router(&app);

    let missing_size = json!({ "productId": p.id(), "quantity": 1 });
    let (status, body) = send(&router, request(Method::POST, "/api/cart/add", Some("u1"), Some(missing_size))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Product ID, quantity, and size are required");

    let too_many = json!({ "productId": p.id(), "quantity": 2, "size": "S" });
    let (status, _) = send(&router, request(Method::POST, "/api/cart/add", Some("u1"), Some(too_many))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = json!({ "productId": "nope", "quantity": 1, "size": "S" });
    let (status, _) = send(&router, request(Method::POST, "/api/cart/add", Some("u1"), Some(unknown))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/cart/add")
        .header(header::AUTHORIZATION, format!("Bearer {}", mint_jwt("u1")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(&router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let uri = format!("/api/cart/{}/XXL", p.id());
    let (status, _) = send(&router, request(Method::DELETE, &uri, Some("u1"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_over_http() {
    let app = TestApp::new();
    let p = app.seed_product("Trench coat", 150_000, &[(Size::M, 10)]).await;
    let router = router(&app);

    let add = json!({ "productId": p.id(), "quantity": 2, "size": "M" });
    send(&router, request(Method::POST, "/api/cart/add", Some("u1"), Some(add))).await;

    let order = json!({ "address": "1 Trang Tien, Ha Noi", "paymentMethod": "Online" });
    let (status, body) = send(&router, request(Method::POST, "/api/orders", Some("u1"), Some(order))).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["paymentStatus"], "Pending");

    let (status, _) = send(&router, request(Method::GET, &format!("/api/orders/{order_id}"), Some("u2"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let pay = json!({ "orderId": order_id, "bankCode": "NCB" });
    let response = router
        .clone()
        .oneshot(request(Method::POST, "/api/payments/create_payment_url", Some("u1"), Some(pay)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.contains("vnp_BankCode=NCB"));
    assert!(location.contains("vnp_SecureHash="));

    let query = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(signed_return(&order_id, "00")).finish();
    let (status, body) = send(&router, request(Method::GET, &format!("/api/payments/vnpay_return?{query}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["paymentStatus"], "Completed");

    assert_eq!(app.product(p.id()).await.stock_of(Size::M).unwrap(), 8);
    let (_, body) = send(&router, request(Method::GET, "/api/cart/count", Some("u1"), None)).await;
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn gateway_callback_rejections() {
    let app = TestApp::new();
    let router = router(&app);

    let mut tampered = signed_return("order-1", "00");
    tampered.insert("vnp_Amount".into(), "1".into());
    let query = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(tampered).finish();
    let (status, body) = send(&router, request(Method::GET, &format!("/api/payments/vnpay_return?{query}"), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid payment signature");

    let query = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(signed_return("order-1", "24")).finish();
    let (status, body) = send(&router, request(Method::GET, &format!("/api/payments/vnpay_return?{query}"), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn catalog_browsing_is_public_and_creation_is_not() {
    let app = TestApp::new();
    let router = router(&app);

    let new_product = json!({
        "name": "Ao dai",
        "description": "Silk, hand finished",
        "price": 1200000,
        "variants": [{ "size": "S", "stock": 2 }, { "size": "M", "stock": 5 }],
        "discount": { "id": "tet", "discountPercent": 10 },
        "origin": "Hue"
    });
    let (status, _) = send(&router, request(Method::POST, "/api/products", None, Some(new_product.clone()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&router, request(Method::POST, "/api/products", Some("u1"), Some(new_product))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["variants"][1]["stock"], 5);

    let (status, _) = send(&router, request(Method::POST, "/api/products", Some("u1"), Some(json!({ "name": "", "price": 1, "variants": [] })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.seed_product("Non la", 90_000, &[(Size::M, 1)]).await;
    let (status, body) = send(&router, request(Method::GET, "/api/products?page=1&limit=1", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["products"][0]["name"], "Non la");
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["currentPage"], 1);

    let (status, body) = send(&router, request(Method::GET, &format!("/api/products/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ao dai");
    assert_eq!(body["data"]["origin"], "Hue");

    let (status, body) = send(&router, request(Method::GET, "/api/products/missing", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn repeated_gateway_callback_is_acknowledged_once() {
    let app = TestApp::new();
    let p = app.seed_product("Kimono", 150_000, &[(Size::L, 5)]).await;
    let router = router(&app);

    let add = json!({ "productId": p.id(), "quantity": 2, "size": "L" });
    send(&router, request(Method::POST, "/api/cart/add", Some("u1"), Some(add))).await;
    let order = json!({ "address": "5 Le Loi, Hue" });
    let (_, body) = send(&router, request(Method::POST, "/api/orders", Some("u1"), Some(order))).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let query = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(signed_return(&order_id, "00")).finish();
    let uri = format!("/api/payments/vnpay_return?{query}");
    let (status, _) = send(&router, request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment already processed");
    assert_eq!(app.product(p.id()).await.stock_of(Size::L).unwrap(), 3);
}
