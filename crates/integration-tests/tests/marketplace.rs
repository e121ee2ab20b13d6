//! Vendor onboarding, catalog, cart, checkout and order lifecycle tests.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use nellore_market_integration_tests::TestApp;

/// A vendor with one product and one service, plus a customer.
struct Market {
    app: TestApp,
    vendor: String,
    customer: String,
    product_id: i64,
    service_id: i64,
}

impl Market {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let vendor = app
            .register_vendor("Ravi", "ravi@example.com", "9876543211")
            .await;
        let customer = app.register("Priya", "priya@example.com", None).await;

        let groceries = app.product_category("Groceries", "groceries").await;
        let home = app.service_category("Home Services", "home-services").await;
        let product_id = app
            .create_product(&vendor, groceries, "Coastal Spice Pack", 200, 5)
            .await;
        let service_id = app.create_service(&vendor, home, "Electrician", 199).await;

        Self {
            app,
            vendor,
            customer,
            product_id,
            service_id,
        }
    }

    async fn stock(&self) -> i64 {
        let detail = self
            .app
            .get(&format!("/api/products/{}", self.product_id), None)
            .await;
        detail.body["product"]["stock"].as_i64().unwrap()
    }

    async fn order_products(&self, quantity: i64) -> Value {
        let response = self
            .app
            .post(
                "/api/orders",
                Some(&self.customer),
                json!({
                    "order_type": "product",
                    "items": [{ "item_type": "product", "item_id": self.product_id, "quantity": quantity }],
                    "delivery_address": "4 Magunta Layout",
                    "delivery_area": "Magunta Layout",
                    "delivery_pincode": "524003",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["order"].clone()
    }

    async fn set_status(&self, token: &str, order_id: i64, status: &str) -> StatusCode {
        self.app
            .put(
                &format!("/api/orders/{order_id}/status"),
                Some(token),
                json!({ "status": status }),
            )
            .await
            .status
    }
}

#[tokio::test]
async fn test_business_registration_promotes_customer() {
    let app = TestApp::new().await;
    let token = app
        .register_vendor("Ravi", "ravi@example.com", "9876543211")
        .await;

    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.body["user"]["role"], "vendor");
    assert_eq!(me.body["business"]["business_name"], "Ravi Services");
    assert_eq!(me.body["business"]["is_verified"], false);

    let again = app
        .post(
            "/api/businesses/register",
            Some(&token),
            json!({
                "business_name": "Second",
                "business_type": "service",
                "address": "1 Road",
                "area": "Vedayapalem",
                "pincode": "524004",
                "phone": "9876543219",
            }),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let listed = app.get("/api/businesses?type=both", None).await;
    assert_eq!(listed.body["businesses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_business_registration_validates_fields() {
    let app = TestApp::new().await;
    let token = app.register("Ravi", "ravi@example.com", None).await;

    let response = app
        .post(
            "/api/businesses/register",
            Some(&token),
            json!({
                "business_name": "Ravi Services",
                "business_type": "both",
                "address": "12 Trunk Road",
                "area": "Stonehousepet",
                "pincode": "5240",
                "phone": "9876543211",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Valid pincode required");
}

#[tokio::test]
async fn test_catalog_listing_and_detail() {
    let market = Market::new().await;
    let app = &market.app;

    let services = app.get("/api/services?category=home-services", None).await;
    assert_eq!(services.status, StatusCode::OK);
    assert_eq!(services.body["total"], 1);
    assert_eq!(services.body["services"][0]["name"], "Electrician");
    assert_eq!(services.body["services"][0]["price"], "199.00");
    assert_eq!(services.body["services"][0]["business_name"], "Ravi Services");

    let none = app.get("/api/services?category=cleaning", None).await;
    assert_eq!(none.body["total"], 0);

    let products = app
        .get("/api/products?min_price=100&max_price=250", None)
        .await;
    assert_eq!(products.body["products"].as_array().unwrap().len(), 1);

    let categories = app.get("/api/products/categories", None).await;
    assert_eq!(categories.body["categories"][0]["slug"], "groceries");

    let missing = app.get("/api/services/9999", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let bad_sort = app.get("/api/services?sort=sideways", None).await;
    assert_eq!(bad_sort.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vendor_can_only_edit_own_listings() {
    let market = Market::new().await;
    let app = &market.app;
    let rival = app
        .register_vendor("Suresh", "suresh@example.com", "9876543219")
        .await;

    let own = app
        .put(
            &format!("/api/services/{}", market.service_id),
            Some(&market.vendor),
            json!({ "price": 249 }),
        )
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["service"]["price"], "249.00");

    let foreign = app
        .put(
            &format!("/api/services/{}", market.service_id),
            Some(&rival),
            json!({ "price": 99 }),
        )
        .await;
    assert!(foreign.status.is_client_error());
    assert_ne!(foreign.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cart_lifecycle() {
    let market = Market::new().await;
    let app = &market.app;
    let token = Some(market.customer.as_str());

    let added = app
        .post(
            "/api/orders/cart",
            token,
            json!({ "item_type": "product", "item_id": market.product_id, "quantity": 2 }),
        )
        .await;
    assert_eq!(added.status, StatusCode::OK);
    let line_id = added.body["cart_item_id"].as_i64().unwrap();

    // Adding again merges into the same line
    app.post(
        "/api/orders/cart",
        token,
        json!({ "item_type": "product", "item_id": market.product_id }),
    )
    .await;

    let cart = app.get("/api/orders/cart", token).await;
    assert_eq!(cart.body["count"], 1);
    assert_eq!(cart.body["items"][0]["quantity"], 3);
    assert_eq!(cart.body["total"], "600.00");

    // Stock is checked against the requested quantity, not the merged line
    let more = app
        .post(
            "/api/orders/cart",
            token,
            json!({ "item_type": "product", "item_id": market.product_id, "quantity": 3 }),
        )
        .await;
    assert_eq!(more.status, StatusCode::OK);
    let cart = app.get("/api/orders/cart", token).await;
    assert_eq!(cart.body["items"][0]["quantity"], 6);

    let too_many = app
        .post(
            "/api/orders/cart",
            token,
            json!({ "item_type": "product", "item_id": market.product_id, "quantity": 6 }),
        )
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);
    assert_eq!(too_many.body["error"], "Insufficient stock");

    let absurd = app
        .post(
            "/api/orders/cart",
            token,
            json!({ "item_type": "service", "item_id": market.service_id, "quantity": 100_000_000_000_000_i64 }),
        )
        .await;
    assert_eq!(absurd.status, StatusCode::BAD_REQUEST);
    assert_eq!(absurd.body["error"], "Quantity cannot exceed 1000");
    assert_eq!(app.get("/api/orders/cart", token).await.status, StatusCode::OK);

    let bad_type = app
        .post(
            "/api/orders/cart",
            token,
            json!({ "item_type": "gadget", "item_id": 1 }),
        )
        .await;
    assert_eq!(bad_type.body["error"], "Invalid item type");

    let zero = app
        .put(
            &format!("/api/orders/cart/{line_id}"),
            token,
            json!({ "quantity": 0 }),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let updated = app
        .put(
            &format!("/api/orders/cart/{line_id}"),
            token,
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let someone_else = app
        .send(
            Method::DELETE,
            &format!("/api/orders/cart/{line_id}"),
            Some(&market.vendor),
            None,
        )
        .await;
    assert_eq!(someone_else.status, StatusCode::NOT_FOUND);

    let removed = app
        .send(
            Method::DELETE,
            &format!("/api/orders/cart/{line_id}"),
            token,
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let cart = app.get("/api/orders/cart", token).await;
    assert_eq!(cart.body["count"], 0);
    assert_eq!(cart.body["total"], "0.00");
}

#[tokio::test]
async fn test_repeated_adds_sum_then_checkout_takes_stock() {
    let market = Market::new().await;
    let app = &market.app;
    let token = Some(market.customer.as_str());
    let dairy = app.product_category("Dairy", "dairy").await;
    let ghee = app
        .create_product(&market.vendor, dairy, "Cow Ghee 1L", 650, 10)
        .await;

    for quantity in [3, 4] {
        let added = app
            .post(
                "/api/orders/cart",
                token,
                json!({ "item_type": "product", "item_id": ghee, "quantity": quantity }),
            )
            .await;
        assert_eq!(added.status, StatusCode::OK);
    }
    let cart = app.get("/api/orders/cart", token).await;
    assert_eq!(cart.body["items"][0]["quantity"], 7);

    let placed = app
        .post(
            "/api/orders",
            token,
            json!({
                "order_type": "product",
                "items": [{ "item_type": "product", "item_id": ghee, "quantity": 7 }],
                "delivery_address": "4 Magunta Layout",
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);

    let detail = app.get(&format!("/api/products/{ghee}"), None).await;
    assert_eq!(detail.body["product"]["stock"], 3);
}

#[tokio::test]
async fn test_checkout_prices_decrements_stock_and_clears_cart() {
    let market = Market::new().await;
    let app = &market.app;

    app.post(
        "/api/orders/cart",
        Some(&market.customer),
        json!({ "item_type": "product", "item_id": market.product_id, "quantity": 2 }),
    )
    .await;

    let order = market.order_products(2).await;
    assert_eq!(order["subtotal"], "400.00");
    assert_eq!(order["delivery_fee"], "39.00");
    assert_eq!(order["total"], "439.00");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_method"], "cod");
    assert!(order["order_number"].as_str().unwrap().starts_with("NLR"));

    assert_eq!(market.stock().await, 3);

    let cart = app.get("/api/orders/cart", Some(&market.customer)).await;
    assert_eq!(cart.body["count"], 0);

    let order_id = order["id"].as_i64().unwrap();
    let detail = app
        .get(&format!("/api/orders/{order_id}"), Some(&market.customer))
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["order"]["items"][0]["item_name"], "Coastal Spice Pack");
    assert_eq!(detail.body["order"]["items"][0]["total"], "400.00");

    let mine = app.get("/api/orders", Some(&market.customer)).await;
    assert_eq!(mine.body["orders"].as_array().unwrap().len(), 1);

    let vendor_view = app.get("/api/orders/vendor/all", Some(&market.vendor)).await;
    assert_eq!(vendor_view.body["orders"].as_array().unwrap().len(), 1);

    let stranger = app.register("Anil", "anil@example.com", None).await;
    let hidden = app
        .get(&format!("/api/orders/{order_id}"), Some(&stranger))
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_large_product_orders_ship_free_and_services_never_pay_delivery() {
    let market = Market::new().await;
    let app = &market.app;

    let order = market.order_products(3).await;
    assert_eq!(order["subtotal"], "600.00");
    assert_eq!(order["delivery_fee"], "0.00");

    let booking = app
        .post(
            "/api/orders",
            Some(&market.customer),
            json!({
                "order_type": "service",
                "items": [{ "item_type": "service", "item_id": market.service_id }],
                "delivery_address": "4 Magunta Layout",
                "scheduled_date": "2026-11-02",
                "scheduled_time": "10:00",
            }),
        )
        .await;
    assert_eq!(booking.status, StatusCode::CREATED);
    assert_eq!(booking.body["order"]["delivery_fee"], "0.00");
    assert_eq!(booking.body["order"]["total"], "199.00");
}

#[tokio::test]
async fn test_checkout_rejects_bad_orders() {
    let market = Market::new().await;
    let app = &market.app;
    let token = Some(market.customer.as_str());

    let short = app
        .post(
            "/api/orders",
            token,
            json!({
                "order_type": "product",
                "items": [{ "item_type": "product", "item_id": market.product_id, "quantity": 6 }],
                "delivery_address": "4 Magunta Layout",
            }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["error"], "Insufficient stock for Coastal Spice Pack");
    assert_eq!(market.stock().await, 5);

    let no_address = app
        .post(
            "/api/orders",
            token,
            json!({
                "order_type": "product",
                "items": [{ "item_type": "product", "item_id": market.product_id }],
            }),
        )
        .await;
    assert_eq!(no_address.status, StatusCode::BAD_REQUEST);

    let empty = app
        .post(
            "/api/orders",
            token,
            json!({ "order_type": "product", "items": [], "delivery_address": "x" }),
        )
        .await;
    assert_eq!(empty.body["error"], "Order type and items are required");

    let rival = app
        .register_vendor("Suresh", "suresh@example.com", "9876543219")
        .await;
    let organic = app.product_category("Organic", "organic").await;
    let honey = app
        .create_product(&rival, organic, "Organic Honey", 449, 10)
        .await;
    let mixed = app
        .post(
            "/api/orders",
            token,
            json!({
                "order_type": "product",
                "items": [
                    { "item_type": "product", "item_id": market.product_id },
                    { "item_type": "product", "item_id": honey },
                ],
                "delivery_address": "4 Magunta Layout",
            }),
        )
        .await;
    assert_eq!(mixed.status, StatusCode::BAD_REQUEST);
    assert_eq!(market.stock().await, 5);
}

#[tokio::test]
async fn test_order_status_lifecycle_and_cancellation_restores_stock() {
    let market = Market::new().await;
    let order = market.order_products(2).await;
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(market.stock().await, 3);

    // Customers are not vendors
    assert_eq!(
        market
            .set_status(&market.customer, order_id, "confirmed")
            .await,
        StatusCode::FORBIDDEN
    );

    // Another vendor cannot touch it
    let rival = market
        .app
        .register_vendor("Suresh", "suresh@example.com", "9876543219")
        .await;
    assert_eq!(
        market.set_status(&rival, order_id, "confirmed").await,
        StatusCode::FORBIDDEN
    );

    assert_eq!(
        market.set_status(&market.vendor, order_id, "shipped").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        market
            .set_status(&market.vendor, order_id, "confirmed")
            .await,
        StatusCode::OK
    );
    assert_eq!(
        market.set_status(&market.vendor, order_id, "pending").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        market
            .set_status(&market.vendor, order_id, "cancelled")
            .await,
        StatusCode::OK
    );
    assert_eq!(market.stock().await, 5);

    // Cancelled is terminal
    assert_eq!(
        market
            .set_status(&market.vendor, order_id, "confirmed")
            .await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(market.stock().await, 5);

    let filtered = market
        .app
        .get("/api/orders?status=cancelled", Some(&market.customer))
        .await;
    assert_eq!(filtered.body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_vendor_dashboard_stats() {
    let market = Market::new().await;
    let order = market.order_products(1).await;
    let order_id = order["id"].as_i64().unwrap();
    for status in ["confirmed", "in_progress", "completed"] {
        assert_eq!(
            market.set_status(&market.vendor, order_id, status).await,
            StatusCode::OK
        );
    }
    market.order_products(1).await;

    let stats = market
        .app
        .get("/api/businesses/my/stats", Some(&market.vendor))
        .await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["business"]["business_name"], "Ravi Services");
    assert_eq!(stats.body["stats"]["total_orders"], 2);
    assert_eq!(stats.body["stats"]["pending_orders"], 1);
    assert_eq!(stats.body["stats"]["completed_orders"], 1);
    assert_eq!(stats.body["stats"]["total_revenue"], "239.00");
    assert_eq!(stats.body["stats"]["total_services"], 1);
    assert_eq!(stats.body["stats"]["total_products"], 1);
}
