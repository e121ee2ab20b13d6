//! Reviews, search scoring, comparisons, recommendations and analytics.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use nellore_market_integration_tests::TestApp;

struct Catalog {
    app: TestApp,
    customer: String,
    electrician: i64,
    plumber: i64,
    honey: i64,
}

async fn catalog() -> Catalog {
    let app = TestApp::new().await;
    let vendor = app
        .register_vendor("Ravi", "ravi@example.com", "9876543211")
        .await;
    let customer = app.register("Priya", "priya@example.com", None).await;

    let home = app.service_category("Home Services", "home-services").await;
    let organic = app.product_category("Organic", "organic").await;
    let electrician = app.create_service(&vendor, home, "Electrician", 199).await;
    let plumber = app.create_service(&vendor, home, "Plumber", 149).await;
    let honey = app
        .create_product(&vendor, organic, "Organic Honey", 449, 45)
        .await;

    Catalog {
        app,
        customer,
        electrician,
        plumber,
        honey,
    }
}

#[tokio::test]
async fn test_reviews_update_aggregate_rating() {
    let c = catalog().await;
    let second = c.app.register("Anil", "anil@example.com", None).await;
    let uri = format!("/api/services/{}/review", c.electrician);

    let first = c
        .app
        .post(&uri, Some(&c.customer), json!({ "rating": 4, "comment": "Quick fix" }))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["review"]["rating"], 4);

    c.app
        .post(&uri, Some(&second), json!({ "rating": 2 }))
        .await;

    let detail = c
        .app
        .get(&format!("/api/services/{}", c.electrician), None)
        .await;
    assert_eq!(detail.body["service"]["rating"], 3.0);
    assert_eq!(detail.body["service"]["review_count"], 2);
    assert_eq!(detail.body["reviews"].as_array().unwrap().len(), 2);

    // Reviewing again replaces the earlier rating
    c.app
        .post(&uri, Some(&c.customer), json!({ "rating": 5 }))
        .await;
    let detail = c
        .app
        .get(&format!("/api/services/{}", c.electrician), None)
        .await;
    assert_eq!(detail.body["service"]["rating"], 3.5);
    assert_eq!(detail.body["service"]["review_count"], 2);
}

#[tokio::test]
async fn test_review_validation() {
    let c = catalog().await;

    let out_of_range = c
        .app
        .post(
            &format!("/api/products/{}/review", c.honey),
            Some(&c.customer),
            json!({ "rating": 6 }),
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);
    assert_eq!(out_of_range.body["error"], "Rating must be 1-5");

    let missing = c
        .app
        .post(
            "/api/products/9999/review",
            Some(&c.customer),
            json!({ "rating": 4 }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let anonymous = c
        .app
        .post(
            &format!("/api/products/{}/review", c.honey),
            None,
            json!({ "rating": 4 }),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_business_review_and_detail() {
    let c = catalog().await;
    let listed = c.app.get("/api/businesses", None).await;
    let business_id = listed.body["businesses"][0]["id"].as_i64().unwrap();

    let review = c
        .app
        .post(
            &format!("/api/businesses/{business_id}/review"),
            Some(&c.customer),
            json!({ "rating": 5 }),
        )
        .await;
    assert_eq!(review.status, StatusCode::OK);

    let detail = c
        .app
        .get(&format!("/api/businesses/{business_id}"), None)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["business"]["rating"], 5.0);
    assert_eq!(detail.body["business"]["review_count"], 1);
}

#[tokio::test]
async fn test_service_research_scores_matches() {
    let c = catalog().await;

    let research = c
        .app
        .post("/api/research/services", None, json!({ "query": "electric" }))
        .await;
    assert_eq!(research.status, StatusCode::OK);
    assert_eq!(research.body["query"], "electric");
    assert_eq!(research.body["services"].as_array().unwrap().len(), 1);
    assert_eq!(research.body["services"][0]["name"], "Electrician");
    assert!(research.body["services"][0]["relevance_score"].is_number());
    assert_eq!(research.body["insights"]["total_found"], 1);
    assert!(research.body["search_metadata"]["filters_applied"]["budget"].is_null());

    let within_budget = c
        .app
        .post(
            "/api/research/services",
            None,
            json!({ "query": "home", "budget": 150 }),
        )
        .await;
    assert_eq!(within_budget.body["services"].as_array().unwrap().len(), 1);
    assert_eq!(within_budget.body["services"][0]["name"], "Plumber");

    let blank = c
        .app
        .post("/api/research/services", None, json!({ "query": "  " }))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body["error"], "Search query is required");
}

#[tokio::test]
async fn test_product_research_applies_bounds() {
    let c = catalog().await;

    let found = c
        .app
        .post(
            "/api/research/products",
            None,
            json!({ "query": "honey", "max_price": 500 }),
        )
        .await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["products"].as_array().unwrap().len(), 1);

    let too_cheap = c
        .app
        .post(
            "/api/research/products",
            None,
            json!({ "query": "honey", "max_price": 400 }),
        )
        .await;
    assert_eq!(too_cheap.body["products"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_compare_services() {
    let c = catalog().await;

    let compared = c
        .app
        .post(
            "/api/research/compare/services",
            None,
            json!({ "service_ids": [c.electrician, c.plumber.to_string()] }),
        )
        .await;
    assert_eq!(compared.status, StatusCode::OK);
    assert_eq!(compared.body["services"].as_array().unwrap().len(), 2);
    assert!(compared.body["recommendation"]["service_id"].is_number());

    let one = c
        .app
        .post(
            "/api/research/compare/services",
            None,
            json!({ "service_ids": [c.electrician] }),
        )
        .await;
    assert_eq!(one.status, StatusCode::BAD_REQUEST);

    let too_many = c
        .app
        .post(
            "/api/research/compare/services",
            None,
            json!({ "service_ids": [1, 2, 3, 4, 5, 6] }),
        )
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let unknown = c
        .app
        .post(
            "/api/research/compare/services",
            None,
            json!({ "service_ids": [c.electrician, 9999] }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_compare_prefers_cheaper_service_when_unverified() {
    let c = catalog().await;
    for (id, rating) in [(c.electrician, 4.8), (c.plumber, 4.2)] {
        sqlx::query("UPDATE services SET rating = ?, review_count = 0 WHERE id = ?")
            .bind(rating)
            .bind(id)
            .execute(&c.app.pool)
            .await
            .unwrap();
    }
    sqlx::query("UPDATE services SET price = 9900 WHERE id = ?")
        .bind(c.plumber)
        .execute(&c.app.pool)
        .await
        .unwrap();

    // 0.4 * 4.8 + 100 / 199 = 2.42 against 0.4 * 4.2 + 100 / 99 = 2.69
    let compared = c
        .app
        .post(
            "/api/research/compare/services",
            None,
            json!({ "service_ids": [c.electrician, c.plumber] }),
        )
        .await;
    assert_eq!(compared.status, StatusCode::OK);
    assert_eq!(compared.body["recommendation"]["service_id"], c.plumber);
    assert_eq!(compared.body["insights"]["verified_vendors"], 0);
}

#[tokio::test]
async fn test_analytics() {
    let c = catalog().await;
    c.app
        .post(
            &format!("/api/services/{}/review", c.electrician),
            Some(&c.customer),
            json!({ "rating": 4 }),
        )
        .await;

    let analytics = c
        .app
        .get(
            &format!("/api/research/analytics/service/{}", c.electrician),
            None,
        )
        .await;
    assert_eq!(analytics.status, StatusCode::OK);
    assert_eq!(analytics.body["performance"]["total_reviews"], 1);
    assert_eq!(analytics.body["performance"]["rating_distribution"]["4"], 1);
    assert_eq!(
        analytics.body["competitive_analysis"]["related_items"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let bad_kind = c
        .app
        .get("/api/research/analytics/widget/1", None)
        .await;
    assert_eq!(bad_kind.status, StatusCode::BAD_REQUEST);

    let missing = c
        .app
        .get("/api/research/analytics/product/9999", None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_require_login_and_valid_scope() {
    let c = catalog().await;

    let anonymous = c.app.get("/api/research/recommendations", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let all = c
        .app
        .get("/api/research/recommendations", Some(&c.customer))
        .await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["user_insights"]["purchased_items"], 0);
    assert!(all.body["trending"].is_array());

    let bad_scope = c
        .app
        .get("/api/research/recommendations?type=gadgets", Some(&c.customer))
        .await;
    assert_eq!(bad_scope.status, StatusCode::BAD_REQUEST);
}
