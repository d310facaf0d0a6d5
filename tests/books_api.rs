use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bookstore_api::modules;
use bookstore_kernel::{settings::Settings, ModuleRegistry};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let settings = Settings::default();
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings);
    bookstore_http::build_router(&registry, &settings)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn book(title: &str, isbn: &str, genre: &str, price: f64, stock: u32) -> Value {
    json!({
        "title": title,
        "author": "Integration Author",
        "isbn": isbn,
        "published_year": 2001,
        "genre": genre,
        "price": price,
        "stock": stock,
    })
}

async fn seed(app: &Router) -> Vec<String> {
    let fixtures = [
        book("Alpha", "9780000000001", "Fiction", 10.0, 5),
        book("Beta", "9780000000002", "Fiction", 20.0, 0),
        book("Gamma", "9780000000003", "Poetry", 30.0, 7),
        book("Delta", "9780000000004", "History", 45.0, 0),
    ];
    let mut ids = Vec::new();
    for fixture in fixtures {
        let (status, body) = call(app, "POST", "/api/v1/books/", Some(fixture)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }
    ids
}

#[tokio::test]
async fn crud_lifecycle_under_api_prefix() {
    let app = app();
    let ids = seed(&app).await;

    let (status, body) = call(&app, "GET", &format!("/api/v1/books/{}/", ids[0]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Alpha");

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/v1/books/{}/", ids[0]),
        Some(json!({"price": "11.50"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], "11.50");

    let (status, _) = call(&app, "DELETE", &format!("/api/v1/books/{}/", ids[0]), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, "GET", &format!("/api/v1/books/{}/", ids[0]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn duplicate_isbn_is_a_conflict() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/books/",
        Some(book("Copy", "9780000000001", "Fiction", 5.0, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "A book with this ISBN already exists");

    let (_, body) = call(&app, "GET", "/api/v1/books/", None).await;
    assert_eq!(body["count"], 4);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let app = app();
    let mut payload = book("  ", "9780000000009", "Fiction", 5.0, 1);
    payload["author"] = json!("");

    let (status, body) = call(&app, "POST", "/api/v1/books/", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["author"].is_array());
}

#[tokio::test]
async fn put_replaces_a_book() {
    let app = app();
    let ids = seed(&app).await;
    let uri = format!("/api/v1/books/{}/", ids[2]);

    let mut payload = book("Gamma Revised", "9780000000003", "Poetry", 31.25, 0);
    payload.as_object_mut().unwrap().remove("stock");
    let (status, body) = call(&app, "PUT", &uri, Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Gamma Revised");
    assert_eq!(body["data"]["price"], "31.25");
    assert_eq!(body["data"]["stock"], 7);

    let missing = format!("/api/v1/books/{}/", uuid::Uuid::new_v4());
    let replacement = book("X", "9780000000008", "Poetry", 1.0, 1);
    let (status, _) = call(&app, "PUT", &missing, Some(replacement)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let app = app();
    let ids = seed(&app).await;

    let uri = format!("/api/v1/books/{}/", ids[1]);
    let (status, _) = call(&app, "PATCH", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_over_known_catalog() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(&app, "GET", "/api/v1/books/stats/", None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["total_books"], 4);
    assert_eq!(stats["total_stock"], 12);
    assert_eq!(stats["out_of_stock_books"], 2);
    assert_eq!(stats["genres_count"], 3);
    assert_eq!(stats["average_price"], 26.25);
    assert_eq!(stats["most_expensive_book"], 45.0);
    assert_eq!(stats["cheapest_book"], 10.0);
}

#[tokio::test]
async fn price_bounds_are_inclusive() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(
        &app,
        "GET",
        "/api/v1/books/?price_min=20&price_max=30&ordering=price",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Beta", "Gamma"]);
}

#[tokio::test]
async fn out_of_stock_filter_and_pagination_links() {
    let app = app();
    seed(&app).await;

    let (_, body) = call(&app, "GET", "/api/v1/books/?in_stock=false", None).await;
    assert_eq!(body["count"], 2);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|b| b["stock"] == 0));

    let (_, body) = call(&app, "GET", "/api/v1/books/?page_size=3&ordering=title", None).await;
    assert_eq!(body["count"], 4);
    assert_eq!(body["next"], "/api/v1/books/?page_size=3&ordering=title&page=2");
}

#[tokio::test]
async fn unknown_routes_and_docs() {
    let app = app();

    let (status, body) = call(&app, "GET", "/api/v1/nothing-here/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) = call(&app, "GET", "/api/schema", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/books/"]["post"].is_object());
    assert!(body["paths"]["/api/v1/books/{id}/"]["patch"].is_object());
    assert!(body["paths"]["/api/v1/books/stats/"]["get"].is_object());
}
