use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::handlers::{self, BooksState};
use super::models::{Book, BookRequest, BookStats};

#[derive(OpenApi)]
#[openapi(
    tags((name = "Books", description = "Bookstore catalog management")),
    components(schemas(Book, BookRequest, BookStats))
)]
struct BooksApi;

/// Book routes, relative to the API prefix, plus their OpenAPI fragment.
pub fn router(state: BooksState) -> (Router, utoipa::openapi::OpenApi) {
    let (router, openapi) = OpenApiRouter::with_openapi(BooksApi::openapi())
        .routes(routes!(handlers::list_books, handlers::create_book))
        .routes(routes!(handlers::book_stats))
        .routes(routes!(
            handlers::retrieve_book,
            handlers::update_book,
            handlers::partial_update_book,
            handlers::destroy_book
        ))
        .split_for_parts();

    // Same handlers without the trailing slash; not repeated in the docs.
    let router = router
        .route(
            "/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route("/books/stats", get(handlers::book_stats))
        .route(
            "/books/{id}",
            get(handlers::retrieve_book)
                .put(handlers::update_book)
                .patch(handlers::partial_update_book)
                .delete(handlers::destroy_book),
        )
        .with_state(state);

    (router, openapi)
}
