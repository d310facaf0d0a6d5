//! HTTP handlers for the book catalog.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use bookstore_db::DbError;
use bookstore_http::{
    envelope::{self, ApiResponse, ListResponse},
    error::ErrorBody,
    pagination::PageRequest,
    AppError,
};
use bookstore_kernel::settings::ApiSettings;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    filters::{BookFilter, BookListParams},
    models::{Book, BookRequest, BookStats},
    payload::{BookChanges, Mode},
    store::SharedStore,
};

/// State shared by every books handler.
#[derive(Clone)]
pub struct BooksState {
    pub store: SharedStore,
    pub api: ApiSettings,
}

type JsonResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

/// List books with filtering, search, ordering and pagination
#[utoipa::path(
    get,
    path = "/books/",
    tag = "Books",
    params(BookListParams),
    responses(
        (status = 200, description = "Page of matching books", body = ListResponse<Book>),
        (status = 400, description = "Malformed filter value", body = ErrorBody),
        (status = 404, description = "Page out of range", body = ErrorBody)
    )
)]
pub async fn list_books(
    State(state): State<BooksState>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<BookListParams>, QueryRejection>,
) -> Result<Json<ListResponse<Book>>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let filter = BookFilter::from_params(&params)?;
    let window = PageRequest::from_params(
        params.page.as_deref(),
        params.page_size.as_deref(),
        &state.api,
    )?;

    let books = filter.apply(state.store.all().await.map_err(map_store_error)?);
    let page = window.paginate(books, uri.path(), uri.query())?;

    Ok(envelope::page("Books retrieved successfully", page))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books/",
    tag = "Books",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = ApiResponse<Book>),
        (status = 400, description = "Invalid book data", body = ErrorBody),
        (status = 409, description = "ISBN already in the catalog", body = ErrorBody)
    )
)]
pub async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> JsonResult<Book> {
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let book = BookChanges::parse(&body, Mode::Create)?.into_new_book(OffsetDateTime::now_utc())?;
    let book = state.store.insert(book).await.map_err(map_store_error)?;

    tracing::info!(book_id = %book.id, title = %book.title, "book created");
    Ok(envelope::created("Book created successfully", book))
}

/// Fetch one book
#[utoipa::path(
    get,
    path = "/books/{id}/",
    tag = "Books",
    params(("id" = Uuid, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "The book", body = ApiResponse<Book>),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn retrieve_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> JsonResult<Book> {
    let book = fetch(&state, &id).await?;
    Ok(envelope::ok("Book retrieved successfully", book))
}

/// Replace a book's writable fields
#[utoipa::path(
    put,
    path = "/books/{id}/",
    tag = "Books",
    params(("id" = Uuid, Path, description = "Book identifier")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = ApiResponse<Book>),
        (status = 400, description = "Invalid book data", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
        (status = 409, description = "ISBN already in the catalog", body = ErrorBody)
    )
)]
pub async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> JsonResult<Book> {
    write(&state, &id, payload, Mode::Replace).await
}

/// Update some of a book's fields
#[utoipa::path(
    patch,
    path = "/books/{id}/",
    tag = "Books",
    params(("id" = Uuid, Path, description = "Book identifier")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = ApiResponse<Book>),
        (status = 400, description = "Invalid or empty update", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
        (status = 409, description = "ISBN already in the catalog", body = ErrorBody)
    )
)]
pub async fn partial_update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> JsonResult<Book> {
    write(&state, &id, payload, Mode::Partial).await
}

/// Remove a book from the catalog
#[utoipa::path(
    delete,
    path = "/books/{id}/",
    tag = "Books",
    params(("id" = Uuid, Path, description = "Book identifier")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn destroy_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let book = state.store.remove(id).await.map_err(map_store_error)?;

    tracing::info!(book_id = %book.id, title = %book.title, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Catalog-wide figures
#[utoipa::path(
    get,
    path = "/books/stats/",
    tag = "Books",
    responses((status = 200, description = "Catalog statistics", body = ApiResponse<BookStats>))
)]
pub async fn book_stats(State(state): State<BooksState>) -> JsonResult<BookStats> {
    let books = state.store.all().await.map_err(map_store_error)?;
    Ok(envelope::ok(
        "Statistics retrieved successfully",
        BookStats::from_books(&books),
    ))
}

async fn fetch(state: &BooksState, raw_id: &str) -> Result<Book, AppError> {
    let id = parse_id(raw_id)?;
    state
        .store
        .get(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| book_not_found(raw_id))
}

async fn write(
    state: &BooksState,
    raw_id: &str,
    payload: Result<Json<Value>, JsonRejection>,
    mode: Mode,
) -> JsonResult<Book> {
    let mut book = fetch(state, raw_id).await?;
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    BookChanges::parse(&body, mode)?.apply(&mut book, OffsetDateTime::now_utc());
    let book = state.store.replace(book).await.map_err(map_store_error)?;

    tracing::info!(book_id = %book.id, title = %book.title, ?mode, "book updated");
    Ok(envelope::ok("Book updated successfully", book))
}

/// Ids that are not UUIDs cannot name a book.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| book_not_found(raw))
}

fn book_not_found(id: impl std::fmt::Display) -> AppError {
    AppError::not_found("Book not found", format!("No book found with ID: {id}"))
}

fn map_store_error(err: DbError) -> AppError {
    match err {
        DbError::UniqueViolation { field: "isbn", .. } => AppError::conflict(
            "Book already exists",
            "A book with this ISBN already exists",
        ),
        DbError::UniqueViolation { field, value } => {
            tracing::warn!(field, value = %value, "unexpected unique constraint violation");
            AppError::bad_request("Database constraint violation")
        }
        DbError::NotFound { id } => book_not_found(id),
        DbError::Backend(e) => AppError::Internal(e),
    }
}
