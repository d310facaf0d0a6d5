//! Success envelopes shared by every resource.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::pagination::Page;

/// `{success, message, data}` wrapper around a single payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Paginated collection envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    /// Size of the whole filtered collection
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    with_status(StatusCode::OK, message, data)
}

pub fn created<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<ApiResponse<T>>) {
    with_status(StatusCode::CREATED, message, data)
}

fn with_status<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        }),
    )
}

pub fn page<T: Serialize>(message: impl Into<String>, page: Page<T>) -> Json<ListResponse<T>> {
    Json(ListResponse {
        success: true,
        message: message.into(),
        data: page.items,
        count: page.count,
        next: page.next,
        previous: page.previous,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sets_status_and_flag() {
        let (status, Json(body)) = created("Made", 7);
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
        assert_eq!(body.data, Some(7));
    }

    #[test]
    fn list_envelope_serializes_null_links() {
        let Json(body) = page(
            "Listed",
            Page {
                items: vec![1, 2],
                count: 2,
                next: None,
                previous: None,
            },
        );
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["count"], 2);
        assert!(value["next"].is_null());
        assert!(value["previous"].is_null());
        assert_eq!(value["data"], serde_json::json!([1, 2]));
    }
}
