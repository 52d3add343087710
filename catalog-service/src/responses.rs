//! HTTP response builders with correct status codes
//!
//! - **200 OK** with a `{"message": ...}` body for confirmations
//! - **201 Created** with an optional `Location` header

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// HTTP 201 Created response
///
/// ```rust
/// use axum::response::IntoResponse;
/// use catalog_service::responses::Created;
///
/// let response = Created::new(serde_json::json!({"id": "prod_1"}))
///     .with_location("/api/v1/products/prod_1")
///     .into_response();
/// assert_eq!(response.status(), 201);
/// ```
#[derive(Debug)]
pub struct Created<T> {
    data: T,
    location: Option<String>,
}

impl<T> Created<T> {
    pub fn new(data: T) -> Self {
        Self { data, location: None }
    }

    /// Add a Location header pointing to the created resource
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::CREATED, Json(&self.data)).into_response();

        if let Some(location) = self.location {
            if let Ok(header_value) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(header::LOCATION, header_value);
            }
        }

        response
    }
}

/// HTTP 200 confirmation carrying only a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for Message {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_with_location() {
        let response = Created::new("data").with_location("/books/book_1").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/books/book_1");
    }

    #[test]
    fn test_created_without_location() {
        let response = Created::new("data").into_response();
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_message_body() {
        let response = Message::new("Book 'Dune' deleted successfully").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "Book 'Dune' deleted successfully");
    }
}
