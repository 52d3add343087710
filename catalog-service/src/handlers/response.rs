//! List response envelope
//!
//! The page of entities is keyed by the collection name, next to the
//! pagination metadata:
//!
//! ```json
//! {"total": 42, "page": 1, "page_size": 10, "total_pages": 5, "products": [...]}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::listing::ListingPage;

#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse {
    /// Key the items are published under
    pub collection: &'static str,
    pub page: ListingPage,
}

impl ListResponse {
    pub fn new(collection: &'static str, page: ListingPage) -> Self {
        Self { collection, page }
    }
}

impl Serialize for ListResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("total", &self.page.total)?;
        map.serialize_entry("page", &self.page.page)?;
        map.serialize_entry("page_size", &self.page.page_size)?;
        map.serialize_entry("total_pages", &self.page.total_pages)?;
        map.serialize_entry(self.collection, &self.page.items)?;
        map.end()
    }
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
