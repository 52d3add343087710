//! Prefixed, time-sortable identifiers
//!
//! Every identifier in the service is a TypeID: a short lowercase prefix
//! naming what the id points at, an underscore, and a base32 UUIDv7.
//!
//! ```rust
//! use catalog_service::ids::{EntityId, RequestId};
//!
//! let product = EntityId::new("prod");
//! assert!(product.as_str().starts_with("prod_"));
//!
//! let request = RequestId::new();
//! assert!(request.as_str().starts_with("req_"));
//! ```

use http::Request;
use mti::prelude::*;
use std::fmt;
use std::str::FromStr;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Parse `raw` as a TypeID and require the given prefix
fn parse_prefixed(expected: &str, raw: &str) -> Result<MagicTypeId, IdError> {
    let mti = MagicTypeId::from_str(raw).map_err(IdError::Parse)?;

    if mti.prefix().as_str() != expected {
        return Err(IdError::InvalidPrefix {
            expected: expected.to_string(),
            actual: mti.prefix().as_str().to_string(),
        });
    }

    Ok(mti)
}

/// Error type for identifier parsing.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The ID could not be parsed as a valid TypeID.
    #[error("failed to parse identifier: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}

/// Identifier of a stored entity.
///
/// The prefix is chosen by the entity's schema (`prod`, `movie`, `book`),
/// so an id minted for one collection never resolves in another.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(MagicTypeId);

impl EntityId {
    /// Mint a fresh id under `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self(prefix.create_type_id::<V7>())
    }

    /// Parse a client-supplied id, requiring `prefix`.
    pub fn parse(prefix: &str, raw: &str) -> Result<Self, IdError> {
        parse_prefixed(prefix, raw).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0.to_string()
    }
}

/// A type-safe request identifier for log correlation.
///
/// Format: `req_<base32-encoded-uuidv7>`, e.g. `req_01h455vb4pex5vsknk084sn02q`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// The prefix used for request IDs
    pub const PREFIX: &'static str = "req";

    /// Creates a new request ID with a UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the prefix portion of the ID.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(Self::PREFIX, s).map(Self)
    }
}

/// A `MakeRequestId` implementation that generates `RequestId`s for tower-http.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
