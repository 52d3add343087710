//! Explicit field tables describing each entity
//!
//! A [`Schema`] lists every field an entity carries together with its
//! type, constraints, filter binding and sortability. The generic
//! validator in [`validate`] and the listing engine both read this table;
//! no entity has hand-written per-field checks.
//!
//! ```rust
//! use catalog_service::schema::{FieldSpec, Schema};
//!
//! static WIDGET: Schema = Schema {
//!     entity: "Widget",
//!     collection: "widgets",
//!     id_prefix: "wdg",
//!     display_field: "label",
//!     fields: &[
//!         FieldSpec::id(),
//!         FieldSpec::text("label", 1, 80).substring_filter("label").sortable(),
//!         FieldSpec::integer("size", 0, None).range_filter("min_size", "max_size"),
//!         FieldSpec::created_at(),
//!     ],
//! };
//!
//! assert!(WIDGET.is_sortable("label"));
//! assert!(!WIDGET.is_sortable("size"));
//! ```

mod derived;
mod validate;

pub use derived::recompute_derived_fields;
pub use validate::{validate_create, validate_update, PayloadError};

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A stored entity: a flat JSON object keyed by field name
pub type Document = serde_json::Map<String, Value>;

/// Name of the server-assigned identifier field
pub const ID_FIELD: &str = "id";

/// Name of the creation timestamp field
pub const CREATED_AT_FIELD: &str = "created_at";

/// Normalization applied to text after trimming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Preserve,
    /// Capitalize each whitespace-separated word, lowercase the rest
    Title,
}

/// Inclusive upper bound of an integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerMax {
    Fixed(i64),
    /// The current calendar year (UTC) at validation time
    CurrentYear,
}

impl IntegerMax {
    pub fn resolve(&self) -> i64 {
        match self {
            Self::Fixed(max) => *max,
            Self::CurrentYear => {
                use chrono::Datelike;
                i64::from(chrono::Utc::now().year())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text {
        min_len: usize,
        max_len: usize,
        case: TextCase,
    },
    Integer {
        min: i64,
        max: Option<IntegerMax>,
    },
    Float {
        min: Option<f64>,
        /// `min` itself is rejected
        min_exclusive: bool,
        max: Option<f64>,
        /// Round to this many decimal places before bounds are checked
        decimals: Option<u32>,
    },
    Boolean,
    /// RFC 3339 UTC instant; sorts newest-first by default
    Timestamp,
}

impl FieldKind {
    pub fn is_time_like(&self) -> bool {
        matches!(self, Self::Timestamp)
    }
}

/// How a field can be queried in a search listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterBinding {
    None,
    /// Case-insensitive literal substring, read from `param`
    Substring { param: &'static str },
    /// Inclusive numeric range, either bound omittable
    Range {
        min_param: &'static str,
        max_param: &'static str,
    },
}

/// Who may write a field
#[derive(Clone, Copy)]
pub enum Access {
    Writable,
    /// Assigned by the server at creation
    ReadOnly,
    /// Computed from other fields of the same document
    Derived(fn(&Document) -> Value),
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Writable => write!(f, "Writable"),
            Self::ReadOnly => write!(f, "ReadOnly"),
            Self::Derived(_) => write!(f, "Derived"),
        }
    }
}

/// One row of a schema table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<fn() -> Value>,
    pub filter: FilterBinding,
    pub sortable: bool,
    pub access: Access,
}

impl FieldSpec {
    const fn base(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            filter: FilterBinding::None,
            sortable: false,
            access: Access::Writable,
        }
    }

    /// Server-assigned identifier
    pub const fn id() -> Self {
        let mut spec = Self::base(
            ID_FIELD,
            FieldKind::Text {
                min_len: 1,
                max_len: 64,
                case: TextCase::Preserve,
            },
        );
        spec.access = Access::ReadOnly;
        spec
    }

    /// Creation timestamp, sortable, never client-settable
    pub const fn created_at() -> Self {
        let mut spec = Self::base(CREATED_AT_FIELD, FieldKind::Timestamp);
        spec.access = Access::ReadOnly;
        spec.sortable = true;
        spec
    }

    /// Required text field, trimmed, length counted in characters
    pub const fn text(name: &'static str, min_len: usize, max_len: usize) -> Self {
        Self::base(
            name,
            FieldKind::Text {
                min_len,
                max_len,
                case: TextCase::Preserve,
            },
        )
    }

    pub const fn integer(name: &'static str, min: i64, max: Option<IntegerMax>) -> Self {
        Self::base(name, FieldKind::Integer { min, max })
    }

    /// Float accepting any value above `min`
    pub const fn positive_float(name: &'static str, decimals: Option<u32>) -> Self {
        Self::base(
            name,
            FieldKind::Float {
                min: Some(0.0),
                min_exclusive: true,
                max: None,
                decimals,
            },
        )
    }

    pub const fn bounded_float(name: &'static str, min: f64, max: f64, decimals: Option<u32>) -> Self {
        Self::base(
            name,
            FieldKind::Float {
                min: Some(min),
                min_exclusive: false,
                max: Some(max),
                decimals,
            },
        )
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::base(name, FieldKind::Boolean)
    }

    /// Field recomputed from others on every write and read
    pub const fn derived(name: &'static str, kind: FieldKind, compute: fn(&Document) -> Value) -> Self {
        let mut spec = Self::base(name, kind);
        spec.required = false;
        spec.access = Access::Derived(compute);
        spec
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Optional field filled with `default` when absent at creation
    pub const fn with_default(mut self, default: fn() -> Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    pub const fn title_case(mut self) -> Self {
        if let FieldKind::Text { min_len, max_len, .. } = self.kind {
            self.kind = FieldKind::Text {
                min_len,
                max_len,
                case: TextCase::Title,
            };
        }
        self
    }

    pub const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub const fn substring_filter(mut self, param: &'static str) -> Self {
        self.filter = FilterBinding::Substring { param };
        self
    }

    pub const fn range_filter(mut self, min_param: &'static str, max_param: &'static str) -> Self {
        self.filter = FilterBinding::Range {
            min_param,
            max_param,
        };
        self
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.access, Access::Writable)
    }
}

/// Field table plus the naming an entity needs at the edges
#[derive(Debug)]
pub struct Schema {
    /// Human name used in messages ("Product")
    pub entity: &'static str,
    /// Storage collection and URL segment ("products")
    pub collection: &'static str,
    /// TypeID prefix of the entity's ids
    pub id_prefix: &'static str,
    /// Field quoted in the delete confirmation
    pub display_field: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_sortable(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.sortable)
    }

    /// Sortable field names in table order
    pub fn sortable_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.sortable).map(|f| f.name)
    }

    /// Fields bound to a search filter
    pub fn filterable_fields(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields
            .iter()
            .filter(|f| !matches!(f.filter, FilterBinding::None))
    }

    /// Sort applied when the client names none
    pub fn default_sort_field(&self) -> &'static str {
        CREATED_AT_FIELD
    }
}

/// A single problem with one input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field or query parameter at fault
    pub field: String,
    /// Machine-readable code (e.g. "too_long", "not_a_number")
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Input rejected before any storage call; lists every offending field
#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
#[error("Validation failed: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, code, message)],
        }
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Err(self)` if anything was recorded, otherwise `Ok(value)`
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}
