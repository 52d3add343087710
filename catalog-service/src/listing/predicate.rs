//! Filter predicates and ordering over documents
//!
//! These are the storage-neutral forms of a listing query. A store either
//! evaluates them directly ([`Predicate::matches`], [`compare_documents`])
//! or translates them into its own query language.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Document, ID_FIELD};

/// One filter condition on one field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field is a string containing `needle`, ignoring case.
    ///
    /// `needle` is stored lowercased and matched literally.
    Contains { field: &'static str, needle: String },

    /// Field is a number within `[min, max]`; a missing bound is open
    Range {
        field: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Predicate {
    pub fn contains(field: &'static str, needle: &str) -> Self {
        Self::Contains {
            field,
            needle: needle.to_lowercase(),
        }
    }

    pub fn range(field: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range { field, min, max }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Contains { field, .. } | Self::Range { field, .. } => *field,
        }
    }

    /// True when no document can ever satisfy this predicate
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Self::Range { min: Some(min), max: Some(max), .. } if min > max)
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::Contains { field, needle } => document
                .get(*field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(needle.as_str())),
            Self::Range { field, min, max } => {
                let Some(n) = document.get(*field).and_then(Value::as_f64) else {
                    return false;
                };
                min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
            }
        }
    }
}

/// `true` when `document` satisfies every predicate (vacuously for none)
pub fn matches_all(predicates: &[Predicate], document: &Document) -> bool {
    predicates.iter().all(|p| p.matches(document))
}

/// Sort direction for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl SortDirection {
    /// Keyword for an `ORDER BY` clause
    #[must_use]
    pub const fn as_keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Accepts `asc`/`desc` and the long forms, any case
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Primary sort key of a listing.
///
/// Ties on `field` are always broken by the document id in the same
/// direction, so the ordering is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: &'static str, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

/// Total order over documents for `sort`: the sort field, then the id.
///
/// Missing and null values sort before every present value.
pub fn compare_documents(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    let primary = compare_values(a.get(sort.field), b.get(sort.field));
    let tie_break = compare_values(a.get(ID_FIELD), b.get(ID_FIELD));
    sort.direction.apply(primary.then(tie_break))
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_contains_ignores_case_and_is_literal() {
        let d = doc(json!({"name": "Mechanical Keyboard (US)"}));
        assert!(Predicate::contains("name", "KEYBOARD").matches(&d));
        assert!(Predicate::contains("name", "(us)").matches(&d));
        assert!(!Predicate::contains("name", "key.*board").matches(&d));
        assert!(!Predicate::contains("missing", "x").matches(&d));
    }

    #[test]
    fn test_range_bounds_are_inclusive_and_independent() {
        let d = doc(json!({"price": 20}));
        assert!(Predicate::range("price", Some(20.0), Some(20.0)).matches(&d));
        assert!(Predicate::range("price", Some(15.0), None).matches(&d));
        assert!(Predicate::range("price", None, Some(25.5)).matches(&d));
        assert!(!Predicate::range("price", Some(20.5), None).matches(&d));
        assert!(!Predicate::range("price", None, Some(19.0)).matches(&d));
        assert!(!Predicate::range("rating", None, None).matches(&d));
    }

    #[test]
    fn test_inverted_range_is_unsatisfiable() {
        assert!(Predicate::range("price", Some(50.0), Some(10.0)).is_unsatisfiable());
        assert!(!Predicate::range("price", Some(10.0), Some(10.0)).is_unsatisfiable());
        assert!(!Predicate::range("price", Some(50.0), None).is_unsatisfiable());
        assert!(!Predicate::contains("name", "a").is_unsatisfiable());
    }

    #[test]
    fn test_matches_all_is_a_conjunction() {
        let d = doc(json!({"name": "Desk Lamp", "price": 30}));
        let both = [Predicate::contains("name", "lamp"), Predicate::range("price", Some(10.0), None)];
        assert!(matches_all(&both, &d));
        let one_fails = [Predicate::contains("name", "lamp"), Predicate::range("price", Some(40.0), None)];
        assert!(!matches_all(&one_fails, &d));
        assert!(matches_all(&[], &d));
    }

    #[test]
    fn test_ties_break_on_id_in_sort_direction() {
        let a = doc(json!({"id": "a", "price": 5}));
        let b = doc(json!({"id": "b", "price": 5}));
        let asc = SortSpec::new("price", SortDirection::Asc);
        let desc = SortSpec::new("price", SortDirection::Desc);
        assert_eq!(compare_documents(&a, &b, &asc), Ordering::Less);
        assert_eq!(compare_documents(&a, &b, &desc), Ordering::Greater);
    }

    #[test]
    fn test_nulls_sort_first_ascending() {
        let present = doc(json!({"id": "a", "genre": "Drama"}));
        let absent = doc(json!({"id": "b"}));
        let null = doc(json!({"id": "c", "genre": null}));
        let asc = SortSpec::new("genre", SortDirection::Asc);
        assert_eq!(compare_documents(&absent, &present, &asc), Ordering::Less);
        assert_eq!(compare_documents(&null, &present, &asc), Ordering::Less);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let small = doc(json!({"id": "a", "n": 9}));
        let large = doc(json!({"id": "b", "n": 10.5}));
        let asc = SortSpec::new("n", SortDirection::Asc);
        assert_eq!(compare_documents(&small, &large, &asc), Ordering::Less);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse(" ascending "), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("sideways"), None);
        assert_eq!(SortDirection::Desc.as_keyword(), "DESC");
        assert_eq!(SortDirection::Asc.to_string(), "asc");
    }
}
