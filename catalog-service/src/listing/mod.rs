//! Filtered Listing Engine
//!
//! Turns raw query parameters into a validated [`ListingQuery`] and
//! answers it with one `count` and one `find` against a
//! [`DocumentStore`]. The engine keeps no state between calls.
//!
//! Rules:
//! - predicates combine with AND; an absent or blank parameter adds none
//! - `page` defaults to 1 and must be at least 1
//! - `page_size` defaults to the configured default, must be at least 1,
//!   and is clamped to the configured maximum
//! - `sort_by` must name a sortable field; it defaults to `created_at`
//! - `order` defaults to descending for timestamps, ascending otherwise
//! - ties in the sort field are broken by id, so pages never overlap
//! - a page past the end is empty, `total` still counts every match
//! - a range with `min > max` matches nothing
//!
//! Parameter validation is all-or-nothing: every bad parameter is
//! reported and no storage call is made.

mod predicate;

pub use predicate::{compare_documents, matches_all, Predicate, SortDirection, SortSpec};

use std::collections::HashMap;

use serde::Serialize;

use crate::config::ListingConfig;
use crate::schema::{recompute_derived_fields, Document, FieldError, FilterBinding, Schema, ValidationError};
use crate::store::{DocumentStore, StorageError};

/// Raw query-string parameters, unvalidated
pub type ListingParams = HashMap<String, String>;

/// Which parameters a listing honours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// Pagination and sort only; filter parameters are ignored
    Browse,
    /// Pagination, sort and the schema's filters
    Search,
}

/// A listing request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub predicates: Vec<Predicate>,
    pub sort: SortSpec,
    pub page: u32,
    pub page_size: u32,
}

/// One page of results plus pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub items: Vec<Document>,
    /// Matches across all pages
    pub total: u64,
    pub page: u32,
    /// Page size actually applied, after clamping
    pub page_size: u32,
    /// `ceil(total / page_size)`, zero when nothing matches
    pub total_pages: u64,
}

impl ListingPage {
    fn empty(query: &ListingQuery) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: query.page,
            page_size: query.page_size,
            total_pages: 0,
        }
    }
}

/// Why a listing could not be answered
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ListingQuery {
    /// Validate raw parameters against `schema`.
    ///
    /// Unrecognised parameters are ignored.
    pub fn parse(
        schema: &Schema,
        params: &ListingParams,
        mode: ListingMode,
        limits: &ListingConfig,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        let page = match param(params, "page") {
            None => Some(1),
            Some(raw) => parse_positive(raw, "page", &mut errors),
        };

        let page_size = match param(params, "page_size") {
            None => Some(limits.default_page_size),
            Some(raw) => parse_positive(raw, "page_size", &mut errors).map(|size| size.min(limits.max_page_size)),
        };

        let sort_param = if param(params, "sort_by").is_some() { "sort_by" } else { "sort_field" };
        let field = match param(params, sort_param) {
            None => Some(schema.default_sort_field()),
            Some(raw) => match schema.fields.iter().find(|f| f.sortable && f.name == raw) {
                Some(spec) => Some(spec.name),
                None => {
                    let allowed: Vec<_> = schema.sortable_fields().collect();
                    errors.push(FieldError::new(
                        sort_param,
                        "invalid_sort_field",
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                    None
                }
            },
        };

        let order_param = if param(params, "order").is_some() { "order" } else { "sort_direction" };
        let direction = match param(params, order_param) {
            None => None,
            Some(raw) => match SortDirection::parse(raw) {
                Some(direction) => Some(direction),
                None => {
                    errors.push(FieldError::new(order_param, "invalid_order", "must be 'asc' or 'desc'"));
                    None
                }
            },
        };

        let predicates = match mode {
            ListingMode::Browse => Vec::new(),
            ListingMode::Search => parse_predicates(schema, params, &mut errors),
        };

        match (page, page_size, field) {
            (Some(page), Some(page_size), Some(field)) if errors.is_empty() => {
                let direction = direction.unwrap_or_else(|| default_direction(schema, field));
                Ok(Self {
                    predicates,
                    sort: SortSpec::new(field, direction),
                    page,
                    page_size,
                })
            }
            _ => Err(errors),
        }
    }

    /// Documents to pass over before this page starts
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// True when some predicate can never match
    pub fn is_unsatisfiable(&self) -> bool {
        self.predicates.iter().any(Predicate::is_unsatisfiable)
    }
}

/// Answer a validated query.
///
/// Derived fields of every returned document are recomputed.
pub async fn run_listing(
    store: &dyn DocumentStore,
    schema: &Schema,
    query: &ListingQuery,
) -> Result<ListingPage, StorageError> {
    if query.is_unsatisfiable() {
        tracing::debug!(collection = schema.collection, "Listing short-circuited on an empty range");
        return Ok(ListingPage::empty(query));
    }

    let (total, items) = futures::try_join!(
        store.count(schema.collection, &query.predicates),
        store.find(
            schema.collection,
            &query.predicates,
            &query.sort,
            query.skip(),
            u64::from(query.page_size),
        ),
    )?;

    let items = items
        .into_iter()
        .map(|doc| recompute_derived_fields(schema, doc))
        .collect();

    Ok(ListingPage {
        items,
        total,
        page: query.page,
        page_size: query.page_size,
        total_pages: total_pages(total, query.page_size),
    })
}

/// Validate then run, in one call
pub async fn list(
    store: &dyn DocumentStore,
    schema: &Schema,
    params: &ListingParams,
    mode: ListingMode,
    limits: &ListingConfig,
) -> Result<ListingPage, ListingError> {
    let query = ListingQuery::parse(schema, params, mode, limits)?;
    Ok(run_listing(store, schema, &query).await?)
}

fn total_pages(total: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total.div_ceil(page_size)
}

fn default_direction(schema: &Schema, field: &str) -> SortDirection {
    match schema.field(field) {
        Some(spec) if spec.kind.is_time_like() => SortDirection::Desc,
        _ => SortDirection::Asc,
    }
}

/// Non-blank, trimmed parameter value
fn param<'a>(params: &'a ListingParams, name: &str) -> Option<&'a str> {
    params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_positive(raw: &str, name: &str, errors: &mut ValidationError) -> Option<u32> {
    match raw.parse::<i64>() {
        Ok(n) if n < 1 => {
            errors.push(FieldError::new(name, "too_small", "must be greater than or equal to 1"));
            None
        }
        Ok(n) => match u32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                errors.push(FieldError::new(name, "too_large", format!("must be at most {}", u32::MAX)));
                None
            }
        },
        Err(_) => {
            errors.push(FieldError::new(name, "not_an_integer", "must be a positive integer"));
            None
        }
    }
}

fn parse_bound(params: &ListingParams, name: &str, errors: &mut ValidationError) -> Option<f64> {
    let raw = param(params, name)?;
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            errors.push(FieldError::new(name, "not_a_number", "must be a number"));
            None
        }
    }
}

fn parse_predicates(schema: &Schema, params: &ListingParams, errors: &mut ValidationError) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    for spec in schema.filterable_fields() {
        match spec.filter {
            FilterBinding::Substring { param: name } => {
                if let Some(needle) = param(params, name) {
                    predicates.push(Predicate::contains(spec.name, needle));
                }
            }
            FilterBinding::Range { min_param, max_param } => {
                let min = parse_bound(params, min_param, errors);
                let max = parse_bound(params, max_param, errors);
                if min.is_some() || max.is_some() {
                    predicates.push(Predicate::range(spec.name, min, max));
                }
            }
            FilterBinding::None => {}
        }
    }

    predicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, CREATED_AT_FIELD};
    use crate::store::{MemoryStore, StorageErrorKind, StorageOperation, StorageResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    static THING: Schema = Schema {
        entity: "Thing",
        collection: "things",
        id_prefix: "thg",
        display_field: "name",
        fields: &[
            FieldSpec::id(),
            FieldSpec::text("name", 1, 50).substring_filter("name").sortable(),
            FieldSpec::text("kind", 1, 50).substring_filter("kind"),
            FieldSpec::positive_float("price", Some(2))
                .range_filter("min_price", "max_price")
                .sortable(),
            FieldSpec::created_at(),
        ],
    };

    fn limits() -> ListingConfig {
        ListingConfig {
            default_page_size: 10,
            max_page_size: 100,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> ListingParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Seeds `things` with ids `t000`.. in creation order
    async fn seed(store: &MemoryStore, rows: &[(&str, &str, f64)]) {
        for (i, (name, kind, price)) in rows.iter().enumerate() {
            let id = format!("t{i:03}");
            let created_at = format!("2024-01-01T00:00:{:02}.000000Z", i % 60);
            store
                .insert(
                    "things",
                    &id,
                    doc(json!({"id": id, "name": name, "kind": kind, "price": price, "created_at": created_at})),
                )
                .await
                .unwrap();
        }
    }

    async fn search(store: &MemoryStore, pairs: &[(&str, &str)]) -> Result<ListingPage, ListingError> {
        list(store, &THING, &params(pairs), ListingMode::Search, &limits()).await
    }

    fn ids(page: &ListingPage) -> Vec<String> {
        page.items
            .iter()
            .filter_map(|d| d.get("id").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    fn field_errors(err: ListingError) -> Vec<String> {
        match err {
            ListingError::Validation(v) => v.errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let query = ListingQuery::parse(&THING, &params(&[]), ListingMode::Search, &limits()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 10);
        assert_eq!(query.sort, SortSpec::new(CREATED_AT_FIELD, SortDirection::Desc));
        assert!(query.predicates.is_empty());
        assert_eq!(query.skip(), 0);
    }

    #[test]
    fn test_non_time_fields_default_ascending() {
        let query = ListingQuery::parse(&THING, &params(&[("sort_by", "price")]), ListingMode::Browse, &limits())
            .unwrap();
        assert_eq!(query.sort.direction, SortDirection::Asc);

        let query = ListingQuery::parse(
            &THING,
            &params(&[("sort_field", "name"), ("sort_direction", "DESC")]),
            ListingMode::Browse,
            &limits(),
        )
        .unwrap();
        assert_eq!(query.sort, SortSpec::new("name", SortDirection::Desc));
    }

    #[test]
    fn test_browse_ignores_filters() {
        let query = ListingQuery::parse(
            &THING,
            &params(&[("name", "lamp"), ("min_price", "abc")]),
            ListingMode::Browse,
            &limits(),
        )
        .unwrap();
        assert!(query.predicates.is_empty());
    }

    #[test]
    fn test_blank_filters_are_absent() {
        let query = ListingQuery::parse(
            &THING,
            &params(&[("name", "   "), ("min_price", "")]),
            ListingMode::Search,
            &limits(),
        )
        .unwrap();
        assert!(query.predicates.is_empty());
    }

    #[test]
    fn test_every_bad_parameter_is_reported() {
        let err = ListingQuery::parse(
            &THING,
            &params(&[
                ("page", "0"),
                ("page_size", "ten"),
                ("sort_by", "kind"),
                ("order", "up"),
                ("min_price", "cheap"),
            ]),
            ListingMode::Search,
            &limits(),
        )
        .unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["page", "page_size", "sort_by", "order", "min_price"]);
        assert_eq!(err.errors[2].message, "must be one of: name, price, created_at");
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(25, 10), 3);
    }

    // Seed 3 entities with 10, 20, 30 and filter min=15
    #[tokio::test]
    async fn test_min_bound_filters_and_keeps_default_order() {
        let store = MemoryStore::new();
        seed(&store, &[("a", "x", 10.0), ("b", "x", 20.0), ("c", "x", 30.0)]).await;

        let page = search(&store, &[("min_price", "15")]).await.unwrap();
        assert_eq!(page.total, 2);
        // default order is newest first
        assert_eq!(ids(&page), vec!["t002", "t001"]);
    }

    // 25 entities, pages of 10
    #[tokio::test]
    async fn test_pagination_metadata_and_beyond_range_page() {
        let store = MemoryStore::new();
        let rows: Vec<(&str, &str, f64)> = (0..25).map(|_| ("n", "k", 1.0)).collect();
        seed(&store, &rows).await;

        let first = search(&store, &[("page", "1"), ("page_size", "10")]).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 25);
        assert_eq!(first.total_pages, 3);

        let beyond = search(&store, &[("page", "4"), ("page_size", "10")]).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 25);
        assert_eq!(beyond.page, 4);
    }

    // Equal sort values keep the same relative order across calls
    #[tokio::test]
    async fn test_tie_break_is_stable() {
        let store = MemoryStore::new();
        seed(&store, &[("same", "k", 5.0), ("same", "k", 5.0), ("other", "k", 1.0)]).await;

        let sort = [("sort_by", "price")];
        let first = search(&store, &sort).await.unwrap();
        let second = search(&store, &sort).await.unwrap();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), vec!["t002", "t000", "t001"]);
    }

    #[tokio::test]
    async fn test_inverted_range_is_empty_not_an_error() {
        let store = MemoryStore::new();
        seed(&store, &[("a", "x", 20.0), ("b", "x", 30.0)]).await;

        let page = search(&store, &[("min_price", "50"), ("max_price", "10")]).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_fails_without_results() {
        let store = MemoryStore::new();
        seed(&store, &[("a", "x", 20.0)]).await;

        let err = search(&store, &[("sort_by", "nonexistent")]).await.unwrap_err();
        assert_eq!(field_errors(err), vec!["sort_by"]);
    }

    #[tokio::test]
    async fn test_predicates_combine_with_and() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                ("Desk Lamp", "lighting", 30.0),
                ("Floor Lamp", "lighting", 80.0),
                ("Lamp Oil", "supplies", 12.0),
                ("Desk", "furniture", 150.0),
            ],
        )
        .await;

        let filters = [("name", "LAMP"), ("kind", "light"), ("max_price", "50")];
        let page = search(&store, &filters).await.unwrap();
        assert_eq!(ids(&page), vec!["t000"]);

        // every returned document satisfies each predicate, and no other does
        let query = ListingQuery::parse(&THING, &params(&filters), ListingMode::Search, &limits()).unwrap();
        let all = search(&store, &[("page_size", "100")]).await.unwrap();
        for d in &all.items {
            let included = ids(&page).contains(&d["id"].as_str().unwrap_or_default().to_string());
            let satisfies = query.predicates.iter().all(|p| p.matches(d));
            assert_eq!(included, satisfies);
        }
    }

    #[tokio::test]
    async fn test_empty_filter_lists_everything() {
        let store = MemoryStore::new();
        seed(&store, &[("a", "x", 1.0), ("b", "y", 2.0), ("c", "z", 3.0)]).await;

        let page = search(&store, &[]).await.unwrap();
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let store = MemoryStore::new();
        let rows: Vec<(&str, &str, f64)> = (0..120).map(|_| ("n", "k", 1.0)).collect();
        seed(&store, &rows).await;

        let page = search(&store, &[("page_size", "500")]).await.unwrap();
        assert_eq!(page.page_size, 100);
        assert_eq!(page.items.len(), 100);
        assert_eq!(page.total_pages, 2);

        let last = search(&store, &[("page_size", "500"), ("page", "2")]).await.unwrap();
        assert_eq!(last.items.len(), 20);
    }

    #[tokio::test]
    async fn test_concatenated_pages_reproduce_the_full_set() {
        let store = MemoryStore::new();
        // many duplicate prices so page boundaries fall inside tie groups
        let rows: Vec<(&str, &str, f64)> = (0..23).map(|i| ("n", "k", f64::from(i % 3))).collect();
        seed(&store, &rows).await;

        let mut seen = Vec::new();
        let first = search(&store, &[("sort_by", "price"), ("page_size", "4")]).await.unwrap();
        for page in 1..=first.total_pages {
            let p = page.to_string();
            let result = search(&store, &[("sort_by", "price"), ("page_size", "4"), ("page", p.as_str())])
                .await
                .unwrap();
            seen.extend(ids(&result));
        }

        assert_eq!(seen.len(), 23);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 23);
    }

    struct DownStore;

    #[async_trait]
    impl DocumentStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }
        async fn count(&self, _: &str, _: &[Predicate]) -> StorageResult<u64> {
            Err(StorageError::new(StorageOperation::Count, StorageErrorKind::ConnectionFailed, "refused"))
        }
        async fn find(&self, _: &str, _: &[Predicate], _: &SortSpec, _: u64, _: u64) -> StorageResult<Vec<Document>> {
            Err(StorageError::new(StorageOperation::Find, StorageErrorKind::ConnectionFailed, "refused"))
        }
        async fn get(&self, _: &str, _: &str) -> StorageResult<Option<Document>> {
            Ok(None)
        }
        async fn insert(&self, _: &str, _: &str, _: Document) -> StorageResult<()> {
            Ok(())
        }
        async fn patch(&self, _: &str, _: &str, _: Document, _: &[String]) -> StorageResult<Option<Document>> {
            Ok(None)
        }
        async fn delete(&self, _: &str, _: &str) -> StorageResult<Option<Document>> {
            Ok(None)
        }
        async fn ping(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_distinct_from_no_results() {
        let err = list(&DownStore, &THING, &params(&[]), ListingMode::Search, &limits())
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::Storage(ref e) if e.kind == StorageErrorKind::ConnectionFailed));
    }

    #[tokio::test]
    async fn test_validation_happens_before_storage() {
        let err = list(&DownStore, &THING, &params(&[("page", "-1")]), ListingMode::Search, &limits())
            .await
            .unwrap_err();
        assert_eq!(field_errors(err), vec!["page"]);
    }
}
