//! The catalog's entity tables
//!
//! Each entity is one static [`Schema`]; everything else in the service
//! (validation, listing, routes) is generic over it.

mod book;
mod movie;
mod product;

pub use book::BOOK;
pub use movie::MOVIE;
pub use product::PRODUCT;

use crate::schema::Schema;

/// Every entity the service exposes, in mount order
pub fn all() -> [&'static Schema; 3] {
    [&PRODUCT, &MOVIE, &BOOK]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FilterBinding, CREATED_AT_FIELD, ID_FIELD};
    use std::collections::HashSet;

    #[test]
    fn test_every_entity_has_identity_and_timestamp() {
        for schema in all() {
            assert!(schema.field(ID_FIELD).is_some(), "{} lacks id", schema.entity);
            assert!(schema.is_sortable(CREATED_AT_FIELD), "{} lacks created_at", schema.entity);
            assert!(schema.field(schema.display_field).is_some());
        }
    }

    #[test]
    fn test_prefixes_and_collections_are_distinct() {
        let prefixes: HashSet<_> = all().iter().map(|s| s.id_prefix).collect();
        let collections: HashSet<_> = all().iter().map(|s| s.collection).collect();
        assert_eq!(prefixes.len(), 3);
        assert_eq!(collections.len(), 3);
    }

    #[test]
    fn test_filter_parameters_are_unique_per_entity() {
        for schema in all() {
            let mut seen = HashSet::new();
            for spec in schema.filterable_fields() {
                let params = match spec.filter {
                    FilterBinding::Substring { param } => vec![param],
                    FilterBinding::Range { min_param, max_param } => vec![min_param, max_param],
                    FilterBinding::None => vec![],
                };
                for param in params {
                    assert!(seen.insert(param), "{} reuses {}", schema.entity, param);
                    // must not collide with the pagination and sort parameters
                    assert!(!["page", "page_size", "sort_by", "sort_field", "order", "sort_direction"].contains(&param));
                }
            }
        }
    }
}
