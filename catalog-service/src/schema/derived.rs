use super::{Access, Document, Schema};

/// Recompute every derived field of `document` from its sources.
///
/// Pure: the input is consumed and the recomputed document returned.
/// Whatever derived value the document carried before is overwritten,
/// including one that came back from storage.
pub fn recompute_derived_fields(schema: &Schema, mut document: Document) -> Document {
    for spec in schema.fields {
        if let Access::Derived(compute) = spec.access {
            let value = compute(&document);
            document.insert(spec.name.to_string(), value);
        }
    }
    document
}
