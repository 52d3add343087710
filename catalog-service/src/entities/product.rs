use serde_json::Value;

use crate::schema::{Document, FieldKind, FieldSpec, Schema};

/// Stock-keeping item; `in_stock` follows `quantity`
pub static PRODUCT: Schema = Schema {
    entity: "Product",
    collection: "products",
    id_prefix: "prod",
    display_field: "name",
    fields: &[
        FieldSpec::id(),
        FieldSpec::text("name", 1, 150).substring_filter("name").sortable(),
        FieldSpec::text("category", 1, 150)
            .substring_filter("category")
            .sortable(),
        FieldSpec::positive_float("price", None)
            .range_filter("min_price", "max_price")
            .sortable(),
        FieldSpec::integer("quantity", 0, None).sortable(),
        FieldSpec::derived("in_stock", FieldKind::Boolean, in_stock),
        FieldSpec::created_at(),
    ],
};

fn in_stock(product: &Document) -> Value {
    let quantity = product.get("quantity").and_then(Value::as_i64).unwrap_or(0);
    Value::Bool(quantity > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{recompute_derived_fields, validate_create, validate_update};
    use serde_json::json;

    #[test]
    fn test_in_stock_follows_quantity() {
        let doc = validate_create(
            &PRODUCT,
            &json!({"name": "Desk Lamp", "category": "Lighting", "price": 29.99, "quantity": 3}),
        )
        .unwrap();
        let doc = recompute_derived_fields(&PRODUCT, doc);
        assert_eq!(doc["in_stock"], json!(true));

        let mut sold_out = doc.clone();
        sold_out.insert("quantity".to_string(), json!(0));
        assert_eq!(recompute_derived_fields(&PRODUCT, sold_out)["in_stock"], json!(false));
    }

    #[test]
    fn test_in_stock_cannot_be_written() {
        assert!(validate_update(&PRODUCT, &json!({"in_stock": true})).is_err());
    }

    #[test]
    fn test_price_must_be_positive_and_quantity_non_negative() {
        let err = validate_create(
            &PRODUCT,
            &json!({"name": "Lamp", "category": "Lighting", "price": 0, "quantity": -2}),
        )
        .unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"price"));
        assert!(fields.contains(&"quantity"));
    }

    #[test]
    fn test_sortable_fields() {
        let sortable: Vec<_> = PRODUCT.sortable_fields().collect();
        assert_eq!(sortable, vec!["name", "category", "price", "quantity", "created_at"]);
    }
}
