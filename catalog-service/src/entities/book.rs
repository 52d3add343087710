use crate::schema::{FieldSpec, IntegerMax, Schema};

pub static BOOK: Schema = Schema {
    entity: "Book",
    collection: "books",
    id_prefix: "book",
    display_field: "title",
    fields: &[
        FieldSpec::id(),
        FieldSpec::text("title", 1, 200).substring_filter("title").sortable(),
        FieldSpec::text("author", 1, 100).substring_filter("author").sortable(),
        FieldSpec::text("description", 0, 2000).optional(),
        FieldSpec::integer("published_year", 1000, Some(IntegerMax::CurrentYear))
            .range_filter("min_year", "max_year")
            .sortable(),
        FieldSpec::positive_float("price", Some(2))
            .range_filter("min_price", "max_price")
            .sortable(),
        FieldSpec::text("genre", 0, 50)
            .optional()
            .title_case()
            .substring_filter("genre"),
        FieldSpec::created_at(),
    ],
};
