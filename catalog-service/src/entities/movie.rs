use serde_json::Value;

use crate::schema::{FieldSpec, IntegerMax, Schema};

/// First year of commercial film
const FIRST_FILM_YEAR: i64 = 1888;

fn not_favorite() -> Value {
    Value::Bool(false)
}

pub static MOVIE: Schema = Schema {
    entity: "Movie",
    collection: "movies",
    id_prefix: "movie",
    display_field: "title",
    fields: &[
        FieldSpec::id(),
        FieldSpec::text("title", 1, 200)
            .title_case()
            .substring_filter("title")
            .sortable(),
        FieldSpec::text("director", 1, 50)
            .title_case()
            .substring_filter("director")
            .sortable(),
        FieldSpec::text("genre", 1, 50)
            .title_case()
            .substring_filter("genre")
            .sortable(),
        FieldSpec::integer("release_year", FIRST_FILM_YEAR, Some(IntegerMax::CurrentYear))
            .range_filter("min_year", "max_year")
            .sortable(),
        FieldSpec::bounded_float("rating", 0.0, 10.0, Some(1))
            .range_filter("min_rating", "max_rating")
            .sortable(),
        FieldSpec::boolean("is_favorite").with_default(not_favorite),
        FieldSpec::created_at(),
    ],
};
