// Diesel table definitions, kept in sync with the DDL in
// repository::diesel_catalog::SCHEMA_SQL.

diesel::table! {
    categories (id) {
        id -> BigInt,
        name -> Text,
        slug -> Text,
        url -> Text,
        parent_id -> Nullable<BigInt>,
        image -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    products (id) {
        id -> BigInt,
        external_id -> Text,
        name -> Text,
        price_cents -> Nullable<BigInt>,
        image -> Nullable<Text>,
        link -> Nullable<Text>,
        specs -> Nullable<Text>,
        category_id -> Nullable<BigInt>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::joinable!(products -> categories (category_id));

diesel::allow_tables_to_appear_in_same_query!(categories, products);
