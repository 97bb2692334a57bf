// Mirrors the DDL in `db::RESET_STATEMENTS`. Tables live in the importer
// schema, resolved through `search_path`.

diesel::table! {
    foods (fdc_id) {
        fdc_id -> Int4,
        description -> Text,
        data_type -> Nullable<Text>,
        food_class -> Nullable<Text>,
        publication_date -> Nullable<Text>,
    }
}

diesel::table! {
    input_foods (id) {
        id -> Int4,
        fdc_id -> Nullable<Int4>,
        src_name -> Nullable<Text>,
        src_id -> Nullable<Int4>,
        src_table -> Nullable<Text>,
        src_date -> Nullable<Text>,
    }
}

diesel::table! {
    food_portions (id) {
        id -> Int4,
        fdc_id -> Nullable<Int4>,
        seq_num -> Nullable<Int4>,
        amount -> Nullable<Float8>,
        unit_name -> Nullable<Text>,
        grams -> Nullable<Float8>,
        data_points -> Nullable<Int4>,
        derivation_id -> Nullable<Text>,
        portion_name -> Nullable<Text>,
        portion_desc -> Nullable<Text>,
    }
}

diesel::table! {
    food_attributes (id) {
        id -> Int4,
        fdc_id -> Nullable<Int4>,
        seq_num -> Nullable<Int4>,
        name -> Nullable<Text>,
        value -> Nullable<Text>,
        unit -> Nullable<Text>,
        data_type -> Nullable<Text>,
        derivation_id -> Nullable<Text>,
    }
}

diesel::table! {
    food_nutrients (id) {
        id -> Int4,
        fdc_id -> Nullable<Int4>,
        nutrient_id -> Int4,
        nutrient_name -> Nullable<Text>,
        nutrient_number -> Nullable<Text>,
        unit_name -> Nullable<Text>,
        amount -> Nullable<Float8>,
        data_points -> Nullable<Int4>,
        min_val -> Nullable<Float8>,
        max_val -> Nullable<Float8>,
        median -> Nullable<Float8>,
        derivation_code -> Nullable<Text>,
        derivation_desc -> Nullable<Text>,
    }
}

diesel::joinable!(input_foods -> foods (fdc_id));
diesel::joinable!(food_portions -> foods (fdc_id));
diesel::joinable!(food_attributes -> foods (fdc_id));
diesel::joinable!(food_nutrients -> foods (fdc_id));

diesel::allow_tables_to_appear_in_same_query!(
    foods,
    input_foods,
    food_portions,
    food_attributes,
    food_nutrients,
);
