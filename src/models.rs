use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{food_attributes, food_nutrients, food_portions, foods, input_foods};

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = foods)]
pub struct FoodRow {
    pub fdc_id: i32,
    pub description: String,
    pub data_type: String,
    pub food_class: String,
    pub publication_date: String,
}

/// Provenance row. `id` is a serial assigned by the store.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = input_foods)]
pub struct InputFoodRow {
    pub fdc_id: i32,
    pub src_name: String,
    pub src_id: i32,
    pub src_table: String,
    pub src_date: String,
}

/// Serving-size row keyed by the source-supplied portion id.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = food_portions)]
pub struct FoodPortionRow {
    pub id: i32,
    pub fdc_id: i32,
    pub seq_num: i32,
    pub amount: f64,
    pub unit_name: String,
    pub grams: f64,
    pub data_points: i32,
    pub derivation_id: String,
    pub portion_name: String,
    pub portion_desc: String,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = food_attributes)]
pub struct FoodAttributeRow {
    pub fdc_id: i32,
    pub seq_num: i32,
    pub name: String,
    pub value: String,
    pub unit: String,
    pub data_type: String,
    pub derivation_id: String,
}

/// Nutrient measurement keyed by the source-supplied measurement id, with the
/// nutrient's name, number and unit copied in from the nested nutrient object.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = food_nutrients)]
pub struct FoodNutrientRow {
    pub id: i32,
    pub fdc_id: i32,
    pub nutrient_id: i32,
    pub nutrient_name: String,
    pub nutrient_number: String,
    pub unit_name: String,
    pub amount: f64,
    pub data_points: i32,
    pub min_val: f64,
    pub max_val: f64,
    pub median: f64,
    pub derivation_code: String,
    pub derivation_desc: String,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = foods)]
#[diesel(primary_key(fdc_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Food {
    pub fdc_id: i32,
    pub description: String,
    pub data_type: Option<String>,
    pub food_class: Option<String>,
    pub publication_date: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = food_nutrients)]
#[diesel(belongs_to(Food, foreign_key = fdc_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FoodNutrient {
    pub id: i32,
    pub fdc_id: Option<i32>,
    pub nutrient_id: i32,
    pub nutrient_name: Option<String>,
    pub nutrient_number: Option<String>,
    pub unit_name: Option<String>,
    pub amount: Option<f64>,
    pub data_points: Option<i32>,
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
    pub median: Option<f64>,
    pub derivation_code: Option<String>,
    pub derivation_desc: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FoodWithNutrients {
    pub food: Food,
    pub nutrients: Vec<FoodNutrient>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchFoodResponse {
    pub data: Vec<FoodWithNutrients>,
    pub pagination: Pagination,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64, total: i64) -> Self {
        let total_pages = if total > 0 { (total + limit - 1) / limit } else { 0 };

        Self {
            page: offset / limit + 1,
            limit,
            total,
            total_pages,
        }
    }
}
