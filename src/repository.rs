//! Read-only lookups over `foods` and `food_nutrients`.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};

use crate::models::{Food, FoodNutrient, FoodWithNutrients};
use crate::schema::{food_nutrients, foods};

pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-insensitive substring search on description. Prefix matches sort
/// first, then alphabetically. Returns the page and the total match count.
pub fn search_foods(
    conn: &mut PgConnection,
    query: &str,
    limit: i64,
    offset: i64,
) -> QueryResult<(Vec<FoodWithNutrients>, i64)> {
    let escaped = escape_like(query);
    let contains = format!("%{escaped}%");
    let prefix = format!("{escaped}%");

    let total: i64 = foods::table
        .filter(foods::description.ilike(&contains))
        .count()
        .get_result(conn)?;

    let relevance = sql::<Integer>("CASE WHEN description ILIKE ")
        .bind::<Text, _>(prefix)
        .sql(" THEN 0 ELSE 1 END");

    let page: Vec<Food> = foods::table
        .filter(foods::description.ilike(&contains))
        .order_by((relevance, foods::description))
        .limit(limit)
        .offset(offset)
        .select(Food::as_select())
        .load(conn)?;

    Ok((with_nutrients(conn, page)?, total))
}

pub fn get_food(conn: &mut PgConnection, fdc_id: i32) -> QueryResult<Option<FoodWithNutrients>> {
    let food = foods::table
        .find(fdc_id)
        .select(Food::as_select())
        .first(conn)
        .optional()?;

    match food {
        Some(food) => Ok(with_nutrients(conn, vec![food])?.pop()),
        None => Ok(None),
    }
}

fn with_nutrients(conn: &mut PgConnection, page: Vec<Food>) -> QueryResult<Vec<FoodWithNutrients>> {
    let nutrients = FoodNutrient::belonging_to(&page)
        .select(FoodNutrient::as_select())
        .order_by(food_nutrients::nutrient_id)
        .load(conn)?;

    Ok(nutrients
        .grouped_by(&page)
        .into_iter()
        .zip(page)
        .map(|(nutrients, food)| FoodWithNutrients { food, nutrients })
        .collect())
}
