use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool};
use diesel::sql_types::BigInt;

use crate::models::{FoodAttributeRow, FoodNutrientRow, FoodPortionRow, FoodRow, InputFoodRow};
use crate::schema::{food_attributes, food_nutrients, food_portions, foods, input_foods};
use crate::target::{ImportTarget, RowCounts};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Drop-and-recreate statements for the nutrition tables, children first.
pub const RESET_STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS food_portions CASCADE",
    "DROP TABLE IF EXISTS food_attributes CASCADE",
    "DROP TABLE IF EXISTS food_nutrients CASCADE",
    "DROP TABLE IF EXISTS input_foods CASCADE",
    "DROP TABLE IF EXISTS foods CASCADE",
    "CREATE TABLE foods (
        fdc_id INTEGER PRIMARY KEY,
        description TEXT NOT NULL,
        data_type TEXT,
        food_class TEXT,
        publication_date TEXT
    )",
    "CREATE TABLE input_foods (
        id SERIAL PRIMARY KEY,
        fdc_id INTEGER REFERENCES foods(fdc_id) ON DELETE CASCADE,
        src_name TEXT,
        src_id INTEGER,
        src_table TEXT,
        src_date TEXT
    )",
    "CREATE TABLE food_portions (
        id INTEGER PRIMARY KEY,
        fdc_id INTEGER REFERENCES foods(fdc_id) ON DELETE CASCADE,
        seq_num INTEGER,
        amount DOUBLE PRECISION,
        unit_name TEXT,
        grams DOUBLE PRECISION,
        data_points INTEGER,
        derivation_id TEXT,
        portion_name TEXT,
        portion_desc TEXT
    )",
    "CREATE TABLE food_attributes (
        id SERIAL PRIMARY KEY,
        fdc_id INTEGER REFERENCES foods(fdc_id) ON DELETE CASCADE,
        seq_num INTEGER,
        name TEXT,
        value TEXT,
        unit TEXT,
        data_type TEXT,
        derivation_id TEXT
    )",
    "CREATE TABLE food_nutrients (
        id INTEGER PRIMARY KEY,
        fdc_id INTEGER REFERENCES foods(fdc_id) ON DELETE CASCADE,
        nutrient_id INTEGER NOT NULL,
        nutrient_name TEXT,
        nutrient_number TEXT,
        unit_name TEXT,
        amount DOUBLE PRECISION,
        data_points INTEGER,
        min_val DOUBLE PRECISION,
        max_val DOUBLE PRECISION,
        median DOUBLE PRECISION,
        derivation_code TEXT,
        derivation_desc TEXT
    )",
    "CREATE INDEX idx_food_nutrients_fdc ON food_nutrients(fdc_id)",
    "CREATE INDEX idx_food_nutrients_nutrient ON food_nutrients(nutrient_id)",
    "CREATE INDEX idx_foods_description ON foods(description)",
    "CREATE INDEX idx_food_portions_fdc ON food_portions(fdc_id)",
    "CREATE INDEX idx_food_attributes_fdc ON food_attributes(fdc_id)",
];

/// Points every pooled connection at the nutrition schema.
#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        set_search_path(conn, &self.0).map_err(r2d2::Error::QueryError)
    }
}

pub fn init_pool(
    database_url: &str,
    schema: &str,
    max_size: u32,
    connect_timeout: Duration,
) -> Result<DbPool, r2d2::PoolError> {
    log::info!("Creating database pool (max {} connections)", max_size);

    Pool::builder()
        .max_size(max_size)
        .connection_timeout(connect_timeout)
        .connection_customizer(Box::new(SearchPath(schema.to_string())))
        .build(ConnectionManager::<PgConnection>::new(database_url))
}

/// Double-quotes an identifier for interpolation into SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn set_search_path(conn: &mut PgConnection, schema: &str) -> QueryResult<()> {
    diesel::sql_query(format!("SET search_path TO {}", quote_ident(schema)))
        .execute(conn)
        .map(|_| ())
}

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

fn count_rows(conn: &mut PgConnection, table: &str) -> QueryResult<i64> {
    diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {table}"))
        .get_result::<Count>(conn)
        .map(|c| c.count)
}

impl ImportTarget for PgConnection {
    type Error = diesel::result::Error;

    fn ping(&mut self) -> QueryResult<()> {
        diesel::sql_query("SELECT 1").execute(self).map(|_| ())
    }

    fn reset_tables(&mut self, schema: &str) -> QueryResult<()> {
        set_search_path(self, schema)?;

        for statement in RESET_STATEMENTS {
            diesel::sql_query(*statement).execute(self).map_err(|e| {
                log::error!("Schema statement failed: {}", statement);
                e
            })?;
        }
        Ok(())
    }

    fn load_in_transaction<T, F>(&mut self, schema: &str, load: F) -> QueryResult<T>
    where
        F: FnOnce(&mut Self) -> QueryResult<T>,
    {
        set_search_path(self, schema)?;
        self.transaction(load)
    }

    // Each insert runs in a nested transaction, which diesel maps to a
    // savepoint, so a failed row does not abort the load transaction.

    fn insert_food(&mut self, row: &FoodRow) -> QueryResult<bool> {
        self.transaction(|conn| {
            diesel::insert_into(foods::table)
                .values(row)
                .on_conflict(foods::fdc_id)
                .do_nothing()
                .execute(conn)
                .map(|n| n > 0)
        })
    }

    fn insert_input_food(&mut self, row: &InputFoodRow) -> QueryResult<bool> {
        self.transaction(|conn| {
            diesel::insert_into(input_foods::table)
                .values(row)
                .execute(conn)
                .map(|n| n > 0)
        })
    }

    fn insert_portion(&mut self, row: &FoodPortionRow) -> QueryResult<bool> {
        self.transaction(|conn| {
            diesel::insert_into(food_portions::table)
                .values(row)
                .on_conflict(food_portions::id)
                .do_nothing()
                .execute(conn)
                .map(|n| n > 0)
        })
    }

    fn insert_attribute(&mut self, row: &FoodAttributeRow) -> QueryResult<bool> {
        self.transaction(|conn| {
            diesel::insert_into(food_attributes::table)
                .values(row)
                .execute(conn)
                .map(|n| n > 0)
        })
    }

    fn insert_nutrient(&mut self, row: &FoodNutrientRow) -> QueryResult<bool> {
        self.transaction(|conn| {
            diesel::insert_into(food_nutrients::table)
                .values(row)
                .on_conflict(food_nutrients::id)
                .do_nothing()
                .execute(conn)
                .map(|n| n > 0)
        })
    }

    fn row_counts(&mut self, schema: &str) -> QueryResult<RowCounts> {
        set_search_path(self, schema)?;

        Ok(RowCounts {
            foods: count_rows(self, "foods")?,
            input_foods: count_rows(self, "input_foods")?,
            food_portions: count_rows(self, "food_portions")?,
            food_attributes: count_rows(self, "food_attributes")?,
            food_nutrients: count_rows(self, "food_nutrients")?,
        })
    }
}
