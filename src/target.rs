//! Storage seam between the importer and the database.
//!
//! [`ImportTarget`] is implemented for `PgConnection` in [`crate::db`] and by
//! [`MemoryTarget`], which keeps the five tables in memory with the same key,
//! foreign-key and rollback rules. The CLI uses it for dry runs.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::models::{FoodAttributeRow, FoodNutrientRow, FoodPortionRow, FoodRow, InputFoodRow};

/// Row counts of the five nutrition tables.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub foods: i64,
    pub input_foods: i64,
    pub food_portions: i64,
    pub food_attributes: i64,
    pub food_nutrients: i64,
}

pub trait ImportTarget {
    type Error: std::error::Error + Send + Sync + 'static;

    fn ping(&mut self) -> Result<(), Self::Error>;

    /// Drops and recreates the tables and indexes in `schema`. Statements are
    /// committed one by one, outside any load transaction.
    fn reset_tables(&mut self, schema: &str) -> Result<(), Self::Error>;

    /// Runs `load` inside one transaction: committed on `Ok`, rolled back on
    /// `Err`.
    fn load_in_transaction<T, F>(&mut self, schema: &str, load: F) -> Result<T, Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Self::Error>;

    // Inserts return Ok(false) when a primary-key conflict skipped the row.
    // A failed insert must leave the enclosing transaction usable.

    fn insert_food(&mut self, row: &FoodRow) -> Result<bool, Self::Error>;

    fn insert_input_food(&mut self, row: &InputFoodRow) -> Result<bool, Self::Error>;

    fn insert_portion(&mut self, row: &FoodPortionRow) -> Result<bool, Self::Error>;

    fn insert_attribute(&mut self, row: &FoodAttributeRow) -> Result<bool, Self::Error>;

    fn insert_nutrient(&mut self, row: &FoodNutrientRow) -> Result<bool, Self::Error>;

    fn row_counts(&mut self, schema: &str) -> Result<RowCounts, Self::Error>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("store unreachable")]
    Unreachable,

    #[error("tables have not been created")]
    MissingTables,

    #[error("schema setup rejected")]
    SchemaRejected,

    #[error("{table} row references missing food {fdc_id}")]
    ForeignKey { table: &'static str, fdc_id: i32 },

    #[error("insert into {table} rejected for key {key}")]
    Rejected { table: &'static str, key: i32 },
}

#[derive(Debug, Default, Clone)]
struct Tables {
    foods: BTreeMap<i32, FoodRow>,
    input_foods: Vec<InputFoodRow>,
    food_portions: BTreeMap<i32, FoodPortionRow>,
    food_attributes: Vec<FoodAttributeRow>,
    food_nutrients: BTreeMap<i32, FoodNutrientRow>,
}

/// In-memory [`ImportTarget`].
#[derive(Debug, Default)]
pub struct MemoryTarget {
    tables: Option<Tables>,
    unreachable: bool,
    reject_schema: bool,
    rejected_foods: HashSet<i32>,
    rejected_portions: HashSet<i32>,
    rejected_nutrients: HashSet<i32>,
    rejected_attribute_foods: HashSet<i32>,
    rejected_input_foods: HashSet<i32>,
    transactions: usize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn reject_schema(mut self) -> Self {
        self.reject_schema = true;
        self
    }

    pub fn reject_food(mut self, fdc_id: i32) -> Self {
        self.rejected_foods.insert(fdc_id);
        self
    }

    pub fn reject_portion(mut self, id: i32) -> Self {
        self.rejected_portions.insert(id);
        self
    }

    pub fn reject_nutrient(mut self, id: i32) -> Self {
        self.rejected_nutrients.insert(id);
        self
    }

    /// Rejects every attribute insert for the given food.
    pub fn reject_attributes_of(mut self, fdc_id: i32) -> Self {
        self.rejected_attribute_foods.insert(fdc_id);
        self
    }

    /// Rejects every input-food insert for the given food.
    pub fn reject_input_foods_of(mut self, fdc_id: i32) -> Self {
        self.rejected_input_foods.insert(fdc_id);
        self
    }

    /// Number of load transactions begun so far.
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    pub fn has_tables(&self) -> bool {
        self.tables.is_some()
    }

    pub fn foods(&self) -> Vec<&FoodRow> {
        self.tables
            .iter()
            .flat_map(|t| t.foods.values())
            .collect()
    }

    pub fn input_foods(&self) -> Vec<&InputFoodRow> {
        self.tables.iter().flat_map(|t| t.input_foods.iter()).collect()
    }

    pub fn portions(&self) -> Vec<&FoodPortionRow> {
        self.tables
            .iter()
            .flat_map(|t| t.food_portions.values())
            .collect()
    }

    pub fn attributes(&self) -> Vec<&FoodAttributeRow> {
        self.tables
            .iter()
            .flat_map(|t| t.food_attributes.iter())
            .collect()
    }

    pub fn nutrients(&self) -> Vec<&FoodNutrientRow> {
        self.tables
            .iter()
            .flat_map(|t| t.food_nutrients.values())
            .collect()
    }

    fn tables_mut(&mut self) -> Result<&mut Tables, MemoryError> {
        self.tables.as_mut().ok_or(MemoryError::MissingTables)
    }

    fn require_food(
        &mut self,
        table: &'static str,
        fdc_id: i32,
    ) -> Result<&mut Tables, MemoryError> {
        let tables = self.tables_mut()?;
        if tables.foods.contains_key(&fdc_id) {
            Ok(tables)
        } else {
            Err(MemoryError::ForeignKey { table, fdc_id })
        }
    }
}

impl ImportTarget for MemoryTarget {
    type Error = MemoryError;

    fn ping(&mut self) -> Result<(), MemoryError> {
        if self.unreachable {
            Err(MemoryError::Unreachable)
        } else {
            Ok(())
        }
    }

    fn reset_tables(&mut self, _schema: &str) -> Result<(), MemoryError> {
        if self.reject_schema {
            return Err(MemoryError::SchemaRejected);
        }
        self.tables = Some(Tables::default());
        Ok(())
    }

    fn load_in_transaction<T, F>(&mut self, _schema: &str, load: F) -> Result<T, MemoryError>
    where
        F: FnOnce(&mut Self) -> Result<T, MemoryError>,
    {
        let snapshot = self.tables.clone().ok_or(MemoryError::MissingTables)?;
        self.transactions += 1;

        let result = load(self);
        if result.is_err() {
            self.tables = Some(snapshot);
        }
        result
    }

    fn insert_food(&mut self, row: &FoodRow) -> Result<bool, MemoryError> {
        if self.rejected_foods.contains(&row.fdc_id) {
            return Err(MemoryError::Rejected {
                table: "foods",
                key: row.fdc_id,
            });
        }

        let tables = self.tables_mut()?;
        if tables.foods.contains_key(&row.fdc_id) {
            return Ok(false);
        }
        tables.foods.insert(row.fdc_id, row.clone());
        Ok(true)
    }

    fn insert_input_food(&mut self, row: &InputFoodRow) -> Result<bool, MemoryError> {
        if self.rejected_input_foods.contains(&row.fdc_id) {
            return Err(MemoryError::Rejected {
                table: "input_foods",
                key: row.fdc_id,
            });
        }

        let tables = self.require_food("input_foods", row.fdc_id)?;
        tables.input_foods.push(row.clone());
        Ok(true)
    }

    fn insert_portion(&mut self, row: &FoodPortionRow) -> Result<bool, MemoryError> {
        if self.rejected_portions.contains(&row.id) {
            return Err(MemoryError::Rejected {
                table: "food_portions",
                key: row.id,
            });
        }

        let tables = self.require_food("food_portions", row.fdc_id)?;
        if tables.food_portions.contains_key(&row.id) {
            return Ok(false);
        }
        tables.food_portions.insert(row.id, row.clone());
        Ok(true)
    }

    fn insert_attribute(&mut self, row: &FoodAttributeRow) -> Result<bool, MemoryError> {
        if self.rejected_attribute_foods.contains(&row.fdc_id) {
            return Err(MemoryError::Rejected {
                table: "food_attributes",
                key: row.fdc_id,
            });
        }

        let tables = self.require_food("food_attributes", row.fdc_id)?;
        tables.food_attributes.push(row.clone());
        Ok(true)
    }

    fn insert_nutrient(&mut self, row: &FoodNutrientRow) -> Result<bool, MemoryError> {
        if self.rejected_nutrients.contains(&row.id) {
            return Err(MemoryError::Rejected {
                table: "food_nutrients",
                key: row.id,
            });
        }

        let tables = self.require_food("food_nutrients", row.fdc_id)?;
        if tables.food_nutrients.contains_key(&row.id) {
            return Ok(false);
        }
        tables.food_nutrients.insert(row.id, row.clone());
        Ok(true)
    }

    fn row_counts(&mut self, _schema: &str) -> Result<RowCounts, MemoryError> {
        let tables = self.tables_mut()?;
        Ok(RowCounts {
            foods: tables.foods.len() as i64,
            input_foods: tables.input_foods.len() as i64,
            food_portions: tables.food_portions.len() as i64,
            food_attributes: tables.food_attributes.len() as i64,
            food_nutrients: tables.food_nutrients.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(fdc_id: i32) -> FoodRow {
        FoodRow {
            fdc_id,
            description: format!("food {fdc_id}"),
            data_type: String::new(),
            food_class: String::new(),
            publication_date: String::new(),
        }
    }

    #[test]
    fn test_insert_requires_tables() {
        let mut target = MemoryTarget::new();
        assert_eq!(target.insert_food(&food(1)), Err(MemoryError::MissingTables));
    }

    #[test]
    fn test_food_conflict_skips() {
        let mut target = MemoryTarget::new();
        target.reset_tables("nutrition").unwrap();

        assert_eq!(target.insert_food(&food(1)), Ok(true));
        assert_eq!(target.insert_food(&food(1)), Ok(false));
        assert_eq!(target.foods().len(), 1);
    }

    #[test]
    fn test_child_requires_parent() {
        let mut target = MemoryTarget::new();
        target.reset_tables("nutrition").unwrap();

        let attr = FoodAttributeRow {
            fdc_id: 9,
            seq_num: 1,
            name: "Source".to_string(),
            value: "market".to_string(),
            unit: String::new(),
            data_type: String::new(),
            derivation_id: String::new(),
        };
        assert_eq!(
            target.insert_attribute(&attr),
            Err(MemoryError::ForeignKey {
                table: "food_attributes",
                fdc_id: 9
            })
        );
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut target = MemoryTarget::new();
        target.reset_tables("nutrition").unwrap();

        let result: Result<(), MemoryError> = target.load_in_transaction("nutrition", |t| {
            t.insert_food(&food(1))?;
            Err(MemoryError::Unreachable)
        });

        assert!(result.is_err());
        assert!(target.foods().is_empty());
        assert_eq!(target.transactions(), 1);
    }

    #[test]
    fn test_reset_clears_rows() {
        let mut target = MemoryTarget::new();
        target.reset_tables("nutrition").unwrap();
        target.insert_food(&food(1)).unwrap();

        target.reset_tables("nutrition").unwrap();
        assert_eq!(target.row_counts("nutrition").unwrap(), RowCounts::default());
    }
}
