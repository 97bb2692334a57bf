//! Serde model of the USDA Foundation Foods JSON export.
//!
//! Only the fields that end up in the nutrition tables are modelled; anything
//! else in the document is ignored. Every field is optional: a missing key or
//! a JSON `null` yields the zero value for its type.

use std::fmt;
use std::path::Path;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::ImportError;
use crate::models::{FoodAttributeRow, FoodNutrientRow, FoodPortionRow, FoodRow, InputFoodRow};

/// Top level of the export. Only a JSON object is accepted.
#[derive(Debug, Default)]
pub struct FoundationFoodsDocument {
    pub foundation_foods: Vec<FoundationFood>,
}

impl<'de> Deserialize<'de> for FoundationFoodsDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = FoundationFoodsDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a FoundationFoods array")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut foods: Option<Vec<FoundationFood>> = None;

        while let Some(key) = map.next_key::<String>()? {
            if key == "FoundationFoods" {
                if foods.is_some() {
                    return Err(de::Error::duplicate_field("FoundationFoods"));
                }
                foods = Some(map.next_value::<Option<Vec<_>>>()?.unwrap_or_default());
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }

        Ok(FoundationFoodsDocument {
            foundation_foods: foods.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FoundationFood {
    #[serde(deserialize_with = "null_as_default")]
    pub fdc_id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub food_class: String,
    #[serde(deserialize_with = "null_as_default")]
    pub publication_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub food_nutrients: Vec<FoodNutrient>,
    #[serde(deserialize_with = "null_as_default")]
    pub input_foods: Vec<InputFood>,
    #[serde(deserialize_with = "null_as_default")]
    pub food_portions: Vec<FoodPortion>,
    #[serde(deserialize_with = "null_as_default")]
    pub food_attributes: Vec<FoodAttribute>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FoodNutrient {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub nutrient: Nutrient,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub data_points: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub min: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub median: f64,
    pub food_nutrient_derivation: Option<Derivation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Nutrient {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub unit_name: String,
}

/// How a nutrient amount was determined.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Derivation {
    #[serde(deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FoodPortion {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub seq_num: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit_name: String,
    #[serde(rename = "gramWeight", deserialize_with = "null_as_default")]
    pub grams: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub data_points: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub derivation_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub portion_name: String,
    #[serde(rename = "portionDescription", deserialize_with = "null_as_default")]
    pub portion_desc: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FoodAttribute {
    #[serde(deserialize_with = "null_as_default")]
    pub seq_num: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub derivation_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputFood {
    #[serde(deserialize_with = "null_as_default")]
    pub src_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub src_id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub src_table: String,
    #[serde(deserialize_with = "null_as_default")]
    pub src_date: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads and parses the whole document into memory.
pub fn read_document(path: &Path) -> Result<FoundationFoodsDocument, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_document(&bytes)
}

pub fn parse_document(bytes: &[u8]) -> Result<FoundationFoodsDocument, ImportError> {
    Ok(serde_json::from_slice(bytes)?)
}

impl FoundationFood {
    pub fn food_row(&self) -> FoodRow {
        FoodRow {
            fdc_id: self.fdc_id,
            description: self.description.clone(),
            data_type: self.data_type.clone(),
            food_class: self.food_class.clone(),
            publication_date: self.publication_date.clone(),
        }
    }
}

impl InputFood {
    pub fn row(&self, fdc_id: i32) -> InputFoodRow {
        InputFoodRow {
            fdc_id,
            src_name: self.src_name.clone(),
            src_id: self.src_id,
            src_table: self.src_table.clone(),
            src_date: self.src_date.clone(),
        }
    }
}

impl FoodPortion {
    pub fn row(&self, fdc_id: i32) -> FoodPortionRow {
        FoodPortionRow {
            id: self.id,
            fdc_id,
            seq_num: self.seq_num,
            amount: self.amount,
            unit_name: self.unit_name.clone(),
            grams: self.grams,
            data_points: self.data_points,
            derivation_id: self.derivation_id.clone(),
            portion_name: self.portion_name.clone(),
            portion_desc: self.portion_desc.clone(),
        }
    }
}

impl FoodAttribute {
    pub fn row(&self, fdc_id: i32) -> FoodAttributeRow {
        FoodAttributeRow {
            fdc_id,
            seq_num: self.seq_num,
            name: self.name.clone(),
            value: self.value.clone(),
            unit: self.unit.clone(),
            data_type: self.data_type.clone(),
            derivation_id: self.derivation_id.clone(),
        }
    }
}

impl FoodNutrient {
    /// An absent derivation is stored as two empty strings, not NULL.
    pub fn row(&self, fdc_id: i32) -> FoodNutrientRow {
        let (derivation_code, derivation_desc) = match &self.food_nutrient_derivation {
            Some(d) => (d.code.clone(), d.description.clone()),
            None => (String::new(), String::new()),
        };

        FoodNutrientRow {
            id: self.id,
            fdc_id,
            nutrient_id: self.nutrient.id,
            nutrient_name: self.nutrient.name.clone(),
            nutrient_number: self.nutrient.number.clone(),
            unit_name: self.nutrient.unit_name.clone(),
            amount: self.amount,
            data_points: self.data_points,
            min_val: self.min,
            max_val: self.max,
            median: self.median,
            derivation_code,
            derivation_desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_numeric_fields_are_zero() {
        let doc = parse_document(
            br#"{"FoundationFoods":[{"fdcId":7,"foodNutrients":[{"id":1,"nutrient":{"id":2}}]}]}"#,
        )
        .unwrap();

        let row = doc.foundation_foods[0].food_nutrients[0].row(7);
        assert_eq!(row.amount, 0.0);
        assert_eq!(row.min_val, 0.0);
        assert_eq!(row.max_val, 0.0);
        assert_eq!(row.median, 0.0);
        assert_eq!(row.data_points, 0);
    }

    #[test]
    fn test_null_fields_are_zero() {
        let doc = parse_document(
            br#"{"FoundationFoods":[{"fdcId":7,"description":null,"foodPortions":null,
                "foodNutrients":[{"id":1,"amount":null,"nutrient":{"id":2,"name":null}}]}]}"#,
        )
        .unwrap();

        let food = &doc.foundation_foods[0];
        assert_eq!(food.description, "");
        assert!(food.food_portions.is_empty());

        let row = food.food_nutrients[0].row(7);
        assert_eq!(row.amount, 0.0);
        assert_eq!(row.nutrient_name, "");
    }

    #[test]
    fn test_absent_derivation_is_empty_strings() {
        let nutrient = FoodNutrient {
            id: 100,
            ..Default::default()
        };

        let row = nutrient.row(1);
        assert_eq!(row.derivation_code, "");
        assert_eq!(row.derivation_desc, "");
    }

    #[test]
    fn test_derivation_and_nutrient_denormalized() {
        let doc = parse_document(
            br#"{"FoundationFoods":[{"fdcId":3,"foodNutrients":[{
                "id":10,"amount":1.5,"dataPoints":4,"min":1.0,"max":2.0,"median":1.4,
                "nutrient":{"id":1003,"number":"203","name":"Protein","rank":600,"unitName":"g"},
                "foodNutrientDerivation":{"code":"A","description":"Analytical",
                    "foodNutrientSource":{"id":1,"code":"1","description":"Analytical or derived"}}
            }]}]}"#,
        )
        .unwrap();

        let row = doc.foundation_foods[0].food_nutrients[0].row(3);
        assert_eq!(row.fdc_id, 3);
        assert_eq!(row.nutrient_id, 1003);
        assert_eq!(row.nutrient_number, "203");
        assert_eq!(row.nutrient_name, "Protein");
        assert_eq!(row.unit_name, "g");
        assert_eq!(row.data_points, 4);
        assert_eq!(row.derivation_code, "A");
        assert_eq!(row.derivation_desc, "Analytical");
    }

    #[test]
    fn test_portion_renamed_fields() {
        let doc = parse_document(
            br#"{"FoundationFoods":[{"fdcId":3,"foodPortions":[{
                "id":5,"seqNum":1,"amount":1.0,"unitName":"cup","gramWeight":128.5,
                "portionName":"cup","portionDescription":"1 cup, sliced"
            }]}]}"#,
        )
        .unwrap();

        let row = doc.foundation_foods[0].food_portions[0].row(3);
        assert_eq!(row.grams, 128.5);
        assert_eq!(row.portion_desc, "1 cup, sliced");
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = parse_document(br#"{"FoundationFoods":[{"fdcId":1,"#).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn test_top_level_array_is_parse_error() {
        let err = parse_document(b"[]").unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));

        let err = parse_document(br#"[[{"fdcId":5}]]"#).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));

        let err = parse_document(br#""FoundationFoods""#).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn test_null_foundation_foods_is_empty() {
        let doc = parse_document(br#"{"FoundationFoods":null,"SurveyFoods":[1,2]}"#).unwrap();
        assert!(doc.foundation_foods.is_empty());
    }

    #[test]
    fn test_missing_foundation_foods_is_empty() {
        let doc = parse_document(br#"{"SurveyFoods":[]}"#).unwrap();
        assert!(doc.foundation_foods.is_empty());
    }
}
