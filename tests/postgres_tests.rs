//! Runs against a real database when `TEST_DATABASE_URL` is set; otherwise
//! every test returns early.

use std::io::Write;
use std::time::Duration;

use diesel::prelude::*;
use nutrition_api::db::quote_ident;
use nutrition_api::importer::{Importer, ImporterConfig};
use nutrition_api::repository;
use nutrition_api::target::{ImportTarget, RowCounts};
use tempfile::NamedTempFile;

const SOURCE: &str = r#"{"FoundationFoods":[
    {"fdcId":1,"description":"Apple","dataType":"Foundation","foodClass":"FinalFood","publicationDate":"2020-01-01",
     "inputFoods":[{"srcName":"Apple, raw","srcId":1,"srcTable":"sr","srcDate":"2019"}],
     "foodPortions":[{"id":70,"seqNum":1,"amount":1,"unitName":"medium","gramWeight":182}],
     "foodAttributes":[{"seqNum":1,"name":"Variety","value":"Gala"}],
     "foodNutrients":[{"id":100,"nutrient":{"id":1008,"number":"208","name":"Energy","unitName":"kcal"},"amount":52}]},
    {"fdcId":2,"description":"Pineapple","foodPortions":[{"id":70}],
     "foodNutrients":[{"id":101,"nutrient":{"id":1008,"number":"208","name":"Energy","unitName":"kcal"},"amount":50}]}
]}"#;

struct Fixture {
    url: String,
    schema: String,
    source: NamedTempFile,
}

fn fixture(schema: &str) -> Option<Fixture> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let mut conn = PgConnection::establish(&url).unwrap();
    diesel::sql_query(format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
        .execute(&mut conn)
        .unwrap();

    let mut source = NamedTempFile::new().unwrap();
    source.write_all(SOURCE.as_bytes()).unwrap();

    Some(Fixture {
        url,
        schema: schema.to_string(),
        source,
    })
}

impl Fixture {
    fn importer(&self) -> Importer {
        Importer::new(ImporterConfig {
            database_url: self.url.clone(),
            json_path: self.source.path().to_path_buf(),
            schema: self.schema.clone(),
            connect_timeout: Duration::from_secs(5),
            progress_interval: 100,
        })
    }

    fn connect(&self) -> PgConnection {
        PgConnection::establish(&self.url).unwrap()
    }
}

#[test]
fn test_import_and_lookup() {
    let Some(fx) = fixture("import_test_lookup") else {
        return;
    };

    let report = fx.importer().run().unwrap();
    assert_eq!(report.foods, 2);

    let mut conn = fx.connect();
    assert_eq!(
        conn.row_counts(&fx.schema).unwrap(),
        RowCounts {
            foods: 2,
            input_foods: 1,
            food_portions: 1,
            food_attributes: 1,
            food_nutrients: 2,
        }
    );

    let apple = repository::get_food(&mut conn, 1).unwrap().unwrap();
    assert_eq!(apple.food.description, "Apple");
    assert_eq!(apple.nutrients.len(), 1);
    assert_eq!(apple.nutrients[0].derivation_code.as_deref(), Some(""));

    let (page, total) = repository::search_foods(&mut conn, "apple", 20, 0).unwrap();
    assert_eq!(total, 2);
    assert_eq!(page[0].food.description, "Apple");
    assert_eq!(page[1].food.description, "Pineapple");

    assert!(repository::get_food(&mut conn, 999).unwrap().is_none());
}

#[test]
fn test_reload_without_reset_against_postgres() {
    let Some(fx) = fixture("import_test_reload") else {
        return;
    };

    let importer = fx.importer();
    let mut conn = fx.connect();

    importer.run_with(&mut conn).unwrap();
    let first = conn.row_counts(&fx.schema).unwrap();

    importer.load(&mut conn).unwrap();
    let second = conn.row_counts(&fx.schema).unwrap();

    assert_eq!(second.foods, first.foods);
    assert_eq!(second.food_portions, first.food_portions);
    assert_eq!(second.food_nutrients, first.food_nutrients);
    assert_eq!(second.input_foods, first.input_foods * 2);
    assert_eq!(second.food_attributes, first.food_attributes * 2);

    importer.run_with(&mut conn).unwrap();
    assert_eq!(conn.row_counts(&fx.schema).unwrap(), first);
}

#[test]
fn test_failed_row_keeps_transaction_usable() {
    let Some(fx) = fixture("import_test_savepoint") else {
        return;
    };

    let importer = fx.importer();
    let mut conn = fx.connect();
    importer.reset(&mut conn).unwrap();

    let orphan = nutrition_api::models::FoodPortionRow {
        id: 1,
        fdc_id: 424242,
        seq_num: 0,
        amount: 0.0,
        unit_name: String::new(),
        grams: 0.0,
        data_points: 0,
        derivation_id: String::new(),
        portion_name: String::new(),
        portion_desc: String::new(),
    };

    let apple = nutrition_api::models::FoodRow {
        fdc_id: 1,
        description: "Apple".to_string(),
        data_type: String::new(),
        food_class: String::new(),
        publication_date: String::new(),
    };

    let schema = fx.schema.clone();
    conn.load_in_transaction(&schema, |tx| {
        assert!(tx.insert_portion(&orphan).is_err());
        assert!(tx.insert_food(&apple).unwrap());
        assert!(!tx.insert_food(&apple).unwrap());
        Ok(())
    })
    .unwrap();

    assert_eq!(conn.row_counts(&fx.schema).unwrap().foods, 1);
    assert_eq!(conn.row_counts(&fx.schema).unwrap().food_portions, 0);
}
