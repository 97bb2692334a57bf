//! USDA Foundation Foods importer.
//!
//! A run moves linearly through [`ImportPhase`]: connect, drop and recreate
//! the nutrition tables, parse the source document, then load every record
//! inside a single transaction. The table reset is committed on its own before
//! the load begins, so readers can see empty tables until the load commits.
//!
//! Conflict handling differs per table. `foods`, `food_portions` and
//! `food_nutrients` are keyed by source ids and skip rows that already exist.
//! `input_foods` and `food_attributes` are append-only; their insert errors
//! are ignored without logging.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::ImportError;
use crate::target::ImportTarget;
use crate::usda::{FoundationFoodsDocument, read_document};

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub database_url: String,
    pub json_path: PathBuf,
    pub schema: String,
    /// Bound on the initial connectivity check only.
    pub connect_timeout: Duration,
    pub progress_interval: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Disconnected,
    Connected,
    SchemaReset,
    Loading,
    Committed,
    Failed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Disconnected => "disconnected",
            ImportPhase::Connected => "connected",
            ImportPhase::SchemaReset => "schema-reset",
            ImportPhase::Loading => "loading",
            ImportPhase::Committed => "committed",
            ImportPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Totals of one load. Input foods are not tracked, and attributes are
/// counted per attempt since their insert errors are ignored.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub foods: usize,
    pub portions: usize,
    pub attributes: usize,
    pub nutrients: usize,
    pub skipped_foods: usize,
    pub failed_portions: usize,
    pub failed_nutrients: usize,
    pub elapsed: Duration,
}

pub struct Importer {
    config: ImporterConfig,
}

impl Importer {
    pub fn new(config: ImporterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Connects to Postgres and runs the full import. The connection is
    /// returned to its pool and closed when this returns.
    pub fn run(self) -> Result<ImportReport, ImportError> {
        let started = Instant::now();
        log::info!("Connecting to database");

        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(self.config.connect_timeout)
            .build(ConnectionManager::<PgConnection>::new(&self.config.database_url))
            .map_err(|e| ImportError::Connect(e.into()));

        let conn = pool.and_then(|p| p.get().map_err(|e| ImportError::Connect(e.into())));
        let mut conn = match conn {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Import failed while {}: {}", e.phase(), e);
                log::info!("Import completed in {:?}", started.elapsed());
                return Err(e);
            }
        };

        self.run_with(&mut *conn)
    }

    /// Runs ping, table reset, parse and load against `target`.
    pub fn run_with<T: ImportTarget>(&self, target: &mut T) -> Result<ImportReport, ImportError> {
        let started = Instant::now();
        let mut phase = ImportPhase::Disconnected;
        log::info!("Starting USDA food import at {}", chrono::Local::now().to_rfc3339());

        let result = self.run_phases(target, &mut phase);
        match &result {
            Ok(_) => advance(&mut phase, ImportPhase::Committed),
            Err(e) => {
                log::error!("Import failed while {}: {}", e.phase(), e);
                advance(&mut phase, ImportPhase::Failed);
            }
        }

        log::info!("Import completed in {:?}", started.elapsed());
        result.map(|mut report| {
            report.elapsed = started.elapsed();
            report
        })
    }

    fn run_phases<T: ImportTarget>(
        &self,
        target: &mut T,
        phase: &mut ImportPhase,
    ) -> Result<ImportReport, ImportError> {
        target
            .ping()
            .map_err(|e| ImportError::Connect(Box::new(e)))?;
        log::info!("Database connection established");
        advance(phase, ImportPhase::Connected);

        self.reset(target)?;
        advance(phase, ImportPhase::SchemaReset);

        let document = self.read()?;
        advance(phase, ImportPhase::Loading);

        self.load_document(target, &document)
    }

    /// Drops and recreates the nutrition tables.
    pub fn reset<T: ImportTarget>(&self, target: &mut T) -> Result<(), ImportError> {
        log::info!("Creating tables in {} schema...", self.config.schema);

        target
            .reset_tables(&self.config.schema)
            .map_err(|e| ImportError::Schema(Box::new(e)))?;

        log::info!("Tables created successfully");
        Ok(())
    }

    /// Parses the source document and loads it without resetting the tables.
    pub fn load<T: ImportTarget>(&self, target: &mut T) -> Result<ImportReport, ImportError> {
        let document = self.read()?;
        self.load_document(target, &document)
    }

    fn read(&self) -> Result<FoundationFoodsDocument, ImportError> {
        log::info!("Reading JSON file: {}", self.config.json_path.display());

        let document = read_document(&self.config.json_path)?;
        log::info!("Found {} foods to import", document.foundation_foods.len());
        Ok(document)
    }

    pub fn load_document<T: ImportTarget>(
        &self,
        target: &mut T,
        document: &FoundationFoodsDocument,
    ) -> Result<ImportReport, ImportError> {
        let started = Instant::now();
        let progress_every = self.config.progress_interval.max(1);

        let mut report = target
            .load_in_transaction(&self.config.schema, |tx| {
                Ok(load_records(tx, document, progress_every))
            })
            .map_err(|e| ImportError::Load(Box::new(e)))?;
        report.elapsed = started.elapsed();

        log::info!("Import completed successfully:");
        log::info!("  Foods: {}", report.foods);
        log::info!("  Portions: {}", report.portions);
        log::info!("  Attributes: {}", report.attributes);
        log::info!("  Nutrients: {}", report.nutrients);
        if report.skipped_foods + report.failed_portions + report.failed_nutrients > 0 {
            log::warn!(
                "  Skipped: {} foods, {} portions, {} nutrients",
                report.skipped_foods,
                report.failed_portions,
                report.failed_nutrients
            );
        }

        Ok(report)
    }
}

fn advance(phase: &mut ImportPhase, next: ImportPhase) {
    log::debug!("import phase: {} -> {}", phase, next);
    *phase = next;
}

/// Inserts every record in source order. Never fails: row errors are
/// absorbed here and reflected in the report.
fn load_records<T: ImportTarget>(
    tx: &mut T,
    document: &FoundationFoodsDocument,
    progress_every: usize,
) -> ImportReport {
    let total = document.foundation_foods.len();
    let mut report = ImportReport::default();

    for (idx, food) in document.foundation_foods.iter().enumerate() {
        if let Err(e) = tx.insert_food(&food.food_row()) {
            log::error!("Error inserting food {}: {}", food.fdc_id, e);
            report.skipped_foods += 1;
            continue;
        }

        for input in &food.input_foods {
            let _ = tx.insert_input_food(&input.row(food.fdc_id));
        }

        for portion in &food.food_portions {
            match tx.insert_portion(&portion.row(food.fdc_id)) {
                Ok(_) => report.portions += 1,
                Err(e) => {
                    log::warn!(
                        "Error inserting portion {} for food {}: {}",
                        portion.id,
                        food.fdc_id,
                        e
                    );
                    report.failed_portions += 1;
                }
            }
        }

        for attribute in &food.food_attributes {
            let _ = tx.insert_attribute(&attribute.row(food.fdc_id));
            report.attributes += 1;
        }

        for nutrient in &food.food_nutrients {
            match tx.insert_nutrient(&nutrient.row(food.fdc_id)) {
                Ok(_) => report.nutrients += 1,
                Err(e) => {
                    log::warn!(
                        "Error inserting nutrient {} for food {}: {}",
                        nutrient.id,
                        food.fdc_id,
                        e
                    );
                    report.failed_nutrients += 1;
                }
            }
        }

        report.foods += 1;
        if idx % progress_every == 0 {
            log::info!("Processed {}/{} foods", idx + 1, total);
        }
    }

    report
}

static STARTUP_IMPORT: AtomicBool = AtomicBool::new(false);

/// Starts the configured import on the blocking pool, at most once per
/// process. Returns `None` when disabled or already started.
pub fn spawn_startup_import(config: &Config) -> Option<JoinHandle<()>> {
    if !config.importer.enabled {
        log::info!("USDA food importer is disabled in configuration");
        return None;
    }

    if !config.importer.import_on_startup {
        log::info!("USDA food import on startup is disabled in configuration");
        return None;
    }

    if STARTUP_IMPORT.swap(true, Ordering::SeqCst) {
        log::warn!("USDA food import already started, not starting another");
        return None;
    }

    log::info!("Starting USDA food import process...");
    let importer = Importer::new(config.importer_config());

    Some(tokio::task::spawn_blocking(move || match importer.run() {
        Ok(_) => log::info!("USDA food import completed successfully"),
        Err(e) => {
            log::error!("USDA food import failed: {}", e);
            log::warn!("Server will continue running despite import failure");
        }
    }))
}
