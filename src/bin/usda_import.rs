use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use nutrition_api::config::{Config, validate_schema};
use nutrition_api::importer::{ImportReport, Importer};
use nutrition_api::target::{ImportTarget, MemoryTarget};

/// Load the USDA Foundation Foods dataset into the nutrition schema.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Foundation Foods JSON export
    #[arg(long)]
    json_path: Option<PathBuf>,

    /// Target schema, which must already exist
    #[arg(long)]
    schema: Option<String>,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Log progress every N foods
    #[arg(long)]
    progress_interval: Option<usize>,

    /// Parse and load into memory only
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut importer_config = config.importer_config();
    if let Some(path) = args.json_path {
        importer_config.json_path = path;
    }
    if let Some(schema) = args.schema {
        if let Err(e) = validate_schema(&schema) {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
        importer_config.schema = schema;
    }
    if let Some(url) = args.database_url {
        importer_config.database_url = url;
    }
    if let Some(n) = args.progress_interval.filter(|n| *n > 0) {
        importer_config.progress_interval = n;
    }

    let importer = Importer::new(importer_config);

    if args.dry_run {
        return dry_run(&importer);
    }

    match importer.run() {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("USDA food import failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn dry_run(importer: &Importer) -> ExitCode {
    let mut target = MemoryTarget::new();

    let report = match importer.run_with(&mut target) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Dry run failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    print_report(&report);

    match target.row_counts(&importer.config().schema) {
        Ok(counts) => {
            println!("Rows that would be written:");
            println!("  foods: {}", counts.foods);
            println!("  input_foods: {}", counts.input_foods);
            println!("  food_portions: {}", counts.food_portions);
            println!("  food_attributes: {}", counts.food_attributes);
            println!("  food_nutrients: {}", counts.food_nutrients);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Dry run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &ImportReport) {
    println!("Foods: {}", report.foods);
    println!("Portions: {}", report.portions);
    println!("Attributes: {}", report.attributes);
    println!("Nutrients: {}", report.nutrients);
    println!("Elapsed: {:?}", report.elapsed);
}
