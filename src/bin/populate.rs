use anyhow::Context;
use chrono::Utc;

use streamdash::services::dataset_generator::{DatasetGenerator, GeneratorSettings};
use streamdash::services::dataset_store::PgDatasetStore;
use streamdash::utils::{config::GeneratorConfig, db::establish_connection};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("Population failed: {:#}", e);
        eprintln!("❌ Population failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GeneratorConfig::from_env().context("Failed to load configuration")?;

    println!("=================================================");
    println!("🎲 streamdash dataset generator");
    println!("=================================================");
    println!("   - Database: {}", config.database.display_target());
    println!("   - Catalog: {}", config.catalog_path.display());
    println!(
        "   - Users: {}, Playlists: {}, Events: {}",
        config.users, config.playlists, config.events
    );
    println!("   - Batch size: {}, Seed: {}", config.batch_size, config.seed);

    // One connection: batches run and commit strictly in sequence
    let db = establish_connection(&config.database.url(), 1)
        .await
        .context("Failed to connect to database")?;
    log::info!("Database connection established");

    let store = PgDatasetStore::new(db);
    let settings = GeneratorSettings::from_config(&config, Utc::now().naive_utc());

    let summary = DatasetGenerator::new(&store, settings)
        .populate(&config.catalog_path)
        .await?;

    println!("✅ Data population complete");
    println!("{}", summary.tables);

    Ok(())
}
