//! Label harvester - cache region and country site listings locally
//!
//! Walks the region labels, stores every raw API response under the cache
//! directory and keeps one label key file per region.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use labelharvest::cache::CacheStore;
use labelharvest::cli::{Cli, StartupConfig};
use labelharvest::data::CiClient;
use labelharvest::harvest::Harvester;
use labelharvest::labels::LabelFileStore;
use labelharvest::observe::{setup_logging, LogObserver, SharedObserver};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = StartupConfig::from_cli(&cli)?;

    setup_logging(&config.log_file, config.verbose)?;
    let observer: SharedObserver = Arc::new(LogObserver);

    let client = CiClient::new(&config.session, observer.clone())?;
    let harvester = Harvester::new(
        CacheStore::new(&config.cache_dir, observer.clone()),
        LabelFileStore::new(&config.labels_dir, observer.clone()),
        client,
        observer.clone(),
    );

    let report = harvester.run(&config.regions).await;

    println!("Time taken: {:.2} seconds", report.elapsed.as_secs_f64());
    if report.failed_key_count() > 0 {
        eprintln!("{} country keys could not be fetched", report.failed_key_count());
    }
    observer.info("Done");
    println!("Done");

    let failed = report.failed_regions();
    if failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        let labels: Vec<&str> = failed.iter().map(|region| region.label()).collect();
        eprintln!("Failed regions: {}", labels.join(", "));
        Ok(ExitCode::FAILURE)
    }
}
