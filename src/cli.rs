//! Command-line interface parsing for the label harvester
//!
//! With no arguments the harvester runs over all five regions using the
//! `Caches/` and `Labelkeys/` directories in the working directory.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::data::Region;
use crate::session::{SessionConfig, SessionError};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified region label is not recognized
    #[error("Invalid region: '{0}'. Valid regions: C-Africa, C-Asia, C-Europe, C-America, C-Oceania")]
    InvalidRegion(String),

    /// The session file could not be loaded
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Label harvester - cache region and country site listings locally
#[derive(Parser, Debug)]
#[command(name = "labelharvest")]
#[command(about = "Harvest region label keys and country site listings into a local cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding cached JSON responses
    #[arg(long, value_name = "DIR", default_value = "Caches")]
    pub cache_dir: PathBuf,

    /// Directory holding per-region label key files
    #[arg(long, value_name = "DIR", default_value = "Labelkeys")]
    pub labels_dir: PathBuf,

    /// File the run log is appended to
    #[arg(long, value_name = "FILE", default_value = "app.log")]
    pub log_file: PathBuf,

    /// JSON file with the API base URL, headers and cookies to replay
    #[arg(long, value_name = "FILE")]
    pub session: Option<PathBuf>,

    /// Only process this region (repeatable), e.g. --region C-Asia --region oceania
    #[arg(long = "region", value_name = "LABEL")]
    pub regions: Vec<String>,

    /// Mirror the log to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything the binary needs to start a run
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub cache_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub log_file: PathBuf,
    pub session: SessionConfig,
    pub regions: Vec<Region>,
    pub verbose: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("Caches"),
            labels_dir: PathBuf::from("Labelkeys"),
            log_file: PathBuf::from("app.log"),
            session: SessionConfig::default(),
            regions: Region::ALL.to_vec(),
            verbose: false,
        }
    }
}

/// Parses region arguments, keeping them in the fixed processing order
///
/// An empty list selects every region.
pub fn parse_region_args(args: &[String]) -> Result<Vec<Region>, CliError> {
    if args.is_empty() {
        return Ok(Region::ALL.to_vec());
    }

    let mut selected = Vec::new();
    for arg in args {
        let region = Region::from_label(arg).ok_or_else(|| CliError::InvalidRegion(arg.clone()))?;
        selected.push(region);
    }

    Ok(Region::ALL
        .into_iter()
        .filter(|region| selected.contains(region))
        .collect())
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments, loading the
    /// session file when one is given.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let session = match &cli.session {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };

        Ok(StartupConfig {
            cache_dir: cli.cache_dir.clone(),
            labels_dir: cli.labels_dir.clone(),
            log_file: cli.log_file.clone(),
            session,
            regions: parse_region_args(&cli.regions)?,
            verbose: cli.verbose,
        })
    }
}
