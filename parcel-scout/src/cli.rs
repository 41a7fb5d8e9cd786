//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use parcel_common::config::ConfigResolver;
use parcel_common::{FilterCriteria, Result};
use std::path::PathBuf;

/// Command-line arguments for parcel-scout
#[derive(Parser, Debug)]
#[command(name = "parcel-scout")]
#[command(about = "Stream, rank and enrich county parcel catalogs")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML); overrides PARCEL_SCOUT_CONFIG
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Parcel backend base URL; overrides PARCEL_SCOUT_BACKEND_URL
    #[arg(long, global = true, value_name = "URL")]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream a county catalog and show, rank, enrich or export it
    Fetch(FetchArgs),

    /// Ask the backend whether a county catalog exists
    Status {
        /// County name as the backend knows it
        county: String,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Destination (defaults to --config or the per-user config path)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// County name as the backend knows it
    pub county: String,

    /// Minimum zoning fit score
    #[arg(long, value_name = "SCORE")]
    pub min_zoning: Option<String>,

    /// Maximum zoning fit score
    #[arg(long, value_name = "SCORE")]
    pub max_zoning: Option<String>,

    /// Minimum acreage
    #[arg(long, value_name = "ACRES")]
    pub min_acreage: Option<String>,

    /// Maximum acreage
    #[arg(long, value_name = "ACRES")]
    pub max_acreage: Option<String>,

    /// Keep only parcels scoring at least 4.5 on zoning fit and investment
    #[arg(long)]
    pub high_potential: bool,

    /// Show the Top-N ranking (N defaults to ranking.top_n)
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "0")]
    pub top: Option<usize>,

    /// Enrich the Top-N candidates with highway distance before ranking
    #[arg(long)]
    pub enrich: bool,

    /// Write the displayed parcels to a CSV file (directory gets export.file_name)
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Print map markers for the displayed parcels as JSON
    #[arg(long)]
    pub markers: bool,

    /// Rows to print (0 prints none)
    #[arg(long, default_value = "25", value_name = "ROWS")]
    pub limit: usize,
}

impl Cli {
    /// Config resolver seeded with this invocation's overrides
    pub fn config_resolver(&self) -> ConfigResolver {
        ConfigResolver::new()
            .with_config_path(self.config.clone())
            .with_backend_url(self.backend_url.clone())
    }
}

impl FetchArgs {
    /// Filter bounds; an omitted or empty flag leaves that side unbounded
    pub fn criteria(&self) -> Result<FilterCriteria> {
        FilterCriteria::from_inputs(
            self.min_zoning.as_deref().unwrap_or_default(),
            self.max_zoning.as_deref().unwrap_or_default(),
            self.min_acreage.as_deref().unwrap_or_default(),
            self.max_acreage.as_deref().unwrap_or_default(),
        )
    }

    /// Ranking size when ranking was requested; `--enrich` implies it
    pub fn ranking_size(&self, configured: usize) -> Option<usize> {
        match self.top {
            Some(n) if n > 0 => Some(n),
            Some(_) => Some(configured),
            None if self.enrich => Some(configured),
            None => None,
        }
    }
}
