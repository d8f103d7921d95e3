//! docsite command-line entry point.
//!
//! Results and reports are printed to stdout as JSON; logs go to stderr so
//! the two never interleave.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docsite_client::{
    BuildStatus, DownloadStatus, FetchClient, FetchConfig, IndexBuilder, IndexDownloader, SearchOptions,
    SearchSettings, SiteSearch,
};
use docsite_core::{AppConfig, CacheStore, SitemapMode};

/// Site-scoped documentation search and offline index tooling
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search a documentation site: `site:<url> terms...`
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = 5)]
        num_results: usize,
        /// Answer from loaded state only, without network access
        #[arg(long)]
        offline: bool,
        /// Cache snapshot or site index artifact to load first (defaults to `preindex_path`)
        #[arg(long)]
        state: Option<PathBuf>,
        /// Write the cache to this path afterwards
        #[arg(long)]
        save_state: Option<PathBuf>,
    },
    /// Build a site index artifact from a `{"library": "url"}` JSON file
    Build {
        #[arg(long)]
        sites: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Gzip-compress the output
        #[arg(long)]
        gzip: bool,
        /// missing, all, or skip
        #[arg(long)]
        sitemap_mode: Option<SitemapMode>,
    },
    /// Download a site index artifact from the first working URL
    Download {
        /// Destination file (defaults to the configured download path)
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Candidate URLs (default to the configured list)
        urls: Vec<String>,
    },
    /// Download the configured artifact unless a fresh copy exists
    Ensure,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let client = FetchClient::new(FetchConfig::from(&config))?;

    match args.command {
        Commands::Search { query, num_results, offline, state, save_state } => {
            let allow_network = config.allow_network && !offline;
            if allow_network {
                let report = IndexDownloader::new(client.clone()).ensure(&config.download).await;
                tracing::debug!(
                    status = ?report.status,
                    path = %report.path.display(),
                    "startup site index check"
                );
            }

            let cache = Arc::new(CacheStore::new());
            load_state(&cache, &state_paths(state, &config)).await;

            let search = SiteSearch::new(cache.clone(), Arc::new(client), SearchSettings::from(&config));
            let options = SearchOptions { num_results, allow_network };
            let response = search.search(&query, &options).await;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if let Some(path) = save_state {
                cache.save(&path).await?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Build { sites, output, gzip, sitemap_mode } => {
            let body = std::fs::read(&sites).with_context(|| format!("reading {}", sites.display()))?;
            let catalog: BTreeMap<String, String> =
                serde_json::from_slice(&body).with_context(|| format!("parsing {}", sites.display()))?;

            let mut builder = IndexBuilder::new(Arc::new(client), &config);
            if let Some(mode) = sitemap_mode {
                builder = builder.with_sitemap_mode(mode);
            }
            if gzip {
                builder = builder.with_gzip_output(true);
            }
            let report = builder.build(&catalog, &output).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            Ok(if report.status == BuildStatus::Ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Download { dest, urls } => {
            let dest = dest.unwrap_or_else(|| config.download.path.clone());
            let urls = if urls.is_empty() { config.download.urls.clone() } else { urls };

            let report = IndexDownloader::new(client).download(&urls, &dest).await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            Ok(if report.status == DownloadStatus::Error { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Commands::Ensure => {
            let report = IndexDownloader::new(client).ensure(&config.download).await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            Ok(if report.status == DownloadStatus::Error { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
    }
}

/// State files to try, in order: an explicit `--state` (or `preindex_path`),
/// then the downloaded site index.
fn state_paths(state: Option<PathBuf>, config: &AppConfig) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = state.or_else(|| config.preindex_path.clone()).into_iter().collect();
    if !paths.contains(&config.download.path) {
        paths.push(config.download.path.clone());
    }
    paths
}

/// Load the first usable state file into `cache`.
async fn load_state(cache: &CacheStore, paths: &[PathBuf]) -> Option<PathBuf> {
    for path in paths {
        if cache.load(path).await {
            tracing::debug!("loaded state from {}", path.display());
            return Some(path.clone());
        }
    }
    let tried: Vec<String> = paths.iter().map(|path| path.display().to_string()).collect();
    tracing::info!("no usable state in {}", tried.join(", "));
    None
}
