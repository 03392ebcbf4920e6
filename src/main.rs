//! Catalog-Ripple main entry point
//!
//! This is the command-line interface for the Catalog-Ripple crawler.

use anyhow::Context;
use catalog_ripple::config::{load_config_with_hash, Config};
use catalog_ripple::crawler::{crawl, Credentials};
use catalog_ripple::output::{
    deliver, load_statistics, print_crawl_summary, print_statistics, read_snapshot,
    JsonSnapshotSink, ResultSink,
};
use catalog_ripple::storage::{open_store, SqliteSink};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Ripple: A polite music catalog crawler
///
/// Catalog-Ripple discovers popular artists by keyword search, walks their
/// albums and tracks under a global request cap, and writes the results as
/// JSON snapshots and SQLite tables.
#[derive(Parser, Debug)]
#[command(name = "catalog-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A polite music catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without contacting the API
    #[arg(long, conflicts_with_all = ["stats", "load_only"])]
    dry_run: bool,

    /// Load existing JSON snapshots into the database without crawling
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    load_only: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "load_only"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.load_only {
        handle_load_only(&config, &config_hash)?;
    } else {
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_ripple=info,warn"),
            1 => EnvFilter::new("catalog_ripple=debug,info"),
            2 => EnvFilter::new("catalog_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what a crawl would do
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Ripple Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Token URL: {}", config.api.token_url);
    println!("  Search terms: {}", config.api.search_terms.join(", "));

    let crawler = &config.crawler;
    println!("\nCrawler Configuration:");
    println!("  Max concurrent requests: {}", crawler.max_concurrent_requests);
    println!("  Max retries: {}", crawler.max_retries);
    println!(
        "  Backoff: {}ms * {}^(n-1) + {}..{}ms jitter",
        crawler.backoff_scale_ms, crawler.backoff_base, crawler.jitter_min_ms, crawler.jitter_max_ms
    );
    println!("  Popularity threshold: > {}", crawler.popularity_threshold);
    println!("  Albums per artist: {}", crawler.album_page_size);
    match crawler.max_concurrent_artists {
        Some(limit) => println!("  Max concurrent artists: {}", limit),
        None => println!("  Max concurrent artists: unbounded"),
    }

    println!("\nOutput:");
    if config.output.write_json {
        println!("  JSON directory: {}", config.output.json_dir);
    }
    if config.output.load_database {
        println!(
            "  Database: {} (schema {})",
            config.output.database_path, config.output.schema
        );
    }

    println!("\n✓ Configuration is valid");
    match Credentials::from_env() {
        Ok(_) => println!("✓ Credentials found in environment"),
        Err(e) => println!("✗ {}", e),
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(&config.output).context("Failed to open database")?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --load-only mode: loads the JSON snapshots into the database
fn handle_load_only(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let dir = Path::new(&config.output.json_dir);
    tracing::info!("Reading snapshots from {}", dir.display());
    let output = read_snapshot(dir)?;

    let store = open_store(&config.output).context("Failed to open database")?;
    let mut sinks: Vec<Box<dyn ResultSink>> = vec![Box::new(SqliteSink::new(store, config_hash))];
    deliver(&output, &mut sinks)?;

    println!(
        "✓ Loaded {} artists, {} albums, {} tracks into {}",
        output.artists.len(),
        output.albums.len(),
        output.tracks.len(),
        config.output.database_path
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let credentials = Credentials::from_env()?;

    let mut sinks: Vec<Box<dyn ResultSink>> = Vec::new();
    if config.output.write_json {
        sinks.push(Box::new(JsonSnapshotSink::new(&config.output.json_dir)));
    }
    if config.output.load_database {
        let store = open_store(&config.output).context("Failed to open database")?;
        sinks.push(Box::new(SqliteSink::new(store, config_hash)));
    }
    if sinks.is_empty() {
        tracing::warn!("No output enabled; results will only be summarized");
    }

    tracing::info!(
        "Starting crawl with {} search terms",
        config.api.search_terms.len()
    );

    let report = match crawl(config, &credentials).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            report
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    deliver(&report.output, &mut sinks)?;
    print_crawl_summary(&report.summary);

    Ok(())
}
