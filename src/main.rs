//! `product-harvester` command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use product_harvester::application::{CleanupKind, CleanupRunner, HarvestPipeline, rebuild};
use product_harvester::infrastructure::config::{AppConfig, ConfigManager, load_proxies_file};
use product_harvester::infrastructure::logging::{init_logging_with_config, log_system_info};
use product_harvester::infrastructure::renderer::build_renderer;
use product_harvester::infrastructure::{ProductStore, QuerySource, Site};

#[derive(Parser)]
#[command(
    name = "product-harvester",
    about = "Harvest product records from storefront search results into per-query and combined datasets",
    version
)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and extract products for every query in the query file
    Harvest {
        #[arg(long, value_enum)]
        site: Site,
        /// Query file: {"searchQueries":[{"query":"..."}],"settings":{"minRating":N}}
        #[arg(long, default_value = "queries.json")]
        queries: PathBuf,
        /// Products to collect per query (overrides settings.maxProducts)
        #[arg(long)]
        limit: Option<usize>,
        /// Try a headless browser render when a page is blocked or fails
        #[arg(long)]
        use_headless: bool,
        /// Newline-separated proxy URLs
        #[arg(long)]
        proxies_file: Option<PathBuf>,
        /// Rebuild the combined dataset afterwards
        #[arg(long)]
        aggregate: bool,
    },
    /// Rebuild <site>_combined.json/.csv from the per-query files
    Aggregate {
        #[arg(long, value_enum)]
        site: Site,
    },
    /// Run a cleanup pass over the combined dataset
    Cleanup {
        #[arg(long, value_enum)]
        site: Site,
        #[arg(long, value_enum)]
        pass: CleanupKind,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn load_config(cli: &Cli) -> Result<AppConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_config().await?;

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(dir) = &cli.output_dir {
        config.paths.output_dir.clone_from(dir);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli).await?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    match cli.command {
        Commands::Harvest {
            site,
            queries,
            limit,
            use_headless,
            proxies_file,
            aggregate,
        } => {
            if use_headless {
                config.network.use_headless_fallback = true;
            }
            if let Some(path) = proxies_file {
                config.network.proxies = load_proxies_file(&path).await?;
            }

            let mut source = QuerySource::load(&queries, config.harvest.max_products_per_query).await?;
            if let Some(limit) = limit {
                source = source.with_target(limit);
            }

            let renderer = build_renderer(config.network.use_headless_fallback).await?;
            let mut pipeline = HarvestPipeline::new(site.profile(), &config, renderer)?;
            let report = pipeline.run(&source.queries).await?;
            report.log_summary();
            for query in report.empty_queries() {
                warn!("⚠️ '{}' produced no products", query);
            }

            if aggregate {
                let aggregation = rebuild(&config.paths.output_dir, site)?;
                info!("🧩 {} combined entries written", aggregation.entries);
            }
        }
        Commands::Aggregate { site } => {
            let report = rebuild(&config.paths.output_dir, site)?;
            for skipped in &report.files_skipped {
                warn!("⚠️ Left out {}", skipped.display());
            }
            info!(
                "🧩 {} entries → {} and {}",
                report.entries,
                report.paths.json.display(),
                report.paths.csv.display()
            );
        }
        Commands::Cleanup { site, pass, dry_run } => {
            let store = ProductStore::new(&config.paths.output_dir);
            let pass = pass
                .build(&store, site)
                .with_context(|| format!("Failed to prepare cleanup pass for {site}"))?;
            let report = CleanupRunner::for_site(&store, site, dry_run).run(pass.as_ref())?;
            for backup in &report.backups {
                info!("🗂️ Backup: {}", backup.display());
            }
            if !report.changed() {
                info!("✨ {} already converged; nothing to do", report.pass);
            }
        }
    }
    Ok(())
}
