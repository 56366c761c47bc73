use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use igdb_catalog_sync::database_ops::igdb::IgdbService;
use igdb_catalog_sync::database_ops::PgCatalogStore;
use igdb_catalog_sync::etl::{Pipeline, PipelineConfig};
use igdb_catalog_sync::tracing::{init_tracing, DEFAULT_LOG_FILTER};
use igdb_catalog_sync::util::db::Db;
use igdb_catalog_sync::util::env as env_util;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "igdb-catalog-sync",
    version,
    about = "Mirror the IGDB game catalog into Postgres"
)]
struct Cli {
    /// Records per page (clamped to 1..=500). Overrides BATCH_LIMIT.
    #[arg(long)]
    batch_limit: Option<usize>,
    /// Apicalypse `where` clause. Overrides IGDB_WHERE.
    #[arg(long)]
    filter: Option<String>,
    /// Apicalypse `sort` clause. Overrides IGDB_SORT.
    #[arg(long)]
    sort: Option<String>,
    /// Stop after this many pages (0 = all). Overrides IGDB_MAX_PAGES.
    #[arg(long)]
    max_pages: Option<usize>,
    /// Retry passes for records waiting on their parent game.
    #[arg(long)]
    retry_passes: Option<u32>,
    /// Database URL; defaults to DATABASE_URL / DB_URL.
    #[arg(long)]
    db_url: Option<String>,
    /// Apply pending migrations before syncing.
    #[arg(long, action = ArgAction::SetTrue)]
    migrate: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut cfg = PipelineConfig::from_env();
        if let Some(limit) = self.batch_limit {
            cfg.batch_limit = limit;
        }
        if let Some(filter) = &self.filter {
            cfg.filter = Some(filter.clone()).filter(|f| !f.trim().is_empty());
        }
        if let Some(sort) = &self.sort {
            cfg.sort = Some(sort.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(pages) = self.max_pages {
            cfg.max_pages = pages;
        }
        if let Some(passes) = self.retry_passes {
            cfg.retry_passes = passes;
        }
        cfg.normalized()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing(DEFAULT_LOG_FILTER)?;
    let cli = Cli::parse();

    let cfg = cli.pipeline_config();
    let db_url = match &cli.db_url {
        Some(url) => url.clone(),
        None => env_util::db_url()?,
    };
    info!(db = %env_util::redact_dsn(&db_url), ?cfg, "starting catalog sync");

    let max_conns = env_util::env_parse("DB_MAX_CONNS", 5u32);
    let db = Db::connect(&db_url, max_conns).await?;
    if cli.migrate {
        db.migrate().await.context("applying migrations")?;
    }

    let gateway = Arc::new(IgdbService::new_from_env().context("configuring IGDB client")?);
    let store = Arc::new(PgCatalogStore::new(db));
    let mut pipeline = Pipeline::new(cfg, gateway, store.clone(), store);

    match pipeline.run().await {
        Ok(metrics) => {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
            Ok(())
        }
        Err(err) => {
            error!(error = ?err, metrics = ?pipeline.metrics(), "catalog sync aborted");
            Err(err)
        }
    }
}
