use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, Row,
};
use tracing::{info, instrument};

use crate::util::env::env_flag;

const MIGRATIONS_DIR: &str = "./migrations";

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    /// Connects and, when `AUTO_MIGRATE` is on, applies pending migrations.
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let db = Self::connect_no_migrate(database_url, max_connections).await?;
        if env_flag("AUTO_MIGRATE", false) {
            info!("running migrations (AUTO_MIGRATE=on)");
            db.migrate().await?;
        } else {
            info!("AUTO_MIGRATE disabled; skipping migrations");
        }
        Ok(db)
    }

    #[instrument(skip(database_url))]
    pub async fn connect_no_migrate(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options =
            PgConnectOptions::from_str(database_url).context("invalid database url")?;
        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }
        if !env_flag("USE_PREPARED", false) {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("connecting to catalog database")?;
        info!(max_connections, "connected to db");
        Ok(Self { pool })
    }

    /// Applies `./migrations/<version>_<name>.sql` files not yet recorded in
    /// `_sqlx_migrations`, in version order.
    pub async fn migrate(&self) -> Result<()> {
        run_migrations(&self.pool, Path::new(MIGRATIONS_DIR)).await
    }
}

async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<()> {
    if !dir.exists() {
        info!(dir = %dir.display(), "no migrations directory; nothing to apply");
        return Ok(());
    }
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS _sqlx_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT,
            installed_at TIMESTAMPTZ DEFAULT now()
         )",
    )
    .execute(pool)
    .await?;

    let mut applied: HashSet<i64> = HashSet::new();
    for row in sqlx::raw_sql("SELECT version FROM _sqlx_migrations")
        .fetch_all(pool)
        .await?
    {
        applied.insert(row.try_get::<i64, _>(0)?);
    }

    let mut candidates = migration_files(dir)?;
    candidates.sort_by_key(|(v, _, _)| *v);
    for (version, desc, path) in candidates {
        if !applied.insert(version) {
            continue;
        }
        let sql = std::fs::read_to_string(&path)
            .with_context(|| format!("reading migration {}", path.display()))?;
        info!(version, file = ?path, "applying migration");
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(&sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO _sqlx_migrations(version, description) VALUES ($1, $2)")
            .bind(version)
            .bind(&desc)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }
    info!(applied = applied.len(), "migrations up-to-date");
    Ok(())
}

/// Files named `digits_rest.sql`; anything else in the directory is ignored.
fn migration_files(dir: &Path) -> Result<Vec<(i64, String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(fname) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some((version, desc)) = parse_migration_name(fname) {
            out.push((version, desc, path));
        }
    }
    Ok(out)
}

fn parse_migration_name(fname: &str) -> Option<(i64, String)> {
    let stem = fname.strip_suffix(".sql")?;
    let (num, rest) = stem.split_once('_')?;
    if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((num.parse().ok()?, rest.to_string()))
}
