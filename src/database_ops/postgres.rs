//! Postgres implementation of the catalog store ports.
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::database_ops::store::{DimensionStore, GameStore, UpsertOutcome};
use crate::domain::{Dimension, DimensionAttrs, DimensionKind, DimensionRow, Game, GameChildren};
use crate::util::db::Db;

/// Keeps multi-row inserts well below the Postgres bind parameter limit.
const INSERT_CHUNK: usize = 1000;

const UPSERT_GAME_SQL: &str = "INSERT INTO game (
        id, source_ref, slug, title, summary, storyline, first_release_date,
        total_rating, total_rating_count, aggregated_rating, aggregated_rating_count,
        popularity, category_code, status_code, parent_game_id, ingested_at,
        created_at_source, updated_at_source
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
    ON CONFLICT (source_ref) DO UPDATE SET
        slug = EXCLUDED.slug,
        title = EXCLUDED.title,
        summary = EXCLUDED.summary,
        storyline = EXCLUDED.storyline,
        first_release_date = EXCLUDED.first_release_date,
        total_rating = EXCLUDED.total_rating,
        total_rating_count = EXCLUDED.total_rating_count,
        aggregated_rating = EXCLUDED.aggregated_rating,
        aggregated_rating_count = EXCLUDED.aggregated_rating_count,
        popularity = COALESCE(EXCLUDED.popularity, game.popularity),
        category_code = EXCLUDED.category_code,
        status_code = EXCLUDED.status_code,
        parent_game_id = EXCLUDED.parent_game_id,
        ingested_at = EXCLUDED.ingested_at,
        created_at_source = COALESCE(game.created_at_source, EXCLUDED.created_at_source),
        updated_at_source = EXCLUDED.updated_at_source,
        updated_at = now()
    RETURNING id, (xmax = 0) AS inserted";

const LINK_DESCRIPTION_SQL: &str = "INSERT INTO age_rating_content_description_link
        (age_rating_id, age_rating_content_description_id)
    SELECT r.id, d.id
      FROM age_rating r
      JOIN age_rating_content_description d ON d.source_ref = $2
     WHERE r.source_ref = $1
    ON CONFLICT DO NOTHING";

#[derive(Clone)]
pub struct PgCatalogStore {
    db: Db,
}

impl PgCatalogStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

/// Kind-specific columns, in bind order.
fn attr_columns(attrs: &DimensionAttrs) -> &'static [&'static str] {
    match attrs {
        DimensionAttrs::Named => &[],
        DimensionAttrs::Platform { .. } => &["abbreviation", "generation", "category_code"],
        DimensionAttrs::Company { .. } => &["country", "description"],
        DimensionAttrs::AgeRating { .. } => &["organization_code", "rating_code", "synopsis"],
        DimensionAttrs::AgeRatingOrganization { .. } => &["checksum"],
        DimensionAttrs::AgeRatingContentDescription { .. } => {
            &["age_rating_organization_id", "description_type", "checksum"]
        }
    }
}

async fn upsert_dimension(tx: &mut Transaction<'_, Postgres>, row: &DimensionRow) -> Result<()> {
    let table = row.kind.table();
    let extra = attr_columns(&row.attrs);

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {table} (id, source_ref, name, slug, created_at_source, updated_at_source"
    ));
    for col in extra {
        qb.push(", ").push(*col);
    }
    qb.push(") VALUES (");
    qb.push_bind(Uuid::new_v4())
        .push(", ")
        .push_bind(row.source_ref)
        .push(", ")
        .push_bind(row.name.clone())
        .push(", ")
        .push_bind(row.slug.clone())
        .push(", ")
        .push_bind(row.created_at_source)
        .push(", ")
        .push_bind(row.updated_at_source);
    match &row.attrs {
        DimensionAttrs::Named => {}
        DimensionAttrs::Platform {
            abbreviation,
            generation,
            category_code,
        } => {
            qb.push(", ")
                .push_bind(abbreviation.clone())
                .push(", ")
                .push_bind(*generation)
                .push(", ")
                .push_bind(*category_code);
        }
        DimensionAttrs::Company {
            country,
            description,
        } => {
            qb.push(", ")
                .push_bind(*country)
                .push(", ")
                .push_bind(description.clone());
        }
        DimensionAttrs::AgeRating {
            organization_code,
            rating_code,
            synopsis,
        } => {
            qb.push(", ")
                .push_bind(*organization_code)
                .push(", ")
                .push_bind(*rating_code)
                .push(", ")
                .push_bind(synopsis.clone());
        }
        DimensionAttrs::AgeRatingOrganization { checksum } => {
            qb.push(", ").push_bind(checksum.clone());
        }
        DimensionAttrs::AgeRatingContentDescription {
            organization_ref,
            description_type,
            checksum,
        } => {
            qb.push(", (SELECT id FROM age_rating_organization WHERE source_ref = ")
                .push_bind(*organization_ref)
                .push("), ")
                .push_bind(*description_type)
                .push(", ")
                .push_bind(checksum.clone());
        }
    }
    qb.push(format!(
        ") ON CONFLICT (source_ref) DO UPDATE SET \
           name = EXCLUDED.name, \
           slug = EXCLUDED.slug, \
           created_at_source = COALESCE({table}.created_at_source, EXCLUDED.created_at_source), \
           updated_at_source = EXCLUDED.updated_at_source, \
           updated_at = now()"
    ));
    for col in extra {
        qb.push(format!(", {col} = EXCLUDED.{col}"));
    }
    qb.build()
        .persistent(false)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("upserting {table} source_ref={}", row.source_ref))?;
    Ok(())
}

#[async_trait]
impl DimensionStore for PgCatalogStore {
    async fn dimensions_by_source_refs(
        &self,
        kind: DimensionKind,
        source_refs: &[i64],
    ) -> Result<Vec<Dimension>> {
        if source_refs.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, source_ref, name, slug FROM {} WHERE source_ref = ANY($1)",
            kind.table()
        );
        let rows = sqlx::query(&sql)
            .bind(source_refs)
            .persistent(false)
            .fetch_all(&self.db.pool)
            .await
            .with_context(|| format!("reading {kind} by source_ref"))?;
        rows.into_iter()
            .map(|row| {
                Ok(Dimension {
                    id: row.try_get("id")?,
                    kind,
                    source_ref: row.try_get("source_ref")?,
                    name: row.try_get("name")?,
                    slug: row.try_get("slug")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn upsert_dimensions(&self, rows: &[DimensionRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.db.pool.begin().await?;
        for row in rows {
            upsert_dimension(&mut tx, row).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn link_age_rating_descriptions(&self, pairs: &[(i64, i64)]) -> Result<usize> {
        if pairs.is_empty() {
            return Ok(0);
        }
        let mut tx = self.db.pool.begin().await?;
        let mut inserted = 0u64;
        for (rating_ref, description_ref) in pairs {
            inserted += sqlx::query(LINK_DESCRIPTION_SQL)
                .bind(rating_ref)
                .bind(description_ref)
                .persistent(false)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted as usize)
    }
}

async fn replace_links(
    tx: &mut Transaction<'_, Postgres>,
    game_id: Uuid,
    kind: DimensionKind,
    dims: &[Dimension],
) -> Result<()> {
    let link = kind
        .game_link_table()
        .ok_or_else(|| anyhow!("{kind} cannot be associated with a game"))?;
    let column = kind.id_column();
    sqlx::query(&format!("DELETE FROM {link} WHERE game_id = $1"))
        .bind(game_id)
        .persistent(false)
        .execute(&mut **tx)
        .await?;
    for chunk in dims.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {link} (game_id, {column}) "));
        qb.push_values(chunk, |mut b, dim| {
            b.push_bind(game_id).push_bind(dim.id);
        });
        qb.push(" ON CONFLICT DO NOTHING");
        qb.build().persistent(false).execute(&mut **tx).await?;
    }
    Ok(())
}

/// Delete-then-insert of one child table. `None` leaves the table untouched.
async fn replace_rows<'r, T, F>(
    tx: &mut Transaction<'_, Postgres>,
    game_id: Uuid,
    table: &str,
    columns: &str,
    rows: Option<&'r [T]>,
    mut bind: F,
) -> Result<()>
where
    F: FnMut(Separated<'_, 'r, Postgres, &'static str>, &'r T),
{
    let Some(rows) = rows else {
        return Ok(());
    };
    sqlx::query(&format!("DELETE FROM {table} WHERE game_id = $1"))
        .bind(game_id)
        .persistent(false)
        .execute(&mut **tx)
        .await?;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<'r, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} ({columns}) "));
        qb.push_values(chunk, &mut bind);
        qb.build()
            .persistent(false)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("inserting into {table}"))?;
    }
    debug!(table, rows = rows.len(), "replaced child rows");
    Ok(())
}

async fn replace_children(
    tx: &mut Transaction<'_, Postgres>,
    game_id: Uuid,
    c: &GameChildren,
) -> Result<()> {
    const META: &str = "id, game_id, source_ref, created_at_source, updated_at_source";

    replace_rows(
        tx,
        game_id,
        "game_alt_name",
        &format!("{META}, name, comment"),
        c.alt_names.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.name.clone())
                .push_bind(r.comment.clone());
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_involved_company",
        &format!("{META}, company_id, developer, publisher, porting, supporting"),
        c.companies.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.company_id)
                .push_bind(r.developer)
                .push_bind(r.publisher)
                .push_bind(r.porting)
                .push_bind(r.supporting);
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_release_date",
        &format!("{META}, platform_id, date, region_code, category_code, status_code"),
        c.release_dates.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.platform_id)
                .push_bind(r.date)
                .push_bind(r.region_code)
                .push_bind(r.category_code)
                .push_bind(r.status_code);
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_media_asset",
        &format!("{META}, kind, width, height, url, checksum"),
        c.media_assets.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.kind.as_str())
                .push_bind(r.width)
                .push_bind(r.height)
                .push_bind(r.url.clone())
                .push_bind(r.checksum.clone());
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_multiplayer_mode",
        &format!(
            "{META}, campaign_coop, drop_in, lan_coop, offline_coop, offline_coop_max, \
             offline_max, online_coop, online_coop_max, online_max, splitscreen, splitscreen_online"
        ),
        c.multiplayer_modes.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.campaign_coop)
                .push_bind(r.drop_in)
                .push_bind(r.lan_coop)
                .push_bind(r.offline_coop)
                .push_bind(r.offline_coop_max)
                .push_bind(r.offline_max)
                .push_bind(r.online_coop)
                .push_bind(r.online_coop_max)
                .push_bind(r.online_max)
                .push_bind(r.splitscreen)
                .push_bind(r.splitscreen_online);
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_language_support",
        &format!("{META}, language_code, support_type_code"),
        c.language_supports.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.language_code)
                .push_bind(r.support_type_code);
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_achievement",
        &format!(
            "{META}, name, slug, description, category_code, order_index, points, secret, checksum"
        ),
        c.achievements.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.name.clone())
                .push_bind(r.slug.clone())
                .push_bind(r.description.clone())
                .push_bind(r.category_code)
                .push_bind(r.order_index)
                .push_bind(r.points)
                .push_bind(r.secret)
                .push_bind(r.checksum.clone());
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_website",
        &format!("{META}, category_code, url, trusted, checksum"),
        c.websites.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.category_code)
                .push_bind(r.url.clone())
                .push_bind(r.trusted)
                .push_bind(r.checksum.clone());
        },
    )
    .await?;

    replace_rows(
        tx,
        game_id,
        "game_video",
        &format!("{META}, name, video_id, checksum"),
        c.videos.as_deref(),
        |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.game_id)
                .push_bind(r.meta.source_ref)
                .push_bind(r.meta.created_at_source)
                .push_bind(r.meta.updated_at_source)
                .push_bind(r.name.clone())
                .push_bind(r.video_id.clone())
                .push_bind(r.checksum.clone());
        },
    )
    .await?;

    Ok(())
}

#[async_trait]
impl GameStore for PgCatalogStore {
    async fn find_game_id(&self, source_ref: i64) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM game WHERE source_ref = $1")
            .bind(source_ref)
            .persistent(false)
            .fetch_optional(&self.db.pool)
            .await
            .with_context(|| format!("looking up game source_ref={source_ref}"))?;
        Ok(id)
    }

    #[instrument(skip(self, game), fields(source_ref = game.source_ref()))]
    async fn upsert_graph(&self, game: &mut Game) -> Result<UpsertOutcome> {
        if let Some(stray) = game.foreign_child() {
            bail!("child row references game {stray}, expected {}", game.id);
        }
        let mut tx = self.db.pool.begin().await?;

        let row = sqlx::query(UPSERT_GAME_SQL)
            .bind(game.id)
            .bind(game.meta.source_ref)
            .bind(&game.slug)
            .bind(&game.title)
            .bind(&game.summary)
            .bind(&game.storyline)
            .bind(game.first_release_date)
            .bind(game.total_rating)
            .bind(game.total_rating_count)
            .bind(game.aggregated_rating)
            .bind(game.aggregated_rating_count)
            .bind(game.popularity)
            .bind(game.category_code)
            .bind(game.status_code)
            .bind(game.parent_game_id)
            .bind(game.ingested_at)
            .bind(game.meta.created_at_source)
            .bind(game.meta.updated_at_source)
            .persistent(false)
            .fetch_one(&mut *tx)
            .await
            .context("upserting game row")?;
        let id: Uuid = row.try_get("id")?;
        let inserted: bool = row.try_get("inserted")?;

        game.adopt_id(id);

        for (kind, dims) in &game.associations {
            replace_links(&mut tx, id, *kind, dims).await?;
        }
        replace_children(&mut tx, id, &game.children).await?;

        tx.commit().await?;
        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }
}
