//! Raw catalog record -> [`Game`] skeleton. Pure: no I/O, relations left
//! unresolved for the enrichment steps.
use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database_ops::igdb::models::{code_i16, positive_i32, text, unix_ts, IgdbGame};
use crate::database_ops::igdb::RawRecord;
use crate::domain::{Game, GameChildren, SourceMeta};

pub fn decode(raw: &RawRecord) -> Result<IgdbGame> {
    IgdbGame::from_raw(raw).context("decoding game record")
}

/// Lowercased, trimmed title. Distinct titles can collide.
pub fn slugify(title: &str) -> String {
    title.trim().to_lowercase()
}

fn rating(raw: f64) -> Option<f64> {
    (raw != 0.0 && raw.is_finite()).then_some(raw)
}

pub fn transform(raw: &IgdbGame, ingested_at: DateTime<Utc>) -> Result<Game> {
    if raw.id <= 0 {
        bail!("game record has no usable id ({})", raw.id);
    }
    let Some(title) = text(&raw.name) else {
        bail!("game {} has a blank title", raw.id);
    };

    Ok(Game {
        id: Uuid::new_v4(),
        meta: SourceMeta::with_times(raw.id, unix_ts(raw.created_at), unix_ts(raw.updated_at)),
        slug: slugify(&title),
        title,
        summary: text(&raw.summary),
        storyline: text(&raw.storyline),
        first_release_date: unix_ts(raw.first_release_date),
        total_rating: rating(raw.total_rating),
        total_rating_count: positive_i32(raw.total_rating_count),
        aggregated_rating: rating(raw.aggregated_rating),
        aggregated_rating_count: positive_i32(raw.aggregated_rating_count),
        popularity: rating(raw.popularity),
        ingested_at,
        parent_game_id: None,
        category_code: code_i16(raw.category),
        status_code: code_i16(raw.status),
        associations: BTreeMap::new(),
        children: GameChildren::default(),
    })
}
