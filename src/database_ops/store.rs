//! Persistence ports used by the enrichment steps and the pipeline.
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Dimension, DimensionKind, DimensionRow, Game};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[async_trait]
pub trait DimensionStore: Send + Sync {
    /// Stored rows of `kind` whose natural key is in `source_refs`. Unknown
    /// keys are simply absent from the result.
    async fn dimensions_by_source_refs(
        &self,
        kind: DimensionKind,
        source_refs: &[i64],
    ) -> Result<Vec<Dimension>>;

    /// Inserts new rows and updates the mutable columns of existing ones,
    /// matching on `(kind, source_ref)`. Surrogate keys never change.
    async fn upsert_dimensions(&self, rows: &[DimensionRow]) -> Result<()>;

    /// Links age ratings to content descriptions by natural keys; pairs that
    /// already exist are left alone. Returns the number of new links.
    async fn link_age_rating_descriptions(&self, pairs: &[(i64, i64)]) -> Result<usize>;
}

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn find_game_id(&self, source_ref: i64) -> Result<Option<Uuid>>;

    /// Persists the whole aggregate atomically. On return `game.id` holds the
    /// persisted surrogate key and every child row points at it.
    async fn upsert_graph(&self, game: &mut Game) -> Result<UpsertOutcome>;
}
