//! Local catalog model: the game aggregate, shared dimensions and child records.
mod children;
mod dimension;
mod game;

pub use children::*;
pub use dimension::{Dimension, DimensionAttrs, DimensionKind, DimensionRow};
pub use game::Game;

use chrono::{DateTime, Utc};

/// Provenance carried by every synced entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMeta {
    pub source_ref: i64,
    pub created_at_source: Option<DateTime<Utc>>,
    pub updated_at_source: Option<DateTime<Utc>>,
}

impl SourceMeta {
    pub fn new(source_ref: i64) -> Self {
        Self {
            source_ref,
            ..Default::default()
        }
    }

    pub fn with_times(
        source_ref: i64,
        created: Option<DateTime<Utc>>,
        updated: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            source_ref,
            created_at_source: created,
            updated_at_source: updated,
        }
    }

    /// Missing provenance falls back to `now`.
    pub fn with_times_or(
        source_ref: i64,
        created: Option<DateTime<Utc>>,
        updated: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_times(source_ref, created.or(Some(now)), updated.or(Some(now)))
    }
}
