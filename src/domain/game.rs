use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Dimension, DimensionKind, GameChildren, SourceMeta};

/// The catalog aggregate. `id` is the local surrogate key; `meta.source_ref`
/// is the natural key shared with the remote catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub storyline: Option<String>,
    pub first_release_date: Option<DateTime<Utc>>,
    pub total_rating: Option<f64>,
    pub total_rating_count: Option<i32>,
    pub aggregated_rating: Option<f64>,
    pub aggregated_rating_count: Option<i32>,
    pub popularity: Option<f64>,
    pub ingested_at: DateTime<Utc>,
    pub parent_game_id: Option<Uuid>,
    pub category_code: Option<i16>,
    pub status_code: Option<i16>,
    /// Resolved many-to-many associations. Kinds absent from the map were not
    /// resolved in this pass and stay untouched in the store.
    pub associations: BTreeMap<DimensionKind, Vec<Dimension>>,
    pub children: GameChildren,
}

impl Game {
    pub fn source_ref(&self) -> i64 {
        self.meta.source_ref
    }

    /// Replaces the association set for `kind`, deduplicated by natural key.
    pub fn set_association(&mut self, kind: DimensionKind, mut dims: Vec<Dimension>) {
        dims.sort_by_key(|d| d.source_ref);
        dims.dedup_by_key(|d| d.source_ref);
        self.associations.insert(kind, dims);
    }

    pub fn association(&self, kind: DimensionKind) -> Option<&[Dimension]> {
        self.associations.get(&kind).map(Vec::as_slice)
    }

    /// A child row pointing at some other aggregate, if any. Children are
    /// built against the in-memory `id` and only re-parented by `adopt_id`.
    pub fn foreign_child(&self) -> Option<Uuid> {
        self.children
            .referenced_game_ids()
            .into_iter()
            .find(|g| *g != self.id)
    }

    /// Moves the aggregate onto its persisted surrogate key and re-parents
    /// every child row. Must run before any child write.
    pub fn adopt_id(&mut self, id: Uuid) {
        self.id = id;
        self.children.adopt(id);
    }
}
