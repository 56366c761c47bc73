//! In-memory gateway and store used by the unit tests.
//!
//! Not suitable for production: no durability, single process only.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database_ops::igdb::{GatewayError, RawRecord, SourceGateway, SourceQuery};
use crate::database_ops::store::{DimensionStore, GameStore, UpsertOutcome};
use crate::domain::{Dimension, DimensionKind, DimensionRow, Game};
use crate::etl::{Pipeline, PipelineConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Query {
        endpoint: String,
        offset: usize,
        limit: usize,
    },
    Lookup {
        endpoint: String,
        ids: Vec<i64>,
        fields: Vec<String>,
    },
}

#[derive(Default)]
struct GatewayState {
    games: Vec<RawRecord>,
    rows: HashMap<String, BTreeMap<i64, RawRecord>>,
    reject_provenance: HashSet<String>,
    failing: HashSet<String>,
    calls: Vec<GatewayCall>,
}

/// Serves a fixed game list page by page plus id lookups per endpoint.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

fn project(raw: &RawRecord, fields: &[&str]) -> RawRecord {
    match raw {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_games(&self, games: Vec<RawRecord>) {
        self.state.lock().unwrap().games = games;
    }

    pub fn add_row(&self, endpoint: &str, row: RawRecord) {
        let id = row["id"].as_i64().expect("fixture row needs an id");
        self.state
            .lock()
            .unwrap()
            .rows
            .entry(endpoint.to_string())
            .or_default()
            .insert(id, row);
    }

    /// `endpoint` answers any request naming provenance fields with an
    /// unsupported-field error.
    pub fn reject_provenance(&self, endpoint: &str) {
        self.state
            .lock()
            .unwrap()
            .reject_provenance
            .insert(endpoint.to_string());
    }

    pub fn fail(&self, endpoint: &str) {
        self.state.lock().unwrap().failing.insert(endpoint.to_string());
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn lookups(&self, endpoint: &str) -> Vec<(Vec<i64>, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Lookup {
                    endpoint: e,
                    ids,
                    fields,
                } if e == endpoint => Some((ids, fields)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SourceGateway for FakeGateway {
    async fn query(
        &self,
        endpoint: &str,
        query: &SourceQuery,
    ) -> Result<Vec<RawRecord>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GatewayCall::Query {
            endpoint: endpoint.to_string(),
            offset: query.offset,
            limit: query.limit,
        });
        if state.failing.contains(endpoint) {
            return Err(GatewayError::Status {
                endpoint: endpoint.to_string(),
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(state
            .games
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn lookup_by_ids(
        &self,
        endpoint: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<RawRecord>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GatewayCall::Lookup {
            endpoint: endpoint.to_string(),
            ids: ids.to_vec(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
        if state.failing.contains(endpoint) {
            return Err(GatewayError::Status {
                endpoint: endpoint.to_string(),
                status: 500,
                body: "boom".into(),
            });
        }
        if state.reject_provenance.contains(endpoint)
            && fields.iter().any(|f| *f == "created_at" || *f == "updated_at")
        {
            return Err(GatewayError::UnsupportedField {
                endpoint: endpoint.to_string(),
                message: "Invalid Field: created_at".into(),
            });
        }
        let Some(rows) = state.rows.get(endpoint) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| rows.get(id))
            .map(|raw| project(raw, fields))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDimension {
    pub id: Uuid,
    pub row: DimensionRow,
}

#[derive(Default, Clone)]
struct StoreState {
    dimensions: BTreeMap<(DimensionKind, i64), StoredDimension>,
    games: BTreeMap<i64, Game>,
    description_links: BTreeSet<(i64, i64)>,
}

/// Both store ports over one mutex-guarded state. `upsert_graph` works on a
/// copy and swaps it in only on success, so failures leave nothing behind.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    failing_games: Mutex<HashSet<i64>>,
    failing_kinds: Mutex<HashSet<DimensionKind>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_game(&self, source_ref: i64) {
        self.failing_games.lock().unwrap().insert(source_ref);
    }

    pub fn heal_game(&self, source_ref: i64) {
        self.failing_games.lock().unwrap().remove(&source_ref);
    }

    pub fn fail_kind(&self, kind: DimensionKind) {
        self.failing_kinds.lock().unwrap().insert(kind);
    }

    pub fn game(&self, source_ref: i64) -> Option<Game> {
        self.state.lock().unwrap().games.get(&source_ref).cloned()
    }

    pub fn game_count(&self) -> usize {
        self.state.lock().unwrap().games.len()
    }

    pub fn dimension(&self, kind: DimensionKind, source_ref: i64) -> Option<StoredDimension> {
        self.state
            .lock()
            .unwrap()
            .dimensions
            .get(&(kind, source_ref))
            .cloned()
    }

    pub fn dimension_count(&self, kind: DimensionKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .dimensions
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Natural keys associated with game `source_ref` for `kind`, if resolved.
    pub fn association_refs(&self, source_ref: i64, kind: DimensionKind) -> Option<Vec<i64>> {
        let game = self.game(source_ref)?;
        game.association(kind)
            .map(|dims| dims.iter().map(|d| d.source_ref).collect())
    }

    pub fn description_links(&self) -> BTreeSet<(i64, i64)> {
        self.state.lock().unwrap().description_links.clone()
    }
}

#[async_trait]
impl DimensionStore for MemoryStore {
    async fn dimensions_by_source_refs(
        &self,
        kind: DimensionKind,
        source_refs: &[i64],
    ) -> Result<Vec<Dimension>> {
        if self.failing_kinds.lock().unwrap().contains(&kind) {
            bail!("{kind} table unavailable");
        }
        let state = self.state.lock().unwrap();
        Ok(source_refs
            .iter()
            .filter_map(|r| state.dimensions.get(&(kind, *r)))
            .map(|d| Dimension {
                id: d.id,
                kind,
                source_ref: d.row.source_ref,
                name: d.row.name.clone(),
                slug: d.row.slug.clone(),
            })
            .collect())
    }

    async fn upsert_dimensions(&self, rows: &[DimensionRow]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for row in rows {
            state
                .dimensions
                .entry((row.kind, row.source_ref))
                .and_modify(|d| {
                    let created = d.row.created_at_source.or(row.created_at_source);
                    d.row = row.clone();
                    d.row.created_at_source = created;
                })
                .or_insert_with(|| StoredDimension {
                    id: Uuid::new_v4(),
                    row: row.clone(),
                });
        }
        Ok(())
    }

    async fn link_age_rating_descriptions(&self, pairs: &[(i64, i64)]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut inserted = 0;
        for (rating, description) in pairs {
            let both_stored = state
                .dimensions
                .contains_key(&(DimensionKind::AgeRating, *rating))
                && state
                    .dimensions
                    .contains_key(&(DimensionKind::AgeRatingContentDescription, *description));
            if both_stored && state.description_links.insert((*rating, *description)) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn find_game_id(&self, source_ref: i64) -> Result<Option<Uuid>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .games
            .get(&source_ref)
            .map(|g| g.id))
    }

    async fn upsert_graph(&self, game: &mut Game) -> Result<UpsertOutcome> {
        if let Some(stray) = game.foreign_child() {
            bail!("child row references game {stray}, expected {}", game.id);
        }
        let mut state = self.state.lock().unwrap();
        let mut next = state.clone();
        let source_ref = game.source_ref();

        let previous = next.games.remove(&source_ref);
        let (id, outcome) = match &previous {
            Some(prev) => (prev.id, UpsertOutcome::Updated),
            None => (game.id, UpsertOutcome::Created),
        };
        game.adopt_id(id);
        for (kind, dims) in &game.associations {
            for dim in dims {
                match next.dimensions.get(&(*kind, dim.source_ref)) {
                    Some(stored) if stored.id == dim.id => {}
                    _ => bail!("{kind} {} is not stored", dim.source_ref),
                }
            }
        }

        let mut stored = game.clone();
        if let Some(prev) = previous {
            for (kind, dims) in prev.associations {
                stored.associations.entry(kind).or_insert(dims);
            }
            macro_rules! keep_unresolved {
                ($($field:ident),*) => {
                    $(
                        if stored.children.$field.is_none() {
                            stored.children.$field = prev.children.$field;
                        }
                    )*
                };
            }
            keep_unresolved!(
                alt_names,
                companies,
                release_dates,
                media_assets,
                multiplayer_modes,
                language_supports,
                achievements,
                websites,
                videos
            );
            stored.meta.created_at_source =
                prev.meta.created_at_source.or(stored.meta.created_at_source);
        }
        next.games.insert(source_ref, stored);

        if self.failing_games.lock().unwrap().contains(&source_ref) {
            bail!("injected failure persisting game {source_ref}");
        }
        *state = next;
        Ok(outcome)
    }
}

/// Minimal raw game record.
pub fn game_json(id: i64, name: &str) -> RawRecord {
    json!({ "id": id, "name": name, "created_at": 1_600_000_000, "updated_at": 1_650_000_000 })
}

pub fn named_json(id: i64, name: &str) -> RawRecord {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase(),
        "created_at": 1_400_000_000,
        "updated_at": 1_500_000_000
    })
}

/// Pipeline wired to the fakes with the default enrichment steps.
pub fn pipeline(
    cfg: PipelineConfig,
    gateway: &Arc<FakeGateway>,
    store: &Arc<MemoryStore>,
) -> Pipeline {
    Pipeline::new(cfg, gateway.clone(), store.clone(), store.clone())
}
