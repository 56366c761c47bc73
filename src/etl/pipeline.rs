//! Extract -> transform -> parent gate -> enrich -> load, page by page, with a
//! bounded retry queue for records whose parent game is not stored yet.
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::enrichment::{CompositeEnricher, EnrichmentContext};
use super::extractor::Extractor;
use super::metrics::{Stage, SyncMetrics};
use super::transformer;
use crate::database_ops::igdb::client::IGDB_MAX_LIMIT;
use crate::database_ops::igdb::{RawRecord, SourceGateway};
use crate::database_ops::store::{DimensionStore, GameStore, UpsertOutcome};
use crate::util::env::{env_opt, env_parse};

pub const DEFAULT_FILTER: &str = "rating > 60 & aggregated_rating_count > 10";
pub const DEFAULT_SORT: &str = "id asc";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub batch_limit: usize,
    pub filter: Option<String>,
    pub sort: Option<String>,
    /// 0 = until the remote runs out of records.
    pub max_pages: usize,
    pub retry_passes: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_limit: IGDB_MAX_LIMIT,
            filter: Some(DEFAULT_FILTER.to_string()),
            sort: Some(DEFAULT_SORT.to_string()),
            max_pages: 0,
            retry_passes: 2,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_limit: env_parse("BATCH_LIMIT", defaults.batch_limit),
            filter: env_opt("IGDB_WHERE").or(defaults.filter),
            sort: env_opt("IGDB_SORT").or(defaults.sort),
            max_pages: env_parse("IGDB_MAX_PAGES", defaults.max_pages),
            retry_passes: env_parse("DEFERRED_RETRY_PASSES", defaults.retry_passes),
        }
        .normalized()
    }

    /// Clamps the page size to what the remote accepts.
    pub fn normalized(mut self) -> Self {
        self.batch_limit = self.batch_limit.clamp(1, IGDB_MAX_LIMIT);
        self
    }
}

/// A record waiting for its parent game to be stored.
#[derive(Debug, Clone)]
struct Deferred {
    raw: RawRecord,
    source_ref: i64,
    parent_ref: i64,
    attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Loaded,
    Deferred { source_ref: i64, parent_ref: i64 },
    Skipped,
}

pub struct Pipeline {
    cfg: PipelineConfig,
    extractor: Extractor,
    games: Arc<dyn GameStore>,
    enricher: CompositeEnricher,
    ctx: EnrichmentContext,
    deferred: Vec<Deferred>,
    metrics: SyncMetrics,
}

impl Pipeline {
    pub fn new(
        cfg: PipelineConfig,
        gateway: Arc<dyn SourceGateway>,
        dimensions: Arc<dyn DimensionStore>,
        games: Arc<dyn GameStore>,
    ) -> Self {
        let cfg = cfg.normalized();
        Self {
            extractor: Extractor::new(gateway.clone(), cfg.filter.clone(), cfg.sort.clone()),
            ctx: EnrichmentContext::new(gateway, dimensions),
            enricher: CompositeEnricher::default(),
            games,
            deferred: Vec::new(),
            metrics: SyncMetrics::default(),
            cfg,
        }
    }

    pub fn with_enricher(mut self, enricher: CompositeEnricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Runs until the remote is exhausted (or `max_pages`). Only an extraction
    /// failure ends the run with an error; every record-level failure is
    /// logged, counted and skipped.
    #[instrument(skip(self), fields(batch_limit = self.cfg.batch_limit))]
    pub async fn run(&mut self) -> Result<SyncMetrics> {
        let limit = self.cfg.batch_limit;
        let mut offset = 0usize;
        loop {
            if self.cfg.max_pages > 0 && self.metrics.pages >= self.cfg.max_pages as u64 {
                info!(pages = self.metrics.pages, "page limit reached");
                break;
            }
            let started = Instant::now();
            let page = self.extractor.extract(offset, limit).await?;
            self.metrics.observe(Stage::Extract, started.elapsed());
            if page.is_empty() {
                break;
            }
            self.metrics.pages += 1;
            let fetched = page.len();
            self.metrics.extracted += fetched as u64;
            info!(offset, records = fetched, "processing page");

            for raw in page {
                self.process_fresh(raw).await;
            }
            self.flush_deferred().await;

            if fetched < limit {
                break;
            }
            offset += fetched;
        }

        // Each flush advances every queued record by at least one attempt, so
        // this drains within `retry_passes` rounds.
        while !self.deferred.is_empty() {
            self.flush_deferred().await;
        }

        self.metrics.log_summary();
        Ok(self.metrics.clone())
    }

    async fn process_fresh(&mut self, raw: RawRecord) {
        if let RecordOutcome::Deferred {
            source_ref,
            parent_ref,
        } = self.process_record(&raw).await
        {
            debug!(source_ref, parent_ref, "parent not stored yet; deferring");
            self.metrics.deferred += 1;
            self.deferred.push(Deferred {
                raw,
                source_ref,
                parent_ref,
                attempts: 0,
            });
        }
    }

    /// Bounded fixed-point retry of the deferred queue: at most `retry_passes`
    /// passes, stopping early once a pass does not shrink the queue.
    async fn flush_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        if self.cfg.retry_passes == 0 {
            for item in std::mem::take(&mut self.deferred) {
                self.abandon(&item);
            }
            return;
        }

        let mut pass = 0u32;
        while !self.deferred.is_empty() && pass < self.cfg.retry_passes {
            pass += 1;
            let before = self.deferred.len();
            for mut item in std::mem::take(&mut self.deferred) {
                self.metrics.retried += 1;
                if let RecordOutcome::Deferred { .. } = self.process_record(&item.raw).await {
                    item.attempts += 1;
                    if item.attempts >= self.cfg.retry_passes {
                        self.abandon(&item);
                    } else {
                        self.deferred.push(item);
                    }
                }
            }
            let after = self.deferred.len();
            debug!(pass, before, after, "deferred retry pass");
            if after >= before {
                break;
            }
        }
    }

    fn abandon(&mut self, item: &Deferred) {
        self.metrics.abandoned += 1;
        warn!(
            source_ref = item.source_ref,
            parent_ref = item.parent_ref,
            attempts = item.attempts,
            "parent never became available; abandoning record for this run"
        );
    }

    async fn process_record(&mut self, raw: &RawRecord) -> RecordOutcome {
        let started = Instant::now();
        let transformed = transformer::decode(raw)
            .and_then(|decoded| Ok((transformer::transform(&decoded, Utc::now())?, decoded)));
        self.metrics.observe(Stage::Transform, started.elapsed());
        let (mut game, decoded) = match transformed {
            Ok(pair) => pair,
            Err(err) => {
                self.metrics.transform_errors += 1;
                warn!(
                    id = raw.get("id").and_then(|v| v.as_i64()),
                    error = ?err,
                    "transform failed; skipping record"
                );
                return RecordOutcome::Skipped;
            }
        };

        let parent_ref = decoded.parent_game;
        if parent_ref > 0 && parent_ref != game.source_ref() {
            match self.games.find_game_id(parent_ref).await {
                Ok(Some(parent_id)) => game.parent_game_id = Some(parent_id),
                Ok(None) => {
                    return RecordOutcome::Deferred {
                        source_ref: game.source_ref(),
                        parent_ref,
                    }
                }
                Err(err) => {
                    warn!(
                        source_ref = game.source_ref(),
                        parent_ref,
                        error = ?err,
                        "parent lookup failed; deferring"
                    );
                    return RecordOutcome::Deferred {
                        source_ref: game.source_ref(),
                        parent_ref,
                    };
                }
            }
        } else if parent_ref == game.source_ref() {
            warn!(source_ref = parent_ref, "record names itself as parent; ignoring");
        }

        let started = Instant::now();
        let report = self.enricher.enrich(&mut self.ctx, &mut game, &decoded).await;
        self.metrics.observe(Stage::Enrich, started.elapsed());
        self.metrics.enrich_errors += report.failed_steps.len() as u64;

        let started = Instant::now();
        let result = self.games.upsert_graph(&mut game).await;
        self.metrics.observe(Stage::Load, started.elapsed());
        match result {
            Ok(outcome) => {
                self.metrics.processed += 1;
                match outcome {
                    UpsertOutcome::Created => self.metrics.created += 1,
                    UpsertOutcome::Updated => self.metrics.updated += 1,
                }
                debug!(
                    source_ref = game.source_ref(),
                    title = %game.title,
                    ?outcome,
                    "game stored"
                );
                RecordOutcome::Loaded
            }
            Err(err) => {
                self.metrics.load_errors += 1;
                warn!(
                    source_ref = game.source_ref(),
                    title = %game.title,
                    error = ?err,
                    "persisting game failed; skipping record"
                );
                RecordOutcome::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::{DimensionKind, MediaKind};
    use crate::testing::{game_json, named_json, pipeline, FakeGateway, MemoryStore};

    fn cfg() -> PipelineConfig {
        PipelineConfig {
            batch_limit: 500,
            filter: None,
            sort: None,
            max_pages: 0,
            retry_passes: 2,
        }
    }

    fn rich_game() -> RawRecord {
        json!({
            "id": 100,
            "name": "Hades",
            "genres": [7, 8],
            "platforms": [6],
            "involved_companies": [40],
            "alternative_names": [41],
            "release_dates": [42],
            "cover": 43,
            "age_ratings": [50],
            "created_at": 1_500_000_000,
            "updated_at": 1_600_000_000
        })
    }

    fn seed_rich_remote(gateway: &FakeGateway) {
        gateway.add_row("genres", named_json(7, "Roguelike"));
        gateway.add_row("genres", named_json(8, "Action"));
        gateway.add_row(
            "platforms",
            json!({"id": 6, "name": "PC (Microsoft Windows)", "abbreviation": "PC"}),
        );
        gateway.add_row("companies", json!({"id": 900, "name": "Supergiant Games"}));
        gateway.add_row(
            "involved_companies",
            json!({"id": 40, "game": 100, "company": 900, "developer": true, "publisher": true}),
        );
        gateway.add_row(
            "alternative_names",
            json!({"id": 41, "game": 100, "name": "Hades: Battle Out of Hell"}),
        );
        gateway.add_row(
            "release_dates",
            json!({"id": 42, "game": 100, "platform": 6, "date": 1_600_300_800, "region": 8}),
        );
        gateway.add_row(
            "covers",
            json!({"id": 43, "game": 100, "url": "//images.igdb.com/co39vc.jpg"}),
        );
        gateway.add_row(
            "age_ratings",
            json!({
                "id": 50,
                "organization": 1,
                "rating_category": 10,
                "rating_content_descriptions": [70, 71]
            }),
        );
        gateway.add_row("age_rating_organizations", json!({"id": 1, "name": "ESRB"}));
        gateway.add_row(
            "age_rating_content_descriptions_v2",
            json!({"id": 70, "organization": 1, "description": "Violence"}),
        );
        gateway.add_row(
            "age_rating_content_descriptions_v2",
            json!({"id": 71, "organization": 1, "description": "Language"}),
        );
    }

    #[tokio::test]
    async fn new_genre_is_created_and_associated() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![json!({"id": 100, "name": "Tetris", "genres": [7]})]);
        gateway.add_row("genres", named_json(7, "Puzzle"));
        let store = Arc::new(MemoryStore::new());

        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.created, 1);
        assert_eq!(store.dimension_count(DimensionKind::Genre), 1);
        assert_eq!(store.association_refs(100, DimensionKind::Genre), Some(vec![7]));
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![rich_game()]);
        seed_rich_remote(&gateway);
        let store = Arc::new(MemoryStore::new());

        let first = pipeline(cfg(), &gateway, &store).run().await.unwrap();
        assert_eq!((first.created, first.enrich_errors), (1, 0));
        let stored = store.game(100).unwrap();

        let second = pipeline(cfg(), &gateway, &store).run().await.unwrap();
        assert_eq!((second.created, second.updated), (0, 1));
        let again = store.game(100).unwrap();

        assert_eq!(store.game_count(), 1);
        assert_eq!(again.id, stored.id);
        assert_eq!(again.associations, stored.associations);
        for (kind, expected) in [
            (DimensionKind::Genre, 2),
            (DimensionKind::Platform, 1),
            (DimensionKind::Company, 1),
            (DimensionKind::AgeRating, 1),
            (DimensionKind::AgeRatingOrganization, 1),
            (DimensionKind::AgeRatingContentDescription, 2),
        ] {
            assert_eq!(store.dimension_count(kind), expected, "{kind}");
        }
        assert_eq!(store.description_links().len(), 2);
        let children = again.children;
        assert_eq!(children.alt_names.map(|v| v.len()), Some(1));
        assert_eq!(children.companies.map(|v| v.len()), Some(1));
        assert_eq!(children.release_dates.map(|v| v.len()), Some(1));
        let media = children.media_assets.unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].kind, MediaKind::Cover);
        assert_eq!(media[0].url, "https://images.igdb.com/co39vc.jpg");
    }

    #[tokio::test]
    async fn surrogate_key_survives_scalar_changes() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![game_json(100, "Hades")]);
        let store = Arc::new(MemoryStore::new());
        pipeline(cfg(), &gateway, &store).run().await.unwrap();
        let id = store.game(100).unwrap().id;

        gateway.set_games(vec![json!({"id": 100, "name": "Hades II", "total_rating": 93.0})]);
        pipeline(cfg(), &gateway, &store).run().await.unwrap();

        let game = store.game(100).unwrap();
        assert_eq!(game.id, id);
        assert_eq!(game.title, "Hades II");
        assert_eq!(game.slug, "hades ii");
        assert_eq!(game.total_rating, Some(93.0));
    }

    #[tokio::test]
    async fn shrinking_association_set_replaces_only_that_game() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.add_row("genres", named_json(1, "A"));
        gateway.add_row("genres", named_json(2, "B"));
        gateway.set_games(vec![
            json!({"id": 100, "name": "First", "genres": [1, 2]}),
            json!({"id": 101, "name": "Second", "genres": [2]}),
        ]);
        let store = Arc::new(MemoryStore::new());
        pipeline(cfg(), &gateway, &store).run().await.unwrap();
        assert_eq!(store.association_refs(100, DimensionKind::Genre), Some(vec![1, 2]));

        gateway.set_games(vec![
            json!({"id": 100, "name": "First", "genres": [1]}),
            json!({"id": 101, "name": "Second", "genres": [2]}),
        ]);
        pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(store.association_refs(100, DimensionKind::Genre), Some(vec![1]));
        assert_eq!(store.association_refs(101, DimensionKind::Genre), Some(vec![2]));
        assert_eq!(store.dimension_count(DimensionKind::Genre), 2);
    }

    #[tokio::test]
    async fn child_waits_for_parent_on_a_later_page() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![
            json!({"id": 200, "name": "Expansion", "parent_game": 201}),
            game_json(201, "Base Game"),
        ]);
        let store = Arc::new(MemoryStore::new());
        let cfg = PipelineConfig {
            batch_limit: 1,
            ..cfg()
        };

        let metrics = pipeline(cfg, &gateway, &store).run().await.unwrap();

        let parent = store.game(201).unwrap();
        let child = store.game(200).unwrap();
        assert_eq!(child.parent_game_id, Some(parent.id));
        assert_eq!(metrics.deferred, 1);
        assert_eq!(metrics.abandoned, 0);
        assert_eq!(metrics.created, 2);
        assert_eq!(metrics.pages, 2);
    }

    #[tokio::test]
    async fn child_before_parent_on_same_page_is_retried() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![
            json!({"id": 200, "name": "Expansion", "parent_game": 201}),
            game_json(201, "Base Game"),
        ]);
        let store = Arc::new(MemoryStore::new());

        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.deferred, 1);
        assert_eq!(metrics.retried, 1);
        assert!(store.game(200).unwrap().parent_game_id.is_some());
    }

    #[tokio::test]
    async fn orphan_is_retried_twice_then_abandoned() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![
            json!({"id": 300, "name": "Orphan DLC", "parent_game": 999}),
            game_json(301, "Standalone"),
        ]);
        let store = Arc::new(MemoryStore::new());

        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.deferred, 1);
        assert_eq!(metrics.retried, 2);
        assert_eq!(metrics.abandoned, 1);
        assert!(store.game(300).is_none());
        assert!(store.game(301).is_some());
    }

    #[tokio::test]
    async fn retry_bound_is_configurable() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![json!({"id": 300, "name": "Orphan", "parent_game": 999})]);
        let store = Arc::new(MemoryStore::new());

        let none = pipeline(PipelineConfig { retry_passes: 0, ..cfg() }, &gateway, &store)
            .run()
            .await
            .unwrap();
        assert_eq!((none.retried, none.abandoned), (0, 1));

        let four = pipeline(PipelineConfig { retry_passes: 4, ..cfg() }, &gateway, &store)
            .run()
            .await
            .unwrap();
        assert_eq!((four.retried, four.abandoned), (4, 1));
    }

    #[tokio::test]
    async fn stored_parent_is_attached_without_deferral() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![game_json(201, "Base Game")]);
        let store = Arc::new(MemoryStore::new());
        pipeline(cfg(), &gateway, &store).run().await.unwrap();

        gateway.set_games(vec![json!({"id": 200, "name": "Expansion", "parent_game": 201})]);
        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.deferred, 0);
        assert_eq!(
            store.game(200).unwrap().parent_game_id,
            Some(store.game(201).unwrap().id)
        );
    }

    #[tokio::test]
    async fn self_parent_is_ignored() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![json!({"id": 5, "name": "Loop", "parent_game": 5})]);
        let store = Arc::new(MemoryStore::new());

        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.deferred, 0);
        assert_eq!(store.game(5).unwrap().parent_game_id, None);
    }

    #[tokio::test]
    async fn extraction_failure_aborts_the_run() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![game_json(1, "Anything")]);
        gateway.fail("games");
        let store = Arc::new(MemoryStore::new());

        let err = pipeline(cfg(), &gateway, &store).run().await.unwrap_err();

        assert!(format!("{err:#}").contains("extracting games"));
        assert_eq!(store.game_count(), 0);
    }

    #[tokio::test]
    async fn bad_records_are_skipped() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![
            json!({"id": 1, "name": "   "}),
            json!({"id": "nope"}),
            game_json(2, "Fine"),
        ]);
        let store = Arc::new(MemoryStore::new());

        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.extracted, 3);
        assert_eq!(metrics.transform_errors, 2);
        assert_eq!(metrics.processed, 1);
    }

    #[tokio::test]
    async fn persistence_failure_rolls_back_one_game_only() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![game_json(1, "Broken"), game_json(2, "Fine")]);
        let store = Arc::new(MemoryStore::new());
        store.fail_game(1);

        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.load_errors, 1);
        assert!(store.game(1).is_none());
        assert!(store.game(2).is_some());

        store.heal_game(1);
        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();
        assert_eq!((metrics.created, metrics.updated), (1, 1));
    }

    #[tokio::test]
    async fn failed_enrichment_keeps_previous_relations() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.add_row("genres", named_json(7, "Puzzle"));
        gateway.add_row("genres", named_json(8, "Arcade"));
        gateway.add_row("platforms", json!({"id": 6, "name": "PC"}));
        gateway.set_games(vec![
            json!({"id": 100, "name": "Tetris", "genres": [7], "platforms": [6]}),
        ]);
        let store = Arc::new(MemoryStore::new());
        pipeline(cfg(), &gateway, &store).run().await.unwrap();

        gateway.set_games(vec![
            json!({"id": 100, "name": "Tetris", "genres": [7, 8], "platforms": [6]}),
        ]);
        store.fail_kind(DimensionKind::Genre);
        let metrics = pipeline(cfg(), &gateway, &store).run().await.unwrap();

        assert_eq!(metrics.enrich_errors, 1);
        assert_eq!(metrics.updated, 1);
        assert_eq!(store.association_refs(100, DimensionKind::Genre), Some(vec![7]));
        assert_eq!(store.association_refs(100, DimensionKind::Platform), Some(vec![6]));
    }

    #[tokio::test]
    async fn paging_walks_offsets_and_honours_max_pages() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games((1..=5).map(|i| game_json(i, &format!("Game {i}"))).collect());
        let store = Arc::new(MemoryStore::new());

        let limited = PipelineConfig {
            batch_limit: 2,
            max_pages: 2,
            ..cfg()
        };
        let metrics = pipeline(limited, &gateway, &store).run().await.unwrap();
        assert_eq!(metrics.processed, 4);

        let full = PipelineConfig {
            batch_limit: 2,
            ..cfg()
        };
        let metrics = pipeline(full, &gateway, &store).run().await.unwrap();
        assert_eq!(metrics.pages, 3);
        assert_eq!((metrics.created, metrics.updated), (1, 4));

        let offsets: Vec<usize> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                crate::testing::GatewayCall::Query { offset, .. } => Some(offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![0, 2, 0, 2, 4]);
    }

    #[tokio::test]
    async fn custom_enricher_replaces_default_steps() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_games(vec![json!({"id": 100, "name": "Tetris", "genres": [7]})]);
        gateway.add_row("genres", named_json(7, "Puzzle"));
        let store = Arc::new(MemoryStore::new());

        let mut run = pipeline(cfg(), &gateway, &store)
            .with_enricher(crate::etl::enrichment::CompositeEnricher::new(Vec::new()));
        run.run().await.unwrap();

        assert_eq!(run.metrics().created, 1);
        assert!(gateway.lookups("genres").is_empty());
        assert_eq!(store.association_refs(100, DimensionKind::Genre), None);
    }

    #[test]
    fn batch_limit_is_clamped() {
        let cfg = PipelineConfig {
            batch_limit: 5000,
            ..PipelineConfig::default()
        }
        .normalized();
        assert_eq!(cfg.batch_limit, IGDB_MAX_LIMIT);
        let cfg = PipelineConfig {
            batch_limit: 0,
            ..PipelineConfig::default()
        }
        .normalized();
        assert_eq!(cfg.batch_limit, 1);
    }
}
