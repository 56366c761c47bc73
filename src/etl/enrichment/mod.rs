//! Enrichment engine: independent steps that each resolve one relation facet
//! of a [`Game`], run in a fixed order against a shared [`EnrichmentContext`].
pub mod age_ratings;
pub mod children;
pub mod context;
pub mod dimensions;

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

pub use context::{fetch_ensure, normalize_ids, EnrichmentContext, RemoteDimension};

use crate::database_ops::igdb::models::IgdbGame;
use crate::domain::Game;

#[async_trait]
pub trait Enrichment: Send + Sync {
    fn name(&self) -> &'static str;

    /// Populates one facet of `game`. A failing step must leave the facet
    /// unresolved rather than half-written.
    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()>;
}

/// Outcome of one enrichment pass over a game.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnrichReport {
    pub failed_steps: Vec<&'static str>,
}

pub struct CompositeEnricher {
    steps: Vec<Box<dyn Enrichment>>,
}

impl Default for CompositeEnricher {
    fn default() -> Self {
        Self::new(vec![
            Box::new(dimensions::NamedDimensions),
            Box::new(dimensions::Platforms),
            Box::new(children::Companies),
            Box::new(children::AltNames),
            Box::new(children::ReleaseDates),
            Box::new(children::Media),
            Box::new(children::MultiplayerModes),
            Box::new(children::LanguageSupports),
            Box::new(age_ratings::AgeRatings),
            Box::new(children::Achievements),
            Box::new(children::Websites),
            Box::new(children::Videos),
        ])
    }
}

impl CompositeEnricher {
    pub fn new(steps: Vec<Box<dyn Enrichment>>) -> Self {
        Self { steps }
    }

    #[cfg(test)]
    fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step. Step failures are logged and reported, never propagated.
    pub async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> EnrichReport {
        let mut report = EnrichReport::default();
        for step in &self.steps {
            let started = Instant::now();
            match step.enrich(ctx, game, raw).await {
                Ok(()) => debug!(
                    step = step.name(),
                    source_ref = game.source_ref(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "enrichment step done"
                ),
                Err(err) => {
                    warn!(
                        step = step.name(),
                        source_ref = game.source_ref(),
                        title = %game.title,
                        error = ?err,
                        "enrichment step failed; continuing with partial relations"
                    );
                    report.failed_steps.push(step.name());
                }
            }
        }
        report
    }
}
