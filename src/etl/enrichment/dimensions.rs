use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::warn;

use super::context::{fetch_ensure, EnrichmentContext};
use super::Enrichment;
use crate::database_ops::igdb::models::{IgdbGame, IgdbNamed, IgdbPlatform};
use crate::domain::{DimensionKind, Game};

/// The plain id/name/slug dimensions referenced directly by a game.
pub struct NamedDimensions;

impl NamedDimensions {
    fn referenced(raw: &IgdbGame) -> [(DimensionKind, &[i64]); 7] {
        [
            (DimensionKind::Genre, raw.genres.as_slice()),
            (DimensionKind::Theme, raw.themes.as_slice()),
            (DimensionKind::Keyword, raw.keywords.as_slice()),
            (DimensionKind::GameMode, raw.game_modes.as_slice()),
            (DimensionKind::PlayerPerspective, raw.player_perspectives.as_slice()),
            (DimensionKind::Franchise, raw.franchises.as_slice()),
            (DimensionKind::Collection, raw.collections.as_slice()),
        ]
    }
}

#[async_trait]
impl Enrichment for NamedDimensions {
    fn name(&self) -> &'static str {
        "named_dimensions"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        // Kinds resolve independently; one failing kind leaves the others set.
        let mut failed = Vec::new();
        for (kind, ids) in Self::referenced(raw) {
            match fetch_ensure::<IgdbNamed>(ctx, kind, ids).await {
                Ok(dims) => game.set_association(kind, dims),
                Err(err) => {
                    warn!(
                        source_ref = game.source_ref(),
                        %kind,
                        error = ?err,
                        "dimension kind unresolved"
                    );
                    failed.push(kind.as_str());
                }
            }
        }
        if !failed.is_empty() {
            bail!("unresolved dimension kinds: {}", failed.join(","));
        }
        Ok(())
    }
}

pub struct Platforms;

#[async_trait]
impl Enrichment for Platforms {
    fn name(&self) -> &'static str {
        "platforms"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let dims =
            fetch_ensure::<IgdbPlatform>(ctx, DimensionKind::Platform, &raw.platforms).await?;
        game.set_association(DimensionKind::Platform, dims);
        Ok(())
    }
}
