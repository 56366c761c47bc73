//! Two-level age-rating resolution: organizations and content descriptions are
//! ensured as dimensions of their own before the ratings are linked to the
//! game and to their content descriptions.
use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use itertools::Itertools;
use tracing::debug;

use super::context::{fetch_ensure, EnrichmentContext};
use super::Enrichment;
use crate::database_ops::igdb::models::{
    IgdbAgeRating, IgdbAgeRatingContentDescription, IgdbAgeRatingOrganization, IgdbGame,
};
use crate::database_ops::igdb::RemoteKind;
use crate::domain::{DimensionKind, Game};

pub struct AgeRatings;

/// (rating, content description) natural-key pairs whose both ends are stored.
fn description_links(
    ratings: &[IgdbAgeRating],
    stored_ratings: &HashSet<i64>,
    stored_descriptions: &HashSet<i64>,
) -> Vec<(i64, i64)> {
    ratings
        .iter()
        .filter(|r| stored_ratings.contains(&r.id))
        .flat_map(|r| {
            r.rating_content_descriptions
                .iter()
                .filter(|d| stored_descriptions.contains(d))
                .map(move |d| (r.id, *d))
        })
        .unique()
        .collect()
}

#[async_trait]
impl Enrichment for AgeRatings {
    fn name(&self) -> &'static str {
        "age_ratings"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let ratings: Vec<IgdbAgeRating> = ctx
            .lookup_as(RemoteKind::AgeRatings, &raw.age_ratings)
            .await?;
        let description_refs: Vec<i64> = ratings
            .iter()
            .flat_map(|r| r.rating_content_descriptions.iter().copied())
            .collect();
        let descriptions: Vec<IgdbAgeRatingContentDescription> = ctx
            .lookup_as(RemoteKind::AgeRatingContentDescriptions, &description_refs)
            .await?;

        let organization_refs: Vec<i64> = ratings
            .iter()
            .map(|r| r.organization)
            .chain(descriptions.iter().map(|d| d.organization))
            .collect();
        fetch_ensure::<IgdbAgeRatingOrganization>(
            ctx,
            DimensionKind::AgeRatingOrganization,
            &organization_refs,
        )
        .await?;

        let rating_dims =
            fetch_ensure::<IgdbAgeRating>(ctx, DimensionKind::AgeRating, &raw.age_ratings).await?;
        let description_dims = fetch_ensure::<IgdbAgeRatingContentDescription>(
            ctx,
            DimensionKind::AgeRatingContentDescription,
            &description_refs,
        )
        .await?;

        let stored_ratings: HashSet<i64> = rating_dims.iter().map(|d| d.source_ref).collect();
        let stored_descriptions: HashSet<i64> =
            description_dims.iter().map(|d| d.source_ref).collect();
        let pairs = description_links(&ratings, &stored_ratings, &stored_descriptions);
        let linked = ctx.dimensions().link_age_rating_descriptions(&pairs).await?;
        debug!(
            source_ref = game.source_ref(),
            ratings = rating_dims.len(),
            new_links = linked,
            "age ratings resolved"
        );

        game.set_association(DimensionKind::AgeRating, rating_dims);
        Ok(())
    }
}
