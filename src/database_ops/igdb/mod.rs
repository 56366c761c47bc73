//! Remote Source Gateway: the IGDB query API seen through a narrow port.
pub mod client;
pub mod models;

use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;

pub use client::{IgdbService, IgdbServiceConfig};

/// Loosely-typed payload row as returned by the remote API.
pub type RawRecord = Value;

/// Errors surfaced by a [`SourceGateway`]. `UnsupportedField` is kept
/// distinct so callers can degrade their field list and retry.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{endpoint} rejected the requested fields: {message}")]
    UnsupportedField { endpoint: String, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{endpoint} request failed (status={status}): {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode {endpoint} payload: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    pub fn is_unsupported_field(&self) -> bool {
        matches!(self, GatewayError::UnsupportedField { .. })
    }
}

/// A paged, field-selecting query against one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub fields: Vec<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl SourceQuery {
    /// Renders the query in the remote query language.
    pub fn to_body(&self) -> String {
        let mut body = format!("fields {};", self.fields.iter().join(","));
        if let Some(filter) = self.filter.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            body.push_str(&format!(" where {filter};"));
        }
        if let Some(sort) = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            body.push_str(&format!(" sort {sort};"));
        }
        body.push_str(&format!(" limit {}; offset {};", self.limit, self.offset));
        body
    }
}

/// Renders an id-list lookup body.
pub fn lookup_body(ids: &[i64], fields: &[&str]) -> String {
    format!(
        "fields {}; where id = ({}); limit {};",
        fields.iter().join(","),
        ids.iter().join(","),
        ids.len()
    )
}

#[async_trait]
pub trait SourceGateway: Send + Sync {
    /// Paged query with an optional filter and sort expression.
    async fn query(
        &self,
        endpoint: &str,
        query: &SourceQuery,
    ) -> Result<Vec<RawRecord>, GatewayError>;

    /// Rows of `endpoint` whose natural id is in `ids`.
    async fn lookup_by_ids(
        &self,
        endpoint: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<RawRecord>, GatewayError>;
}

const PROVENANCE_FIELDS: [&str; 2] = ["created_at", "updated_at"];

/// Every remote endpoint the enrichment reads, with its field selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteKind {
    Genres,
    Themes,
    Keywords,
    GameModes,
    PlayerPerspectives,
    Franchises,
    Collections,
    Platforms,
    Companies,
    InvolvedCompanies,
    AlternativeNames,
    ReleaseDates,
    Covers,
    Screenshots,
    Artworks,
    MultiplayerModes,
    LanguageSupports,
    AgeRatings,
    AgeRatingOrganizations,
    AgeRatingContentDescriptions,
    Achievements,
    Websites,
    GameVideos,
}

impl RemoteKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            RemoteKind::Genres => "genres",
            RemoteKind::Themes => "themes",
            RemoteKind::Keywords => "keywords",
            RemoteKind::GameModes => "game_modes",
            RemoteKind::PlayerPerspectives => "player_perspectives",
            RemoteKind::Franchises => "franchises",
            RemoteKind::Collections => "collections",
            RemoteKind::Platforms => "platforms",
            RemoteKind::Companies => "companies",
            RemoteKind::InvolvedCompanies => "involved_companies",
            RemoteKind::AlternativeNames => "alternative_names",
            RemoteKind::ReleaseDates => "release_dates",
            RemoteKind::Covers => "covers",
            RemoteKind::Screenshots => "screenshots",
            RemoteKind::Artworks => "artworks",
            RemoteKind::MultiplayerModes => "multiplayer_modes",
            RemoteKind::LanguageSupports => "language_supports",
            RemoteKind::AgeRatings => "age_ratings",
            RemoteKind::AgeRatingOrganizations => "age_rating_organizations",
            RemoteKind::AgeRatingContentDescriptions => "age_rating_content_descriptions_v2",
            RemoteKind::Achievements => "achievements",
            RemoteKind::Websites => "websites",
            RemoteKind::GameVideos => "game_videos",
        }
    }

    /// Full field selection, provenance timestamps included where the
    /// endpoint normally exposes them.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            RemoteKind::Genres
            | RemoteKind::Themes
            | RemoteKind::Keywords
            | RemoteKind::GameModes
            | RemoteKind::PlayerPerspectives
            | RemoteKind::Franchises
            | RemoteKind::Collections => &["id", "name", "slug", "created_at", "updated_at"],
            RemoteKind::Platforms => &[
                "id",
                "name",
                "slug",
                "abbreviation",
                "generation",
                "category",
                "created_at",
                "updated_at",
            ],
            RemoteKind::Companies => &[
                "id",
                "name",
                "slug",
                "country",
                "description",
                "created_at",
                "updated_at",
            ],
            RemoteKind::InvolvedCompanies => &[
                "id",
                "company",
                "game",
                "developer",
                "publisher",
                "porting",
                "supporting",
                "created_at",
                "updated_at",
            ],
            RemoteKind::AlternativeNames => &["id", "game", "name", "comment"],
            RemoteKind::ReleaseDates => &[
                "id",
                "game",
                "platform",
                "date",
                "region",
                "category",
                "status",
                "created_at",
                "updated_at",
            ],
            RemoteKind::Covers | RemoteKind::Screenshots | RemoteKind::Artworks => {
                &["id", "game", "width", "height", "url", "checksum"]
            }
            RemoteKind::MultiplayerModes => &[
                "id",
                "game",
                "campaigncoop",
                "dropin",
                "lancoop",
                "offlinecoop",
                "offlinecoopmax",
                "offlinemax",
                "onlinecoop",
                "onlinecoopmax",
                "onlinemax",
                "splitscreen",
                "splitscreenonline",
            ],
            RemoteKind::LanguageSupports => &[
                "id",
                "game",
                "language",
                "language_support_type",
                "created_at",
                "updated_at",
            ],
            RemoteKind::AgeRatings => &[
                "id",
                "organization",
                "rating_category",
                "synopsis",
                "rating_content_descriptions",
                "created_at",
                "updated_at",
            ],
            RemoteKind::AgeRatingOrganizations => {
                &["id", "name", "checksum", "created_at", "updated_at"]
            }
            RemoteKind::AgeRatingContentDescriptions => &[
                "id",
                "organization",
                "description",
                "description_type",
                "checksum",
                "created_at",
                "updated_at",
            ],
            RemoteKind::Achievements => &[
                "id",
                "game",
                "name",
                "slug",
                "description",
                "category",
                "order",
                "points",
                "hidden",
                "checksum",
                "created_at",
                "updated_at",
            ],
            RemoteKind::Websites => &[
                "id",
                "game",
                "category",
                "url",
                "trusted",
                "checksum",
                "created_at",
                "updated_at",
            ],
            RemoteKind::GameVideos => &[
                "id",
                "game",
                "name",
                "video_id",
                "checksum",
                "created_at",
                "updated_at",
            ],
        }
    }

    /// Degraded selection used after an unsupported-field rejection. `None`
    /// when there is nothing to drop.
    pub fn reduced_fields(&self) -> Option<Vec<&'static str>> {
        let full = self.fields();
        let reduced: Vec<&'static str> = full
            .iter()
            .copied()
            .filter(|f| !PROVENANCE_FIELDS.contains(f))
            .collect();
        (reduced.len() < full.len()).then_some(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_paged_query_body() {
        let q = SourceQuery {
            fields: vec!["id".into(), "name".into()],
            filter: Some("rating > 60".into()),
            sort: Some("id asc".into()),
            limit: 500,
            offset: 1000,
        };
        assert_eq!(
            q.to_body(),
            "fields id,name; where rating > 60; sort id asc; limit 500; offset 1000;"
        );
    }

    #[test]
    fn blank_filter_is_omitted() {
        let q = SourceQuery {
            fields: vec!["id".into()],
            filter: Some("  ".into()),
            sort: None,
            limit: 10,
            offset: 0,
        };
        assert_eq!(q.to_body(), "fields id; limit 10; offset 0;");
    }

    #[test]
    fn renders_lookup_body() {
        assert_eq!(
            lookup_body(&[3, 5, 8], &["id", "name"]),
            "fields id,name; where id = (3,5,8); limit 3;"
        );
    }

    #[test]
    fn reduced_fields_drop_provenance_only() {
        let reduced = RemoteKind::AgeRatings.reduced_fields().unwrap();
        assert!(!reduced.contains(&"created_at"));
        assert!(!reduced.contains(&"updated_at"));
        assert!(reduced.contains(&"rating_content_descriptions"));
        assert!(RemoteKind::AlternativeNames.reduced_fields().is_none());
        assert!(RemoteKind::Covers.reduced_fields().is_none());
    }
}
