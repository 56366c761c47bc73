use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database_ops::igdb::RemoteKind;

/// Shared lookup tables keyed by their own natural key (`source_ref`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimensionKind {
    Genre,
    Theme,
    Keyword,
    GameMode,
    PlayerPerspective,
    Franchise,
    Collection,
    Platform,
    Company,
    AgeRating,
    AgeRatingOrganization,
    AgeRatingContentDescription,
}

impl DimensionKind {
    pub fn as_str(&self) -> &'static str {
        self.table()
    }

    pub fn table(&self) -> &'static str {
        match self {
            DimensionKind::Genre => "genre",
            DimensionKind::Theme => "theme",
            DimensionKind::Keyword => "keyword",
            DimensionKind::GameMode => "game_mode",
            DimensionKind::PlayerPerspective => "player_perspective",
            DimensionKind::Franchise => "franchise",
            DimensionKind::Collection => "collection",
            DimensionKind::Platform => "platform",
            DimensionKind::Company => "company",
            DimensionKind::AgeRating => "age_rating",
            DimensionKind::AgeRatingOrganization => "age_rating_organization",
            DimensionKind::AgeRatingContentDescription => "age_rating_content_description",
        }
    }

    /// Surrogate key column of the dimension table.
    pub fn id_column(&self) -> &'static str {
        match self {
            DimensionKind::Genre => "genre_id",
            DimensionKind::Theme => "theme_id",
            DimensionKind::Keyword => "keyword_id",
            DimensionKind::GameMode => "game_mode_id",
            DimensionKind::PlayerPerspective => "player_perspective_id",
            DimensionKind::Franchise => "franchise_id",
            DimensionKind::Collection => "collection_id",
            DimensionKind::Platform => "platform_id",
            DimensionKind::Company => "company_id",
            DimensionKind::AgeRating => "age_rating_id",
            DimensionKind::AgeRatingOrganization => "age_rating_organization_id",
            DimensionKind::AgeRatingContentDescription => "age_rating_content_description_id",
        }
    }

    /// Game link table; `None` for kinds never associated with a game directly.
    pub fn game_link_table(&self) -> Option<&'static str> {
        match self {
            DimensionKind::Genre => Some("game_genre"),
            DimensionKind::Theme => Some("game_theme"),
            DimensionKind::Keyword => Some("game_keyword"),
            DimensionKind::GameMode => Some("game_mode_link"),
            DimensionKind::PlayerPerspective => Some("game_player_perspective"),
            DimensionKind::Franchise => Some("game_franchise"),
            DimensionKind::Collection => Some("game_collection"),
            DimensionKind::Platform => Some("game_platform"),
            DimensionKind::AgeRating => Some("game_age_rating"),
            DimensionKind::Company
            | DimensionKind::AgeRatingOrganization
            | DimensionKind::AgeRatingContentDescription => None,
        }
    }

    pub fn remote(&self) -> RemoteKind {
        match self {
            DimensionKind::Genre => RemoteKind::Genres,
            DimensionKind::Theme => RemoteKind::Themes,
            DimensionKind::Keyword => RemoteKind::Keywords,
            DimensionKind::GameMode => RemoteKind::GameModes,
            DimensionKind::PlayerPerspective => RemoteKind::PlayerPerspectives,
            DimensionKind::Franchise => RemoteKind::Franchises,
            DimensionKind::Collection => RemoteKind::Collections,
            DimensionKind::Platform => RemoteKind::Platforms,
            DimensionKind::Company => RemoteKind::Companies,
            DimensionKind::AgeRating => RemoteKind::AgeRatings,
            DimensionKind::AgeRatingOrganization => RemoteKind::AgeRatingOrganizations,
            DimensionKind::AgeRatingContentDescription => {
                RemoteKind::AgeRatingContentDescriptions
            }
        }
    }
}

impl std::fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dimension row as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub id: Uuid,
    pub kind: DimensionKind,
    pub source_ref: i64,
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// Kind-specific mutable columns carried by a [`DimensionRow`].
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionAttrs {
    Named,
    Platform {
        abbreviation: Option<String>,
        generation: Option<i16>,
        category_code: Option<i16>,
    },
    Company {
        country: Option<i16>,
        description: Option<String>,
    },
    AgeRating {
        organization_code: Option<i64>,
        rating_code: Option<i64>,
        synopsis: Option<String>,
    },
    AgeRatingOrganization {
        checksum: Option<String>,
    },
    AgeRatingContentDescription {
        /// Natural key of the owning organization; resolved to its surrogate key on upsert.
        organization_ref: Option<i64>,
        description_type: Option<i64>,
        checksum: Option<String>,
    },
}

/// Upsert payload for one dimension row. The surrogate key is assigned by the
/// store on first insert and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRow {
    pub kind: DimensionKind,
    pub source_ref: i64,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub created_at_source: Option<DateTime<Utc>>,
    pub updated_at_source: Option<DateTime<Utc>>,
    pub attrs: DimensionAttrs,
}
