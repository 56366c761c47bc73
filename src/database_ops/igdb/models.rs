//! Wire shapes of the IGDB endpoints we read. IGDB omits unset fields, so
//! every struct defaults to zero values; [`unix_ts`] and [`text`] turn those
//! zero values into absences.
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Unix seconds to a UTC timestamp; `0` means unset.
pub fn unix_ts(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

/// Trimmed text; blank means unset.
pub fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Small positive codes (categories, counts) as `i16`; zero or out-of-range means unset.
pub fn code_i16(raw: i64) -> Option<i16> {
    if raw == 0 {
        return None;
    }
    i16::try_from(raw).ok()
}

pub fn positive_i32(raw: i64) -> Option<i32> {
    if raw <= 0 {
        return None;
    }
    i32::try_from(raw).ok()
}

/// A sub-resource that names its owning game.
pub trait OwnedRecord {
    fn owner_ref(&self) -> i64;
}

macro_rules! owned_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl OwnedRecord for $ty {
                fn owner_ref(&self) -> i64 {
                    self.game
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbGame {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub storyline: String,
    pub category: i64,
    pub status: i64,
    pub first_release_date: i64,
    pub total_rating: f64,
    pub total_rating_count: i64,
    pub aggregated_rating: f64,
    pub aggregated_rating_count: i64,
    pub popularity: f64,
    pub parent_game: i64,
    pub genres: Vec<i64>,
    pub themes: Vec<i64>,
    pub keywords: Vec<i64>,
    pub game_modes: Vec<i64>,
    pub player_perspectives: Vec<i64>,
    pub franchises: Vec<i64>,
    pub collections: Vec<i64>,
    pub platforms: Vec<i64>,
    pub involved_companies: Vec<i64>,
    pub alternative_names: Vec<i64>,
    pub release_dates: Vec<i64>,
    pub cover: i64,
    pub screenshots: Vec<i64>,
    pub artworks: Vec<i64>,
    pub multiplayer_modes: Vec<i64>,
    pub language_supports: Vec<i64>,
    pub age_ratings: Vec<i64>,
    pub achievements: Vec<i64>,
    pub websites: Vec<i64>,
    pub videos: Vec<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl IgdbGame {
    /// Field selection for the primary extraction query.
    pub const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "summary",
        "storyline",
        "category",
        "status",
        "first_release_date",
        "total_rating",
        "total_rating_count",
        "aggregated_rating",
        "aggregated_rating_count",
        "keywords",
        "genres",
        "themes",
        "game_modes",
        "player_perspectives",
        "collections",
        "franchises",
        "parent_game",
        "platforms",
        "involved_companies",
        "alternative_names",
        "release_dates",
        "screenshots",
        "artworks",
        "cover",
        "videos",
        "websites",
        "multiplayer_modes",
        "language_supports",
        "age_ratings",
        "achievements",
        "created_at",
        "updated_at",
    ];

    pub fn from_raw(raw: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(raw)
    }

    pub fn cover_ids(&self) -> Vec<i64> {
        if self.cover > 0 {
            vec![self.cover]
        } else {
            Vec::new()
        }
    }
}

/// Genres, themes, keywords, game modes, perspectives, franchises, collections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbNamed {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbPlatform {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub abbreviation: String,
    pub generation: i64,
    pub category: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbCompany {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub country: i64,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbInvolvedCompany {
    pub id: i64,
    pub game: i64,
    pub company: i64,
    pub developer: bool,
    pub publisher: bool,
    pub porting: bool,
    pub supporting: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbAltName {
    pub id: i64,
    pub game: i64,
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbReleaseDate {
    pub id: i64,
    pub game: i64,
    pub platform: i64,
    pub date: i64,
    pub region: i64,
    pub category: i64,
    pub status: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Covers, screenshots and artworks share one shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbImage {
    pub id: i64,
    pub game: i64,
    pub width: i64,
    pub height: i64,
    pub url: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbMultiplayerMode {
    pub id: i64,
    pub game: i64,
    pub campaigncoop: bool,
    pub dropin: bool,
    pub lancoop: bool,
    pub offlinecoop: bool,
    pub offlinecoopmax: i64,
    pub offlinemax: i64,
    pub onlinecoop: bool,
    pub onlinecoopmax: i64,
    pub onlinemax: i64,
    pub splitscreen: bool,
    pub splitscreenonline: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbLanguageSupport {
    pub id: i64,
    pub game: i64,
    pub language: i64,
    pub language_support_type: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbAgeRating {
    pub id: i64,
    pub organization: i64,
    pub rating_category: i64,
    pub synopsis: String,
    pub rating_content_descriptions: Vec<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbAgeRatingOrganization {
    pub id: i64,
    pub name: String,
    pub checksum: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbAgeRatingContentDescription {
    pub id: i64,
    pub organization: i64,
    pub description: String,
    pub description_type: i64,
    pub checksum: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbAchievement {
    pub id: i64,
    pub game: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: i64,
    pub order: i64,
    pub points: i64,
    pub hidden: bool,
    pub checksum: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbWebsite {
    pub id: i64,
    pub game: i64,
    pub category: i64,
    pub url: String,
    pub trusted: bool,
    pub checksum: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IgdbGameVideo {
    pub id: i64,
    pub game: i64,
    pub name: String,
    pub video_id: String,
    pub checksum: String,
    pub created_at: i64,
    pub updated_at: i64,
}

owned_record!(
    IgdbInvolvedCompany,
    IgdbAltName,
    IgdbReleaseDate,
    IgdbImage,
    IgdbMultiplayerMode,
    IgdbLanguageSupport,
    IgdbAchievement,
    IgdbWebsite,
    IgdbGameVideo,
);
