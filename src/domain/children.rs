//! One-to-many child records of a [`Game`](super::Game).
//!
//! Child rows have no identity outside their parent game: they are replaced
//! wholesale (delete-then-insert) every time the game is persisted.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::SourceMeta;

#[derive(Debug, Clone, PartialEq)]
pub struct AltName {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub name: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvolvedCompany {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub company_id: Uuid,
    pub developer: bool,
    pub publisher: bool,
    pub porting: bool,
    pub supporting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseDate {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub platform_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub region_code: Option<i16>,
    pub category_code: Option<i16>,
    pub status_code: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Cover,
    Screenshot,
    Artwork,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Cover => "COVER",
            MediaKind::Screenshot => "SCREENSHOT",
            MediaKind::Artwork => "ARTWORK",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub kind: MediaKind,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub url: String,
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiplayerMode {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub campaign_coop: bool,
    pub drop_in: bool,
    pub lan_coop: bool,
    pub offline_coop: bool,
    pub offline_coop_max: Option<i16>,
    pub offline_max: Option<i16>,
    pub online_coop: bool,
    pub online_coop_max: Option<i16>,
    pub online_max: Option<i16>,
    pub splitscreen: bool,
    pub splitscreen_online: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSupport {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub language_code: i32,
    pub support_type_code: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_code: Option<i16>,
    pub order_index: Option<i32>,
    pub points: Option<i32>,
    pub secret: bool,
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Website {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub category_code: Option<i32>,
    pub url: String,
    pub trusted: bool,
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub meta: SourceMeta,
    pub game_id: Uuid,
    pub name: Option<String>,
    pub video_id: String,
    pub checksum: Option<String>,
}

/// Child collections of a game. `None` means the facet was not resolved in
/// this pass and the stored rows are left untouched; `Some` (even empty)
/// replaces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameChildren {
    pub alt_names: Option<Vec<AltName>>,
    pub companies: Option<Vec<InvolvedCompany>>,
    pub release_dates: Option<Vec<ReleaseDate>>,
    pub media_assets: Option<Vec<MediaAsset>>,
    pub multiplayer_modes: Option<Vec<MultiplayerMode>>,
    pub language_supports: Option<Vec<LanguageSupport>>,
    pub achievements: Option<Vec<Achievement>>,
    pub websites: Option<Vec<Website>>,
    pub videos: Option<Vec<Video>>,
}

impl GameChildren {
    /// Re-parents every child row onto `game_id`.
    pub fn adopt(&mut self, game_id: Uuid) {
        macro_rules! reparent {
            ($($field:ident),*) => {
                $(
                    if let Some(rows) = self.$field.as_mut() {
                        for row in rows.iter_mut() {
                            row.game_id = game_id;
                        }
                    }
                )*
            };
        }
        reparent!(
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
    }

    /// Game ids referenced by any child row; used to catch rows that were
    /// built before the parent key was known.
    pub fn referenced_game_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        macro_rules! collect {
            ($($field:ident),*) => {
                $(
                    if let Some(rows) = self.$field.as_ref() {
                        ids.extend(rows.iter().map(|r| r.game_id));
                    }
                )*
            };
        }
        collect!(
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
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
