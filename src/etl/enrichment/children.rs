//! Steps that attach one-to-many child records to the game.
//!
//! Id lookups can return rows owned by other games, so every step keeps only
//! rows whose `game` field matches the game being enriched.
use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::context::{fetch_ensure, EnrichmentContext};
use super::Enrichment;
use crate::database_ops::igdb::models::{
    code_i16, positive_i32, text, unix_ts, IgdbAchievement, IgdbAltName, IgdbCompany, IgdbGame,
    IgdbGameVideo, IgdbImage, IgdbInvolvedCompany, IgdbLanguageSupport, IgdbMultiplayerMode,
    IgdbPlatform, IgdbReleaseDate, IgdbWebsite, OwnedRecord,
};
use crate::database_ops::igdb::RemoteKind;
use crate::domain::{
    Achievement, AltName, DimensionKind, Game, InvolvedCompany, LanguageSupport, MediaAsset,
    MediaKind, MultiplayerMode, ReleaseDate, SourceMeta, Video, Website,
};

/// Rows of `kind` for `ids` that belong to `owner`.
pub async fn owned_rows<T>(
    ctx: &mut EnrichmentContext,
    kind: RemoteKind,
    ids: &[i64],
    owner: i64,
) -> Result<Vec<T>>
where
    T: DeserializeOwned + OwnedRecord + Send,
{
    let rows: Vec<T> = ctx.lookup_as(kind, ids).await?;
    let total = rows.len();
    let owned: Vec<T> = rows.into_iter().filter(|r| r.owner_ref() == owner).collect();
    if owned.len() < total {
        debug!(
            endpoint = kind.endpoint(),
            owner,
            dropped = total - owned.len(),
            "dropped rows owned by another game"
        );
    }
    Ok(owned)
}

/// Upgrades protocol-relative and plain-http media URLs to https.
pub fn normalize_media_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() {
        return None;
    }
    if let Some(rest) = url.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if let Some(rest) = url.strip_prefix("http://") {
        return Some(format!("https://{rest}"));
    }
    Some(url.to_string())
}

fn meta(id: i64, created_at: i64, updated_at: i64) -> SourceMeta {
    SourceMeta::with_times(id, unix_ts(created_at), unix_ts(updated_at))
}

fn resolved_ids(dims: &[crate::domain::Dimension]) -> HashMap<i64, Uuid> {
    dims.iter().map(|d| (d.source_ref, d.id)).collect()
}

pub struct Companies;

#[async_trait]
impl Enrichment for Companies {
    fn name(&self) -> &'static str {
        "companies"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let links: Vec<IgdbInvolvedCompany> = owned_rows(
            ctx,
            RemoteKind::InvolvedCompanies,
            &raw.involved_companies,
            game.source_ref(),
        )
        .await?;
        let company_refs: Vec<i64> = links.iter().map(|l| l.company).collect();
        let companies =
            fetch_ensure::<IgdbCompany>(ctx, DimensionKind::Company, &company_refs).await?;
        let by_ref = resolved_ids(&companies);

        let game_id = game.id;
        let rows: Vec<InvolvedCompany> = links
            .into_iter()
            .filter_map(|l| {
                let company_id = *by_ref.get(&l.company)?;
                Some(InvolvedCompany {
                    id: Uuid::new_v4(),
                    meta: meta(l.id, l.created_at, l.updated_at),
                    game_id,
                    company_id,
                    developer: l.developer,
                    publisher: l.publisher,
                    porting: l.porting,
                    supporting: l.supporting,
                })
            })
            .collect();
        game.children.companies = Some(rows);
        Ok(())
    }
}

pub struct AltNames;

#[async_trait]
impl Enrichment for AltNames {
    fn name(&self) -> &'static str {
        "alt_names"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let names: Vec<IgdbAltName> = owned_rows(
            ctx,
            RemoteKind::AlternativeNames,
            &raw.alternative_names,
            game.source_ref(),
        )
        .await?;
        let (game_id, now) = (game.id, game.ingested_at);
        let rows = names
            .into_iter()
            .filter_map(|n| {
                Some(AltName {
                    id: Uuid::new_v4(),
                    // alternative_names exposes no timestamps
                    meta: SourceMeta::with_times_or(n.id, None, None, now),
                    game_id,
                    name: text(&n.name)?,
                    comment: text(&n.comment),
                })
            })
            .collect();
        game.children.alt_names = Some(rows);
        Ok(())
    }
}

pub struct ReleaseDates;

#[async_trait]
impl Enrichment for ReleaseDates {
    fn name(&self) -> &'static str {
        "release_dates"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let dates: Vec<IgdbReleaseDate> = owned_rows(
            ctx,
            RemoteKind::ReleaseDates,
            &raw.release_dates,
            game.source_ref(),
        )
        .await?;
        let platform_refs: Vec<i64> = dates.iter().map(|d| d.platform).collect();
        let platforms =
            fetch_ensure::<IgdbPlatform>(ctx, DimensionKind::Platform, &platform_refs).await?;
        let by_ref = resolved_ids(&platforms);

        let game_id = game.id;
        let total = dates.len();
        let rows: Vec<ReleaseDate> = dates
            .into_iter()
            .filter_map(|d| {
                let platform_id = *by_ref.get(&d.platform)?;
                Some(ReleaseDate {
                    id: Uuid::new_v4(),
                    meta: meta(d.id, d.created_at, d.updated_at),
                    game_id,
                    platform_id,
                    date: unix_ts(d.date),
                    region_code: code_i16(d.region),
                    category_code: code_i16(d.category),
                    status_code: code_i16(d.status),
                })
            })
            .collect();
        if rows.len() < total {
            debug!(
                source_ref = game.source_ref(),
                dropped = total - rows.len(),
                "release dates without a resolvable platform"
            );
        }
        game.children.release_dates = Some(rows);
        Ok(())
    }
}

/// Cover, screenshots and artworks.
pub struct Media;

#[async_trait]
impl Enrichment for Media {
    fn name(&self) -> &'static str {
        "media"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let sources = [
            (MediaKind::Cover, RemoteKind::Covers, raw.cover_ids()),
            (MediaKind::Screenshot, RemoteKind::Screenshots, raw.screenshots.clone()),
            (MediaKind::Artwork, RemoteKind::Artworks, raw.artworks.clone()),
        ];
        let owner = game.source_ref();
        let mut seen: HashSet<(MediaKind, i64)> = HashSet::new();
        let mut assets = Vec::new();
        for (kind, remote, ids) in sources {
            let images: Vec<IgdbImage> = owned_rows(ctx, remote, &ids, owner).await?;
            for img in images {
                if !seen.insert((kind, img.id)) {
                    continue;
                }
                let Some(url) = normalize_media_url(&img.url) else {
                    continue;
                };
                assets.push(MediaAsset {
                    id: Uuid::new_v4(),
                    meta: SourceMeta::new(img.id),
                    game_id: game.id,
                    kind,
                    width: positive_i32(img.width),
                    height: positive_i32(img.height),
                    url,
                    checksum: text(&img.checksum),
                });
            }
        }
        game.children.media_assets = Some(assets);
        Ok(())
    }
}

pub struct MultiplayerModes;

#[async_trait]
impl Enrichment for MultiplayerModes {
    fn name(&self) -> &'static str {
        "multiplayer_modes"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let modes: Vec<IgdbMultiplayerMode> = owned_rows(
            ctx,
            RemoteKind::MultiplayerModes,
            &raw.multiplayer_modes,
            game.source_ref(),
        )
        .await?;
        let (game_id, now) = (game.id, game.ingested_at);
        let rows = modes
            .into_iter()
            .map(|m| MultiplayerMode {
                id: Uuid::new_v4(),
                meta: SourceMeta::with_times_or(m.id, None, None, now),
                game_id,
                campaign_coop: m.campaigncoop,
                drop_in: m.dropin,
                lan_coop: m.lancoop,
                offline_coop: m.offlinecoop,
                offline_coop_max: code_i16(m.offlinecoopmax),
                offline_max: code_i16(m.offlinemax),
                online_coop: m.onlinecoop,
                online_coop_max: code_i16(m.onlinecoopmax),
                online_max: code_i16(m.onlinemax),
                splitscreen: m.splitscreen,
                splitscreen_online: m.splitscreenonline,
            })
            .collect();
        game.children.multiplayer_modes = Some(rows);
        Ok(())
    }
}

pub struct LanguageSupports;

#[async_trait]
impl Enrichment for LanguageSupports {
    fn name(&self) -> &'static str {
        "language_supports"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let supports: Vec<IgdbLanguageSupport> = owned_rows(
            ctx,
            RemoteKind::LanguageSupports,
            &raw.language_supports,
            game.source_ref(),
        )
        .await?;
        let game_id = game.id;
        let rows = supports
            .into_iter()
            .filter_map(|s| {
                Some(LanguageSupport {
                    id: Uuid::new_v4(),
                    meta: meta(s.id, s.created_at, s.updated_at),
                    game_id,
                    language_code: positive_i32(s.language)?,
                    support_type_code: positive_i32(s.language_support_type)?,
                })
            })
            .collect();
        game.children.language_supports = Some(rows);
        Ok(())
    }
}

pub struct Achievements;

#[async_trait]
impl Enrichment for Achievements {
    fn name(&self) -> &'static str {
        "achievements"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let achievements: Vec<IgdbAchievement> = owned_rows(
            ctx,
            RemoteKind::Achievements,
            &raw.achievements,
            game.source_ref(),
        )
        .await?;
        let game_id = game.id;
        let rows = achievements
            .into_iter()
            .filter_map(|a| {
                Some(Achievement {
                    id: Uuid::new_v4(),
                    meta: meta(a.id, a.created_at, a.updated_at),
                    game_id,
                    name: text(&a.name)?,
                    slug: text(&a.slug),
                    description: text(&a.description),
                    category_code: code_i16(a.category),
                    order_index: i32::try_from(a.order).ok().filter(|o| *o != 0),
                    points: positive_i32(a.points),
                    secret: a.hidden,
                    checksum: text(&a.checksum),
                })
            })
            .collect();
        game.children.achievements = Some(rows);
        Ok(())
    }
}

pub struct Websites;

#[async_trait]
impl Enrichment for Websites {
    fn name(&self) -> &'static str {
        "websites"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let sites: Vec<IgdbWebsite> =
            owned_rows(ctx, RemoteKind::Websites, &raw.websites, game.source_ref()).await?;
        let game_id = game.id;
        let rows = sites
            .into_iter()
            .filter_map(|w| {
                Some(Website {
                    id: Uuid::new_v4(),
                    meta: meta(w.id, w.created_at, w.updated_at),
                    game_id,
                    category_code: positive_i32(w.category),
                    url: text(&w.url)?,
                    trusted: w.trusted,
                    checksum: text(&w.checksum),
                })
            })
            .collect();
        game.children.websites = Some(rows);
        Ok(())
    }
}

pub struct Videos;

#[async_trait]
impl Enrichment for Videos {
    fn name(&self) -> &'static str {
        "videos"
    }

    async fn enrich(
        &self,
        ctx: &mut EnrichmentContext,
        game: &mut Game,
        raw: &IgdbGame,
    ) -> Result<()> {
        let videos: Vec<IgdbGameVideo> =
            owned_rows(ctx, RemoteKind::GameVideos, &raw.videos, game.source_ref()).await?;
        let game_id = game.id;
        let rows = videos
            .into_iter()
            .filter_map(|v| {
                Some(Video {
                    id: Uuid::new_v4(),
                    meta: meta(v.id, v.created_at, v.updated_at),
                    game_id,
                    name: text(&v.name),
                    video_id: text(&v.video_id)?,
                    checksum: text(&v.checksum),
                })
            })
            .collect();
        game.children.videos = Some(rows);
        Ok(())
    }
}
