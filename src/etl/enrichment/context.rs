//! Run-scoped resolution state shared by every enrichment step, plus the
//! generic fetch-ensure algorithm used to materialise dimension rows.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::database_ops::igdb::models::{
    code_i16, text, unix_ts, IgdbAgeRating, IgdbAgeRatingContentDescription,
    IgdbAgeRatingOrganization, IgdbCompany, IgdbNamed, IgdbPlatform,
};
use crate::database_ops::igdb::{RawRecord, RemoteKind, SourceGateway};
use crate::database_ops::store::DimensionStore;
use crate::domain::{Dimension, DimensionAttrs, DimensionKind, DimensionRow};

/// Positive ids, first occurrence order, no duplicates.
pub fn normalize_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().filter(|id| *id > 0).unique().collect()
}

fn record_id(raw: &RawRecord) -> Option<i64> {
    raw.get("id").and_then(|v| v.as_i64())
}

/// Gateway and dimension-store handles plus one raw-row cache per remote kind.
/// Built fresh for every pipeline run and never shared between runs.
pub struct EnrichmentContext {
    gateway: Arc<dyn SourceGateway>,
    dimensions: Arc<dyn DimensionStore>,
    cache: HashMap<RemoteKind, HashMap<i64, RawRecord>>,
    degraded: HashSet<RemoteKind>,
}

impl EnrichmentContext {
    pub fn new(gateway: Arc<dyn SourceGateway>, dimensions: Arc<dyn DimensionStore>) -> Self {
        Self {
            gateway,
            dimensions,
            cache: HashMap::new(),
            degraded: HashSet::new(),
        }
    }

    pub fn dimensions(&self) -> &dyn DimensionStore {
        self.dimensions.as_ref()
    }

    /// Raw rows of `kind` for `ids`, in requested order. Only ids missing from
    /// the cache go to the remote; ids the remote does not know are absent.
    pub async fn lookup(&mut self, kind: RemoteKind, ids: &[i64]) -> Result<Vec<RawRecord>> {
        let ids = normalize_ids(ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let missing: Vec<i64> = {
            let cached = self.cache.entry(kind).or_default();
            ids.iter().copied().filter(|id| !cached.contains_key(id)).collect()
        };
        if !missing.is_empty() {
            let fetched = self.fetch_remote(kind, &missing).await?;
            let cached = self.cache.entry(kind).or_default();
            for raw in fetched {
                if let Some(id) = record_id(&raw) {
                    cached.insert(id, raw);
                }
            }
        }
        let cached = self.cache.entry(kind).or_default();
        Ok(ids.iter().filter_map(|id| cached.get(id).cloned()).collect())
    }

    /// [`lookup`](Self::lookup) decoded into a wire model.
    pub async fn lookup_as<T: DeserializeOwned>(
        &mut self,
        kind: RemoteKind,
        ids: &[i64],
    ) -> Result<Vec<T>> {
        self.lookup(kind, ids)
            .await?
            .into_iter()
            .map(|raw| {
                serde_json::from_value(raw)
                    .with_context(|| format!("decoding {} row", kind.endpoint()))
            })
            .collect()
    }

    /// Id lookup with the degraded-field fallback: an unsupported-field
    /// rejection is retried once without provenance fields, and the kind stays
    /// degraded for the rest of the run.
    async fn fetch_remote(&mut self, kind: RemoteKind, ids: &[i64]) -> Result<Vec<RawRecord>> {
        let endpoint = kind.endpoint();
        if self.degraded.contains(&kind) {
            if let Some(reduced) = kind.reduced_fields() {
                return self
                    .gateway
                    .lookup_by_ids(endpoint, ids, &reduced)
                    .await
                    .with_context(|| format!("looking up {endpoint} (reduced fields)"));
            }
        }
        match self.gateway.lookup_by_ids(endpoint, ids, kind.fields()).await {
            Ok(rows) => Ok(rows),
            Err(err) if err.is_unsupported_field() => {
                let reduced = kind
                    .reduced_fields()
                    .ok_or_else(|| anyhow!(err))
                    .with_context(|| format!("{endpoint} has no reduced field list"))?;
                warn!(
                    endpoint,
                    "remote rejected provenance fields; retrying with reduced field list"
                );
                let rows = self
                    .gateway
                    .lookup_by_ids(endpoint, ids, &reduced)
                    .await
                    .with_context(|| format!("looking up {endpoint} (reduced fields)"))?;
                self.degraded.insert(kind);
                Ok(rows)
            }
            Err(err) => Err(err).with_context(|| format!("looking up {endpoint}")),
        }
    }
}

/// A remote row that materialises as a dimension.
pub trait RemoteDimension: DeserializeOwned {
    fn source_ref(&self) -> i64;
    fn into_row(self, kind: DimensionKind) -> DimensionRow;
}

/// Resolves `ids` of `kind` to stored dimension rows, creating any the store
/// does not know yet from their remote representation. The result is a fresh
/// read of the requested ids, so repeated calls converge on the same rows.
pub async fn fetch_ensure<T: RemoteDimension>(
    ctx: &mut EnrichmentContext,
    kind: DimensionKind,
    ids: &[i64],
) -> Result<Vec<Dimension>> {
    let requested = normalize_ids(ids);
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let existing = ctx
        .dimensions
        .dimensions_by_source_refs(kind, &requested)
        .await?;
    let known: HashSet<i64> = existing.iter().map(|d| d.source_ref).collect();
    let missing: Vec<i64> = requested
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect();
    if missing.is_empty() {
        return Ok(existing);
    }

    let fetched: Vec<T> = ctx.lookup_as(kind.remote(), &missing).await?;
    let rows: Vec<DimensionRow> = fetched
        .into_iter()
        .filter(|r| missing.contains(&r.source_ref()))
        .map(|r| r.into_row(kind))
        .collect();
    if rows.len() < missing.len() {
        debug!(
            %kind,
            requested = missing.len(),
            returned = rows.len(),
            "remote did not return every missing dimension"
        );
    }
    ctx.dimensions.upsert_dimensions(&rows).await?;

    ctx.dimensions
        .dimensions_by_source_refs(kind, &requested)
        .await
}

impl RemoteDimension for IgdbNamed {
    fn source_ref(&self) -> i64 {
        self.id
    }

    fn into_row(self, kind: DimensionKind) -> DimensionRow {
        DimensionRow {
            kind,
            source_ref: self.id,
            name: text(&self.name),
            slug: text(&self.slug),
            created_at_source: unix_ts(self.created_at),
            updated_at_source: unix_ts(self.updated_at),
            attrs: DimensionAttrs::Named,
        }
    }
}

impl RemoteDimension for IgdbPlatform {
    fn source_ref(&self) -> i64 {
        self.id
    }

    fn into_row(self, kind: DimensionKind) -> DimensionRow {
        DimensionRow {
            kind,
            source_ref: self.id,
            name: text(&self.name),
            slug: text(&self.slug),
            created_at_source: unix_ts(self.created_at),
            updated_at_source: unix_ts(self.updated_at),
            attrs: DimensionAttrs::Platform {
                abbreviation: text(&self.abbreviation),
                generation: code_i16(self.generation),
                category_code: code_i16(self.category),
            },
        }
    }
}

impl RemoteDimension for IgdbCompany {
    fn source_ref(&self) -> i64 {
        self.id
    }

    fn into_row(self, kind: DimensionKind) -> DimensionRow {
        DimensionRow {
            kind,
            source_ref: self.id,
            name: text(&self.name),
            slug: text(&self.slug),
            created_at_source: unix_ts(self.created_at),
            updated_at_source: unix_ts(self.updated_at),
            attrs: DimensionAttrs::Company {
                country: code_i16(self.country),
                description: text(&self.description),
            },
        }
    }
}

impl RemoteDimension for IgdbAgeRating {
    fn source_ref(&self) -> i64 {
        self.id
    }

    fn into_row(self, kind: DimensionKind) -> DimensionRow {
        DimensionRow {
            kind,
            source_ref: self.id,
            name: None,
            slug: None,
            created_at_source: unix_ts(self.created_at),
            updated_at_source: unix_ts(self.updated_at),
            attrs: DimensionAttrs::AgeRating {
                organization_code: (self.organization > 0).then_some(self.organization),
                rating_code: (self.rating_category > 0).then_some(self.rating_category),
                synopsis: text(&self.synopsis),
            },
        }
    }
}

impl RemoteDimension for IgdbAgeRatingOrganization {
    fn source_ref(&self) -> i64 {
        self.id
    }

    fn into_row(self, kind: DimensionKind) -> DimensionRow {
        DimensionRow {
            kind,
            source_ref: self.id,
            name: text(&self.name),
            slug: None,
            created_at_source: unix_ts(self.created_at),
            updated_at_source: unix_ts(self.updated_at),
            attrs: DimensionAttrs::AgeRatingOrganization {
                checksum: text(&self.checksum),
            },
        }
    }
}

impl RemoteDimension for IgdbAgeRatingContentDescription {
    fn source_ref(&self) -> i64 {
        self.id
    }

    fn into_row(self, kind: DimensionKind) -> DimensionRow {
        DimensionRow {
            kind,
            source_ref: self.id,
            name: text(&self.description),
            slug: None,
            created_at_source: unix_ts(self.created_at),
            updated_at_source: unix_ts(self.updated_at),
            attrs: DimensionAttrs::AgeRatingContentDescription {
                organization_ref: (self.organization > 0).then_some(self.organization),
                description_type: (self.description_type > 0).then_some(self.description_type),
                checksum: text(&self.checksum),
            },
        }
    }
}
