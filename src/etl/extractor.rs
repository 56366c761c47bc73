use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::database_ops::igdb::models::IgdbGame;
use crate::database_ops::igdb::{RawRecord, SourceGateway, SourceQuery};

pub const GAMES_ENDPOINT: &str = "games";

/// Pages of raw game records under a fixed filter and sort. No retry here:
/// an extraction failure aborts the run.
pub struct Extractor {
    gateway: Arc<dyn SourceGateway>,
    filter: Option<String>,
    sort: Option<String>,
}

impl Extractor {
    pub fn new(
        gateway: Arc<dyn SourceGateway>,
        filter: Option<String>,
        sort: Option<String>,
    ) -> Self {
        Self {
            gateway,
            filter,
            sort,
        }
    }

    pub fn query(&self, offset: usize, limit: usize) -> SourceQuery {
        SourceQuery {
            fields: IgdbGame::FIELDS.iter().map(|f| f.to_string()).collect(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            limit,
            offset,
        }
    }

    #[instrument(skip(self))]
    pub async fn extract(&self, offset: usize, limit: usize) -> Result<Vec<RawRecord>> {
        let query = self.query(offset, limit);
        self.gateway
            .query(GAMES_ENDPOINT, &query)
            .await
            .with_context(|| format!("extracting games (offset={offset}, limit={limit})"))
    }
}
