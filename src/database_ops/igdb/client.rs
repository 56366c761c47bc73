use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{lookup_body, GatewayError, RawRecord, SourceGateway, SourceQuery};
use crate::util::env::{env_opt, env_parse, env_req};

const DEFAULT_BASE_URL: &str = "https://api.igdb.com/v4";
const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_USER_AGENT: &str = "igdb-catalog-sync/1.0";
/// Largest `limit` the query API accepts.
pub const IGDB_MAX_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct IgdbServiceConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub token_url: String,
    pub user_agent: String,
    pub reqs_per_min: Option<u32>,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl IgdbServiceConfig {
    pub fn from_env() -> Result<Self> {
        let client_id = env_req("TWITCH_CLIENT_ID").context("IGDB requires a Twitch client id")?;
        let client_secret =
            env_req("TWITCH_CLIENT_SECRET").context("IGDB requires a Twitch client secret")?;
        let reqs_per_min = env_parse("IGDB_REQS_PER_MIN", 240u32);
        Ok(Self {
            client_id,
            client_secret,
            base_url: env_opt("IGDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token_url: env_opt("TWITCH_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            user_agent: env_opt("IGDB_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            reqs_per_min: (reqs_per_min > 0).then_some(reqs_per_min),
            max_retries: env_parse("IGDB_MAX_RETRIES", 3u32),
            backoff_ms: env_parse("IGDB_BACKOFF_MS", 1000u64),
        })
    }

    pub fn sleep_ms_between_requests(&self) -> Option<u64> {
        self.reqs_per_min
            .filter(|rpm| *rpm > 0)
            .map(|rpm| 60_000u64 / rpm as u64)
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct TwitchTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct IgdbToken {
    access_token: String,
    expires_at: Instant,
}

/// HTTP gateway to the IGDB v4 API with app-token auth, request pacing and
/// retry on throttling or server errors.
pub struct IgdbService {
    cfg: IgdbServiceConfig,
    http: Client,
    token: Arc<Mutex<Option<IgdbToken>>>,
}

impl IgdbService {
    pub fn new(cfg: IgdbServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("failed to construct IGDB HTTP client")?;
        Ok(Self {
            cfg,
            http,
            token: Arc::new(Mutex::new(None)),
        })
    }

    pub fn new_from_env() -> Result<Self> {
        Self::new(IgdbServiceConfig::from_env()?)
    }

    async fn throttle(&self) {
        if let Some(ms) = self.cfg.sleep_ms_between_requests() {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    async fn ensure_token(&self) -> Result<String, GatewayError> {
        {
            let guard = self.token.lock().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Instant::now() + Duration::from_secs(30) {
                    return Ok(token.access_token.clone());
                }
            }
        }
        let token = self.request_new_token().await?;
        let mut guard = self.token.lock().await;
        *guard = Some(token.clone());
        Ok(token.access_token)
    }

    async fn request_new_token(&self) -> Result<IgdbToken, GatewayError> {
        let response = self
            .http
            .post(&self.cfg.token_url)
            .query(&[
                ("client_id", self.cfg.client_id.as_str()),
                ("client_secret", self.cfg.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|err| GatewayError::Auth(format!("token request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(format!(
                "token request rejected (status={status}): {text}"
            )));
        }
        let token: TwitchTokenResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Auth(format!("malformed token response: {err}")))?;
        let ttl = token.expires_in.saturating_sub(30).max(30);
        debug!(ttl_secs = ttl, "obtained IGDB app token");
        Ok(IgdbToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        })
    }

    async fn backoff(&self, attempt: u32) {
        let wait = self.cfg.backoff_ms * ((attempt + 1) as u64);
        tokio::time::sleep(Duration::from_millis(wait)).await;
    }

    #[instrument(skip(self, body), fields(endpoint = endpoint))]
    async fn execute_request(
        &self,
        endpoint: &str,
        body: String,
    ) -> Result<Vec<RawRecord>, GatewayError> {
        let url = self.cfg.endpoint_url(endpoint);
        let mut attempt = 0u32;
        loop {
            self.throttle().await;
            let token = self.ensure_token().await?;
            let response = self
                .http
                .post(&url)
                .header("Client-ID", &self.cfg.client_id)
                .header("Content-Type", "text/plain")
                .header("Authorization", format!("Bearer {}", token))
                .body(body.clone())
                .send()
                .await;

            let resp = match response {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt >= self.cfg.max_retries {
                        return Err(GatewayError::Transport(err));
                    }
                    warn!(attempt, error = %err, "IGDB transport error; retrying");
                    self.backoff(attempt).await;
                    attempt += 1;
                    continue;
                }
            };

            let status = resp.status();
            if status.is_success() {
                let text = resp.text().await?;
                return serde_json::from_str(&text).map_err(|source| GatewayError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }

            if status == StatusCode::UNAUTHORIZED {
                *self.token.lock().await = None;
                if attempt >= self.cfg.max_retries {
                    let text = resp.text().await.unwrap_or_default();
                    return Err(GatewayError::Auth(text));
                }
                attempt += 1;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt >= self.cfg.max_retries {
                    let text = resp.text().await.unwrap_or_default();
                    return Err(GatewayError::Status {
                        endpoint: endpoint.to_string(),
                        status: status.as_u16(),
                        body: text,
                    });
                }
                warn!(attempt, status = status.as_u16(), "IGDB throttled or failing; backing off");
                self.backoff(attempt).await;
                attempt += 1;
                continue;
            }

            let text = resp.text().await.unwrap_or_default();
            return Err(classify_failure(endpoint, status, text));
        }
    }
}

/// Maps a non-retryable response onto a gateway error. IGDB reports unknown
/// fields as a 400 whose body mentions "Invalid Field".
fn classify_failure(endpoint: &str, status: StatusCode, body: String) -> GatewayError {
    if status == StatusCode::BAD_REQUEST && body.to_ascii_lowercase().contains("invalid field") {
        return GatewayError::UnsupportedField {
            endpoint: endpoint.to_string(),
            message: body,
        };
    }
    GatewayError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl SourceGateway for IgdbService {
    async fn query(
        &self,
        endpoint: &str,
        query: &SourceQuery,
    ) -> Result<Vec<RawRecord>, GatewayError> {
        let mut query = query.clone();
        query.limit = query.limit.clamp(1, IGDB_MAX_LIMIT);
        self.execute_request(endpoint, query.to_body()).await
    }

    async fn lookup_by_ids(
        &self,
        endpoint: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> Result<Vec<RawRecord>, GatewayError> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IGDB_MAX_LIMIT) {
            let mut rows = self
                .execute_request(endpoint, lookup_body(chunk, fields))
                .await?;
            out.append(&mut rows);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> IgdbServiceConfig {
        IgdbServiceConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            base_url: "https://api.igdb.com/v4/".into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            reqs_per_min: Some(240),
            max_retries: 3,
            backoff_ms: 1000,
        }
    }

    #[test]
    fn pacing_follows_requests_per_minute() {
        assert_eq!(cfg().sleep_ms_between_requests(), Some(250));
        let unpaced = IgdbServiceConfig {
            reqs_per_min: None,
            ..cfg()
        };
        assert_eq!(unpaced.sleep_ms_between_requests(), None);
    }

    #[test]
    fn endpoint_url_joins_cleanly() {
        assert_eq!(cfg().endpoint_url("games"), "https://api.igdb.com/v4/games");
    }

    #[test]
    fn invalid_field_is_classified_as_unsupported() {
        let err = classify_failure(
            "age_ratings",
            StatusCode::BAD_REQUEST,
            r#"[{"title":"Invalid Field","cause":"created_at"}]"#.into(),
        );
        assert!(err.is_unsupported_field());

        let err = classify_failure("games", StatusCode::BAD_REQUEST, "Syntax Error".into());
        assert!(!err.is_unsupported_field());
    }
}
