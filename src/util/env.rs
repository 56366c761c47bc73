//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in the binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get required env var; error if missing or blank.
pub fn env_req(key: &str) -> anyhow::Result<String> {
    env_opt(key).ok_or_else(|| anyhow::anyhow!("missing env var {key}"))
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Database URL: `DATABASE_URL`, then `DB_URL`.
pub fn db_url() -> anyhow::Result<String> {
    ["DATABASE_URL", "DB_URL"]
        .into_iter()
        .find_map(env_opt)
        .ok_or_else(|| anyhow::anyhow!("no database URL env vars set (DATABASE_URL / DB_URL)"))
}

/// Masks credentials in a postgres DSN for logging.
pub fn redact_dsn(dsn: &str) -> String {
    let trimmed = dsn.trim();
    if let Some(scheme_end) = trimmed.find("://") {
        let rest = &trimmed[scheme_end + 3..];
        if let Some(at) = rest.rfind('@') {
            return format!("{}://***@{}", &trimmed[..scheme_end], &rest[at + 1..]);
        }
    }
    trimmed.to_string()
}
