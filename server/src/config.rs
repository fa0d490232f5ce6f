use anyhow::{Context, Result, anyhow};
use axum_extra::extract::cookie::Key;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Duration;

const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;
/// Signing half plus encryption half of the private cookie key.
const COOKIE_KEY_LEN: usize = 64;

#[derive(Clone)]
pub struct AppConfig {
    pub session_secret: String,
    pub cookie_key: Key,
    pub session_ttl: Duration,
    pub verify_url: Option<String>,
    pub dev_sessions: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.trim().is_empty())
            .context("SESSION_SECRET missing")?;

        let cookie_secret = lookup("COOKIE_SECRET_BASE64").context("COOKIE_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(cookie_secret.trim())
            .context("invalid COOKIE_SECRET_BASE64")?;
        if secret_bytes.len() < COOKIE_KEY_LEN {
            return Err(anyhow!(
                "COOKIE_SECRET_BASE64 must decode to at least {COOKIE_KEY_LEN} bytes"
            ));
        }
        let cookie_key = Key::try_from(&secret_bytes[..COOKIE_KEY_LEN])
            .context("invalid COOKIE_SECRET_BASE64")?;

        let ttl_minutes = match lookup("SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid SESSION_TTL_MINUTES {raw}"))?,
            None => DEFAULT_SESSION_TTL_MINUTES,
        };
        if ttl_minutes <= 0 {
            return Err(anyhow!("SESSION_TTL_MINUTES must be positive"));
        }

        let verify_url = lookup("AUTH_VERIFY_URL").filter(|s| !s.trim().is_empty());
        let dev_sessions = lookup("DEV_SESSIONS")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            session_secret,
            cookie_key,
            session_ttl: Duration::minutes(ttl_minutes),
            verify_url,
            dev_sessions,
            cors_allowed_origins,
        })
    }
}
