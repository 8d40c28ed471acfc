//! Resolves a Supabase access token to the user it was issued for.

use crate::config::Settings;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Uuid, AuthError>;
}

#[derive(Debug)]
pub enum AuthError {
    /// The token was rejected; the caller should answer 401.
    InvalidToken,
    /// The auth service could not be reached or answered unexpectedly.
    Upstream(anyhow::Error),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidToken => f.write_str("invalid or expired access token"),
            AuthError::Upstream(err) => write!(f, "auth service error: {err:#}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Uuid,
}

impl SupabaseAuth {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_supabase_url()?.to_string();
        let anon_key = settings.require_supabase_anon_key()?.to_string();

        let timeout_secs = std::env::var("SUPABASE_AUTH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build supabase http client")?;

        Ok(Self {
            http,
            base_url,
            anon_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'))
    }

    fn headers(&self, token: &str) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl TokenVerifier for SupabaseAuth {
    async fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        // A token that cannot be a header value cannot be valid either.
        let headers = self.headers(token).map_err(|_| AuthError::InvalidToken)?;

        let res = self
            .http
            .get(self.url())
            .headers(headers)
            .send()
            .await
            .context("supabase auth request failed")
            .map_err(AuthError::Upstream)?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Upstream(anyhow::anyhow!(
                "supabase auth HTTP {status}"
            )));
        }

        let user = res
            .json::<SupabaseUser>()
            .await
            .context("failed to parse supabase user response")
            .map_err(AuthError::Upstream)?;
        Ok(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_accepts_any_scheme_case() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_empty() {
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn parses_user_id_from_supabase_payload() {
        let user: SupabaseUser = serde_json::from_str(
            r#"{"id":"0b6c1f4e-3f0a-4c4e-9d5a-2d1f0f9b7c11","aud":"authenticated","email":"a@b.c"}"#,
        )
        .unwrap();
        assert_eq!(
            user.id.to_string(),
            "0b6c1f4e-3f0a-4c4e-9d5a-2d1f0f9b7c11"
        );
    }
}
