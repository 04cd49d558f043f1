use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::error::ExporterError;
use crate::factory::RateLimitSource;
use crate::metrics::HttpClientInstrumenter;
use crate::types::{CredentialLabels, RateLimitReading};
use async_trait::async_trait;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

/// Shared connection pool for every source. Authorization is attached per
/// request since each credential authenticates differently.
pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, user_agent(&cfg.user_agent));
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
}

/// GitHub rejects requests without a User-Agent, so an unusable value falls
/// back to the built-in one instead of being dropped.
pub fn user_agent(configured: &str) -> HeaderValue {
    match HeaderValue::from_str(configured) {
        Ok(ua) => ua,
        Err(_) => {
            warn!(
                "user agent {:?} is not a valid header value, using {}",
                configured, DEFAULT_USER_AGENT
            );
            HeaderValue::from_static(DEFAULT_USER_AGENT)
        }
    }
}

pub fn map_status_to_error(status: StatusCode, message: String) -> ErrorInfo {
    let code = match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::TOO_MANY_REQUESTS => "rate_limited",
        s if s.is_server_error() => "upstream_error",
        _ => "server_error",
    };
    ErrorInfo {
        code: code.to_string(),
        message,
    }
}

/// Accepts raw PEM or base64-encoded PEM.
pub fn decode_private_key(material: &str) -> Result<EncodingKey, String> {
    let trimmed = material.trim();
    let pem = if trimmed.starts_with("-----BEGIN") {
        trimmed.as_bytes().to_vec()
    } else {
        base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| format!("private key is neither PEM nor base64: {}", e))?
    };
    EncodingKey::from_rsa_pem(&pem).map_err(|e| format!("invalid RSA private key: {}", e))
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Sign the short-lived JWT a GitHub App presents to mint installation tokens.
/// `iat` is backdated a minute to tolerate clock drift.
pub fn sign_app_jwt(app_id: i64, key: &EncodingKey) -> jsonwebtoken::errors::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = AppClaims {
        iat: now - 60,
        exp: now + 9 * 60,
        iss: app_id.to_string(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, key)
}

pub fn bearer(token: &str) -> Result<HeaderValue, String> {
    if token.trim().is_empty() {
        return Err("token is empty".into());
    }
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| "token contains characters not allowed in a header".to_string())?;
    value.set_sensitive(true);
    Ok(value)
}

#[derive(Clone)]
pub enum Auth {
    Token(HeaderValue),
    /// Exchanged for an installation token on every query.
    Installation { installation_id: i64, jwt: HeaderValue },
}

/// An authenticated, optionally instrumented path to the GitHub REST API.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    api_url: String,
    api_version: String,
    auth: Auth,
    instrumenter: Option<HttpClientInstrumenter>,
}

impl Transport {
    pub fn new(client: Client, cfg: &Config, auth: Auth) -> Self {
        Self {
            client,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_version: cfg.api_version.clone(),
            auth,
            instrumenter: None,
        }
    }

    pub fn instrument(&mut self, instrumenter: HttpClientInstrumenter) {
        self.instrumenter = Some(instrumenter);
    }

    async fn authorization(&self, name: &str) -> Result<HeaderValue, ExporterError> {
        match &self.auth {
            Auth::Token(value) => Ok(value.clone()),
            Auth::Installation {
                installation_id,
                jwt,
            } => {
                let path = format!("/app/installations/{}/access_tokens", installation_id);
                let req = self.client.post(self.url(&path));
                let minted: InstallationToken =
                    self.execute(req, "POST", jwt.clone(), name).await?;
                debug!("minted installation token for {}", name);
                bearer(&minted.token).map_err(|e| ExporterError::remote(name, "server_error", e))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        method: &str,
        authorization: HeaderValue,
        name: &str,
    ) -> Result<T, ExporterError> {
        let started = Instant::now();
        let res = req
            .header(AUTHORIZATION, authorization)
            .header("X-GitHub-Api-Version", &self.api_version)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github+json"),
            )
            .send()
            .await;

        let res = match res {
            Ok(r) => r,
            Err(e) => {
                self.observe(method, None, started.elapsed());
                return Err(ExporterError::remote(name, "upstream_error", e));
            }
        };
        let status = res.status();
        self.observe(method, Some(status.as_u16()), started.elapsed());

        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let err = map_status_to_error(status, text);
            return Err(ExporterError::remote(name, &err.code, err.message));
        }
        res.json::<T>()
            .await
            .map_err(|e| ExporterError::remote(name, "server_error", e))
    }

    fn observe(&self, method: &str, status: Option<u16>, elapsed: Duration) {
        if let Some(inst) = &self.instrumenter {
            inst.observe(method, status, elapsed);
        }
    }
}

#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Rate {
    pub limit: u64,
    pub remaining: u64,
    /// Epoch seconds. Absent for some resources.
    #[serde(default)]
    pub reset: Option<i64>,
}

/// Body of `GET /rate_limit`. Only the per-resource breakdown is used; the
/// deprecated top-level `rate` duplicates `resources.core`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: BTreeMap<String, Rate>,
}

impl RateLimitResponse {
    pub fn into_readings(self, labels: &CredentialLabels) -> Vec<RateLimitReading> {
        self.resources
            .into_iter()
            .map(|(resource, rate)| RateLimitReading {
                resource,
                limit: rate.limit,
                remaining: rate.remaining,
                reset_at: rate
                    .reset
                    .and_then(|r| chrono::DateTime::from_timestamp(r, 0)),
                credential: labels.clone(),
            })
            .collect()
    }
}

/// Rate limit source backed by the GitHub REST API for one credential.
pub struct GitHubClient {
    transport: Transport,
    labels: CredentialLabels,
}

impl GitHubClient {
    pub fn new(transport: Transport, labels: CredentialLabels) -> Self {
        Self { transport, labels }
    }
}

#[async_trait]
impl RateLimitSource for GitHubClient {
    async fn rate_limits(&self) -> Result<Vec<RateLimitReading>, ExporterError> {
        let name = &self.labels.name;
        let authorization = self.transport.authorization(name).await?;
        let req = self.transport.client.get(self.transport.url("/rate_limit"));
        let body: RateLimitResponse = self
            .transport
            .execute(req, "GET", authorization, name)
            .await?;
        Ok(body.into_readings(&self.labels))
    }
}
