use crate::config::Config;
use crate::credentials::{Credential, CredentialSecret};
use crate::error::ExporterError;
use crate::http::{self, Auth, GitHubClient, Transport};
use crate::metrics::HttpClientInstrumenter;
use crate::types::{CredentialLabels, RateLimitReading};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::Client;

/// Something that can report the current rate limits for one credential.
#[async_trait]
pub trait RateLimitSource: Send + Sync {
    async fn rate_limits(&self) -> Result<Vec<RateLimitReading>, ExporterError>;
}

/// Builds a ready-to-query source for a credential. Must not touch the network.
pub trait RateLimitSourceFactory: Send + Sync {
    fn create(&self, credential: &Credential) -> Result<Box<dyn RateLimitSource>, ExporterError>;
}

/// Factory producing [`GitHubClient`]s that share one connection pool.
pub struct GitHubSourceFactory {
    client: Client,
    config: Config,
    instrumenter: HttpClientInstrumenter,
}

impl GitHubSourceFactory {
    pub fn new(client: Client, config: Config, instrumenter: HttpClientInstrumenter) -> Self {
        Self {
            client,
            config,
            instrumenter,
        }
    }

    fn auth_for(&self, credential: &Credential) -> Result<Auth, ExporterError> {
        let name = &credential.name;
        match &credential.secret {
            CredentialSecret::App {
                app_id,
                installation_id,
                private_key,
            } => {
                let key = http::decode_private_key(private_key)
                    .map_err(|e| ExporterError::construction(name, e))?;
                let jwt = http::sign_app_jwt(*app_id, &key)
                    .map_err(|e| ExporterError::construction(name, e))?;
                let mut jwt = HeaderValue::from_str(&format!("Bearer {}", jwt))
                    .map_err(|e| ExporterError::construction(name, e))?;
                jwt.set_sensitive(true);
                Ok(Auth::Installation {
                    installation_id: *installation_id,
                    jwt,
                })
            }
            CredentialSecret::Token { token } => http::bearer(token)
                .map(Auth::Token)
                .map_err(|e| ExporterError::construction(name, e)),
        }
    }
}

impl RateLimitSourceFactory for GitHubSourceFactory {
    fn create(&self, credential: &Credential) -> Result<Box<dyn RateLimitSource>, ExporterError> {
        let auth = self.auth_for(credential)?;
        let mut transport = Transport::new(self.client.clone(), &self.config, auth);
        transport.instrument(self.instrumenter.clone());
        Ok(Box::new(GitHubClient::new(
            transport,
            CredentialLabels::from(credential),
        )))
    }
}
