use crate::error::ExporterError;
use log::{error, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Authentication scheme of a credential. The string forms double as the
/// `type` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    App,
    Token,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::App => "gh-app",
            CredentialKind::Token => "gh-pat",
        }
    }
}

impl FromStr for CredentialKind {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gh-app" => Ok(CredentialKind::App),
            "gh-pat" => Ok(CredentialKind::Token),
            other => Err(ExporterError::UnknownCredentialKind(other.to_string())),
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSecret {
    App {
        app_id: i64,
        installation_id: i64,
        /// PEM text, optionally base64-encoded as a whole.
        private_key: String,
    },
    Token {
        token: String,
    },
}

// Secrets stay out of logs.
impl fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSecret::App {
                app_id,
                installation_id,
                ..
            } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .field("private_key", &"<redacted>")
                .finish(),
            CredentialSecret::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// One pollable GitHub identity. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub secret: CredentialSecret,
}

impl Credential {
    pub fn app(
        name: impl Into<String>,
        app_id: i64,
        installation_id: i64,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            secret: CredentialSecret::App {
                app_id,
                installation_id,
                private_key: private_key.into(),
            },
        }
    }

    pub fn token(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: CredentialSecret::Token {
                token: token.into(),
            },
        }
    }

    pub fn kind(&self) -> CredentialKind {
        match self.secret {
            CredentialSecret::App { .. } => CredentialKind::App,
            CredentialSecret::Token { .. } => CredentialKind::Token,
        }
    }

    pub fn app_id(&self) -> Option<i64> {
        match self.secret {
            CredentialSecret::App { app_id, .. } => Some(app_id),
            CredentialSecret::Token { .. } => None,
        }
    }

    pub fn installation_id(&self) -> Option<i64> {
        match self.secret {
            CredentialSecret::App {
                installation_id, ..
            } => Some(installation_id),
            CredentialSecret::Token { .. } => None,
        }
    }

    fn from_entry(name: &str, entry: CredentialEntry) -> Result<Self, ExporterError> {
        let missing = |field| ExporterError::InvalidCredential {
            name: name.to_string(),
            field,
        };
        match entry.kind.parse::<CredentialKind>()? {
            CredentialKind::App => Ok(Credential::app(
                name,
                entry.app_id.ok_or_else(|| missing("appId"))?,
                entry.installation_id.ok_or_else(|| missing("installationId"))?,
                entry.key.ok_or_else(|| missing("key"))?,
            )),
            CredentialKind::Token => Ok(Credential::token(
                name,
                entry.token.ok_or_else(|| missing("token"))?,
            )),
        }
    }
}

// On-disk shape of a single entry; the map key is the credential name.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialEntry {
    #[serde(rename = "type")]
    kind: String,
    app_id: Option<i64>,
    installation_id: Option<i64>,
    key: Option<String>,
    token: Option<String>,
}

/// Supplies the credentials to poll. Called once at startup.
pub trait CredentialSource {
    fn credentials(&self) -> Vec<Credential>;
}

/// Credentials read from a JSON (or YAML) file keyed by credential name.
#[derive(Debug, Clone, Default)]
pub struct FileCredentialSource {
    credentials: Vec<Credential>,
}

impl FileCredentialSource {
    /// Read and decode the credential file.
    ///
    /// The file must hold an object of objects; anything else fails the load.
    /// Individual entries with an unknown `type` or a missing payload are
    /// logged and skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExporterError> {
        let path = path.as_ref();
        let file_error = |reason: String| ExporterError::CredentialFile {
            path: path.to_path_buf(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let entries: BTreeMap<String, CredentialEntry> = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|e| file_error(e.to_string()))?
        } else {
            serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))?
        };

        let mut credentials = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            match Credential::from_entry(&name, entry) {
                Ok(c) => credentials.push(c),
                Err(e) => error!("skipping credential {}: {}", name, e),
            }
        }
        info!(
            "loaded {} credential(s) from {}",
            credentials.len(),
            path.display()
        );
        Ok(Self { credentials })
    }
}

impl CredentialSource for FileCredentialSource {
    fn credentials(&self) -> Vec<Credential> {
        self.credentials.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str) -> CredentialEntry {
        CredentialEntry {
            kind: kind.into(),
            app_id: None,
            installation_id: None,
            key: None,
            token: None,
        }
    }

    #[test]
    fn kind_strings_match_metric_labels() {
        assert_eq!("gh-app".parse::<CredentialKind>().unwrap(), CredentialKind::App);
        assert_eq!("gh-pat".parse::<CredentialKind>().unwrap(), CredentialKind::Token);
        assert_eq!(CredentialKind::App.to_string(), "gh-app");
        let err = "gh-oauth".parse::<CredentialKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown kind: gh-oauth");
    }

    #[test]
    fn token_entry_ignores_app_fields() {
        let mut e = entry("gh-pat");
        e.token = Some("t".into());
        e.app_id = Some(9);
        let c = Credential::from_entry("pat", e).unwrap();
        assert_eq!(c, Credential::token("pat", "t"));
        assert_eq!(c.app_id(), None);
    }

    #[test]
    fn app_entry_requires_installation_id() {
        let mut e = entry("gh-app");
        e.app_id = Some(1);
        e.key = Some("k".into());
        match Credential::from_entry("app", e) {
            Err(ExporterError::InvalidCredential { name, field }) => {
                assert_eq!(name, "app");
                assert_eq!(field, "installationId");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let c = Credential::app("app", 1, 2, "super-secret-key");
        let t = Credential::token("pat", "ghp_secret");
        let out = format!("{:?} {:?}", c, t);
        assert!(!out.contains("super-secret-key"));
        assert!(!out.contains("ghp_secret"));
        assert!(out.contains("installation_id: 2"));
    }
}
