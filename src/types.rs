use crate::credentials::{Credential, CredentialKind};
use chrono::{DateTime, Utc};

pub const LABEL_NAME: &str = "name";
pub const LABEL_RESOURCE: &str = "resource";
pub const LABEL_TYPE: &str = "type";
pub const LABEL_APP_ID: &str = "app_id";
pub const LABEL_APP_INSTALLATION_ID: &str = "app_installation_id";

pub const LABELS: [&str; 5] = [
    LABEL_NAME,
    LABEL_RESOURCE,
    LABEL_TYPE,
    LABEL_APP_ID,
    LABEL_APP_INSTALLATION_ID,
];

/// Identity labels copied from the credential a reading came from.
/// App and installation ids are empty for token credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialLabels {
    pub name: String,
    pub kind: CredentialKind,
    pub app_id: String,
    pub app_installation_id: String,
}

impl From<&Credential> for CredentialLabels {
    fn from(c: &Credential) -> Self {
        Self {
            name: c.name.clone(),
            kind: c.kind(),
            app_id: c.app_id().map(|id| id.to_string()).unwrap_or_default(),
            app_installation_id: c
                .installation_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }
}

/// One resource's rate limit as seen by one credential.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitReading {
    pub resource: String,
    pub limit: u64,
    // May exceed `limit` if the API says so; passed through untouched.
    pub remaining: u64,
    pub reset_at: Option<DateTime<Utc>>,
    pub credential: CredentialLabels,
}

impl RateLimitReading {
    /// Label values in the order of [`LABELS`].
    pub fn label_values(&self) -> [&str; 5] {
        [
            &self.credential.name,
            &self.resource,
            self.credential.kind.as_str(),
            &self.credential.app_id,
            &self.credential.app_installation_id,
        ]
    }

    /// `(limit - remaining) / limit`. Not finite when `limit` is zero.
    pub fn usage(&self) -> f64 {
        (self.limit as f64 - self.remaining as f64) / self.limit as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(limit: u64, remaining: u64) -> RateLimitReading {
        RateLimitReading {
            resource: "core".into(),
            limit,
            remaining,
            reset_at: None,
            credential: CredentialLabels::from(&Credential::token("pat", "t")),
        }
    }

    #[test]
    fn usage_is_used_fraction_of_limit() {
        assert_eq!(reading(5000, 4999).usage(), 0.0002);
        assert_eq!(reading(30, 18).usage(), 0.4);
        assert_eq!(reading(1000, 1000).usage(), 0.0);
    }

    #[test]
    fn usage_with_zero_limit_is_not_finite() {
        assert!(reading(0, 0).usage().is_nan());
        assert!(reading(0, 3).usage().is_infinite());
    }

    #[test]
    fn remaining_above_limit_gives_negative_usage() {
        assert_eq!(reading(10, 15).usage(), -0.5);
    }

    #[test]
    fn app_labels_carry_ids() {
        let labels = CredentialLabels::from(&Credential::app("app", 12, 34, "k"));
        assert_eq!(labels.app_id, "12");
        assert_eq!(labels.app_installation_id, "34");
        let r = RateLimitReading {
            credential: labels,
            ..reading(1, 1)
        };
        assert_eq!(r.label_values(), ["app", "core", "gh-app", "12", "34"]);
    }

    #[test]
    fn token_labels_leave_ids_empty() {
        assert_eq!(reading(1, 1).label_values(), ["pat", "core", "gh-pat", "", ""]);
    }
}
