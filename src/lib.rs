pub mod collector;
pub mod config;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod http;
pub mod metrics;
pub mod server;
pub mod types;

pub use collector::Collector;
pub use credentials::{Credential, CredentialKind, CredentialSource, FileCredentialSource};
pub use error::ExporterError;
pub use factory::{GitHubSourceFactory, RateLimitSource, RateLimitSourceFactory};
pub use types::RateLimitReading;
