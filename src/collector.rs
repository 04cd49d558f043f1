//! Scrape-driven collection of per-credential rate limits.
//!
//! Every scrape clears the gauge families, polls all credentials concurrently
//! and gathers the result while still holding the guard, so overlapping
//! scrapes are serialized and never observe each other's half-written state.
//! Once [`Collector::shutdown`] has been called, scrapes return nothing and
//! stop talking to GitHub.

use crate::credentials::Credential;
use crate::error::ExporterError;
use crate::factory::RateLimitSourceFactory;
use crate::metrics::RateLimitGauges;
use futures::future::join_all;
use log::{debug, error, info};
use prometheus::proto::MetricFamily;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Collector {
    credentials: Vec<Credential>,
    factory: Arc<dyn RateLimitSourceFactory>,
    gauges: Mutex<RateLimitGauges>,
    shutting_down: AtomicBool,
}

impl Collector {
    pub fn new(
        credentials: Vec<Credential>,
        factory: Arc<dyn RateLimitSourceFactory>,
    ) -> Result<Self, ExporterError> {
        Ok(Self {
            credentials,
            factory,
            gauges: Mutex::new(RateLimitGauges::new()?),
            shutting_down: AtomicBool::new(false),
        })
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Collection is scrape-triggered, so there is nothing to start.
    pub fn start(&self) {
        debug!(
            "collector ready with {} credential(s)",
            self.credentials.len()
        );
    }

    /// Stop polling. Later scrapes return an empty set. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::AcqRel) {
            info!("collector shutting down; further scrapes will be empty");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Refresh and return the rate-limit families.
    ///
    /// Never fails: a credential whose source cannot be built or queried is
    /// logged and simply absent from the result.
    pub async fn scrape(&self) -> Vec<MetricFamily> {
        let gauges = self.gauges.lock().await;
        gauges.reset();

        if self.is_shutting_down() {
            debug!("scrape after shutdown; returning empty metric set");
            return gauges.gather();
        }

        let gauges = &*gauges;
        let polls = self
            .credentials
            .iter()
            .map(|credential| self.poll(credential, gauges));
        let published: usize = join_all(polls).await.into_iter().sum();
        debug!(
            "scrape published {} reading(s) for {} credential(s)",
            published,
            self.credentials.len()
        );

        gauges.gather()
    }

    async fn poll(&self, credential: &Credential, gauges: &RateLimitGauges) -> usize {
        let source = match self.factory.create(credential) {
            Ok(source) => source,
            Err(e) => {
                error!("{}", e);
                return 0;
            }
        };
        match source.rate_limits().await {
            Ok(readings) => {
                for reading in &readings {
                    gauges.observe(reading);
                }
                readings.len()
            }
            Err(e) => {
                error!("{}", e);
                0
            }
        }
    }
}
