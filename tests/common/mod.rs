#![allow(dead_code)]

use gh_rate_limit_exporter::metrics::encode_text;
use log::{Level, LevelFilter, Log, Metadata, Record};
use prometheus::proto::MetricFamily;
use std::sync::{Mutex, Once};

pub const TOTAL: &str = "gh_rate_limit_exporter_rate_limit_total";
pub const REMAINING: &str = "gh_rate_limit_exporter_rate_limit_remaining";
pub const USAGE: &str = "gh_rate_limit_exporter_rate_limit_usage";

pub fn text(families: &[MetricFamily]) -> String {
    encode_text(families).unwrap()
}

fn series<'a>(text: &'a str, family: &str) -> impl Iterator<Item = &'a str> {
    let prefix = format!("{}{{", family);
    text.lines().filter(move |l| l.starts_with(&prefix))
}

pub fn series_count(text: &str, family: &str) -> usize {
    series(text, family).count()
}

/// Value of the series for credential `name` and `resource`, if published.
pub fn sample(text: &str, family: &str, name: &str, resource: &str) -> Option<f64> {
    let name = format!("name=\"{}\"", name);
    let resource = format!("resource=\"{}\"", resource);
    series(text, family)
        .find(|l| l.contains(&name) && l.contains(&resource))
        .and_then(|l| l.rsplit(' ').next())
        .and_then(|v| v.parse().ok())
}

pub fn has_credential(text: &str, name: &str) -> bool {
    let name = format!("name=\"{}\"", name);
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .any(|l| l.contains(&name))
}

pub fn rate_limit_body() -> serde_json::Value {
    serde_json::json!({
        "resources": {
            "core": {"limit": 5000, "remaining": 4999, "reset": 1372700873, "used": 1},
            "search": {"limit": 30, "remaining": 18, "reset": 1372697452, "used": 12},
            "graphql": {"limit": 5000, "remaining": 4993, "reset": 1372700389, "used": 7},
            "integration_manifest": {"limit": 5000, "remaining": 4999, "reset": 1551806725, "used": 1},
            "code_scanning_upload": {"limit": 500, "remaining": 499, "reset": 1551806725, "used": 1}
        },
        "rate": {"limit": 5000, "remaining": 4999, "reset": 1372700873, "used": 1}
    })
}

/// Process-wide logger that keeps every record for later assertions. Tests in
/// one binary share it, so filter on something unique to the test.
pub struct CapturedLogs {
    records: Mutex<Vec<(Level, String)>>,
}

static LOGS: CapturedLogs = CapturedLogs {
    records: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

impl Log for CapturedLogs {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

impl CapturedLogs {
    /// Records at `level` whose message contains `needle`.
    pub fn matching(&self, level: Level, needle: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .map(|(_, m)| m.clone())
            .collect()
    }
}

pub fn capture_logs() -> &'static CapturedLogs {
    INSTALL.call_once(|| {
        log::set_logger(&LOGS).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    &LOGS
}
