use std::{
    cell::RefCell,
    collections::BTreeMap,
    future::Future,
    net::UdpSocket,
    time::{Duration, Instant},
};

use cadence::{StatsdClient, UdpMetricSink, prelude::*};
use log::debug;

const STATSD_PORT: u16 = 8125;
const STATSD_PREFIX: &str = "celcat_scraper";

/// Counters and timers sink. Passed by reference to every step of a run.
pub trait Metrics {
    fn incr(&self, key: &str);
    fn timing(&self, key: &str, elapsed: Duration);
}

pub struct StatsdMetrics {
    client: StatsdClient,
}

impl StatsdMetrics {
    pub fn new(host: &str) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let sink = UdpMetricSink::from((host, STATSD_PORT), socket)?;
        Ok(Self {
            client: StatsdClient::from_sink(STATSD_PREFIX, sink),
        })
    }
}

impl Metrics for StatsdMetrics {
    fn incr(&self, key: &str) {
        if let Err(e) = self.client.incr(key) {
            debug!("dropped counter {key}: {e}");
        }
    }

    fn timing(&self, key: &str, elapsed: Duration) {
        if let Err(e) = self.client.time(key, elapsed) {
            debug!("dropped timer {key}: {e}");
        }
    }
}

pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn incr(&self, _key: &str) {}
    fn timing(&self, _key: &str, _elapsed: Duration) {}
}

/// Keeps everything in memory. Single-threaded only.
#[derive(Default)]
pub struct RecordingMetrics {
    counters: RefCell<BTreeMap<String, u64>>,
    timers: RefCell<Vec<String>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counters.borrow().get(key).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> BTreeMap<String, u64> {
        self.counters.borrow().clone()
    }

    pub fn timers(&self) -> Vec<String> {
        self.timers.borrow().clone()
    }
}

impl Metrics for RecordingMetrics {
    fn incr(&self, key: &str) {
        *self.counters.borrow_mut().entry(key.to_string()).or_default() += 1;
    }

    fn timing(&self, key: &str, _elapsed: Duration) {
        self.timers.borrow_mut().push(key.to_string());
    }
}

/// Awaits `fut` and records how long it took as `<step>.time`.
pub async fn timed<F, T>(metrics: &dyn Metrics, step: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let result = fut.await;
    metrics.timing(&format!("{step}.time"), start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timed_records_step_and_passes_result_through() {
        let metrics = RecordingMetrics::new();
        let value = timed(&metrics, "login", async { 41 + 1 }).await;
        assert_eq!(value, 42);
        assert_eq!(metrics.timers(), vec!["login.time".to_string()]);
    }

    #[test]
    fn recording_metrics_counts_per_key() {
        let metrics = RecordingMetrics::new();
        metrics.incr("notification.sent");
        metrics.incr("notification.sent");
        metrics.incr("notification.failure");
        assert_eq!(metrics.count("notification.sent"), 2);
        assert_eq!(metrics.count("notification.failure"), 1);
        assert_eq!(metrics.count("success"), 0);
    }
}
