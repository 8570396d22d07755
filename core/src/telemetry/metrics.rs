use serde::Serialize;
use std::sync::Mutex;

pub struct LinkMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_sent: usize,
    pub send_failures: usize,
    pub frames_received: usize,
    pub malformed_frames: usize,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_sent(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.frames_sent += 1;
        }
    }

    pub fn record_send_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.send_failures += 1;
        }
    }

    pub fn record_received(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.frames_received += 1;
        }
    }

    pub fn record_malformed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.malformed_frames += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}
