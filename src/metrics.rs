//! Execution telemetry for chain runs.
//!
//! [`ChainMetadata`] is written into a context's `_metadata` field by every
//! chain invocation that has middleware attached. [`ChainStats`] aggregates
//! across invocations of one chain and backs
//! [`Chain::debug_info`](crate::Chain::debug_info).

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix epoch time in milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Number of middleware registered per position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareCounts {
    pub input: usize,
    pub output: usize,
    pub global: usize,
}

impl MiddlewareCounts {
    /// Total middleware across all positions.
    pub fn total(&self) -> usize {
        self.input + self.output + self.global
    }
}

/// Per-invocation middleware durations in milliseconds, bucketed by position.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub input_middleware_timings: Vec<f64>,
    pub output_middleware_timings: Vec<f64>,
    pub global_middleware_timings: Vec<f64>,
}

/// Telemetry for one chain invocation, stored under `_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub chain_id: String,
    pub chain_name: String,
    pub link_count: usize,
    /// Epoch milliseconds the invocation started.
    pub start_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub middleware_counts: MiddlewareCounts,
    #[serde(default)]
    pub performance: PerformanceMetrics,
}

impl ChainMetadata {
    /// Open metadata for an invocation that is starting now.
    pub fn start(
        chain_id: impl Into<String>,
        chain_name: impl Into<String>,
        link_count: usize,
        middleware_counts: MiddlewareCounts,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            chain_name: chain_name.into(),
            link_count,
            start_time: now_millis(),
            end_time: None,
            duration: None,
            middleware_counts,
            performance: PerformanceMetrics::default(),
        }
    }

    /// Close the metadata with the invocation's duration and timings.
    pub fn finish(mut self, duration_ms: f64, performance: PerformanceMetrics) -> Self {
        self.end_time = Some(now_millis());
        self.duration = Some(duration_ms);
        self.performance = performance;
        self
    }
}

/// Aggregate of many duration samples.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSummary {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl TimingSummary {
    /// Fold a batch of samples into the summary.
    pub fn record_all(&mut self, samples: &[f64]) {
        for &ms in samples {
            self.count += 1;
            self.total_ms += ms;
            if ms > self.max_ms {
                self.max_ms = ms;
            }
        }
    }

    /// Mean sample duration, or zero when empty.
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Statistics aggregated across every invocation of a chain.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    /// Number of completed invocations.
    pub invocations: usize,
    /// Invocations that ended with `error` set.
    pub failures: usize,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    pub total_duration_ms: f64,
    pub input_middleware: TimingSummary,
    pub output_middleware: TimingSummary,
    pub global_middleware: TimingSummary,
}

impl ChainStats {
    /// Record one finished invocation.
    pub fn record_run(
        &mut self,
        duration_ms: f64,
        performance: &PerformanceMetrics,
        error: Option<&str>,
    ) {
        self.invocations += 1;
        self.total_duration_ms += duration_ms;
        self.input_middleware
            .record_all(&performance.input_middleware_timings);
        self.output_middleware
            .record_all(&performance.output_middleware_timings);
        self.global_middleware
            .record_all(&performance.global_middleware_timings);
        if let Some(message) = error {
            self.failures += 1;
            self.last_error = Some(message.to_string());
        }
    }

    /// Check if any invocation failed.
    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }

    /// Mean invocation duration, or zero before the first run.
    pub fn average_duration_ms(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            self.total_duration_ms / self.invocations as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_names() {
        let meta = ChainMetadata::start("id-1", "checkout", 2, MiddlewareCounts {
            input: 1,
            output: 0,
            global: 1,
        })
        .finish(3.5, PerformanceMetrics {
            input_middleware_timings: vec![0.5, 0.25],
            ..Default::default()
        });

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["chainId"], "id-1");
        assert_eq!(json["middlewareCounts"]["global"], 1);
        assert_eq!(json["performance"]["inputMiddlewareTimings"][1], 0.25);
        assert_eq!(json["duration"], 3.5);
        assert!(json["endTime"].is_u64());
    }

    #[test]
    fn test_stats_aggregate_runs() {
        let mut stats = ChainStats::default();
        let perf = PerformanceMetrics {
            output_middleware_timings: vec![2.0, 4.0],
            ..Default::default()
        };
        stats.record_run(10.0, &perf, None);
        stats.record_run(20.0, &perf, Some("boom"));

        assert_eq!(stats.invocations, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.last_error.as_deref(), Some("boom"));
        assert_eq!(stats.average_duration_ms(), 15.0);
        assert_eq!(stats.output_middleware.count, 4);
        assert_eq!(stats.output_middleware.max_ms, 4.0);
        assert_eq!(stats.output_middleware.average_ms(), 3.0);
        assert!(stats.input_middleware.count == 0);
    }
}
