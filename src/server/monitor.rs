//! Resource monitoring.
//!
//! A periodic task samples process memory and the connection counter, logs
//! both at debug level, and warns when either crosses its threshold. The
//! sampler is a trait so tests can inject readings instead of depending on
//! the host's memory state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::connection::ConnectionCounter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    /// Resident set, the closest process-level analog of a managed heap.
    pub heap_used: u64,
    /// Total memory available to the process's host.
    pub heap_total: u64,
    pub rss: u64,
}

#[async_trait]
pub trait MemorySampler: Send + Sync {
    /// Return the current usage, or `None` when the platform offers no
    /// reading. No reading means no warnings.
    async fn sample(&self) -> Option<MemoryUsage>;
}

/// Reads `/proc/self/status` and `/proc/meminfo` on Linux.
#[derive(Default)]
pub struct ProcMemorySampler;

#[async_trait]
impl MemorySampler for ProcMemorySampler {
    #[cfg(target_os = "linux")]
    async fn sample(&self) -> Option<MemoryUsage> {
        let status = tokio::fs::read_to_string("/proc/self/status").await.ok()?;
        let meminfo = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;

        let rss = read_kb(&status, "VmRSS:")? * 1024;
        let total = read_kb(&meminfo, "MemTotal:")? * 1024;

        Some(MemoryUsage {
            heap_used: rss,
            heap_total: total,
            rss,
        })
    }

    #[cfg(not(target_os = "linux"))]
    async fn sample(&self) -> Option<MemoryUsage> {
        None
    }
}

#[cfg(target_os = "linux")]
fn read_kb(content: &str, label: &str) -> Option<u64> {
    content
        .lines()
        .find(|line| line.starts_with(label))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorWarning {
    HighMemoryUsage {
        heap_used: u64,
        heap_total: u64,
        utilization: f64,
    },
    ApproachingConnectionLimit {
        current: u64,
        limit: u64,
    },
}

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub usage: Option<MemoryUsage>,
    pub connections: u64,
    pub warnings: Vec<MonitorWarning>,
}

pub struct ResourceMonitor {
    sampler: Arc<dyn MemorySampler>,
    counter: ConnectionCounter,
    max_connections: u64,
    memory_warning_threshold: f64,
    interval: Duration,
}

impl ResourceMonitor {
    pub fn new(
        counter: ConnectionCounter,
        max_connections: u64,
        memory_warning_threshold: f64,
        interval: Duration,
    ) -> Self {
        Self {
            sampler: Arc::new(ProcMemorySampler),
            counter,
            max_connections,
            memory_warning_threshold,
            interval,
        }
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn MemorySampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Evaluate one tick's readings against the thresholds.
    pub fn assess(&self, usage: Option<MemoryUsage>, connections: u64) -> MonitorReport {
        let mut warnings = Vec::new();

        if let Some(usage) = &usage {
            if usage.heap_total > 0 {
                let utilization = usage.heap_used as f64 / usage.heap_total as f64;
                if utilization > self.memory_warning_threshold {
                    warnings.push(MonitorWarning::HighMemoryUsage {
                        heap_used: usage.heap_used,
                        heap_total: usage.heap_total,
                        utilization,
                    });
                }
            }
        }

        if self.max_connections > 0 {
            let limit_threshold = (self.max_connections as f64 * 0.8) as u64;
            if connections > limit_threshold {
                warnings.push(MonitorWarning::ApproachingConnectionLimit {
                    current: connections,
                    limit: self.max_connections,
                });
            }
        }

        MonitorReport {
            usage,
            connections,
            warnings,
        }
    }

    /// Run the sampling loop until the returned handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so readings start one
            // interval in.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let usage = self.sampler.sample().await;
                let report = self.assess(usage, self.counter.active());
                log_report(&report);
            }
        })
    }
}

fn log_report(report: &MonitorReport) {
    match &report.usage {
        Some(usage) => {
            tracing::debug!(
                connections = report.connections,
                heap_used_mb = usage.heap_used / (1024 * 1024),
                heap_total_mb = usage.heap_total / (1024 * 1024),
                rss_mb = usage.rss / (1024 * 1024),
                "memory and connection status"
            );
        }
        None => {
            tracing::debug!(connections = report.connections, "connection status");
        }
    }

    for warning in &report.warnings {
        match warning {
            MonitorWarning::HighMemoryUsage {
                heap_used,
                heap_total,
                utilization,
            } => {
                tracing::warn!(
                    heap_used_mb = heap_used / (1024 * 1024),
                    heap_total_mb = heap_total / (1024 * 1024),
                    usage_pct = format!("{:.1}", utilization * 100.0),
                    "high memory usage detected"
                );
            }
            MonitorWarning::ApproachingConnectionLimit { current, limit } => {
                tracing::warn!(
                    current,
                    limit,
                    pct = format!("{:.1}", *current as f64 / *limit as f64 * 100.0),
                    "approaching connection limit"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ResourceMonitor {
        ResourceMonitor::new(
            ConnectionCounter::new(),
            10_000,
            0.8,
            Duration::from_secs(30),
        )
    }

    #[test]
    fn quiet_below_thresholds() {
        let report = monitor().assess(
            Some(MemoryUsage {
                heap_used: 100,
                heap_total: 1000,
                rss: 100,
            }),
            50,
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn warns_on_high_memory() {
        let report = monitor().assess(
            Some(MemoryUsage {
                heap_used: 900,
                heap_total: 1000,
                rss: 900,
            }),
            0,
        );
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            MonitorWarning::HighMemoryUsage { .. }
        )));
    }

    #[test]
    fn warns_when_connections_near_limit() {
        let report = monitor().assess(None, 8_500);
        assert_eq!(
            report.warnings,
            vec![MonitorWarning::ApproachingConnectionLimit {
                current: 8_500,
                limit: 10_000,
            }]
        );
    }

    #[test]
    fn no_memory_reading_means_no_memory_warning() {
        let report = monitor().assess(None, 0);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn mock_sampler_feeds_assessment() {
        struct Mock;

        #[async_trait]
        impl MemorySampler for Mock {
            async fn sample(&self) -> Option<MemoryUsage> {
                Some(MemoryUsage {
                    heap_used: 850,
                    heap_total: 1000,
                    rss: 850,
                })
            }
        }

        let monitor = monitor().with_sampler(Arc::new(Mock));
        let usage = monitor.sampler.sample().await;
        let report = monitor.assess(usage, 0);
        assert!(matches!(
            report.warnings.as_slice(),
            [MonitorWarning::HighMemoryUsage { .. }]
        ));
    }
}
