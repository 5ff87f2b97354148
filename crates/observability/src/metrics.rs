//! 摄取管道指标收集模块
//!
//! 所有指标通过 `metrics` facade 上报；未安装 recorder 时调用为空操作。

use std::time::Duration;

use contracts::FinalReport;
use metrics::{counter, gauge, histogram};

/// 记录一条已提交到 transport 的事件
pub fn record_submitted(topic: &str) {
    counter!(
        "click_ingest_records_submitted_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// 记录一条投递成功的事件
pub fn record_delivered(topic: &str, partition: i32) {
    counter!(
        "click_ingest_records_delivered_total",
        "topic" => topic.to_string(),
        "partition" => partition.to_string()
    )
    .increment(1);
}

/// 记录一条投递失败的事件
pub fn record_delivery_failed() {
    counter!("click_ingest_records_delivery_failed_total").increment(1);
}

/// 记录本地队列满导致的重试
pub fn record_queue_full_retry() {
    counter!("click_ingest_queue_full_retries_total").increment(1);
}

/// 记录一次阻塞 flush 的耗时
pub fn record_flush(duration: Duration, final_flush: bool) {
    let kind = if final_flush { "final" } else { "periodic" };
    counter!("click_ingest_flushes_total", "kind" => kind).increment(1);
    histogram!("click_ingest_flush_duration_ms", "kind" => kind)
        .record(duration.as_secs_f64() * 1000.0);
}

/// 记录尚未确认的事件数
pub fn record_in_flight(in_flight: u64) {
    gauge!("click_ingest_records_in_flight").set(in_flight as f64);
}

/// 记录 registry 分配的 schema id
pub fn record_schema_id(subject: &str, schema_id: u32) {
    gauge!("click_ingest_schema_id", "subject" => subject.to_string()).set(schema_id as f64);
}

/// 运行期指标聚合器
///
/// 在内存中聚合 flush 与重试信息，运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    /// 周期 flush 次数
    pub periodic_flushes: u64,
    /// 最终 flush 次数（正常为 1）
    pub final_flushes: u64,
    /// 队列满重试次数
    pub queue_full_retries: u64,
    /// flush 耗时 (毫秒)
    pub flush_ms: RunningStats,
}

impl RunMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 flush，同时上报 histogram
    pub fn observe_flush(&mut self, duration: Duration, final_flush: bool) {
        if final_flush {
            self.final_flushes += 1;
        } else {
            self.periodic_flushes += 1;
        }
        self.flush_ms.push(duration.as_secs_f64() * 1000.0);
        record_flush(duration, final_flush);
    }

    /// 记录一次队列满重试
    pub fn observe_queue_full(&mut self) {
        self.queue_full_retries += 1;
        record_queue_full_retry();
    }

    /// flush 总次数
    pub fn total_flushes(&self) -> u64 {
        self.periodic_flushes + self.final_flushes
    }

    /// 结合最终计数生成摘要
    pub fn summary(&self, report: &FinalReport) -> MetricsSummary {
        MetricsSummary {
            report: *report,
            failure_rate: if report.submitted > 0 {
                report.failed as f64 / report.submitted as f64 * 100.0
            } else {
                0.0
            },
            flushes: self.total_flushes(),
            queue_full_retries: self.queue_full_retries,
            flush_ms: StatsSummary::from(&self.flush_ms),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub report: FinalReport,
    pub failure_rate: f64,
    pub flushes: u64,
    pub queue_full_retries: u64,
    pub flush_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Ingestion Summary ===")?;
        writeln!(f, "Submitted: {}", self.report.submitted)?;
        writeln!(f, "Delivered: {}", self.report.delivered)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.report.failed, self.failure_rate
        )?;
        writeln!(f, "Flushes: {}", self.flushes)?;
        writeln!(f, "Queue-full retries: {}", self.queue_full_retries)?;
        writeln!(f, "Flush duration (ms): {}", self.flush_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// 在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [2.0, 4.0, 6.0] {
            stats.push(v);
        }
        assert_eq!(stats.count(), 3);
        assert!((stats.mean() - 4.0).abs() < 1e-10);
        assert!((stats.variance() - 4.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_flush_kinds() {
        let mut aggregator = RunMetricsAggregator::new();
        aggregator.observe_flush(Duration::from_millis(10), false);
        aggregator.observe_flush(Duration::from_millis(30), false);
        aggregator.observe_flush(Duration::from_millis(20), true);
        aggregator.observe_queue_full();

        assert_eq!(aggregator.periodic_flushes, 2);
        assert_eq!(aggregator.final_flushes, 1);
        assert_eq!(aggregator.total_flushes(), 3);
        assert_eq!(aggregator.queue_full_retries, 1);
        assert_eq!(aggregator.flush_ms.count(), 3);
    }

    #[test]
    fn test_summary_display() {
        let aggregator = RunMetricsAggregator::new();
        let summary = aggregator.summary(&FinalReport {
            submitted: 10,
            delivered: 9,
            failed: 1,
        });

        let output = summary.to_string();
        assert!(output.contains("Submitted: 10"));
        assert!(output.contains("Failed: 1 (10.00%)"));
        assert!(output.contains("Flush duration (ms): N/A"));
    }

    #[test]
    fn test_summary_with_nothing_submitted() {
        let summary = RunMetricsAggregator::new().summary(&FinalReport::default());
        assert_eq!(summary.failure_rate, 0.0);
    }
}
