//! Run statistics.

use std::time::Duration;

use contracts::FinalReport;
use observability::RunMetricsAggregator;

/// Statistics from a completed run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Destination topic
    pub topic: String,

    /// Registry subject
    pub subject: String,

    /// Schema id assigned by the registry (None if nothing was encoded)
    pub schema_id: Option<u32>,

    /// Final delivery counts
    pub report: FinalReport,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Flush and retry statistics
    pub metrics: RunMetricsAggregator,
}

impl RunStats {
    /// Records submitted per second
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.submitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Ingestion Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Topic: {}", self.topic);
        match self.schema_id {
            Some(id) => println!("   ├─ Schema: {} (id {})", self.subject, id),
            None => println!("   ├─ Schema: {} (not resolved)", self.subject),
        }
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   └─ Throughput: {:.2} records/s", self.records_per_sec());

        println!("\n📈 Delivery");
        print!("{}", self.metrics.summary(&self.report));

        if self.report.failed > 0 {
            println!(
                "\n⚠️  {} record(s) were not delivered; see error logs for row ids",
                self.report.failed
            );
        }

        println!();
    }
}
