//! Session statistics.

use std::path::PathBuf;
use std::time::Duration;

use ingestion::SessionSummary;

/// Statistics from one gateway run
#[derive(Debug, Clone)]
pub struct GatewayStats {
    pub summary: SessionSummary,

    /// Wall time including device open and teardown
    pub duration: Duration,

    /// Store file of this session
    pub store_path: Option<PathBuf>,

    /// Publisher transport, if publishing was enabled
    pub transport: Option<String>,
}

impl GatewayStats {
    /// Share of read lines that were rejected, in percent
    pub fn error_rate(&self) -> f64 {
        let counters = &self.summary.counters;
        if counters.lines_read > 0 {
            counters.decode_errors as f64 / counters.lines_read as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let summary = &self.summary;
        let counters = &summary.counters;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stop reason: {:?}", summary.reason);
        println!("   ├─ Mode: {}", summary.schema.mode_name());
        println!("   ├─ Lines read: {}", counters.lines_read);
        println!("   ├─ Samples accepted: {}", counters.samples_accepted);
        println!("   ├─ Rate: {:.1}/s", summary.accept_rate());
        println!("   └─ Line latency (µs): {}", summary.latency_us);

        println!("\n💾 Store");
        match self.store_path {
            Some(ref path) => {
                println!("   ├─ File: {}", path.display());
                println!("   ├─ Rows: {}", counters.samples_stored);
                if let Some(state) = summary.store {
                    println!("   └─ Forced flushes: {}", state.flush_count);
                } else {
                    println!("   └─ Forced flushes: -");
                }
            }
            None => println!("   └─ disabled"),
        }

        println!("\n📡 Publish");
        match self.transport {
            Some(ref transport) => {
                println!("   ├─ Transport: {}", transport);
                println!("   ├─ Axis: {}", counters.axis_published);
                println!("   ├─ Batch: {}", counters.batch_published);
                println!("   ├─ Summary: {}", counters.summary_published);
                println!("   ├─ Wide: {}", counters.wide_published);
                println!("   ├─ Gated: {}", counters.publish_skipped);
                println!("   ├─ Errors: {}", counters.publish_errors);
                println!("   └─ Offline status sent: {}", summary.offline_published);
            }
            None => println!("   └─ disabled"),
        }

        println!("\n⚠️  Errors");
        println!(
            "   ├─ Decode errors: {} ({:.2}%)",
            counters.decode_errors,
            self.error_rate()
        );
        println!("   ├─ Schema mismatches: {}", counters.schema_mismatches);
        println!("   ├─ Diagnostics: {}", counters.diagnostics);
        println!(
            "   └─ Reports: {} sent, {} failed",
            counters.reports_sent, counters.report_errors
        );

        println!();
    }
}
