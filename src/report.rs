#![forbid(unsafe_code)]

// Run report - end-of-run summary for the console and JSON export

use crate::controller::{RunId, RunOutcome};
use crate::metrics::MetricsSnapshot;
use crate::protocol::Status;
use crate::session::{SessionId, StatusCounts};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Final state of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub id: SessionId,
    pub status: Status,
    /// Milliseconds from launch until the session reached success or error
    pub finished_after_ms: Option<u64>,
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: Option<RunOutcome>,
    pub concurrency: u32,
    pub elapsed_ms: u64,
    pub counts: StatusCounts,
    pub p50_finish_ms: u64,
    pub p95_finish_ms: u64,
    pub max_finish_ms: u64,
    pub sessions: Vec<SessionReport>,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    pub fn new(
        run_id: RunId,
        outcome: Option<RunOutcome>,
        concurrency: u32,
        elapsed: Duration,
        counts: StatusCounts,
        sessions: Vec<SessionReport>,
        metrics: MetricsSnapshot,
    ) -> Self {
        let mut finish_times: Vec<u64> =
            sessions.iter().filter_map(|s| s.finished_after_ms).collect();
        finish_times.sort_unstable();

        Self {
            run_id,
            outcome,
            concurrency,
            elapsed_ms: elapsed.as_millis() as u64,
            counts,
            p50_finish_ms: percentile(&finish_times, 0.50),
            p95_finish_ms: percentile(&finish_times, 0.95),
            max_finish_ms: finish_times.last().copied().unwrap_or(0),
            sessions,
            metrics,
        }
    }

    pub fn outcome_label(&self) -> String {
        match &self.outcome {
            Some(RunOutcome::Completed) => "completed".to_string(),
            Some(RunOutcome::SubmissionFailed(reason)) => format!("submission failed ({reason})"),
            Some(RunOutcome::ChannelLost) => "progress channel lost".to_string(),
            Some(RunOutcome::TimedOut) => "timed out".to_string(),
            None => "in progress".to_string(),
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Run Summary ===");
        println!("Run: {}", self.run_id);
        println!("Outcome: {}", self.outcome_label());
        println!("Sessions: {}", self.concurrency);
        println!("  Succeeded: {}", self.counts.success);
        println!("  Failed: {}", self.counts.error);
        if self.counts.in_flight() > 0 {
            println!("  Unfinished: {}", self.counts.in_flight());
        }
        println!("\nTime to finish:");
        println!("  P50: {} ms", self.p50_finish_ms);
        println!("  P95: {} ms", self.p95_finish_ms);
        println!("  Max: {} ms", self.max_finish_ms);

        let failed: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| s.status == Status::Error)
            .collect();
        if !failed.is_empty() {
            println!("\nFailed sessions:");
            for session in failed {
                println!("  {}: {}", session.id, first_line(&session.response));
            }
        }

        println!("\nChannel:");
        println!("  Frames received: {}", self.metrics.frames_received);
        println!(
            "  Dropped (stale/late/unknown): {}/{}/{}",
            self.metrics.stale_frames, self.metrics.late_frames, self.metrics.unknown_frames
        );
        println!("  Reconnects: {}", self.metrics.channels_opened.saturating_sub(1));
        println!(
            "\nElapsed: {} ms ({:.2} s)",
            self.elapsed_ms,
            self.elapsed_ms as f64 / 1000.0
        );
        println!("===================\n");
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn percentile(sorted_data: &[u64], p: f64) -> u64 {
    if sorted_data.is_empty() {
        return 0;
    }
    let idx = (p * (sorted_data.len() - 1) as f64).round() as usize;
    sorted_data[idx.min(sorted_data.len() - 1)]
}
