#![forbid(unsafe_code)]

// Client metrics - lock-free counters and a time-to-finish histogram

use serde::Serialize;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Arc;
use std::time::Duration;

/// Histogram bucket upper bounds in milliseconds.
const BUCKET_BOUNDS_MS: [u64; 10] = [
    100,
    250,
    500,
    1_000,
    2_500,
    5_000,
    10_000,
    30_000,
    60_000,
    300_000,
];

const BUCKET_LABELS: [&str; 10] = [
    "0.1", "0.25", "0.5", "1", "2.5", "5", "10", "30", "60", "300",
];

/// Prometheus-style cumulative histogram with fixed buckets.
pub struct Histogram {
    buckets: [AtomicU64; 10],
    count: AtomicU64,
    sum_ms: AtomicU64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.sum_ms.fetch_add(ms, Relaxed);
        self.count.fetch_add(1, Relaxed);
        for (i, &bound) in BUCKET_BOUNDS_MS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Relaxed);
            }
        }
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} histogram");
        for (i, label) in BUCKET_LABELS.iter().enumerate() {
            let val = self.buckets[i].load(Relaxed);
            let _ = writeln!(out, "{name}_bucket{{le=\"{label}\"}} {val}");
        }
        let count = self.count.load(Relaxed);
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
        let sum_ms = self.sum_ms.load(Relaxed);
        let _ = writeln!(out, "{name}_sum {}.{:03}", sum_ms / 1_000, sum_ms % 1_000);
        let _ = writeln!(out, "{name}_count {count}");
    }
}

/// Point-in-time copy of the counters, for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub progress_applied: u64,
    pub stale_frames: u64,
    pub late_frames: u64,
    pub unknown_frames: u64,
    pub channels_opened: u64,
    pub channel_losses: u64,
    pub submissions: u64,
    pub submission_failures: u64,
    pub runs_completed: u64,
    pub sessions_finished: u64,
}

/// Counters shared by the controller and anything reporting on it.
#[derive(Clone)]
pub struct ClientMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    frames_received: AtomicU64,
    progress_applied: AtomicU64,
    stale_frames: AtomicU64,
    late_frames: AtomicU64,
    unknown_frames: AtomicU64,
    channels_opened: AtomicU64,
    channel_losses: AtomicU64,
    submissions: AtomicU64,
    submission_failures: AtomicU64,
    runs_completed: AtomicU64,

    time_to_finish: Histogram,
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                frames_received: AtomicU64::new(0),
                progress_applied: AtomicU64::new(0),
                stale_frames: AtomicU64::new(0),
                late_frames: AtomicU64::new(0),
                unknown_frames: AtomicU64::new(0),
                channels_opened: AtomicU64::new(0),
                channel_losses: AtomicU64::new(0),
                submissions: AtomicU64::new(0),
                submission_failures: AtomicU64::new(0),
                runs_completed: AtomicU64::new(0),
                time_to_finish: Histogram::new(),
            }),
        }
    }

    // --- Counter increments ---

    pub fn inc_frames_received(&self) {
        self.inner.frames_received.fetch_add(1, Relaxed);
    }

    pub fn inc_progress_applied(&self) {
        self.inner.progress_applied.fetch_add(1, Relaxed);
    }

    pub fn inc_stale_frames(&self) {
        self.inner.stale_frames.fetch_add(1, Relaxed);
    }

    pub fn inc_late_frames(&self) {
        self.inner.late_frames.fetch_add(1, Relaxed);
    }

    pub fn inc_unknown_frames(&self) {
        self.inner.unknown_frames.fetch_add(1, Relaxed);
    }

    pub fn inc_channels_opened(&self) {
        self.inner.channels_opened.fetch_add(1, Relaxed);
    }

    pub fn inc_channel_losses(&self) {
        self.inner.channel_losses.fetch_add(1, Relaxed);
    }

    pub fn inc_submissions(&self) {
        self.inner.submissions.fetch_add(1, Relaxed);
    }

    pub fn inc_submission_failures(&self) {
        self.inner.submission_failures.fetch_add(1, Relaxed);
    }

    pub fn inc_runs_completed(&self) {
        self.inner.runs_completed.fetch_add(1, Relaxed);
    }

    // --- Histogram ---

    pub fn observe_time_to_finish(&self, duration: Duration) {
        self.inner.time_to_finish.observe(duration);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let i = &self.inner;
        MetricsSnapshot {
            frames_received: i.frames_received.load(Relaxed),
            progress_applied: i.progress_applied.load(Relaxed),
            stale_frames: i.stale_frames.load(Relaxed),
            late_frames: i.late_frames.load(Relaxed),
            unknown_frames: i.unknown_frames.load(Relaxed),
            channels_opened: i.channels_opened.load(Relaxed),
            channel_losses: i.channel_losses.load(Relaxed),
            submissions: i.submissions.load(Relaxed),
            submission_failures: i.submission_failures.load(Relaxed),
            runs_completed: i.runs_completed.load(Relaxed),
            sessions_finished: i.time_to_finish.count.load(Relaxed),
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(2048);
        let s = self.snapshot();

        render_counter(
            &mut out,
            "streamwatch_frames_received_total",
            "Frames received on the progress channel",
            s.frames_received,
        );
        render_counter(
            &mut out,
            "streamwatch_progress_applied_total",
            "Progress frames applied to a session",
            s.progress_applied,
        );
        render_counter(
            &mut out,
            "streamwatch_stale_frames_total",
            "Progress frames for unknown sessions",
            s.stale_frames,
        );
        render_counter(
            &mut out,
            "streamwatch_late_frames_total",
            "Progress frames for already finished sessions",
            s.late_frames,
        );
        render_counter(
            &mut out,
            "streamwatch_unknown_frames_total",
            "Frames matching no known shape",
            s.unknown_frames,
        );
        render_counter(
            &mut out,
            "streamwatch_channels_opened_total",
            "Progress channels opened",
            s.channels_opened,
        );
        render_counter(
            &mut out,
            "streamwatch_channel_losses_total",
            "Progress channels closed by the peer or network",
            s.channel_losses,
        );
        render_counter(
            &mut out,
            "streamwatch_submissions_total",
            "Start-test submissions sent",
            s.submissions,
        );
        render_counter(
            &mut out,
            "streamwatch_submission_failures_total",
            "Start-test submissions that failed",
            s.submission_failures,
        );
        render_counter(
            &mut out,
            "streamwatch_runs_completed_total",
            "Runs where every session finished",
            s.runs_completed,
        );

        self.inner.time_to_finish.render(
            "streamwatch_session_time_to_finish_seconds",
            "Time from launch until a session reached a terminal status",
            &mut out,
        );

        out
    }
}

fn render_counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}
