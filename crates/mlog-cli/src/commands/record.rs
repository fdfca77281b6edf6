//! Record command: the sampling loop.
//!
//! Ticks the recorder once per interval until `running` is cleared, then
//! writes whatever is left in the open bucket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use mlog_core::{BucketStore, Recorder, Sensor, TickOutcome};

/// Longest stretch slept without checking `running`.
const POLL_SLICE: Duration = Duration::from_millis(200);

/// Tick outcomes over one recording session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordStats {
    pub ticks: u64,
    pub flushed: u64,
    pub failed_flushes: u64,
}

impl RecordStats {
    const fn count(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Observed | TickOutcome::Skipped => {}
            TickOutcome::Flushed => self.flushed += 1,
            TickOutcome::FlushFailed => self.failed_flushes += 1,
        }
    }
}

pub fn run<S: Sensor>(
    recorder: &mut Recorder<S>,
    store: &mut dyn BucketStore,
    running: &AtomicBool,
    interval: Duration,
) -> RecordStats {
    let mut stats = RecordStats::default();
    tracing::info!(interval_secs = interval.as_secs(), "recording started");

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        stats.count(recorder.tick(store, Utc::now()));
        sleep_while_running(running, interval.saturating_sub(started.elapsed()));
    }

    if recorder.finish(store, Utc::now()) {
        stats.flushed += 1;
    }
    tracing::info!(?stats, "recording stopped");
    stats
}

fn sleep_while_running(running: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        std::thread::sleep(remaining.min(POLL_SLICE));
    }
}
