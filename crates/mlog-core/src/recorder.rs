//! One step of the sampling loop.
//!
//! The process that owns the timer calls [`Recorder::tick`] once per sampling
//! interval. Holding the recorder by `&mut` serializes observe and flush.

use chrono::{DateTime, Utc};

use crate::accumulator::Accumulator;
use crate::sample::Sensor;
use crate::store::BucketStore;

/// Recorder timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Seconds between samples; each sample credits this much time.
    pub interval_secs: u64,
    /// Samples per bucket before a flush is attempted.
    pub samples_per_bucket: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            samples_per_bucket: 60,
        }
    }
}

/// What happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sample merged into the open bucket.
    Observed,
    /// Sensor could not be polled; nothing changed.
    Skipped,
    /// Flush cadence reached and the bucket was persisted.
    Flushed,
    /// Flush cadence reached but the bucket could not be persisted.
    FlushFailed,
}

/// Drives a [`Sensor`] into an [`Accumulator`] on a fixed cadence.
#[derive(Debug)]
pub struct Recorder<S> {
    sensor: S,
    accumulator: Accumulator,
    samples_per_bucket: u32,
    ticks: u32,
}

impl<S: Sensor> Recorder<S> {
    pub fn new(sensor: S, config: RecorderConfig, now: DateTime<Utc>) -> Self {
        Self {
            sensor,
            accumulator: Accumulator::new(config.interval_secs, now),
            samples_per_bucket: config.samples_per_bucket.max(1),
            ticks: 0,
        }
    }

    pub const fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Samples once and flushes when the cadence is reached.
    ///
    /// Skipped samples still count toward the flush cadence.
    pub fn tick(&mut self, store: &mut dyn BucketStore, now: DateTime<Utc>) -> TickOutcome {
        let observed = match self.sensor.sample(now) {
            Ok(sample) => {
                tracing::trace!(
                    app = %sample.application,
                    label = %sample.window_label,
                    "sample"
                );
                self.accumulator.observe(&sample);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping sample");
                false
            }
        };

        self.ticks += 1;
        if self.ticks < self.samples_per_bucket {
            return if observed {
                TickOutcome::Observed
            } else {
                TickOutcome::Skipped
            };
        }
        self.ticks = 0;

        match self.accumulator.flush(store, now) {
            Ok(bucket_id) => {
                tracing::info!(%bucket_id, "bucket saved");
                TickOutcome::Flushed
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    cause = %e.source_message(),
                    "failed to save bucket, keeping it for the next flush"
                );
                TickOutcome::FlushFailed
            }
        }
    }

    /// Flushes a non-empty open bucket, e.g. on shutdown.
    pub fn finish(&mut self, store: &mut dyn BucketStore, now: DateTime<Utc>) -> bool {
        if self.accumulator.current().is_empty() {
            return false;
        }
        match self.accumulator.flush(store, now) {
            Ok(bucket_id) => {
                tracing::info!(%bucket_id, "final bucket saved");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, cause = %e.source_message(), "final bucket lost");
                false
            }
        }
    }
}
