//! In-memory accumulation of samples into the open bucket.

use chrono::{DateTime, Utc};

use crate::bucket::{Bucket, BucketId};
use crate::sample::Sample;
use crate::store::{BucketStore, StoreError};

/// Owns the currently open bucket.
///
/// Every observed sample adds one sampling interval to its
/// `(application, window_label)` counter. [`flush`](Self::flush) hands the
/// bucket to storage and opens a new one; if storage refuses, the bucket
/// stays open and keeps growing until a later flush succeeds.
#[derive(Debug)]
pub struct Accumulator {
    interval_secs: u64,
    current: Bucket,
}

impl Accumulator {
    pub fn new(interval_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            interval_secs,
            current: Bucket::open(now),
        }
    }

    pub const fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// The open bucket.
    pub const fn current(&self) -> &Bucket {
        &self.current
    }

    pub fn observe(&mut self, sample: &Sample) {
        self.current
            .record(&sample.application, &sample.window_label, self.interval_secs);
    }

    /// Persists the open bucket and replaces it with a fresh one opened at `now`.
    ///
    /// On error the open bucket is left untouched.
    pub fn flush(
        &mut self,
        store: &mut dyn BucketStore,
        now: DateTime<Utc>,
    ) -> Result<BucketId, StoreError> {
        store.append(&self.current)?;
        let flushed = std::mem::replace(&mut self.current, Bucket::open(now));
        tracing::debug!(
            bucket_id = %flushed.id(),
            groups = flushed.groups().len(),
            total_secs = flushed.total_duration(),
            "bucket flushed"
        );
        Ok(flushed.id().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::bucket::WindowDuration;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    /// Store that refuses every append.
    struct BrokenStore;

    impl BucketStore for BrokenStore {
        fn append(&mut self, bucket: &Bucket) -> Result<(), StoreError> {
            Err(StoreError::AppendFailed {
                bucket_id: bucket.id().clone(),
                source: "disk full".into(),
            })
        }

        fn fetch_range(&self, _: i64, _: i64) -> Result<Vec<Bucket>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap()
    }

    fn sample(app: &str, label: &str) -> Sample {
        Sample::new(app, label, t0())
    }

    #[test]
    fn observing_same_pair_k_times_yields_one_window() {
        let mut acc = Accumulator::new(5, t0());
        for _ in 0..7 {
            acc.observe(&sample("Chrome", "a.com"));
        }

        let group = acc.current().group("Chrome").unwrap();
        assert_eq!(group.windows(), &[WindowDuration::new("a.com", 35)]);
    }

    #[test]
    fn merge_scenario_produces_expected_windows() {
        let mut acc = Accumulator::new(5, t0());
        for _ in 0..3 {
            acc.observe(&sample("Chrome", "a.com"));
        }
        acc.observe(&sample("Chrome", "b.com"));

        let group = acc.current().group("Chrome").unwrap();
        assert_eq!(group.window("a.com").unwrap().duration_secs, 15);
        assert_eq!(group.window("b.com").unwrap().duration_secs, 5);
        assert_eq!(group.total_duration(), 20);
    }

    #[test]
    fn flush_persists_and_opens_fresh_bucket() {
        let mut store = MemoryStore::new();
        let mut acc = Accumulator::new(5, t0());
        acc.observe(&sample("Finder", "Downloads"));
        let before = acc.current().id().clone();

        let later = t0() + Duration::minutes(5);
        let flushed = acc.flush(&mut store, later).unwrap();

        assert_eq!(flushed, before);
        assert_eq!(store.len(), 1);
        assert_eq!(store.buckets()[0].total_duration(), 5);
        assert!(acc.current().is_empty());
        assert_eq!(acc.current().opened_at(), later);
        assert_ne!(acc.current().id(), &before);
    }

    #[test]
    fn empty_bucket_can_be_flushed() {
        let mut store = MemoryStore::new();
        let mut acc = Accumulator::new(5, t0());
        acc.flush(&mut store, t0()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.buckets()[0].is_empty());
    }

    #[test]
    fn failed_flush_keeps_bucket_and_keeps_accumulating() {
        let mut acc = Accumulator::new(5, t0());
        acc.observe(&sample("Chrome", "a.com"));
        let id = acc.current().id().clone();

        let err = acc.flush(&mut BrokenStore, t0()).unwrap_err();
        assert!(err.source().is_some());
        assert_eq!(acc.current().id(), &id);

        acc.observe(&sample("Chrome", "a.com"));
        let mut store = MemoryStore::new();
        acc.flush(&mut store, t0()).unwrap();

        let stored = &store.buckets()[0];
        assert_eq!(stored.id(), &id);
        assert_eq!(stored.total_duration(), 10);
    }
}
