//! Bucket persistence boundary.
//!
//! The core only needs two operations from storage: append a completed
//! bucket, and read back every bucket opened within an inclusive epoch range.
//! [`MemoryStore`] implements both in memory for tests and dry runs.

use std::error::Error as StdError;

use thiserror::Error;

use crate::bucket::{Bucket, BucketId};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Storage failures surfaced to the core.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The bucket could not be persisted. The caller keeps it and retries.
    #[error("failed to append bucket {bucket_id}")]
    AppendFailed {
        bucket_id: BucketId,
        #[source]
        source: BoxError,
    },

    /// Buckets for a query range could not be read.
    #[error("failed to fetch buckets between {start_epoch} and {end_epoch}")]
    FetchFailed {
        start_epoch: i64,
        end_epoch: i64,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    /// Message of the underlying storage error.
    pub fn source_message(&self) -> String {
        match self {
            Self::AppendFailed { source, .. } | Self::FetchFailed { source, .. } => {
                source.to_string()
            }
        }
    }
}

/// Append-only bucket storage.
pub trait BucketStore {
    /// Persists a completed bucket. A bucket ID is stored at most once.
    fn append(&mut self, bucket: &Bucket) -> Result<(), StoreError>;

    /// Returns buckets whose `opened_at` epoch lies in `[start_epoch, end_epoch]`,
    /// ordered by `opened_at` ascending. An empty range is not an error.
    fn fetch_range(&self, start_epoch: i64, end_epoch: i64) -> Result<Vec<Bucket>, StoreError>;
}

impl<S: BucketStore + ?Sized> BucketStore for Box<S> {
    fn append(&mut self, bucket: &Bucket) -> Result<(), StoreError> {
        (**self).append(bucket)
    }

    fn fetch_range(&self, start_epoch: i64, end_epoch: i64) -> Result<Vec<Bucket>, StoreError> {
        (**self).fetch_range(start_epoch, end_epoch)
    }
}

#[derive(Debug, Error)]
#[error("bucket already stored")]
struct DuplicateBucket;

/// In-memory [`BucketStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    buckets: Vec<Bucket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All stored buckets in append order.
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }
}

impl BucketStore for MemoryStore {
    fn append(&mut self, bucket: &Bucket) -> Result<(), StoreError> {
        if self.buckets.iter().any(|b| b.id() == bucket.id()) {
            return Err(StoreError::AppendFailed {
                bucket_id: bucket.id().clone(),
                source: Box::new(DuplicateBucket),
            });
        }
        self.buckets.push(bucket.clone());
        Ok(())
    }

    fn fetch_range(&self, start_epoch: i64, end_epoch: i64) -> Result<Vec<Bucket>, StoreError> {
        let mut found: Vec<Bucket> = self
            .buckets
            .iter()
            .filter(|b| (start_epoch..=end_epoch).contains(&b.opened_at().timestamp()))
            .cloned()
            .collect();
        found.sort_by_key(Bucket::opened_at);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bucket_at(epoch: i64) -> Bucket {
        Bucket::open(Utc.timestamp_opt(epoch, 0).unwrap())
    }

    #[test]
    fn fetch_range_is_inclusive_and_sorted() {
        let mut store = MemoryStore::new();
        for epoch in [300, 100, 200, 400] {
            store.append(&bucket_at(epoch)).unwrap();
        }

        let found = store.fetch_range(100, 300).unwrap();
        let epochs: Vec<_> = found.iter().map(|b| b.opened_at().timestamp()).collect();
        assert_eq!(epochs, vec![100, 200, 300]);
    }

    #[test]
    fn empty_range_yields_empty_vec() {
        let mut store = MemoryStore::new();
        store.append(&bucket_at(100)).unwrap();
        assert!(store.fetch_range(500, 900).unwrap().is_empty());
        assert!(store.fetch_range(900, 500).unwrap().is_empty());
    }

    #[test]
    fn duplicate_append_is_rejected() {
        let mut store = MemoryStore::new();
        let bucket = bucket_at(100);
        store.append(&bucket).unwrap();

        let err = store.append(&bucket).unwrap_err();
        assert!(matches!(err, StoreError::AppendFailed { .. }));
        assert_eq!(store.len(), 1);
    }
}
