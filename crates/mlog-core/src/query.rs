//! Range queries over a [`BucketStore`].
//!
//! These are the entry points the CLI and the HTTP service share. Callers
//! parse the range up front, so the only failure left here is the store's.
//! Buckets are fetched once and everything after that is in-memory reduction.

use chrono::{DateTime, TimeZone};

use crate::bucket::Bucket;
use crate::range::{RangeSpec, TimeRange};
use crate::reduce::{Summary, SummaryEntry, reduce};
use crate::report::Report;
use crate::store::{BucketStore, StoreError};

/// Fetches the buckets opened within `spec`, resolved against `now`.
pub fn fetch<S, Tz>(
    store: &S,
    spec: RangeSpec,
    now: &DateTime<Tz>,
) -> Result<(TimeRange, Vec<Bucket>), StoreError>
where
    S: BucketStore + ?Sized,
    Tz: TimeZone,
{
    let range = TimeRange::resolve(spec, now);
    let buckets = store.fetch_range(range.start_epoch(), range.end_epoch())?;
    tracing::debug!(
        %spec,
        start = %range.start,
        end = %range.end,
        buckets = buckets.len(),
        "fetched buckets"
    );
    Ok((range, buckets))
}

/// Reduced summary for a range.
pub fn query_summary<S, Tz>(
    store: &S,
    spec: RangeSpec,
    now: &DateTime<Tz>,
) -> Result<Summary, StoreError>
where
    S: BucketStore + ?Sized,
    Tz: TimeZone,
{
    let (_, buckets) = fetch(store, spec, now)?;
    Ok(reduce(&buckets))
}

/// Thresholded report for a range.
pub fn query_report<S, Tz>(
    store: &S,
    spec: RangeSpec,
    threshold_minutes: u64,
    now: &DateTime<Tz>,
) -> Result<(TimeRange, Report), StoreError>
where
    S: BucketStore + ?Sized,
    Tz: TimeZone,
{
    let (range, buckets) = fetch(store, spec, now)?;
    Ok((range, Report::build(&buckets, threshold_minutes)))
}

/// Window breakdown for one application, matched ignoring case.
///
/// When several stored names differ only in case, the first one seen wins.
/// Windows are ordered longest first.
pub fn query_detail<S, Tz>(
    store: &S,
    spec: RangeSpec,
    application: &str,
    now: &DateTime<Tz>,
) -> Result<Option<SummaryEntry>, StoreError>
where
    S: BucketStore + ?Sized,
    Tz: TimeZone,
{
    let summary = query_summary(store, spec, now)?;
    let Some(entry) = summary.find_ignore_case(application) else {
        return Ok(None);
    };
    let mut entry = entry.clone();
    entry
        .windows
        .sort_by_key(|w| std::cmp::Reverse(w.duration_secs));
    Ok(Some(entry))
}
