//! Core logic for the mlog activity tracker.
//!
//! This crate contains:
//! - Accumulation: merging focus samples into fixed-length time buckets
//! - Reduction: folding the buckets of a query range into one summary
//! - Reporting: thresholded, sorted views of a summary
//! - Range selection: turning "today" or "last 2 weeks" into time bounds
//!
//! Platform sensing and durable storage are reached through the [`Sensor`]
//! and [`BucketStore`] traits.

mod accumulator;
mod bucket;
pub mod query;
pub mod range;
mod recorder;
mod reduce;
pub mod report;
mod sample;
mod store;

pub use accumulator::Accumulator;
pub use bucket::{Bucket, BucketId, EmptyBucketId, Group, WindowDuration};
pub use query::{query_detail, query_report, query_summary};
pub use range::{RangeError, RangeSpec, TimeRange};
pub use recorder::{Recorder, RecorderConfig, TickOutcome};
pub use reduce::{Summary, SummaryEntry, reduce};
pub use report::{Report, ReportEntry, format_duration};
pub use sample::{Sample, Sensor, SensorError};
pub use store::{BucketStore, MemoryStore, StoreError};
