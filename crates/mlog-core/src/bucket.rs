//! Time buckets: the persisted unit of accumulated activity.
//!
//! A [`Bucket`] covers one sampling interval. It holds one [`Group`] per
//! application seen during the interval, and each group holds one
//! [`WindowDuration`] per window label. Both levels keep first-seen order in
//! a `Vec` alongside a name index, so merging a sample is a hash lookup
//! rather than a linear scan.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Returned when a bucket ID is constructed from an empty string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("bucket ID cannot be empty")]
pub struct EmptyBucketId;

/// Opaque bucket identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketId(String);

impl BucketId {
    /// Generates a fresh random ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing ID, e.g. one read back from storage.
    pub fn new(id: impl Into<String>) -> Result<Self, EmptyBucketId> {
        let id = id.into();
        if id.is_empty() {
            return Err(EmptyBucketId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BucketId {
    type Error = EmptyBucketId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BucketId> for String {
    fn from(id: BucketId) -> Self {
        id.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulated time for one window label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDuration {
    pub label: String,
    pub duration_secs: u64,
}

impl WindowDuration {
    pub fn new(label: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            label: label.into(),
            duration_secs,
        }
    }
}

/// Per-application durations within a bucket.
///
/// Window labels are unique within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    application: String,
    windows: Vec<WindowDuration>,
    index: HashMap<String, usize>,
}

impl Group {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            windows: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    /// Windows in first-seen order.
    pub fn windows(&self) -> &[WindowDuration] {
        &self.windows
    }

    /// Adds `secs` to the window with this label, creating it if needed.
    pub fn add(&mut self, label: &str, secs: u64) {
        if let Some(&pos) = self.index.get(label) {
            self.windows[pos].duration_secs += secs;
            return;
        }
        self.index.insert(label.to_string(), self.windows.len());
        self.windows.push(WindowDuration::new(label, secs));
    }

    /// Looks up a window by exact label.
    pub fn window(&self, label: &str) -> Option<&WindowDuration> {
        self.index.get(label).map(|&pos| &self.windows[pos])
    }

    /// Sum of all window durations.
    pub fn total_duration(&self) -> u64 {
        self.windows.iter().map(|w| w.duration_secs).sum()
    }

    /// Splits into application name and windows.
    pub fn into_parts(self) -> (String, Vec<WindowDuration>) {
        (self.application, self.windows)
    }
}

/// One sampling interval's worth of activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    id: BucketId,
    opened_at: DateTime<Utc>,
    groups: Vec<Group>,
    index: HashMap<String, usize>,
}

impl Bucket {
    /// Opens an empty bucket with a fresh ID.
    ///
    /// `opened_at` is truncated to whole seconds, the resolution buckets are
    /// stored and queried at.
    pub fn open(now: DateTime<Utc>) -> Self {
        Self::with_id(BucketId::generate(), now)
    }

    /// Creates an empty bucket with a known ID.
    pub fn with_id(id: BucketId, opened_at: DateTime<Utc>) -> Self {
        Self {
            id,
            opened_at: opened_at.trunc_subsecs(0),
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub const fn id(&self) -> &BucketId {
        &self.id
    }

    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, application: &str) -> Option<&Group> {
        self.index.get(application).map(|&pos| &self.groups[pos])
    }

    /// Returns the group for `application`, creating it if needed.
    pub fn group_mut(&mut self, application: &str) -> &mut Group {
        let pos = match self.index.get(application) {
            Some(&pos) => pos,
            None => {
                let pos = self.groups.len();
                self.index.insert(application.to_string(), pos);
                self.groups.push(Group::new(application));
                pos
            }
        };
        &mut self.groups[pos]
    }

    /// Adds `secs` to the `(application, label)` counter.
    pub fn record(&mut self, application: &str, label: &str, secs: u64) {
        self.group_mut(application).add(label, secs);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_duration(&self) -> u64 {
        self.groups.iter().map(Group::total_duration).sum()
    }
}
