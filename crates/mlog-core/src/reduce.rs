//! Query-time reduction of many buckets into one summary.
//!
//! Which bucket a duration came from does not matter once a range has been
//! selected: Chrome for 60s in one bucket and 45s in another is simply 105s
//! of Chrome. [`reduce`] flattens every group of every bucket, merges groups
//! by application name and windows by label, and sums the durations.
//!
//! Output order is first-seen order over the flattened input. The values
//! (names, labels, sums) do not depend on the order of the input buckets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bucket::{Bucket, Group, WindowDuration};

/// Total time for one application over a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub application: String,
    /// Always the sum of `windows`.
    pub total_duration: u64,
    pub windows: Vec<WindowDuration>,
}

impl SummaryEntry {
    fn from_group(group: Group) -> Self {
        let total_duration = group.total_duration();
        let (application, windows) = group.into_parts();
        Self {
            application,
            total_duration,
            windows,
        }
    }

    pub fn window(&self, label: &str) -> Option<&WindowDuration> {
        self.windows.iter().find(|w| w.label == label)
    }
}

/// Reduced summary: one entry per distinct application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary {
    entries: Vec<SummaryEntry>,
}

impl Summary {
    /// Entries in first-seen order.
    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SummaryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-name lookup.
    pub fn get(&self, application: &str) -> Option<&SummaryEntry> {
        self.entries.iter().find(|e| e.application == application)
    }

    /// First entry whose name matches ignoring case.
    pub fn find_ignore_case(&self, application: &str) -> Option<&SummaryEntry> {
        let wanted = application.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.application.to_lowercase() == wanted)
    }

    /// Sum of every entry's total.
    pub fn total_duration(&self) -> u64 {
        self.entries.iter().map(|e| e.total_duration).sum()
    }
}

/// Folds `buckets` into a single [`Summary`].
pub fn reduce(buckets: &[Bucket]) -> Summary {
    let mut merged: Vec<Group> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for group in buckets.iter().flat_map(Bucket::groups) {
        let pos = *index.entry(group.application()).or_insert_with(|| {
            merged.push(Group::new(group.application()));
            merged.len() - 1
        });
        for window in group.windows() {
            merged[pos].add(&window.label, window.duration_secs);
        }
    }

    Summary {
        entries: merged.into_iter().map(SummaryEntry::from_group).collect(),
    }
}
