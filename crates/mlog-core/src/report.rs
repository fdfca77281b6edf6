//! Human-facing view of a reduced range.
//!
//! The threshold only decides what gets shown. An application whose total is
//! below the threshold is left out entirely; a window below the threshold is
//! hidden, but its time still counts toward its application's total.

use std::fmt;

use serde::Serialize;

use crate::bucket::{Bucket, WindowDuration};
use crate::reduce::{SummaryEntry, reduce};

const SECS_PER_MINUTE: u64 = 60;

/// One application line in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub application: String,
    /// Total over all windows, including hidden ones.
    pub total_duration: u64,
    /// Windows at or above the threshold, longest first.
    pub windows: Vec<WindowDuration>,
    /// Number of windows below the threshold.
    pub hidden_windows: usize,
}

/// Sorted, thresholded view over a set of buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub threshold_minutes: u64,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    /// Reduces `buckets` and applies the display threshold.
    pub fn build(buckets: &[Bucket], threshold_minutes: u64) -> Self {
        let threshold_secs = threshold_minutes.saturating_mul(SECS_PER_MINUTE);

        let mut summary = reduce(buckets).into_entries();
        // Stable: ties keep first-seen order.
        summary.sort_by_key(|e| std::cmp::Reverse(e.total_duration));

        let entries = summary
            .into_iter()
            .filter(|e| e.total_duration >= threshold_secs)
            .map(|e| ReportEntry::new(e, threshold_minutes))
            .collect();

        Self {
            threshold_minutes,
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReportEntry {
    fn new(entry: SummaryEntry, threshold_minutes: u64) -> Self {
        let SummaryEntry {
            application,
            total_duration,
            mut windows,
        } = entry;
        windows.sort_by_key(|w| std::cmp::Reverse(w.duration_secs));

        let before = windows.len();
        windows.retain(|w| w.duration_secs / SECS_PER_MINUTE >= threshold_minutes);
        let hidden_windows = before - windows.len();

        Self {
            application,
            total_duration,
            windows,
            hidden_windows,
        }
    }
}

/// Formats seconds as whole minutes, or as seconds below one minute.
pub fn format_duration(secs: u64) -> String {
    if secs < SECS_PER_MINUTE {
        format!("{secs} sec")
    } else {
        format!("{} min", secs / SECS_PER_MINUTE)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Threshold: {} min", self.threshold_minutes)?;

        if self.entries.is_empty() {
            writeln!(f)?;
            return writeln!(f, "No activity to show.");
        }

        for entry in &self.entries {
            writeln!(f)?;
            writeln!(
                f,
                "{}: {}",
                entry.application,
                format_duration(entry.total_duration)
            )?;
            for window in &entry.windows {
                let label = if window.label.is_empty() {
                    "(untitled)"
                } else {
                    &window.label
                };
                writeln!(
                    f,
                    "    * {:>4} min  {label}",
                    window.duration_secs / SECS_PER_MINUTE
                )?;
            }
        }
        Ok(())
    }
}
