//! Report command: time per application for a range.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use mlog_core::{BucketStore, RangeSpec, Report, query_report};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ReportJson<'a> {
    range: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a Report,
}

pub fn run<W, S, Tz>(
    writer: &mut W,
    store: &S,
    spec: RangeSpec,
    threshold_minutes: u64,
    json: bool,
    now: &DateTime<Tz>,
) -> Result<()>
where
    W: Write,
    S: BucketStore + ?Sized,
    Tz: TimeZone,
{
    let (range, report) = query_report(store, spec, threshold_minutes, now)
        .with_context(|| format!("failed to query {spec}"))?;

    if json {
        let out = ReportJson {
            range: spec.to_string(),
            start: range.start,
            end: range.end,
            report: &report,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&out)?)?;
        return Ok(());
    }

    writeln!(writer, "Data range: {spec}")?;
    write!(writer, "{report}")?;
    Ok(())
}
