//! Detail command: time per window for one application.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeZone};
use mlog_core::{BucketStore, RangeSpec, format_duration, query_detail};

pub fn run<W, S, Tz>(
    writer: &mut W,
    store: &S,
    spec: RangeSpec,
    application: &str,
    json: bool,
    now: &DateTime<Tz>,
) -> Result<()>
where
    W: Write,
    S: BucketStore + ?Sized,
    Tz: TimeZone,
{
    let Some(entry) = query_detail(store, spec, application, now)
        .with_context(|| format!("failed to query {spec}"))?
    else {
        bail!("no activity for '{application}' in {spec}");
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entry)?)?;
        return Ok(());
    }

    writeln!(writer, "Data range: {spec}")?;
    writeln!(
        writer,
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
            writer,
            "    * {:>8}  {label}",
            format_duration(window.duration_secs)
        )?;
    }
    Ok(())
}
