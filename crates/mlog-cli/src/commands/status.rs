//! Status command: what has been recorded so far.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use mlog_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let count = db.count_buckets()?;

    writeln!(writer, "mlog status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    let Some(last) = db.last_bucket_opened_at()? else {
        writeln!(writer, "No buckets recorded.")?;
        return Ok(());
    };

    writeln!(writer, "Buckets: {count}")?;
    writeln!(writer, "Last bucket opened: {}", last.to_rfc3339())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use mlog_core::Bucket;

    #[test]
    fn status_reports_bucket_count_and_last_bucket() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("mlog.db");
        let mut db = Database::open(&db_path).unwrap();

        for hour in [9, 10] {
            let mut bucket = Bucket::open(Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap());
            bucket.record("Terminal", "vim", 300);
            db.insert_bucket(&bucket).unwrap();
        }

        let mut output = Vec::new();
        run(&mut output, &db, &db_path).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/mlog.db");
        assert_snapshot!(output, @r"
        mlog status
        Database: [TEMP]/mlog.db
        Buckets: 2
        Last bucket opened: 2025-01-01T10:00:00+00:00
        ");
    }

    #[test]
    fn status_on_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, Path::new("/data/mlog.db")).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        mlog status
        Database: /data/mlog.db
        No buckets recorded.
        ");
    }
}
