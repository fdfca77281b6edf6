//! Named query ranges and their resolution to concrete time bounds.
//!
//! Day boundaries are computed in the time zone of the `now` passed in, so
//! "today" means since local midnight. Both bounds are inclusive.

use std::fmt;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

const DAYS_PER_WEEK: u32 = 7;

/// Weeks in a "month". A calendar month is not attempted.
pub const WEEKS_PER_MONTH: u32 = 4;

/// Rejected range requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("unknown range '{name}', expected today, yesterday, day, week or month")]
    UnknownRange { name: String },

    #[error("range count must be a positive number, got {count}")]
    InvalidCount { count: i64 },
}

/// A named, relative query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// Local midnight until now.
    Today,
    /// The previous calendar day.
    Yesterday,
    /// The last `n` whole days, excluding today.
    Days(u32),
    /// The last `n` weeks up to now, starting at a local midnight.
    Weeks(u32),
    /// Four weeks up to now.
    Month,
}

impl RangeSpec {
    /// Parses a range name with an optional count (defaults to 1).
    ///
    /// Accepted names: `today`, `yesterday`, `day`/`days`, `week`/`weeks`, `month`.
    pub fn parse(name: &str, count: Option<i64>) -> Result<Self, RangeError> {
        let count = count.unwrap_or(1);
        match name.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "day" | "days" => Self::days(count),
            "week" | "weeks" => Self::weeks(count),
            "month" => Ok(Self::Month),
            _ => Err(RangeError::UnknownRange {
                name: name.to_string(),
            }),
        }
    }

    pub fn days(count: i64) -> Result<Self, RangeError> {
        positive(count).map(Self::Days)
    }

    pub fn weeks(count: i64) -> Result<Self, RangeError> {
        positive(count).map(Self::Weeks)
    }

    /// Day or week count of the range; 1 for ranges that take no count.
    pub const fn count(self) -> u32 {
        match self {
            Self::Days(n) | Self::Weeks(n) => n,
            Self::Today | Self::Yesterday | Self::Month => 1,
        }
    }
}

fn positive(count: i64) -> Result<u32, RangeError> {
    u32::try_from(count)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(RangeError::InvalidCount { count })
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Yesterday | Self::Days(1) => f.write_str("yesterday"),
            Self::Days(n) => write!(f, "last {n} days"),
            Self::Weeks(1) => f.write_str("last week"),
            Self::Weeks(n) => write!(f, "last {n} weeks"),
            Self::Month => f.write_str("last month"),
        }
    }
}

/// Inclusive `[start, end]` bounds of a resolved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Resolves `spec` against `now`, using `now`'s time zone for midnight.
    pub fn resolve<Tz: TimeZone>(spec: RangeSpec, now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let tz = now.timezone();
        let now = now.with_timezone(&Utc);
        let midnight_before = |days: u32| local_midnight(&tz, days_before(today, days));

        match spec {
            RangeSpec::Today => Self {
                start: midnight_before(0),
                end: now,
            },
            RangeSpec::Yesterday => Self {
                start: midnight_before(1),
                end: midnight_before(0),
            },
            RangeSpec::Days(n) => Self {
                start: midnight_before(n),
                end: midnight_before(0),
            },
            RangeSpec::Weeks(n) => Self {
                start: midnight_before(n.saturating_mul(DAYS_PER_WEEK)),
                end: now,
            },
            RangeSpec::Month => Self {
                start: midnight_before(WEEKS_PER_MONTH * DAYS_PER_WEEK),
                end: now,
            },
        }
    }

    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }
}

fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// First instant of `date` in `tz`.
///
/// An ambiguous midnight (DST fall-back) resolves to the earlier instant; a
/// midnight skipped by a DST gap falls back to 1am.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, MappedLocalTime};

    fn at(
        tz: &FixedOffset,
        (y, m, d): (i32, u32, u32),
        (h, min, s): (u32, u32, u32),
    ) -> DateTime<FixedOffset> {
        tz.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn plus_one() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    /// Zone whose UTC offset changes from `BEFORE` to `AFTER` seconds at the
    /// Unix time `SWITCH`.
    #[derive(Debug, Clone, Copy)]
    struct ShiftZone<const BEFORE: i32, const AFTER: i32, const SWITCH: i64>;

    /// Clocks jump from 00:00 to 01:00 on 2018-11-04 (UTC-3 to UTC-2).
    type GapAtMidnight = ShiftZone<-10_800, -7_200, 1_541_300_400>;

    /// Clocks fall back from 01:00 to 00:00 on 2019-02-17 (UTC-2 to UTC-3).
    type RepeatedMidnight = ShiftZone<-7_200, -10_800, 1_550_372_400>;

    impl<const BEFORE: i32, const AFTER: i32, const SWITCH: i64> ShiftZone<BEFORE, AFTER, SWITCH> {
        fn before() -> FixedOffset {
            FixedOffset::east_opt(BEFORE).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::east_opt(AFTER).unwrap()
        }

        fn switch() -> NaiveDateTime {
            DateTime::from_timestamp(SWITCH, 0).unwrap().naive_utc()
        }
    }

    impl<const BEFORE: i32, const AFTER: i32, const SWITCH: i64> TimeZone
        for ShiftZone<BEFORE, AFTER, SWITCH>
    {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            Self
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> MappedLocalTime<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(
            &self,
            local: &NaiveDateTime,
        ) -> MappedLocalTime<FixedOffset> {
            let utc = |offset: FixedOffset| {
                *local - Duration::seconds(i64::from(offset.local_minus_utc()))
            };
            let before = Some(Self::before()).filter(|&o| utc(o) < Self::switch());
            let after = Some(Self::after()).filter(|&o| utc(o) >= Self::switch());
            match (before, after) {
                (Some(b), Some(a)) if utc(b) <= utc(a) => MappedLocalTime::Ambiguous(b, a),
                (Some(b), Some(a)) => MappedLocalTime::Ambiguous(a, b),
                (Some(o), None) | (None, Some(o)) => MappedLocalTime::Single(o),
                (None, None) => MappedLocalTime::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn today_runs_from_local_midnight_to_now() {
        let tz = plus_one();
        let now = at(&tz, (2024, 1, 10), (15, 0, 0));

        let range = TimeRange::resolve(RangeSpec::Today, &now);

        assert_eq!(range.start, at(&tz, (2024, 1, 10), (0, 0, 0)));
        assert_eq!(range.end, now);
    }

    #[test]
    fn last_day_runs_between_midnights() {
        let tz = plus_one();
        let now = at(&tz, (2024, 1, 10), (15, 0, 0));

        let range = TimeRange::resolve(RangeSpec::Days(1), &now);

        assert_eq!(range.start, at(&tz, (2024, 1, 9), (0, 0, 0)));
        assert_eq!(range.end, at(&tz, (2024, 1, 10), (0, 0, 0)));
        assert_eq!(TimeRange::resolve(RangeSpec::Yesterday, &now), range);
    }

    #[test]
    fn last_days_spans_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
        let range = TimeRange::resolve(RangeSpec::Days(3), &now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn weeks_end_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap();
        let range = TimeRange::resolve(RangeSpec::Weeks(2), &now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2023, 12, 27, 0, 0, 0).unwrap());
        assert_eq!(range.end, now);
    }

    #[test]
    fn month_is_four_weeks() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(
            TimeRange::resolve(RangeSpec::Month, &now),
            TimeRange::resolve(RangeSpec::Weeks(4), &now)
        );
        assert_eq!(
            TimeRange::resolve(RangeSpec::Month, &now).start,
            Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn epochs_match_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap();
        let range = TimeRange::resolve(RangeSpec::Today, &now);
        assert_eq!(range.start_epoch(), 1_704_844_800);
        assert_eq!(range.end_epoch(), 1_704_898_800);
    }

    #[test]
    fn skipped_midnight_starts_at_one_am() {
        let zone = GapAtMidnight {};
        assert!(zone.with_ymd_and_hms(2018, 11, 4, 0, 0, 0).earliest().is_none());
        let now = zone.with_ymd_and_hms(2018, 11, 4, 15, 0, 0).unwrap();

        let today = TimeRange::resolve(RangeSpec::Today, &now);
        assert_eq!(today.start, utc(2018, 11, 4, 3));
        assert_eq!(today.start, zone.with_ymd_and_hms(2018, 11, 4, 1, 0, 0).unwrap());
        assert_eq!(today.end, utc(2018, 11, 4, 17));

        let last_day = TimeRange::resolve(RangeSpec::Days(1), &now);
        assert_eq!(last_day.start, utc(2018, 11, 3, 3));
        assert_eq!(last_day.end, utc(2018, 11, 4, 3));
    }

    #[test]
    fn repeated_midnight_starts_at_earlier_instant() {
        let zone = RepeatedMidnight {};
        assert!(matches!(
            zone.with_ymd_and_hms(2019, 2, 17, 0, 0, 0),
            MappedLocalTime::Ambiguous(..)
        ));
        let now = zone.with_ymd_and_hms(2019, 2, 17, 15, 0, 0).unwrap();

        let today = TimeRange::resolve(RangeSpec::Today, &now);
        assert_eq!(today.start, utc(2019, 2, 17, 2));
        assert_eq!(today.end, utc(2019, 2, 17, 18));

        let last_day = TimeRange::resolve(RangeSpec::Days(1), &now);
        assert_eq!(last_day.start, utc(2019, 2, 16, 2));
        assert_eq!(last_day.end, utc(2019, 2, 17, 2));
    }

    #[test]
    fn count_defaults_to_one() {
        assert_eq!(RangeSpec::Today.count(), 1);
        assert_eq!(RangeSpec::Month.count(), 1);
        assert_eq!(RangeSpec::Days(3).count(), 3);
        assert_eq!(RangeSpec::Weeks(2).count(), 2);
    }

    #[test]
    fn parse_accepts_names_and_counts() {
        assert_eq!(RangeSpec::parse("today", None), Ok(RangeSpec::Today));
        assert_eq!(RangeSpec::parse("Yesterday", None), Ok(RangeSpec::Yesterday));
        assert_eq!(RangeSpec::parse("day", None), Ok(RangeSpec::Days(1)));
        assert_eq!(RangeSpec::parse("days", Some(3)), Ok(RangeSpec::Days(3)));
        assert_eq!(RangeSpec::parse("week", Some(2)), Ok(RangeSpec::Weeks(2)));
        assert_eq!(RangeSpec::parse("month", None), Ok(RangeSpec::Month));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            RangeSpec::parse("fortnight", None),
            Err(RangeError::UnknownRange {
                name: "fortnight".into()
            })
        );
        assert_eq!(
            RangeSpec::parse("day", Some(0)),
            Err(RangeError::InvalidCount { count: 0 })
        );
        assert_eq!(
            RangeSpec::weeks(-2),
            Err(RangeError::InvalidCount { count: -2 })
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(RangeSpec::Today.to_string(), "today");
        assert_eq!(RangeSpec::Days(1).to_string(), "yesterday");
        assert_eq!(RangeSpec::Days(5).to_string(), "last 5 days");
        assert_eq!(RangeSpec::Weeks(1).to_string(), "last week");
        assert_eq!(RangeSpec::Month.to_string(), "last month");
    }
}
