//! Report window and the dense daily series.

use crate::models::{DailyBucket, Outcome};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// The calendar window a report covers: `period_days + 1` days ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub period_days: u32,
    pub today: NaiveDate,
    /// Offset that decides which calendar day an answer belongs to.
    pub offset: FixedOffset,
}

impl ReportWindow {
    pub fn new(period_days: u32, today: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            period_days,
            today,
            offset,
        }
    }

    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        self.today - Duration::days(i64::from(self.period_days))
    }

    /// Instant the first day begins, used as the fetch lower bound.
    pub fn since(&self) -> DateTime<Utc> {
        self.midnight(self.start())
    }

    /// Instant the day after `today` begins. Exclusive fetch upper bound.
    pub fn until(&self) -> DateTime<Utc> {
        self.midnight(self.today + Duration::days(1))
    }

    /// Whether `date` is one of the window's days.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start() <= date && date <= self.today
    }

    fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let utc_midnight =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_midnight)
    }

    /// Calendar day of an instant in this window's offset.
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Zero-filled buckets for every day of the window, ascending.
    pub fn empty_buckets(&self) -> Vec<DailyBucket> {
        let start = self.start();
        (0..=i64::from(self.period_days))
            .map(|day| DailyBucket::empty(start + Duration::days(day)))
            .collect()
    }
}

/// Dense per-day counters indexed by offset from the window start.
#[derive(Debug, Clone)]
pub struct DailySeries {
    start: NaiveDate,
    buckets: Vec<DailyBucket>,
}

impl DailySeries {
    pub fn new(window: &ReportWindow) -> Self {
        Self {
            start: window.start(),
            buckets: window.empty_buckets(),
        }
    }

    /// Count a resolved answer on `date`. Blank answers and days outside the
    /// window are ignored; returns whether a bucket was updated.
    pub fn record(&mut self, date: NaiveDate, outcome: Outcome) -> bool {
        if outcome == Outcome::Blank {
            return false;
        }

        let index = (date - self.start).num_days();
        let Some(bucket) = usize::try_from(index)
            .ok()
            .and_then(|i| self.buckets.get_mut(i))
        else {
            return false;
        };

        bucket.answered += 1;
        match outcome {
            Outcome::Correct => bucket.correct += 1,
            Outcome::Incorrect => bucket.incorrect += 1,
            Outcome::Blank => {}
        }
        true
    }

    pub fn into_buckets(self) -> Vec<DailyBucket> {
        self.buckets
    }
}
