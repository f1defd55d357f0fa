use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// one calendar month used as the billing unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        assert!((1..=12).contains(&month), "month must be 1-12");
        Self { year, month }
    }

    /// the immediately preceding calendar month
    pub fn previous(&self) -> Period {
        if self.month == 1 {
            Period::new(self.year - 1, 12)
        } else {
            Period::new(self.year, self.month - 1)
        }
    }

    /// the immediately following calendar month
    pub fn next(&self) -> Period {
        if self.month == 12 {
            Period::new(self.year + 1, 1)
        } else {
            Period::new(self.year, self.month + 1)
        }
    }

    /// human label for notifications, e.g. "July 2026"
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(date) => date.format("%B %Y").to_string(),
            None => format!("{}-{:02}", self.year, self.month),
        }
    }

    /// [start, end) bounds of this period in UTC, anchored to local midnight in tz
    pub fn bounds_utc(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = self.next();
        (
            month_start_utc(tz, self.year, self.month),
            month_start_utc(tz, next.year, next.month),
        )
    }

    /// whether an instant falls inside this period in tz
    pub fn contains(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        let (start, end) = self.bounds_utc(tz);
        instant >= start && instant < end
    }
}

fn month_start_utc(tz: Tz, year: i32, month: u32) -> DateTime<Utc> {
    // month is validated at Period construction
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    local_midnight_utc(tz, date)
}

fn local_midnight_utc(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // midnight skipped by a DST gap, take the first valid instant after it
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

/// due window for a billed period, expressed as days of the following month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueWindow {
    pub reminder_days: [u32; 3],
    pub lock_day: u32,
}

impl Default for DueWindow {
    fn default() -> Self {
        Self {
            reminder_days: [5, 10, 15],
            lock_day: 16,
        }
    }
}

impl DueWindow {
    /// payment is due by the last reminder day
    pub fn due_day(&self) -> u32 {
        self.reminder_days[2]
    }
}

/// resolves billing periods and due dates from current time in a configured timezone
#[derive(Debug, Clone, Copy)]
pub struct PeriodClock {
    pub tz: Tz,
    pub window: DueWindow,
}

impl PeriodClock {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            window: DueWindow::default(),
        }
    }

    /// the period to bill: the previous calendar month in the configured timezone
    pub fn target_period(&self, now: DateTime<Utc>) -> Period {
        self.current_period(now).previous()
    }

    /// the current, not yet closed period
    pub fn current_period(&self, now: DateTime<Utc>) -> Period {
        let local = now.with_timezone(&self.tz);
        Period::new(local.year(), local.month())
    }

    /// calendar date a statement for `period` is due by (in the following month)
    pub fn due_date(&self, period: Period) -> NaiveDate {
        let next = period.next();
        // due day is at most 28, valid in every month
        NaiveDate::from_ymd_opt(next.year, next.month, self.window.due_day())
            .unwrap_or(NaiveDate::MIN)
    }
}
