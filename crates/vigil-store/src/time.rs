//! Report-day boundaries.
//!
//! "Today" in the statistics reports is a calendar day in a configured
//! timezone, not a rolling 24-hour window. The clock owns that conversion
//! so repositories only ever see unix-second boundaries.

use chrono::{LocalResult, NaiveTime, TimeZone};

const DAY_SECS: i64 = 86_400;

/// Converts unix timestamps to report-day boundaries in one timezone.
#[derive(Clone, Copy, Debug)]
pub enum ReportClock {
    /// Host-local timezone.
    Local,
    /// A fixed IANA timezone from configuration.
    Fixed(chrono_tz::Tz),
}

impl ReportClock {
    /// Build from the optional `reportTimezone` setting. An unparseable
    /// zone name falls back to host-local with a warning.
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            None => Self::Local,
            Some(name) => match name.parse::<chrono_tz::Tz>() {
                Ok(tz) => Self::Fixed(tz),
                Err(_) => {
                    tracing::warn!(zone = %name, "unknown report timezone, using host-local");
                    Self::Local
                }
            },
        }
    }

    /// Current unix time in seconds.
    pub fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Midnight of the calendar day containing `now`, as a unix timestamp.
    pub fn day_start(&self, now: i64) -> i64 {
        match self {
            Self::Local => day_start_in(&chrono::Local, now),
            Self::Fixed(tz) => day_start_in(tz, now),
        }
    }

    /// Start of an `days`-day reporting window ending today: midnight of
    /// the day `days - 1` days before the day containing `now`.
    pub fn window_start(&self, now: i64, days: u32) -> i64 {
        self.day_start(now) - i64::from(days.saturating_sub(1)) * DAY_SECS
    }

    /// Hour of day (0..=23) of `ts` in this clock's timezone, for the
    /// activity histogram.
    pub fn hour_of(&self, ts: i64) -> u32 {
        use chrono::Timelike;
        match self {
            Self::Local => chrono::Local
                .timestamp_opt(ts, 0)
                .single()
                .map_or(0, |dt| dt.hour()),
            Self::Fixed(tz) => tz.timestamp_opt(ts, 0).single().map_or(0, |dt| dt.hour()),
        }
    }
}

fn day_start_in<Tz: TimeZone>(tz: &Tz, now: i64) -> i64 {
    let Some(dt) = tz.timestamp_opt(now, 0).single() else {
        return now;
    };
    let midnight = dt.date_naive().and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        // A DST jump can make midnight ambiguous; take the earlier instant.
        LocalResult::Single(m) | LocalResult::Ambiguous(m, _) => m.timestamp(),
        LocalResult::None => midnight.and_utc().timestamp(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
