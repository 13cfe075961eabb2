use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone,
    Timelike,
};

use super::ticks::{TickCandidate, TickCoord, TickSpacing, TickSpec, TickUnit};

/// Calendar steps from coarsest to finest.
pub const TIME_STEPS: [(i64, TickUnit); 29] = [
    (10, TickUnit::Year),
    (5, TickUnit::Year),
    (2, TickUnit::Year),
    (1, TickUnit::Year),
    (6, TickUnit::Month),
    (3, TickUnit::Month),
    (2, TickUnit::Month),
    (1, TickUnit::Month),
    (15, TickUnit::Day),
    (7, TickUnit::Day),
    (2, TickUnit::Day),
    (1, TickUnit::Day),
    (12, TickUnit::Hour),
    (6, TickUnit::Hour),
    (3, TickUnit::Hour),
    (2, TickUnit::Hour),
    (1, TickUnit::Hour),
    (30, TickUnit::Minute),
    (15, TickUnit::Minute),
    (10, TickUnit::Minute),
    (5, TickUnit::Minute),
    (2, TickUnit::Minute),
    (1, TickUnit::Minute),
    (30, TickUnit::Second),
    (15, TickUnit::Second),
    (10, TickUnit::Second),
    (5, TickUnit::Second),
    (2, TickUnit::Second),
    (1, TickUnit::Second),
];

/// Converts a unix timestamp (seconds, fractional allowed) to a calendar
/// date-time in `tz`.
#[must_use]
pub fn timestamp_to_datetime(ts: f64, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor();
    if secs.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let nanos = (((ts - secs) * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(secs as i64, nanos).map(|dt| dt.with_timezone(&tz))
}

/// `YYYY-MM-DD HH:MM:SS` in `tz`, with `.ffffff` appended when the timestamp
/// has a sub-second part.
#[must_use]
pub fn format_timestamp(ts: f64, tz: FixedOffset) -> Option<String> {
    let dt = timestamp_to_datetime(ts, tz)?;
    let micros = dt.nanosecond() / 1_000;
    let mut text = dt.format("%Y-%m-%d %H:%M:%S").to_string();
    if micros != 0 {
        text.push_str(&format!(".{micros:06}"));
    }
    Some(text)
}

fn unit_component(dt: &DateTime<FixedOffset>, unit: TickUnit) -> i64 {
    match unit {
        TickUnit::Year => i64::from(dt.year()),
        TickUnit::Month => i64::from(dt.month()),
        TickUnit::Day => i64::from(dt.day()),
        TickUnit::Hour => i64::from(dt.hour()),
        TickUnit::Minute => i64::from(dt.minute()),
        TickUnit::Second | TickUnit::None => i64::from(dt.second()),
    }
}

fn month_index(dt: &DateTime<FixedOffset>) -> i64 {
    i64::from(dt.year()) * 12 + i64::from(dt.month0())
}

/// Calendar-aligned ticks of `step` units between two instants.
#[derive(Debug, Clone)]
pub struct TimeTickList {
    lo: f64,
    hi: f64,
    d0: DateTime<FixedOffset>,
    d1: DateTime<FixedOffset>,
    step: i64,
    unit: TickUnit,
    tick_count: i64,
}

impl TimeTickList {
    fn new(
        lo: f64,
        hi: f64,
        d0: DateTime<FixedOffset>,
        d1: DateTime<FixedOffset>,
        step: i64,
        unit: TickUnit,
    ) -> Self {
        let mut list = Self {
            lo,
            hi,
            d0,
            d1,
            step,
            unit,
            tick_count: 0,
        };
        list.tick_count = list.compute_tick_count();
        list
    }

    #[must_use]
    pub fn unit(&self) -> TickUnit {
        self.unit
    }

    #[must_use]
    pub fn step(&self) -> i64 {
        self.step
    }

    // Days do not divide months evenly, so day counts are only approximate.
    fn compute_tick_count(&self) -> i64 {
        let step = self.step;
        match self.unit {
            TickUnit::Year => {
                i64::from(self.d1.year()).div_euclid(step) - i64::from(self.d0.year()).div_euclid(step)
            }
            TickUnit::Month => {
                month_index(&self.d1).div_euclid(step) - month_index(&self.d0).div_euclid(step)
            }
            TickUnit::Day => (self.d1.date_naive() - self.d0.date_naive())
                .num_days()
                .div_euclid(step),
            TickUnit::Hour | TickUnit::Minute => {
                let (Some(n0), Some(n1)) = (self.snap(&self.d0), self.snap(&self.d1)) else {
                    return 0;
                };
                let unit_secs = if self.unit == TickUnit::Hour { 3_600 } else { 60 };
                (n1 - n0)
                    .num_seconds()
                    .div_euclid(unit_secs)
                    .div_euclid(step)
            }
            TickUnit::Second | TickUnit::None => {
                let step = step as f64;
                ((self.hi / step).floor() - (self.lo / step).floor()) as i64
            }
        }
    }

    /// Truncates `dt` down to a multiple of `step` in this list's unit.
    fn snap(&self, dt: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let step = u32::try_from(self.step).ok()?;
        let date = dt.date_naive();
        let naive = match self.unit {
            TickUnit::Hour => date.and_hms_opt(dt.hour() / step * step, 0, 0)?,
            TickUnit::Minute => date.and_hms_opt(dt.hour(), dt.minute() / step * step, 0)?,
            TickUnit::Second => {
                date.and_hms_opt(dt.hour(), dt.minute(), dt.second() / step * step)?
            }
            _ => return None,
        };
        self.localize(naive)
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.d0.timezone().from_local_datetime(&naive).single()
    }

    fn timestamp_of(&self, date: NaiveDate) -> Option<f64> {
        let naive = date.and_hms_opt(0, 0, 0)?;
        self.localize(naive).map(|dt| dt.timestamp() as f64)
    }

    fn in_range(&self, ts: f64) -> bool {
        self.lo <= ts && ts <= self.hi
    }

    fn year_coords(&self) -> Vec<TickCoord> {
        let first = i64::from(self.d0.year()).div_euclid(self.step) * self.step;
        let last = i64::from(self.d1.year());
        let mut coords = Vec::new();
        let mut year = first;
        while year <= last {
            if let Some(ts) = i32::try_from(year)
                .ok()
                .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
                .and_then(|date| self.timestamp_of(date))
            {
                if self.in_range(ts) {
                    coords.push((ts, year.to_string()));
                }
            }
            year += self.step;
        }
        coords
    }

    fn month_coords(&self) -> Vec<TickCoord> {
        let first = month_index(&self.d0).div_euclid(self.step) * self.step;
        let last = month_index(&self.d1);
        let mut coords = Vec::new();
        let mut index = first;
        while index <= last {
            let year = index.div_euclid(12);
            let month = index.rem_euclid(12) + 1;
            if let Some(ts) = i32::try_from(year)
                .ok()
                .and_then(|y| NaiveDate::from_ymd_opt(y, month as u32, 1))
                .and_then(|date| self.timestamp_of(date))
            {
                if self.in_range(ts) {
                    coords.push((ts, format!("{year}-{month:02}-01")));
                }
            }
            index += self.step;
        }
        coords
    }

    fn day_coords(&self) -> Vec<TickCoord> {
        let Ok(step) = u64::try_from(self.step) else {
            return Vec::new();
        };
        let last = self.d1.date_naive();
        let mut coords = Vec::new();
        let mut date = self.d0.date_naive();
        while date <= last {
            if let Some(ts) = self.timestamp_of(date) {
                if self.in_range(ts) {
                    coords.push((ts, date.format("%Y-%m-%d").to_string()));
                }
            }
            let Some(next) = date.checked_add_days(Days::new(step)) else {
                break;
            };
            date = next;
        }
        coords
    }

    /// Intraday ticks; the date is only repeated when it changes.
    fn intraday_coords(&self) -> Vec<TickCoord> {
        let (delta, full, short) = match self.unit {
            TickUnit::Hour => (TimeDelta::hours(self.step), "%Y-%m-%d %H:00", "%H:00"),
            TickUnit::Minute => (TimeDelta::minutes(self.step), "%Y-%m-%d %H:%M", "%H:%M"),
            _ => (TimeDelta::seconds(self.step), "%Y-%m-%d %H:%M:%S", "%H:%M:%S"),
        };
        let Some(mut cursor) = self.snap(&self.d0) else {
            return Vec::new();
        };

        let mut coords = Vec::new();
        let mut last_day: Option<NaiveDate> = None;
        while cursor <= self.d1 {
            let ts = cursor.timestamp() as f64;
            if self.in_range(ts) {
                let day = cursor.date_naive();
                let pattern = if last_day == Some(day) { short } else { full };
                last_day = Some(day);
                coords.push((ts, cursor.format(pattern).to_string()));
            }
            let Some(next) = cursor.checked_add_signed(delta) else {
                break;
            };
            cursor = next;
        }
        coords
    }
}

impl TickCandidate for TimeTickList {
    fn spec(&self) -> TickSpec {
        TickSpec {
            step: self.step as f64,
            unit: self.unit,
            tick_count: self.tick_count,
        }
    }

    fn coords(&self) -> Vec<TickCoord> {
        match self.unit {
            TickUnit::Year => self.year_coords(),
            TickUnit::Month => self.month_coords(),
            TickUnit::Day => self.day_coords(),
            TickUnit::Hour | TickUnit::Minute | TickUnit::Second => self.intraday_coords(),
            TickUnit::None => Vec::new(),
        }
    }
}

/// Lazy sequence of calendar candidates.
///
/// Skips every coarse step whose truncated component is identical at both
/// ends of the window, then walks the finer steps until a candidate is too
/// dense. Sub-second ranges produce no candidates.
#[derive(Debug, Clone)]
pub struct TimestampCandidates {
    lo: f64,
    hi: f64,
    ends: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
    width: u32,
    spacing: TickSpacing,
    next_step: usize,
    started: bool,
}

impl TimestampCandidates {
    #[must_use]
    pub fn new(lo: f64, hi: f64, width: u32, spacing: TickSpacing, tz: FixedOffset) -> Self {
        let ends = if lo == hi {
            None
        } else {
            timestamp_to_datetime(lo, tz).zip(timestamp_to_datetime(hi, tz))
        };
        Self {
            lo,
            hi,
            ends,
            width,
            spacing,
            next_step: 0,
            started: false,
        }
    }
}

impl Iterator for TimestampCandidates {
    type Item = TimeTickList;

    fn next(&mut self) -> Option<Self::Item> {
        let (d0, d1) = self.ends?;
        while let Some(&(step, unit)) = TIME_STEPS.get(self.next_step) {
            self.next_step += 1;
            if !self.started {
                let v0 = unit_component(&d0, unit).div_euclid(step);
                let v1 = unit_component(&d1, unit).div_euclid(step);
                if v0 == v1 {
                    continue;
                }
                self.started = true;
            }

            let list = TimeTickList::new(self.lo, self.hi, d0, d1, step, unit);
            if self.spacing.is_too_dense(list.spec(), self.width) {
                self.ends = None;
                return None;
            }
            return Some(list);
        }
        None
    }
}
