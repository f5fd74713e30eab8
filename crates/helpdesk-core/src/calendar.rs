//! Business calendar: working-hour normalization and duration arithmetic.
//!
//! Working time is Monday to Friday between the opening and closing hour
//! (08:00 and 16:00 by default) on the wall clock of one fixed UTC offset.
//! There is no DST handling and no holiday list.
//!
//! # Window boundaries
//!
//! A *start* instant exactly at closing time is after hours and rolls to the
//! next working morning. An *advanced* instant may land exactly at closing
//! time: that is the last moment of the working window, and any further
//! minute continues from the next working morning. Keeping closing time
//! reachable is what makes [`BusinessCalendar::advance`] additive.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta,
    TimeZone, Utc, Weekday,
};

/// Error for a working-hours configuration that cannot describe a day.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("working hours {opening}:00-{closing}:00 are invalid (need 0 <= opening < closing <= 23)")]
    InvalidHours { opening: u32, closing: u32 },
    #[error("utc offset of {0} minutes is outside +/-18h")]
    InvalidOffset(i32),
}

/// Working-hours calendar over a single fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    opening: NaiveTime,
    closing: NaiveTime,
    offset: FixedOffset,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self {
            opening: NaiveTime::MIN + TimeDelta::hours(8),
            closing: NaiveTime::MIN + TimeDelta::hours(16),
            offset: Utc.fix(),
        }
    }
}

impl BusinessCalendar {
    /// Build a calendar from whole opening/closing hours and a UTC offset.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError`] if the hours do not form a non-empty window
    /// inside one day or the offset is out of range.
    pub fn new(
        opening_hour: u32,
        closing_hour: u32,
        utc_offset_minutes: i32,
    ) -> Result<Self, CalendarError> {
        let invalid = CalendarError::InvalidHours {
            opening: opening_hour,
            closing: closing_hour,
        };
        if opening_hour >= closing_hour {
            return Err(invalid);
        }
        let opening = NaiveTime::from_hms_opt(opening_hour, 0, 0).ok_or(invalid.clone())?;
        let closing = NaiveTime::from_hms_opt(closing_hour, 0, 0).ok_or(invalid)?;
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .ok_or(CalendarError::InvalidOffset(utc_offset_minutes))?;
        Ok(Self {
            opening,
            closing,
            offset,
        })
    }

    #[must_use]
    pub const fn opening(&self) -> NaiveTime {
        self.opening
    }

    #[must_use]
    pub const fn closing(&self) -> NaiveTime {
        self.closing
    }

    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Length of one working day in minutes.
    #[must_use]
    pub fn day_minutes(&self) -> i64 {
        (self.closing - self.opening).num_minutes()
    }

    /// True for an instant inside `[opening, closing)` on a weekday.
    #[must_use]
    pub fn is_working_instant(&self, t: DateTime<Utc>) -> bool {
        let local = self.to_local(t);
        is_weekday(local.date()) && local.time() >= self.opening && local.time() < self.closing
    }

    /// Move `t` forward to the nearest working instant.
    ///
    /// Weekends go to Monday opening, early mornings to the same day's
    /// opening, and anything at or after closing to the next working day's
    /// opening. Working instants are returned unchanged. Saturates at
    /// [`DateTime::<Utc>::MAX_UTC`] past the end of the representable range.
    #[must_use]
    pub fn normalize(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.normalize_local(self.to_local(t))
            .and_then(|local| self.to_utc(local))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Advance `t` by `minutes` of working time.
    ///
    /// Non-positive durations return `t` unchanged. An instant outside the
    /// working window is normalized first. A result past the representable
    /// range saturates at [`DateTime::<Utc>::MAX_UTC`].
    #[must_use]
    pub fn advance(&self, t: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
        if minutes <= 0 {
            return t;
        }
        self.advance_local(self.to_local(t), minutes)
            .and_then(|local| self.to_utc(local))
            .unwrap_or_else(|| {
                tracing::warn!(%t, minutes, "working-time deadline out of range, saturating");
                DateTime::<Utc>::MAX_UTC
            })
    }

    fn normalize_local(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = t.date();
        let normalized = match date.weekday() {
            Weekday::Sat => self.opening_on(date.checked_add_days(Days::new(2))?),
            Weekday::Sun => self.opening_on(date.checked_add_days(Days::new(1))?),
            _ if t.time() < self.opening => self.opening_on(date),
            _ if t.time() >= self.closing => self.opening_on(next_working_day(date)?),
            _ => t,
        };
        Some(normalized)
    }

    fn advance_local(&self, t: NaiveDateTime, minutes: i64) -> Option<NaiveDateTime> {
        let current = if self.within_window(t) {
            t
        } else {
            self.normalize_local(t)?
        };
        let remaining = TimeDelta::try_minutes(minutes)?;
        let left_today = self.closing_on(current.date()) - current;
        if remaining <= left_today {
            return current.checked_add_signed(remaining);
        }
        let mut remaining = remaining - left_today;
        let mut date = next_working_day(current.date())?;

        // Every 7 days from a weekday opening hold exactly five working days.
        // Skip whole weeks but keep `remaining` positive so a duration that
        // ends at closing stays on that day.
        let week_minutes = self.day_minutes() * 5;
        let weeks = (remaining.num_minutes() - 1).max(0) / week_minutes;
        if weeks > 0 {
            date = date.checked_add_days(Days::new(u64::try_from(weeks.checked_mul(7)?).ok()?))?;
            remaining = remaining - TimeDelta::try_minutes(weeks.checked_mul(week_minutes)?)?;
            tracing::trace!(weeks, %date, "skipped whole working weeks");
        }

        loop {
            let opening = self.opening_on(date);
            let day = self.closing_on(date) - opening;
            if remaining <= day {
                return opening.checked_add_signed(remaining);
            }
            remaining = remaining - day;
            date = next_working_day(date)?;
        }
    }

    // Closing time counts as inside: an advanced deadline may sit there.
    fn within_window(&self, t: NaiveDateTime) -> bool {
        is_weekday(t.date()) && t.time() >= self.opening && t.time() <= self.closing
    }

    fn opening_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.opening)
    }

    fn closing_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.closing)
    }

    fn to_local(&self, t: DateTime<Utc>) -> NaiveDateTime {
        t.with_timezone(&self.offset).naive_local()
    }

    fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let shift = TimeDelta::seconds(i64::from(self.offset.local_minus_utc()));
        local
            .checked_sub_signed(shift)
            .map(|utc| Utc.from_utc_datetime(&utc))
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_working_day(date: NaiveDate) -> Option<NaiveDate> {
    let step = match date.weekday() {
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        _ => 1,
    };
    date.checked_add_days(Days::new(step))
}
