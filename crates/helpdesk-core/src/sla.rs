//! Category-driven SLA deadlines.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::calendar::BusinessCalendar;
use crate::model::Category;

/// Resolution time for categories missing from the table.
pub const DEFAULT_SLA_HOURS: u32 = 8;

/// Built-in category → resolution hours table.
#[must_use]
pub fn builtin_hours() -> BTreeMap<Category, u32> {
    [
        (Category::SOFTWARE_INSTALL, 4),
        (Category::SOFTWARE_CONFIG, 4),
        (Category::HARDWARE, 24),
        (Category::INFRASTRUCTURE, 12),
        (Category::ACCOUNT, 4),
        (Category::APPLICATIONS, 48),
        (Category::OTHER, 8),
        (Category::UNASSIGNED, 8),
    ]
    .into_iter()
    .map(|(name, hours)| (Category::new(name), hours))
    .collect()
}

/// Maps a ticket category to a guaranteed-resolution deadline.
///
/// Durations are counted in working time on the policy's calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaPolicy {
    calendar: BusinessCalendar,
    hours: BTreeMap<Category, u32>,
    default_hours: u32,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self::new(BusinessCalendar::default(), builtin_hours(), DEFAULT_SLA_HOURS)
    }
}

impl SlaPolicy {
    #[must_use]
    pub const fn new(
        calendar: BusinessCalendar,
        hours: BTreeMap<Category, u32>,
        default_hours: u32,
    ) -> Self {
        Self {
            calendar,
            hours,
            default_hours,
        }
    }

    #[must_use]
    pub const fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    /// Working minutes allowed for `category`. Unknown categories get the
    /// default.
    #[must_use]
    pub fn duration_minutes(&self, category: &Category) -> i64 {
        let hours = self.hours.get(category).copied().unwrap_or_else(|| {
            tracing::debug!(%category, "no SLA entry for category, using default");
            self.default_hours
        });
        i64::from(hours) * 60
    }

    /// Deadline for a ticket of `category` opened at `start`.
    #[must_use]
    pub fn deadline(&self, start: DateTime<Utc>, category: &Category) -> DateTime<Utc> {
        let begin = self.calendar.normalize(start);
        self.calendar.advance(begin, self.duration_minutes(category))
    }
}
