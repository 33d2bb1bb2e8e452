//! Recurrence rule model.
//!
//! # Responsibility
//! - Define the closed set of recurrence strategies attached to scheduled items.
//! - Validate rule parameters at construction time.
//!
//! # Invariants
//! - `EveryNDays::n` is always >= 1 (enforced by `NonZeroU32`).
//! - `MonthlyOnDay::day` is always within `1..=31`.
//! - `WeeklyOnDays::days` is never empty and only holds codes `0..=6`.
//! - Rules are values; changing an item's rule replaces the whole value.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

/// `NaiveDate::num_days_from_ce()` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Day count since 1970-01-01, independent of time zone once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochDay(i64);

impl EpochDay {
    pub const fn new(days: i64) -> Self {
        Self(days)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE)
    }

    /// Builds a day from a proleptic Gregorian calendar date.
    ///
    /// Returns `None` when the triple is not a valid date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_date)
    }

    /// Converts back to a calendar date. `None` outside chrono's range.
    pub fn to_date(self) -> Option<NaiveDate> {
        let days_from_ce = self.0.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?;
        NaiveDate::from_num_days_from_ce_opt(i32::try_from(days_from_ce).ok()?)
    }

    /// First day representable as a calendar date.
    pub fn min_date() -> Self {
        Self::from_date(NaiveDate::MIN)
    }

    /// Last day representable as a calendar date.
    pub fn max_date() -> Self {
        Self::from_date(NaiveDate::MAX)
    }

    /// Signed number of days from `self` to `other`, saturating at the `i64`
    /// bounds.
    pub fn days_until(self, other: EpochDay) -> i64 {
        other.0.saturating_sub(self.0)
    }

    /// Next day, or `None` at `i64::MAX`.
    pub fn succ(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl Display for EpochDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_date() {
            Some(date) => write!(f, "{date}"),
            None => write!(f, "epoch_day:{}", self.0),
        }
    }
}

/// Non-empty set of weekdays, Monday encoded as 0 and Sunday as 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Builds a set from weekday codes (`0 = Mon .. 6 = Sun`).
    ///
    /// # Errors
    /// - `InvalidWeekday` for a code outside `0..=6`.
    /// - `EmptyWeekdays` when no code is given.
    pub fn from_codes<I>(codes: I) -> Result<Self, RecurrenceValidationError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut bits = 0u8;
        for code in codes {
            if !(0..=6).contains(&code) {
                return Err(RecurrenceValidationError::InvalidWeekday(code));
            }
            bits |= 1 << code;
        }
        if bits == 0 {
            return Err(RecurrenceValidationError::EmptyWeekdays);
        }
        Ok(Self(bits))
    }

    /// Builds a set from chrono weekdays.
    pub fn from_weekdays<I>(days: I) -> Result<Self, RecurrenceValidationError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        Self::from_codes(
            days.into_iter()
                .map(|day| i64::from(day.num_days_from_monday())),
        )
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Ascending weekday codes held by this set.
    pub fn codes(self) -> Vec<u8> {
        (0u8..7).filter(|code| self.0 & (1 << code) != 0).collect()
    }

    pub fn weekdays(self) -> Vec<Weekday> {
        WEEKDAYS
            .iter()
            .copied()
            .filter(|day| self.contains(*day))
            .collect()
    }
}

/// Day of month in `1..=31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    pub fn new(day: i64) -> Result<Self, RecurrenceValidationError> {
        match u8::try_from(day) {
            Ok(value @ 1..=31) => Ok(Self(value)),
            _ => Err(RecurrenceValidationError::DayOfMonthOutOfRange(day)),
        }
    }

    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

/// Closed set of recurrence strategies for events and habits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecurrenceRule {
    /// Occurs only on `anchor`, regardless of the owning item's start.
    Once { anchor: EpochDay },
    /// Occurs every `n` days starting at the item's start date.
    EveryNDays { n: NonZeroU32 },
    /// Occurs on matching weekdays on/after the item's start date.
    WeeklyOnDays { days: WeekdaySet },
    /// Occurs on `day` each month from the start month, clamped to month end.
    MonthlyOnDay { day: DayOfMonth },
    /// Occurs on the anchor's month/day each year on/after the anchor.
    YearlyOnDate { anchor: EpochDay },
}

impl RecurrenceRule {
    pub fn once(anchor: EpochDay) -> Self {
        Self::Once { anchor }
    }

    /// # Errors
    /// Returns `NonPositiveInterval` when `n < 1`.
    pub fn every_n_days(n: i64) -> Result<Self, RecurrenceValidationError> {
        u32::try_from(n)
            .ok()
            .and_then(NonZeroU32::new)
            .map(|n| Self::EveryNDays { n })
            .ok_or(RecurrenceValidationError::NonPositiveInterval(n))
    }

    pub fn weekly_on_days<I>(days: I) -> Result<Self, RecurrenceValidationError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        Ok(Self::WeeklyOnDays {
            days: WeekdaySet::from_weekdays(days)?,
        })
    }

    pub fn monthly_on_day(day: i64) -> Result<Self, RecurrenceValidationError> {
        Ok(Self::MonthlyOnDay {
            day: DayOfMonth::new(day)?,
        })
    }

    pub fn yearly_on_date(anchor: EpochDay) -> Self {
        Self::YearlyOnDate { anchor }
    }

    /// Stable variant tag, shared with the textual codec.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Once { .. } => "once",
            Self::EveryNDays { .. } => "every_n_days",
            Self::WeeklyOnDays { .. } => "weekly_on_days",
            Self::MonthlyOnDay { .. } => "monthly_on_day",
            Self::YearlyOnDate { .. } => "yearly_on_date",
        }
    }
}

/// Invalid recurrence parameter rejected at rule construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceValidationError {
    NonPositiveInterval(i64),
    DayOfMonthOutOfRange(i64),
    InvalidWeekday(i64),
    EmptyWeekdays,
    /// Anchor day has no calendar date.
    AnchorOutOfRange(i64),
}

impl Display for RecurrenceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveInterval(n) => {
                write!(f, "every_n_days interval must be >= 1, got {n}")
            }
            Self::DayOfMonthOutOfRange(day) => {
                write!(f, "day of month must be within 1..=31, got {day}")
            }
            Self::InvalidWeekday(code) => {
                write!(f, "weekday code must be within 0..=6, got {code}")
            }
            Self::EmptyWeekdays => write!(f, "weekly rule requires at least one weekday"),
            Self::AnchorOutOfRange(day) => {
                write!(f, "anchor epoch day {day} is outside the calendar range")
            }
        }
    }
}

impl Error for RecurrenceValidationError {}
