//! Recurrence evaluation.
//!
//! # Responsibility
//! - Decide whether a scheduled item occurs on a calendar day.
//! - Enumerate occurrences over a bounded day range.
//!
//! # Invariants
//! - Evaluation is pure: no I/O, no clock reads, no shared state.
//! - The item start instant is converted to a local calendar date once; every
//!   comparison happens in day space, never instant space.

use crate::model::recurrence::{EpochDay, RecurrenceRule};
use crate::model::schedule::{InstanceRecord, ScheduledItem};
use chrono::{Datelike, Local, NaiveDate, TimeZone};

/// Returns whether `item` occurs on `query`, using the system time zone.
pub fn occurs_on(item: &ScheduledItem, query: EpochDay) -> bool {
    occurs_on_in(item, query, &Local)
}

/// Returns whether `item` occurs on `query`, deriving the anchor date in `tz`.
pub fn occurs_on_in<Tz: TimeZone>(item: &ScheduledItem, query: EpochDay, tz: &Tz) -> bool {
    match (local_date(item.start_at_ms, tz), query.to_date()) {
        (Some(anchor_date), Some(query_date)) => {
            occurs_on_date(&item.recurrence, anchor_date, query_date)
        }
        _ => false,
    }
}

/// Rule-level evaluation on calendar dates.
///
/// `anchor_date` is the owning item's local start date. `Once` and
/// `YearlyOnDate` use their own anchors instead.
pub fn occurs_on_date(rule: &RecurrenceRule, anchor_date: NaiveDate, query: NaiveDate) -> bool {
    match rule {
        RecurrenceRule::Once { anchor } => EpochDay::from_date(query) == *anchor,
        RecurrenceRule::EveryNDays { n } => {
            let delta = query.signed_duration_since(anchor_date).num_days();
            delta >= 0 && delta % i64::from(n.get()) == 0
        }
        RecurrenceRule::WeeklyOnDays { days } => {
            query >= anchor_date && days.contains(query.weekday())
        }
        RecurrenceRule::MonthlyOnDay { day } => {
            months_between(anchor_date, query) >= 0
                && query.day() == day.get().min(last_day_of_month(query))
        }
        // Feb 29 anchors only match in leap years.
        RecurrenceRule::YearlyOnDate { anchor } => match anchor.to_date() {
            Some(anchor) => {
                query >= anchor && query.month() == anchor.month() && query.day() == anchor.day()
            }
            None => false,
        },
    }
}

/// Lazily enumerates occurrences of `item` within `[from, to]` (inclusive),
/// using the system time zone.
pub fn occurrences_in_range(item: &ScheduledItem, from: EpochDay, to: EpochDay) -> Occurrences<'_> {
    occurrences_in_range_in(item, from, to, &Local)
}

/// Same as [`occurrences_in_range`] with an explicit time zone.
///
/// The range is clamped to days that have a calendar date.
pub fn occurrences_in_range_in<'a, Tz: TimeZone>(
    item: &'a ScheduledItem,
    from: EpochDay,
    to: EpochDay,
    tz: &Tz,
) -> Occurrences<'a> {
    Occurrences {
        rule: &item.recurrence,
        anchor_date: local_date(item.start_at_ms, tz),
        next: Some(from.max(EpochDay::min_date())),
        end: to.min(EpochDay::max_date()),
    }
}

/// Finite, restartable occurrence sequence. Clone it to iterate again.
///
/// Tests each day against the rule; fine for calendar-sized ranges.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    anchor_date: Option<NaiveDate>,
    /// `None` once the sequence is exhausted.
    next: Option<EpochDay>,
    end: EpochDay,
}

impl Iterator for Occurrences<'_> {
    type Item = EpochDay;

    fn next(&mut self) -> Option<EpochDay> {
        let anchor_date = self.anchor_date?;
        while let Some(candidate) = self.next.filter(|day| *day <= self.end) {
            self.next = candidate.succ();
            let Some(query) = candidate.to_date() else {
                continue;
            };
            if occurs_on_date(self.rule, anchor_date, query) {
                return Some(candidate);
            }
        }
        self.next = None;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(next) => next.days_until(self.end).saturating_add(1).max(0),
            None => 0,
        };
        (0, usize::try_from(remaining).ok())
    }
}

/// Returns whether an instance record marks `date` as completed for `item`.
pub fn is_completed(item: &ScheduledItem, date: EpochDay, instances: &[InstanceRecord]) -> bool {
    instances
        .iter()
        .any(|instance| instance.item_id == item.id && instance.instance_date == date)
}

/// Returns the instance record a caller may upsert to complete `date`.
///
/// Returns `None` when `date` is not an occurrence of `item` in `tz`.
pub fn completion_record<Tz: TimeZone>(
    item: &ScheduledItem,
    date: EpochDay,
    tz: &Tz,
) -> Option<InstanceRecord> {
    occurs_on_in(item, date, tz).then(|| InstanceRecord::for_item(item, date))
}

/// Local calendar date of an epoch-millisecond instant in `tz`.
pub fn local_date<Tz: TimeZone>(epoch_ms: i64, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(epoch_ms)
        .earliest()
        .map(|instant| instant.date_naive())
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (i64::from(to.year()) - i64::from(from.year())) * 12 + i64::from(to.month())
        - i64::from(from.month())
}

fn last_day_of_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map_or(31, |last| last.day())
}

#[cfg(test)]
mod tests {
    use super::{last_day_of_month, months_between};
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn last_day_of_month_handles_leap_years_and_december() {
        assert_eq!(last_day_of_month(date(2024, 2, 10)), 29);
        assert_eq!(last_day_of_month(date(2025, 2, 10)), 28);
        assert_eq!(last_day_of_month(date(2025, 4, 1)), 30);
        assert_eq!(last_day_of_month(date(2025, 12, 31)), 31);
    }

    #[test]
    fn months_between_spans_year_boundaries() {
        assert_eq!(months_between(date(2024, 11, 30), date(2025, 1, 1)), 2);
        assert_eq!(months_between(date(2025, 1, 31), date(2024, 12, 1)), -1);
        assert_eq!(months_between(date(2025, 3, 1), date(2025, 3, 31)), 0);
    }
}
