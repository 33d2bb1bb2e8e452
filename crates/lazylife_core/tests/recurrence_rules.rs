use chrono::{FixedOffset, TimeZone, Utc, Weekday};
use lazylife_core::recurrence::{
    completion_record, is_completed, occurrences_in_range_in, occurs_on_in,
};
use lazylife_core::{EpochDay, InstanceRecord, ItemKind, RecurrenceRule, ScheduledItem};

const DAY_MS: i64 = 86_400_000;

fn day(year: i32, month: u32, dom: u32) -> EpochDay {
    EpochDay::from_ymd(year, month, dom).unwrap()
}

fn utc_ms(year: i32, month: u32, dom: u32, hour: u32, minute: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, dom, hour, minute, 0)
        .unwrap()
        .timestamp_millis()
}

fn habit(start_at_ms: i64, rule: RecurrenceRule) -> ScheduledItem {
    ScheduledItem::new("collection-1", ItemKind::Habit, "stretch", start_at_ms, rule)
}

fn occurrences(item: &ScheduledItem, from: EpochDay, to: EpochDay) -> Vec<EpochDay> {
    occurrences_in_range_in(item, from, to, &Utc).collect()
}

#[test]
fn once_matches_only_its_anchor() {
    let anchor = day(2024, 3, 10);
    let item = habit(utc_ms(2023, 6, 1, 8, 0), RecurrenceRule::once(anchor));

    assert_eq!(
        occurrences(&item, day(2023, 1, 1), day(2025, 12, 31)),
        vec![anchor]
    );
}

#[test]
fn once_ignores_item_start_date() {
    let anchor = day(2024, 1, 1);
    let item = habit(utc_ms(2024, 6, 1, 8, 0), RecurrenceRule::once(anchor));

    assert!(occurs_on_in(&item, anchor, &Utc));
}

#[test]
fn every_three_days_from_start_day() {
    let item = habit(
        100 * DAY_MS + 12 * 3_600_000,
        RecurrenceRule::every_n_days(3).unwrap(),
    );

    for hit in [100, 103, 106, 400] {
        assert!(occurs_on_in(&item, EpochDay::new(hit), &Utc), "day {hit}");
    }
    for miss in [97, 99, 101, 102, 104, 105] {
        assert!(!occurs_on_in(&item, EpochDay::new(miss), &Utc), "day {miss}");
    }
}

#[test]
fn weekly_monday_wednesday_starting_on_a_monday() {
    // 2024-03-11 is a Monday.
    let item = habit(
        utc_ms(2024, 3, 11, 7, 30),
        RecurrenceRule::weekly_on_days([Weekday::Mon, Weekday::Wed]).unwrap(),
    );

    let first_three: Vec<EpochDay> = occurrences(&item, day(2024, 3, 1), day(2024, 4, 30))
        .into_iter()
        .take(3)
        .collect();
    assert_eq!(
        first_three,
        vec![day(2024, 3, 11), day(2024, 3, 13), day(2024, 3, 18)]
    );
    assert!(!occurs_on_in(&item, day(2024, 3, 6), &Utc));
}

#[test]
fn monthly_on_31st_clamps_to_month_end() {
    let item = habit(
        utc_ms(2024, 1, 5, 9, 0),
        RecurrenceRule::monthly_on_day(31).unwrap(),
    );

    assert_eq!(
        occurrences(&item, day(2024, 1, 1), day(2024, 4, 30)),
        vec![
            day(2024, 1, 31),
            day(2024, 2, 29),
            day(2024, 3, 31),
            day(2024, 4, 30),
        ]
    );

    let non_leap = habit(
        utc_ms(2025, 1, 10, 9, 0),
        RecurrenceRule::monthly_on_day(31).unwrap(),
    );
    assert!(occurs_on_in(&non_leap, day(2025, 2, 28), &Utc));
    assert!(!occurs_on_in(&non_leap, day(2024, 12, 31), &Utc));
}

#[test]
fn yearly_leap_day_anchor_skips_non_leap_years() {
    let anchor = day(2024, 2, 29);
    let item = habit(utc_ms(2024, 2, 29, 10, 0), RecurrenceRule::yearly_on_date(anchor));

    assert!(occurs_on_in(&item, anchor, &Utc));
    assert!(!occurs_on_in(&item, day(2025, 2, 28), &Utc));
    assert!(!occurs_on_in(&item, day(2025, 3, 1), &Utc));
    assert!(occurs_on_in(&item, day(2028, 2, 29), &Utc));
    assert!(!occurs_on_in(&item, day(2020, 2, 29), &Utc));
}

#[test]
fn yearly_rule_fires_once_per_year_after_anchor() {
    let anchor = day(2023, 7, 14);
    let item = habit(utc_ms(2023, 7, 14, 10, 0), RecurrenceRule::yearly_on_date(anchor));

    assert_eq!(
        occurrences(&item, day(2022, 1, 1), day(2025, 12, 31)),
        vec![anchor, day(2024, 7, 14), day(2025, 7, 14)]
    );
}

#[test]
fn evaluation_is_deterministic() {
    let item = habit(
        utc_ms(2024, 5, 2, 6, 0),
        RecurrenceRule::every_n_days(4).unwrap(),
    );
    let range = (day(2024, 5, 1), day(2024, 8, 1));

    let first = occurrences(&item, range.0, range.1);
    let second = occurrences(&item, range.0, range.1);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn anchor_date_is_derived_in_the_given_time_zone() {
    // 23:30 UTC on March 10 is already March 11 at UTC+2.
    let item = habit(
        utc_ms(2024, 3, 10, 23, 30),
        RecurrenceRule::every_n_days(2).unwrap(),
    );
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

    assert!(occurs_on_in(&item, day(2024, 3, 12), &Utc));
    assert!(!occurs_on_in(&item, day(2024, 3, 12), &plus_two));
    assert!(occurs_on_in(&item, day(2024, 3, 11), &plus_two));
    assert!(occurs_on_in(&item, day(2024, 3, 13), &plus_two));
}

#[test]
fn occurrence_sequence_is_restartable_and_bounded() {
    let item = habit(
        utc_ms(2024, 1, 1, 0, 0),
        RecurrenceRule::every_n_days(7).unwrap(),
    );
    let sequence = occurrences_in_range_in(&item, day(2024, 1, 1), day(2024, 1, 31), &Utc);

    let first_pass: Vec<EpochDay> = sequence.clone().collect();
    let second_pass: Vec<EpochDay> = sequence.collect();
    assert_eq!(first_pass, second_pass);
    assert_eq!(first_pass.len(), 5);

    let empty: Vec<EpochDay> =
        occurrences_in_range_in(&item, day(2024, 2, 1), day(2024, 1, 1), &Utc).collect();
    assert!(empty.is_empty());
}

#[test]
fn completion_is_instance_record_existence() {
    let item = habit(
        utc_ms(2024, 3, 11, 7, 0),
        RecurrenceRule::every_n_days(1).unwrap(),
    );
    let done_day = day(2024, 3, 12);
    let instances = vec![
        InstanceRecord::for_item(&item, done_day),
        InstanceRecord {
            item_id: "someone-else".to_string(),
            collection_id: item.collection_id.clone(),
            instance_date: day(2024, 3, 13),
        },
    ];

    assert!(is_completed(&item, done_day, &instances));
    assert!(!is_completed(&item, day(2024, 3, 13), &instances));
}

#[test]
fn completion_record_only_for_occurrences() {
    let item = habit(
        utc_ms(2024, 3, 11, 7, 0),
        RecurrenceRule::weekly_on_days([Weekday::Mon]).unwrap(),
    );

    let record = completion_record(&item, day(2024, 3, 18), &Utc).unwrap();
    assert_eq!(record.item_id, item.id);
    assert_eq!(record.collection_id, item.collection_id);
    assert_eq!(record.instance_date, day(2024, 3, 18));

    assert!(completion_record(&item, day(2024, 3, 19), &Utc).is_none());
}

#[test]
fn anchor_without_calendar_date_never_matches() {
    let item = habit(0, RecurrenceRule::yearly_on_date(EpochDay::new(i64::MAX)));
    assert!(!occurs_on_in(&item, EpochDay::new(0), &Utc));
    assert!(!occurs_on_in(&item, EpochDay::new(i64::MAX), &Utc));

    let once = habit(0, RecurrenceRule::once(EpochDay::new(i64::MIN)));
    assert!(!occurs_on_in(&once, EpochDay::new(i64::MIN), &Utc));
}

#[test]
fn ranges_beyond_calendar_bounds_are_clamped() {
    let item = habit(0, RecurrenceRule::every_n_days(1).unwrap());

    let at_top = occurrences_in_range_in(
        &item,
        EpochDay::new(i64::MAX - 1),
        EpochDay::new(i64::MAX),
        &Utc,
    );
    assert_eq!(at_top.count(), 0);

    let below_start: Vec<EpochDay> = occurrences_in_range_in(
        &item,
        EpochDay::new(i64::MIN),
        EpochDay::new(EpochDay::min_date().value() + 10),
        &Utc,
    )
    .collect();
    assert!(below_start.is_empty());
}
