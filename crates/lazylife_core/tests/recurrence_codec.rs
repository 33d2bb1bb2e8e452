use chrono::Weekday;
use lazylife_core::recurrence::{decode_rule, encode_rule, try_decode_rule, RecurrenceDecodeError};
use lazylife_core::{EpochDay, RecurrenceRule};

fn sample_rules() -> Vec<RecurrenceRule> {
    vec![
        RecurrenceRule::once(EpochDay::from_ymd(2024, 3, 10).unwrap()),
        RecurrenceRule::once(EpochDay::new(-42)),
        RecurrenceRule::every_n_days(1).unwrap(),
        RecurrenceRule::every_n_days(90).unwrap(),
        RecurrenceRule::weekly_on_days([Weekday::Sat, Weekday::Mon, Weekday::Wed]).unwrap(),
        RecurrenceRule::monthly_on_day(31).unwrap(),
        RecurrenceRule::yearly_on_date(EpochDay::from_ymd(2024, 2, 29).unwrap()),
    ]
}

#[test]
fn every_variant_round_trips() {
    for rule in sample_rules() {
        let encoded = encode_rule(&rule);
        let decoded = try_decode_rule(&encoded).unwrap();
        assert_eq!(decoded, rule, "encoded as {encoded}");
    }
}

#[test]
fn encoding_is_tagged_json() {
    let encoded = encode_rule(&RecurrenceRule::every_n_days(3).unwrap());
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(value["type"], "every_n_days");
    assert_eq!(value["n"], 3);
}

#[test]
fn strict_decode_rejects_unknown_tags_and_bad_parameters() {
    for text in [
        "",
        "{}",
        r#"{"type":"hourly"}"#,
        r#"{"type":"once"}"#,
        r#"{"type":"weekly_on_days","days":[]}"#,
    ] {
        assert!(try_decode_rule(text).is_err(), "accepted `{text}`");
    }

    let err = try_decode_rule(r#"{"type":"weekly_on_days","days":[1,9]}"#).unwrap_err();
    assert!(matches!(err, RecurrenceDecodeError::InvalidParameter(_)));
}

#[test]
fn lenient_decode_substitutes_once_today() {
    let today = EpochDay::from_ymd(2026, 10, 17).unwrap();

    assert_eq!(decode_rule("{broken", today), RecurrenceRule::once(today));
    assert_eq!(
        decode_rule(r#"{"type":"every_n_days","n":-2}"#, today),
        RecurrenceRule::once(today)
    );

    let valid = RecurrenceRule::monthly_on_day(15).unwrap();
    assert_eq!(decode_rule(&encode_rule(&valid), today), valid);
}
