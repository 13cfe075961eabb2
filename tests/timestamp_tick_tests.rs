use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tileplot::api::{
    AxisConfig, AxisKind, AxisLabelEngine, AxisOrientation, AxisWindow, TickGenerator,
    TimeAxisTimeZone,
};
use tileplot::core::{TickCandidate, TickSpacing, TickUnit, TimestampCandidates, select_best};

fn unix_ts(stamp: &str) -> f64 {
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%d-%H%M%S").expect("valid stamp");
    Utc.from_utc_datetime(&naive).timestamp() as f64
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset")
}

fn time_labels(d0: &str, d1: &str, width: u32) -> Vec<String> {
    let window = AxisWindow {
        orientation: AxisOrientation::X,
        x0: unix_ts(d0),
        x1: unix_ts(d1),
        width,
        zoom_level: 0.0,
        offset: 0,
    };
    TickGenerator::Timestamp { timezone: utc() }
        .labels(&window, TickSpacing::default())
        .into_iter()
        .map(|label| label.text)
        .collect()
}

fn assert_time_axis(d0: &str, d1: &str, width: u32, expected: &str) {
    let pattern = Regex::new(&format!("^(?:{expected})$")).expect("valid test pattern");
    let labels = time_labels(d0, d1, width);
    assert!(labels.len() >= 2, "too few ticks: {labels:?}");
    for label in &labels {
        assert!(pattern.is_match(label), "label {label:?} does not match {expected}");
    }
}

#[test]
fn one_year_ticks_on_first_of_month() {
    assert_time_axis("20200101-000000", "20210101-000000", 800, r"202[01]-\d\d-01");
}

#[test]
fn century_span_ticks_on_decades() {
    assert_time_axis("19000101-000000", "20210101-000000", 800, r"\d\d\d0");
}

#[test]
fn two_months_tick_on_days() {
    assert_time_axis("20210401-000000", "20210601-000000", 800, r"2021-0[456]-\d\d");
}

#[test]
fn overnight_span_ticks_on_hours() {
    assert_time_axis(
        "20201231-210000",
        "20210101-120000",
        800,
        r"(202[01]-\d\d-\d\d )?\d\d:00",
    );
}

#[test]
fn fifteen_minutes_tick_on_minutes() {
    assert_time_axis(
        "20210131-235000",
        "20210201-000500",
        800,
        r"(2021-\d\d-\d\d )?\d\d:\d\d",
    );
}

#[test]
fn ten_seconds_tick_on_seconds() {
    assert_time_axis(
        "20210131-235955",
        "20210201-000005",
        800,
        r"(2021-\d\d-\d\d )?\d\d:\d\d:\d\d",
    );
}

#[test]
fn thirteen_months_tick_monthly() {
    assert_time_axis("20191213-084904", "20210118-231056", 1000, r"202[01]-\d\d-01");
}

#[test]
fn date_prefix_only_appears_when_the_day_changes() {
    let labels = time_labels("20201231-210000", "20210101-120000", 800);
    let with_date: Vec<&String> = labels.iter().filter(|label| label.len() > 5).collect();
    assert_eq!(with_date.len(), 2, "{labels:?}");
    assert!(with_date[0].starts_with("2020-12-31"));
    assert!(with_date[1].starts_with("2021-01-01"));
}

#[test]
fn best_candidate_for_one_year_is_two_months() {
    let best = select_best(
        TimestampCandidates::new(
            unix_ts("20200101-000000"),
            unix_ts("20210101-000000"),
            800,
            TickSpacing::default(),
            utc(),
        ),
        800,
        TickSpacing::default(),
    )
    .expect("a candidate");
    assert_eq!(best.spec().unit, TickUnit::Month);
    assert_eq!(best.step(), 2);
}

#[test]
fn sub_second_windows_have_no_ticks() {
    let t = unix_ts("20210101-000000");
    let window = AxisWindow {
        orientation: AxisOrientation::X,
        x0: t,
        x1: t + 0.5,
        width: 800,
        zoom_level: 0.0,
        offset: 0,
    };
    assert!(
        TickGenerator::Timestamp { timezone: utc() }
            .labels(&window, TickSpacing::default())
            .is_empty()
    );
}

#[test]
fn engine_uses_configured_timezone() {
    let config = AxisConfig::new(AxisKind::Timestamp, AxisKind::Linear)
        .with_timezone(TimeAxisTimeZone::FixedOffsetMinutes { minutes: 9 * 60 });
    let engine = AxisLabelEngine::new(config).expect("valid config");
    let labels = engine.axis_labels(&AxisWindow {
        orientation: AxisOrientation::X,
        x0: unix_ts("20210101-000000"),
        x1: unix_ts("20210108-000000"),
        width: 800,
        zoom_level: 0.0,
        offset: 0,
    });
    // Local midnight in UTC+9 lands at 15:00 UTC.
    assert_eq!(labels[0].text, "2021-01-02");
    assert!(labels.len() >= 2);
}
