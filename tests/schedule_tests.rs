use chrono::{NaiveDate, NaiveDateTime};
use study_hub::schedule::{
    ColorTag, CurrentStatus, ScheduleError, ScheduleItem, Timetable, default_schedule,
};

// 2025-01-05 is a Sunday, 2025-01-04 a Saturday
fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn class(id: &str, day: u8, start: &str, end: &str, code: &str) -> ScheduleItem {
    ScheduleItem::new(id, day, start, end, code, code, "101", "Staff", ColorTag::Red, 3.0)
}

#[test]
fn default_timetable_has_four_courses() {
    let timetable = Timetable::default();
    assert_eq!(timetable.len(), default_schedule().len());
    assert_eq!(
        timetable.course_codes(),
        vec!["MKT 2127", "GED 1117", "BIS 2122", "MAT 1110"]
    );
    assert_eq!(timetable.credits_for("MAT 1110"), Some(3.0));
    assert_eq!(timetable.credits_for("ACC 1010"), None);
    assert_eq!(timetable.title_for("BIS 2122"), Some("Computer Applications"));
}

#[test]
fn active_class_at_sunday_quarter_past_eleven() {
    let timetable = Timetable::default();
    let status = timetable.resolve_status(at(2025, 1, 5, 11, 15));
    match status {
        CurrentStatus::Active { class } => assert_eq!(class.code, "MKT 2127"),
        other => panic!("expected active class, got {other:?}"),
    }
}

#[test]
fn upcoming_class_reports_minutes_until_start() {
    let timetable = Timetable::default();
    let status = timetable.resolve_status(at(2025, 1, 5, 10, 0));
    assert_eq!(status.kind(), "upcoming");
    match status {
        CurrentStatus::Upcoming {
            class,
            minutes_until,
        } => {
            assert_eq!(class.code, "MKT 2127");
            assert_eq!(minutes_until, 60);
        }
        other => panic!("expected upcoming class, got {other:?}"),
    }
}

#[test]
fn end_minute_is_exclusive() {
    let timetable = Timetable::default();
    // 12:30 is the end of MKT 2127, GED 1117 starts at 13:00
    let status = timetable.resolve_status(at(2025, 1, 5, 12, 30));
    match status {
        CurrentStatus::Upcoming {
            class,
            minutes_until,
        } => {
            assert_eq!(class.code, "GED 1117");
            assert_eq!(minutes_until, 30);
        }
        other => panic!("expected upcoming class, got {other:?}"),
    }
    assert_eq!(timetable.resolve_status(at(2025, 1, 5, 11, 0)).kind(), "active");
}

#[test]
fn free_after_last_class_of_the_day() {
    let timetable = Timetable::default();
    assert_eq!(
        timetable.resolve_status(at(2025, 1, 5, 18, 0)),
        CurrentStatus::Free
    );
}

#[test]
fn next_class_wraps_into_following_days() {
    let timetable = Timetable::default();
    // Sunday evening: Monday's MAT 1110
    let next = timetable.find_next_class(0, 18 * 60).unwrap();
    assert_eq!(next.code, "MAT 1110");
    assert_eq!(next.day, 1);
    // Saturday: wraps to Sunday's first class
    let next = timetable.find_next_class(6, 12 * 60).unwrap();
    assert_eq!(next.code, "MKT 2127");
    assert_eq!(next.day, 0);
}

#[test]
fn next_class_is_none_without_classes() {
    let empty = Timetable::new(Vec::new()).unwrap();
    assert!(empty.find_next_class(0, 0).is_none());
    assert_eq!(empty.resolve_status(at(2025, 1, 5, 11, 0)), CurrentStatus::Free);
}

#[test]
fn lookahead_does_not_revisit_today() {
    // Only one class, earlier today: nothing within the seven-day scan
    let timetable = Timetable::new(vec![class("1", 0, "09:00", "10:00", "ACC 1010")]).unwrap();
    assert!(timetable.find_next_class(0, 11 * 60).is_none());
    assert_eq!(timetable.find_next_class(0, 8 * 60).unwrap().code, "ACC 1010");
}

#[test]
fn snapshot_pairs_status_with_next_slot() {
    let timetable = Timetable::default();

    let during = timetable.snapshot(at(2025, 1, 5, 11, 15));
    assert_eq!(during.status.kind(), "active");
    assert_eq!(during.next_class.unwrap().code, "GED 1117");

    let before = timetable.snapshot(at(2025, 1, 5, 10, 0));
    assert_eq!(before.status.class().unwrap().code, "MKT 2127");
    assert_eq!(before.next_class.unwrap().code, "GED 1117");

    let evening = timetable.snapshot(at(2025, 1, 5, 18, 0));
    assert_eq!(evening.status, CurrentStatus::Free);
    assert_eq!(evening.next_class.unwrap().code, "MAT 1110");
}

#[test]
fn timetable_rejects_malformed_entries() {
    let bad_clock = Timetable::new(vec![class("1", 0, "9:00", "10:00", "ACC 1010")]);
    assert!(matches!(bad_clock, Err(ScheduleError::Clock { .. })));

    let bad_day = Timetable::new(vec![class("1", 7, "09:00", "10:00", "ACC 1010")]);
    assert!(matches!(bad_day, Err(ScheduleError::DayOutOfRange { day: 7, .. })));

    let empty = Timetable::new(vec![class("1", 0, "10:00", "10:00", "ACC 1010")]);
    assert!(matches!(empty, Err(ScheduleError::EmptyInterval { .. })));
}

#[test]
fn status_serializes_with_type_tag() {
    let timetable = Timetable::default();
    let json = serde_json::to_value(timetable.resolve_status(at(2025, 1, 5, 10, 0))).unwrap();
    assert_eq!(json["type"], "upcoming");
    assert_eq!(json["minutesUntil"], 60);
    assert_eq!(json["class"]["code"], "MKT 2127");
    assert_eq!(json["class"]["startTime"], "11:00");

    let free = serde_json::to_value(CurrentStatus::Free).unwrap();
    assert_eq!(free["type"], "free");
}
