use study_hub::grades::{
    self, AssessmentType, BASELINE_GPA, GRADE_BANDS, Grade, band_for, cumulative_gpa,
    grade_point_from_marks, letter_from_marks, past_transcript,
};
use study_hub::schedule::Timetable;

fn grade(id: &str, code: &str, score: f64, kind: AssessmentType) -> Grade {
    Grade::new(id, code, format!("{kind} {id}"), score, kind)
}

#[test]
fn band_boundaries() {
    assert_eq!(grade_point_from_marks(80.0), 4.0);
    assert_eq!(letter_from_marks(80.0), "A+");
    assert_eq!(grade_point_from_marks(79.0), 3.75);
    assert_eq!(letter_from_marks(79.0), "A");
    assert_eq!(grade_point_from_marks(40.0), 2.0);
    assert_eq!(letter_from_marks(40.0), "D");
    assert_eq!(grade_point_from_marks(39.0), 0.0);
    assert_eq!(letter_from_marks(39.0), "F");
    assert_eq!(letter_from_marks(100.0), "A+");
}

#[test]
fn grade_points_never_decrease_with_marks() {
    let mut previous = -1.0;
    for marks in 0..=100 {
        let band = band_for(f64::from(marks));
        assert!(band.grade_point >= previous, "drop at {marks} marks");
        previous = band.grade_point;
    }
    for pair in GRADE_BANDS.windows(2) {
        assert!(pair[0].min_marks > pair[1].min_marks);
        assert!(pair[0].grade_point > pair[1].grade_point);
    }
}

#[test]
fn assessment_weights_follow_type() {
    assert_eq!(AssessmentType::Continuous.max_weight(), 30.0);
    assert_eq!(AssessmentType::MidTerm.max_weight(), 30.0);
    assert_eq!(AssessmentType::Final.max_weight(), 40.0);
    assert_eq!(AssessmentType::from_str("Mid-term"), Some(AssessmentType::MidTerm));
    assert_eq!(AssessmentType::from_str("midterm"), Some(AssessmentType::MidTerm));
    assert_eq!(AssessmentType::from_str("quiz"), None);

    let g = grade("1", "MAT 1110", 35.0, AssessmentType::Final);
    assert_eq!(g.weight, 40.0);
}

#[test]
fn past_transcript_alone_gives_baseline() {
    let transcript = past_transcript();
    let credits: f64 = transcript.iter().map(|c| c.credits).sum();
    assert_eq!(credits, 21.0);
    assert_eq!(cumulative_gpa(&transcript, &[], &Timetable::default()), "3.750");
}

#[test]
fn zero_credits_reports_baseline() {
    let empty = Timetable::new(Vec::new()).unwrap();
    assert_eq!(cumulative_gpa(&[], &[], &empty), BASELINE_GPA);
    assert_eq!(grades::gpa_breakdown(&[], &[], &empty).gpa(), None);
}

#[test]
fn course_total_sums_assessments() {
    let timetable = Timetable::default();
    let grades = vec![
        grade("1", "MAT 1110", 25.0, AssessmentType::Continuous),
        grade("2", "MAT 1110", 22.0, AssessmentType::MidTerm),
        grade("3", "MAT 1110", 35.0, AssessmentType::Final),
    ];
    let summary = grades::course_summary(&grades, "MAT 1110", &timetable).unwrap();
    assert_eq!(summary.total_marks, 82.0);
    assert_eq!(summary.letter, "A+");
    assert_eq!(summary.grade_point, 4.0);
    assert_eq!(summary.credits, 3.0);
    assert_eq!(summary.assessments, 3);
    assert!(grades::course_summary(&grades, "BIS 2122", &timetable).is_none());
}

#[test]
fn current_term_grades_join_the_transcript() {
    let timetable = Timetable::default();
    let grades = vec![
        grade("1", "MAT 1110", 25.0, AssessmentType::Continuous),
        grade("2", "MAT 1110", 22.0, AssessmentType::MidTerm),
        grade("3", "MAT 1110", 35.0, AssessmentType::Final),
    ];
    let breakdown = grades::gpa_breakdown(&past_transcript(), &grades, &timetable);
    assert_eq!(breakdown.current_credits, 3.0);
    assert_eq!(breakdown.current_tgp, 12.0);
    // (78.75 + 12) / 24
    assert_eq!(breakdown.formatted(), "3.781");
}

#[test]
fn ungraded_courses_do_not_count() {
    let timetable = Timetable::default();
    let grades = vec![grade("1", "GED 1117", 10.0, AssessmentType::Continuous)];
    let breakdown = grades::gpa_breakdown(&[], &grades, &timetable);
    // only GED 1117 contributes, with 10 marks -> F
    assert_eq!(breakdown.current_credits, 3.0);
    assert_eq!(breakdown.formatted(), "0.000");
}

#[test]
fn unknown_course_uses_default_credits() {
    let timetable = Timetable::default();
    let grades = vec![grade("1", "ACC 1010", 30.0, AssessmentType::Continuous)];
    let summaries = grades::course_summaries(&grades, &timetable);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].credits, grades::DEFAULT_COURSE_CREDITS);
    assert_eq!(summaries[0].letter, "F");
}

#[test]
fn graded_codes_keep_first_appearance_order() {
    let grades = vec![
        grade("1", "BIS 2122", 20.0, AssessmentType::Continuous),
        grade("2", "MKT 2127", 20.0, AssessmentType::Continuous),
        grade("3", "BIS 2122", 20.0, AssessmentType::MidTerm),
    ];
    assert_eq!(grades::graded_course_codes(&grades), vec!["BIS 2122", "MKT 2127"]);
}

#[test]
fn grade_json_uses_stored_field_names() {
    let g = grade("7", "MKT 2127", 18.5, AssessmentType::MidTerm);
    let json = serde_json::to_value(&g).unwrap();
    assert_eq!(json["courseCode"], "MKT 2127");
    assert_eq!(json["type"], "Mid-term");
    assert_eq!(json["weight"], 30.0);
}
