use crate::schedule::Timetable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credits assumed for a graded course the timetable does not list.
pub const DEFAULT_COURSE_CREDITS: f64 = 3.0;

/// Reported when there are no credits at all to divide by.
pub const BASELINE_GPA: &str = "3.750";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub min_marks: f64,
    pub grade_point: f64,
    pub letter: &'static str,
}

/// Inclusive lower bounds, highest first. Letter and grade point both come
/// from this table so the two mappings cannot drift apart.
pub const GRADE_BANDS: [GradeBand; 9] = [
    GradeBand { min_marks: 80.0, grade_point: 4.00, letter: "A+" },
    GradeBand { min_marks: 75.0, grade_point: 3.75, letter: "A" },
    GradeBand { min_marks: 70.0, grade_point: 3.50, letter: "A-" },
    GradeBand { min_marks: 65.0, grade_point: 3.25, letter: "B+" },
    GradeBand { min_marks: 60.0, grade_point: 3.00, letter: "B" },
    GradeBand { min_marks: 55.0, grade_point: 2.75, letter: "B-" },
    GradeBand { min_marks: 50.0, grade_point: 2.50, letter: "C+" },
    GradeBand { min_marks: 45.0, grade_point: 2.25, letter: "C" },
    GradeBand { min_marks: 40.0, grade_point: 2.00, letter: "D" },
];

pub const FAILING_BAND: GradeBand = GradeBand {
    min_marks: 0.0,
    grade_point: 0.0,
    letter: "F",
};

pub fn band_for(marks: f64) -> GradeBand {
    GRADE_BANDS
        .iter()
        .copied()
        .find(|band| marks >= band.min_marks)
        .unwrap_or(FAILING_BAND)
}

pub fn grade_point_from_marks(marks: f64) -> f64 {
    band_for(marks).grade_point
}

pub fn letter_from_marks(marks: f64) -> &'static str {
    band_for(marks).letter
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentType {
    Continuous,
    #[serde(rename = "Mid-term")]
    MidTerm,
    Final,
}

impl AssessmentType {
    /// Maximum marks an assessment of this type contributes to the 100-mark total.
    pub fn max_weight(self) -> f64 {
        match self {
            AssessmentType::Continuous => 30.0,
            AssessmentType::MidTerm => 30.0,
            AssessmentType::Final => 40.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentType::Continuous => "Continuous",
            AssessmentType::MidTerm => "Mid-term",
            AssessmentType::Final => "Final",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "continuous" | "ct" => Some(AssessmentType::Continuous),
            "mid-term" | "midterm" | "mid" => Some(AssessmentType::MidTerm),
            "final" => Some(AssessmentType::Final),
            _ => None,
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub course_code: String,
    pub title: String,
    pub score: f64,
    pub weight: f64,
    #[serde(rename = "type")]
    pub kind: AssessmentType,
}

impl Grade {
    pub fn new(
        id: impl Into<String>,
        course_code: impl Into<String>,
        title: impl Into<String>,
        score: f64,
        kind: AssessmentType,
    ) -> Self {
        Self {
            id: id.into(),
            course_code: course_code.into(),
            title: title.into(),
            score,
            weight: kind.max_weight(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptCourse {
    pub code: String,
    pub title: String,
    pub credits: f64,
    pub grade: String,
    pub gp: f64,
    pub tgp: f64,
}

impl TranscriptCourse {
    pub fn new(code: &str, title: &str, credits: f64, grade: &str, gp: f64) -> Self {
        Self {
            code: code.to_string(),
            title: title.to_string(),
            credits,
            grade: grade.to_string(),
            gp,
            tgp: credits * gp,
        }
    }
}

/// Completed courses from earlier terms.
pub fn past_transcript() -> Vec<TranscriptCourse> {
    vec![
        TranscriptCourse::new("ACT 2124", "Financial Accounting-I", 3.0, "A", 3.75),
        TranscriptCourse::new("BBA 2121", "Introduction to Business", 3.0, "A+", 4.0),
        TranscriptCourse::new("BUS 2123", "Business Communication", 3.0, "A", 3.75),
        TranscriptCourse::new("ENG 1100", "English Language-I : Sentence and their Elements", 0.0, "B+", 3.25),
        TranscriptCourse::new("ENG 1111", "Business English I (Listening and Speaking)", 3.0, "A-", 3.5),
        TranscriptCourse::new("ENG 1113", "Business English II (Reading and Writing)", 3.0, "A-", 3.5),
        TranscriptCourse::new("GED 1213", "Health & Environment", 3.0, "A", 3.75),
        TranscriptCourse::new("MGT 2125", "Principles of Management", 3.0, "A+", 4.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGradeSummary {
    pub code: String,
    pub total_marks: f64,
    pub letter: &'static str,
    pub grade_point: f64,
    pub credits: f64,
    pub assessments: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaBreakdown {
    pub historical_credits: f64,
    pub historical_tgp: f64,
    pub current_credits: f64,
    pub current_tgp: f64,
}

impl GpaBreakdown {
    pub fn total_credits(&self) -> f64 {
        self.historical_credits + self.current_credits
    }

    pub fn total_tgp(&self) -> f64 {
        self.historical_tgp + self.current_tgp
    }

    pub fn gpa(&self) -> Option<f64> {
        let credits = self.total_credits();
        if credits == 0.0 {
            None
        } else {
            Some(self.total_tgp() / credits)
        }
    }

    /// Three-decimal GPA string, or the baseline when no credits exist.
    pub fn formatted(&self) -> String {
        match self.gpa() {
            Some(gpa) => format!("{gpa:.3}"),
            None => BASELINE_GPA.to_string(),
        }
    }
}

/// Distinct course codes in the order they first appear among the grades.
pub fn graded_course_codes(grades: &[Grade]) -> Vec<&str> {
    let mut codes: Vec<&str> = Vec::new();
    for grade in grades {
        if !codes.contains(&grade.course_code.as_str()) {
            codes.push(&grade.course_code);
        }
    }
    codes
}

pub fn course_summary(grades: &[Grade], code: &str, timetable: &Timetable) -> Option<CourseGradeSummary> {
    let course_grades: Vec<&Grade> = grades.iter().filter(|g| g.course_code == code).collect();
    if course_grades.is_empty() {
        return None;
    }
    let total_marks: f64 = course_grades.iter().map(|g| g.score).sum();
    let band = band_for(total_marks);
    Some(CourseGradeSummary {
        code: code.to_string(),
        total_marks,
        letter: band.letter,
        grade_point: band.grade_point,
        credits: timetable.credits_for(code).unwrap_or(DEFAULT_COURSE_CREDITS),
        assessments: course_grades.len(),
    })
}

pub fn course_summaries(grades: &[Grade], timetable: &Timetable) -> Vec<CourseGradeSummary> {
    graded_course_codes(grades)
        .into_iter()
        .filter_map(|code| course_summary(grades, code, timetable))
        .collect()
}

pub fn gpa_breakdown(
    transcript: &[TranscriptCourse],
    grades: &[Grade],
    timetable: &Timetable,
) -> GpaBreakdown {
    let mut breakdown = GpaBreakdown {
        historical_credits: transcript.iter().map(|c| c.credits).sum(),
        historical_tgp: transcript.iter().map(|c| c.tgp).sum(),
        ..GpaBreakdown::default()
    };

    for summary in course_summaries(grades, timetable) {
        breakdown.current_tgp += summary.grade_point * summary.credits;
        breakdown.current_credits += summary.credits;
    }
    breakdown
}

pub fn cumulative_gpa(
    transcript: &[TranscriptCourse],
    grades: &[Grade],
    timetable: &Timetable,
) -> String {
    gpa_breakdown(transcript, grades, timetable).formatted()
}
