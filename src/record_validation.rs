use crate::assignment::Assignment;
use crate::chat::ChatMessage;
use crate::grades::Grade;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct RecordValidationError {
    message: String,
}

impl RecordValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RecordValidationError {}

fn approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// The minimum a grade needs to take part in totals: a course code and a
/// finite, non-negative score.
pub fn validate_grade_record(grade: &Grade) -> Result<(), RecordValidationError> {
    if grade.course_code.trim().is_empty() {
        return Err(RecordValidationError::new(format!(
            "grade {} has an empty course code",
            grade.id
        )));
    }
    if !grade.score.is_finite() || grade.score < -EPSILON {
        return Err(RecordValidationError::new(format!(
            "grade {} has invalid score {}",
            grade.id, grade.score
        )));
    }
    Ok(())
}

/// Checks a grade being entered: its weight must match the assessment type
/// and its score must fit under that weight. The per-course sum is not
/// capped at 100.
pub fn validate_grade(grade: &Grade) -> Result<(), RecordValidationError> {
    validate_grade_record(grade)?;
    if !approx_equal(grade.weight, grade.kind.max_weight()) {
        return Err(RecordValidationError::new(format!(
            "grade {} has weight {} but {} assessments are worth {}",
            grade.id,
            grade.weight,
            grade.kind,
            grade.kind.max_weight()
        )));
    }
    if grade.score > grade.weight + EPSILON {
        return Err(RecordValidationError::new(format!(
            "grade {} score {} exceeds the {} maximum of {}",
            grade.id, grade.score, grade.kind, grade.weight
        )));
    }
    Ok(())
}

pub fn validate_grade_collection(grades: &[Grade]) -> Result<(), RecordValidationError> {
    let mut seen_ids = HashSet::with_capacity(grades.len());
    for grade in grades {
        validate_grade(grade)?;
        if !seen_ids.insert(grade.id.as_str()) {
            return Err(RecordValidationError::new(format!(
                "duplicate grade id {}",
                grade.id
            )));
        }
    }
    Ok(())
}

pub fn validate_assignment(assignment: &Assignment) -> Result<(), RecordValidationError> {
    if assignment.title.trim().is_empty() {
        return Err(RecordValidationError::new(format!(
            "assignment {} has an empty title",
            assignment.id
        )));
    }
    if assignment.course_code.trim().is_empty() {
        return Err(RecordValidationError::new(format!(
            "assignment {} has an empty course code",
            assignment.id
        )));
    }
    Ok(())
}

/// Keep the records of a stored list that pass `check`, first id wins.
/// Dropped records are logged, the rest of the list survives.
fn retain_records<T, I, C>(records: Vec<T>, kind: &str, id_of: I, check: C) -> Vec<T>
where
    I: Fn(&T) -> &str,
    C: Fn(&T) -> Result<(), RecordValidationError>,
{
    let mut seen_ids = HashSet::with_capacity(records.len());
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if let Err(err) = check(&record) {
            warn!(kind, error = %err, "dropping unusable stored record");
            continue;
        }
        if !seen_ids.insert(id_of(&record).to_string()) {
            warn!(kind, id = id_of(&record), "dropping stored record with duplicate id");
            continue;
        }
        kept.push(record);
    }
    kept
}

/// Stored grades keep scores above their weight; only records that cannot
/// be totalled are dropped.
pub fn retain_valid_grades(grades: Vec<Grade>) -> Vec<Grade> {
    retain_records(grades, "grade", |g| g.id.as_str(), |g| {
        if g.score > g.kind.max_weight() + EPSILON {
            warn!(id = %g.id, score = g.score, "stored grade exceeds its assessment maximum");
        }
        validate_grade_record(g)
    })
}

pub fn retain_valid_assignments(assignments: Vec<Assignment>) -> Vec<Assignment> {
    retain_records(assignments, "assignment", |a| a.id.as_str(), validate_assignment)
}

pub fn retain_valid_chat_history(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    retain_records(messages, "chat message", |m| m.id.as_str(), |_| Ok(()))
}
