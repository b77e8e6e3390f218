use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentKind {
    Assignment,
    Exam,
    Project,
    Quiz,
}

impl AssignmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentKind::Assignment => "Assignment",
            AssignmentKind::Exam => "Exam",
            AssignmentKind::Project => "Project",
            AssignmentKind::Quiz => "Quiz",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => Some(AssignmentKind::Assignment),
            "exam" => Some(AssignmentKind::Exam),
            "project" => Some(AssignmentKind::Project),
            "quiz" => Some(AssignmentKind::Quiz),
            _ => None,
        }
    }
}

impl fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Completed,
}

impl AssignmentStatus {
    pub fn toggled(self) -> Self {
        match self {
            AssignmentStatus::Pending => AssignmentStatus::Completed,
            AssignmentStatus::Completed => AssignmentStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub course_code: String,
    pub due_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: AssignmentKind,
    #[serde(default)]
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        course_code: impl Into<String>,
        due_date: NaiveDate,
        kind: AssignmentKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            course_code: course_code.into(),
            due_date,
            kind,
            status: AssignmentStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == AssignmentStatus::Pending
    }
}

/// Display order: earliest due date first, ties kept in insertion order.
pub fn sorted_by_due(assignments: &[Assignment]) -> Vec<&Assignment> {
    let mut sorted: Vec<&Assignment> = assignments.iter().collect();
    sorted.sort_by_key(|a| a.due_date);
    sorted
}

/// The pending assignment due soonest.
pub fn next_deadline(assignments: &[Assignment]) -> Option<&Assignment> {
    sorted_by_due(assignments)
        .into_iter()
        .find(|a| a.is_pending())
}
