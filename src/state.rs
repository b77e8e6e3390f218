//! Application state: everything the dashboard shows, loaded once from a
//! [`KeyValueStore`] and written back key by key after each mutation.

use crate::assignment::{self, Assignment, AssignmentKind, AssignmentStatus};
use crate::attendance::{AttendanceDetail, AttendanceLog, ManualAdjustment, MarkOutcome};
use crate::calendar;
use crate::chat::{self, ChatClient, ChatError, ChatMessage, ChatRequest, ChatSession};
use crate::grades::{self, AssessmentType, CourseGradeSummary, GpaBreakdown, Grade, TranscriptCourse};
use crate::persistence::{self, KeyValueStore, PersistenceError, PersistenceResult, keys};
use crate::record_validation;
use crate::schedule::{CurrentStatus, DashboardSnapshot, Timetable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::fmt;
use tracing::{debug, info, warn};

pub const DEFAULT_NOTE: &str = "You're doing amazing! Keep shining!";
pub const DEFAULT_STUDENT_NAME: &str = "there";

#[derive(Debug)]
pub enum DashboardError {
    Chat(ChatError),
    Persistence(PersistenceError),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Chat(err) => write!(f, "chat error: {err}"),
            DashboardError::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DashboardError {}

impl From<ChatError> for DashboardError {
    fn from(value: ChatError) -> Self {
        Self::Chat(value)
    }
}

impl From<PersistenceError> for DashboardError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

pub struct Dashboard<S: KeyValueStore> {
    store: S,
    timetable: Timetable,
    transcript: Vec<TranscriptCourse>,
    attendance: AttendanceLog,
    assignments: Vec<Assignment>,
    grades: Vec<Grade>,
    chat: ChatSession,
    dark_mode: bool,
    personal_note: String,
    student_name: String,
}

/// Millisecond timestamp id, bumped past any id already taken.
fn fresh_id<'a>(taken: impl Iterator<Item = &'a str> + Clone, now: DateTime<Utc>) -> String {
    let mut stamp = now.timestamp_millis();
    while taken.clone().any(|id| id == stamp.to_string()) {
        stamp += 1;
    }
    stamp.to_string()
}

impl<S: KeyValueStore> Dashboard<S> {
    /// Read every key from `store`. Never fails: unreadable values are
    /// logged and replaced by their defaults, and unusable records inside a
    /// readable list are dropped one by one.
    pub fn load(store: S) -> Self {
        let attendance: AttendanceLog =
            persistence::load_json_or_default(&store, keys::ATTENDANCE, |_| Ok(()));
        let assignments = record_validation::retain_valid_assignments(
            persistence::load_json_or_default(&store, keys::ASSIGNMENTS, |_| Ok(())),
        );
        let grades = record_validation::retain_valid_grades(persistence::load_json_or_default(
            &store,
            keys::GRADES,
            |_| Ok(()),
        ));
        let history = record_validation::retain_valid_chat_history(
            persistence::load_json_or_default(&store, keys::CHAT_HISTORY, |_| Ok(())),
        );

        let dark_mode = match store.get(keys::DARK_MODE) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(err) => {
                warn!(key = keys::DARK_MODE, error = %err, "discarding unreadable stored value");
                false
            }
        };
        let personal_note = match store.get(keys::PERSONAL_NOTE) {
            Ok(Some(note)) if !note.is_empty() => note,
            Ok(_) => DEFAULT_NOTE.to_string(),
            Err(err) => {
                warn!(key = keys::PERSONAL_NOTE, error = %err, "discarding unreadable stored value");
                DEFAULT_NOTE.to_string()
            }
        };

        info!(
            attendance = attendance.len(),
            assignments = assignments.len(),
            grades = grades.len(),
            chat_messages = history.len(),
            "dashboard state loaded"
        );

        Self {
            store,
            timetable: Timetable::default(),
            transcript: grades::past_transcript(),
            attendance,
            assignments,
            grades,
            chat: ChatSession::from_history(history),
            dark_mode,
            personal_note,
            student_name: DEFAULT_STUDENT_NAME.to_string(),
        }
    }

    pub fn with_timetable(mut self, timetable: Timetable) -> Self {
        self.timetable = timetable;
        self
    }

    pub fn with_transcript(mut self, transcript: Vec<TranscriptCourse>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_student_name(mut self, name: impl Into<String>) -> Self {
        self.student_name = name.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timetable(&self) -> &Timetable {
        &self.timetable
    }

    pub fn transcript(&self) -> &[TranscriptCourse] {
        &self.transcript
    }

    pub fn attendance(&self) -> &AttendanceLog {
        &self.attendance
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn personal_note(&self) -> &str {
        &self.personal_note
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn greeting(&self, now: NaiveDateTime) -> String {
        calendar::greeting(now.hour(), &self.student_name)
    }

    // Queries

    pub fn status(&self, now: NaiveDateTime) -> CurrentStatus {
        self.timetable.resolve_status(now)
    }

    pub fn snapshot(&self, now: NaiveDateTime) -> DashboardSnapshot {
        self.timetable.snapshot(now)
    }

    pub fn gpa(&self) -> String {
        grades::cumulative_gpa(&self.transcript, &self.grades, &self.timetable)
    }

    pub fn gpa_breakdown(&self) -> GpaBreakdown {
        grades::gpa_breakdown(&self.transcript, &self.grades, &self.timetable)
    }

    pub fn course_summaries(&self) -> Vec<CourseGradeSummary> {
        grades::course_summaries(&self.grades, &self.timetable)
    }

    pub fn attendance_detail(&self, code: &str) -> AttendanceDetail {
        self.attendance.course_detail(code)
    }

    pub fn attendance_totals(&self) -> AttendanceDetail {
        self.attendance.totals()
    }

    pub fn skip_margin(&self, code: &str) -> u32 {
        self.attendance.safe_skip_margin(code)
    }

    pub fn assignments_by_due(&self) -> Vec<&Assignment> {
        assignment::sorted_by_due(&self.assignments)
    }

    pub fn next_deadline(&self) -> Option<&Assignment> {
        assignment::next_deadline(&self.assignments)
    }

    // Attendance

    pub fn mark_attendance(
        &mut self,
        code: &str,
        present: bool,
        date: NaiveDate,
    ) -> PersistenceResult<MarkOutcome> {
        let mut attendance = self.attendance.clone();
        let outcome = attendance.mark(code, present, date);
        self.save_attendance(attendance)?;
        debug!(code, ?outcome, "attendance marked");
        Ok(outcome)
    }

    pub fn adjust_attendance(
        &mut self,
        code: &str,
        increment: bool,
        is_present: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<ManualAdjustment> {
        let mut attendance = self.attendance.clone();
        let outcome = attendance.adjust_manual(code, increment, is_present, now.timestamp_millis());
        if outcome != ManualAdjustment::NothingToRemove {
            self.save_attendance(attendance)?;
        }
        debug!(code, ?outcome, "manual attendance adjusted");
        Ok(outcome)
    }

    // Each save_* writes the new value first and only then replaces the
    // in-memory copy, so a failed write leaves both sides unchanged.

    fn save_attendance(&mut self, attendance: AttendanceLog) -> PersistenceResult<()> {
        persistence::save_json(&self.store, keys::ATTENDANCE, &attendance)?;
        self.attendance = attendance;
        Ok(())
    }

    // Assignments

    pub fn add_assignment(
        &mut self,
        title: &str,
        course_code: &str,
        due_date: NaiveDate,
        kind: AssignmentKind,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Assignment> {
        let id = fresh_id(self.assignments.iter().map(|a| a.id.as_str()), now);
        let assignment = Assignment::new(id, title.trim(), course_code.trim(), due_date, kind);
        self.insert_assignment(assignment.clone())?;
        Ok(assignment)
    }

    /// Append a fully formed assignment, rejecting invalid records and taken ids.
    pub fn insert_assignment(&mut self, assignment: Assignment) -> PersistenceResult<()> {
        record_validation::validate_assignment(&assignment)?;
        if self.assignments.iter().any(|a| a.id == assignment.id) {
            return Err(PersistenceError::InvalidData(format!(
                "assignment {} already exists",
                assignment.id
            )));
        }
        let mut assignments = self.assignments.clone();
        assignments.push(assignment);
        self.save_assignments(assignments)
    }

    /// Flip pending/completed. `None` when no assignment has `id`.
    pub fn toggle_assignment(&mut self, id: &str) -> PersistenceResult<Option<AssignmentStatus>> {
        let mut assignments = self.assignments.clone();
        let Some(item) = assignments.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        item.status = item.status.toggled();
        let status = item.status;
        self.save_assignments(assignments)?;
        Ok(Some(status))
    }

    pub fn remove_assignment(&mut self, id: &str) -> PersistenceResult<bool> {
        if !self.assignments.iter().any(|a| a.id == id) {
            return Ok(false);
        }
        let remaining = self.assignments.iter().filter(|a| a.id != id).cloned().collect();
        self.save_assignments(remaining)?;
        Ok(true)
    }

    fn save_assignments(&mut self, assignments: Vec<Assignment>) -> PersistenceResult<()> {
        persistence::save_json(&self.store, keys::ASSIGNMENTS, &assignments)?;
        self.assignments = assignments;
        Ok(())
    }

    // Grades

    /// Record an assessment; its weight comes from the assessment type.
    pub fn add_grade(
        &mut self,
        course_code: &str,
        title: &str,
        score: f64,
        kind: AssessmentType,
        now: DateTime<Utc>,
    ) -> PersistenceResult<Grade> {
        let id = fresh_id(self.grades.iter().map(|g| g.id.as_str()), now);
        let grade = Grade::new(id, course_code.trim(), title.trim(), score, kind);
        self.insert_grade(grade.clone())?;
        Ok(grade)
    }

    pub fn insert_grade(&mut self, grade: Grade) -> PersistenceResult<()> {
        record_validation::validate_grade(&grade)?;
        if self.grades.iter().any(|g| g.id == grade.id) {
            return Err(PersistenceError::InvalidData(format!(
                "grade {} already exists",
                grade.id
            )));
        }
        let mut grades = self.grades.clone();
        grades.push(grade);
        self.save_grades(grades)
    }

    /// Swap in a whole grade list, e.g. from a CSV import.
    pub fn replace_grades(&mut self, grades: Vec<Grade>) -> PersistenceResult<()> {
        record_validation::validate_grade_collection(&grades)?;
        self.save_grades(grades)
    }

    pub fn remove_grade(&mut self, id: &str) -> PersistenceResult<bool> {
        if !self.grades.iter().any(|g| g.id == id) {
            return Ok(false);
        }
        let remaining = self.grades.iter().filter(|g| g.id != id).cloned().collect();
        self.save_grades(remaining)?;
        Ok(true)
    }

    fn save_grades(&mut self, grades: Vec<Grade>) -> PersistenceResult<()> {
        persistence::save_json(&self.store, keys::GRADES, &grades)?;
        self.grades = grades;
        Ok(())
    }

    // Preferences

    pub fn set_dark_mode(&mut self, enabled: bool) -> PersistenceResult<()> {
        self.store
            .set(keys::DARK_MODE, if enabled { "true" } else { "false" })?;
        self.dark_mode = enabled;
        Ok(())
    }

    pub fn toggle_dark_mode(&mut self) -> PersistenceResult<bool> {
        self.set_dark_mode(!self.dark_mode)?;
        Ok(self.dark_mode)
    }

    pub fn set_personal_note(&mut self, note: &str) -> PersistenceResult<()> {
        self.store.set(keys::PERSONAL_NOTE, note)?;
        self.personal_note = note.to_string();
        Ok(())
    }

    // Chat

    /// Append the user's message and build the outbound request. Pair with
    /// [`Dashboard::finish_chat`]; the lock on shared state need not be
    /// held while the request is outstanding.
    pub fn begin_chat(
        &mut self,
        query: &str,
        image_data_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ChatRequest, ChatError> {
        self.chat.begin(query, image_data_url, now)
    }

    pub fn finish_chat(
        &mut self,
        result: Result<String, ChatError>,
        now: DateTime<Utc>,
    ) -> PersistenceResult<ChatMessage> {
        let mut chat = self.chat.clone();
        let reply = chat.finish(result, now).clone();
        if let Err(err) = persistence::save_json(&self.store, keys::CHAT_HISTORY, chat.messages()) {
            // the request is over either way
            self.chat.cancel();
            return Err(err);
        }
        self.chat = chat;
        Ok(reply)
    }

    /// Give up on the outstanding reply, keeping the user's message.
    pub fn abandon_chat(&mut self) {
        if !self.chat.cancel() {
            return;
        }
        if let Err(err) = self.save_chat() {
            warn!(error = %err, "could not save chat history after abandoned reply");
        }
    }

    pub async fn ask<C: ChatClient>(
        &mut self,
        client: &C,
        query: &str,
        image_data_url: Option<&str>,
    ) -> Result<ChatMessage, DashboardError> {
        let request = self.begin_chat(query, image_data_url, Utc::now())?;
        let mut pending = PendingReply {
            dashboard: &mut *self,
            armed: true,
        };
        let result = client.send(&request).await;
        pending.armed = false;
        drop(pending);
        Ok(self.finish_chat(result, Utc::now())?)
    }

    pub fn clear_chat(&mut self) -> PersistenceResult<()> {
        persistence::save_json(&self.store, keys::CHAT_HISTORY, &[] as &[ChatMessage])?;
        self.chat.clear();
        Ok(())
    }

    fn save_chat(&self) -> PersistenceResult<()> {
        persistence::save_json(&self.store, keys::CHAT_HISTORY, self.chat.messages())
    }

    /// Study tips for a scheduled course, asked by its title when known.
    pub async fn study_tips<C: ChatClient>(&self, client: &C, code: &str) -> String {
        let subject = self.timetable.title_for(code).unwrap_or(code);
        chat::study_tips(client, subject).await
    }
}

/// Abandons the chat reply when an `ask` future is dropped mid-request.
struct PendingReply<'a, S: KeyValueStore> {
    dashboard: &'a mut Dashboard<S>,
    armed: bool,
}

impl<S: KeyValueStore> Drop for PendingReply<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.dashboard.abandon_chat();
        }
    }
}
