pub mod assignment;
pub mod attendance;
pub mod calendar;
pub mod chat;
pub mod config;
pub mod grades;
pub mod persistence;
pub mod record_validation;
pub mod schedule;
pub mod state;
pub mod ticker;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use assignment::{Assignment, AssignmentKind, AssignmentStatus};
pub use attendance::{AttendanceDetail, AttendanceLog, ManualAdjustment, MarkOutcome};
pub use chat::{ChatClient, ChatError, ChatMessage, ChatRole, ChatSession, GeminiClient, GeminiConfig};
pub use config::AppConfig;
pub use grades::{AssessmentType, GpaBreakdown, Grade, TranscriptCourse};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use persistence::{
    JsonFileStore, KeyValueStore, MemoryStore, PersistenceError, PersistenceResult,
};
pub use schedule::{CurrentStatus, DashboardSnapshot, ScheduleItem, Timetable};
pub use state::{Dashboard, DashboardError};
pub use ticker::StatusTicker;
