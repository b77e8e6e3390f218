use crate::calendar::{self, ClockError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days scanned by the global next-class lookup, today included.
const LOOKAHEAD_DAYS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Green,
    Purple,
    Orange,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    pub day: u8,
    pub day_name: String,
    pub start_time: String,
    pub end_time: String,
    pub code: String,
    pub title: String,
    pub room: String,
    pub faculty: String,
    pub color: ColorTag,
    pub credits: f64,
}

impl ScheduleItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        day: u8,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        code: impl Into<String>,
        title: impl Into<String>,
        room: impl Into<String>,
        faculty: impl Into<String>,
        color: ColorTag,
        credits: f64,
    ) -> Self {
        Self {
            id: id.into(),
            day,
            day_name: calendar::day_name(day).unwrap_or_default().to_string(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            code: code.into(),
            title: title.into(),
            room: room.into(),
            faculty: faculty.into(),
            color,
            credits,
        }
    }
}

#[derive(Debug)]
pub enum ScheduleError {
    Clock { id: String, source: ClockError },
    DayOutOfRange { id: String, day: u8 },
    EmptyInterval { id: String },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Clock { id, source } => write!(f, "schedule item {id}: {source}"),
            ScheduleError::DayOutOfRange { id, day } => {
                write!(f, "schedule item {id} has day {day} outside 0-6")
            }
            ScheduleError::EmptyInterval { id } => {
                write!(f, "schedule item {id} ends before it starts")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// What the dashboard shows for "right now".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CurrentStatus {
    Active {
        class: ScheduleItem,
    },
    Upcoming {
        class: ScheduleItem,
        #[serde(rename = "minutesUntil")]
        minutes_until: u32,
    },
    Free,
}

impl CurrentStatus {
    pub fn kind(&self) -> &'static str {
        match self {
            CurrentStatus::Active { .. } => "active",
            CurrentStatus::Upcoming { .. } => "upcoming",
            CurrentStatus::Free => "free",
        }
    }

    pub fn class(&self) -> Option<&ScheduleItem> {
        match self {
            CurrentStatus::Active { class } | CurrentStatus::Upcoming { class, .. } => Some(class),
            CurrentStatus::Free => None,
        }
    }
}

/// Status plus the class shown in the "next" slot beside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub computed_at: NaiveDateTime,
    pub status: CurrentStatus,
    pub next_class: Option<ScheduleItem>,
}

#[derive(Debug, Clone)]
struct Slot {
    item: ScheduleItem,
    start: u32,
    end: u32,
}

/// The fixed weekly timetable with clock strings parsed up front.
#[derive(Debug, Clone)]
pub struct Timetable {
    slots: Vec<Slot>,
}

impl Default for Timetable {
    fn default() -> Self {
        Self::from_validated(default_schedule())
    }
}

impl Timetable {
    pub fn new(items: Vec<ScheduleItem>) -> Result<Self, ScheduleError> {
        let mut slots = Vec::with_capacity(items.len());
        for item in items {
            slots.push(Self::slot_for(item)?);
        }
        Ok(Self { slots })
    }

    fn from_validated(items: Vec<ScheduleItem>) -> Self {
        let slots = items
            .into_iter()
            .filter_map(|item| Self::slot_for(item).ok())
            .collect();
        Self { slots }
    }

    fn slot_for(item: ScheduleItem) -> Result<Slot, ScheduleError> {
        if item.day > 6 {
            return Err(ScheduleError::DayOutOfRange {
                id: item.id,
                day: item.day,
            });
        }
        let start = calendar::parse_clock(&item.start_time).map_err(|source| {
            ScheduleError::Clock {
                id: item.id.clone(),
                source,
            }
        })?;
        let end = calendar::parse_clock(&item.end_time).map_err(|source| ScheduleError::Clock {
            id: item.id.clone(),
            source,
        })?;
        if end <= start {
            return Err(ScheduleError::EmptyInterval { id: item.id });
        }
        Ok(Slot { item, start, end })
    }

    pub fn items(&self) -> impl Iterator<Item = &ScheduleItem> {
        self.slots.iter().map(|slot| &slot.item)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries for one day ordered by their "HH:MM" start string.
    fn day_slots(&self, day: u8) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self.slots.iter().filter(|s| s.item.day == day).collect();
        slots.sort_by(|a, b| a.item.start_time.cmp(&b.item.start_time));
        slots
    }

    pub fn classes_on(&self, day: u8) -> Vec<&ScheduleItem> {
        self.day_slots(day).into_iter().map(|s| &s.item).collect()
    }

    /// Distinct course codes in timetable order.
    pub fn course_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for slot in &self.slots {
            if !codes.contains(&slot.item.code.as_str()) {
                codes.push(&slot.item.code);
            }
        }
        codes
    }

    pub fn contains_course(&self, code: &str) -> bool {
        self.slots.iter().any(|s| s.item.code == code)
    }

    pub fn credits_for(&self, code: &str) -> Option<f64> {
        self.slots
            .iter()
            .find(|s| s.item.code == code)
            .map(|s| s.item.credits)
    }

    pub fn title_for(&self, code: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.item.code == code)
            .map(|s| s.item.title.as_str())
    }

    pub fn resolve_status(&self, now: NaiveDateTime) -> CurrentStatus {
        let (day, minute) = calendar::clock_position(now);
        self.status_at(day, minute)
    }

    pub fn status_at(&self, day: u8, minute: u32) -> CurrentStatus {
        if let Some(active) = self.active_slot(day, minute) {
            return CurrentStatus::Active {
                class: active.item.clone(),
            };
        }

        match self.upcoming_today(day, minute).first() {
            Some(next) => CurrentStatus::Upcoming {
                class: next.item.clone(),
                minutes_until: next.start - minute,
            },
            None => CurrentStatus::Free,
        }
    }

    fn active_slot(&self, day: u8, minute: u32) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|s| s.item.day == day && minute >= s.start && minute < s.end)
    }

    fn upcoming_today(&self, day: u8, minute: u32) -> Vec<&Slot> {
        self.day_slots(day)
            .into_iter()
            .filter(|s| s.start > minute)
            .collect()
    }

    /// Scan today and the following six days for the next class to start.
    pub fn find_next_class(&self, day: u8, minute: u32) -> Option<&ScheduleItem> {
        for offset in 0..LOOKAHEAD_DAYS {
            let check_day = ((u32::from(day) + u32::from(offset)) % u32::from(LOOKAHEAD_DAYS)) as u8;
            let slots = self.day_slots(check_day);
            if slots.is_empty() {
                continue;
            }
            if offset == 0 {
                if let Some(slot) = slots.into_iter().find(|s| s.start > minute) {
                    return Some(&slot.item);
                }
            } else {
                return slots.first().map(|s| &s.item);
            }
        }
        None
    }

    pub fn snapshot(&self, now: NaiveDateTime) -> DashboardSnapshot {
        let (day, minute) = calendar::clock_position(now);
        let status = self.status_at(day, minute);

        let next_class = match &status {
            CurrentStatus::Active { .. } => {
                let after_active = self.active_slot(day, minute).and_then(|active| {
                    self.day_slots(day)
                        .into_iter()
                        .find(|s| s.start >= active.end)
                        .map(|s| &s.item)
                });
                after_active.or_else(|| self.find_next_class(day, minute))
            }
            CurrentStatus::Upcoming { .. } => self
                .upcoming_today(day, minute)
                .get(1)
                .map(|s| &s.item)
                .or_else(|| self.find_next_class(day, minute)),
            CurrentStatus::Free => self.find_next_class(day, minute),
        };

        DashboardSnapshot {
            computed_at: now,
            status,
            next_class: next_class.cloned(),
        }
    }
}

/// The current term's weekly classes.
pub fn default_schedule() -> Vec<ScheduleItem> {
    use ColorTag::*;
    vec![
        ScheduleItem::new("1", 0, "11:00", "12:30", "MKT 2127", "Principles of Marketing", "006 (MB)", "SKG 2", Blue, 3.0),
        ScheduleItem::new("2", 0, "13:00", "14:30", "GED 1117", "History of Bangladesh", "217 (MB)", "GED 2 DMA", Green, 3.0),
        ScheduleItem::new("3", 0, "16:00", "17:30", "BIS 2122", "Computer Applications", "501 (MB)", "MZT 1", Purple, 3.0),
        ScheduleItem::new("4", 1, "11:00", "12:30", "MAT 1110", "Basic Math", "501 (MB)", "MSB 2", Orange, 3.0),
        ScheduleItem::new("5", 2, "11:00", "12:30", "MKT 2127", "Principles of Marketing", "006 (MB)", "SKG 2", Blue, 3.0),
        ScheduleItem::new("6", 2, "13:00", "14:30", "GED 1117", "History of Bangladesh", "217 (MB)", "GED 2 DMA", Green, 3.0),
        ScheduleItem::new("7", 2, "16:00", "17:30", "BIS 2122", "Computer Applications", "501 (MB)", "MZT 1", Purple, 3.0),
        ScheduleItem::new("8", 3, "11:00", "12:30", "MAT 1110", "Basic Math", "501 (MB)", "MSB 2", Orange, 3.0),
    ]
}
