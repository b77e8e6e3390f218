use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Projection stops counting hypothetical absences here.
pub const MAX_SAFE_SKIPS: u32 = 10;

/// Required share of attended sessions, as a fraction `NUM / DEN`.
const THRESHOLD_NUM: u64 = 4;
const THRESHOLD_DEN: u64 = 5;

const MANUAL_MARKER: &str = "MANUAL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetail {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub percentage: u32,
}

impl AttendanceDetail {
    pub fn from_counts(present: u32, absent: u32) -> Self {
        let total = present + absent;
        Self {
            total,
            present,
            absent,
            percentage: rounded_percentage(present, total),
        }
    }
}

/// `round(present / total * 100)` with halves rounded up, 0 for an empty log.
pub fn rounded_percentage(present: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let present = u64::from(present);
    let total = u64::from(total);
    ((present * 200 + total) / (total * 2)) as u32
}

/// Number of further absences that keep `present / total` at or above 80%,
/// assuming every later session is attended. Capped at [`MAX_SAFE_SKIPS`].
pub fn safe_skips(present: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let present = u64::from(present);
    let mut skips: u32 = 0;
    while present * THRESHOLD_DEN >= THRESHOLD_NUM * (u64::from(total) + u64::from(skips) + 1) {
        skips += 1;
        if skips >= MAX_SAFE_SKIPS {
            break;
        }
    }
    skips
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum MarkOutcome {
    Recorded { key: String, present: bool },
    Cleared { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ManualAdjustment {
    Added { key: String },
    Removed { key: String },
    NothingToRemove,
}

pub fn date_key(code: &str, date: NaiveDate) -> String {
    format!("{code}-{}", date.format("%Y-%m-%d"))
}

pub fn manual_key(code: &str, timestamp_millis: i64) -> String {
    format!("{code}-{MANUAL_MARKER}-{timestamp_millis}")
}

/// Present/absent marks keyed by `CODE-YYYY-MM-DD` or `CODE-MANUAL-<millis>`.
/// A missing key means the session was never recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceLog {
    records: BTreeMap<String, bool>,
}

impl AttendanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: BTreeMap<String, bool>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &BTreeMap<String, bool> {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.records.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, present: bool) -> Option<bool> {
        self.records.insert(key.into(), present)
    }

    pub fn remove(&mut self, key: &str) -> Option<bool> {
        self.records.remove(key)
    }

    fn course_records<'a>(&'a self, code: &'a str) -> impl Iterator<Item = (&'a String, &'a bool)> + 'a {
        self.records.iter().filter(move |(key, _)| key.starts_with(code))
    }

    pub fn course_detail(&self, code: &str) -> AttendanceDetail {
        let (present, absent) = self
            .course_records(code)
            .fold((0u32, 0u32), |(p, a), (_, &value)| {
                if value { (p + 1, a) } else { (p, a + 1) }
            });
        AttendanceDetail::from_counts(present, absent)
    }

    /// Counts across every course.
    pub fn totals(&self) -> AttendanceDetail {
        let present = self.records.values().filter(|v| **v).count() as u32;
        let absent = self.records.len() as u32 - present;
        AttendanceDetail::from_counts(present, absent)
    }

    pub fn safe_skip_margin(&self, code: &str) -> u32 {
        let detail = self.course_detail(code);
        safe_skips(detail.present, detail.total)
    }

    /// Record a session for `date`. Marking the same value twice clears it.
    pub fn mark(&mut self, code: &str, present: bool, date: NaiveDate) -> MarkOutcome {
        let key = date_key(code, date);
        if self.records.get(&key) == Some(&present) {
            self.records.remove(&key);
            MarkOutcome::Cleared { key }
        } else {
            self.records.insert(key.clone(), present);
            MarkOutcome::Recorded { key, present }
        }
    }

    /// Add or take back a synthetic record. Removal picks the most recent
    /// manual entry carrying the same present/absent value.
    pub fn adjust_manual(
        &mut self,
        code: &str,
        increment: bool,
        is_present: bool,
        timestamp_millis: i64,
    ) -> ManualAdjustment {
        if increment {
            let mut stamp = timestamp_millis;
            while self.records.contains_key(&manual_key(code, stamp)) {
                stamp += 1;
            }
            let key = manual_key(code, stamp);
            self.records.insert(key.clone(), is_present);
            return ManualAdjustment::Added { key };
        }

        let prefix = format!("{code}-{MANUAL_MARKER}");
        let newest = self
            .records
            .iter()
            .filter(|(key, value)| key.starts_with(&prefix) && **value == is_present)
            .map(|(key, _)| key.clone())
            .max();

        match newest {
            Some(key) => {
                self.records.remove(&key);
                ManualAdjustment::Removed { key }
            }
            None => ManualAdjustment::NothingToRemove,
        }
    }
}
