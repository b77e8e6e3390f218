use crate::record_validation::RecordValidationError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Error as SerdeJsonError;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Mutex;
use tracing::warn;

/// Storage keys, one independently serialized document each.
pub mod keys {
    pub const ASSIGNMENTS: &str = "assignments";
    pub const GRADES: &str = "grades";
    pub const ATTENDANCE: &str = "attendance";
    pub const CHAT_HISTORY: &str = "chatHistory";
    pub const DARK_MODE: &str = "darkMode";
    pub const PERSONAL_NOTE: &str = "personalNote";

    pub const ALL: [&str; 6] = [
        ASSIGNMENTS,
        GRADES,
        ATTENDANCE,
        CHAT_HISTORY,
        DARK_MODE,
        PERSONAL_NOTE,
    ];
}

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
    InvalidKey(String),
    LockPoisoned,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            PersistenceError::InvalidKey(key) => write!(f, "invalid storage key '{key}'"),
            PersistenceError::LockPoisoned => write!(f, "storage lock poisoned"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<RecordValidationError> for PersistenceError {
    fn from(value: RecordValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// String values by key, the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PersistenceResult<()>;
    fn remove(&self, key: &str) -> PersistenceResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        let values = self.values.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let mut values = self.values.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        let mut values = self.values.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        values.remove(key);
        Ok(())
    }
}

pub fn load_json<S, T>(store: &S, key: &str) -> PersistenceResult<Option<T>>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Decode `key`, falling back to `T::default()` when the value is missing,
/// unreadable or rejected by `check`.
pub fn load_json_or_default<S, T, F>(store: &S, key: &str, check: F) -> T
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned + Default,
    F: FnOnce(&T) -> Result<(), RecordValidationError>,
{
    let loaded = load_json::<S, T>(store, key).and_then(|value| match value {
        Some(value) => {
            check(&value)?;
            Ok(value)
        }
        None => Ok(T::default()),
    });
    match loaded {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "discarding unreadable stored value");
            T::default()
        }
    }
}

pub fn save_json<S, T>(store: &S, key: &str, value: &T) -> PersistenceResult<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// Storage keys become file names and table keys; keep them to a safe alphabet.
pub fn validate_key(key: &str) -> PersistenceResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidKey(key.to_string()))
    }
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{JsonFileStore, load_grades_from_csv, save_grades_to_csv};
