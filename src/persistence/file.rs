use super::{KeyValueStore, PersistenceError, PersistenceResult, validate_key};
use crate::grades::{AssessmentType, Grade};
use crate::record_validation;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// One `<key>.json` file per storage key under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PersistenceResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GradeCsvRecord {
    id: String,
    course_code: String,
    title: String,
    score: f64,
    weight: String,
    assessment_type: String,
}

impl From<&Grade> for GradeCsvRecord {
    fn from(grade: &Grade) -> Self {
        Self {
            id: grade.id.clone(),
            course_code: grade.course_code.clone(),
            title: grade.title.clone(),
            score: grade.score,
            weight: grade.weight.to_string(),
            assessment_type: grade.kind.as_str().to_string(),
        }
    }
}

impl GradeCsvRecord {
    fn into_grade(self) -> PersistenceResult<Grade> {
        let kind = AssessmentType::from_str(&self.assessment_type).ok_or_else(|| {
            PersistenceError::InvalidData(format!(
                "invalid assessment_type '{}'",
                self.assessment_type
            ))
        })?;
        let mut grade = Grade::new(self.id, self.course_code, self.title, self.score, kind);
        // Blank weight means "use the weight for this assessment type".
        if !self.weight.trim().is_empty() {
            grade.weight = self.weight.trim().parse::<f64>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid weight '{}': {e}", self.weight))
            })?;
        }
        Ok(grade)
    }
}

pub fn save_grades_to_csv<P: AsRef<Path>>(grades: &[Grade], path: P) -> PersistenceResult<()> {
    record_validation::validate_grade_collection(grades)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for grade in grades {
        writer.serialize(GradeCsvRecord::from(grade))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_grades_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Grade>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut grades = Vec::new();
    for record in reader.deserialize::<GradeCsvRecord>() {
        let record = record?;
        grades.push(record.into_grade()?);
    }

    if grades.is_empty() {
        return Err(PersistenceError::InvalidData(
            "CSV file contained no grades".into(),
        ));
    }

    record_validation::validate_grade_collection(&grades)?;
    Ok(grades)
}
