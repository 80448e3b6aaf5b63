use crate::gaze::ProgressStore;
use chrono::{DateTime, Duration, Local, NaiveDate};
use directories::ProjectDirs;
use rusqlite::{params, Connection, Result};
use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One logged training session. Only the exercises that were actually
/// performed carry a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExerciseEntry {
    pub walking_minutes: Option<u32>,
    pub fist_raise_sets: Option<u32>,
    pub fist_raise_reps: Option<u32>,
    pub eye_gaze_count: Option<u32>,
}

impl ExerciseEntry {
    pub fn is_empty(&self) -> bool {
        self.walking_minutes.is_none()
            && self.fist_raise_sets.is_none()
            && self.fist_raise_reps.is_none()
            && self.eye_gaze_count.is_none()
    }

    pub fn eye_gaze_only(count: u32) -> Self {
        Self {
            eye_gaze_count: Some(count),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub timestamp: DateTime<Local>,
    pub entry: ExerciseEntry,
}

/// Database manager for exercise records
#[derive(Debug)]
pub struct RecordsDb {
    conn: Connection,
}

impl RecordsDb {
    /// Open (or create) the records database under the state directory
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("reha_records.db"));
        Self::open_at(&db_path)
    }

    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(RecordsDb { conn })
    }

    /// In-memory database for headless tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(RecordsDb { conn })
    }

    /// Database file path under $HOME/.local/state/reha
    fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join("reha");
            Some(state_dir.join("records.db"))
        } else {
            ProjectDirs::from("", "", "reha")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("records.db"))
        }
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS exercise_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                walking_minutes INTEGER,
                fist_raise_sets INTEGER,
                fist_raise_reps INTEGER,
                eye_gaze_count INTEGER
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_exercise_records_date ON exercise_records(date)",
            [],
        )?;

        Ok(())
    }

    /// Persist an entry stamped with the current local date and time
    pub fn save_entry(&self, entry: &ExerciseEntry) -> Result<i64> {
        self.save_entry_at(entry, Local::now())
    }

    /// Persist an entry with an explicit timestamp (backfill, tests)
    pub fn save_entry_at(&self, entry: &ExerciseEntry, when: DateTime<Local>) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO exercise_records
            (date, timestamp, walking_minutes, fist_raise_sets, fist_raise_reps, eye_gaze_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                when.date_naive().to_string(),
                when.to_rfc3339(),
                entry.walking_minutes,
                entry.fist_raise_sets,
                entry.fist_raise_reps,
                entry.eye_gaze_count,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All records, newest first
    pub fn all_records(&self) -> Result<Vec<ExerciseRecord>> {
        self.query_records(
            "SELECT id, date, timestamp, walking_minutes, fist_raise_sets, fist_raise_reps, eye_gaze_count
             FROM exercise_records ORDER BY timestamp DESC",
            [],
        )
    }

    pub fn records_by_date(&self, date: NaiveDate) -> Result<Vec<ExerciseRecord>> {
        self.query_records(
            "SELECT id, date, timestamp, walking_minutes, fist_raise_sets, fist_raise_reps, eye_gaze_count
             FROM exercise_records WHERE date = ?1 ORDER BY timestamp DESC",
            [date.to_string()],
        )
    }

    pub fn today_records(&self) -> Result<Vec<ExerciseRecord>> {
        self.records_by_date(Local::now().date_naive())
    }

    /// Records from the last `days` days, newest first
    pub fn recent_records(&self, days: u32) -> Result<Vec<ExerciseRecord>> {
        let cutoff = Local::now().date_naive() - Duration::days(days as i64);
        self.query_records(
            "SELECT id, date, timestamp, walking_minutes, fist_raise_sets, fist_raise_reps, eye_gaze_count
             FROM exercise_records WHERE date >= ?1 ORDER BY timestamp DESC",
            [cutoff.to_string()],
        )
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<ExerciseRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let iter = stmt.query_map(params, |row| {
            let date_str: String = row.get(1)?;
            let date = date_str.parse::<NaiveDate>().map_err(|_| {
                rusqlite::Error::InvalidColumnType(1, "date".to_string(), rusqlite::types::Type::Text)
            })?;
            let ts_str: String = row.get(2)?;
            let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(ExerciseRecord {
                id: row.get(0)?,
                date,
                timestamp,
                entry: ExerciseEntry {
                    walking_minutes: row.get(3)?,
                    fist_raise_sets: row.get(4)?,
                    fist_raise_reps: row.get(5)?,
                    eye_gaze_count: row.get(6)?,
                },
            })
        })?;

        let mut records = Vec::new();
        for record in iter {
            records.push(record?);
        }
        Ok(records)
    }

    /// Total eye-gaze repetitions logged today
    pub fn today_eye_gaze_total(&self) -> Result<u32> {
        let today = Local::now().date_naive().to_string();
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(SUM(eye_gaze_count), 0) FROM exercise_records WHERE date = ?1",
        )?;
        stmt.query_row([today], |row| row.get(0))
    }

    /// Number of distinct days with at least one record
    pub fn training_day_count(&self) -> Result<u32> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(DISTINCT date) FROM exercise_records")?;
        stmt.query_row([], |row| row.get(0))
    }

    pub fn record_count(&self) -> Result<u32> {
        let mut stmt = self.conn.prepare("SELECT COUNT(*) FROM exercise_records")?;
        stmt.query_row([], |row| row.get(0))
    }

    /// Clear all records (settings screen, tests)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM exercise_records", [])?;
        Ok(())
    }

    /// Write every record as CSV, newest first, with a header row
    pub fn export_csv<W: io::Write>(&self, writer: W) -> io::Result<()> {
        let records = self.all_records().map_err(io::Error::other)?;
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "date",
            "timestamp",
            "walking_minutes",
            "fist_raise_sets",
            "fist_raise_reps",
            "eye_gaze_count",
        ])
        .map_err(io::Error::other)?;
        for record in records {
            wtr.write_record([
                record.date.to_string(),
                record.timestamp.to_rfc3339(),
                num_field(record.entry.walking_minutes),
                num_field(record.entry.fist_raise_sets),
                num_field(record.entry.fist_raise_reps),
                num_field(record.entry.eye_gaze_count),
            ])
            .map_err(io::Error::other)?;
        }
        wtr.flush()
    }
}

fn num_field(v: Option<u32>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

impl ProgressStore for RecordsDb {
    fn record_completion(&mut self, count: u32) -> io::Result<()> {
        self.save_entry(&ExerciseEntry::eye_gaze_only(count))
            .map(|_| ())
            .map_err(io::Error::other)
    }

    fn today_completed_count(&self) -> u32 {
        self.today_eye_gaze_total().unwrap_or(0)
    }
}

/// Progress store for the gaze controller that degrades to a no-op when the
/// database could not be opened, so the exercise still runs without
/// persistence.
#[derive(Debug)]
pub struct GazeProgress {
    db: Option<RecordsDb>,
}

impl GazeProgress {
    pub fn new() -> Self {
        Self {
            db: RecordsDb::new().ok(),
        }
    }

    pub fn with_db(db: Option<RecordsDb>) -> Self {
        Self { db }
    }
}

impl Default for GazeProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore for GazeProgress {
    fn record_completion(&mut self, count: u32) -> io::Result<()> {
        match self.db.as_mut() {
            Some(db) => db.record_completion(count),
            None => Ok(()),
        }
    }

    fn today_completed_count(&self) -> u32 {
        self.db.as_ref().map_or(0, |db| db.today_completed_count())
    }
}

/// In-memory progress store for unit tests. Clones share state so a test
/// can keep a handle while the controller owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryProgress {
    inner: Rc<RefCell<MemoryProgressState>>,
}

#[derive(Debug, Default)]
struct MemoryProgressState {
    today: u32,
    completions: Vec<u32>,
}

impl MemoryProgress {
    pub fn with_today(today: u32) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().today = today;
        store
    }

    pub fn completions(&self) -> Vec<u32> {
        self.inner.borrow().completions.clone()
    }
}

impl ProgressStore for MemoryProgress {
    fn record_completion(&mut self, count: u32) -> io::Result<()> {
        self.inner.borrow_mut().completions.push(count);
        Ok(())
    }

    fn today_completed_count(&self) -> u32 {
        self.inner.borrow().today
    }
}
