use chrono::NaiveTime;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Daily training goals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goals {
    pub walking_minutes: u32,
    pub fist_raise_sets: u32,
    pub fist_raise_reps: u32,
    pub eye_gaze_count: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            walking_minutes: 30,
            fist_raise_sets: 3,
            fist_raise_reps: 10,
            eye_gaze_count: 20,
        }
    }
}

/// Daily reminder, shown as an in-app banner once its time has passed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub enabled: bool,
    /// HH:MM, local time
    pub time: String,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enabled: true,
            time: "09:00".to_string(),
        }
    }
}

impl Reminder {
    /// Whether the reminder should show at `now`. A malformed time string
    /// never fires.
    pub fn is_due(&self, now: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        match NaiveTime::parse_from_str(&self.time, "%H:%M") {
            Ok(at) => now >= at,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub goals: Goals,
    #[serde(default)]
    pub reminder: Reminder,
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "reha") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("reha_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
