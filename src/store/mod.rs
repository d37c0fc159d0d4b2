//! Versioned device-local store.
//!
//! Everything the client keeps between runs lives in one JSON document,
//! `store.json`, under the home directory:
//!
//! ```json
//! {
//!   "schema_version": 2,
//!   "preferences": {"theme": "dark", "sidebar_open": true, "language": "pt-BR"},
//!   "funnel_stages": [ ... ],
//!   "tasks": [ ... ],
//!   "tours": {"funnel": true},
//!   "deleted_leads": {"ana@example.com": ["42", "43"]}
//! }
//! ```
//!
//! Older layouts are upgraded on load by [`migrate`]. Writes go to a
//! temporary file that is renamed over `store.json` while an exclusive lock
//! on `store.lock` is held, so concurrent CLI invocations never observe a
//! torn file.

pub mod migrate;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fs2::FileExt;
use leadsflow_common::{FunnelStage, Task, default_stages};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::StoreError;

pub const SCHEMA_VERSION: u32 = 2;
pub const STORE_FILE: &str = "store.json";
pub const LOCK_FILE: &str = "store.lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" | "auto" => Ok(Self::System),
            _ => Err(format!("Invalid theme: {} (expected light, dark or system)", s)),
        }
    }
}

fn default_sidebar_open() -> bool {
    true
}

fn default_language() -> String {
    "pt-BR".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_sidebar_open")]
    pub sidebar_open: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            sidebar_open: default_sidebar_open(),
            language: default_language(),
        }
    }
}

impl Preferences {
    /// Set a preference by its user-facing key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "theme" => self.theme = value.parse()?,
            "sidebar_open" | "sidebar" => {
                self.sidebar_open = value
                    .parse()
                    .map_err(|_| format!("Invalid boolean for {}: {}", key, value))?
            }
            "language" | "lang" => {
                let value = value.trim();
                if value.is_empty() {
                    return Err("Language must not be empty".to_string());
                }
                self.language = value.to_string();
            }
            _ => {
                return Err(format!(
                    "Unknown preference: {} (expected theme, sidebar_open or language)",
                    key
                ));
            }
        }
        Ok(())
    }
}

/// The whole persisted document at the current schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    pub schema_version: u32,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub funnel_stages: Vec<FunnelStage>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub tours: BTreeMap<String, bool>,
    /// Lead ids deleted from this device, per account user. Hidden from
    /// refetched lists until the backend stops returning them.
    #[serde(default)]
    pub deleted_leads: BTreeMap<String, Vec<String>>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            preferences: Preferences::default(),
            funnel_stages: default_stages(),
            tasks: Vec::new(),
            tours: BTreeMap::new(),
            deleted_leads: BTreeMap::new(),
        }
    }
}

impl StoreData {
    /// Append ids to the user's tracking list, skipping ones already there.
    pub fn record_deleted(&mut self, user: &str, ids: &[String]) {
        let tracked = self.deleted_leads.entry(user.to_string()).or_default();
        for id in ids {
            if !tracked.contains(id) {
                tracked.push(id.clone());
            }
        }
    }

    pub fn deleted_for(&self, user: &str) -> &[String] {
        self.deleted_leads
            .get(user)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Keep only the tracked ids in `keep`. Returns how many were dropped.
    pub fn prune_deleted(&mut self, user: &str, keep: &HashSet<String>) -> usize {
        let Some(tracked) = self.deleted_leads.get_mut(user) else {
            return 0;
        };
        let before = tracked.len();
        tracked.retain(|id| keep.contains(id));
        let pruned = before - tracked.len();
        if tracked.is_empty() {
            self.deleted_leads.remove(user);
        }
        pruned
    }

    pub fn complete_tour(&mut self, name: &str) {
        self.tours.insert(name.to_string(), true);
    }

    pub fn tour_completed(&self, name: &str) -> bool {
        self.tours.get(name).copied().unwrap_or(false)
    }
}

/// Handle on the persisted store. `in_memory()` stores never touch disk.
#[derive(Debug)]
pub struct Store {
    dir: Option<PathBuf>,
    data: StoreData,
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl Store {
    pub fn in_memory(data: StoreData) -> Self {
        Self { dir: None, data }
    }

    /// Load `store.json` from `dir`, migrating older layouts. A missing file
    /// yields defaults; the file is created on the first save.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let data = if dir.join(STORE_FILE).exists() {
            let lock = Self::lock_file(dir)?;
            FileExt::lock_shared(&lock).map_err(|e| io_error(&dir.join(LOCK_FILE), e))?;
            let data = Self::read(dir);
            let _ = FileExt::unlock(&lock);
            data?
        } else {
            debug!(dir = %dir.display(), "No store file yet; using defaults");
            StoreData::default()
        };

        Ok(Self {
            dir: Some(dir.to_path_buf()),
            data,
        })
    }

    /// Read and migrate the document on disk. The caller holds the lock.
    fn read(dir: &Path) -> Result<StoreData, StoreError> {
        let path = dir.join(STORE_FILE);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreData::default()),
            Err(e) => return Err(io_error(&path, e)),
        };
        let mut data = if raw.iter().all(|b| b.is_ascii_whitespace()) {
            StoreData::default()
        } else {
            let value: serde_json::Value =
                serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            migrate::migrate(value)?
        };
        if data.funnel_stages.is_empty() {
            data.funnel_stages = default_stages();
        }
        Ok(data)
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(STORE_FILE))
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Mutate the document and write it out immediately.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut StoreData) -> R) -> Result<R, StoreError> {
        self.try_update(|d| Ok::<_, StoreError>(f(d)))
    }

    /// Apply `f` to the latest document on disk and write the result.
    ///
    /// The read, the mutation and the write all happen under the exclusive
    /// lock, so writes from other handles are never overwritten. The in-memory
    /// copy changes only when `f` succeeds and the write lands.
    pub fn try_update<R, E>(
        &mut self,
        f: impl FnOnce(&mut StoreData) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let Some(dir) = self.dir.clone() else {
            let mut draft = self.data.clone();
            let result = f(&mut draft)?;
            self.data = draft;
            return Ok(result);
        };
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

        let lock = Self::lock_file(&dir)?;
        lock.lock_exclusive()
            .map_err(|e| io_error(&dir.join(LOCK_FILE), e))?;
        let outcome = Self::read(&dir).map_err(E::from).and_then(|mut draft| {
            let result = f(&mut draft)?;
            Self::write(&dir, &draft)?;
            Ok((result, draft))
        });
        let _ = FileExt::unlock(&lock);

        let (result, draft) = outcome?;
        self.data = draft;
        Ok(result)
    }

    fn lock_file(dir: &Path) -> Result<File, StoreError> {
        let path = dir.join(LOCK_FILE);
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))
    }

    /// Write `data` to a temporary file and rename it over `store.json`.
    /// The caller holds the exclusive lock.
    fn write(dir: &Path, data: &StoreData) -> Result<(), StoreError> {
        let path = dir.join(STORE_FILE);
        let tmp = dir.join(format!("{}.tmp", STORE_FILE));
        let json = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;

        let mut file = File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
        file.write_all(&json).map_err(|e| io_error(&tmp, e))?;
        file.sync_all().map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))?;

        debug!(path = %path.display(), "Store saved");
        Ok(())
    }

    /// Write a fresh default store unless one exists. Returns true when created.
    pub fn init(dir: &Path) -> Result<bool, StoreError> {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let lock = Self::lock_file(dir)?;
        lock.lock_exclusive()
            .map_err(|e| io_error(&dir.join(LOCK_FILE), e))?;
        let created = if dir.join(STORE_FILE).exists() {
            Ok(false)
        } else {
            Self::write(dir, &StoreData::default()).map(|()| true)
        };
        let _ = FileExt::unlock(&lock);

        if created? {
            info!(dir = %dir.display(), "Initialized store");
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WorkspaceError;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.data(), &StoreData::default());
        assert!(!dir.path().join(STORE_FILE).exists());
    }

    #[test]
    fn test_update_persists_immediately() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();
        store
            .update(|d| d.preferences.theme = Theme::Dark)
            .unwrap();

        let reopened = Store::open(dir.path()).unwrap();
        assert_eq!(reopened.data().preferences.theme, Theme::Dark);
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[test]
    fn test_empty_stage_list_reloads_as_defaults() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();
        store.update(|d| d.funnel_stages.clear()).unwrap();
        let reopened = Store::open(dir.path()).unwrap();
        assert_eq!(reopened.data().funnel_stages, default_stages());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE), "{not json").unwrap();
        let err = Store::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE), r#"{"schema_version": 9}"#).unwrap();
        match Store::open(dir.path()).unwrap_err() {
            StoreError::UnsupportedVersion { found, supported } => {
                assert_eq!(found, 9);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_deleted_tracking_per_user() {
        let mut data = StoreData::default();
        data.record_deleted("ana", &["1".into(), "2".into()]);
        data.record_deleted("ana", &["2".into(), "3".into()]);
        data.record_deleted("bia", &["9".into()]);
        assert_eq!(data.deleted_for("ana"), ["1", "2", "3"]);
        assert!(data.deleted_for("nobody").is_empty());

        let keep: HashSet<String> = ["3".to_string()].into();
        assert_eq!(data.prune_deleted("ana", &keep), 2);
        assert_eq!(data.deleted_for("ana"), ["3"]);
        assert_eq!(data.prune_deleted("bia", &HashSet::new()), 1);
        assert!(!data.deleted_leads.contains_key("bia"));
    }

    #[test]
    fn test_tours() {
        let mut data = StoreData::default();
        assert!(!data.tour_completed("funnel"));
        data.complete_tour("funnel");
        assert!(data.tour_completed("funnel"));
    }

    #[test]
    fn test_preferences_set() {
        let mut prefs = Preferences::default();
        prefs.set("theme", "Dark").unwrap();
        prefs.set("sidebar_open", "false").unwrap();
        prefs.set("language", "en-US").unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(!prefs.sidebar_open);
        assert_eq!(prefs.language, "en-US");
        assert!(prefs.set("font", "big").is_err());
        assert!(prefs.set("sidebar_open", "maybe").is_err());
    }

    #[test]
    fn test_init_only_once() {
        let dir = tempdir().unwrap();
        assert!(Store::init(dir.path()).unwrap());
        assert!(!Store::init(dir.path()).unwrap());
    }

    #[test]
    fn test_updates_from_two_handles_are_both_kept() {
        let dir = tempdir().unwrap();
        let mut first = Store::open(dir.path()).unwrap();
        let mut second = Store::open(dir.path()).unwrap();

        first.update(|d| d.complete_tour("from_first")).unwrap();
        second.update(|d| d.complete_tour("from_second")).unwrap();

        let reopened = Store::open(dir.path()).unwrap();
        assert!(reopened.data().tour_completed("from_first"));
        assert!(reopened.data().tour_completed("from_second"));
        assert!(second.data().tour_completed("from_first"));
    }

    #[test]
    fn test_failed_write_leaves_data_unchanged() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();
        store.update(|d| d.complete_tour("funnel")).unwrap();
        fs::create_dir(dir.path().join("store.json.tmp")).unwrap();

        let err = store.update(|d| d.preferences.theme = Theme::Dark).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.data().preferences.theme, Theme::System);
        assert!(store.data().tour_completed("funnel"));
    }

    #[test]
    fn test_try_update_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();
        let result: Result<(), WorkspaceError> = store.try_update(|d| {
            d.complete_tour("half");
            Err(WorkspaceError::EmptyPatch)
        });
        assert!(matches!(result, Err(WorkspaceError::EmptyPatch)));
        assert!(!store.data().tour_completed("half"));
        assert!(!dir.path().join(STORE_FILE).exists());
    }

    #[test]
    fn test_in_memory_store_never_writes() {
        let mut store = Store::in_memory(StoreData::default());
        store.update(|d| d.complete_tour("x")).unwrap();
        assert!(store.path().is_none());
        assert!(store.data().tour_completed("x"));
    }
}
