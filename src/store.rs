use std::path::PathBuf;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::bundle::{Preferences, StudyBundle};
use crate::config::Config;

/// Fixed record keys. The values are whole JSON blobs; every write replaces
/// the full record. The key names are carried over from the original app's
/// stored data.
pub const LIBRARY_KEY: &str = "studyGenie_courses";
pub const SETTINGS_KEY: &str = "studyGenie_settings";

pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open_default() -> Self {
        Store {
            path: Config::get_config_dir().join("studygenie.sqlite"),
        }
    }

    #[cfg(test)]
    pub fn at(path: PathBuf) -> Self {
        Store { path }
    }

    fn conn(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(conn)
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read both records once at startup. Absent or malformed data yields an
    /// empty library / default preferences; a corrupt record must never keep
    /// the application from starting.
    pub fn load(&self) -> (Vec<StudyBundle>, Preferences) {
        (self.load_library(), self.load_preferences())
    }

    fn load_library(&self) -> Vec<StudyBundle> {
        match self.read(LIBRARY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(library) => library,
                Err(e) => {
                    eprintln!("[Store] Ignoring corrupt library record: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                eprintln!("[Store] Could not read library record: {}", e);
                Vec::new()
            }
        }
    }

    fn load_preferences(&self) -> Preferences {
        match self.read(SETTINGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(prefs) => prefs,
                Err(e) => {
                    eprintln!("[Store] Ignoring corrupt settings record: {}", e);
                    Preferences::default()
                }
            },
            Ok(None) => Preferences::default(),
            Err(e) => {
                eprintln!("[Store] Could not read settings record: {}", e);
                Preferences::default()
            }
        }
    }

    /// Prepend the bundle and persist the whole library. Saving a bundle
    /// whose identifier is already present is a no-op. Returns the resulting
    /// library so the caller's in-memory copy stays in lockstep.
    pub fn save(&self, bundle: &StudyBundle) -> Result<Vec<StudyBundle>> {
        let mut library = self.load_library();
        if library.iter().any(|b| b.id == bundle.id) {
            return Ok(library);
        }
        library.insert(0, bundle.clone());
        self.write(LIBRARY_KEY, &serde_json::to_string(&library)?)?;
        Ok(library)
    }

    /// Remove the matching bundle and persist; no write happens when the
    /// identifier is absent.
    pub fn delete(&self, id: &str) -> Result<Vec<StudyBundle>> {
        let mut library = self.load_library();
        if !library.iter().any(|b| b.id == id) {
            return Ok(library);
        }
        library.retain(|b| b.id != id);
        self.write(LIBRARY_KEY, &serde_json::to_string(&library)?)?;
        Ok(library)
    }

    /// Overwrite the single preferences record.
    pub fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        self.write(SETTINGS_KEY, &serde_json::to_string(prefs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::AppTheme;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path().join("test.sqlite"));
        (dir, store)
    }

    #[test]
    fn load_from_empty_store_yields_defaults() {
        let (_dir, store) = temp_store();
        let (library, prefs) = store.load();
        assert!(library.is_empty());
        assert_eq!(prefs.theme, AppTheme::Dark);
        assert!(prefs.custom_instruction.is_empty());
    }

    #[test]
    fn corrupt_records_load_as_defaults() {
        let (_dir, store) = temp_store();
        store.write(LIBRARY_KEY, "{this is not json").unwrap();
        store.write(SETTINGS_KEY, "[]").unwrap();

        let (library, prefs) = store.load();
        assert!(library.is_empty());
        assert_eq!(prefs.theme, AppTheme::Dark);
    }

    #[test]
    fn save_then_load_recovers_bundle_first() {
        let (_dir, store) = temp_store();
        let mut older = StudyBundle::sample();
        older.id = "older".to_string();
        let mut newer = StudyBundle::sample();
        newer.id = "newer".to_string();

        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let (library, _) = store.load();
        assert_eq!(library.len(), 2);
        assert_eq!(library[0].id, "newer");
        assert_eq!(library[1].id, "older");
    }

    #[test]
    fn duplicate_save_is_a_no_op() {
        let (_dir, store) = temp_store();
        let bundle = StudyBundle::sample();

        store.save(&bundle).unwrap();
        let library = store.save(&bundle).unwrap();
        assert_eq!(library.len(), 1);

        let (library, _) = store.load();
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn delete_removes_and_persists() {
        let (_dir, store) = temp_store();
        let bundle = StudyBundle::sample();
        store.save(&bundle).unwrap();

        let library = store.delete(&bundle.id).unwrap();
        assert!(library.is_empty());

        let (library, _) = store.load();
        assert!(library.is_empty());
    }

    #[test]
    fn delete_of_absent_id_leaves_record_untouched() {
        let (_dir, store) = temp_store();
        // Hand-written formatting would not survive a rewrite, so an
        // unchanged raw value proves no write happened.
        let raw = "[ ]";
        store.write(LIBRARY_KEY, raw).unwrap();

        store.delete("no-such-id").unwrap();
        assert_eq!(store.read(LIBRARY_KEY).unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn preferences_overwrite_round_trips() {
        let (_dir, store) = temp_store();
        let prefs = Preferences {
            theme: AppTheme::Light,
            custom_instruction: "shorter answers".to_string(),
        };
        store.save_preferences(&prefs).unwrap();

        let (_, loaded) = store.load();
        assert_eq!(loaded.theme, AppTheme::Light);
        assert_eq!(loaded.custom_instruction, "shorter answers");
    }
}
