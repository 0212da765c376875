use crate::checkpoint::session::{CheckpointSession, CHECKPOINT_VERSION};
use crate::config::CheckpointConfig;
use crate::CheckpointError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File-backed owner of the active [`CheckpointSession`]
///
/// Holds the only mutable handle to the session, so marks and saves are
/// serialized through `&mut self`.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    autosave_interval: u32,
    session: Option<CheckpointSession>,
    marks_since_save: u32,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>, autosave_interval: u32) -> Self {
        Self {
            path: path.into(),
            autosave_interval: autosave_interval.max(1),
            session: None,
            marks_since_save: 0,
        }
    }

    pub fn from_config(config: &CheckpointConfig) -> Self {
        Self::new(&config.path, config.autosave_interval)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> Option<&CheckpointSession> {
        self.session.as_ref()
    }

    /// True if a snapshot file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Starts a new session and saves it immediately
    pub fn create_session<I, S>(
        &mut self,
        target_ids: I,
        metadata: BTreeMap<String, String>,
    ) -> Result<&CheckpointSession, CheckpointError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let session = CheckpointSession::new(target_ids, metadata);
        tracing::info!(
            "Created checkpoint session {} with {} targets",
            session.session_id(),
            session.total_count()
        );
        self.session = Some(session);
        self.save()?;
        self.session.as_ref().ok_or(CheckpointError::NoSession)
    }

    /// Loads the last saved snapshot, or None if there is none
    pub fn load(&mut self) -> Result<Option<&CheckpointSession>, CheckpointError> {
        self.session = read_snapshot(&self.path)?;
        self.marks_since_save = 0;

        if let Some(session) = &self.session {
            tracing::info!(
                "Loaded checkpoint session {}: {} pending, {} processed, {} failed",
                session.session_id(),
                session.pending().len(),
                session.success_count(),
                session.failure_count()
            );
        }
        Ok(self.session.as_ref())
    }

    pub fn mark_success(&mut self, id: &str) -> Result<(), CheckpointError> {
        self.session_mut()?.mark_success(id)?;
        self.after_mark()
    }

    pub fn mark_failure(&mut self, id: &str) -> Result<(), CheckpointError> {
        self.session_mut()?.mark_failure(id)?;
        self.after_mark()
    }

    pub fn is_complete(&self) -> bool {
        self.session.as_ref().is_some_and(CheckpointSession::is_complete)
    }

    /// Writes the session atomically: temp file in the same directory, then rename
    pub fn save(&mut self) -> Result<(), CheckpointError> {
        let session = self.session.as_ref().ok_or(CheckpointError::NoSession)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, session)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        self.marks_since_save = 0;
        tracing::debug!("Checkpoint saved to {}", self.path.display());
        Ok(())
    }

    /// Deletes the snapshot if the session is complete
    ///
    /// Returns true if the file was removed. An incomplete session is saved
    /// instead so it can be resumed.
    pub fn finish(&mut self) -> Result<bool, CheckpointError> {
        if self.session.is_none() {
            return Ok(false);
        }

        if self.is_complete() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            tracing::info!("Run complete, checkpoint {} removed", self.path.display());
            self.session = None;
            Ok(true)
        } else {
            self.save()?;
            Ok(false)
        }
    }

    /// Drops the in-memory session and deletes any snapshot on disk
    pub fn discard(&mut self) -> Result<(), CheckpointError> {
        self.session = None;
        self.marks_since_save = 0;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut CheckpointSession, CheckpointError> {
        self.session.as_mut().ok_or(CheckpointError::NoSession)
    }

    fn after_mark(&mut self) -> Result<(), CheckpointError> {
        self.marks_since_save += 1;
        if self.marks_since_save >= self.autosave_interval {
            self.save()?;
        }
        Ok(())
    }
}

/// Reads and verifies a snapshot file
///
/// A missing file is `Ok(None)`. Unreadable JSON, a snapshot that breaks the
/// session invariants, or an unknown version are errors.
pub fn read_snapshot(path: &Path) -> Result<Option<CheckpointSession>, CheckpointError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let corrupt = |message: String| CheckpointError::Corrupt {
        path: path.display().to_string(),
        message,
    };

    let probe: VersionProbe =
        serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
    if probe.version != CHECKPOINT_VERSION {
        return Err(CheckpointError::UnsupportedVersion(probe.version));
    }

    let session: CheckpointSession =
        serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
    session.verify().map_err(corrupt)?;

    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, interval: u32) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("checkpoint.json"), interval)
    }

    #[test]
    fn test_load_without_file_is_none() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        let metadata = BTreeMap::from([("config_hash".to_string(), "abc".to_string())]);
        store.create_session(["a", "b", "c"], metadata).unwrap();
        store.mark_success("a").unwrap();
        store.mark_failure("b").unwrap();
        store.save().unwrap();

        let mut reloaded = store_in(&dir, 10);
        let session = reloaded.load().unwrap().unwrap();
        assert_eq!(session.pending(), &["c"]);
        assert!(session.processed().contains("a"));
        assert!(session.failed().contains("b"));
        assert_eq!(session.metadata().get("config_hash").map(String::as_str), Some("abc"));
        assert_eq!(session, store.session().unwrap());
    }

    #[test]
    fn test_autosave_every_k_marks() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 2);
        store.create_session(["a", "b", "c"], BTreeMap::new()).unwrap();

        store.mark_success("a").unwrap();
        let on_disk = read_snapshot(store.path()).unwrap().unwrap();
        assert_eq!(on_disk.success_count(), 0);

        store.mark_success("b").unwrap();
        let on_disk = read_snapshot(store.path()).unwrap().unwrap();
        assert_eq!(on_disk.success_count(), 2);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        fs::write(store.path(), "{ this is not json").unwrap();
        assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
    }

    #[test]
    fn test_broken_invariant_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        store.create_session(["a", "b"], BTreeMap::new()).unwrap();

        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        json["totalCount"] = serde_json::json!(7);
        fs::write(store.path(), json.to_string()).unwrap();

        assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        fs::write(store.path(), r#"{"version": 99}"#).unwrap();
        assert!(matches!(
            store.load(),
            Err(CheckpointError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_finish_deletes_only_when_complete() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        store.create_session(["a", "b"], BTreeMap::new()).unwrap();
        store.mark_success("a").unwrap();

        assert!(!store.finish().unwrap());
        assert!(store.exists());
        assert_eq!(read_snapshot(store.path()).unwrap().unwrap().success_count(), 1);

        store.mark_failure("b").unwrap();
        assert!(store.finish().unwrap());
        assert!(!store.exists());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_mark_without_session() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, 10);
        assert!(matches!(
            store.mark_success("a"),
            Err(CheckpointError::NoSession)
        ));
    }
}
