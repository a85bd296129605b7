use std::{io::ErrorKind, path::PathBuf};

use tracing::{debug, warn};

use crate::error::{BunkError, BunkResult};

use super::Timetable;

pub const TIMETABLE_FILE_NAME: &str = "custom_timetable.json";

/// Keeps the user's replacement timetable. Without one the built-in grid is active.
pub struct TimetableStore {
    path: PathBuf,
}

impl TimetableStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self::new(dir.join(TIMETABLE_FILE_NAME))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Whether a replacement timetable is stored. An unreadable location counts as none.
    pub async fn has_override(&self) -> bool {
        match tokio::fs::try_exists(&self.path).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not check custom timetable {:?}: {e}", self.path);
                false
            }
        }
    }

    /// The override if it exists and parses, the built-in timetable otherwise.
    pub async fn load_active(&self) -> Timetable {
        match self.load_override().await {
            Ok(Some(timetable)) => timetable,
            Ok(None) => Timetable::builtin(),
            Err(e) => {
                warn!("Ignoring custom timetable {:?}: {e}", self.path);
                Timetable::builtin()
            }
        }
    }

    pub async fn load_override(&self) -> BunkResult<Option<Timetable>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BunkError::io(&self.path, e)),
        };
        debug!("Loaded custom timetable from {:?}", self.path);
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| BunkError::Parse {
                what: "custom timetable",
                source,
            })
    }

    pub async fn save_override(&self, timetable: &Timetable) -> BunkResult<()> {
        let content = serde_json::to_string_pretty(timetable).map_err(|source| BunkError::Parse {
            what: "custom timetable",
            source,
        })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| BunkError::io(&self.path, e))?;
        debug!("Saved custom timetable to {:?}", self.path);
        Ok(())
    }

    /// Deletes the override. Returns false if the built-in timetable was already active.
    pub async fn reset(&self) -> BunkResult<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BunkError::io(&self.path, e)),
        }
    }
}
