use std::{future::Future, io::ErrorKind, ops::Deref, path::PathBuf};

use tracing::debug;

use crate::error::{BunkError, BunkResult};

use super::entities::AppState;

pub const DOCUMENT_FILE_NAME: &str = "data.json";

/// Interface for abstracting storage of the attendance document.
pub trait DocumentStorage {
    /// Reads the stored document. [None] means nothing was saved yet.
    fn load(&self) -> impl Future<Output = BunkResult<Option<AppState>>>;

    /// Replaces the stored document with `state`.
    fn save(&self, state: &AppState) -> impl Future<Output = BunkResult<()>>;
}

impl<T: Deref> DocumentStorage for T
where
    T::Target: DocumentStorage,
{
    fn load(&self) -> impl Future<Output = BunkResult<Option<AppState>>> {
        self.deref().load()
    }

    fn save(&self, state: &AppState) -> impl Future<Output = BunkResult<()>> {
        self.deref().save(state)
    }
}

/// The main realization of [DocumentStorage]. The file is overwritten in place: bunkmeter is the
/// only process touching it.
pub struct JsonDocumentStorage {
    path: PathBuf,
}

impl JsonDocumentStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self::new(dir.join(DOCUMENT_FILE_NAME))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl DocumentStorage for JsonDocumentStorage {
    async fn load(&self) -> BunkResult<Option<AppState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No document at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(BunkError::io(&self.path, e)),
        };
        let state = serde_json::from_str::<AppState>(&content).map_err(|source| {
            BunkError::Parse {
                what: "attendance document",
                source,
            }
        })?;
        debug!(
            "Loaded document from {:?} with {} subjects",
            self.path,
            state.subjects.len()
        );
        Ok(Some(state))
    }

    async fn save(&self, state: &AppState) -> BunkResult<()> {
        let content =
            serde_json::to_string_pretty(state).map_err(|source| BunkError::Parse {
                what: "attendance document",
                source,
            })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| BunkError::io(&self.path, e))?;
        debug!("Saved document to {:?}", self.path);
        Ok(())
    }
}
