use std::path::{Path, PathBuf};

use crate::domain::model::id::BookId;
use crate::domain::repository::SavedIdCache;

pub const CACHE_FILE_NAME: &str = "saved_books.json";

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSONファイルによるSavedIdCache実装。
/// 中身はIDの配列1つ（`["id1", "id2"]`）。
#[derive(Debug, Clone)]
pub struct JsonSavedIdCache {
    path: PathBuf,
}

impl JsonSavedIdCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// ディレクトリ配下の標準ファイル名を使う。
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SavedIdCache for JsonSavedIdCache {
    type Error = JsonStoreError;

    fn load(&self) -> Result<Vec<BookId>, Self::Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let ids: Vec<BookId> = serde_json::from_str(&content)?;
        Ok(ids)
    }

    fn store(&self, ids: &[BookId]) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(ids)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
