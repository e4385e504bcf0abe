//! Flat-file JSON store. The whole dataset is a single document that is
//! re-read before every access and rewritten in full after every mutation.

use crate::{models::Database, FolioError, FolioResult};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub struct JsonStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonStore {
    pub async fn open(path: impl Into<PathBuf>) -> FolioResult<Self> {
        let path = path.into();
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        if exists {
            let db = load(&path).await?;
            info!(
                path = %path.display(),
                articles = db.articles.len(),
                users = db.users.len(),
                "Opened JSON store"
            );
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
            let db = Database::default();
            persist(&path, &db).await?;
            info!(path = %path.display(), "Created empty JSON store");
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh snapshot from disk.
    pub async fn read(&self) -> FolioResult<Database> {
        let _guard = self.lock.lock().await;
        load(&self.path).await
    }

    /// Re-reads the file, applies `f`, and writes the result back if `f`
    /// succeeded. On error the file is left as it was.
    pub async fn update<F, R>(&self, f: F) -> FolioResult<R>
    where
        F: FnOnce(&mut Database) -> FolioResult<R>,
    {
        let _guard = self.lock.lock().await;
        let mut working = load(&self.path).await?;
        let result = f(&mut working)?;
        persist(&self.path, &working).await?;
        Ok(result)
    }
}

async fn load(path: &Path) -> FolioResult<Database> {
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Database::default());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

async fn persist(path: &Path, db: &Database) -> FolioResult<()> {
    let json = serde_json::to_vec_pretty(db)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| FolioError::InvalidOperation(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| io_error(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_error(path, e));
    }
    debug!(path = %path.display(), bytes = json.len(), "Wrote JSON store");
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> FolioError {
    FolioError::StoreIo {
        path: path.to_path_buf(),
        source,
    }
}
