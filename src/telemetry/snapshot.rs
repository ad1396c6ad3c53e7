//! Latest metrics exposition, shared between the capture path and `/metrics`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use uuid::Uuid;

/// File name of the persisted snapshot inside the storage directory.
pub const SNAPSHOT_FILE: &str = "metrics_last.txt";

/// The most recent rendered exposition.
///
/// Replaced as a whole on every successful extraction, so readers see either
/// the previous text or the new one, never a mix. The same text is persisted
/// next to the captured artifacts so it survives restarts. Stores are
/// serialized, so the file always holds the text last swapped in.
#[derive(Debug)]
pub struct MetricsSnapshot {
    current: ArcSwapOption<String>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MetricsSnapshot {
    /// Create an empty snapshot persisted under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the persisted copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory exposition, if one was stored since startup.
    pub fn current(&self) -> Option<Arc<String>> {
        self.current.load_full()
    }

    /// Replace the snapshot and overwrite the persisted copy.
    ///
    /// The in-memory swap always happens; the returned error only concerns
    /// the file.
    pub async fn store(&self, exposition: String) -> io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let exposition = Arc::new(exposition);
        self.current.store(Some(Arc::clone(&exposition)));

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        // Write then rename so file readers never observe a partial snapshot.
        let tmp = self
            .path
            .with_file_name(format!(".{}.{}", SNAPSHOT_FILE, Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, exposition.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    /// The snapshot to serve: in memory first, then the persisted copy.
    pub async fn read(&self) -> io::Result<Arc<String>> {
        if let Some(current) = self.current() {
            return Ok(current);
        }
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(Arc::new(text))
    }
}
