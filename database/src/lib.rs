//! Durable state: the cashtag history file and the append-only result tables.

pub mod history_store;
pub mod table;


use scout_core::StorageError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub use history_store::HistoryStore;
pub use table::{ResultSink, TableRow};

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

async fn write_and_rename(path: &Path, tmp: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, path).await
}

/// Replaces `path` with `contents` through a synced temporary sibling and a
/// rename. On failure the previous file is left untouched.
pub(crate) async fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let tmp = sibling_path(path, ".tmp");
    if let Err(e) = write_and_rename(path, &tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StorageError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        });
    }
    Ok(())
}
