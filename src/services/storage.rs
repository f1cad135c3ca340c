use crate::models::FileMetadata;
use crate::utils::validation::format_size;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::env;
use std::io;
use std::path::Path;
use tokio::io::AsyncWrite;

pub type WriteTarget = Box<dyn AsyncWrite + Unpin + Send>;

/// Where uploaded bytes end up.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Opens (truncating) the write target for `file_name` inside `folder`.
    async fn open(&self, folder: &Path, file_name: &str) -> io::Result<WriteTarget>;
}

/// Lists what has been stored so far.
#[async_trait]
pub trait FileInventory: Send + Sync {
    async fn file_status(&self, folder: &Path) -> Result<Vec<FileMetadata>>;
}

/// Plain files in a local directory.
#[derive(Debug, Default, Clone)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PersistenceSink for LocalFileStore {
    async fn open(&self, folder: &Path, file_name: &str) -> io::Result<WriteTarget> {
        let path = folder.join(file_name);
        tracing::debug!("Opening {} for writing", path.display());
        let file = tokio::fs::File::create(&path).await?;
        Ok(Box::new(file))
    }
}

#[async_trait]
impl FileInventory for LocalFileStore {
    async fn file_status(&self, folder: &Path) -> Result<Vec<FileMetadata>> {
        let owner = env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        let mut entries = tokio::fs::read_dir(folder)
            .await
            .with_context(|| format!("Failed to read {}", folder.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let stat = tokio::fs::metadata(entry.path())
                .await
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
            if !stat.is_file() {
                continue;
            }

            let timestamp = stat.created().or_else(|_| stat.modified())?;
            files.push(FileMetadata {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size_human_readable: format_size(stat.len()),
                last_modified: DateTime::<Utc>::from(timestamp),
                owner: owner.clone(),
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}
