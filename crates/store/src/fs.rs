//! Filesystem-backed node store.
//!
//! Layout: `<base_dir>/<group_id>/<segment_name>`, one directory per group and
//! one file per segment.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::key::ObjectKey;
use crate::traits::NodeStore;

/// Node store rooted at a local directory.
#[derive(Clone, Debug)]
pub struct FsStore {
    base_dir: PathBuf,
}

impl FsStore {
    /// Opens (creating if needed) a store rooted at `base_dir`.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::io(&base_dir, e))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_of(&self, key: &ObjectKey) -> PathBuf {
        self.base_dir.join(key.group_id()).join(key.segment_name())
    }
}

#[async_trait]
impl NodeStore for FsStore {
    async fn read(&self, key: &ObjectKey) -> Result<Bytes> {
        let path = self.path_of(key);
        debug!(path = %path.display(), "read");
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn write(&self, key: &ObjectKey, data: Bytes) -> Result<()> {
        let group_dir = self.base_dir.join(key.group_id());
        fs::create_dir_all(&group_dir)
            .await
            .map_err(|e| StoreError::io(&group_dir, e))?;

        let path = group_dir.join(key.segment_name());
        debug!(path = %path.display(), bytes = data.len(), "write");
        fs::write(&path, &data)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn remove(&self, key: &ObjectKey) -> Result<()> {
        let path = self.path_of(key);
        debug!(path = %path.display(), "remove");
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<ObjectKey>> {
        let mut keys = Vec::new();
        let mut groups = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StoreError::io(&self.base_dir, e))?;

        while let Some(group) = groups
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.base_dir, e))?
        {
            let group_path = group.path();
            match group.file_type().await {
                Ok(kind) if kind.is_dir() => {}
                _ => continue,
            }
            let Some(group_id) = group.file_name().to_str().map(str::to_owned) else {
                warn!(path = %group_path.display(), "skipping non utf-8 group directory");
                continue;
            };

            let mut segments = match fs::read_dir(&group_path).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %group_path.display(), error = %e, "skipping unreadable group");
                    continue;
                }
            };
            loop {
                let segment = match segments.next_entry().await {
                    Ok(Some(segment)) => segment,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(path = %group_path.display(), error = %e, "group listing cut short");
                        break;
                    }
                };
                match segment.file_type().await {
                    Ok(kind) if kind.is_file() => {}
                    _ => continue,
                }
                let name = segment.file_name();
                let parsed = name
                    .to_str()
                    .ok_or_else(|| StoreError::InvalidKey(format!("{name:?} is not utf-8")))
                    .and_then(|name| ObjectKey::new(group_id.as_str(), name));
                match parsed {
                    Ok(key) => keys.push(key),
                    Err(e) => warn!(path = %segment.path().display(), error = %e, "skipping entry"),
                }
            }
        }

        Ok(keys)
    }
}
