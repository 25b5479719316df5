//! Filesystem-backed artifact store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::{CasStore, ContentDigest, StorageResult};

/// Content-addressed store with git-style 2-char sharding.
///
/// Layout: `<root>/objects/<first 2 hex chars>/<remaining hex chars>`
#[derive(Debug, Clone)]
pub struct FsCasStore {
    objects_dir: PathBuf,
}

impl FsCasStore {
    /// Open a store rooted at `root`, creating `root/objects/` if needed.
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        tokio::fs::create_dir_all(&objects_dir).await?;
        Ok(Self { objects_dir })
    }

    fn blob_path(&self, digest: &ContentDigest) -> PathBuf {
        let hex = digest.as_str();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }
}

#[async_trait]
impl CasStore for FsCasStore {
    async fn put(&self, data: &[u8]) -> StorageResult<ContentDigest> {
        let digest = ContentDigest::from_bytes(data);
        let path = self.blob_path(&digest);

        if tokio::fs::try_exists(&path).await? {
            return Ok(digest);
        }

        let shard_dir = self.objects_dir.join(&digest.as_str()[..2]);
        tokio::fs::create_dir_all(&shard_dir).await?;

        // Write beside the final path, then rename so readers never see a partial blob.
        let tmp = shard_dir.join(format!(".{}.tmp", &digest.as_str()[2..]));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(digest = %digest.short(), bytes = data.len(), "artifact stored");
        Ok(digest)
    }

    async fn get(&self, digest: &ContentDigest) -> StorageResult<Vec<u8>> {
        let path = self.blob_path(digest);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    digest: digest.as_str().to_string(),
                }
            } else {
                StorageError::Io(e)
            }
        })
    }

    async fn contains(&self, digest: &ContentDigest) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(digest)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dedupe_writes_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCasStore::open(dir.path()).await.unwrap();
        let d1 = store.put(b"duplicate me").await.unwrap();
        let d2 = store.put(b"duplicate me").await.unwrap();
        assert_eq!(d1, d2);

        let shard = dir.path().join("objects").join(&d1.as_str()[..2]);
        let entries: Vec<_> = std::fs::read_dir(shard).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn reopen_sees_existing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let digest = {
            let store = FsCasStore::open(dir.path()).await.unwrap();
            store.put(b"persisted").await.unwrap()
        };
        let store = FsCasStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get(&digest).await.unwrap(), b"persisted");
    }
}
