//! Task inputs and outputs in content-addressed storage.
//!
//! The ledger only records a [`Hash32`] commitment and an opaque pointer.
//! These helpers store the bytes behind them in a [`CasStore`] and check
//! them on the way back. Pointers have the form `cas://<sha256-hex>`.

use arbiter_state::{CasStore, ContentDigest};

use crate::domain::{ArbiterError, Hash32, Result};

pub const POINTER_SCHEME: &str = "cas://";

/// Where an artifact went and what it commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub commitment: Hash32,
    pub pointer: String,
}

pub fn pointer_for(digest: &ContentDigest) -> String {
    format!("{POINTER_SCHEME}{digest}")
}

pub fn parse_pointer(pointer: &str) -> Result<ContentDigest> {
    let hex = pointer
        .strip_prefix(POINTER_SCHEME)
        .ok_or_else(|| ArbiterError::InvalidPointer(pointer.to_string()))?;
    ContentDigest::try_from(hex.to_string())
        .map_err(|_| ArbiterError::InvalidPointer(pointer.to_string()))
}

pub async fn store_artifact(cas: &dyn CasStore, bytes: &[u8]) -> Result<StoredArtifact> {
    let digest = cas.put(bytes).await?;
    tracing::debug!(digest = %digest.short(), size = bytes.len(), "artifact stored");
    Ok(StoredArtifact {
        commitment: Hash32::from_bytes(digest.to_bytes()),
        pointer: pointer_for(&digest),
    })
}

/// Fetch the bytes behind `pointer` and check they hash to `expected`.
pub async fn load_verified_artifact(
    cas: &dyn CasStore,
    pointer: &str,
    expected: &Hash32,
) -> Result<Vec<u8>> {
    let digest = parse_pointer(pointer)?;
    let bytes = cas.get(&digest).await?;
    let actual = Hash32::digest(&bytes);
    if &actual != expected {
        return Err(ArbiterError::ArtifactMismatch {
            expected: *expected,
            actual,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_state::MemoryCasStore;

    #[test]
    fn parse_pointer_rejects_other_schemes() {
        assert!(parse_pointer("ipfs://abc").is_err());
        assert!(parse_pointer("cas://not-hex").is_err());
        let digest = ContentDigest::from_bytes(b"x");
        assert_eq!(parse_pointer(&pointer_for(&digest)).unwrap(), digest);
    }

    #[tokio::test]
    async fn stored_commitment_matches_hash32_digest() {
        let cas = MemoryCasStore::new();
        let stored = store_artifact(&cas, b"prompt").await.unwrap();
        assert_eq!(stored.commitment, Hash32::digest(b"prompt"));
        assert!(stored.pointer.starts_with(POINTER_SCHEME));

        let bytes = load_verified_artifact(&cas, &stored.pointer, &stored.commitment)
            .await
            .unwrap();
        assert_eq!(bytes, b"prompt");
    }

    #[tokio::test]
    async fn mismatched_commitment_is_rejected() {
        let cas = MemoryCasStore::new();
        let stored = store_artifact(&cas, b"output").await.unwrap();
        let err = load_verified_artifact(&cas, &stored.pointer, &Hash32::digest(b"other"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArbiterError::ArtifactMismatch { .. }));
    }
}
