//! Content-hash set used to avoid re-logging payloads already seen.
//!
//! Entries are SHA-256 digests and live for as long as the cache does.
//! There is no eviction, so memory grows with the number of distinct
//! payloads observed.

use std::sync::Arc;

use dashmap::DashSet;
use sha2::{Digest as _, Sha256};

use crate::observability::metrics;

/// SHA-256 digest of a payload.
pub type PayloadDigest = [u8; 32];

/// Shared set of payload digests.
///
/// Cloning is cheap and every clone sees the same entries, so one
/// instance is created at startup and handed to every connection.
#[derive(Debug, Clone, Default)]
pub struct DedupCache {
    inner: Arc<DashSet<PayloadDigest>>,
}

impl DedupCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a payload.
    pub fn digest(payload: &[u8]) -> PayloadDigest {
        let hash = Sha256::digest(payload);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        out
    }

    /// Whether this digest has been recorded before.
    pub fn contains(&self, digest: &PayloadDigest) -> bool {
        self.inner.contains(digest)
    }

    /// Record a digest. Returns `true` if it was not present.
    pub fn insert(&self, digest: PayloadDigest) -> bool {
        let fresh = self.inner.insert(digest);
        if fresh {
            metrics::record_dedup_entries(self.inner.len());
        }
        fresh
    }

    /// Number of distinct digests recorded.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains() {
        let cache = DedupCache::new();
        let digest = DedupCache::digest(b"HTTP/1.1 200 OK\r\n\r\n");

        assert!(!cache.contains(&digest));
        assert!(cache.insert(digest));
        assert!(cache.contains(&digest));
        assert!(!cache.insert(digest));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn digest_is_content_based() {
        assert_eq!(DedupCache::digest(b"abc"), DedupCache::digest(b"abc"));
        assert_ne!(DedupCache::digest(b"abc"), DedupCache::digest(b"abd"));
    }

    #[test]
    fn clones_share_entries() {
        let cache = DedupCache::new();
        let other = cache.clone();
        other.insert(DedupCache::digest(b"shared"));
        assert!(cache.contains(&DedupCache::digest(b"shared")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts() {
        let cache = DedupCache::new();
        let mut tasks = Vec::new();
        for worker in 0..8u8 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..100u8 {
                    cache.insert(DedupCache::digest(&[worker, i]));
                    cache.insert(DedupCache::digest(&[0xff, i]));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(cache.len(), 8 * 100 + 100);
    }
}
