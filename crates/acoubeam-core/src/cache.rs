//! Durable, content-addressed store for computed artifacts.
//!
//! Artifacts live in one directory as `<prefix>_<digest>.cache` files, one
//! serialized value per file. Nothing is ever evicted: a changed input
//! yields a new digest and therefore a new file.
//!
//! Writes go to a uniquely named temporary file in the same directory which
//! is then renamed over the final name. A concurrent reader therefore sees
//! either no file or a complete one. Two writers racing on the same digest
//! both produce identical bytes, so whichever rename lands last is fine.

use crate::digest::Digest;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

const EXTENSION: &str = "cache";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors raised by cache I/O.
///
/// Pipeline stages log these and carry on: a failed lookup is a miss and a
/// failed store only means the result is not persisted.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to create the cache directory
    #[error("failed to create cache directory '{path}': {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read an artifact or list the directory
    #[error("failed to read '{path}': {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or publish an artifact
    #[error("failed to write '{path}': {source}")]
    Write {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize an artifact
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A stored artifact could not be decoded
    #[error("corrupt artifact '{path}': {source}")]
    Corrupt {
        /// Path of the undecodable file.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

/// The kinds of artifact the pipeline persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Cross-spectral matrix
    Csm,
    /// Eigenvalues and eigenvectors of the cross-spectral matrix
    Eigen,
    /// Delay-and-sum power map
    DelayAndSum,
    /// Capon (minimum variance) power map
    Capon,
    /// Eigenvalue-orthogonal power map
    Eig,
    /// MUSIC pseudo-spectrum map
    Music,
}

impl ArtifactKind {
    /// Every kind, in the order they are produced along the pipeline.
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Csm,
        ArtifactKind::Eigen,
        ArtifactKind::DelayAndSum,
        ArtifactKind::Capon,
        ArtifactKind::Eig,
        ArtifactKind::Music,
    ];

    /// File name prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Csm => "f",
            ArtifactKind::Eigen => "e",
            ArtifactKind::DelayAndSum => "b",
            ArtifactKind::Capon => "w",
            ArtifactKind::Eig => "v",
            ArtifactKind::Music => "m",
        }
    }

    /// Inverse of [`prefix`](Self::prefix).
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.prefix() == prefix)
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Csm => "cross-spectral matrix",
            ArtifactKind::Eigen => "eigen-decomposition",
            ArtifactKind::DelayAndSum => "delay-and-sum",
            ArtifactKind::Capon => "capon",
            ArtifactKind::Eig => "eigenvalue",
            ArtifactKind::Music => "music",
        }
    }
}

/// Snapshot of the cache's instrumentation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups performed.
    pub lookups: u64,
    /// Lookups that found an artifact.
    pub hits: u64,
    /// Artifacts written.
    pub stores: u64,
}

/// One artifact found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Artifact kind, from the file prefix.
    pub kind: ArtifactKind,
    /// Digest, from the file name.
    pub digest: Digest,
    /// Full path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Content-addressed artifact directory.
///
/// Construct once and share (`Arc<DigestCache>`) with every estimator and
/// kernel that should persist results.
#[derive(Debug)]
pub struct DigestCache {
    dir: PathBuf,
    lookups: AtomicU64,
    hits: AtomicU64,
    stores: AtomicU64,
}

impl DigestCache {
    /// Open a cache directory, creating it (and parents) if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self {
            dir,
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        })
    }

    /// Directory backing this cache.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an artifact is (or would be) stored at.
    pub fn path_for(&self, kind: ArtifactKind, digest: &Digest) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", kind.prefix(), digest, EXTENSION))
    }

    /// Whether an artifact exists for `digest`.
    pub fn contains(&self, kind: ArtifactKind, digest: &Digest) -> bool {
        self.path_for(kind, digest).is_file()
    }

    /// Load the artifact stored under `digest`, if any.
    pub fn lookup<T: DeserializeOwned>(
        &self,
        kind: ArtifactKind,
        digest: &Digest,
    ) -> Result<Option<T>, CacheError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let path = self.path_for(kind, digest);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(kind = kind.name(), %digest, "cache miss");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Read { path, source }),
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|source| CacheError::Corrupt { path, source })?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = kind.name(), %digest, "cache hit");
        Ok(Some(value))
    }

    /// Persist `value` under `digest`, atomically.
    pub fn store<T: Serialize + ?Sized>(
        &self,
        kind: ArtifactKind,
        digest: &Digest,
        value: &T,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(CacheError::Serialize)?;
        let path = self.path_for(kind, digest);
        let tmp_path = self.dir.join(format!(
            ".{}_{}.{}.{}.tmp",
            kind.prefix(),
            digest,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()
        };
        if let Err(source) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::Write {
                path: tmp_path,
                source,
            });
        }
        if let Err(source) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::Write { path, source });
        }

        self.stores.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = kind.name(), %digest, bytes = bytes.len(), "cache store");
        Ok(())
    }

    /// All artifacts currently on disk, sorted by path.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let read_err = |source| CacheError::Read {
            path: self.dir.clone(),
            source,
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let path = entry.path();
            let Some(parsed) = parse_file_name(&path) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(CacheEntry {
                kind: parsed.0,
                digest: parsed.1,
                path,
                size,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Remove every artifact (and leftover temporary file). Returns the
    /// number of artifacts removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for entry in self.entries()? {
            fs::remove_file(&entry.path).map_err(|source| CacheError::Write {
                path: entry.path.clone(),
                source,
            })?;
            removed += 1;
        }
        if let Ok(dir) = fs::read_dir(&self.dir) {
            for entry in dir.filter_map(Result::ok) {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with('.') && name.ends_with(".tmp") {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
        Ok(removed)
    }

    /// Instrumentation counters since this handle was opened.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }
}

fn parse_file_name(path: &Path) -> Option<(ArtifactKind, Digest)> {
    if path.extension()? != EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (prefix, digest) = stem.split_once('_')?;
    Some((ArtifactKind::from_prefix(prefix)?, Digest::from_hex(digest)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(s: &str) -> Digest {
        Digest::builder().str(s).finish()
    }

    #[test]
    fn open_creates_nested_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        let cache = DigestCache::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(cache.dir(), dir.as_path());
    }

    #[test]
    fn lookup_miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = DigestCache::open(tmp.path()).unwrap();
        let d = key("one");

        let miss: Option<Vec<f64>> = cache.lookup(ArtifactKind::Csm, &d).unwrap();
        assert!(miss.is_none());

        cache.store(ArtifactKind::Csm, &d, &vec![1.0, 2.5, -3.0]).unwrap();
        let hit: Option<Vec<f64>> = cache.lookup(ArtifactKind::Csm, &d).unwrap();
        assert_eq!(hit, Some(vec![1.0, 2.5, -3.0]));

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.stores, 1);
    }

    #[test]
    fn kinds_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let cache = DigestCache::open(tmp.path()).unwrap();
        let d = key("shared");
        cache.store(ArtifactKind::Csm, &d, &1u32).unwrap();
        assert!(cache.contains(ArtifactKind::Csm, &d));
        assert!(!cache.contains(ArtifactKind::Eigen, &d));
    }

    #[test]
    fn file_name_layout() {
        let tmp = TempDir::new().unwrap();
        let cache = DigestCache::open(tmp.path()).unwrap();
        let d = key("x");
        let path = cache.path_for(ArtifactKind::Music, &d);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("m_{}.cache", d));
    }

    #[test]
    fn no_temporary_files_left_after_store() {
        let tmp = TempDir::new().unwrap();
        let cache = DigestCache::open(tmp.path()).unwrap();
        cache.store(ArtifactKind::Capon, &key("a"), &[0.5f64; 16]).unwrap();
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".cache"));
    }

    #[test]
    fn corrupt_artifact_is_reported() {
        let tmp = TempDir::new().unwrap();
        let cache = DigestCache::open(tmp.path()).unwrap();
        let d = key("bad");
        fs::write(cache.path_for(ArtifactKind::Eig, &d), b"not json").unwrap();
        let err = cache.lookup::<Vec<f64>>(ArtifactKind::Eig, &d).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn entries_and_clear() {
        let tmp = TempDir::new().unwrap();
        let cache = DigestCache::open(tmp.path()).unwrap();
        cache.store(ArtifactKind::Csm, &key("a"), &1u8).unwrap();
        cache.store(ArtifactKind::DelayAndSum, &key("b"), &2u8).unwrap();
        fs::write(tmp.path().join("unrelated.txt"), b"keep").unwrap();

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.kind == ArtifactKind::DelayAndSum));

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.entries().unwrap().is_empty());
        assert!(tmp.path().join("unrelated.txt").exists());
    }

    #[test]
    fn prefix_roundtrip() {
        for kind in ArtifactKind::ALL {
            assert_eq!(ArtifactKind::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(ArtifactKind::from_prefix("z"), None);
    }
}
