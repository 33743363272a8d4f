//! Fingerprint-based change oracle
//!
//! Stores a snapshot of every generator input per source root. A file is
//! considered changed when it is new, or when its size or mtime moved and
//! its SHA-256 content hash no longer matches.

use crate::detector::{ChangeOracle, IncludePattern};
use crate::error::{CodegenError, CodegenResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Snapshot file name inside the state directory
pub const SNAPSHOT_FILE: &str = "fingerprints.json";

/// File fingerprint for change detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Size in bytes
    pub size: u64,
    /// Modification time, seconds since the epoch
    pub mtime_secs: u64,
    /// Sub-second part of the modification time
    pub mtime_nanos: u32,
    /// SHA-256 of the content, hex encoded
    pub hash: String,
}

impl FileFingerprint {
    /// Fingerprint a file on disk
    pub fn of(path: &Path) -> CodegenResult<Self> {
        let metadata = fs::metadata(path).map_err(|e| CodegenError::io(path, e))?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        Ok(Self {
            size: metadata.len(),
            mtime_secs: mtime.as_secs(),
            mtime_nanos: mtime.subsec_nanos(),
            hash: content_hash(path)?,
        })
    }

    fn same_stat(&self, other: &Path) -> CodegenResult<bool> {
        let metadata = fs::metadata(other).map_err(|e| CodegenError::io(other, e))?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        Ok(self.size == metadata.len()
            && self.mtime_secs == mtime.as_secs()
            && self.mtime_nanos == mtime.subsec_nanos())
    }
}

fn content_hash(path: &Path) -> CodegenResult<String> {
    let content = fs::read(path).map_err(|e| CodegenError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

type RootSnapshot = BTreeMap<PathBuf, FileFingerprint>;

/// Change oracle backed by persisted per-root snapshots
#[derive(Debug, Default)]
pub struct FingerprintOracle {
    path: PathBuf,
    roots: BTreeMap<PathBuf, RootSnapshot>,
}

impl FingerprintOracle {
    /// Open the snapshot stored in `state_dir`, empty if none exists yet
    pub fn open(state_dir: &Path) -> CodegenResult<Self> {
        let path = state_dir.join(SNAPSHOT_FILE);
        let roots = if path.exists() {
            let content = fs::read(&path).map_err(|e| CodegenError::io(&path, e))?;
            serde_json::from_slice(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, roots })
    }

    /// Replace the snapshot of `base` with its current contents
    pub fn commit(&mut self, base: &Path, include: &IncludePattern) -> CodegenResult<usize> {
        let mut snapshot = RootSnapshot::new();
        for relative in scan(base, include)? {
            let fingerprint = FileFingerprint::of(&base.join(&relative))?;
            let _ = snapshot.insert(relative, fingerprint);
        }
        let count = snapshot.len();
        debug!("Recorded {} fingerprints for {}", count, base.display());
        let _ = self.roots.insert(base.to_path_buf(), snapshot);
        Ok(count)
    }

    /// Drop every snapshot so the next run regenerates everything
    pub fn forget_all(&mut self) {
        info!("Forgetting {} fingerprint snapshots", self.roots.len());
        self.roots.clear();
    }

    /// Number of fingerprints recorded for `base`
    pub fn tracked(&self, base: &Path) -> usize {
        self.roots.get(base).map_or(0, BTreeMap::len)
    }

    /// Persist the snapshots atomically
    pub fn save(&self) -> CodegenResult<()> {
        let data = serde_json::to_vec_pretty(&self.roots)?;
        atomic_write(&self.path, &data)
    }
}

impl ChangeOracle for FingerprintOracle {
    fn is_incremental(&self, base: &Path) -> bool {
        self.roots.contains_key(base)
    }

    fn changed_files(
        &self,
        base: &Path,
        include: &IncludePattern,
    ) -> CodegenResult<Option<Vec<PathBuf>>> {
        let Some(snapshot) = self.roots.get(base) else {
            return Ok(None);
        };
        let mut changed = Vec::new();
        for relative in scan(base, include)? {
            let absolute = base.join(&relative);
            let dirty = match snapshot.get(&relative) {
                None => true,
                Some(previous) if previous.same_stat(&absolute)? => false,
                Some(previous) => previous.hash != content_hash(&absolute)?,
            };
            if dirty {
                changed.push(relative);
            }
        }
        Ok(Some(changed))
    }
}

/// Root-relative paths of all inputs under `base`, sorted
fn scan(base: &Path, include: &IncludePattern) -> CodegenResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(base).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(base).to_path_buf();
            CodegenError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(base)
            && include.matches(relative)
        {
            files.push(relative.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Write data to a file atomically: temp file, fsync, rename
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> CodegenResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| CodegenError::io(&temp_path, e))?;
    file.write_all(data)
        .map_err(|e| CodegenError::io(&temp_path, e))?;
    file.sync_all().map_err(|e| CodegenError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| CodegenError::io(path, e))?;

    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all(); // not supported everywhere
    }
    Ok(())
}
