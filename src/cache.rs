use ethers::types::{Address, H256};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, PidExt, System, SystemExt};
use tempfile::NamedTempFile;

use crate::radon::DescriptorKind;

/// Errors raised while persisting the request hash cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache is locked by another run ({0})")]
    Locked(PathBuf),
}

/// Hashes and template address recorded for one chain.
///
/// Field names follow the event names the registry emits, which is also the
/// key layout of the JSON file shared with other tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHashes {
    #[serde(rename = "NewRadonRetrievalHash", default, skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<H256>,
    #[serde(rename = "NewRadonReducerHash", default, skip_serializing_if = "Option::is_none")]
    pub reducer: Option<H256>,
    #[serde(rename = "NewSlaHash", default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<H256>,
    #[serde(rename = "WitnetRequestTemplate", default, skip_serializing_if = "Option::is_none")]
    pub request_template: Option<Address>,
}

impl ChainHashes {
    pub fn hash(&self, kind: DescriptorKind) -> Option<H256> {
        match kind {
            DescriptorKind::Retrieval => self.retrieval,
            DescriptorKind::Reducer => self.reducer,
            DescriptorKind::Sla => self.sla,
        }
    }

    pub fn set_hash(&mut self, kind: DescriptorKind, hash: Option<H256>) {
        match kind {
            DescriptorKind::Retrieval => self.retrieval = hash,
            DescriptorKind::Reducer => self.reducer = hash,
            DescriptorKind::Sla => self.sla = hash,
        }
    }
}

/// Memoization table of registered descriptor hashes, keyed by chain id.
///
/// Entries are authoritative once recorded: a cached hash is never re-verified
/// against the registry. The cache only grows unless a step fails and leaves a
/// field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestHashCache {
    #[serde(default)]
    pub hashes: BTreeMap<String, ChainHashes>,
    /// Top-level keys written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RequestHashCache {
    /// Reads the cache file. A missing, unreadable or malformed file yields an
    /// empty cache.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                info!("No request hash cache at {} ({}), starting empty", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cache) => {
                debug!("Loaded request hash cache from {}", path.display());
                cache
            }
            Err(e) => {
                warn!("Ignoring malformed request hash cache at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Overwrites the cache file atomically, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let dir = parent_dir(path);
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| CacheError::Io(e.error))?;

        info!("Request hash cache written to {}", path.display());
        Ok(())
    }

    pub fn entry(&self, chain_id: u64) -> Option<&ChainHashes> {
        self.hashes.get(&chain_id.to_string())
    }

    /// Entry for `chain_id`, created empty when missing.
    pub fn entry_mut(&mut self, chain_id: u64) -> &mut ChainHashes {
        self.hashes.entry(chain_id.to_string()).or_default()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Exclusive lock over a cache file, held for the duration of a run.
///
/// Backed by a `<cache>.lock` file holding the owner's pid, created with
/// create-new semantics and removed on drop. A lock left behind by a process
/// that no longer exists (killed, aborted) is taken over.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    pub fn acquire(cache_path: &Path) -> Result<Self, CacheError> {
        let path = Self::lock_path(cache_path);
        fs::create_dir_all(parent_dir(&path))?;

        match Self::create(&path) {
            Err(CacheError::Locked(_)) if Self::is_stale(&path) => {
                warn!("Taking over stale cache lock {}", path.display());
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(CacheError::Io(e)),
                }
                Self::create(&path)
            }
            result => result,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<cache>.lock`, next to the cache file.
    pub fn lock_path(cache_path: &Path) -> PathBuf {
        let mut name = cache_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn create(path: &Path) -> Result<Self, CacheError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                debug!("Acquired cache lock {}", path.display());
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(CacheError::Locked(path.to_path_buf()))
            }
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    /// True when the lock file names a process that is no longer running.
    fn is_stale(path: &Path) -> bool {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            // Released in the meantime
            Err(_) => return true,
        };
        match raw.trim().parse::<u32>() {
            Ok(pid) => !process_alive(pid),
            Err(_) => {
                warn!("Cache lock {} holds no pid ({:?})", path.display(), raw.trim());
                true
            }
        }
    }
}

fn process_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    let mut system = System::new();
    system.refresh_process(Pid::from_u32(pid))
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release cache lock {}: {}", self.path.display(), e);
        }
    }
}
