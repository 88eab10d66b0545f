//! Persisted cache of per-layer package resolutions.
//!
//! Keyed by layer diff identifier, so identical layers shared across
//! different images resolve once. The cache is loaded once at context
//! construction and written back at explicit checkpoints; it is not
//! saved on every mutation. A crash before a checkpoint loses in-memory
//! updates, which is acceptable because resolution is re-derivable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use layerlens_core::error::{LensError, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Package, RawPackage};

/// On-disk cache format. Packages keep their sentinel encoding here.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    /// When the cache was last saved (Unix timestamp).
    saved_at: i64,
    /// Layer diff id → resolved packages.
    layers: BTreeMap<String, Vec<RawPackage>>,
}

/// In-memory table of layer resolutions with file-backed persistence.
#[derive(Debug)]
pub struct LayerCache {
    path: PathBuf,
    records: BTreeMap<String, Vec<Package>>,
}

impl LayerCache {
    /// Load the cache from `path`. A missing file yields an empty cache;
    /// an unreadable or corrupt file is a structural error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                records: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            LensError::CacheError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let file: CacheFile = serde_json::from_str(&content).map_err(|e| {
            LensError::CacheError(format!("corrupt cache file {}: {}", path.display(), e))
        })?;

        let records = file
            .layers
            .into_iter()
            .map(|(id, raws)| (id, raws.into_iter().map(Package::from).collect()))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    /// Previously resolved packages for a layer, if any.
    pub fn get(&self, layer_id: &str) -> Option<&[Package]> {
        self.records.get(layer_id).map(|p| p.as_slice())
    }

    /// Record a resolution. Re-resolving a layer overwrites the previous
    /// entry, never appends a duplicate record.
    pub fn put(&mut self, layer_id: &str, packages: Vec<Package>) {
        self.records.insert(layer_id.to_string(), packages);
    }

    /// Persist all accumulated records.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LensError::CacheError(format!(
                    "failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = CacheFile {
            saved_at: chrono::Utc::now().timestamp(),
            layers: self
                .records
                .iter()
                .map(|(id, pkgs)| (id.clone(), pkgs.iter().map(RawPackage::from).collect()))
                .collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, content).map_err(|e| {
            LensError::CacheError(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            layers = self.records.len(),
            "saved layer cache"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
