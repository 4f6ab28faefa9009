use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::datasets::{DatasetLoader, IgDataset, Split};
use crate::graph::RecordWriter;
use crate::pipeline::config::AugmentConfig;

pub const CACHE_DIR: &str = "cache";
const PREPARED_SUBDIR: &str = "prepared";
const METADATA_FILE: &str = "meta.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub len: u64,
    pub modified: u64,
}

impl CacheMetadata {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata =
            fs::metadata(path).with_context(|| format!("read metadata for {:?}", path))?;
        let len = metadata.len();
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(Self { len, modified })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub train: CacheMetadata,
    pub val: CacheMetadata,
    pub test: CacheMetadata,
}

impl SourceMetadata {
    pub fn from_loader(loader: &DatasetLoader) -> Result<Self> {
        Ok(Self {
            train: CacheMetadata::from_path(&loader.split_path(Split::Train))?,
            val: CacheMetadata::from_path(&loader.split_path(Split::Val))?,
            test: CacheMetadata::from_path(&loader.split_path(Split::Test))?,
        })
    }
}

/// Augmented datasets on disk, one directory per source root and augmentation
/// config, stored as plain split files plus `meta.json`.
#[derive(Debug, Clone)]
pub struct PreparedCache {
    root: PathBuf,
}

impl PreparedCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load(&self, source: &DatasetLoader, config: &AugmentConfig) -> Result<Option<IgDataset>> {
        let dir = self.entry_dir(source.root(), config)?;
        let meta_path = dir.join(METADATA_FILE);
        if !meta_path.exists() {
            debug!("No prepared dataset cached at {:?}", dir);
            return Ok(None);
        }

        let meta: CachedMeta = read_json(&meta_path)
            .with_context(|| format!("deserialize prepared metadata from {:?}", meta_path))?;
        let current = SourceMetadata::from_loader(source)?;
        if meta.version != CACHE_VERSION || &meta.config != config || meta.sources != current {
            info!("Prepared dataset at {:?} is stale, ignoring it", dir);
            return Ok(None);
        }
        if Split::ALL
            .iter()
            .any(|split| !dir.join(split.file_name()).exists())
        {
            return Ok(None);
        }

        let dataset = DatasetLoader::new(dir.clone())
            .load_dataset()
            .with_context(|| format!("load prepared dataset from {:?}", dir))?;
        info!("Reusing prepared dataset from {:?}", dir);
        Ok(Some(dataset))
    }

    pub fn store(
        &self,
        source: &DatasetLoader,
        config: &AugmentConfig,
        dataset: &IgDataset,
    ) -> Result<PathBuf> {
        let dir = self.entry_dir(source.root(), config)?;
        fs::create_dir_all(&dir).with_context(|| format!("create cache directory {:?}", dir))?;

        for split in dataset.splits() {
            let path = dir.join(split.split.file_name());
            RecordWriter::write_to_path(&split.records, &path)
                .with_context(|| format!("write prepared {} split to {:?}", split.split, path))?;
        }

        let meta = CachedMeta {
            version: CACHE_VERSION,
            config: config.clone(),
            sources: SourceMetadata::from_loader(source)?,
        };
        write_json(&dir.join(METADATA_FILE), &meta)
            .with_context(|| format!("write prepared metadata to {:?}", dir))?;
        Ok(dir)
    }

    pub fn clear(&self) -> Result<()> {
        let dir = self.root.join(PREPARED_SUBDIR);
        if dir.exists() {
            fs::remove_dir_all(&dir).with_context(|| format!("remove cache directory {:?}", dir))?;
            info!("Cleared prepared dataset cache at {:?}", dir);
        }
        Ok(())
    }

    fn entry_dir(&self, dataset_root: &Path, config: &AugmentConfig) -> Result<PathBuf> {
        let canonical = dataset_root
            .canonicalize()
            .unwrap_or_else(|_| dataset_root.to_path_buf());
        let mut hasher = blake3::Hasher::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        hasher.update(&serde_json::to_vec(config).context("serialize augmentation config")?);
        let hash = hasher.finalize();
        let dirname = hash.to_hex().to_string();
        Ok(self.root.join(PREPARED_SUBDIR).join(dirname))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedMeta {
    version: u32,
    config: AugmentConfig,
    sources: SourceMetadata,
}

fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path).with_context(|| format!("open cached json file {:?}", path))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("deserialize cached json file {:?}", path))
}

fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create cache parent directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("create cache json file {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, value)
        .with_context(|| format!("serialize cache json file {:?}", path))
}
