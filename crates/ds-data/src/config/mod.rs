//! Store and value domain configuration

mod null_handling;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::StoreError;

pub use null_handling::NullConfig;

/// Where dashboard containers are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one container file per dashboard
    pub storage_path: PathBuf,

    /// File extension of container files, without the dot
    pub extension: String,

    /// Create the storage directory on first save
    pub create_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data"),
            extension: "rdash".to_string(),
            create_missing: true,
        }
    }
}

impl StoreConfig {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Default::default()
        }
    }
}

/// CSV files backing the value domains of filter fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueDomainConfig {
    /// Files keyed by data source id
    pub files: IndexMap<String, PathBuf>,

    /// File used for fields whose data source is not listed in `files`
    pub default_file: Option<PathBuf>,

    /// Delimiter character
    pub delimiter: u8,

    /// Whether the first row names the columns
    pub has_headers: bool,

    pub null_config: NullConfig,
}

impl Default for ValueDomainConfig {
    fn default() -> Self {
        Self {
            files: IndexMap::new(),
            default_file: None,
            delimiter: b',',
            has_headers: true,
            null_config: NullConfig::default(),
        }
    }
}

impl ValueDomainConfig {
    /// Serve every field from one file
    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        Self {
            default_file: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn with_file(mut self, data_source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(data_source_id.into(), path.into());
        self
    }

    /// File for a data source, falling back to the default file
    pub fn resolve(&self, data_source_id: Option<&str>) -> Result<&Path, StoreError> {
        data_source_id
            .and_then(|id| self.files.get(id))
            .or(self.default_file.as_ref())
            .map(PathBuf::as_path)
            .ok_or_else(|| StoreError::NoSource(data_source_id.map(str::to_string)))
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
