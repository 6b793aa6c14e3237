use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use ds_core::model::container;
use ds_core::{DashboardLoader, DashboardModel, LoadError, PersistenceSink, SaveReceipt};
use tracing::{debug, info};

use super::{check_id, dashboard_id_for};
use crate::{StoreConfig, StoreError};

/// Dashboards kept as `<id>.<extension>` container files in one directory
pub struct LocalFileStore {
    config: StoreConfig,
}

impl LocalFileStore {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self::with_config(StoreConfig::new(storage_path))
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path_for(&self, dashboard_id: &str) -> Result<PathBuf, StoreError> {
        check_id(dashboard_id)?;
        Ok(self
            .config
            .storage_path
            .join(format!("{}.{}", dashboard_id, self.config.extension)))
    }

    /// Raw container bytes of a stored dashboard
    pub async fn read(&self, dashboard_id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(dashboard_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(dashboard_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write(&self, dashboard_id: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.path_for(dashboard_id)?;
        if self.config.create_missing {
            tokio::fs::create_dir_all(&self.config.storage_path).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "container written");
        Ok(path)
    }

    /// Encode a model and store it under `dashboard_id`
    pub async fn write_model(&self, dashboard_id: &str, model: &DashboardModel) -> Result<PathBuf, StoreError> {
        let bytes = container::encode(model)?;
        self.write(dashboard_id, &bytes).await
    }

    /// Ids of all stored dashboards, sorted
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.config.storage_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.config.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl DashboardLoader for LocalFileStore {
    async fn fetch(&self, dashboard_id: &str) -> Result<DashboardModel, LoadError> {
        let bytes = self.read(dashboard_id).await?;

        let model = tokio::task::spawn_blocking(move || container::decode(&bytes))
            .await
            .map_err(StoreError::from)??;

        info!(dashboard = dashboard_id, "dashboard read from local storage");
        Ok(model)
    }
}

#[async_trait]
impl PersistenceSink for LocalFileStore {
    async fn save(&self, name: &str, container: Vec<u8>) -> anyhow::Result<SaveReceipt> {
        let dashboard_id = dashboard_id_for(name)?;
        let path = self.write(&dashboard_id, &container).await?;

        info!(dashboard = %dashboard_id, path = %path.display(), "dashboard saved to local storage");
        Ok(SaveReceipt { dashboard_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_core::{ChartType, FilterModel, WidgetModel};
    use tempfile::TempDir;

    fn model() -> DashboardModel {
        let mut model = DashboardModel::new("Manufacturing");
        model.filters.push(FilterModel::new("f1", "Plant", "plant"));
        model
            .widgets
            .push(WidgetModel::new("w1", "Output", ChartType::LineChart).with_quick_filter("Line"));
        model
    }

    #[tokio::test]
    async fn test_write_then_fetch() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path().join("dashboards"));

        let path = store.write_model("manufacturing", &model()).await.unwrap();
        assert!(path.ends_with("manufacturing.rdash"));

        let loaded = store.fetch("manufacturing").await.unwrap();
        assert_eq!(loaded.title, "Manufacturing");
        assert_eq!(loaded.widgets[0].quick_filters[0].field_name, "Line");
        assert_eq!(store.list().await.unwrap(), vec!["manufacturing"]);
    }

    #[tokio::test]
    async fn test_missing_dashboard_is_load_error() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        let err = store.fetch("nope").await.unwrap_err();
        assert!(err.message.contains("'nope' not found"));

        let err = store.fetch("../nope").await.unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_container_is_load_error() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.write("broken", b"RDSH\x01{not json").await.unwrap();

        let err = store.fetch("broken").await.unwrap_err();
        assert!(err.message.contains("malformed"));
    }

    #[tokio::test]
    async fn test_save_derives_id_from_name() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        let bytes = container::encode(&model()).unwrap();

        let receipt = store.save("Plant Overview", bytes).await.unwrap();
        assert_eq!(receipt.dashboard_id, "plant-overview");
        assert!(dir.path().join("plant-overview.rdash").exists());
    }

    #[tokio::test]
    async fn test_list_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
