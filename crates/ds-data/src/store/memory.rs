use async_trait::async_trait;
use ds_core::model::container;
use ds_core::{DashboardLoader, DashboardModel, LoadError, PersistenceSink, SaveReceipt};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use super::dashboard_id_for;
use crate::StoreError;

/// Dashboards kept as container bytes in memory, in insertion order
#[derive(Default)]
pub struct InMemoryStore {
    containers: RwLock<IndexMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_model(&self, dashboard_id: impl Into<String>, model: &DashboardModel) -> Result<(), StoreError> {
        let bytes = container::encode(model)?;
        self.insert_container(dashboard_id, bytes);
        Ok(())
    }

    pub fn insert_container(&self, dashboard_id: impl Into<String>, bytes: Vec<u8>) {
        self.containers.write().insert(dashboard_id.into(), bytes);
    }

    pub fn container(&self, dashboard_id: &str) -> Option<Vec<u8>> {
        self.containers.read().get(dashboard_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.containers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DashboardLoader for InMemoryStore {
    async fn fetch(&self, dashboard_id: &str) -> Result<DashboardModel, LoadError> {
        let bytes = self
            .container(dashboard_id)
            .ok_or_else(|| StoreError::NotFound(dashboard_id.to_string()))?;
        container::decode(&bytes)
    }
}

#[async_trait]
impl PersistenceSink for InMemoryStore {
    async fn save(&self, name: &str, container: Vec<u8>) -> anyhow::Result<SaveReceipt> {
        let dashboard_id = dashboard_id_for(name)?;
        debug!(dashboard = %dashboard_id, bytes = container.len(), "dashboard saved in memory");
        self.insert_container(dashboard_id.clone(), container);
        Ok(SaveReceipt { dashboard_id })
    }
}
