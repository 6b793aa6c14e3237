//! Collaborators the document depends on: loading, persistence and value domains

use async_trait::async_trait;

use crate::error::LoadError;
use crate::filter::FilterValue;
use crate::model::DashboardModel;

/// Fetches dashboard documents by name
#[async_trait]
pub trait DashboardLoader: Send + Sync {
    /// Fetch the document model of a named dashboard
    async fn fetch(&self, dashboard_id: &str) -> Result<DashboardModel, LoadError>;
}

/// Result of a completed save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Identifier assigned by the store
    pub dashboard_id: String,
}

/// Receives serialized dashboards on save
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(&self, name: &str, container: Vec<u8>) -> anyhow::Result<SaveReceipt>;
}

/// Field whose value domain is requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTarget {
    Global {
        dashboard_id: Option<String>,
        filter_id: String,
        field_name: String,
        data_source_id: Option<String>,
    },
    Quick {
        dashboard_id: Option<String>,
        visualization_id: String,
        field_name: String,
        data_source_id: Option<String>,
    },
}

impl FilterTarget {
    pub fn field_name(&self) -> &str {
        match self {
            FilterTarget::Global { field_name, .. } | FilterTarget::Quick { field_name, .. } => field_name,
        }
    }

    pub fn data_source_id(&self) -> Option<&str> {
        match self {
            FilterTarget::Global { data_source_id, .. } | FilterTarget::Quick { data_source_id, .. } => {
                data_source_id.as_deref()
            }
        }
    }
}

/// Enumerates the possible values of a field, e.g. to populate a picker
#[async_trait]
pub trait ValueDomainProvider: Send + Sync {
    async fn filter_values(&self, target: &FilterTarget) -> anyhow::Result<Vec<FilterValue>>;
}
