//! Data source items referenced by visualizations and filters.
//!
//! Connectors themselves live outside this crate; only the declarations are
//! modeled, as one closed set of provider kinds.

use serde::{Deserialize, Serialize};

/// A data source item, keyed by provider kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "camelCase")]
pub enum DataSourceItem {
    LocalFile(LocalFileItem),
    Excel(ExcelItem),
    Csv(CsvItem),
    Json(JsonItem),
    Rest(RestItem),
    SqlServer(SqlItem),
    Postgres(SqlItem),
    MySql(SqlItem),
    InMemory(InMemoryItem),
}

/// Provider kind without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    LocalFile,
    Excel,
    Csv,
    Json,
    Rest,
    SqlServer,
    Postgres,
    MySql,
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFileItem {
    pub id: String,
    pub title: String,
    /// e.g. `local:/Samples.xlsx`
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelItem {
    pub id: String,
    pub title: String,
    pub file: LocalFileItem,
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvItem {
    pub id: String,
    pub title: String,
    pub file: LocalFileItem,
    #[serde(default = "default_true")]
    pub has_header: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonItem {
    pub id: String,
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestItem {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub use_anonymous_authentication: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlItem {
    pub id: String,
    pub title: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub database: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InMemoryItem {
    pub id: String,
    pub title: String,
    pub dataset_id: String,
}

fn default_true() -> bool {
    true
}

impl DataSourceItem {
    pub fn kind(&self) -> ProviderKind {
        match self {
            DataSourceItem::LocalFile(_) => ProviderKind::LocalFile,
            DataSourceItem::Excel(_) => ProviderKind::Excel,
            DataSourceItem::Csv(_) => ProviderKind::Csv,
            DataSourceItem::Json(_) => ProviderKind::Json,
            DataSourceItem::Rest(_) => ProviderKind::Rest,
            DataSourceItem::SqlServer(_) => ProviderKind::SqlServer,
            DataSourceItem::Postgres(_) => ProviderKind::Postgres,
            DataSourceItem::MySql(_) => ProviderKind::MySql,
            DataSourceItem::InMemory(_) => ProviderKind::InMemory,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DataSourceItem::LocalFile(item) => &item.id,
            DataSourceItem::Excel(item) => &item.id,
            DataSourceItem::Csv(item) => &item.id,
            DataSourceItem::Json(item) => &item.id,
            DataSourceItem::Rest(item) => &item.id,
            DataSourceItem::SqlServer(item)
            | DataSourceItem::Postgres(item)
            | DataSourceItem::MySql(item) => &item.id,
            DataSourceItem::InMemory(item) => &item.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            DataSourceItem::LocalFile(item) => &item.title,
            DataSourceItem::Excel(item) => &item.title,
            DataSourceItem::Csv(item) => &item.title,
            DataSourceItem::Json(item) => &item.title,
            DataSourceItem::Rest(item) => &item.title,
            DataSourceItem::SqlServer(item)
            | DataSourceItem::Postgres(item)
            | DataSourceItem::MySql(item) => &item.title,
            DataSourceItem::InMemory(item) => &item.title,
        }
    }

    /// Id of the item this one reads from, e.g. the file behind an Excel sheet
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            DataSourceItem::Excel(item) => Some(&item.file.id),
            DataSourceItem::Csv(item) => Some(&item.file.id),
            _ => None,
        }
    }
}
