use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::ReaderBuilder;
use ds_core::{FilterScalar, FilterTarget, FilterValue, ValueDomainProvider};
use indexmap::IndexSet;
use tracing::debug;

use crate::config::{NullConfig, ValueDomainConfig};
use crate::StoreError;

/// Value domains read from CSV columns.
///
/// The domain of a field is the set of distinct non-null cells of the column
/// named after the field, in first-seen order, labelled with the raw cell.
pub struct CsvValueDomain {
    config: ValueDomainConfig,
}

impl CsvValueDomain {
    pub fn new(config: ValueDomainConfig) -> Self {
        Self { config }
    }

    /// Serve every field from one file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ValueDomainConfig::single_file(path))
    }

    pub fn config(&self) -> &ValueDomainConfig {
        &self.config
    }

    /// Distinct values of `column` in `path`
    pub async fn distinct_values(&self, path: &Path, column: &str) -> Result<Vec<FilterValue>, StoreError> {
        let path = path.to_path_buf();
        let column = column.to_string();
        let delimiter = self.config.delimiter;
        let has_headers = self.config.has_headers;
        let nulls = self.config.null_config.clone();

        tokio::task::spawn_blocking(move || read_distinct(&path, &column, delimiter, has_headers, &nulls)).await?
    }
}

/// Resolve the column index; without headers the field name must be a zero-based index
fn column_index(headers: Option<&csv::StringRecord>, column: &str) -> Option<usize> {
    match headers {
        Some(headers) => headers.iter().position(|h| h.trim() == column),
        None => column.parse().ok(),
    }
}

fn read_distinct(
    path: &Path,
    column: &str,
    delimiter: u8,
    has_headers: bool,
    nulls: &NullConfig,
) -> Result<Vec<FilterValue>, StoreError> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = if has_headers { Some(reader.headers()?.clone()) } else { None };
    let index = column_index(headers.as_ref(), column).ok_or_else(|| StoreError::UnknownColumn {
        column: column.to_string(),
        file: path.display().to_string(),
    })?;

    let mut seen = IndexSet::new();
    for result in reader.records() {
        let record = result?;
        if let Some(cell) = record.get(index) {
            if !nulls.is_null(cell) {
                seen.insert(cell.trim().to_string());
            }
        }
    }

    debug!(file = %path.display(), column, values = seen.len(), "value domain read");
    Ok(seen
        .into_iter()
        .map(|raw| FilterValue::new(FilterScalar::parse(&raw), raw))
        .collect())
}

#[async_trait]
impl ValueDomainProvider for CsvValueDomain {
    async fn filter_values(&self, target: &FilterTarget) -> anyhow::Result<Vec<FilterValue>> {
        let path = self.config.resolve(target.data_source_id())?.to_path_buf();
        Ok(self.distinct_values(&path, target.field_name()).await?)
    }
}
