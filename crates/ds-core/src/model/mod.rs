//! Serializable dashboard document model

pub mod container;
mod data_source;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::filter::{FilterKind, FilterValueSet};

pub use data_source::{
    CsvItem, DataSourceItem, ExcelItem, InMemoryItem, JsonItem, LocalFileItem, ProviderKind,
    RestItem, SqlItem,
};

/// Chart used by a visualization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChartType {
    Pivot,
    #[default]
    Grid,
    AreaChart,
    BarChart,
    BubbleChart,
    CandlestickChart,
    ColumnChart,
    ComboChart,
    DoughnutChart,
    FunnelChart,
    LineChart,
    PieChart,
    ScatterChart,
    SplineChart,
    StackedAreaChart,
    StackedBarChart,
    StackedColumnChart,
    RadialGauge,
    LinearGauge,
    BulletGraph,
    TreeMap,
    TextView,
    Indicator,
    Sparkline,
    Choropleth,
    ScatterMap,
    TimeSeriesChart,
}

/// The whole dashboard document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardModel {
    #[serde(default)]
    pub id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Dashboard-wide filters, in display order
    #[serde(default)]
    pub filters: Vec<FilterModel>,

    /// Visualizations (widgets), in display order
    #[serde(default)]
    pub widgets: Vec<WidgetModel>,

    #[serde(default)]
    pub data_sources: Vec<DataSourceItem>,
}

/// A dashboard-wide filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterModel {
    pub id: String,
    pub title: String,
    pub field_name: String,
    #[serde(default)]
    pub kind: FilterKind,
    #[serde(default)]
    pub data_source_id: Option<String>,
    #[serde(default)]
    pub selection: FilterValueSet,
}

impl FilterModel {
    pub fn new(id: impl Into<String>, title: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            field_name: field_name.into(),
            kind: FilterKind::Standard,
            data_source_id: None,
            selection: FilterValueSet::default(),
        }
    }

    pub fn date(id: impl Into<String>, title: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::Date,
            selection: FilterValueSet::AllValues,
            ..Self::new(id, title, field_name)
        }
    }
}

/// A visualization (widget)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetModel {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub chart_type: ChartType,
    #[serde(default = "default_show_title")]
    pub show_title: bool,
    #[serde(default)]
    pub data_source_id: Option<String>,
    /// Per-field filters local to this widget
    #[serde(default)]
    pub quick_filters: Vec<QuickFilterModel>,
}

fn default_show_title() -> bool {
    true
}

impl WidgetModel {
    pub fn new(id: impl Into<String>, title: impl Into<String>, chart_type: ChartType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            chart_type,
            show_title: true,
            data_source_id: None,
            quick_filters: Vec::new(),
        }
    }

    pub fn with_quick_filter(mut self, field_name: impl Into<String>) -> Self {
        self.quick_filters.push(QuickFilterModel {
            field_name: field_name.into(),
            selection: FilterValueSet::default(),
        });
        self
    }

    pub fn quick_filter(&self, field_name: &str) -> Option<&QuickFilterModel> {
        self.quick_filters.iter().find(|f| f.field_name == field_name)
    }

    pub fn quick_filter_mut(&mut self, field_name: &str) -> Option<&mut QuickFilterModel> {
        self.quick_filters.iter_mut().find(|f| f.field_name == field_name)
    }
}

/// A filter on one field of one widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickFilterModel {
    pub field_name: String,
    #[serde(default)]
    pub selection: FilterValueSet,
}

impl DashboardModel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn filter(&self, id: &str) -> Option<&FilterModel> {
        self.filters.iter().find(|f| f.id == id)
    }

    pub fn filter_index(&self, id: &str) -> Option<usize> {
        self.filters.iter().position(|f| f.id == id)
    }

    pub fn widget(&self, id: &str) -> Option<&WidgetModel> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_index(&self, id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    /// Index of the first date filter, in insertion order
    pub fn first_date_filter_index(&self) -> Option<usize> {
        self.filters.iter().position(|f| f.kind == FilterKind::Date)
    }

    pub fn data_source(&self, id: &str) -> Option<&DataSourceItem> {
        self.data_sources.iter().find(|d| d.id() == id)
    }

    /// Check the invariants a freshly loaded document must hold
    pub fn validate(&self) -> Result<(), LoadError> {
        let mut filter_ids = HashSet::new();
        for filter in &self.filters {
            if filter.id.is_empty() {
                return Err(LoadError::new(format!("filter '{}' has an empty id", filter.title)));
            }
            if !filter_ids.insert(filter.id.as_str()) {
                return Err(LoadError::new(format!("duplicate filter id '{}'", filter.id)));
            }
            if !filter.kind.accepts(&filter.selection) {
                return Err(LoadError::new(format!(
                    "filter '{}' holds a {:?} selection its kind does not support",
                    filter.id,
                    filter.selection.filter_type()
                )));
            }
            if let Some(range) = filter.selection.range() {
                if range.from() > range.to() {
                    return Err(LoadError::new(format!("filter '{}' has an inverted date range", filter.id)));
                }
            }
        }

        let mut widget_ids = HashSet::new();
        for widget in &self.widgets {
            if !widget_ids.insert(widget.id.as_str()) {
                return Err(LoadError::new(format!("duplicate visualization id '{}'", widget.id)));
            }
            let mut fields = HashSet::new();
            for quick in &widget.quick_filters {
                if !fields.insert(quick.field_name.as_str()) {
                    return Err(LoadError::new(format!(
                        "visualization '{}' has two quick filters on '{}'",
                        widget.id, quick.field_name
                    )));
                }
            }
        }

        Ok(())
    }
}
