//! Handles onto filters and visualizations of a dashboard.
//!
//! Handles carry only their identity and a weak reference to the document.
//! Every getter re-reads the document model.

use std::fmt;
use std::sync::{Arc, Weak};

use super::{collections::QuickFilters, Dashboard};
use crate::data::FilterTarget;
use crate::error::DashboardError;
use crate::filter::{
    DateFilterType, DateRange, DateRule, FilterKind, FilterScalar, FilterType, FilterValue, FilterValueSet,
};
use crate::model::{ChartType, DataSourceItem, FilterModel, QuickFilterModel, WidgetModel};
use crate::sync::{FanOutReport, FilterIdentity};

fn upgrade(dashboard: &Weak<Dashboard>) -> Result<Arc<Dashboard>, DashboardError> {
    dashboard.upgrade().ok_or(DashboardError::Detached)
}

async fn fetch_values(
    dashboard: &Weak<Dashboard>,
    target: impl FnOnce(&Dashboard) -> Result<FilterTarget, DashboardError>,
) -> Result<Vec<FilterValue>, DashboardError> {
    let (provider, target, limit) = {
        let dashboard = upgrade(dashboard)?;
        let target = target(&dashboard)?;
        let provider = dashboard
            .context()
            .value_domain()
            .ok_or_else(|| DashboardError::ValueDomain("no value domain provider configured".to_string()))?;
        (provider, target, dashboard.context().settings().max_filter_values)
    };

    let mut values = provider
        .filter_values(&target)
        .await
        .map_err(|e| DashboardError::ValueDomain(e.to_string()))?;
    if limit > 0 {
        values.truncate(limit);
    }
    Ok(values)
}

/// A dashboard-wide filter
#[derive(Clone)]
pub struct DashboardFilter {
    id: String,
    title: String,
    kind: FilterKind,
    dashboard: Weak<Dashboard>,
}

impl DashboardFilter {
    pub(crate) fn new(model: &FilterModel, dashboard: Weak<Dashboard>) -> Self {
        Self {
            id: model.id.clone(),
            title: model.title.clone(),
            kind: model.kind,
            dashboard,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn is_date(&self) -> bool {
        self.kind == FilterKind::Date
    }

    pub fn as_date_filter(&self) -> Option<DateFilter> {
        self.is_date().then(|| DateFilter(self.clone()))
    }

    fn read<R>(&self, f: impl FnOnce(&FilterModel) -> R) -> Result<R, DashboardError> {
        upgrade(&self.dashboard)?
            .with_model(|model| model.filter(&self.id).map(f))
            .ok_or_else(|| DashboardError::UnknownFilterIdentity(FilterIdentity::global(&self.id)))
    }

    pub fn field_name(&self) -> Result<String, DashboardError> {
        self.read(|f| f.field_name.clone())
    }

    pub fn selection(&self) -> Result<FilterValueSet, DashboardError> {
        self.read(|f| f.selection.clone())
    }

    /// Current selection; empty means all values are selected
    pub fn selected_values(&self) -> Result<Vec<FilterScalar>, DashboardError> {
        self.read(|f| f.selection.selected_values().to_vec())
    }

    pub fn filter_type(&self) -> Result<FilterType, DashboardError> {
        self.read(|f| f.selection.filter_type())
    }

    pub fn set_selected_values(&self, values: Vec<FilterScalar>) -> Result<FanOutReport, DashboardError> {
        let next = self.selection()?.with_selected_values(values)?;
        self.set_selection(next)
    }

    pub fn set_selection(&self, selection: FilterValueSet) -> Result<FanOutReport, DashboardError> {
        upgrade(&self.dashboard)?.commit_filter_selection(None, &self.id, selection)
    }

    /// All values the filter could be set to, as reported by the value domain provider
    pub async fn filter_values(&self) -> Result<Vec<FilterValue>, DashboardError> {
        fetch_values(&self.dashboard, |dashboard| dashboard.global_target(&self.id)).await
    }
}

impl fmt::Debug for DashboardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardFilter")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The date filter of a dashboard
#[derive(Debug, Clone)]
pub struct DateFilter(DashboardFilter);

impl DateFilter {
    pub fn id(&self) -> &str {
        self.0.id()
    }

    pub fn title(&self) -> &str {
        self.0.title()
    }

    pub fn filter(&self) -> &DashboardFilter {
        &self.0
    }

    pub fn selection(&self) -> Result<FilterValueSet, DashboardError> {
        self.0.selection()
    }

    pub fn rule(&self) -> Result<Option<DateRule>, DashboardError> {
        self.0.read(|f| f.selection.rule().copied())
    }

    pub fn range(&self) -> Result<Option<DateRange>, DashboardError> {
        self.0.read(|f| f.selection.range().copied())
    }

    pub fn date_filter_type(&self) -> Result<DateFilterType, DashboardError> {
        self.0.read(|f| f.selection.date_filter_type().unwrap_or(DateFilterType::AllTime))
    }

    /// Clears any range when `rule` is set
    pub fn set_rule(&self, rule: Option<DateRule>) -> Result<FanOutReport, DashboardError> {
        let mut next = self.selection()?;
        next.set_rule(rule);
        self.0.set_selection(next)
    }

    /// Clears any rule when `range` is set
    pub fn set_range(&self, range: Option<DateRange>) -> Result<FanOutReport, DashboardError> {
        let mut next = self.selection()?;
        next.set_range(range);
        self.0.set_selection(next)
    }
}

/// A filter local to one visualization, identified by its field name
#[derive(Clone)]
pub struct QuickFilter {
    visualization_id: String,
    field_name: String,
    dashboard: Weak<Dashboard>,
}

impl QuickFilter {
    pub(crate) fn new(visualization_id: &str, model: &QuickFilterModel, dashboard: Weak<Dashboard>) -> Self {
        Self {
            visualization_id: visualization_id.to_string(),
            field_name: model.field_name.clone(),
            dashboard,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn visualization_id(&self) -> &str {
        &self.visualization_id
    }

    fn read<R>(&self, f: impl FnOnce(&QuickFilterModel) -> R) -> Result<R, DashboardError> {
        upgrade(&self.dashboard)?.with_model(|model| {
            let widget = model
                .widget(&self.visualization_id)
                .ok_or_else(|| DashboardError::UnknownVisualization(self.visualization_id.clone()))?;
            widget.quick_filter(&self.field_name).map(f).ok_or_else(|| {
                DashboardError::UnknownFilterIdentity(FilterIdentity::quick(
                    &self.visualization_id,
                    &self.field_name,
                ))
            })
        })
    }

    pub fn selection(&self) -> Result<FilterValueSet, DashboardError> {
        self.read(|f| f.selection.clone())
    }

    pub fn selected_values(&self) -> Result<Vec<FilterScalar>, DashboardError> {
        self.read(|f| f.selection.selected_values().to_vec())
    }

    pub fn filter_type(&self) -> Result<FilterType, DashboardError> {
        self.read(|f| f.selection.filter_type())
    }

    pub fn rule(&self) -> Result<Option<DateRule>, DashboardError> {
        self.read(|f| f.selection.rule().copied())
    }

    pub fn range(&self) -> Result<Option<DateRange>, DashboardError> {
        self.read(|f| f.selection.range().copied())
    }

    pub fn set_selected_values(&self, values: Vec<FilterScalar>) -> Result<FanOutReport, DashboardError> {
        let next = self.selection()?.with_selected_values(values)?;
        upgrade(&self.dashboard)?.commit_quick_filter_selection(None, &self.visualization_id, &self.field_name, next)
    }

    pub async fn filter_values(&self) -> Result<Vec<FilterValue>, DashboardError> {
        fetch_values(&self.dashboard, |dashboard| {
            dashboard.quick_target(&self.visualization_id, &self.field_name)
        })
        .await
    }
}

impl fmt::Debug for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickFilter")
            .field("visualization_id", &self.visualization_id)
            .field("field_name", &self.field_name)
            .finish()
    }
}

/// A visualization (widget) of a dashboard
#[derive(Clone)]
pub struct Visualization {
    id: String,
    title: String,
    dashboard: Weak<Dashboard>,
}

impl Visualization {
    pub(crate) fn new(model: &WidgetModel, dashboard: Weak<Dashboard>) -> Self {
        Self {
            id: model.id.clone(),
            title: model.title.clone(),
            dashboard,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn read<R>(&self, f: impl FnOnce(&WidgetModel) -> R) -> Result<R, DashboardError> {
        upgrade(&self.dashboard)?
            .with_model(|model| model.widget(&self.id).map(f))
            .ok_or_else(|| DashboardError::UnknownVisualization(self.id.clone()))
    }

    pub fn chart_type(&self) -> Result<ChartType, DashboardError> {
        self.read(|w| w.chart_type)
    }

    pub fn show_title(&self) -> Result<bool, DashboardError> {
        self.read(|w| w.show_title)
    }

    pub fn set_show_title(&self, show: bool) -> Result<(), DashboardError> {
        let mut widget = self.read(Clone::clone)?;
        widget.show_title = show;
        upgrade(&self.dashboard)?.update_visualization(widget).map(|_| ())
    }

    pub fn referenced_data_source_id(&self) -> Result<Option<String>, DashboardError> {
        self.read(|w| w.data_source_id.clone())
    }

    pub fn data_source(&self) -> Result<Option<DataSourceItem>, DashboardError> {
        let id = match self.referenced_data_source_id()? {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(upgrade(&self.dashboard)?.with_model(|model| model.data_source(&id).cloned()))
    }

    /// Id of the resource behind the referenced data source, e.g. the file of a CSV item
    pub fn referenced_resource_data_source_id(&self) -> Result<Option<String>, DashboardError> {
        Ok(self
            .data_source()?
            .and_then(|item| item.resource_id().map(str::to_string)))
    }

    /// Quick filters, derived from the widget model on each call
    pub fn filters(&self) -> Result<QuickFilters, DashboardError> {
        let weak = self.dashboard.clone();
        self.read(|w| {
            QuickFilters::new(
                w.quick_filters
                    .iter()
                    .map(|q| QuickFilter::new(&w.id, q, weak.clone()))
                    .collect(),
            )
        })
    }

    pub fn update_filter_selected_values(
        &self,
        field_name: &str,
        values: Vec<FilterScalar>,
    ) -> Result<FanOutReport, DashboardError> {
        let dashboard = upgrade(&self.dashboard)?;
        let current = dashboard.quick_target_selection(&self.id, field_name)?;
        let next = current.with_selected_values(values)?;
        dashboard.commit_quick_filter_selection(None, &self.id, field_name, next)
    }
}

impl fmt::Debug for Visualization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visualization")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish()
    }
}
