//! Ordered collections of dashboard filters and visualizations

use std::sync::{Arc, Weak};

use super::entities::{DashboardFilter, QuickFilter, Visualization};
use super::Dashboard;

/// Live view over a dashboard's filters; reflects later additions and removals
#[derive(Clone)]
pub struct GlobalFilters {
    dashboard: Weak<Dashboard>,
}

impl GlobalFilters {
    pub(crate) fn new(dashboard: Weak<Dashboard>) -> Self {
        Self { dashboard }
    }

    fn collect(&self, pick: impl Fn(&[crate::model::FilterModel]) -> Vec<usize>) -> Vec<DashboardFilter> {
        let Some(dashboard) = self.dashboard.upgrade() else {
            return Vec::new();
        };
        dashboard.with_model(|model| {
            pick(&model.filters)
                .into_iter()
                .map(|i| DashboardFilter::new(&model.filters[i], Arc::downgrade(&dashboard)))
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.dashboard
            .upgrade()
            .map(|d| d.with_model(|m| m.filters.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<DashboardFilter> {
        self.collect(|filters| if index < filters.len() { vec![index] } else { Vec::new() })
            .pop()
    }

    /// First filter with this id (case sensitive)
    pub fn get_by_id(&self, id: &str) -> Option<DashboardFilter> {
        self.collect(|filters| filters.iter().position(|f| f.id == id).into_iter().collect())
            .pop()
    }

    /// First filter with this title (case sensitive)
    pub fn get_by_title(&self, title: &str) -> Option<DashboardFilter> {
        self.collect(|filters| filters.iter().position(|f| f.title == title).into_iter().collect())
            .pop()
    }

    pub fn to_vec(&self) -> Vec<DashboardFilter> {
        self.collect(|filters| (0..filters.len()).collect())
    }

    pub fn iter(&self) -> std::vec::IntoIter<DashboardFilter> {
        self.to_vec().into_iter()
    }
}

/// Live view over a dashboard's visualizations
#[derive(Clone)]
pub struct Visualizations {
    dashboard: Weak<Dashboard>,
}

impl Visualizations {
    pub(crate) fn new(dashboard: Weak<Dashboard>) -> Self {
        Self { dashboard }
    }

    fn collect(&self, pick: impl Fn(&[crate::model::WidgetModel]) -> Vec<usize>) -> Vec<Visualization> {
        let Some(dashboard) = self.dashboard.upgrade() else {
            return Vec::new();
        };
        dashboard.with_model(|model| {
            pick(&model.widgets)
                .into_iter()
                .map(|i| Visualization::new(&model.widgets[i], Arc::downgrade(&dashboard)))
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.dashboard
            .upgrade()
            .map(|d| d.with_model(|m| m.widgets.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Visualization> {
        self.collect(|widgets| if index < widgets.len() { vec![index] } else { Vec::new() })
            .pop()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Visualization> {
        self.collect(|widgets| widgets.iter().position(|w| w.id == id).into_iter().collect())
            .pop()
    }

    pub fn get_by_title(&self, title: &str) -> Option<Visualization> {
        self.collect(|widgets| widgets.iter().position(|w| w.title == title).into_iter().collect())
            .pop()
    }

    pub fn to_vec(&self) -> Vec<Visualization> {
        self.collect(|widgets| (0..widgets.len()).collect())
    }

    pub fn iter(&self) -> std::vec::IntoIter<Visualization> {
        self.to_vec().into_iter()
    }
}

/// Quick filters of one visualization, computed when requested
#[derive(Debug, Clone, Default)]
pub struct QuickFilters {
    filters: Vec<QuickFilter>,
}

impl QuickFilters {
    pub(crate) fn new(filters: Vec<QuickFilter>) -> Self {
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QuickFilter> {
        self.filters.get(index)
    }

    /// First filter on this field (case sensitive)
    pub fn get_by_field_name(&self, field_name: &str) -> Option<&QuickFilter> {
        self.filters.iter().find(|f| f.field_name() == field_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuickFilter> {
        self.filters.iter()
    }
}

impl IntoIterator for QuickFilters {
    type Item = QuickFilter;
    type IntoIter = std::vec::IntoIter<QuickFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.into_iter()
    }
}
