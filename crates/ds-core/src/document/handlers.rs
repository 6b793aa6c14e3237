//! Single-slot observer callbacks of a dashboard.
//!
//! Assigning a handler replaces the previous one. Handlers are cloned out of
//! their slot before being called, so they may read the dashboard freely.

use std::sync::Arc;

use parking_lot::RwLock;

use super::entities::{DashboardFilter, DateFilter, Visualization};

pub type TitleChangedHandler = Arc<dyn Fn(&str) + Send + Sync>;
pub type VisualizationsChangedHandler = Arc<dyn Fn(&[Visualization]) + Send + Sync>;
pub type FiltersChangedHandler = Arc<dyn Fn(&[DashboardFilter]) + Send + Sync>;
pub type DateFilterChangedHandler = Arc<dyn Fn(Option<&DateFilter>) + Send + Sync>;
pub type PendingChangesHandler = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
pub(crate) struct DashboardHandlers {
    pub(crate) title_changed: Slot<TitleChangedHandler>,
    pub(crate) visualizations_changed: Slot<VisualizationsChangedHandler>,
    pub(crate) filters_changed: Slot<FiltersChangedHandler>,
    pub(crate) date_filter_changed: Slot<DateFilterChangedHandler>,
    pub(crate) pending_changes_changed: Slot<PendingChangesHandler>,
}

pub(crate) struct Slot<H> {
    handler: RwLock<Option<H>>,
}

impl<H> Default for Slot<H> {
    fn default() -> Self {
        Self {
            handler: RwLock::new(None),
        }
    }
}

impl<H: Clone> Slot<H> {
    pub(crate) fn set(&self, handler: Option<H>) {
        *self.handler.write() = handler;
    }

    pub(crate) fn get(&self) -> Option<H> {
        self.handler.read().clone()
    }
}
