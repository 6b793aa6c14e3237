use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::document::{Dashboard, DashboardFilter, Visualization};
use crate::error::DashboardError;
use crate::filter::FilterValueSet;
use crate::model::{FilterModel, WidgetModel};

use super::{FanOutReport, SubscriptionToken, ViewId};

/// Edit surface handed to a view when it subscribes to a dashboard.
///
/// Value edits made through an attachment are not echoed back to its view.
/// Dropping the attachment detaches the view. Subscribing the same view again
/// supersedes this attachment, which then behaves as detached.
pub struct ViewAttachment {
    view_id: ViewId,
    token: SubscriptionToken,
    dashboard: Weak<Dashboard>,
    detached: AtomicBool,
}

impl ViewAttachment {
    pub(crate) fn new(view_id: ViewId, token: SubscriptionToken, dashboard: Weak<Dashboard>) -> Self {
        Self {
            view_id,
            token,
            dashboard,
            detached: AtomicBool::new(false),
        }
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// The attached dashboard, if it is still alive and this attachment is current
    pub fn dashboard(&self) -> Option<Arc<Dashboard>> {
        self.live().ok()
    }

    pub fn is_attached(&self) -> bool {
        self.dashboard().is_some()
    }

    /// Stop receiving notifications. Idempotent.
    pub fn detach(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(dashboard) = self.dashboard.upgrade() {
            dashboard.unsubscribe(&self.view_id, self.token);
        }
    }

    fn live(&self) -> Result<Arc<Dashboard>, DashboardError> {
        if self.detached.load(Ordering::Acquire) {
            return Err(DashboardError::NotAttached);
        }
        let dashboard = self.dashboard.upgrade().ok_or(DashboardError::Detached)?;
        if !dashboard.owns_subscription(&self.view_id, self.token) {
            return Err(DashboardError::NotAttached);
        }
        Ok(dashboard)
    }

    pub fn update_filter_selection(
        &self,
        filter_id: &str,
        selection: FilterValueSet,
    ) -> Result<FanOutReport, DashboardError> {
        self.live()?
            .commit_filter_selection(Some(self.view_id), filter_id, selection)
    }

    pub fn update_quick_filter_selection(
        &self,
        visualization_id: &str,
        field_name: &str,
        selection: FilterValueSet,
    ) -> Result<FanOutReport, DashboardError> {
        self.live()?
            .commit_quick_filter_selection(Some(self.view_id), visualization_id, field_name, selection)
    }

    /// `Ok(None)` when the dashboard has no date filter
    pub fn update_date_filter(&self, selection: FilterValueSet) -> Result<Option<FanOutReport>, DashboardError> {
        self.live()?.commit_date_filter(Some(self.view_id), selection)
    }

    pub fn add_visualization(&self, index: Option<usize>, widget: WidgetModel) -> Result<Visualization, DashboardError> {
        self.live()?.add_visualization(index, widget)
    }

    pub fn remove_visualization(&self, id: &str) -> Result<WidgetModel, DashboardError> {
        self.live()?.remove_visualization(id)
    }

    pub fn move_visualization(&self, from: usize, to: usize) -> Result<(), DashboardError> {
        self.live()?.move_visualization(from, to)
    }

    pub fn update_visualization(&self, widget: WidgetModel) -> Result<(), DashboardError> {
        self.live()?.update_visualization(widget)
    }

    pub fn add_filter(&self, index: Option<usize>, filter: FilterModel) -> Result<DashboardFilter, DashboardError> {
        self.live()?.add_filter(index, filter)
    }

    pub fn remove_filter(&self, id: &str) -> Result<FilterModel, DashboardError> {
        self.live()?.remove_filter(id)
    }

    pub fn update_filter(&self, filter: FilterModel) -> Result<(), DashboardError> {
        self.live()?.update_filter(filter)
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<(), DashboardError> {
        self.live()?.set_title(title)
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<(), DashboardError> {
        self.live()?.set_description(description)
    }
}

impl Drop for ViewAttachment {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ViewAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewAttachment")
            .field("view_id", &self.view_id)
            .field("detached", &self.detached.load(Ordering::Relaxed))
            .finish()
    }
}
