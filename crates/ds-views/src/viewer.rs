//! Headless dashboard viewer.
//!
//! A viewer shows one dashboard at a time. Edits are applied to its local
//! state first, then committed to the dashboard through its attachment; a
//! failed commit rolls the local state back.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ds_core::sync::{FanOutReport, FilterSelectionChange, StructureChange};
use ds_core::{
    Dashboard, DashboardError, DashboardFilter, DashboardView, DataSourceItem, FilterIdentity, FilterModel,
    FilterScalar, FilterValueSet, SdkContext, SdkSettings, ThemeSettings, ViewAttachment, ViewId, Visualization, WidgetModel,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::view_state::ViewState;

/// Data sources offered when the user adds a visualization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSourceCatalog {
    /// Sources declared by the dashboard
    pub data_sources: Vec<DataSourceItem>,
    /// Extra items offered by the host application
    pub items: Vec<DataSourceItem>,
}

impl DataSourceCatalog {
    pub fn len(&self) -> usize {
        self.data_sources.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type DataSourcesRequestedHandler = Arc<dyn Fn(&mut DataSourceCatalog) + Send + Sync>;

/// A presentation surface for one dashboard
pub struct DashboardViewer {
    id: ViewId,
    context: Arc<SdkContext>,
    dashboard: RwLock<Option<Arc<Dashboard>>>,
    attachment: Mutex<Option<Arc<ViewAttachment>>>,
    state: RwLock<ViewState>,
    theme: RwLock<ThemeSettings>,
    load_generation: AtomicU64,
    data_sources_requested: RwLock<Option<DataSourcesRequestedHandler>>,
}

impl DashboardViewer {
    pub fn new(context: Arc<SdkContext>) -> Arc<Self> {
        let viewer = Arc::new(Self {
            id: Uuid::new_v4(),
            theme: RwLock::new(context.settings().theme),
            context,
            dashboard: RwLock::new(None),
            attachment: Mutex::new(None),
            state: RwLock::new(ViewState::default()),
            load_generation: AtomicU64::new(0),
            data_sources_requested: RwLock::new(None),
        });

        let weak = Arc::downgrade(&viewer);
        viewer.context.add_settings_listener(
            viewer.listener_id(),
            Arc::new(move |settings: &SdkSettings| {
                if let Some(viewer) = weak.upgrade() {
                    *viewer.theme.write() = settings.theme.clone();
                }
            }),
        );

        viewer
    }

    fn listener_id(&self) -> String {
        format!("viewer-{}", self.id)
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn context(&self) -> &Arc<SdkContext> {
        &self.context
    }

    pub fn theme(&self) -> ThemeSettings {
        self.theme.read().clone()
    }

    /// Copy of what the viewer currently shows
    pub fn state(&self) -> ViewState {
        self.state.read().clone()
    }

    pub fn dashboard(&self) -> Option<Arc<Dashboard>> {
        self.dashboard.read().clone()
    }

    /// Show `dashboard`, replacing the current one and superseding pending loads
    pub fn set_dashboard(self: &Arc<Self>, dashboard: Arc<Dashboard>) {
        self.load_generation.fetch_add(1, Ordering::SeqCst);
        self.show(dashboard);
    }

    /// Load a dashboard through the context's loader and show it.
    ///
    /// Resolves to `Ok(None)` when the viewer was dropped or another dashboard
    /// was set or loaded in the meantime; the loaded dashboard is then discarded.
    pub fn load_dashboard(
        self: &Arc<Self>,
        dashboard_id: &str,
    ) -> impl Future<Output = Result<Option<Arc<Dashboard>>, DashboardError>> + Send + 'static {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let weak: Weak<Self> = Arc::downgrade(self);
        let context = self.context.clone();
        let dashboard_id = dashboard_id.to_string();

        async move {
            let dashboard = Dashboard::load(&context, &dashboard_id).await?;

            let Some(viewer) = weak.upgrade() else {
                debug!(dashboard = %dashboard_id, "viewer dropped before load completed");
                return Ok(None);
            };
            if viewer.load_generation.load(Ordering::SeqCst) != generation {
                debug!(dashboard = %dashboard_id, "load superseded");
                return Ok(None);
            }

            viewer.show(dashboard.clone());
            Ok(Some(dashboard))
        }
    }

    /// Stop showing the current dashboard
    pub fn clear_dashboard(&self) {
        self.load_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(attachment) = self.attachment.lock().take() {
            attachment.detach();
        }
        *self.dashboard.write() = None;
        *self.state.write() = ViewState::default();
    }

    fn show(self: &Arc<Self>, dashboard: Arc<Dashboard>) {
        if let Some(previous) = self.attachment.lock().take() {
            previous.detach();
        }

        let view: Arc<dyn DashboardView> = self.clone();
        let attachment = Arc::new(dashboard.subscribe(&view));
        *self.attachment.lock() = Some(attachment);
        *self.state.write() = ViewState::from_snapshot(&dashboard.snapshot());

        info!(viewer = %self.id, dashboard = %dashboard.title(), "dashboard shown");
        *self.dashboard.write() = Some(dashboard);
    }

    fn attachment(&self) -> Result<Arc<ViewAttachment>, DashboardError> {
        self.attachment.lock().clone().ok_or(DashboardError::NotAttached)
    }

    /// Apply locally, commit, and roll back the local state if the commit fails
    fn apply<R>(
        &self,
        filter: FilterIdentity,
        selection: FilterValueSet,
        commit: impl FnOnce(&ViewAttachment, FilterValueSet) -> Result<R, DashboardError>,
    ) -> Result<R, DashboardError> {
        let attachment = self.attachment()?;
        let previous = self.state.write().set_selection(&filter, selection.clone())?;

        commit(&attachment, selection).map_err(|err| {
            debug!(filter = %filter, error = %err, "commit failed, rolling back");
            // The identity was resolved above, so restoring cannot fail
            let _ = self.state.write().set_selection(&filter, previous);
            err
        })
    }

    pub fn set_filter_selection(
        &self,
        filter_id: &str,
        selection: FilterValueSet,
    ) -> Result<FanOutReport, DashboardError> {
        self.apply(FilterIdentity::global(filter_id), selection, |attachment, selection| {
            attachment.update_filter_selection(filter_id, selection)
        })
    }

    /// Replace the selected values of a global filter; the filter must be in selected-values mode
    pub fn set_filter_selected_values(
        &self,
        filter_id: &str,
        values: Vec<FilterScalar>,
    ) -> Result<FanOutReport, DashboardError> {
        let next = self.current_selection(&FilterIdentity::global(filter_id))?
            .with_selected_values(values)?;
        self.set_filter_selection(filter_id, next)
    }

    /// Replace the selected values of a quick filter of one visualization
    pub fn set_quick_filter_selected_values(
        &self,
        visualization_id: &str,
        field_name: &str,
        values: Vec<FilterScalar>,
    ) -> Result<FanOutReport, DashboardError> {
        let filter = FilterIdentity::quick(visualization_id, field_name);
        let next = self.current_selection(&filter)?.with_selected_values(values)?;
        self.apply(filter, next, |attachment, selection| {
            attachment.update_quick_filter_selection(visualization_id, field_name, selection)
        })
    }

    /// Set the date filter; `Ok(None)` when the dashboard has no date filter
    pub fn set_date_filter(&self, selection: FilterValueSet) -> Result<Option<FanOutReport>, DashboardError> {
        let date_filter_id = self.state.read().date_filter_id().map(str::to_string);
        match date_filter_id {
            Some(filter_id) => self.apply(FilterIdentity::global(filter_id), selection, |attachment, selection| {
                attachment.update_date_filter(selection)
            }),
            None => {
                debug!(viewer = %self.id, "no date filter shown, ignoring assignment");
                Ok(None)
            }
        }
    }

    fn current_selection(&self, filter: &FilterIdentity) -> Result<FilterValueSet, DashboardError> {
        self.state
            .read()
            .selection(filter)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownFilterIdentity(filter.clone()))
    }

    pub fn set_on_data_sources_requested(&self, handler: Option<DataSourcesRequestedHandler>) {
        *self.data_sources_requested.write() = handler;
    }

    /// Data sources to offer for a new visualization, as adjusted by the host handler
    pub fn request_data_sources(&self) -> Result<DataSourceCatalog, DashboardError> {
        let dashboard = self.dashboard().ok_or(DashboardError::NotAttached)?;
        let mut catalog = DataSourceCatalog {
            data_sources: dashboard.model().data_sources,
            items: Vec::new(),
        };

        let handler = self.data_sources_requested.read().clone();
        if let Some(handler) = handler {
            handler(&mut catalog);
        }
        Ok(catalog)
    }

    pub fn add_visualization(&self, index: Option<usize>, widget: WidgetModel) -> Result<Visualization, DashboardError> {
        self.attachment()?.add_visualization(index, widget)
    }

    pub fn remove_visualization(&self, id: &str) -> Result<WidgetModel, DashboardError> {
        self.attachment()?.remove_visualization(id)
    }

    pub fn move_visualization(&self, from: usize, to: usize) -> Result<(), DashboardError> {
        self.attachment()?.move_visualization(from, to)
    }

    pub fn update_visualization(&self, widget: WidgetModel) -> Result<(), DashboardError> {
        self.attachment()?.update_visualization(widget)
    }

    pub fn add_filter(&self, index: Option<usize>, filter: FilterModel) -> Result<DashboardFilter, DashboardError> {
        self.attachment()?.add_filter(index, filter)
    }

    pub fn remove_filter(&self, id: &str) -> Result<FilterModel, DashboardError> {
        self.attachment()?.remove_filter(id)
    }

    pub fn update_filter(&self, filter: FilterModel) -> Result<(), DashboardError> {
        self.attachment()?.update_filter(filter)
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<(), DashboardError> {
        self.attachment()?.set_title(title)
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<(), DashboardError> {
        self.attachment()?.set_description(description)
    }
}

impl DashboardView for DashboardViewer {
    fn view_id(&self) -> ViewId {
        self.id
    }

    fn on_filter_selection_changed(&self, change: &FilterSelectionChange) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.set_selection(&change.filter, change.selection.clone())?;
        state.selection_notifications += 1;
        Ok(())
    }

    fn on_structure_changed(&self, change: &StructureChange) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.apply_snapshot(&change.snapshot);
        state.structure_notifications += 1;
        Ok(())
    }
}

impl Drop for DashboardViewer {
    fn drop(&mut self) {
        self.context.remove_settings_listener(&self.listener_id());
    }
}

impl std::fmt::Debug for DashboardViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardViewer").field("id", &self.id).finish()
    }
}
