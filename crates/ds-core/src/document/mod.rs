//! The dashboard document: source of truth for filters and visualizations.
//!
//! Edits are applied to the in-memory model under a write lock, the lock is
//! released, observer callbacks run, and the change is fanned out to the
//! attached views. Value edits skip the view they came from; structural edits
//! reach every view.

mod collections;
mod entities;
mod handlers;

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::SdkContext;
use crate::data::{FilterTarget, PersistenceSink, SaveReceipt};
use crate::error::{DashboardError, LoadError};
use crate::filter::FilterValueSet;
use crate::model::{container, DashboardModel, FilterModel, WidgetModel};
use crate::sync::{
    DashboardView, DocumentSnapshot, FanOutReport, FilterIdentity, FilterSelectionChange, FilterSummary,
    QuickFilterSummary, StructureChange, StructureChangeKind, SubscriptionToken, ViewAttachment, ViewId,
    ViewRegistry, VisualizationSummary,
};

pub use collections::{GlobalFilters, QuickFilters, Visualizations};
pub use entities::{DashboardFilter, DateFilter, QuickFilter, Visualization};
pub use handlers::{
    DateFilterChangedHandler, FiltersChangedHandler, PendingChangesHandler, TitleChangedHandler,
    VisualizationsChangedHandler,
};

use handlers::DashboardHandlers;

/// Outcome of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document adopted the receipt and cleared its pending changes
    Saved(SaveReceipt),
    /// The document was dropped before the save completed
    Discarded(SaveReceipt),
}

struct DocumentState {
    model: DashboardModel,
    has_pending_changes: bool,
    /// Bumped on every edit; a save only clears pending changes it captured
    revision: u64,
}

impl DocumentState {
    /// Record an edit. Returns true if the pending flag flipped.
    fn mark_pending(&mut self) -> bool {
        self.revision += 1;
        !std::mem::replace(&mut self.has_pending_changes, true)
    }

    fn date_filter_id(&self) -> Option<String> {
        self.model
            .first_date_filter_index()
            .map(|i| self.model.filters[i].id.clone())
    }
}

fn snapshot_of(model: &DashboardModel) -> DocumentSnapshot {
    DocumentSnapshot {
        dashboard_id: model.id.clone(),
        title: model.title.clone(),
        description: model.description.clone(),
        visualizations: model
            .widgets
            .iter()
            .map(|w| VisualizationSummary {
                id: w.id.clone(),
                title: w.title.clone(),
                chart_type: w.chart_type,
                quick_filters: w
                    .quick_filters
                    .iter()
                    .map(|q| QuickFilterSummary {
                        field_name: q.field_name.clone(),
                        selection: q.selection.clone(),
                    })
                    .collect(),
            })
            .collect(),
        filters: model
            .filters
            .iter()
            .map(|f| FilterSummary {
                id: f.id.clone(),
                title: f.title.clone(),
                field_name: f.field_name.clone(),
                kind: f.kind,
                selection: f.selection.clone(),
            })
            .collect(),
    }
}

fn check_index(index: usize, len: usize) -> Result<(), DashboardError> {
    if index < len {
        Ok(())
    } else {
        Err(DashboardError::IndexOutOfRange { index, len })
    }
}

/// A loaded dashboard document
pub struct Dashboard {
    state: RwLock<DocumentState>,
    views: ViewRegistry,
    handlers: DashboardHandlers,
    context: Arc<SdkContext>,
}

impl Dashboard {
    /// Load a named dashboard through the context's loader
    pub async fn load(context: &Arc<SdkContext>, dashboard_id: &str) -> Result<Arc<Self>, LoadError> {
        let loader = context
            .loader()
            .ok_or_else(|| LoadError::new("no dashboard loader configured"))?;

        let mut model = loader.fetch(dashboard_id).await?;
        if model.id.is_none() {
            model.id = Some(dashboard_id.to_string());
        }

        info!(dashboard = dashboard_id, "dashboard loaded");
        Self::from_model(context.clone(), model)
    }

    /// Decode a dashboard from container bytes
    pub async fn load_from_container(context: &Arc<SdkContext>, bytes: Vec<u8>) -> Result<Arc<Self>, LoadError> {
        let model = tokio::task::spawn_blocking(move || container::decode(&bytes))
            .await
            .map_err(|e| LoadError::new(format!("container decoding task failed: {}", e)))??;

        Self::from_model(context.clone(), model)
    }

    pub fn from_model(context: Arc<SdkContext>, model: DashboardModel) -> Result<Arc<Self>, LoadError> {
        model.validate()?;

        Ok(Arc::new(Self {
            state: RwLock::new(DocumentState {
                model,
                has_pending_changes: false,
                revision: 0,
            }),
            views: ViewRegistry::new(),
            handlers: DashboardHandlers::default(),
            context,
        }))
    }

    pub fn context(&self) -> &Arc<SdkContext> {
        &self.context
    }

    pub(crate) fn with_model<R>(&self, f: impl FnOnce(&DashboardModel) -> R) -> R {
        f(&self.state.read().model)
    }

    /// Copy of the current document model
    pub fn model(&self) -> DashboardModel {
        self.state.read().model.clone()
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        snapshot_of(&self.state.read().model)
    }

    pub fn dashboard_id(&self) -> Option<String> {
        self.state.read().model.id.clone()
    }

    pub fn title(&self) -> String {
        self.state.read().model.title.clone()
    }

    pub fn set_title(self: &Arc<Self>, title: impl Into<String>) -> Result<(), DashboardError> {
        let title = title.into();
        self.apply_structure(|model| {
            model.title = title;
            Ok(((), StructureChangeKind::TitleChanged))
        })
    }

    pub fn description(&self) -> String {
        self.state.read().model.description.clone()
    }

    pub fn set_description(self: &Arc<Self>, description: impl Into<String>) -> Result<(), DashboardError> {
        let description = description.into();
        self.apply_structure(|model| {
            model.description = description;
            Ok(((), StructureChangeKind::DescriptionChanged))
        })
    }

    /// True when the document was edited since it was loaded or last saved
    pub fn has_pending_changes(&self) -> bool {
        self.state.read().has_pending_changes
    }

    pub fn filters(self: &Arc<Self>) -> GlobalFilters {
        GlobalFilters::new(Arc::downgrade(self))
    }

    pub fn visualizations(self: &Arc<Self>) -> Visualizations {
        Visualizations::new(Arc::downgrade(self))
    }

    /// The first date filter in insertion order
    pub fn date_filter(self: &Arc<Self>) -> Option<DateFilter> {
        let state = self.state.read();
        state
            .model
            .first_date_filter_index()
            .and_then(|i| DashboardFilter::new(&state.model.filters[i], Arc::downgrade(self)).as_date_filter())
    }

    /// Replace the date filter's selection.
    ///
    /// Returns `Ok(false)` without touching the document when it has no date filter.
    pub fn set_date_filter(self: &Arc<Self>, selection: FilterValueSet) -> Result<bool, DashboardError> {
        Ok(self.commit_date_filter(None, selection)?.is_some())
    }

    // Observer callbacks; assigning replaces the previous handler, `None` clears it.

    pub fn set_on_title_changed(&self, handler: Option<TitleChangedHandler>) {
        self.handlers.title_changed.set(handler);
    }

    pub fn set_on_visualizations_changed(&self, handler: Option<VisualizationsChangedHandler>) {
        self.handlers.visualizations_changed.set(handler);
    }

    pub fn set_on_filters_changed(&self, handler: Option<FiltersChangedHandler>) {
        self.handlers.filters_changed.set(handler);
    }

    pub fn set_on_date_filter_changed(&self, handler: Option<DateFilterChangedHandler>) {
        self.handlers.date_filter_changed.set(handler);
    }

    pub fn set_on_has_pending_changes_changed(&self, handler: Option<PendingChangesHandler>) {
        self.handlers.pending_changes_changed.set(handler);
    }

    fn emit_pending(&self, changed: bool) {
        if !changed {
            return;
        }
        if let Some(handler) = self.handlers.pending_changes_changed.get() {
            handler(self.has_pending_changes());
        }
    }

    fn emit_date_filter(self: &Arc<Self>) {
        if let Some(handler) = self.handlers.date_filter_changed.get() {
            handler(self.date_filter().as_ref());
        }
    }

    /// Attach a view; the returned attachment is the view's edit surface
    pub fn subscribe(self: &Arc<Self>, view: &Arc<dyn DashboardView>) -> ViewAttachment {
        let token = self.views.subscribe(view);
        debug!(view = %view.view_id(), "view attached");
        ViewAttachment::new(view.view_id(), token, Arc::downgrade(self))
    }

    pub(crate) fn unsubscribe(&self, view_id: &ViewId, token: SubscriptionToken) {
        if self.views.unsubscribe(view_id, token) {
            debug!(view = %view_id, "view detached");
        }
    }

    pub(crate) fn owns_subscription(&self, view_id: &ViewId, token: SubscriptionToken) -> bool {
        self.views.owns(view_id, token)
    }

    pub fn is_attached(&self, view_id: &ViewId) -> bool {
        self.views.contains(view_id)
    }

    pub fn attached_views(&self) -> usize {
        self.views.len()
    }

    pub(crate) fn global_target(&self, filter_id: &str) -> Result<FilterTarget, DashboardError> {
        let state = self.state.read();
        let filter = state
            .model
            .filter(filter_id)
            .ok_or_else(|| DashboardError::UnknownFilterIdentity(FilterIdentity::global(filter_id)))?;
        Ok(FilterTarget::Global {
            dashboard_id: state.model.id.clone(),
            filter_id: filter.id.clone(),
            field_name: filter.field_name.clone(),
            data_source_id: filter.data_source_id.clone(),
        })
    }

    pub(crate) fn quick_target(&self, visualization_id: &str, field_name: &str) -> Result<FilterTarget, DashboardError> {
        let state = self.state.read();
        let widget = state
            .model
            .widget(visualization_id)
            .ok_or_else(|| DashboardError::UnknownVisualization(visualization_id.to_string()))?;
        if widget.quick_filter(field_name).is_none() {
            return Err(DashboardError::UnknownFilterIdentity(FilterIdentity::quick(
                visualization_id,
                field_name,
            )));
        }
        Ok(FilterTarget::Quick {
            dashboard_id: state.model.id.clone(),
            visualization_id: widget.id.clone(),
            field_name: field_name.to_string(),
            data_source_id: widget.data_source_id.clone(),
        })
    }

    pub(crate) fn quick_target_selection(
        &self,
        visualization_id: &str,
        field_name: &str,
    ) -> Result<FilterValueSet, DashboardError> {
        let state = self.state.read();
        let widget = state
            .model
            .widget(visualization_id)
            .ok_or_else(|| DashboardError::UnknownVisualization(visualization_id.to_string()))?;
        widget
            .quick_filter(field_name)
            .map(|q| q.selection.clone())
            .ok_or_else(|| DashboardError::UnknownFilterIdentity(FilterIdentity::quick(visualization_id, field_name)))
    }

    /// Write a global filter's selection and fan it out to every view but `origin`
    pub(crate) fn commit_filter_selection(
        self: &Arc<Self>,
        origin: Option<ViewId>,
        filter_id: &str,
        selection: FilterValueSet,
    ) -> Result<FanOutReport, DashboardError> {
        let (is_date_filter, became_pending) = {
            let mut state = self.state.write();
            let index = state
                .model
                .filter_index(filter_id)
                .ok_or_else(|| DashboardError::UnknownFilterIdentity(FilterIdentity::global(filter_id)))?;
            let is_date_filter = state.model.first_date_filter_index() == Some(index);

            let filter = &mut state.model.filters[index];
            filter.kind.check(&selection)?;
            filter.selection = selection.clone();

            (is_date_filter, state.mark_pending())
        };

        self.emit_pending(became_pending);
        if is_date_filter {
            self.emit_date_filter();
        }

        let change = FilterSelectionChange {
            filter: FilterIdentity::global(filter_id),
            selection,
        };
        Ok(self.views.notify_filter_selection(origin, &change))
    }

    /// Write the date filter's selection; `None` when there is no date filter
    pub(crate) fn commit_date_filter(
        self: &Arc<Self>,
        origin: Option<ViewId>,
        selection: FilterValueSet,
    ) -> Result<Option<FanOutReport>, DashboardError> {
        let Some(filter_id) = self.state.read().date_filter_id() else {
            debug!("dashboard has no date filter, ignoring assignment");
            return Ok(None);
        };
        self.commit_filter_selection(origin, &filter_id, selection).map(Some)
    }

    /// Write a quick filter's selection, matching the field within one visualization
    pub(crate) fn commit_quick_filter_selection(
        self: &Arc<Self>,
        origin: Option<ViewId>,
        visualization_id: &str,
        field_name: &str,
        selection: FilterValueSet,
    ) -> Result<FanOutReport, DashboardError> {
        let became_pending = {
            let mut state = self.state.write();
            let widget_index = state
                .model
                .widget_index(visualization_id)
                .ok_or_else(|| DashboardError::UnknownVisualization(visualization_id.to_string()))?;
            let quick = state.model.widgets[widget_index]
                .quick_filter_mut(field_name)
                .ok_or_else(|| {
                    DashboardError::UnknownFilterIdentity(FilterIdentity::quick(visualization_id, field_name))
                })?;
            quick.selection = selection.clone();
            state.mark_pending()
        };

        self.emit_pending(became_pending);

        let change = FilterSelectionChange {
            filter: FilterIdentity::quick(visualization_id, field_name),
            selection,
        };
        Ok(self.views.notify_filter_selection(origin, &change))
    }

    /// Apply a structural edit, then notify callbacks and every attached view.
    ///
    /// `edit` must leave the model untouched when it fails.
    fn apply_structure<R>(
        self: &Arc<Self>,
        edit: impl FnOnce(&mut DashboardModel) -> Result<(R, StructureChangeKind), DashboardError>,
    ) -> Result<R, DashboardError> {
        let (result, change, became_pending, date_filter_moved) = {
            let mut state = self.state.write();
            let date_before = state.date_filter_id();
            let (result, kind) = edit(&mut state.model)?;
            let became_pending = state.mark_pending();
            let date_filter_moved = date_before != state.date_filter_id();
            let change = StructureChange {
                kind,
                snapshot: snapshot_of(&state.model),
            };
            (result, change, became_pending, date_filter_moved)
        };

        self.emit_pending(became_pending);
        self.emit_structure_callbacks(&change.kind, &change.snapshot.title);
        if date_filter_moved {
            self.emit_date_filter();
        }

        self.views.notify_structure(&change);
        Ok(result)
    }

    fn emit_structure_callbacks(self: &Arc<Self>, kind: &StructureChangeKind, title: &str) {
        if kind.touches_visualizations() {
            if let Some(handler) = self.handlers.visualizations_changed.get() {
                handler(&self.visualizations().to_vec());
            }
        }
        if kind.touches_filters() {
            if let Some(handler) = self.handlers.filters_changed.get() {
                handler(&self.filters().to_vec());
            }
        }
        if *kind == StructureChangeKind::TitleChanged {
            if let Some(handler) = self.handlers.title_changed.get() {
                handler(title);
            }
        }
    }

    /// Insert a visualization at `index`, or at the end
    pub(crate) fn add_visualization(
        self: &Arc<Self>,
        index: Option<usize>,
        widget: WidgetModel,
    ) -> Result<Visualization, DashboardError> {
        let added = self.apply_structure(|model| {
            if model.widget(&widget.id).is_some() {
                return Err(DashboardError::DuplicateIdentity(widget.id.clone()));
            }
            let index = index.unwrap_or(model.widgets.len());
            if index > model.widgets.len() {
                return Err(DashboardError::IndexOutOfRange {
                    index,
                    len: model.widgets.len(),
                });
            }
            model.widgets.insert(index, widget.clone());
            Ok((widget, StructureChangeKind::VisualizationAdded { index }))
        })?;
        Ok(Visualization::new(&added, Arc::downgrade(self)))
    }

    pub(crate) fn remove_visualization(self: &Arc<Self>, id: &str) -> Result<WidgetModel, DashboardError> {
        self.apply_structure(|model| {
            let index = model
                .widget_index(id)
                .ok_or_else(|| DashboardError::UnknownVisualization(id.to_string()))?;
            let removed = model.widgets.remove(index);
            Ok((
                removed,
                StructureChangeKind::VisualizationRemoved {
                    index,
                    id: id.to_string(),
                },
            ))
        })
    }

    pub(crate) fn move_visualization(self: &Arc<Self>, from: usize, to: usize) -> Result<(), DashboardError> {
        self.apply_structure(|model| {
            let len = model.widgets.len();
            check_index(from, len)?;
            check_index(to, len)?;
            let widget = model.widgets.remove(from);
            model.widgets.insert(to, widget);
            Ok(((), StructureChangeKind::VisualizationMoved { from, to }))
        })
    }

    /// Replace a visualization's model, matched by id
    pub(crate) fn update_visualization(self: &Arc<Self>, widget: WidgetModel) -> Result<(), DashboardError> {
        self.apply_structure(|model| {
            let index = model
                .widget_index(&widget.id)
                .ok_or_else(|| DashboardError::UnknownVisualization(widget.id.clone()))?;
            model.widgets[index] = widget;
            Ok(((), StructureChangeKind::VisualizationUpdated { index }))
        })
    }

    /// Insert a filter; an empty id is replaced by a generated one
    pub(crate) fn add_filter(
        self: &Arc<Self>,
        index: Option<usize>,
        mut filter: FilterModel,
    ) -> Result<DashboardFilter, DashboardError> {
        if filter.id.is_empty() {
            filter.id = Uuid::new_v4().to_string();
        }
        filter.kind.check(&filter.selection)?;

        let added = self.apply_structure(|model| {
            if model.filter(&filter.id).is_some() {
                return Err(DashboardError::DuplicateIdentity(filter.id.clone()));
            }
            let index = index.unwrap_or(model.filters.len());
            if index > model.filters.len() {
                return Err(DashboardError::IndexOutOfRange {
                    index,
                    len: model.filters.len(),
                });
            }
            model.filters.insert(index, filter.clone());
            Ok((filter, StructureChangeKind::FilterAdded { index }))
        })?;
        Ok(DashboardFilter::new(&added, Arc::downgrade(self)))
    }

    pub(crate) fn remove_filter(self: &Arc<Self>, id: &str) -> Result<FilterModel, DashboardError> {
        self.apply_structure(|model| {
            let index = model
                .filter_index(id)
                .ok_or_else(|| DashboardError::UnknownFilterIdentity(FilterIdentity::global(id)))?;
            let removed = model.filters.remove(index);
            Ok((
                removed,
                StructureChangeKind::FilterRemoved {
                    index,
                    id: id.to_string(),
                },
            ))
        })
    }

    /// Rebind a filter to another field or data source; id, title and kind are kept
    pub(crate) fn update_filter(self: &Arc<Self>, filter: FilterModel) -> Result<(), DashboardError> {
        self.apply_structure(|model| {
            let index = model
                .filter_index(&filter.id)
                .ok_or_else(|| DashboardError::UnknownFilterIdentity(FilterIdentity::global(&filter.id)))?;
            let current = &mut model.filters[index];
            current.kind.check(&filter.selection)?;
            current.field_name = filter.field_name;
            current.data_source_id = filter.data_source_id;
            current.selection = filter.selection;
            Ok(((), StructureChangeKind::FilterUpdated { index }))
        })
    }

    /// Serialize the document into container bytes
    pub fn serialize(&self) -> Result<Vec<u8>, DashboardError> {
        container::encode(&self.state.read().model).map_err(|e| DashboardError::Save(e.to_string()))
    }

    /// Serialize under a different title, leaving the document untouched
    pub fn serialize_with_new_name(&self, name: &str) -> Result<Vec<u8>, DashboardError> {
        self.serialize_revision(name).0
    }

    /// Container bytes under `name`, and the revision they capture
    fn serialize_revision(&self, name: &str) -> (Result<Vec<u8>, DashboardError>, u64) {
        let (mut model, revision) = {
            let state = self.state.read();
            (state.model.clone(), state.revision)
        };
        model.title = name.to_string();
        let bytes = container::encode(&model).map_err(|e| DashboardError::Save(e.to_string()));
        (bytes, revision)
    }

    /// Persist the document through `sink`, optionally under a new name.
    ///
    /// The returned future holds no strong reference to the document; if the
    /// document is gone when the sink completes, the result is discarded.
    /// Edits made while the sink is busy stay pending.
    pub fn save(
        self: &Arc<Self>,
        sink: Arc<dyn PersistenceSink>,
        name: Option<String>,
    ) -> impl Future<Output = Result<SaveOutcome, DashboardError>> + Send + 'static {
        let weak = Arc::downgrade(self);
        let name = name.unwrap_or_else(|| self.title());
        let (prepared, revision) = self.serialize_revision(&name);

        async move {
            let bytes = prepared?;
            let receipt = sink
                .save(&name, bytes)
                .await
                .map_err(|e| DashboardError::Save(e.to_string()))?;

            match weak.upgrade() {
                Some(dashboard) => {
                    dashboard.finish_save(&receipt, Some(name), Some(revision));
                    Ok(SaveOutcome::Saved(receipt))
                }
                None => {
                    debug!(dashboard = %receipt.dashboard_id, "dashboard dropped before save completed");
                    Ok(SaveOutcome::Discarded(receipt))
                }
            }
        }
    }

    /// Save-completed signal for the document as it is now: adopt the stored
    /// id (and title) and clear pending changes
    pub fn save_finished(self: &Arc<Self>, receipt: &SaveReceipt, title: Option<String>) {
        self.finish_save(receipt, title, None);
    }

    /// Adopt the id and title of a completed save. Pending changes are cleared
    /// only if no edit happened after `saved_revision` was serialized.
    fn finish_save(self: &Arc<Self>, receipt: &SaveReceipt, title: Option<String>, saved_revision: Option<u64>) {
        let (change, cleared) = {
            let mut state = self.state.write();
            let id_changed = state.model.id.as_deref() != Some(receipt.dashboard_id.as_str());
            state.model.id = Some(receipt.dashboard_id.clone());

            let title_changed = match title {
                Some(title) if title != state.model.title => {
                    state.model.title = title;
                    true
                }
                _ => false,
            };
            let kind = if title_changed {
                Some(StructureChangeKind::TitleChanged)
            } else if id_changed {
                Some(StructureChangeKind::DashboardIdChanged)
            } else {
                None
            };
            let change = kind.map(|kind| StructureChange {
                kind,
                snapshot: snapshot_of(&state.model),
            });

            let up_to_date = saved_revision.map_or(true, |r| r == state.revision);
            let cleared = up_to_date && std::mem::replace(&mut state.has_pending_changes, false);
            if !up_to_date {
                debug!(dashboard = %receipt.dashboard_id, "edited during save, changes stay pending");
            }
            (change, cleared)
        };

        info!(dashboard = %receipt.dashboard_id, "dashboard saved");
        if let Some(change) = change {
            self.emit_structure_callbacks(&change.kind, &change.snapshot.title);
            self.views.notify_structure(&change);
        }
        self.emit_pending(cleared);
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Dashboard")
            .field("id", &state.model.id)
            .field("title", &state.model.title)
            .field("filters", &state.model.filters.len())
            .field("visualizations", &state.model.widgets.len())
            .field("has_pending_changes", &state.has_pending_changes)
            .finish()
    }
}

#[cfg(test)]
mod tests;
