//! View attachment registry and change fan-out.
//!
//! Views register weakly against a document. Value edits are fanned out to
//! every attached view except the one the edit came from; structural edits
//! reach every attached view.

mod attachment;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SubscriberNotificationFailure;
use crate::filter::{FilterKind, FilterValueSet};
use crate::model::ChartType;

pub use attachment::ViewAttachment;

/// Identifier of an attached view
pub type ViewId = Uuid;

/// A presentation surface that displays a dashboard.
///
/// Handlers run synchronously on the thread that made the edit. An error or a
/// panic is isolated to this view.
pub trait DashboardView: Send + Sync {
    fn view_id(&self) -> ViewId;

    /// Another surface changed a filter's selection
    fn on_filter_selection_changed(&self, change: &FilterSelectionChange) -> anyhow::Result<()>;

    /// Filters or visualizations were added, removed, moved or updated
    fn on_structure_changed(&self, change: &StructureChange) -> anyhow::Result<()>;
}

/// Which filter a change applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterIdentity {
    Global { filter_id: String },
    Quick { visualization_id: String, field_name: String },
}

impl FilterIdentity {
    pub fn global(filter_id: impl Into<String>) -> Self {
        FilterIdentity::Global {
            filter_id: filter_id.into(),
        }
    }

    pub fn quick(visualization_id: impl Into<String>, field_name: impl Into<String>) -> Self {
        FilterIdentity::Quick {
            visualization_id: visualization_id.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FilterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterIdentity::Global { filter_id } => write!(f, "'{}'", filter_id),
            FilterIdentity::Quick {
                visualization_id,
                field_name,
            } => write!(f, "'{}' on visualization '{}'", field_name, visualization_id),
        }
    }
}

/// A filter's selection changed
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelectionChange {
    pub filter: FilterIdentity,
    pub selection: FilterValueSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickFilterSummary {
    pub field_name: String,
    pub selection: FilterValueSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationSummary {
    pub id: String,
    pub title: String,
    pub chart_type: ChartType,
    pub quick_filters: Vec<QuickFilterSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSummary {
    pub id: String,
    pub title: String,
    pub field_name: String,
    pub kind: FilterKind,
    pub selection: FilterValueSet,
}

/// Full structure of a document at one point in time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentSnapshot {
    /// Stored id; changes when a save assigns one
    pub dashboard_id: Option<String>,
    pub title: String,
    pub description: String,
    pub visualizations: Vec<VisualizationSummary>,
    pub filters: Vec<FilterSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureChangeKind {
    VisualizationAdded { index: usize },
    VisualizationRemoved { index: usize, id: String },
    VisualizationMoved { from: usize, to: usize },
    VisualizationUpdated { index: usize },
    FilterAdded { index: usize },
    FilterRemoved { index: usize, id: String },
    FilterUpdated { index: usize },
    TitleChanged,
    DescriptionChanged,
    /// A save assigned the document a new stored id
    DashboardIdChanged,
}

impl StructureChangeKind {
    pub fn touches_visualizations(&self) -> bool {
        matches!(
            self,
            StructureChangeKind::VisualizationAdded { .. }
                | StructureChangeKind::VisualizationRemoved { .. }
                | StructureChangeKind::VisualizationMoved { .. }
                | StructureChangeKind::VisualizationUpdated { .. }
        )
    }

    pub fn touches_filters(&self) -> bool {
        matches!(
            self,
            StructureChangeKind::FilterAdded { .. }
                | StructureChangeKind::FilterRemoved { .. }
                | StructureChangeKind::FilterUpdated { .. }
        )
    }
}

/// A structural edit and the document structure after it
#[derive(Debug, Clone, PartialEq)]
pub struct StructureChange {
    pub kind: StructureChangeKind,
    pub snapshot: DocumentSnapshot,
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutReport {
    /// Views whose handler completed
    pub delivered: usize,
    pub failures: Vec<SubscriberNotificationFailure>,
}

impl FanOutReport {
    pub fn notified(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Token identifying one subscription of a view
pub type SubscriptionToken = u64;

struct Subscription {
    token: SubscriptionToken,
    view: Weak<dyn DashboardView>,
}

/// Weak set of views attached to one document.
///
/// A view holds at most one subscription; subscribing again replaces the
/// earlier one, and only the current token can remove it.
pub struct ViewRegistry {
    views: RwLock<AHashMap<ViewId, Subscription>>,
    next_token: AtomicU64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            views: RwLock::new(AHashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Subscribe `view`, superseding any earlier subscription of the same view
    pub fn subscribe(&self, view: &Arc<dyn DashboardView>) -> SubscriptionToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let subscription = Subscription {
            token,
            view: Arc::downgrade(view),
        };
        if self.views.write().insert(view.view_id(), subscription).is_some() {
            debug!(view = %view.view_id(), "earlier subscription superseded");
        }
        token
    }

    /// Remove the subscription if `token` still owns it
    pub fn unsubscribe(&self, view_id: &ViewId, token: SubscriptionToken) -> bool {
        let mut views = self.views.write();
        match views.get(view_id) {
            Some(subscription) if subscription.token == token => {
                views.remove(view_id);
                true
            }
            _ => false,
        }
    }

    /// True while `token` is the current subscription of a live view
    pub fn owns(&self, view_id: &ViewId, token: SubscriptionToken) -> bool {
        self.views
            .read()
            .get(view_id)
            .map(|s| s.token == token && s.view.strong_count() > 0)
            .unwrap_or(false)
    }

    pub fn contains(&self, view_id: &ViewId) -> bool {
        self.views
            .read()
            .get(view_id)
            .map(|s| s.view.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Number of live attached views
    pub fn len(&self) -> usize {
        self.views.read().values().filter(|s| s.view.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every view except `origin` of a selection change
    pub fn notify_filter_selection(&self, origin: Option<ViewId>, change: &FilterSelectionChange) -> FanOutReport {
        let views = self.live_views(origin);
        debug!(filter = %change.filter, views = views.len(), "fanning out filter selection");
        Self::deliver(views, |view| view.on_filter_selection_changed(change))
    }

    /// Notify every view of a structural change
    pub fn notify_structure(&self, change: &StructureChange) -> FanOutReport {
        let views = self.live_views(None);
        debug!(kind = ?change.kind, views = views.len(), "fanning out structure change");
        Self::deliver(views, |view| view.on_structure_changed(change))
    }

    fn live_views(&self, exclude: Option<ViewId>) -> Vec<Arc<dyn DashboardView>> {
        let mut views = self.views.write();

        // Remove any dead weak references
        views.retain(|_, s| s.view.strong_count() > 0);

        views
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter_map(|(_, s)| s.view.upgrade())
            .collect()
    }

    fn deliver<F>(views: Vec<Arc<dyn DashboardView>>, notify: F) -> FanOutReport
    where
        F: Fn(&dyn DashboardView) -> anyhow::Result<()>,
    {
        let mut report = FanOutReport::default();

        for view in views {
            let view_id = view.view_id();
            let outcome = catch_unwind(AssertUnwindSafe(|| notify(view.as_ref())));
            let message = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            let failure = SubscriberNotificationFailure { view_id, message };
            warn!("{}", failure);
            report.failures.push(failure);
        }

        report
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}
