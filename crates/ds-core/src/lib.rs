//! Core of the dashboard filter model
//!
//! This crate owns the dashboard document, its filters and visualizations,
//! and the protocol that keeps several attached views in sync with it.

pub mod context;
pub mod data;
pub mod document;
pub mod error;
pub mod filter;
pub mod model;
pub mod sync;

// Re-export commonly used types
pub use context::{SdkContext, SdkContextBuilder, SdkSettings, ThemeSettings};
pub use data::{DashboardLoader, FilterTarget, PersistenceSink, SaveReceipt, ValueDomainProvider};
pub use document::{
    Dashboard, DashboardFilter, DateFilter, GlobalFilters, QuickFilter, QuickFilters, SaveOutcome, Visualization,
    Visualizations,
};
pub use error::{DashboardError, FilterError, LoadError, SubscriberNotificationFailure};
pub use filter::{
    DateFilterType, DateRange, DateRule, FilterKind, FilterRule, FilterScalar, FilterType, FilterValue,
    FilterValueSet, PeriodRelation, PeriodType, RuleOperation,
};
pub use model::{ChartType, DashboardModel, DataSourceItem, FilterModel, QuickFilterModel, WidgetModel};
pub use sync::{
    DashboardView, FanOutReport, FilterIdentity, FilterSelectionChange, StructureChange, StructureChangeKind,
    ViewAttachment, ViewId,
};
