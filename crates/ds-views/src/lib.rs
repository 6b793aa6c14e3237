//! Headless presentation surfaces for dashboards
//!
//! A [`DashboardViewer`] is the view half of the synchronization protocol: it
//! keeps its own copy of the filters it shows, applies edits to that copy
//! first, and follows changes made by other surfaces.

mod view_state;
mod viewer;

pub use view_state::{FilterState, ViewState, VisualizationState};
pub use viewer::{DashboardViewer, DataSourceCatalog, DataSourcesRequestedHandler};
