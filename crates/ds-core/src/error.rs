//! Error types for the dashboard filter model

use thiserror::Error;

use crate::filter::{FilterKind, FilterType};
use crate::sync::{FilterIdentity, ViewId};

/// A dashboard failed to load or decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to load dashboard: {message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Filter mutations that are rejected locally, before reaching a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("cannot {operation} on a filter in {filter_type:?} mode")]
    InvalidOperation {
        operation: &'static str,
        filter_type: FilterType,
    },

    #[error("{filter_type:?} selection is not supported by a {kind:?} filter")]
    IncompatibleSelection {
        kind: FilterKind,
        filter_type: FilterType,
    },

    #[error("invalid date range: start is after end")]
    InvalidRange,
}

/// Errors raised by dashboard document operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] FilterError),

    #[error("unknown filter {0}")]
    UnknownFilterIdentity(FilterIdentity),

    #[error("unknown visualization '{0}'")]
    UnknownVisualization(String),

    #[error("index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("identity '{0}' is already used in this dashboard")]
    DuplicateIdentity(String),

    #[error("the dashboard this handle refers to no longer exists")]
    Detached,

    #[error("view is not attached to a dashboard")]
    NotAttached,

    #[error("value domain error: {0}")]
    ValueDomain(String),

    #[error("save failed: {0}")]
    Save(String),
}

/// A view failed to handle a fan-out notification.
///
/// Never propagated to the caller of the originating edit; collected in a
/// [`FanOutReport`](crate::sync::FanOutReport) and logged instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("view {view_id} failed to handle notification: {message}")]
pub struct SubscriberNotificationFailure {
    pub view_id: ViewId,
    pub message: String,
}
