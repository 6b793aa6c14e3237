//! Local state of a viewer: what it currently displays

use ds_core::sync::DocumentSnapshot;
use ds_core::{ChartType, DashboardError, FilterIdentity, FilterKind, FilterValueSet};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub title: String,
    pub field_name: String,
    pub kind: FilterKind,
    pub selection: FilterValueSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationState {
    pub title: String,
    pub chart_type: ChartType,
    /// Quick filter selections keyed by field name
    pub quick_filters: IndexMap<String, FilterValueSet>,
}

/// Filters and visualizations as a viewer shows them, in display order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub dashboard_id: Option<String>,
    pub title: String,
    pub description: String,
    /// Keyed by filter id
    pub filters: IndexMap<String, FilterState>,
    /// Keyed by visualization id
    pub visualizations: IndexMap<String, VisualizationState>,
    /// Selection changes received from other surfaces
    pub selection_notifications: usize,
    /// Structure changes received
    pub structure_notifications: usize,
}

impl ViewState {
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Self {
        let mut state = Self::default();
        state.apply_snapshot(snapshot);
        state
    }

    /// Rebuild everything shown from `snapshot`, keeping the notification counters
    pub fn apply_snapshot(&mut self, snapshot: &DocumentSnapshot) {
        self.dashboard_id = snapshot.dashboard_id.clone();
        self.title = snapshot.title.clone();
        self.description = snapshot.description.clone();
        self.filters = snapshot
            .filters
            .iter()
            .map(|f| {
                (
                    f.id.clone(),
                    FilterState {
                        title: f.title.clone(),
                        field_name: f.field_name.clone(),
                        kind: f.kind,
                        selection: f.selection.clone(),
                    },
                )
            })
            .collect();
        self.visualizations = snapshot
            .visualizations
            .iter()
            .map(|v| {
                (
                    v.id.clone(),
                    VisualizationState {
                        title: v.title.clone(),
                        chart_type: v.chart_type,
                        quick_filters: v
                            .quick_filters
                            .iter()
                            .map(|q| (q.field_name.clone(), q.selection.clone()))
                            .collect(),
                    },
                )
            })
            .collect();
    }

    pub fn selection(&self, filter: &FilterIdentity) -> Option<&FilterValueSet> {
        match filter {
            FilterIdentity::Global { filter_id } => self.filters.get(filter_id).map(|f| &f.selection),
            FilterIdentity::Quick {
                visualization_id,
                field_name,
            } => self
                .visualizations
                .get(visualization_id)
                .and_then(|v| v.quick_filters.get(field_name)),
        }
    }

    /// Replace a selection and return the previous one
    pub fn set_selection(
        &mut self,
        filter: &FilterIdentity,
        selection: FilterValueSet,
    ) -> Result<FilterValueSet, DashboardError> {
        let (kind, slot) = match filter {
            FilterIdentity::Global { filter_id } => self
                .filters
                .get_mut(filter_id)
                .map(|f| (Some(f.kind), &mut f.selection)),
            FilterIdentity::Quick {
                visualization_id,
                field_name,
            } => self
                .visualizations
                .get_mut(visualization_id)
                .and_then(|v| v.quick_filters.get_mut(field_name))
                .map(|selection| (None, selection)),
        }
        .ok_or_else(|| DashboardError::UnknownFilterIdentity(filter.clone()))?;

        if let Some(kind) = kind {
            kind.check(&selection)?;
        }
        Ok(std::mem::replace(slot, selection))
    }

    /// Id of the first date filter
    pub fn date_filter_id(&self) -> Option<&str> {
        self.filters
            .iter()
            .find(|(_, f)| f.kind == FilterKind::Date)
            .map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_core::sync::{FilterSummary, QuickFilterSummary, VisualizationSummary};

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot {
            dashboard_id: Some("sales".to_string()),
            title: "Sales".to_string(),
            description: String::new(),
            visualizations: vec![VisualizationSummary {
                id: "w1".to_string(),
                title: "Revenue".to_string(),
                chart_type: ChartType::BarChart,
                quick_filters: vec![QuickFilterSummary {
                    field_name: "Region".to_string(),
                    selection: FilterValueSet::default(),
                }],
            }],
            filters: vec![
                FilterSummary {
                    id: "f1".to_string(),
                    title: "Country".to_string(),
                    field_name: "country".to_string(),
                    kind: FilterKind::Standard,
                    selection: FilterValueSet::default(),
                },
                FilterSummary {
                    id: "d1".to_string(),
                    title: "Date".to_string(),
                    field_name: "date".to_string(),
                    kind: FilterKind::Date,
                    selection: FilterValueSet::AllValues,
                },
            ],
        }
    }

    #[test]
    fn test_set_selection_returns_previous() {
        let mut state = ViewState::from_snapshot(&snapshot());
        let f1 = FilterIdentity::global("f1");

        let previous = state.set_selection(&f1, FilterValueSet::selected(["US"])).unwrap();
        assert_eq!(previous, FilterValueSet::default());
        assert_eq!(state.selection(&f1), Some(&FilterValueSet::selected(["US"])));

        let region = FilterIdentity::quick("w1", "Region");
        state.set_selection(&region, FilterValueSet::selected(["EU"])).unwrap();
        assert_eq!(state.selection(&region), Some(&FilterValueSet::selected(["EU"])));
    }

    #[test]
    fn test_set_selection_rejects_unknown_and_incompatible() {
        let mut state = ViewState::from_snapshot(&snapshot());

        let missing = FilterIdentity::quick("w1", "Country");
        assert_eq!(
            state.set_selection(&missing, FilterValueSet::AllValues),
            Err(DashboardError::UnknownFilterIdentity(missing))
        );

        let err = state
            .set_selection(&FilterIdentity::global("d1"), FilterValueSet::selected(["x"]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidOperation(_)));
        assert_eq!(
            state.selection(&FilterIdentity::global("d1")),
            Some(&FilterValueSet::AllValues)
        );
    }

    #[test]
    fn test_apply_snapshot_keeps_counters() {
        let mut state = ViewState::from_snapshot(&snapshot());
        state.structure_notifications = 2;

        let mut next = snapshot();
        next.dashboard_id = Some("sales-2024".to_string());
        next.title = "Sales 2024".to_string();
        next.filters.remove(0);
        state.apply_snapshot(&next);

        assert_eq!(state.dashboard_id.as_deref(), Some("sales-2024"));
        assert_eq!(state.title, "Sales 2024");
        assert_eq!(state.structure_notifications, 2);
        assert_eq!(state.date_filter_id(), Some("d1"));
        assert_eq!(state.filters.len(), 1);
    }
}
