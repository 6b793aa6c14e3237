use serde::{Deserialize, Serialize};

use super::date::{DateFilterType, DateRange, DateRule};
use super::value::{FilterRule, FilterScalar, FilterType};
use crate::error::FilterError;

/// The constraint currently applied to one field.
///
/// Exactly one representation is active at a time. An empty
/// `SelectedValues` list means every value is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "camelCase")]
pub enum FilterValueSet {
    AllValues,
    EmptyValues,
    SelectedValues(Vec<FilterScalar>),
    Rule(FilterRule),
    DateRule(DateRule),
    DateRange(DateRange),
    DateFilterType(DateFilterType),
}

impl Default for FilterValueSet {
    fn default() -> Self {
        FilterValueSet::SelectedValues(Vec::new())
    }
}

impl FilterValueSet {
    pub fn selected(values: impl IntoIterator<Item = impl Into<FilterScalar>>) -> Self {
        FilterValueSet::SelectedValues(values.into_iter().map(Into::into).collect())
    }

    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterValueSet::AllValues => FilterType::AllValues,
            FilterValueSet::EmptyValues => FilterType::FilterEmptyValues,
            FilterValueSet::SelectedValues(_) => FilterType::SelectedValues,
            FilterValueSet::Rule(_)
            | FilterValueSet::DateRule(_)
            | FilterValueSet::DateRange(_)
            | FilterValueSet::DateFilterType(_) => FilterType::FilterByRule,
        }
    }

    /// Explicit selection; empty for every other mode
    pub fn selected_values(&self) -> &[FilterScalar] {
        match self {
            FilterValueSet::SelectedValues(values) => values,
            _ => &[],
        }
    }

    pub fn set_selected_values(&mut self, values: Vec<FilterScalar>) -> Result<(), FilterError> {
        match self {
            FilterValueSet::SelectedValues(current) => {
                *current = values;
                Ok(())
            }
            other => Err(FilterError::InvalidOperation {
                operation: "set selected values",
                filter_type: other.filter_type(),
            }),
        }
    }

    pub fn with_selected_values(&self, values: Vec<FilterScalar>) -> Result<Self, FilterError> {
        let mut next = self.clone();
        next.set_selected_values(values)?;
        Ok(next)
    }

    pub fn rule(&self) -> Option<&DateRule> {
        match self {
            FilterValueSet::DateRule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn range(&self) -> Option<&DateRange> {
        match self {
            FilterValueSet::DateRange(range) => Some(range),
            _ => None,
        }
    }

    /// Setting a rule clears any range; clearing only affects an active rule
    pub fn set_rule(&mut self, rule: Option<DateRule>) {
        match rule {
            Some(rule) => *self = FilterValueSet::DateRule(rule),
            None if self.rule().is_some() => *self = FilterValueSet::AllValues,
            None => {}
        }
    }

    /// Setting a range clears any rule; clearing only affects an active range
    pub fn set_range(&mut self, range: Option<DateRange>) {
        match range {
            Some(range) => *self = FilterValueSet::DateRange(range),
            None if self.range().is_some() => *self = FilterValueSet::AllValues,
            None => {}
        }
    }

    /// Legacy named rule describing this value set, for date-capable sets
    pub fn date_filter_type(&self) -> Option<DateFilterType> {
        match self {
            FilterValueSet::AllValues => Some(DateFilterType::AllTime),
            FilterValueSet::DateRule(rule) if rule.is_all_time() => Some(DateFilterType::AllTime),
            FilterValueSet::DateRule(_) => Some(DateFilterType::CustomRule),
            FilterValueSet::DateRange(_) => Some(DateFilterType::CustomRange),
            FilterValueSet::DateFilterType(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_date_compatible(&self) -> bool {
        self.date_filter_type().is_some()
    }

    /// True when the set does not constrain the field at all
    pub fn is_unrestricted(&self) -> bool {
        match self {
            FilterValueSet::AllValues => true,
            FilterValueSet::SelectedValues(values) => values.is_empty(),
            FilterValueSet::DateRule(rule) => rule.is_all_time(),
            FilterValueSet::DateFilterType(kind) => *kind == DateFilterType::AllTime,
            _ => false,
        }
    }
}

/// Kind of a dashboard-wide filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    #[default]
    Standard,
    Date,
}

impl FilterKind {
    pub fn accepts(&self, selection: &FilterValueSet) -> bool {
        match self {
            FilterKind::Date => selection.is_date_compatible(),
            FilterKind::Standard => !matches!(
                selection,
                FilterValueSet::DateRule(_)
                    | FilterValueSet::DateRange(_)
                    | FilterValueSet::DateFilterType(_)
            ),
        }
    }

    pub fn check(&self, selection: &FilterValueSet) -> Result<(), FilterError> {
        if self.accepts(selection) {
            Ok(())
        } else {
            Err(FilterError::IncompatibleSelection {
                kind: *self,
                filter_type: selection.filter_type(),
            })
        }
    }
}
