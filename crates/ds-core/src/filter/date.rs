//! Date rules, ranges and the legacy named date filter types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Relation of a rule's period to the current date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodRelation {
    All,
    Last,
    Previous,
    ToDate,
    This,
    Next,
}

/// Time unit used by a date rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    Day,
    Week,
    Month,
    Quarter,
    Semester,
    Year,
}

/// A relative date rule, e.g. "last 3 months"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRule {
    pub period_relation: PeriodRelation,
    pub count: u32,
    pub period_type: PeriodType,
}

impl DateRule {
    /// No restriction at all
    pub const ALL_TIME: DateRule = DateRule {
        period_relation: PeriodRelation::All,
        count: 0,
        period_type: PeriodType::Day,
    };

    pub fn new(period_relation: PeriodRelation, period_type: PeriodType) -> Self {
        Self::with_count(period_relation, 1, period_type)
    }

    pub fn with_count(period_relation: PeriodRelation, count: u32, period_type: PeriodType) -> Self {
        Self {
            period_relation,
            count,
            period_type,
        }
    }

    pub fn is_all_time(&self) -> bool {
        self.period_relation == PeriodRelation::All
    }
}

/// An explicit date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, FilterError> {
        if from > to {
            return Err(FilterError::InvalidRange);
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }
}

/// Legacy named date rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateFilterType {
    AllTime,
    CustomRange,
    LastWeek,
    LastMonth,
    LastYear,
    YearToDate,
    QuarterToDate,
    MonthToDate,
    Yesterday,
    Today,
    ThisMonth,
    ThisQuarter,
    ThisYear,
    PreviousMonth,
    PreviousQuarter,
    PreviousYear,
    NextMonth,
    NextQuarter,
    NextYear,
    TrailingTwelveMonths,
    CustomRule,
}

impl DateFilterType {
    /// Equivalent relative rule, if the named type has one
    pub fn as_rule(self) -> Option<DateRule> {
        use PeriodRelation as R;
        use PeriodType as P;

        let rule = match self {
            DateFilterType::AllTime => DateRule::ALL_TIME,
            DateFilterType::LastWeek => DateRule::with_count(R::Last, 7, P::Day),
            DateFilterType::LastMonth => DateRule::with_count(R::Last, 30, P::Day),
            DateFilterType::LastYear => DateRule::with_count(R::Last, 365, P::Day),
            DateFilterType::YearToDate => DateRule::new(R::ToDate, P::Year),
            DateFilterType::QuarterToDate => DateRule::new(R::ToDate, P::Quarter),
            DateFilterType::MonthToDate => DateRule::new(R::ToDate, P::Month),
            DateFilterType::Yesterday => DateRule::new(R::Previous, P::Day),
            DateFilterType::Today => DateRule::new(R::This, P::Day),
            DateFilterType::ThisMonth => DateRule::new(R::This, P::Month),
            DateFilterType::ThisQuarter => DateRule::new(R::This, P::Quarter),
            DateFilterType::ThisYear => DateRule::new(R::This, P::Year),
            DateFilterType::PreviousMonth => DateRule::new(R::Previous, P::Month),
            DateFilterType::PreviousQuarter => DateRule::new(R::Previous, P::Quarter),
            DateFilterType::PreviousYear => DateRule::new(R::Previous, P::Year),
            DateFilterType::NextMonth => DateRule::new(R::Next, P::Month),
            DateFilterType::NextQuarter => DateRule::new(R::Next, P::Quarter),
            DateFilterType::NextYear => DateRule::new(R::Next, P::Year),
            DateFilterType::TrailingTwelveMonths => DateRule::with_count(R::Last, 12, P::Month),
            DateFilterType::CustomRange | DateFilterType::CustomRule => return None,
        };
        Some(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();

        assert_eq!(DateRange::new(late, early), Err(FilterError::InvalidRange));

        let range = DateRange::new(early, late).unwrap();
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_legacy_types_map_to_rules() {
        assert_eq!(DateFilterType::AllTime.as_rule(), Some(DateRule::ALL_TIME));
        assert_eq!(
            DateFilterType::TrailingTwelveMonths.as_rule(),
            Some(DateRule::with_count(PeriodRelation::Last, 12, PeriodType::Month))
        );
        assert_eq!(DateFilterType::CustomRange.as_rule(), None);
    }
}
