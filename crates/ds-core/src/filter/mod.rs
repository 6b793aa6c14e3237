//! Filter value sets: the atomic unit of filter state for one field

mod date;
mod selection;
mod value;

pub use date::{DateFilterType, DateRange, DateRule, PeriodRelation, PeriodType};
pub use selection::{FilterKind, FilterValueSet};
pub use value::{FilterRule, FilterScalar, FilterType, FilterValue, RuleOperation};
