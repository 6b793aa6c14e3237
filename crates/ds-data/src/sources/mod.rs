//! Value domain providers

mod csv_domain;

pub use csv_domain::CsvValueDomain;
