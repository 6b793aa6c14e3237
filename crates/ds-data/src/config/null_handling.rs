//! Null value handling for value domains

use serde::{Deserialize, Serialize};

/// Cell values that never appear in a value domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Patterns to treat as null
    pub patterns: Vec<String>,

    /// Whether to trim whitespace before checking
    pub trim_whitespace: bool,

    /// Case sensitive matching
    pub case_sensitive: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                String::new(), // Empty string
                "-".to_string(),
                "N/A".to_string(),
                "null".to_string(),
                "None".to_string(),
            ],
            trim_whitespace: true,
            case_sensitive: false,
        }
    }
}

impl NullConfig {
    /// Check if a cell should be left out of the domain
    pub fn is_null(&self, value: &str) -> bool {
        let value = if self.trim_whitespace { value.trim() } else { value };

        self.patterns.iter().any(|pattern| {
            if self.case_sensitive {
                value == pattern
            } else {
                value.eq_ignore_ascii_case(pattern)
            }
        })
    }

    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let config = NullConfig::default();
        assert!(config.is_null(""));
        assert!(config.is_null("  n/a "));
        assert!(config.is_null("NULL"));
        assert!(!config.is_null("US"));
    }

    #[test]
    fn test_case_sensitive_patterns() {
        let mut config = NullConfig {
            patterns: Vec::new(),
            trim_whitespace: false,
            case_sensitive: true,
        };
        config.add_pattern("NA");
        config.add_pattern("NA");

        assert_eq!(config.patterns.len(), 1);
        assert!(config.is_null("NA"));
        assert!(!config.is_null("na"));
        assert!(!config.is_null(" NA"));
    }
}
