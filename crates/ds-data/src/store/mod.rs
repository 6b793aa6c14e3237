//! Dashboard loaders and persistence sinks

mod local_file;
mod memory;

pub use local_file::LocalFileStore;
pub use memory::InMemoryStore;

use crate::StoreError;

/// Store identifier for a dashboard name: lowercase, runs of other characters become `-`
pub fn dashboard_id_for(name: &str) -> Result<String, StoreError> {
    let mut id = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            id.extend(c.to_lowercase());
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    let id = id.trim_end_matches('-').to_string();

    if id.is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(id)
}

/// Reject ids that could escape the store
pub(crate) fn check_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(|c: char| c == '/' || c == '\\')
        && !id.contains("..");
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_id_for() {
        assert_eq!(dashboard_id_for("Manufacturing").unwrap(), "manufacturing");
        assert_eq!(dashboard_id_for("  Sales / Q1 2024 ").unwrap(), "sales-q1-2024");
        assert_eq!(dashboard_id_for("ops_daily").unwrap(), "ops_daily");
        assert!(dashboard_id_for(" // ").is_err());
    }

    #[test]
    fn test_check_id_rejects_traversal() {
        assert!(check_id("sales").is_ok());
        assert!(check_id("../etc/passwd").is_err());
        assert!(check_id("a/b").is_err());
        assert!(check_id(".hidden").is_err());
        assert!(check_id("").is_err());
    }
}
