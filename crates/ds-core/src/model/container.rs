//! Self-contained binary container for a dashboard document.
//!
//! Layout: 4-byte magic `RDSH`, one format version byte, then the JSON
//! encoding of the [`DashboardModel`].

use super::DashboardModel;
use crate::error::LoadError;

pub const MAGIC: &[u8; 4] = b"RDSH";
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1;

/// Encode a model into container bytes
pub fn encode(model: &DashboardModel) -> Result<Vec<u8>, serde_json::Error> {
    let payload = serde_json::to_vec(model)?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode and validate container bytes
pub fn decode(bytes: &[u8]) -> Result<DashboardModel, LoadError> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(LoadError::new("not a dashboard container"));
    }

    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(LoadError::new(format!(
            "unsupported container version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let model: DashboardModel = serde_json::from_slice(&bytes[HEADER_LEN..])
        .map_err(|e| LoadError::new(format!("malformed dashboard payload: {}", e)))?;
    model.validate()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartType, FilterModel, WidgetModel};

    #[test]
    fn test_encoded_container_decodes_to_same_model() {
        let mut model = DashboardModel::new("Manufacturing");
        model.filters.push(FilterModel::new("f1", "Country", "Country"));
        model
            .widgets
            .push(WidgetModel::new("w1", "Units", ChartType::ColumnChart).with_quick_filter("Region"));

        let bytes = encode(&model).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(decode(&bytes).unwrap(), model);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(b"PK\x03\x04 zip").unwrap_err();
        assert_eq!(err.message, "not a dashboard container");

        let err = decode(b"RDSH\x09{}").unwrap_err();
        assert!(err.message.contains("unsupported container version 9"));

        let err = decode(b"RDSH\x01{not json").unwrap_err();
        assert!(err.message.starts_with("malformed dashboard payload"));
    }
}
