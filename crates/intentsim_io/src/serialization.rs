//! JSON helpers. Plain JSON for anything human-facing, gzip-wrapped JSON for
//! compact saves.

use crate::error::{IoError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Compact JSON.
pub fn to_json<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string(data).map_err(|e| IoError::encode("json", e.to_string()))
}

/// Serializes data to pretty-printed JSON.
pub fn to_json_pretty<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(data).map_err(|e| IoError::encode("json", e.to_string()))
}

/// Deserializes data from a JSON string. Blank input is a validation error.
pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }

    serde_json::from_str(json).map_err(|e| IoError::decode("json", e.to_string()))
}

/// JSON bytes wrapped in gzip.
pub fn to_gz_json<T>(data: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let json = to_json(data)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| IoError::encode("gzip", e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| IoError::encode("gzip", e.to_string()))
}

pub fn from_gz_json<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let mut decoder = GzDecoder::new(bytes);
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .map_err(|e| IoError::decode("gzip", e.to_string()))?;
    from_json(&json)
}

/// Writes pretty JSON to a file.
pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {:?}", path.as_ref()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentsim_data::SimulationSnapshot;

    #[test]
    fn test_empty_json_fails() {
        let result: Result<SimulationSnapshot> = from_json("  ");
        assert!(matches!(result, Err(IoError::Validation(_))));
    }

    #[test]
    fn test_invalid_json_fails() {
        let result: Result<SimulationSnapshot> = from_json("{ not json");
        assert!(matches!(result, Err(IoError::Decode { format: "json", .. })));
    }

    #[test]
    fn test_gz_json_is_smaller_and_decodes() {
        let values: Vec<f64> = vec![0.25; 2000];
        let bytes = to_gz_json(&values).unwrap();
        assert!(bytes.len() < to_json(&values).unwrap().len());
        let back: Vec<f64> = from_gz_json(&bytes).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_gz_rejects_plain_bytes() {
        let result: Result<Vec<f64>> = from_gz_json(b"[1.0, 2.0]");
        assert!(matches!(result, Err(IoError::Decode { format: "gzip", .. })));
    }

    #[test]
    fn test_json_file_round_trip() {
        let path = std::env::temp_dir().join(format!("intentsim-{}.json", uuid::Uuid::new_v4()));
        let snapshot = SimulationSnapshot {
            frame: 9,
            particle_count: 3,
            ..Default::default()
        };
        write_json_file(&snapshot, &path).unwrap();
        let back: SimulationSnapshot = from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, snapshot);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unwritable_path_has_context() {
        let err = write_json_file(&SimulationSnapshot::default(), "/nonexistent/dir/intentsim.json")
            .unwrap_err();
        assert!(err.to_string().contains("writing JSON"));
        assert!(matches!(err.root(), IoError::FileSystem(_)));
    }
}
