use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::data::model::Truncation;
use crate::error::PersistenceError;

/// Schema version written by this crate. Documents without a version are
/// version 1: a bare assets map.
pub const SCHEMA_VERSION: u64 = 2;

/// `[batch, subbatch, truncation]`, truncation `-1` meaning none.
pub type AssetSample = (u32, u32, i32);

// ---------------------------------------------------------------------------
// Snapshot document
// ---------------------------------------------------------------------------

/// Persisted form of a selection. Tables are stored by source path and
/// re-parsed on restore.
///
/// ```json
/// {
///   "version": 2,
///   "assets": { "/data/run-01.csv": [[1, 1, -1], [2, 1, 80]] },
///   "config": { "axis": { ... }, ... },
///   "metadata": { "notes": "" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: u64,
    pub assets: BTreeMap<String, Vec<AssetSample>>,
    #[serde(default)]
    pub config: Option<Config>,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotMetadata {
    pub notes: String,
}

impl SnapshotDocument {
    pub fn new(assets: BTreeMap<String, Vec<AssetSample>>, config: Config, notes: &str) -> Self {
        Self {
            version: SCHEMA_VERSION,
            assets,
            config: Some(config),
            metadata: SnapshotMetadata {
                notes: notes.to_string(),
            },
        }
    }

    pub fn read(path: &Path) -> Result<Self, PersistenceError> {
        if !path.is_file() {
            return Err(PersistenceError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: JsonValue =
            serde_json::from_str(&text).map_err(|source| PersistenceError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_value(root, path)
    }

    /// Interpret a decoded JSON value, accepting the un-versioned layout.
    pub fn from_value(root: JsonValue, path: &Path) -> Result<Self, PersistenceError> {
        let not_snapshot = |reason: String| PersistenceError::NotASnapshot {
            path: path.to_path_buf(),
            reason,
        };

        let obj = root
            .as_object()
            .ok_or_else(|| not_snapshot("top level is not an object".to_string()))?;

        let Some(version) = obj.get("version") else {
            let assets = serde_json::from_value(root)
                .map_err(|e| not_snapshot(format!("legacy assets map: {e}")))?;
            return Ok(Self {
                version: 1,
                assets,
                config: None,
                metadata: SnapshotMetadata::default(),
            });
        };

        let version = version
            .as_u64()
            .ok_or_else(|| not_snapshot(format!("version {version} is not an integer")))?;
        if version > SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        serde_json::from_value(root).map_err(|e| not_snapshot(e.to_string()))
    }

    /// Write through a temporary file so a failed save never truncates an
    /// existing snapshot.
    pub fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        let text = serde_json::to_string_pretty(self).map_err(PersistenceError::Encode)?;
        let io_err = |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)
    }
}

pub fn encode_truncation(truncation: Truncation) -> i32 {
    truncation.map_or(-1, i32::from)
}

/// `None` when the stored value is neither `-1`-like nor a percentage.
pub fn decode_truncation(value: i32) -> Option<Truncation> {
    match value {
        v if v < 0 => Some(None),
        v => u8::try_from(v).ok().filter(|p| *p <= 100).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn reads_unversioned_assets_map() {
        let root = serde_json::json!({ "/data/a.csv": [[1, 1, -1], [2, 1, 40]] });
        let doc = SnapshotDocument::from_value(root, Path::new("old.json")).unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.assets["/data/a.csv"], vec![(1, 1, -1), (2, 1, 40)]);
        assert!(doc.config.is_none());
    }

    #[test]
    fn rejects_future_versions_and_junk() {
        let root = serde_json::json!({ "version": 9, "assets": {} });
        assert!(matches!(
            SnapshotDocument::from_value(root, Path::new("x.json")),
            Err(PersistenceError::UnsupportedVersion(9))
        ));

        let root = serde_json::json!([1, 2, 3]);
        assert!(matches!(
            SnapshotDocument::from_value(root, Path::new("x.json")),
            Err(PersistenceError::NotASnapshot { .. })
        ));

        let root = serde_json::json!({ "a.csv": "not a list" });
        assert!(matches!(
            SnapshotDocument::from_value(root, Path::new("x.json")),
            Err(PersistenceError::NotASnapshot { .. })
        ));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut assets = BTreeMap::new();
        assets.insert("/data/a.csv".to_string(), vec![(1, 2, 75)]);
        let doc = SnapshotDocument::new(assets, Config::default(), "first run");

        doc.write(&path).unwrap();
        let back = SnapshotDocument::read(&path).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.metadata.notes, "first run");
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = PathBuf::from("/no/such/session.json");
        assert!(matches!(
            SnapshotDocument::read(&path),
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[test]
    fn truncation_encoding() {
        assert_eq!(encode_truncation(None), -1);
        assert_eq!(encode_truncation(Some(80)), 80);
        assert_eq!(decode_truncation(-1), Some(None));
        assert_eq!(decode_truncation(100), Some(Some(100)));
        assert_eq!(decode_truncation(101), None);
    }
}
