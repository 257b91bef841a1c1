//! The key list — a versioned manifest mapping key pair names to
//! content identifiers and metadata.
//!
//! Persisted as a single flat JSON object:
//!
//! ```json
//! {
//!     "__version": "1.0",
//!     "default": {
//!         "file": "<contentId>",
//!         "requiresPassword": false,
//!         "binaryOutput": false,
//!         "hashAlgorithm": "sha256"
//!     }
//! }
//! ```
//!
//! The `__version` entry shares the object with the named records, so
//! that key is reserved and can never name a key pair. Records are kept
//! in a `BTreeMap`: listing order is lexicographic and stable across
//! reloads, and insertion order is deliberately NOT preserved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KeyStoreError, Result};

/// File name of the key list inside the store's root directory.
pub const KEY_LIST_FILE_NAME: &str = "key-list.json";

/// Key list format version this library reads and writes.
///
/// A file carrying any other version is rejected outright; the engine
/// never guesses forward or backward compatibility.
pub const FORMAT_VERSION: &str = "1.0";

/// Reserved key holding the format version inside the JSON object.
pub const VERSION_KEY: &str = "__version";

/// One record per named key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Content identifier: hex SHA-256 of the private key bytes, used as
    /// the file-name stem of both key files.
    pub file: String,
    /// Whether a pass phrase is needed to load the private key.
    #[serde(rename = "requiresPassword")]
    pub requires_password: bool,
    /// Whether sealed payloads are raw bytes rather than base64 text.
    #[serde(rename = "binaryOutput")]
    pub binary_output: bool,
    /// Hash algorithm identifier for the sealing layer.
    #[serde(rename = "hashAlgorithm")]
    pub hash_algorithm: String,
}

/// Versioned mapping from key pair name to [`ManifestRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    version: String,
    records: BTreeMap<String, ManifestRecord>,
}

impl Manifest {
    /// Create an empty manifest stamped with the current format version.
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            records: BTreeMap::new(),
        }
    }

    /// The format version the manifest was created or parsed with.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Upsert the record for `name`, returning the previous record if any.
    pub fn insert(&mut self, name: impl Into<String>, record: ManifestRecord) -> Option<ManifestRecord> {
        self.records.insert(name.into(), record)
    }

    /// Look up the record for `name`.
    pub fn get(&self, name: &str) -> Option<&ManifestRecord> {
        self.records.get(name)
    }

    /// Whether a record exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// All key pair names, lexicographically ordered. The version entry
    /// is not a record and never appears here.
    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the manifest holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to the flat JSON object format.
    pub fn to_json(&self) -> Result<String> {
        let mut map = serde_json::Map::with_capacity(self.records.len() + 1);
        map.insert(VERSION_KEY.to_string(), Value::String(self.version.clone()));
        for (name, record) in &self.records {
            let value = serde_json::to_value(record).map_err(|e| {
                KeyStoreError::Write(format!("failed to encode key list record {name}: {e}"))
            })?;
            map.insert(name.clone(), value);
        }
        serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| KeyStoreError::Write(format!("failed to encode key list: {e}")))
    }

    /// Parse the flat JSON object format.
    ///
    /// The version value is captured as-is; comparing it against
    /// [`FORMAT_VERSION`] is the caller's decision so that the mismatch
    /// can be reported with both versions.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| KeyStoreError::Read(format!("failed to parse key list: {e}")))?;
        let Value::Object(map) = value else {
            return Err(KeyStoreError::Read(
                "key list must be a JSON object".to_string(),
            ));
        };

        let mut version = None;
        let mut records = BTreeMap::new();
        for (key, value) in map {
            if key == VERSION_KEY {
                let Value::String(v) = value else {
                    return Err(KeyStoreError::Read(
                        "key list __version must be a string".to_string(),
                    ));
                };
                version = Some(v);
                continue;
            }
            let record: ManifestRecord = serde_json::from_value(value).map_err(|e| {
                KeyStoreError::Read(format!("malformed key list record {key}: {e}"))
            })?;
            records.insert(key, record);
        }

        let version = version.ok_or_else(|| {
            KeyStoreError::Read("key list is missing the __version entry".to_string())
        })?;

        Ok(Self { version, records })
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stem: &str) -> ManifestRecord {
        ManifestRecord {
            file: stem.to_string(),
            requires_password: false,
            binary_output: false,
            hash_algorithm: "sha256".to_string(),
        }
    }

    #[test]
    fn test_new_manifest_carries_current_version() {
        let manifest = Manifest::new();
        assert_eq!(manifest.version(), FORMAT_VERSION);
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut manifest = Manifest::new();
        manifest.insert(
            "default",
            ManifestRecord {
                file: "abc123".to_string(),
                requires_password: true,
                binary_output: true,
                hash_algorithm: "sha512".to_string(),
            },
        );

        let json = manifest.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["__version"], FORMAT_VERSION);
        assert_eq!(value["default"]["file"], "abc123");
        assert_eq!(value["default"]["requiresPassword"], true);
        assert_eq!(value["default"]["binaryOutput"], true);
        assert_eq!(value["default"]["hashAlgorithm"], "sha512");
    }

    #[test]
    fn test_json_roundtrip() {
        let mut manifest = Manifest::new();
        manifest.insert("alpha", record("aaa"));
        manifest.insert("beta", record("bbb"));

        let parsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_from_json_preserves_foreign_version() {
        let parsed = Manifest::from_json(r#"{"__version": "9.9"}"#).unwrap();
        assert_eq!(parsed.version(), "9.9");
    }

    #[test]
    fn test_from_json_missing_version_is_read_error() {
        let result = Manifest::from_json(r#"{"default": {"file": "abc", "requiresPassword": false, "binaryOutput": false, "hashAlgorithm": "sha256"}}"#);
        assert!(matches!(result, Err(KeyStoreError::Read(_))));
    }

    #[test]
    fn test_from_json_malformed_record_is_read_error() {
        let result = Manifest::from_json(r#"{"__version": "1.0", "default": "not an object"}"#);
        assert!(matches!(result, Err(KeyStoreError::Read(_))));

        let result = Manifest::from_json(r#"[1, 2, 3]"#);
        assert!(matches!(result, Err(KeyStoreError::Read(_))));
    }

    #[test]
    fn test_names_sorted_and_version_excluded() {
        let mut manifest = Manifest::new();
        manifest.insert("zeta", record("zzz"));
        manifest.insert("alpha", record("aaa"));

        assert_eq!(manifest.names(), vec!["alpha", "zeta"]);
        assert!(!manifest.contains(VERSION_KEY));
    }

    #[test]
    fn test_insert_returns_previous_record() {
        let mut manifest = Manifest::new();
        assert!(manifest.insert("default", record("old")).is_none());
        let previous = manifest.insert("default", record("new")).unwrap();
        assert_eq!(previous.file, "old");
        assert_eq!(manifest.get("default").unwrap().file, "new");
        assert_eq!(manifest.len(), 1);
    }
}
