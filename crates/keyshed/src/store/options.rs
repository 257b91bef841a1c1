//! Store configuration.
//!
//! [`StoreOptions`] is a pure value object: constructing one performs no
//! filesystem access. Whether the base path exists, is a directory, and
//! is readable or writable is checked by the store when an operation
//! actually needs that access.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default file mode for private key files: owner read/write only.
pub const DEFAULT_PRIVATE_KEY_FILE_MODE: u32 = 0o600;

/// Default file mode for public key files.
pub const DEFAULT_PUBLIC_KEY_FILE_MODE: u32 = 0o644;

/// Configuration for a [`crate::store::FilesystemStore`].
///
/// Deserializable from a configuration object:
///
/// ```json
/// {
///     "basePath": "/var/lib/app/keys",
///     "privateKeyFileMode": 384,
///     "publicKeyFileMode": 420,
///     "deleteOldKeys": true
/// }
/// ```
///
/// File modes are Unix permission bits (the JSON form takes them as
/// plain integers). On non-Unix platforms they are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoreOptions {
    base_path: PathBuf,
    #[serde(default = "default_private_key_file_mode")]
    private_key_file_mode: u32,
    #[serde(default = "default_public_key_file_mode")]
    public_key_file_mode: u32,
    #[serde(default)]
    delete_old_keys: bool,
}

fn default_private_key_file_mode() -> u32 {
    DEFAULT_PRIVATE_KEY_FILE_MODE
}

fn default_public_key_file_mode() -> u32 {
    DEFAULT_PUBLIC_KEY_FILE_MODE
}

impl StoreOptions {
    /// Create options for the given root directory with default modes
    /// and old-key deletion disabled.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            private_key_file_mode: DEFAULT_PRIVATE_KEY_FILE_MODE,
            public_key_file_mode: DEFAULT_PUBLIC_KEY_FILE_MODE,
            delete_old_keys: false,
        }
    }

    pub fn with_private_key_file_mode(mut self, mode: u32) -> Self {
        self.private_key_file_mode = mode;
        self
    }

    pub fn with_public_key_file_mode(mut self, mode: u32) -> Self {
        self.public_key_file_mode = mode;
        self
    }

    /// Whether a superseded name's old key files are deleted after a
    /// successful `set`.
    pub fn with_delete_old_keys(mut self, delete_old_keys: bool) -> Self {
        self.delete_old_keys = delete_old_keys;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn private_key_file_mode(&self) -> u32 {
        self.private_key_file_mode
    }

    pub fn public_key_file_mode(&self) -> u32 {
        self.public_key_file_mode
    }

    pub fn delete_old_keys(&self) -> bool {
        self.delete_old_keys
    }
}
