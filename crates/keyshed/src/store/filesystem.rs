//! The filesystem store: durable persistence for named key pairs.
//!
//! A [`FilesystemStore`] owns a root directory containing the key list
//! (`key-list.json`) and one private/public file pair per stored key,
//! named by the content identifier of the private key (hex SHA-256 of
//! the secret bytes).
//!
//! The key list is loaded lazily on first use and cached for the
//! lifetime of the store, as are loaded key pairs. Neither cache is
//! synchronized: a store shared across threads must be serialized
//! externally. [`FilesystemStore::reload`] discards both caches for
//! callers that need to observe out-of-band changes.
//!
//! Every write, key files and key list alike, goes to a uniquely named
//! sibling temp file which is renamed into place, so a concurrent
//! reader never observes a partially written file. Two processes racing
//! to set the *same* name remain last-writer-wins on the key list; key
//! files themselves are immutable once written.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{KeyStoreError, Result};
use crate::keypair::{HashAlgorithm, KeyPair, OutputEncoding};
use crate::manifest::{self, Manifest, ManifestRecord};
use crate::store::options::StoreOptions;

/// Name used when the caller does not care to pick one.
pub const DEFAULT_KEY_NAME: &str = "default";

/// Access level checked against the base path before an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Read,
    Write,
}

/// Filesystem-backed store for named [`KeyPair`]s.
pub struct FilesystemStore {
    options: StoreOptions,
    /// Key list, loaded on first use and then reused. `None` until then.
    manifest: Option<Manifest>,
    /// Key pairs already loaded or stored through this instance.
    keys: HashMap<String, KeyPair>,
}

impl FilesystemStore {
    /// Create a store over the given options.
    ///
    /// No filesystem access happens here; the base path is validated by
    /// the first operation that needs it.
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            manifest: None,
            keys: HashMap::new(),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Fetch the key pair stored under `name`.
    ///
    /// The first access reads the key files from disk and caches the
    /// constructed pair; later calls return the cached pair without
    /// looking at the pass phrase again.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record exists for `name`, `Read` if a referenced
    /// key file is missing or unreadable, `Decryption` if the private
    /// key is protected and the pass phrase is absent or wrong.
    pub fn get(&mut self, name: &str, pass_phrase: Option<&str>) -> Result<&KeyPair> {
        if name.is_empty() {
            return Err(KeyStoreError::InvalidArgument(
                "a name for the key pair must be provided".to_string(),
            ));
        }
        if self.keys.contains_key(name) {
            return Ok(&self.keys[name]);
        }
        let pair = self.load_key(name, pass_phrase)?;
        Ok(self.keys.entry(name.to_string()).or_insert(pair))
    }

    /// [`FilesystemStore::get`] for [`DEFAULT_KEY_NAME`].
    pub fn get_default(&mut self, pass_phrase: Option<&str>) -> Result<&KeyPair> {
        self.get(DEFAULT_KEY_NAME, pass_phrase)
    }

    /// Persist `key_pair` under `name`.
    ///
    /// Writes the private and public key files under the content
    /// identifier of the private key, then commits the updated key list.
    /// The in-memory key list only changes once the file on disk holds
    /// the new record; if the key list write fails the freshly written
    /// key files are left behind as orphans but no record points at
    /// them. When old-key deletion is enabled and `name` previously
    /// referred to different files, those files are removed last,
    /// tolerating absence.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty or reserved name, `Access` if the
    /// base path is not a writable directory (checked before any file is
    /// created), `Write` if a key file or the key list cannot be
    /// written.
    pub fn set(&mut self, key_pair: &KeyPair, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(KeyStoreError::InvalidArgument(
                "a name for the key pair must be provided".to_string(),
            ));
        }
        if name == manifest::VERSION_KEY {
            return Err(KeyStoreError::InvalidArgument(format!(
                "{name} is reserved for the key list format version"
            )));
        }
        self.check_base_path(AccessMode::Write)?;
        // Loads and version-checks the key list before anything touches disk.
        let previous = self.manifest_mut()?.get(name).cloned();

        let mut secret = key_pair.secret_key_bytes();
        let content_id = content_id(&secret);
        secret.zeroize();

        let private_path = self.options.base_path().join(&content_id);
        let private_pem = key_pair.private_key_pem()?;
        write_atomic(
            &private_path,
            &private_pem,
            Some(self.options.private_key_file_mode()),
        )
        .map_err(|e| {
            KeyStoreError::Write(format!(
                "failed to write the private key to {}: {e}",
                private_path.display()
            ))
        })?;
        debug!("wrote private key file {content_id}");

        let public_path = self.options.base_path().join(format!("{content_id}.pub"));
        write_atomic(
            &public_path,
            &key_pair.public_key_pem(),
            Some(self.options.public_key_file_mode()),
        )
        .map_err(|e| {
            KeyStoreError::Write(format!(
                "failed to write the public key to {}: {e}",
                public_path.display()
            ))
        })?;
        debug!("wrote public key file {content_id}.pub");

        let record = ManifestRecord {
            file: content_id.clone(),
            requires_password: key_pair.requires_pass_phrase(),
            binary_output: key_pair.output_encoding().is_binary(),
            hash_algorithm: key_pair.hash_algorithm().to_string(),
        };

        // Commit protocol: persist an updated copy first; the cached key
        // list only changes once the file write succeeded.
        let mut updated = self.manifest_mut()?.clone();
        updated.insert(name, record);
        self.persist_manifest(&updated)?;
        self.manifest = Some(updated);
        self.keys.insert(name.to_string(), key_pair.clone());

        if self.options.delete_old_keys() {
            if let Some(previous) = previous {
                if previous.file != content_id {
                    self.delete_key_files(&previous.file);
                }
            }
        }

        Ok(())
    }

    /// [`FilesystemStore::set`] for [`DEFAULT_KEY_NAME`].
    pub fn set_default(&mut self, key_pair: &KeyPair) -> Result<()> {
        self.set(key_pair, DEFAULT_KEY_NAME)
    }

    /// Whether a key pair is stored under `name`. Key list lookup only.
    pub fn has(&mut self, name: &str) -> Result<bool> {
        Ok(self.manifest_mut()?.contains(name))
    }

    /// All stored key pair names, lexicographically ordered.
    ///
    /// Insertion order is not preserved by the key list format, so it is
    /// not reflected here either.
    pub fn names(&mut self) -> Result<Vec<String>> {
        Ok(self.manifest_mut()?.names())
    }

    /// Whether the private key stored under `name` needs a pass phrase.
    pub fn requires_pass_phrase(&mut self, name: &str) -> Result<bool> {
        self.manifest_mut()?
            .get(name)
            .map(|record| record.requires_password)
            .ok_or_else(|| KeyStoreError::NotFound(name.to_string()))
    }

    /// Discard the cached key list and key pairs and re-read the key
    /// list from disk.
    ///
    /// Without this, a store never observes key list changes made after
    /// its first operation.
    pub fn reload(&mut self) -> Result<()> {
        self.keys.clear();
        let manifest = self.load_manifest()?;
        self.manifest = Some(manifest);
        Ok(())
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// The cached key list, loading it on first use.
    fn manifest_mut(&mut self) -> Result<&mut Manifest> {
        match self.manifest {
            Some(ref mut manifest) => Ok(manifest),
            None => {
                let loaded = self.load_manifest()?;
                Ok(self.manifest.insert(loaded))
            }
        }
    }

    /// Read and version-check the key list file.
    ///
    /// A missing file is first use of a fresh root directory and yields
    /// an empty key list, not an error.
    fn load_manifest(&self) -> Result<Manifest> {
        self.check_base_path(AccessMode::Read)?;
        let path = self.options.base_path().join(manifest::KEY_LIST_FILE_NAME);
        if !path.exists() {
            debug!("no key list at {}, starting empty", path.display());
            return Ok(Manifest::new());
        }
        let json = std::fs::read_to_string(&path).map_err(|e| {
            KeyStoreError::Read(format!(
                "failed to load the key list from {}: {e}",
                path.display()
            ))
        })?;
        let loaded = Manifest::from_json(&json)?;
        if loaded.version() != manifest::FORMAT_VERSION {
            return Err(KeyStoreError::VersionMismatch {
                library: manifest::FORMAT_VERSION.to_string(),
                file: loaded.version().to_string(),
            });
        }
        debug!(
            "loaded key list with {} entries from {}",
            loaded.len(),
            path.display()
        );
        Ok(loaded)
    }

    /// Atomically replace the key list file with `updated`.
    fn persist_manifest(&self, updated: &Manifest) -> Result<()> {
        let path = self.options.base_path().join(manifest::KEY_LIST_FILE_NAME);
        let json = updated.to_json()?;
        write_atomic(&path, json.as_bytes(), None).map_err(|e| {
            KeyStoreError::Write(format!(
                "failed to save the key list to {}: {e}",
                path.display()
            ))
        })?;
        debug!("saved key list with {} entries", updated.len());
        Ok(())
    }

    /// Read the key files referenced by `name`'s record and construct a
    /// key pair from them.
    fn load_key(&mut self, name: &str, pass_phrase: Option<&str>) -> Result<KeyPair> {
        let record = self
            .manifest_mut()?
            .get(name)
            .cloned()
            .ok_or_else(|| KeyStoreError::NotFound(name.to_string()))?;

        let private_path = self.options.base_path().join(&record.file);
        let public_path = self.options.base_path().join(format!("{}.pub", record.file));

        let private_pem = std::fs::read(&private_path).map_err(|e| {
            KeyStoreError::Read(format!(
                "failed to read the private key file {}: {e}",
                private_path.display()
            ))
        })?;
        let public_pem = std::fs::read(&public_path).map_err(|e| {
            KeyStoreError::Read(format!(
                "failed to read the public key file {}: {e}",
                public_path.display()
            ))
        })?;

        let output_encoding = OutputEncoding::from_binary_flag(record.binary_output);
        let hash_algorithm = HashAlgorithm::from_name(&record.hash_algorithm).map_err(|_| {
            KeyStoreError::Read(format!(
                "key list records an unsupported hash algorithm for {name}: {}",
                record.hash_algorithm
            ))
        })?;

        KeyPair::from_pem(
            &private_pem,
            &public_pem,
            pass_phrase,
            output_encoding,
            hash_algorithm,
        )
    }

    /// Remove the private/public file pair for a superseded content
    /// identifier. Absence is not an error; any other failure is logged
    /// and swallowed because the new record is already committed.
    fn delete_key_files(&self, stem: &str) {
        let base = self.options.base_path();
        for path in [base.join(stem), base.join(format!("{stem}.pub"))] {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("deleted superseded key file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "failed to delete superseded key file {}: {e}",
                    path.display()
                ),
            }
        }
    }

    /// Validate the base path for the requested access level.
    fn check_base_path(&self, access: AccessMode) -> Result<()> {
        let path = self.options.base_path();
        let metadata = std::fs::metadata(path).map_err(|_| {
            KeyStoreError::Access(format!(
                "key storage base path must be an existing directory: {}",
                path.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(KeyStoreError::Access(format!(
                "key storage base path is not a directory: {}",
                path.display()
            )));
        }
        std::fs::read_dir(path).map_err(|e| {
            KeyStoreError::Access(format!(
                "key storage directory cannot be read: {}: {e}",
                path.display()
            ))
        })?;
        if access == AccessMode::Write && metadata.permissions().readonly() {
            return Err(KeyStoreError::Access(format!(
                "key storage directory cannot be written to: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Content identifier for a private key: hex-encoded SHA-256 of the
/// secret bytes. Collision resistance matters here: two distinct keys
/// mapping to one identifier would overwrite each other's files.
fn content_id(secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hex::encode(hasher.finalize())
}

/// Write `data` to `path` via a uniquely named sibling temp file and an
/// atomic rename, applying `mode` (Unix permission bits) to the temp
/// file before it becomes visible under its final name.
fn write_atomic(path: &Path, data: &[u8], mode: Option<u32>) -> std::io::Result<()> {
    let suffix = hex::encode(crate::crypto::random::random_bytes::<8>());
    let tmp = path.with_extension(format!("{suffix}.tmp"));

    std::fs::write(&tmp, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            if let Err(e) = std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(mode)) {
                let _ = std::fs::remove_file(&tmp);
                return Err(e);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
