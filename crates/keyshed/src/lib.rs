//! keyshed — filesystem-backed storage for named asymmetric key pairs.
//!
//! Key pairs are persisted under content-derived identifiers (hex
//! SHA-256 of the private key bytes) inside a root directory, alongside
//! a versioned JSON key list mapping caller-chosen names to those
//! identifiers and to the metadata needed to reconstruct each pair:
//! pass-phrase requirement, output encoding, and hash algorithm.
//!
//! ```no_run
//! use keyshed::{FilesystemStore, KeyPair, KeyPairOptions, StoreOptions};
//!
//! # fn main() -> keyshed::Result<()> {
//! let options = StoreOptions::new("/var/lib/app/keys").with_delete_old_keys(true);
//! let mut store = FilesystemStore::new(options);
//!
//! let pair = KeyPair::generate(KeyPairOptions::new().with_pass_phrase("hunter2"));
//! store.set(&pair, "mail")?;
//!
//! let loaded = store.get("mail", Some("hunter2"))?;
//! let sealed = loaded.seal(b"for your eyes only")?;
//! # Ok(())
//! # }
//! ```
//!
//! All writes are temp-file-then-rename, so a reader never observes a
//! partially written key file or key list. A store instance caches the
//! key list and loaded pairs for its lifetime and is not internally
//! synchronized; see [`FilesystemStore`].

pub mod crypto;
pub mod error;
pub mod keypair;
pub mod manifest;
pub mod store;

// Re-export primary types
pub use error::{KeyStoreError, Result};
pub use keypair::{HashAlgorithm, KeyPair, KeyPairOptions, OutputEncoding};
pub use manifest::{Manifest, ManifestRecord, FORMAT_VERSION, KEY_LIST_FILE_NAME};
pub use store::{FilesystemStore, StoreOptions, DEFAULT_KEY_NAME};
