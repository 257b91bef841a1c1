//! Filesystem-backed key pair storage.
//!
//! # Directory layout
//!
//! Everything lives flat inside the configured root directory. Key
//! files are named by the content identifier of the private key, so a
//! given file is immutable once written; superseding a name points its
//! record at a new pair of files.
//!
//! ```text
//! <root>/
//! ├── key-list.json      versioned manifest (name → record)
//! ├── <contentId>        private key armor, private file mode
//! └── <contentId>.pub    public key armor, public file mode
//! ```
//!
//! # Modules
//!
//! - [`options`] — [`StoreOptions`] value object (root path, file modes,
//!   delete-old-keys policy).
//! - [`filesystem`] — [`FilesystemStore`], the store itself.

pub mod filesystem;
pub mod options;

// Re-export the primary types so callers can write `store::FilesystemStore`
// without reaching into sub-modules.
pub use filesystem::{FilesystemStore, DEFAULT_KEY_NAME};
pub use options::StoreOptions;
