//! Error types for keyshed.
//!
//! All failures are strongly typed and propagated without panicking.
//! The single silent fallback in the crate is a missing key list on
//! first use of a fresh root directory, which is treated as an empty
//! store. Private key material is never included in error messages.

/// Key storage error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Key storage directory is not accessible: {0}")]
    Access(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Key list format version mismatch: library version is {library} and file format version is {file}")]
    VersionMismatch { library: String, file: String },

    #[error("Key pair not found: {0}")]
    NotFound(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, KeyStoreError>;
