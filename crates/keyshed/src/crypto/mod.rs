//! Cryptographic primitives for keyshed.
//!
//! This module provides:
//! - HKDF key derivation over the hash algorithm a key pair is configured with
//! - Argon2id passphrase-based key derivation
//! - ChaCha20-Poly1305 authenticated encryption
//! - Cryptographically secure random number generation
//!
//! X25519 key agreement itself lives with the key pair type in
//! [`crate::keypair`]; the helpers here turn its shared secrets and user
//! pass phrases into symmetric keys and apply them.

pub mod derivation;
pub mod encryption;
pub mod random;
