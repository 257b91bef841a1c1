//! Sealing-key derivation using HKDF.
//!
//! Turns an X25519 shared secret into the symmetric key used by the
//! seal/open facility on a key pair. The hash underneath HKDF follows
//! the key pair's configured hash algorithm, which is also what the
//! store records in the key list, so a key pair loaded from disk
//! derives the same sealing keys it derived before it was persisted.

use hkdf::Hkdf;
use sha2::{Sha256, Sha512};

use crate::error::{KeyStoreError, Result};
use crate::keypair::HashAlgorithm;

/// HKDF info string for sealing keys. Must remain stable across versions.
const SEALING_INFO: &[u8] = b"keyshed/v1/sealing";

/// Derive a 32-byte sealing key from an X25519 shared secret.
///
/// Uses HKDF (RFC 5869) with the shared secret as IKM, no salt, and a
/// fixed info string, over the hash selected by `hash_algorithm`.
pub fn derive_sealing_key(shared_secret: &[u8; 32], hash_algorithm: HashAlgorithm) -> Result<[u8; 32]> {
    let mut output = [0u8; 32];
    match hash_algorithm {
        HashAlgorithm::Sha256 => {
            Hkdf::<Sha256>::new(None, shared_secret).expand(SEALING_INFO, &mut output)
        }
        HashAlgorithm::Sha512 => {
            Hkdf::<Sha512>::new(None, shared_secret).expand(SEALING_INFO, &mut output)
        }
    }
    .map_err(|e| KeyStoreError::Crypto(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}
