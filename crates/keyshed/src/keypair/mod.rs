//! Asymmetric key pairs and the seal/open facility built on them.
//!
//! A [`KeyPair`] holds an X25519 static secret, its public key, and the
//! metadata the store persists alongside the key material: whether a
//! pass phrase protects the private key at rest, the output encoding
//! for sealed payloads, and the hash algorithm used for sealing-key
//! derivation.
//!
//! On-disk formats (see [`armor`]):
//! - `X25519 PRIVATE KEY` — raw 32-byte secret.
//! - `ENCRYPTED X25519 PRIVATE KEY` — `salt(16) || nonce(12) || ciphertext`,
//!   the Argon2id + ChaCha20-Poly1305 envelope from
//!   [`crate::crypto::encryption`].
//! - `X25519 PUBLIC KEY` — raw 32-byte public key.
//!
//! Sealing wire format: `ephemeral_public(32) || nonce(12) || ciphertext`,
//! base64-encoded when the output encoding is [`OutputEncoding::Text`].

use std::fmt;

use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::crypto::{derivation, encryption};
use crate::error::{KeyStoreError, Result};

pub mod armor;

// ── Armor tags ────────────────────────────────────────────────────────────────

const PRIVATE_KEY_TAG: &str = "X25519 PRIVATE KEY";
const ENCRYPTED_PRIVATE_KEY_TAG: &str = "ENCRYPTED X25519 PRIVATE KEY";
const PUBLIC_KEY_TAG: &str = "X25519 PUBLIC KEY";

/// Envelope layout constants for the encrypted private key payload.
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

// ── Metadata enums ────────────────────────────────────────────────────────────

/// Hash algorithm used for sealing-key derivation.
///
/// Persisted in the key list by name so a reloaded key pair seals and
/// opens with the same parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// The identifier recorded in the key list.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Parse a key list identifier.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(KeyStoreError::InvalidArgument(format!(
                "unsupported hash algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of sealed payloads produced by [`KeyPair::seal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// Raw bytes.
    Binary,
    /// Base64 text.
    #[default]
    Text,
}

impl OutputEncoding {
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary)
    }

    /// Build from the boolean flag the key list persists.
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary {
            Self::Binary
        } else {
            Self::Text
        }
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Metadata attached to a key pair at generation time.
///
/// The pass phrase is held only for the lifetime of the value and is
/// zeroized on drop; the store never persists it, only the fact that
/// one is required.
#[derive(Clone, Default)]
pub struct KeyPairOptions {
    pass_phrase: Option<String>,
    output_encoding: OutputEncoding,
    hash_algorithm: HashAlgorithm,
}

impl KeyPairOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect the private key at rest with a pass phrase.
    ///
    /// An empty pass phrase means no protection, matching the key list's
    /// definition of `requiresPassword`.
    pub fn with_pass_phrase(mut self, pass_phrase: impl Into<String>) -> Self {
        let pass_phrase = pass_phrase.into();
        self.pass_phrase = if pass_phrase.is_empty() {
            None
        } else {
            Some(pass_phrase)
        };
        self
    }

    pub fn with_output_encoding(mut self, output_encoding: OutputEncoding) -> Self {
        self.output_encoding = output_encoding;
        self
    }

    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    pub fn pass_phrase(&self) -> Option<&str> {
        self.pass_phrase.as_deref()
    }

    pub fn output_encoding(&self) -> OutputEncoding {
        self.output_encoding
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }
}

impl Drop for KeyPairOptions {
    fn drop(&mut self) {
        if let Some(ref mut pass_phrase) = self.pass_phrase {
            pass_phrase.zeroize();
        }
    }
}

impl fmt::Debug for KeyPairOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairOptions")
            .field("pass_phrase", &self.pass_phrase.as_ref().map(|_| "<redacted>"))
            .field("output_encoding", &self.output_encoding)
            .field("hash_algorithm", &self.hash_algorithm)
            .finish()
    }
}

// ── KeyPair ───────────────────────────────────────────────────────────────────

/// An X25519 key pair plus the metadata the store persists with it.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
    options: KeyPairOptions,
}

impl KeyPair {
    /// Generate a new random key pair with the given options.
    pub fn generate(options: KeyPairOptions) -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            secret,
            public,
            options,
        }
    }

    /// Reconstruct a key pair from raw secret bytes.
    pub fn from_secret_bytes(bytes: [u8; 32], options: KeyPairOptions) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self {
            secret,
            public,
            options,
        }
    }

    /// Parse a key pair from its armored private and public key files.
    ///
    /// `output_encoding` and `hash_algorithm` come from the key list
    /// record, not the files. A missing or wrong pass phrase for an
    /// encrypted private key, and any malformed key material, fail with
    /// [`KeyStoreError::Decryption`].
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        pass_phrase: Option<&str>,
        output_encoding: OutputEncoding,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let (tag, private_body) =
            armor::decode(private_pem, &[PRIVATE_KEY_TAG, ENCRYPTED_PRIVATE_KEY_TAG])?;
        let encrypted = tag == ENCRYPTED_PRIVATE_KEY_TAG;

        let mut secret_bytes: [u8; 32] = if encrypted {
            let pass_phrase = pass_phrase.filter(|p| !p.is_empty()).ok_or_else(|| {
                KeyStoreError::Decryption(
                    "a pass phrase is required to load this private key".to_string(),
                )
            })?;
            if private_body.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
                return Err(KeyStoreError::Decryption(
                    "encrypted private key payload is truncated".to_string(),
                ));
            }
            let salt: [u8; SALT_LEN] = private_body[..SALT_LEN]
                .try_into()
                .map_err(|_| KeyStoreError::Decryption("invalid envelope salt".to_string()))?;
            let nonce = &private_body[SALT_LEN..SALT_LEN + NONCE_LEN];
            let ciphertext = &private_body[SALT_LEN + NONCE_LEN..];
            let mut plaintext =
                encryption::decrypt_with_passphrase(pass_phrase.as_bytes(), &salt, nonce, ciphertext)?;
            let secret = <[u8; 32]>::try_from(plaintext.as_slice()).map_err(|_| {
                KeyStoreError::Decryption("private key must be 32 bytes".to_string())
            });
            plaintext.zeroize();
            secret?
        } else {
            private_body.as_slice().try_into().map_err(|_| {
                KeyStoreError::Decryption("private key must be 32 bytes".to_string())
            })?
        };

        let (_, public_body) = armor::decode(public_pem, &[PUBLIC_KEY_TAG])?;
        let public_bytes: [u8; 32] = public_body.as_slice().try_into().map_err(|_| {
            KeyStoreError::Decryption("public key must be 32 bytes".to_string())
        })?;

        let secret = StaticSecret::from(secret_bytes);
        secret_bytes.zeroize();
        let derived_public = PublicKey::from(&secret);
        if derived_public.as_bytes() != &public_bytes {
            return Err(KeyStoreError::Decryption(
                "public key file does not match the private key".to_string(),
            ));
        }

        let mut options = KeyPairOptions::new()
            .with_output_encoding(output_encoding)
            .with_hash_algorithm(hash_algorithm);
        if encrypted {
            if let Some(pass_phrase) = pass_phrase {
                options = options.with_pass_phrase(pass_phrase);
            }
        }

        Ok(Self {
            secret,
            public: derived_public,
            options,
        })
    }

    /// Serialize the private key for storage.
    ///
    /// With a pass phrase set, the payload is a fresh Argon2id +
    /// ChaCha20-Poly1305 envelope: the armored bytes differ between
    /// calls, but the secret inside does not.
    pub fn private_key_pem(&self) -> Result<Vec<u8>> {
        let mut secret_bytes = self.secret.to_bytes();
        let pem = match self.options.pass_phrase() {
            Some(pass_phrase) => {
                let envelope =
                    encryption::encrypt_with_passphrase(pass_phrase.as_bytes(), &secret_bytes);
                secret_bytes.zeroize();
                let (salt, nonce, ciphertext) = envelope?;
                let mut body = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
                body.extend_from_slice(&salt);
                body.extend_from_slice(&nonce);
                body.extend_from_slice(&ciphertext);
                armor::encode(ENCRYPTED_PRIVATE_KEY_TAG, &body)
            }
            None => {
                let pem = armor::encode(PRIVATE_KEY_TAG, &secret_bytes);
                secret_bytes.zeroize();
                pem
            }
        };
        Ok(pem.into_bytes())
    }

    /// Serialize the public key for storage.
    pub fn public_key_pem(&self) -> Vec<u8> {
        armor::encode(PUBLIC_KEY_TAG, self.public.as_bytes()).into_bytes()
    }

    /// Return the raw secret key bytes. Caller must zeroize after use.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Return the raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Whether the private key is pass-phrase protected at rest.
    pub fn requires_pass_phrase(&self) -> bool {
        self.options.pass_phrase().is_some()
    }

    pub fn output_encoding(&self) -> OutputEncoding {
        self.options.output_encoding()
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.options.hash_algorithm()
    }

    /// Seal a plaintext to this key pair's public key.
    ///
    /// Anyone holding only the public key could do the same; opening
    /// requires the private key. Output is raw bytes or base64 text per
    /// the configured output encoding.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);

        let mut shared = *ephemeral.diffie_hellman(&self.public).as_bytes();
        let key = derivation::derive_sealing_key(&shared, self.options.hash_algorithm());
        shared.zeroize();
        let mut key = key?;

        let result = encryption::encrypt(&key, plaintext);
        key.zeroize();
        let (nonce, ciphertext) = result?;

        let mut out = Vec::with_capacity(32 + nonce.len() + ciphertext.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);

        Ok(match self.options.output_encoding() {
            OutputEncoding::Binary => out,
            OutputEncoding::Text => {
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &out)
                    .into_bytes()
            }
        })
    }

    /// Open a payload produced by [`KeyPair::seal`].
    pub fn open(&self, input: &[u8]) -> Result<Vec<u8>> {
        let raw = match self.options.output_encoding() {
            OutputEncoding::Binary => input.to_vec(),
            OutputEncoding::Text => {
                let text = std::str::from_utf8(input).map_err(|_| {
                    KeyStoreError::Decryption("sealed payload is not base64 text".to_string())
                })?;
                base64::Engine::decode(
                    &base64::engine::general_purpose::STANDARD,
                    text.trim().as_bytes(),
                )
                .map_err(|e| {
                    KeyStoreError::Decryption(format!("invalid base64 in sealed payload: {e}"))
                })?
            }
        };

        if raw.len() < 32 + NONCE_LEN + TAG_LEN {
            return Err(KeyStoreError::Decryption(
                "sealed payload is truncated".to_string(),
            ));
        }
        let peer_bytes: [u8; 32] = raw[..32]
            .try_into()
            .map_err(|_| KeyStoreError::Decryption("invalid ephemeral key".to_string()))?;
        let nonce = &raw[32..32 + NONCE_LEN];
        let ciphertext = &raw[32 + NONCE_LEN..];

        let mut shared = *self
            .secret
            .diffie_hellman(&PublicKey::from(peer_bytes))
            .as_bytes();
        let key = derivation::derive_sealing_key(&shared, self.options.hash_algorithm());
        shared.zeroize();
        let mut key = key?;

        let result = encryption::decrypt(&key, nonce, ciphertext);
        key.zeroize();
        result
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            secret: StaticSecret::from(self.secret.to_bytes()),
            public: self.public,
            options: self.options.clone(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_keys() {
        let a = KeyPair::generate(KeyPairOptions::new());
        let b = KeyPair::generate(KeyPairOptions::new());
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
        assert_ne!(a.secret_key_bytes(), b.secret_key_bytes());
    }

    #[test]
    fn test_from_secret_bytes_reproduces_public_key() {
        let pair = KeyPair::generate(KeyPairOptions::new());
        let rebuilt = KeyPair::from_secret_bytes(pair.secret_key_bytes(), KeyPairOptions::new());
        assert_eq!(pair.public_key_bytes(), rebuilt.public_key_bytes());
    }

    #[test]
    fn test_plain_private_key_tag() {
        let pair = KeyPair::generate(KeyPairOptions::new());
        let pem = String::from_utf8(pair.private_key_pem().unwrap()).unwrap();
        assert!(pem.starts_with("-----BEGIN X25519 PRIVATE KEY-----"));
        assert!(!pair.requires_pass_phrase());
    }

    #[test]
    fn test_protected_private_key_tag() {
        let pair = KeyPair::generate(KeyPairOptions::new().with_pass_phrase("secret"));
        let pem = String::from_utf8(pair.private_key_pem().unwrap()).unwrap();
        assert!(pem.starts_with("-----BEGIN ENCRYPTED X25519 PRIVATE KEY-----"));
        assert!(pair.requires_pass_phrase());
    }

    #[test]
    fn test_empty_pass_phrase_means_unprotected() {
        let pair = KeyPair::generate(KeyPairOptions::new().with_pass_phrase(""));
        assert!(!pair.requires_pass_phrase());
    }

    #[test]
    fn test_pem_roundtrip_unprotected() {
        let pair = KeyPair::generate(KeyPairOptions::new());
        let loaded = KeyPair::from_pem(
            &pair.private_key_pem().unwrap(),
            &pair.public_key_pem(),
            None,
            OutputEncoding::Text,
            HashAlgorithm::Sha256,
        )
        .unwrap();
        assert_eq!(pair.secret_key_bytes(), loaded.secret_key_bytes());
        assert_eq!(pair.public_key_bytes(), loaded.public_key_bytes());
    }

    #[test]
    fn test_pem_roundtrip_protected() {
        let pair = KeyPair::generate(KeyPairOptions::new().with_pass_phrase("hunter2"));
        let loaded = KeyPair::from_pem(
            &pair.private_key_pem().unwrap(),
            &pair.public_key_pem(),
            Some("hunter2"),
            OutputEncoding::Text,
            HashAlgorithm::Sha256,
        )
        .unwrap();
        assert_eq!(pair.secret_key_bytes(), loaded.secret_key_bytes());
        assert!(loaded.requires_pass_phrase());
    }

    #[test]
    fn test_protected_key_wrong_pass_phrase() {
        let pair = KeyPair::generate(KeyPairOptions::new().with_pass_phrase("correct"));
        let result = KeyPair::from_pem(
            &pair.private_key_pem().unwrap(),
            &pair.public_key_pem(),
            Some("wrong"),
            OutputEncoding::Text,
            HashAlgorithm::Sha256,
        );
        assert!(matches!(result, Err(KeyStoreError::Decryption(_))));
    }

    #[test]
    fn test_protected_key_missing_pass_phrase() {
        let pair = KeyPair::generate(KeyPairOptions::new().with_pass_phrase("correct"));
        let result = KeyPair::from_pem(
            &pair.private_key_pem().unwrap(),
            &pair.public_key_pem(),
            None,
            OutputEncoding::Text,
            HashAlgorithm::Sha256,
        );
        assert!(matches!(result, Err(KeyStoreError::Decryption(_))));
    }

    #[test]
    fn test_mismatched_public_key_rejected() {
        let pair = KeyPair::generate(KeyPairOptions::new());
        let other = KeyPair::generate(KeyPairOptions::new());
        let result = KeyPair::from_pem(
            &pair.private_key_pem().unwrap(),
            &other.public_key_pem(),
            None,
            OutputEncoding::Text,
            HashAlgorithm::Sha256,
        );
        assert!(matches!(result, Err(KeyStoreError::Decryption(_))));
    }

    #[test]
    fn test_seal_open_roundtrip_text() {
        let pair = KeyPair::generate(KeyPairOptions::new());
        let sealed = pair.seal(b"attack at dawn").unwrap();
        // Text encoding produces printable base64
        assert!(std::str::from_utf8(&sealed).is_ok());
        assert_eq!(pair.open(&sealed).unwrap(), b"attack at dawn");
    }

    #[test]
    fn test_seal_open_roundtrip_binary() {
        let pair = KeyPair::generate(
            KeyPairOptions::new().with_output_encoding(OutputEncoding::Binary),
        );
        let sealed = pair.seal(b"attack at dawn").unwrap();
        assert_eq!(pair.open(&sealed).unwrap(), b"attack at dawn");
    }

    #[test]
    fn test_seal_open_sha512() {
        let pair = KeyPair::generate(
            KeyPairOptions::new().with_hash_algorithm(HashAlgorithm::Sha512),
        );
        let sealed = pair.seal(b"payload").unwrap();
        assert_eq!(pair.open(&sealed).unwrap(), b"payload");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let pair = KeyPair::generate(KeyPairOptions::new());
        let other = KeyPair::generate(KeyPairOptions::new());
        let sealed = pair.seal(b"for pair only").unwrap();
        assert!(matches!(
            other.open(&sealed),
            Err(KeyStoreError::Decryption(_))
        ));
    }

    #[test]
    fn test_open_truncated_payload_fails() {
        let pair = KeyPair::generate(
            KeyPairOptions::new().with_output_encoding(OutputEncoding::Binary),
        );
        assert!(matches!(
            pair.open(&[0u8; 10]),
            Err(KeyStoreError::Decryption(_))
        ));
    }

    #[test]
    fn test_hash_algorithm_names() {
        assert_eq!(HashAlgorithm::from_name("sha256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_name("SHA512").unwrap(), HashAlgorithm::Sha512);
        assert!(matches!(
            HashAlgorithm::from_name("md5"),
            Err(KeyStoreError::InvalidArgument(_))
        ));
        assert_eq!(HashAlgorithm::Sha512.to_string(), "sha512");
    }

    #[test]
    fn test_output_encoding_flag_roundtrip() {
        assert!(OutputEncoding::from_binary_flag(true).is_binary());
        assert!(!OutputEncoding::from_binary_flag(false).is_binary());
    }

    #[test]
    fn test_debug_redacts_pass_phrase() {
        let options = KeyPairOptions::new().with_pass_phrase("super secret");
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("super secret"));
    }
}
