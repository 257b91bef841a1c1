//! PEM-style armor for on-disk key material.
//!
//! Key files hold a single armored block: a `-----BEGIN <tag>-----`
//! line, base64 body wrapped at 64 columns, and a matching END line.
//! The tag identifies the payload (plain private key, encrypted
//! private key envelope, or public key), so a loader can tell whether
//! a pass phrase is needed before it touches the payload.

use crate::error::{KeyStoreError, Result};

/// Wrap column for the base64 body.
const LINE_WIDTH: usize = 64;

/// Encode `body` as an armored block with the given tag.
pub fn encode(tag: &str, body: &[u8]) -> String {
    let b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, body);
    let mut out = String::with_capacity(b64.len() + b64.len() / LINE_WIDTH + tag.len() * 2 + 32);
    out.push_str("-----BEGIN ");
    out.push_str(tag);
    out.push_str("-----\n");
    let mut start = 0;
    while start < b64.len() {
        let end = usize::min(start + LINE_WIDTH, b64.len());
        out.push_str(&b64[start..end]);
        out.push('\n');
        start = end;
    }
    out.push_str("-----END ");
    out.push_str(tag);
    out.push_str("-----\n");
    out
}

/// Parse an armored block, accepting any of the given tags.
///
/// Returns the matched tag and the decoded body. All parse failures are
/// [`KeyStoreError::Decryption`]: malformed key material is a
/// decryption-layer error, the same as a bad pass phrase.
pub fn decode<'a>(input: &[u8], accepted_tags: &[&'a str]) -> Result<(&'a str, Vec<u8>)> {
    let text = std::str::from_utf8(input)
        .map_err(|_| malformed("key material is not text"))?;

    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let begin = lines.next().ok_or_else(|| malformed("empty input"))?;
    let tag_name = begin
        .strip_prefix("-----BEGIN ")
        .and_then(|rest| rest.strip_suffix("-----"))
        .ok_or_else(|| malformed("missing BEGIN line"))?;

    let tag = accepted_tags
        .iter()
        .copied()
        .find(|candidate| *candidate == tag_name)
        .ok_or_else(|| {
            KeyStoreError::Decryption(format!("unexpected armor tag: {tag_name}"))
        })?;

    let mut b64 = String::new();
    let mut terminated = false;
    for line in lines {
        if let Some(rest) = line.strip_prefix("-----END ") {
            if rest.strip_suffix("-----") != Some(tag_name) {
                return Err(malformed("mismatched END line"));
            }
            terminated = true;
            break;
        }
        b64.push_str(line);
    }
    if !terminated {
        return Err(malformed("missing END line"));
    }

    let body = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, b64.as_bytes())
        .map_err(|e| malformed(&format!("invalid base64 body: {e}")))?;

    Ok((tag, body))
}

fn malformed(detail: &str) -> KeyStoreError {
    KeyStoreError::Decryption(format!("malformed key armor: {detail}"))
}
