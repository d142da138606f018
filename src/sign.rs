//! Message authentication for the hosted-page protocol.
//!
//! Both directions use the same construction: the ordered field values are
//! escaped, joined with `|`, the store key is appended as the final field,
//! and the whole byte string is hashed with SHA-512. The gateway documents
//! the digest step as "hex digest, pack hex pairs to binary, base64" — the
//! packed hex pairs are exactly the raw digest bytes, so the digest is
//! base64-encoded directly.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256, Sha512};
use std::time::{SystemTime, UNIX_EPOCH};

/// Escape one field value for hash plaintext assembly.
///
/// `\` doubles first, then `|` is prefixed, so a value can never inject a
/// field separator into the plaintext.
pub fn escape_for_hash(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
}

/// SHA-512 over the assembled plaintext, base64-encoded.
pub fn calculate_hash(plaintext: &str) -> String {
    BASE64.encode(Sha512::digest(plaintext.as_bytes()))
}

/// Sign an ordered field-value list with the store key appended last.
pub fn sign_fields<I, S>(fields: I, store_key: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parts: Vec<String> = fields
        .into_iter()
        .map(|f| escape_for_hash(f.as_ref()))
        .collect();
    parts.push(escape_for_hash(store_key));
    calculate_hash(&parts.join("|"))
}

/// Verify a gateway-supplied hash against the ordered field values.
///
/// Fails closed: any difference between the supplied hash and the freshly
/// computed one means the message must not be trusted.
pub fn verify_fields<I, S>(fields: I, supplied_hash: &str, store_key: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sign_fields(fields, store_key) == supplied_hash
}

/// Per-request nonce mixed into the outbound signature, fixed 20 characters,
/// derived by hashing the order id together with the current time.
pub fn nonce(oid: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let digest = Sha256::digest(format!("{}{}", oid, now.as_nanos()).as_bytes());
    hex::encode(digest)[..20].to_string()
}
