//! Tool-call identifier normalization.
//!
//! OpenAI-style backends name tool calls `call_<id>`. Ids minted by other
//! backends keep their own prefix so replaying a foreign tool result never
//! produces a double prefix.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Prefix this backend puts on tool-call ids.
pub const WIRE_PREFIX: &str = "call_";

/// Prefixes minted by other backends, passed through untouched.
const FOREIGN_PREFIXES: &[&str] = &["toolu_"];

/// Length of the hex digest kept for synthesized ids.
const GENERATED_ID_LEN: usize = 24;

/// Synthesize a fresh unprefixed id from the current time and a random value.
pub fn generate() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(rand::random::<u64>().to_le_bytes());
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(GENERATED_ID_LEN);
    digest
}

/// Whether `id` already carries this backend's or a foreign backend's prefix.
fn has_known_prefix(id: &str) -> bool {
    id.starts_with(WIRE_PREFIX) || FOREIGN_PREFIXES.iter().any(|p| id.starts_with(p))
}

/// Convert an id to the form sent on the wire.
///
/// A missing or empty id is synthesized.
///
/// # Examples
///
/// ```
/// use chatwire_core::tool_id::{from_wire, to_wire};
///
/// assert_eq!(to_wire(Some("abc")), "call_abc");
/// assert_eq!(to_wire(Some("toolu_01")), "toolu_01");
/// assert_eq!(from_wire(&to_wire(Some("abc"))), "abc");
/// ```
pub fn to_wire(id: Option<&str>) -> String {
    match id.filter(|id| !id.is_empty()) {
        None => format!("{WIRE_PREFIX}{}", generate()),
        Some(id) if has_known_prefix(id) => id.to_string(),
        Some(id) => format!("{WIRE_PREFIX}{id}"),
    }
}

/// Strip this backend's prefix, if present.
pub fn from_wire(id: &str) -> &str {
    id.strip_prefix(WIRE_PREFIX).unwrap_or(id)
}
