//! Map keys as path segments.
//!
//! Text keys without a `.` and integer keys are used as-is. Every other key is carried as a
//! fingerprint: a SHA-256 prefix over the key's contents, recovered at resolution time by
//! fingerprinting the live keys of the map again.

use sha2::{Digest, Sha256};

use crate::inspect::{Inspect, Scalar, View};
use crate::printer::{self, MAX_PRINTABLE_LEN};

const FINGERPRINT_BYTES: usize = 8;
const FINGERPRINT_DEPTH: usize = 16;

/// Path segment identifying `key` inside its map.
pub fn key_token(key: &dyn Inspect) -> String {
    match key.view() {
        View::Scalar(Scalar::Str(s)) if !s.is_empty() && !s.contains('.') => s.to_string(),
        View::Scalar(Scalar::Int(i)) => i.to_string(),
        View::Scalar(Scalar::Uint(u)) => u.to_string(),
        _ => fingerprint(key),
    }
}

/// Human readable form of `key`; text keys are shown unquoted.
pub fn key_label(key: &dyn Inspect) -> String {
    match key.view() {
        View::Scalar(Scalar::Str(s)) => printer::ellipsis(s.to_string(), MAX_PRINTABLE_LEN),
        _ => printer::safe_printable("<key>", "map key", key, MAX_PRINTABLE_LEN),
    }
}

/// Hex encoded content hash of `key`. Equal contents give equal fingerprints, independent of
/// the iteration order of any nested map.
pub fn fingerprint(key: &dyn Inspect) -> String {
    let digest = digest(key, FINGERPRINT_DEPTH);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Value of the entry whose key token equals `token`.
pub fn find_entry<'a>(
    entries: &[(&'a dyn Inspect, &'a dyn Inspect)],
    token: &str,
) -> Option<&'a dyn Inspect> {
    entries
        .iter()
        .find(|(key, _)| key_token(*key) == token)
        .map(|(_, value)| *value)
}

fn digest(value: &dyn Inspect, depth: usize) -> Vec<u8> {
    let mut hasher = Sha256::new();
    feed(&mut hasher, value, depth);
    hasher.finalize().to_vec()
}

fn feed(hasher: &mut Sha256, value: &dyn Inspect, depth: usize) {
    hasher.update(value.type_name().as_bytes());
    hasher.update([0u8]);
    if depth == 0 {
        return;
    }
    match value.view() {
        View::Scalar(scalar) => {
            hasher.update(b"s");
            hasher.update(printer::print_scalar(scalar).as_bytes());
        }
        View::Record(fields) => {
            hasher.update(b"r");
            for (name, field) in fields {
                hasher.update(name.as_bytes());
                hasher.update([0u8]);
                feed(hasher, field, depth - 1);
            }
        }
        View::Sequence(seq) => {
            hasher.update(b"q");
            hasher.update((seq.len() as u64).to_le_bytes());
            for index in 0..seq.len() {
                if let Some(element) = seq.get(index) {
                    feed(hasher, element, depth - 1);
                }
            }
        }
        View::Map(entries) => {
            hasher.update(b"m");
            let mut parts: Vec<(Vec<u8>, Vec<u8>)> = entries
                .iter()
                .map(|(k, v)| (digest(*k, depth - 1), digest(*v, depth - 1)))
                .collect();
            parts.sort();
            for (k, v) in parts {
                hasher.update(k);
                hasher.update(v);
            }
        }
        View::Pointer(Some(inner)) => feed(hasher, inner, depth - 1),
        View::Pointer(None) => hasher.update(b"none"),
        View::Guarded(guarded) => guarded.with_inner(&mut |inner| match inner {
            Some(inner) => feed(hasher, inner, depth - 1),
            None => hasher.update(b"none"),
        }),
        View::Described(described) => {
            hasher.update(b"d");
            hasher.update(printer::display_guarded(described).unwrap_or_default().as_bytes());
        }
        View::Opaque => hasher.update(b"o"),
    }
}
