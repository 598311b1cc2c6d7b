use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::inspect::{Inspect, Scalar, View};

pub const MAX_PRINTABLE_LEN: usize = 64;

/// Printed forms that count as zero/default values for hide-zero filtering.
const ZERO_PRINTABLES: [&str; 5] = ["\"\"", "0", "false", "None", "0.000000"];

pub const NONE_LITERAL: &str = "None";

pub fn print_scalar(scalar: Scalar<'_>) -> String {
    match scalar {
        Scalar::Str(s) => format!("{s:?}"),
        Scalar::Int(i) => i.to_string(),
        Scalar::Uint(u) => u.to_string(),
        Scalar::Float(f) => format!("{f:.6}"),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Char(c) => format!("{c:?}"),
        Scalar::Unit => "()".to_string(),
    }
}

/// Short preview of a value. May panic if a user `Display` implementation does; use
/// [`safe_printable`] when rendering.
pub fn printable(value: &dyn Inspect) -> String {
    match value.view() {
        View::Scalar(scalar) => print_scalar(scalar),
        View::Pointer(None) => NONE_LITERAL.to_string(),
        View::Pointer(Some(inner)) => print_pointee(value, inner),
        View::Guarded(guarded) => {
            // Unwinding through a std guard poisons the host's lock: catch inside, re-raise outside.
            let mut out = None;
            guarded.with_inner(&mut |inner| {
                out = Some(panic::catch_unwind(AssertUnwindSafe(|| match inner {
                    Some(inner) => print_pointee(value, inner),
                    None => NONE_LITERAL.to_string(),
                })));
            });
            match out {
                Some(Ok(s)) => s,
                Some(Err(payload)) => panic::resume_unwind(payload),
                None => value.type_name(),
            }
        }
        View::Described(described) => described.to_string(),
        View::Sequence(seq) => format!("{} ({})", value.type_name(), seq.len()),
        View::Map(entries) => format!("{} ({})", value.type_name(), entries.len()),
        View::Record(_) | View::Opaque => value.type_name(),
    }
}

// One level of reference to a scalar is marked with `*`; anything deeper shows the owner type.
fn print_pointee(owner: &dyn Inspect, inner: &dyn Inspect) -> String {
    match inner.view() {
        View::Scalar(scalar) => format!("*{}", print_scalar(scalar)),
        View::Described(described) => format!("*{described}"),
        _ => owner.type_name(),
    }
}

/// Preview used when [`printable`] fails: `<type> (<length>)` for collections, else the type name.
pub fn fallback(value: &dyn Inspect) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| match value.view() {
        View::Sequence(seq) => format!("{} ({})", value.type_name(), seq.len()),
        View::Map(entries) => format!("{} ({})", value.type_name(), entries.len()),
        _ => value.type_name(),
    }))
    .unwrap_or_else(|_| "<unprintable>".to_string())
}

/// Truncated preview that never panics.
///
/// A panic raised while printing (typically a broken `Display`) is logged with the member key
/// and the owner type, and the [`fallback`] form is returned instead.
pub fn safe_printable(key: &str, owner: &str, value: &dyn Inspect, max_len: usize) -> String {
    match panic::catch_unwind(AssertUnwindSafe(|| printable(value))) {
        Ok(s) => ellipsis(s, max_len),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(key, owner, error = %message, "failed to get value of entry");
            ellipsis(fallback(value), max_len)
        }
    }
}

/// `Display` output, or `None` if formatting panicked.
pub fn display_guarded(described: &dyn fmt::Display) -> Option<String> {
    panic::catch_unwind(AssertUnwindSafe(|| described.to_string())).ok()
}

/// Truncate to `max_len` characters; the `...(<length>)` suffix counts toward the limit.
///
/// A limit too small to hold the suffix cuts the text without one.
pub fn ellipsis(s: String, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        return s;
    }
    let suffix = format!("...({count})");
    let suffix_len = suffix.chars().count();
    if suffix_len > max_len {
        return s.chars().take(max_len).collect();
    }
    let keep = max_len - suffix_len;
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(&suffix);
    out
}

pub fn is_zero_printable(s: &str) -> bool {
    ZERO_PRINTABLES.contains(&s)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
