//! Value accessor: walk an access path from a root value.
//!
//! Locked values are only reachable while their guard is held, so resolution hands the result to
//! a callback instead of returning it.

use crate::inspect::{self, Inspect, Sequence, View};
use crate::key;
use crate::path::Interval;

/// A resolved value: either a value, or a sub-range of a sequence addressed by a terminal
/// `from:to` segment.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Value(&'a dyn Inspect),
    Range {
        owner: &'a dyn Inspect,
        seq: &'a dyn Sequence,
        interval: Interval,
    },
}

impl Target<'_> {
    pub fn type_name(&self) -> String {
        match self {
            Target::Value(value) => value.type_name(),
            Target::Range { owner, .. } => owner.type_name(),
        }
    }

    /// Sub-ranges are always explorable; values follow [`inspect::is_explorable`].
    pub fn is_explorable(&self) -> bool {
        match self {
            Target::Value(value) => inspect::is_explorable(*value),
            Target::Range { .. } => true,
        }
    }
}

/// Resolve `path` against `root` and pass the result to `f`; `None` means the path no longer
/// leads anywhere (shrunk sequence, removed map key, empty reference).
pub fn with_resolved<R>(
    root: &dyn Inspect,
    path: &[String],
    f: impl FnOnce(Option<Target<'_>>) -> R,
) -> R {
    let mut f = Some(f);
    let mut out = None;
    walk(root, path, &mut |target| {
        if let Some(f) = f.take() {
            out = Some(f(target));
        }
    });
    match (out, f) {
        (Some(result), _) => result,
        // A guard that never called back leaves the value unreachable.
        (None, Some(f)) => f(None),
        (None, None) => unreachable!("resolution callback consumed without a result"),
    }
}

fn walk(current: &dyn Inspect, path: &[String], k: &mut dyn FnMut(Option<Target<'_>>)) {
    let Some((segment, rest)) = path.split_first() else {
        k(Some(Target::Value(current)));
        return;
    };
    if segment.is_empty() {
        walk(current, rest, k);
        return;
    }
    match current.view() {
        View::Pointer(Some(inner)) => walk(inner, path, k),
        View::Pointer(None) => k(None),
        View::Guarded(guarded) => {
            let mut called = false;
            guarded.with_inner(&mut |inner| {
                called = true;
                match inner {
                    Some(inner) => walk(inner, path, &mut *k),
                    None => k(None),
                }
            });
            if !called {
                k(None);
            }
        }
        View::Record(fields) => match fields.iter().find(|(name, _)| *name == segment.as_str()) {
            Some((_, field)) => walk(*field, rest, k),
            None => k(None),
        },
        View::Sequence(seq) => {
            if let Some(interval) = Interval::parse(segment) {
                if rest.is_empty() {
                    k(Some(Target::Range {
                        owner: current,
                        seq,
                        interval: interval.clamp(seq.len()),
                    }));
                } else {
                    // Indices below a chunk are absolute, so keep walking the full sequence.
                    walk(current, rest, k);
                }
                return;
            }
            match segment.parse::<usize>().ok().and_then(|index| seq.get(index)) {
                Some(element) => walk(element, rest, k),
                None => k(None),
            }
        }
        View::Map(entries) => match key::find_entry(&entries, segment) {
            Some(value) => walk(value, rest, k),
            None => k(None),
        },
        View::Scalar(_) | View::Described(_) | View::Opaque => k(None),
    }
}
