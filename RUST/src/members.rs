//! Member enumerator: the immediate members of an explorable value.

use crate::inspect::{Inspect, Sequence, View};
use crate::key;
use crate::path::Interval;
use crate::resolve::Target;

pub const DEFAULT_CHUNK_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Path segment that selects this member.
    pub key: String,
    pub label: String,
}

impl Member {
    fn plain(key: String) -> Self {
        Self {
            label: key.clone(),
            key,
        }
    }
}

/// What a member refers to: an element value, or a chunk of a large sequence.
#[derive(Clone, Copy)]
pub enum Slot<'a> {
    Value(&'a dyn Inspect),
    Chunk {
        owner: &'a dyn Inspect,
        interval: Interval,
    },
}

/// Ordered member keys of `target`.
pub fn members(target: Target<'_>, chunk_size: usize) -> Vec<Member> {
    let mut out = Vec::new();
    visit_members(target, chunk_size, &mut |member, _| out.push(member));
    out
}

/// Call `f` for every member of `target`, in display order.
///
/// Record fields and map entries are sorted by label. Sequence elements keep index order, and a
/// sequence (or sub-range) longer than `chunk_size` yields `from:to` chunks instead of elements.
/// Values that cannot be explored yield nothing.
pub fn visit_members(target: Target<'_>, chunk_size: usize, f: &mut dyn FnMut(Member, Slot<'_>)) {
    match target {
        Target::Value(value) => visit_value(value, chunk_size, f),
        Target::Range {
            owner,
            seq,
            interval,
        } => visit_indices(owner, seq, interval, chunk_size, f),
    }
}

fn visit_value(value: &dyn Inspect, chunk_size: usize, f: &mut dyn FnMut(Member, Slot<'_>)) {
    match value.view() {
        View::Pointer(Some(inner)) => visit_value(inner, chunk_size, f),
        View::Guarded(guarded) => guarded.with_inner(&mut |inner| {
            if let Some(inner) = inner {
                visit_value(inner, chunk_size, &mut *f);
            }
        }),
        View::Record(mut fields) => {
            fields.sort_by(|a, b| a.0.cmp(b.0));
            for (name, field) in fields {
                f(Member::plain(name.to_string()), Slot::Value(field));
            }
        }
        View::Sequence(seq) => {
            visit_indices(value, seq, Interval::new(0, seq.len()), chunk_size, f);
        }
        View::Map(entries) => {
            let mut keyed: Vec<(Member, &dyn Inspect)> = entries
                .into_iter()
                .map(|(k, v)| {
                    let member = Member {
                        key: key::key_token(k),
                        label: key::key_label(k),
                    };
                    (member, v)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.label.cmp(&b.0.label).then_with(|| a.0.key.cmp(&b.0.key)));
            for (member, v) in keyed {
                f(member, Slot::Value(v));
            }
        }
        View::Pointer(None) | View::Scalar(_) | View::Described(_) | View::Opaque => {
            tracing::debug!(type_name = %value.type_name(), "no members for non explorable value");
        }
    }
}

fn visit_indices(
    owner: &dyn Inspect,
    seq: &dyn Sequence,
    interval: Interval,
    chunk_size: usize,
    f: &mut dyn FnMut(Member, Slot<'_>),
) {
    let interval = interval.clamp(seq.len());
    if interval.len() > chunk_size.max(1) {
        for chunk in interval.chunks(chunk_size) {
            f(
                Member::plain(chunk.token()),
                Slot::Chunk {
                    owner,
                    interval: chunk,
                },
            );
        }
        return;
    }
    for index in interval.from..interval.to {
        if let Some(element) = seq.get(index) {
            f(Member::plain(index.to_string()), Slot::Value(element));
        }
    }
}
