use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static INTERVAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+):(\d+)$").expect("regex"));

/// Half-open `[from, to)` range of sequence indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    pub from: usize,
    pub to: usize,
}

impl Interval {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Parse a `from:to` token. Tokens with `to < from` are not intervals.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = INTERVAL_RE.captures(token)?;
        let from = caps[1].parse::<usize>().ok()?;
        let to = caps[2].parse::<usize>().ok()?;
        if to < from {
            return None;
        }
        Some(Self { from, to })
    }

    pub fn is_token(token: &str) -> bool {
        Self::parse(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restrict to a sequence of `len` elements; a range past the end becomes empty.
    pub fn clamp(self, len: usize) -> Self {
        let to = self.to.min(len);
        Self {
            from: self.from.min(to),
            to,
        }
    }

    /// Split into consecutive chunks of `size` indices; the last chunk may be shorter.
    pub fn chunks(&self, size: usize) -> Vec<Interval> {
        let size = size.max(1);
        let mut out = Vec::with_capacity(self.len().div_ceil(size));
        let mut from = self.from;
        while from < self.to {
            let to = from.saturating_add(size).min(self.to);
            out.push(Interval { from, to });
            from = to;
        }
        out
    }

    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.from, self.to)
    }
}

/// Keys leading from a root value to one of its descendants.
///
/// An empty segment is a no-op, so `[""]` addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccessPath(Vec<String>);

impl AccessPath {
    pub fn root() -> Self {
        Self(vec![String::new()])
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn from_dotted(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self::from_segments(dotted.split('.'))
    }

    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Non-empty segments joined with `.`.
    pub fn dotted(&self) -> String {
        self.0
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The interval addressed by the final segment, if any.
    pub fn interval(&self) -> Option<Interval> {
        self.last().and_then(Interval::parse)
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}
