use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::DEFAULT_MAX_PROBES;
use crate::members::DEFAULT_CHUNK_SIZE;
use crate::printer::MAX_PRINTABLE_LEN;

pub const DEFAULT_DUMP_FILE: &str = "peekgrid.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreOptions {
    /// Sequences longer than this are shown as `from:to` chunks.
    pub chunk_size: usize,
    /// Maximum characters of a value preview, including the truncation suffix.
    pub max_value_len: usize,
    /// Whether new cells start with zero values hidden.
    pub hide_zeros: bool,
    /// Upper bound on collision probes when placing a cell.
    pub max_probes: usize,
    /// Default target of `Explorer::dump`.
    pub dump_file: PathBuf,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_value_len: MAX_PRINTABLE_LEN,
            hide_zeros: true,
            max_probes: DEFAULT_MAX_PROBES,
            dump_file: PathBuf::from(DEFAULT_DUMP_FILE),
        }
    }
}

impl ExploreOptions {
    /// Read options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
