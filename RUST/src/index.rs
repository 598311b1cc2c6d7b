//! Presentation builder: turns the grid into rows of cells ready for a renderer.

use serde::Serialize;

use crate::grid::{Access, Grid};
use crate::members::{self, Slot};
use crate::options::ExploreOptions;
use crate::printer;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexData {
    pub rows: Vec<TableRow>,
    /// Set while the host program is paused on the explorer.
    pub is_breaking: bool,
    /// Set for static snapshots that cannot send instructions back.
    pub not_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_utc: Option<String>,
}

impl IndexData {
    pub fn cell(&self, row: usize, column: usize) -> Option<&FieldList> {
        self.rows.get(row)?.cells.get(column)?.as_ref()
    }

    /// Occupied cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &FieldList> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter().flatten())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableRow {
    /// `None` marks an empty slot left of an occupied column.
    pub cells: Vec<Option<FieldList>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldList {
    pub label: String,
    /// Spaces to append to `label` so the title is as wide as the widest `label: value` entry.
    pub label_padding: usize,
    pub path: String,
    pub row: usize,
    pub column: usize,
    pub type_name: String,
    pub is_root: bool,
    pub hide_zeros: bool,
    pub has_zeros: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub fields: Vec<FieldEntry>,
    pub select_size: usize,
    pub select_id: String,
    pub not_live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub label: String,
    pub key: String,
    pub type_name: String,
    pub value_string: String,
    /// Spaces after `label` to align values within the cell.
    pub padding: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellSummary {
    pub entries: usize,
    pub has_zeros: bool,
}

pub struct IndexBuilder<'o> {
    data: IndexData,
    seq: usize,
    options: &'o ExploreOptions,
}

impl<'o> IndexBuilder<'o> {
    pub fn new(options: &'o ExploreOptions) -> Self {
        Self {
            data: IndexData::default(),
            seq: 0,
            options,
        }
    }

    pub fn not_live(mut self, generated_utc: Option<String>) -> Self {
        self.data.not_live = true;
        self.data.generated_utc = generated_utc;
        self
    }

    pub fn breaking(mut self, is_breaking: bool) -> Self {
        self.data.is_breaking = is_breaking;
        self
    }

    /// Build (or rebuild) the cell at `(row, column)` from the live value behind `access`.
    pub fn build(&mut self, row: usize, column: usize, access: &Access) -> CellSummary {
        let chunk_size = self.options.chunk_size;
        let max_len = self.options.max_value_len;
        let owner = access.type_name.as_str();

        let mut has_zeros = false;
        let mut entries: Vec<FieldEntry> = Vec::new();
        access.with_resolved(|target| {
            let Some(target) = target else {
                return;
            };
            members::visit_members(target, chunk_size, &mut |member, slot| {
                let (type_name, value_string) = match slot {
                    Slot::Value(value) => (
                        value.type_name(),
                        printer::safe_printable(&member.key, owner, value, max_len),
                    ),
                    Slot::Chunk { owner: seq, interval } => {
                        let type_name = seq.type_name();
                        let preview = format!("{} ({})", type_name, interval.len());
                        (type_name, preview)
                    }
                };
                if printer::is_zero_printable(&value_string) {
                    has_zeros = true;
                    if access.hide_zeros {
                        return;
                    }
                }
                entries.push(FieldEntry {
                    label: member.label,
                    key: member.key,
                    type_name,
                    value_string,
                    padding: 0,
                });
            });
        });

        let entries = apply_label_padding(entries);
        let widest = widest_entry(&entries);
        let label_width = access.label.chars().count();

        let summary = CellSummary {
            entries: entries.len(),
            has_zeros,
        };
        let cell = FieldList {
            label: access.label.clone(),
            label_padding: widest.saturating_sub(label_width),
            path: access.path.dotted(),
            row,
            column,
            type_name: access.type_name.clone(),
            is_root: access.is_root,
            hide_zeros: access.hide_zeros,
            has_zeros,
            range: access.range.map(|r| r.token()),
            select_size: entries.len(),
            fields: entries,
            select_id: format!("id{}", self.seq),
            not_live: self.data.not_live,
        };
        self.seq += 1;

        while self.data.rows.len() <= row {
            self.data.rows.push(TableRow::default());
        }
        let cells = &mut self.data.rows[row].cells;
        while cells.len() <= column {
            cells.push(None);
        }
        cells[column] = Some(cell);
        summary
    }

    pub fn finish(self) -> IndexData {
        self.data
    }
}

/// Build every occupied cell of `grid`.
///
/// A cell left without visible entries because all of its members are zero gets its hide-zero
/// flag switched off in the grid and is rebuilt once.
pub fn build_index(grid: &mut Grid, mut builder: IndexBuilder<'_>) -> IndexData {
    for (row, column) in grid.coordinates() {
        let Some(access) = grid.get(row, column) else {
            continue;
        };
        let summary = builder.build(row, column, access);
        if summary.entries == 0 && summary.has_zeros && access.hide_zeros {
            grid.update_at(row, column, |access| access.hide_zeros = false);
            if let Some(access) = grid.get(row, column) {
                builder.build(row, column, access);
            }
        }
    }
    builder.finish()
}

fn apply_label_padding(mut entries: Vec<FieldEntry>) -> Vec<FieldEntry> {
    let widest = entries
        .iter()
        .map(|e| e.label.chars().count())
        .max()
        .unwrap_or(0);
    for entry in &mut entries {
        entry.padding = widest - entry.label.chars().count();
    }
    entries
}

fn widest_entry(entries: &[FieldEntry]) -> usize {
    entries
        .iter()
        .map(|e| e.label.chars().count() + e.padding + ": ".len() + e.value_string.chars().count())
        .max()
        .unwrap_or(0)
}
