use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ExploreError, Result};
use crate::inspect::Inspect;
use crate::path::{AccessPath, Interval};
use crate::resolve::{self, Target};

pub const DEFAULT_MAX_PROBES: usize = 64;

/// A value registered with the explorer, shared with the host program.
pub type Root = Arc<dyn Inspect + Send + Sync>;

/// Binding of one grid cell: a root value and the path to the shown descendant.
#[derive(Clone)]
pub struct Access {
    pub root: Root,
    pub path: AccessPath,
    pub label: String,
    pub type_name: String,
    pub hide_zeros: bool,
    pub range: Option<Interval>,
    pub is_root: bool,
}

impl Access {
    pub fn new_root(label: &str, root: Root, hide_zeros: bool) -> Self {
        let type_name = root.type_name();
        Self {
            root,
            path: AccessPath::root(),
            label: label.to_string(),
            type_name,
            hide_zeros,
            range: None,
            is_root: true,
        }
    }

    /// Non-root cell for `path` below the same root, titled `label`.
    pub fn descendant(
        &self,
        path: AccessPath,
        label: String,
        type_name: String,
        hide_zeros: bool,
    ) -> Self {
        Self {
            root: Arc::clone(&self.root),
            range: path.interval(),
            path,
            label,
            type_name,
            hide_zeros,
            is_root: false,
        }
    }

    pub fn with_resolved<R>(&self, f: impl FnOnce(Option<Target<'_>>) -> R) -> R {
        resolve::with_resolved(self.root.as_ref(), self.path.segments(), f)
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Access")
            .field("path", &self.path)
            .field("label", &self.label)
            .field("type_name", &self.type_name)
            .field("hide_zeros", &self.hide_zeros)
            .field("range", &self.range)
            .field("is_root", &self.is_root)
            .finish()
    }
}

/// Where to put a cell whose preferred slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Exactly this coordinate.
    At { row: usize, column: usize },
    /// First free row of this column.
    Column(usize),
    /// First free column of this row.
    Row(usize),
}

impl Placement {
    pub fn next(&self, grid: &Grid) -> (usize, usize) {
        match *self {
            Placement::At { row, column } => (row, column),
            Placement::Column(column) => (grid.next_free_row(column), column),
            Placement::Row(row) => (row, grid.next_free_column(row)),
        }
    }
}

/// Sparse row → column → [`Access`] mapping.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: BTreeMap<usize, BTreeMap<usize, Access>>,
    max_probes: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROBES)
    }
}

impl Grid {
    pub fn new(max_probes: usize) -> Self {
        Self {
            cells: BTreeMap::new(),
            max_probes,
        }
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Access> {
        self.cells.get(&row)?.get(&column)
    }

    pub fn is_occupied(&self, row: usize, column: usize) -> bool {
        self.get(row, column).is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Access)> {
        self.cells
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&column, access)| (row, column, access)))
    }

    pub fn coordinates(&self) -> Vec<(usize, usize)> {
        self.iter().map(|(row, column, _)| (row, column)).collect()
    }

    /// Place `access` at `(row, column)`, or wherever `placement` points when that slot is taken.
    /// Existing cells are never overwritten. Returns the coordinate used.
    pub fn put(
        &mut self,
        row: usize,
        column: usize,
        access: Access,
        placement: Placement,
    ) -> Result<(usize, usize)> {
        let (mut r, mut c) = (row, column);
        for _ in 0..=self.max_probes {
            if !self.is_occupied(r, c) {
                self.insert_at(r, c, access);
                return Ok((r, c));
            }
            (r, c) = placement.next(self);
        }
        Err(ExploreError::PlacementExhausted {
            row,
            column,
            probes: self.max_probes,
        })
    }

    /// Unconditional write; returns the previous occupant.
    pub fn insert_at(&mut self, row: usize, column: usize, access: Access) -> Option<Access> {
        self.cells.entry(row).or_default().insert(column, access)
    }

    /// Overwrite the root registered as `label` in place. Gives `access` back if there is none.
    pub fn replace_root_by_label(
        &mut self,
        label: &str,
        access: Access,
    ) -> std::result::Result<(usize, usize), Access> {
        match self.root_with_label(label) {
            Some((row, column, _)) => {
                self.insert_at(row, column, access);
                Ok((row, column))
            }
            None => Err(access),
        }
    }

    pub fn root_with_label(&self, label: &str) -> Option<(usize, usize, &Access)> {
        self.iter()
            .find(|(_, _, access)| access.is_root && access.label == label)
    }

    pub fn root_labels(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, _, access)| access.is_root)
            .map(|(_, _, access)| access.label.clone())
            .collect()
    }

    pub fn can_remove_at(&self, row: usize, column: usize) -> bool {
        matches!(self.get(row, column), Some(access) if !access.is_root)
    }

    /// Delete a non-root cell. Returns false for roots and empty slots.
    pub fn remove_at(&mut self, row: usize, column: usize) -> bool {
        if !self.can_remove_at(row, column) {
            return false;
        }
        let Some(cols) = self.cells.get_mut(&row) else {
            return false;
        };
        let removed = cols.remove(&column).is_some();
        if cols.is_empty() {
            self.cells.remove(&row);
        }
        removed
    }

    /// Read-modify-write of the cell at `(row, column)`; it keeps its coordinates.
    pub fn update_at(&mut self, row: usize, column: usize, f: impl FnOnce(&mut Access)) -> bool {
        match self.cells.get_mut(&row).and_then(|cols| cols.get_mut(&column)) {
            Some(access) => {
                f(access);
                true
            }
            None => false,
        }
    }

    /// Drop every cell that is not a root; roots keep their coordinates.
    pub fn clear_non_roots(&mut self) {
        for cols in self.cells.values_mut() {
            cols.retain(|_, access| access.is_root);
        }
        self.cells.retain(|_, cols| !cols.is_empty());
    }

    /// First row (scanning from 0) with no cell in `column`.
    pub fn next_free_row(&self, column: usize) -> usize {
        (0..)
            .find(|&row| !self.is_occupied(row, column))
            .unwrap_or_default()
    }

    /// First column (scanning from 0) with no cell in `row`.
    pub fn next_free_column(&self, row: usize) -> usize {
        (0..)
            .find(|&column| !self.is_occupied(row, column))
            .unwrap_or_default()
    }

    pub fn max_row(&self, column: usize) -> Option<usize> {
        self.cells
            .iter()
            .filter(|(_, cols)| cols.contains_key(&column))
            .map(|(&row, _)| row)
            .max()
    }

    pub fn max_column(&self, row: usize) -> Option<usize> {
        self.cells.get(&row)?.keys().next_back().copied()
    }

    pub fn max_probes(&self) -> usize {
        self.max_probes
    }
}
