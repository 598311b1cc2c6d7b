use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::{ExploreError, Result};
use crate::grid::{Access, Grid, Placement, Root};
use crate::index::{self, IndexBuilder, IndexData};
use crate::inspect::{self, Inspect};
use crate::options::ExploreOptions;
use crate::path::{AccessPath, Interval};

/// Type name recorded for cells whose path leads nowhere at the time they are created.
pub const MISSING_TYPE_NAME: &str = "<missing>";

/// What to do with the cell an [`Instruction`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Down,
    Right,
    Up,
    Remove,
    ToggleZeros,
    Clear,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Down => "down",
            Action::Right => "right",
            Action::Up => "up",
            Action::Remove => "remove",
            Action::ToggleZeros => "toggleZeros",
            Action::Clear => "clear",
        }
    }

    /// Target coordinate of new cells for placement actions.
    fn destination(&self, row: usize, column: usize) -> Option<(usize, usize)> {
        match self {
            Action::Down => Some((row + 1, column)),
            Action::Right => Some((row, column + 1)),
            Action::Up => Some((row.saturating_sub(1), column)),
            Action::Remove | Action::ToggleZeros | Action::Clear => None,
        }
    }
}

impl FromStr for Action {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "down" => Ok(Action::Down),
            "right" => Ok(Action::Right),
            "up" => Ok(Action::Up),
            "remove" => Ok(Action::Remove),
            "toggleZeros" => Ok(Action::ToggleZeros),
            "clear" => Ok(Action::Clear),
            other => Err(ExploreError::InvalidAction(other.to_string())),
        }
    }
}

/// Navigation request as posted by a front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub row: usize,
    pub column: usize,
    #[serde(default)]
    pub selections: Vec<String>,
    pub action: String,
}

/// Explorer context: the grid of cells plus the options used to render it.
///
/// Every operation holds the grid lock for its whole span, so a render never observes a half
/// applied instruction.
pub struct Explorer {
    grid: Mutex<Grid>,
    options: ExploreOptions,
    breaking: AtomicBool,
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new(ExploreOptions::default())
    }
}

impl Explorer {
    pub fn new(options: ExploreOptions) -> Self {
        Self {
            grid: Mutex::new(Grid::new(options.max_probes)),
            options,
            breaking: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ExploreOptions {
        &self.options
    }

    /// Register a value the explorer takes ownership of. See [`Explorer::register_shared`].
    pub fn register<T>(&self, label: &str, value: T) -> Result<bool>
    where
        T: Inspect + Send + Sync + 'static,
    {
        self.register_shared(label, Arc::new(value))
    }

    /// Register a root shared with the host program; later host mutations through interior
    /// mutability show up on the next render.
    ///
    /// Returns `Ok(false)` if the value cannot be explored. A label that is already registered
    /// has its root replaced in place; otherwise the root goes to the next free row of column 0.
    pub fn register_shared(&self, label: &str, root: Root) -> Result<bool> {
        self.register_at(label, root, None)
    }

    /// Like [`Explorer::register_shared`] but places a new root according to `placement`.
    pub fn register_with(&self, label: &str, root: Root, placement: Placement) -> Result<bool> {
        self.register_at(label, root, Some(placement))
    }

    fn register_at(&self, label: &str, root: Root, placement: Option<Placement>) -> Result<bool> {
        if !inspect::is_explorable(root.as_ref()) {
            tracing::info!(label, type_name = %root.type_name(), "value can not be explored");
            return Ok(false);
        }
        let access = Access::new_root(label, root, self.options.hide_zeros);

        let mut grid = self.grid.lock();
        let access = match grid.replace_root_by_label(label, access) {
            Ok((row, column)) => {
                tracing::debug!(label, row, column, "replaced root");
                return Ok(true);
            }
            Err(access) => access,
        };
        let placement = placement.unwrap_or(Placement::Column(0));
        let (row, column) = placement.next(&grid);
        let (row, column) = grid.put(row, column, access, placement)?;
        tracing::debug!(label, row, column, "registered root");
        Ok(true)
    }

    pub fn root_labels(&self) -> Vec<String> {
        self.grid.lock().root_labels()
    }

    /// Copy of the binding at `(row, column)`.
    pub fn access_at(&self, row: usize, column: usize) -> Option<Access> {
        self.grid.lock().get(row, column).cloned()
    }

    /// Run `f` on the grid while holding the lock.
    pub fn with_grid<R>(&self, f: impl FnOnce(&Grid) -> R) -> R {
        f(&self.grid.lock())
    }

    pub fn set_breaking(&self, breaking: bool) {
        self.breaking.store(breaking, Ordering::SeqCst);
    }

    pub fn is_breaking(&self) -> bool {
        self.breaking.load(Ordering::SeqCst)
    }

    /// Decode and apply a JSON [`Instruction`].
    pub fn apply_json(&self, json: &str) -> Result<Vec<(usize, usize)>> {
        let instruction: Instruction = serde_json::from_str(json)?;
        self.apply(&instruction)
    }

    pub fn apply(&self, instruction: &Instruction) -> Result<Vec<(usize, usize)>> {
        let action = instruction.action.parse::<Action>()?;
        tracing::debug!(
            row = instruction.row,
            column = instruction.column,
            selections = ?instruction.selections,
            action = action.as_str(),
            "instruction"
        );
        self.drill_down(
            instruction.row,
            instruction.column,
            &instruction.selections,
            action,
        )
    }

    /// Apply `action` to the cell at `(row, column)`.
    ///
    /// For `down`, `right` and `up` every selected member key becomes a new cell next to the
    /// origin, probing along the destination row on collision. Selections that do not resolve to
    /// an explorable value are skipped. Returns the coordinates of the cells created.
    pub fn drill_down(
        &self,
        row: usize,
        column: usize,
        selections: &[String],
        action: Action,
    ) -> Result<Vec<(usize, usize)>> {
        let mut grid = self.grid.lock();
        let Some(from) = grid.get(row, column).cloned() else {
            return Err(ExploreError::NoCell { row, column });
        };

        let Some((to_row, to_column)) = action.destination(row, column) else {
            match action {
                Action::Remove => {
                    if !grid.remove_at(row, column) {
                        tracing::warn!(label = %from.label, row, column, "cannot remove root cell");
                    }
                }
                Action::ToggleZeros => {
                    grid.update_at(row, column, |access| access.hide_zeros = !access.hide_zeros);
                }
                Action::Clear => grid.clear_non_roots(),
                Action::Down | Action::Right | Action::Up => {}
            }
            return Ok(Vec::new());
        };

        let mut placed = Vec::with_capacity(selections.len());
        for key in selections {
            let path = from.path.child(key);
            let label = format!("{}.{}", from.label, key);
            let resolved = resolve_type(&from.root, &path);
            let type_name = match resolved {
                Some((type_name, true)) => type_name,
                Some((type_name, false)) if Interval::is_token(key) => type_name,
                None if Interval::is_token(key) => from.type_name.clone(),
                other => {
                    let type_name = other.map(|(t, _)| t).unwrap_or_default();
                    tracing::warn!(path = %label, type_name = %type_name, "cannot explore this");
                    continue;
                }
            };
            let access = from.descendant(path, label, type_name, self.options.hide_zeros);
            let at = grid.put(to_row, to_column, access, Placement::Row(to_row))?;
            placed.push(at);
        }
        Ok(placed)
    }

    /// Open a cell for `dotted`, a path that starts with a root label (`"thing.arr"`).
    ///
    /// The cell is placed starting at the root's coordinates and probes with `placement`, by
    /// default the next free column of the root's row. Returns `Ok(None)` for an empty path or an
    /// unknown root.
    pub fn follow_path(
        &self,
        dotted: &str,
        placement: Option<Placement>,
    ) -> Result<Option<(usize, usize)>> {
        if dotted.is_empty() {
            return Ok(None);
        }
        let mut segments = dotted.split('.');
        let root_label = segments.next().unwrap_or_default();

        let mut grid = self.grid.lock();
        let Some((row, column, root)) = grid.root_with_label(root_label) else {
            tracing::info!(label = root_label, "object not found");
            return Ok(None);
        };
        let root = root.clone();

        let path = AccessPath::from_segments(segments);
        let type_name = resolve_type(&root.root, &path)
            .map(|(type_name, _)| type_name)
            .unwrap_or_else(|| MISSING_TYPE_NAME.to_string());
        let access = root.descendant(path, dotted.to_string(), type_name, self.options.hide_zeros);
        let placement = placement.unwrap_or(Placement::Row(row));
        grid.put(row, column, access, placement).map(Some)
    }

    /// Build the presentation data of every cell.
    pub fn render(&self) -> IndexData {
        let mut grid = self.grid.lock();
        let builder = IndexBuilder::new(&self.options).breaking(self.is_breaking());
        index::build_index(&mut grid, builder)
    }

    /// Render for a static consumer: not live, stamped with the current UTC time.
    pub fn snapshot(&self) -> IndexData {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
        let generated_utc = OffsetDateTime::now_utc().format(&format).ok();
        let mut grid = self.grid.lock();
        let builder = IndexBuilder::new(&self.options)
            .breaking(self.is_breaking())
            .not_live(generated_utc);
        index::build_index(&mut grid, builder)
    }

    /// Write a [`Explorer::snapshot`] as pretty JSON to `path`, or to the configured dump file.
    pub fn dump(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.options.dump_file.clone());
        let snapshot = self.snapshot();

        // Atomic write in same dir
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), &snapshot)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| ExploreError::Io(e.error))?;

        tracing::info!(path = %path.display(), cells = snapshot.cells().count(), "dump written");
        Ok(path)
    }
}

// Declared type of the value at `path`, and whether it can be explored.
fn resolve_type(root: &Root, path: &AccessPath) -> Option<(String, bool)> {
    crate::resolve::with_resolved(root.as_ref(), path.segments(), |target| {
        target.map(|t| (t.type_name(), t.is_explorable()))
    })
}

static DEFAULT_EXPLORER: Lazy<RwLock<Option<Arc<Explorer>>>> = Lazy::new(|| RwLock::new(None));

/// Make `explorer` reachable from anywhere through [`default_explorer`].
pub fn set_default(explorer: Arc<Explorer>) {
    *DEFAULT_EXPLORER.write() = Some(explorer);
}

pub fn default_explorer() -> Option<Arc<Explorer>> {
    DEFAULT_EXPLORER.read().clone()
}

pub fn reset_default() -> Option<Arc<Explorer>> {
    DEFAULT_EXPLORER.write().take()
}
