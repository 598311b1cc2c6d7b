mod error;
mod explorer;
mod grid;
mod index;
mod inspect;
mod key;
mod members;
mod options;
mod path;
mod printer;
mod resolve;

pub use crate::error::{ExploreError, Result};
pub use crate::explorer::{
    default_explorer, reset_default, set_default, Action, Explorer, Instruction, MISSING_TYPE_NAME,
};
pub use crate::grid::{Access, Grid, Placement, Root, DEFAULT_MAX_PROBES};
pub use crate::index::{build_index, CellSummary, FieldEntry, FieldList, IndexBuilder, IndexData, TableRow};
pub use crate::inspect::{is_explorable, short_type_name, Guarded, Inspect, Scalar, Sequence, View};
pub use crate::key::{fingerprint, key_label, key_token};
pub use crate::members::{members, visit_members, Member, Slot, DEFAULT_CHUNK_SIZE};
pub use crate::options::{ExploreOptions, DEFAULT_DUMP_FILE};
pub use crate::path::{AccessPath, Interval};
pub use crate::printer::{ellipsis, is_zero_printable, printable, safe_printable, MAX_PRINTABLE_LEN, NONE_LITERAL};
pub use crate::resolve::{with_resolved, Target};
