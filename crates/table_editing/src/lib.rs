//! Table Editing - Selection, structural editing and column resizing of HTML tables
//!
//! This crate implements the table-editing core of a WYSIWYG HTML editor:
//! resolving selections to table cells, row/column/cell commands with undo
//! units, mouse-driven column resizing and the behaviors that wire them to
//! an editor host.

mod error;
mod pixel_percent;
mod properties;

pub mod behavior;
pub mod column_sizing;
pub mod context;
pub mod host;
pub mod logging;
pub mod manager;
pub mod settings;
pub mod table_column;
pub mod table_editor;
pub mod table_helper;
pub mod table_selection;

pub use error::*;
pub use pixel_percent::*;
pub use properties::*;

pub use behavior::{
    fixup_empty_cells_for_publishing, Key, KeyEvent, TableCellEditingElementBehavior, TableEditingElementBehavior,
};
pub use column_sizing::{ColumnBoundary, MouseEvent, MouseEventKind, SizingOperation, SizingPhase, TableColumnSizeEditor};
pub use context::TableEditingContext;
pub use host::{Continuation, Cursor, EditorHost, EditorSession};
pub use manager::{CommandStates, TableCommand, TableEditingManager};
pub use settings::{DesignTimeBorder, SettingsManager, SizingSettings, TableCreationDefaults, TableEditingSettings};
pub use table_column::TableColumn;
pub use table_editor::TableEditor;
pub use table_selection::TableSelection;
