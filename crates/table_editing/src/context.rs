//! Per-document registry of cell behaviors

use crate::behavior::TableCellEditingElementBehavior;
use crate::table_helper::containing_table;
use crate::table_selection::TableSelection;
use html_dom::{Document, NodeId};
use std::collections::HashMap;

/// Cell behaviors of the editable tables in one document, indexed by cell.
/// Owned by the manager and lent to the collaborators that need it.
#[derive(Debug, Clone, Default)]
pub struct TableEditingContext {
    cell_behaviors: HashMap<NodeId, TableCellEditingElementBehavior>,
}

impl TableEditingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a behavior to every cell of `table` that lacks one and drop
    /// behaviors whose cell has left the table
    pub fn register_table(&mut self, doc: &Document, table: NodeId) {
        let cells: Vec<NodeId> = doc
            .table_cells(table)
            .into_iter()
            .filter(|cell| containing_table(doc, *cell) == Some(table))
            .collect();
        self.cell_behaviors
            .retain(|cell, behavior| behavior.table() != table || cells.contains(cell));
        for cell in cells {
            self.cell_behaviors
                .entry(cell)
                .or_insert_with(|| TableCellEditingElementBehavior::new(cell, table));
        }
    }

    pub fn unregister_table(&mut self, table: NodeId) {
        self.cell_behaviors.retain(|_, behavior| behavior.table() != table);
    }

    pub fn cell_behavior(&self, cell: NodeId) -> Option<&TableCellEditingElementBehavior> {
        self.cell_behaviors.get(&cell)
    }

    pub fn len(&self) -> usize {
        self.cell_behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_behaviors.is_empty()
    }

    /// Highlight the cells of a multi-cell selection in `table`; every
    /// other cell of the table is unhighlighted. A whole-table selection
    /// is shown by the table border instead.
    pub fn track_cell_selection(&mut self, table: NodeId, selection: Option<&TableSelection>) {
        let highlighted: &[NodeId] = match selection {
            Some(selection)
                if selection.table() == Some(table)
                    && selection.has_contiguous_selection()
                    && !selection.entire_table_selected() =>
            {
                selection.selected_cells()
            }
            _ => &[],
        };
        for (cell, behavior) in self.cell_behaviors.iter_mut() {
            if behavior.table() == table {
                behavior.set_highlighted(highlighted.contains(cell));
            }
        }
    }

    /// Highlighted cells in no particular order
    pub fn highlighted_cells(&self) -> Vec<NodeId> {
        self.cell_behaviors
            .values()
            .filter(|behavior| behavior.is_highlighted())
            .map(|behavior| behavior.cell())
            .collect()
    }
}
