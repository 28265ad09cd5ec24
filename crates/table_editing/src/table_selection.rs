//! Resolving a document range to a rectangle of table cells

use crate::table_column::TableColumn;
use crate::table_helper::{containing_cell, containing_row, containing_table, table_element_contains_editing_mark};
use html_dom::{Document, NodeId, Range};
use std::cmp::Ordering;

/// The table cells covered by a range, taken at one moment.
///
/// A selection is computed fresh for every command and must not be kept
/// across document edits. When the range does not resolve to cells of a
/// single editable table, [`TableSelection::table`] is `None` and every
/// other field is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSelection {
    table: Option<NodeId>,
    begin_cell: Option<NodeId>,
    end_cell: Option<NodeId>,
    begin_row: Option<NodeId>,
    end_row: Option<NodeId>,
    begin_column: Option<TableColumn>,
    end_column: Option<TableColumn>,
    selected_cells: Vec<NodeId>,
    has_contiguous_selection: bool,
    entire_table_selected: bool,
}

impl TableSelection {
    pub fn new(doc: &Document, range: Range) -> Self {
        let mut cells = match doc.elements_in_range(range, |node| node.is_cell()) {
            Ok(cells) => cells,
            Err(e) => {
                tracing::debug!(error = %e, "selection range is not valid in the document");
                return Self::default();
            }
        };
        drop_enclosing_cells(doc, range, &mut cells);

        if cells.is_empty() {
            // A caret (or a range inside one cell's text) resolves to its cell,
            // but only where the document is editable
            let cell = doc
                .containing_element(range.start)
                .and_then(|element| containing_cell(doc, element))
                .filter(|cell| doc.is_content_editable(*cell));
            cells.extend(cell);
        }
        let (Some(begin_cell), Some(end_cell)) = (cells.first().copied(), cells.last().copied()) else {
            return Self::default();
        };

        let Some(table) = containing_table(doc, begin_cell) else {
            return Self::default();
        };
        if containing_table(doc, end_cell) != Some(table) || !table_element_contains_editing_mark(doc, table) {
            return Self::default();
        }

        let entire_table_selected = doc.outer_range(table).is_ok_and(|outer| {
            positions_equal(doc, outer, range)
        });
        if !entire_table_selected {
            let bounded = doc
                .inner_range(table)
                .and_then(|inner| doc.range_contains(inner, range))
                .unwrap_or(false);
            if !bounded {
                return Self::default();
            }
        }

        cells.retain(|cell| containing_table(doc, *cell) == Some(table));
        Self {
            table: Some(table),
            begin_cell: Some(begin_cell),
            end_cell: Some(end_cell),
            begin_row: containing_row(doc, begin_cell),
            end_row: containing_row(doc, end_cell),
            begin_column: Some(TableColumn::new(table, begin_cell)),
            end_column: Some(TableColumn::new(table, end_cell)),
            selected_cells: cells,
            has_contiguous_selection: begin_cell != end_cell,
            entire_table_selected,
        }
    }

    pub fn table(&self) -> Option<NodeId> {
        self.table
    }

    pub fn begin_cell(&self) -> Option<NodeId> {
        self.begin_cell
    }

    pub fn end_cell(&self) -> Option<NodeId> {
        self.end_cell
    }

    pub fn begin_row(&self) -> Option<NodeId> {
        self.begin_row
    }

    pub fn end_row(&self) -> Option<NodeId> {
        self.end_row
    }

    pub fn begin_column(&self) -> Option<TableColumn> {
        self.begin_column
    }

    pub fn end_column(&self) -> Option<TableColumn> {
        self.end_column
    }

    /// Covered cells of this table in document order
    pub fn selected_cells(&self) -> &[NodeId] {
        &self.selected_cells
    }

    /// More than one cell is selected
    pub fn has_contiguous_selection(&self) -> bool {
        self.has_contiguous_selection
    }

    pub fn entire_table_selected(&self) -> bool {
        self.entire_table_selected
    }

    pub fn single_row_selected(&self) -> bool {
        self.begin_row.is_some() && self.begin_row == self.end_row
    }

    /// True whenever a single cell is selected. This does not count
    /// columns: several cells stacked in one column report false.
    pub fn single_column_selected(&self) -> bool {
        !self.has_contiguous_selection
    }

    /// Every cell of the table is covered
    pub fn selection_spans_all_cells(&self, doc: &Document) -> bool {
        match self.table {
            Some(table) => {
                let total = doc
                    .table_cells(table)
                    .into_iter()
                    .filter(|cell| containing_table(doc, *cell) == Some(table))
                    .count();
                total > 0 && total == self.selected_cells.len()
            }
            None => false,
        }
    }
}

/// Remove cells that hold the whole range and enclose another candidate
/// cell, so a range inside a nested table resolves to the inner cells
fn drop_enclosing_cells(doc: &Document, range: Range, cells: &mut Vec<NodeId>) {
    let candidates = cells.clone();
    cells.retain(|cell| {
        let encloses_range = doc
            .inner_range(*cell)
            .and_then(|inner| doc.range_contains(inner, range))
            .unwrap_or(false);
        !(encloses_range
            && candidates
                .iter()
                .any(|other| other != cell && doc.is_ancestor_of(*cell, *other)))
    });
}

fn positions_equal(doc: &Document, a: Range, b: Range) -> bool {
    doc.compare_positions(a.start, b.start).ok() == Some(Ordering::Equal)
        && doc.compare_positions(a.end, b.end).ok() == Some(Ordering::Equal)
}
