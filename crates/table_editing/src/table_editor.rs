//! Table commands
//!
//! Every command resolves a fresh [`TableSelection`] from a range (the live
//! selection unless told otherwise), wraps its document changes in an undo
//! unit from the host and commits the unit when the change succeeds. A
//! failure part way through leaves the unit uncommitted and does not roll
//! back the edits already made.

use crate::host::EditorHost;
use crate::table_column::{
    read_background_color, read_cell_properties, read_cell_width, read_horizontal_alignment, read_vertical_alignment,
    write_cell_properties, TableColumn,
};
use crate::table_helper::{
    containing_block, rendered_width, row_height, synchronize_cell_and_table_widths_for_editing, table_width,
    update_design_time_borders, EDITABLE_MARKER_ATTRIBUTE, EDITABLE_MARKER_VALUE,
};
use crate::table_selection::TableSelection;
use crate::{
    CellProperties, ColumnProperties, HorizontalAlignment, Mixable, PixelPercent, PixelPercentUnits, Result,
    RowProperties, TableCreationParameters, TableEditError, TableProperties, VerticalAlignment,
};
use html_dom::{Document, NodeId, Range};

/// Command layer over the tables of a host document
pub struct TableEditor<'a> {
    host: &'a mut dyn EditorHost,
    selection: TableSelection,
}

impl<'a> TableEditor<'a> {
    /// Editor bound to the host's live selection
    pub fn new(host: &'a mut dyn EditorHost) -> Self {
        let range = host.selected_range();
        Self::with_range(host, range)
    }

    /// Editor bound to an explicit range
    pub fn with_range(host: &'a mut dyn EditorHost, range: Range) -> Self {
        let selection = TableSelection::new(host.document(), range);
        Self { host, selection }
    }

    /// Editor covering a whole table
    pub fn for_table(host: &'a mut dyn EditorHost, table: NodeId) -> Result<Self> {
        let range = host.document().outer_range(table)?;
        Ok(Self::with_range(host, range))
    }

    pub fn selection(&self) -> &TableSelection {
        &self.selection
    }

    // =========================================================================
    // Table creation
    // =========================================================================

    /// Insert a new table at the caret and put the caret in its first cell
    pub fn insert_table(host: &mut dyn EditorHost, parameters: &TableCreationParameters) -> Result<NodeId> {
        parameters.validate(&host.settings().limits)?;

        let range = host.selected_range();
        let mut width = parameters.properties.width;
        if width.is_pixels() {
            // A table inside a cell is no wider than the cell
            let layout = host.layout();
            let doc = host.document();
            let parent_cell = containing_block(doc, range.start).filter(|b| doc.get(*b).is_some_and(|n| n.is_cell()));
            if let Some(cell) = parent_cell {
                let cell_width = rendered_width(&layout, cell);
                if cell_width > 0 && cell_width < width.value() {
                    width = PixelPercent::pixels(cell_width);
                }
            }
        }

        let columns = i32::try_from(parameters.columns).map_err(|_| TableEditError::InvalidParameter {
            field: "columns".into(),
            reason: "too many columns".into(),
        })?;
        let column_width = match width.units() {
            PixelPercentUnits::Pixels => Some(width.checked_div(columns)?.to_string()),
            PixelPercentUnits::Percentage => Some(format!("{}%", 100 / columns)),
            PixelPercentUnits::Undefined => None,
        };

        let unit = host.create_undo_unit("Insert Table");
        let doc = host.document_mut();
        let table = doc.create_element("table");
        if width.is_defined() {
            doc.set_attribute(table, "width", &width.to_string())?;
        }
        let properties = &parameters.properties;
        for (name, value) in [
            ("border", &properties.border_size),
            ("cellpadding", &properties.cell_padding),
            ("cellspacing", &properties.cell_spacing),
        ] {
            if !value.is_empty() {
                doc.set_attribute(table, name, value)?;
            }
        }
        doc.set_attribute(table, EDITABLE_MARKER_ATTRIBUTE, EDITABLE_MARKER_VALUE)?;

        let body = doc.create_element("tbody");
        doc.append_child(table, body)?;
        for _ in 0..parameters.rows {
            let row = doc.create_element("tr");
            doc.append_child(body, row)?;
            for _ in 0..parameters.columns {
                let cell = doc.create_element("td");
                doc.set_attribute(cell, "valign", "top")?;
                if let Some(column_width) = &column_width {
                    doc.set_attribute(cell, "width", column_width)?;
                }
                doc.append_child(row, cell)?;
            }
        }
        doc.insert_at(range.start, table)?;
        host.commit_undo_unit(unit);

        tracing::debug!(%table, rows = parameters.rows, columns = parameters.columns, "inserted table");
        if let Some(first) = host.document().table_cells(table).first().copied() {
            select_cell(host, first)?;
        }
        Ok(table)
    }

    /// Insert a table using the remembered creation defaults
    pub fn insert_table_with_defaults(host: &mut dyn EditorHost) -> Result<NodeId> {
        let parameters = host.settings().defaults.parameters();
        Self::insert_table(host, &parameters)
    }

    // =========================================================================
    // Table level commands
    // =========================================================================

    pub fn table_properties(&self) -> Result<TableProperties> {
        let table = self.require_table()?;
        let doc = self.host.document();
        let read = |name: &str| doc.attribute(table, name).unwrap_or_default().to_string();
        Ok(TableProperties {
            cell_padding: read("cellpadding"),
            cell_spacing: read("cellspacing"),
            border_size: read("border"),
            width: table_width(doc, table),
        })
    }

    /// Apply table attributes. A new pixel width is spread across the
    /// columns of the first row, the leftover going to the first column.
    pub fn set_table_properties(&mut self, properties: &TableProperties) -> Result<()> {
        let table = self.require_table()?;
        if self.table_properties()? == *properties {
            return Ok(());
        }
        let border = self.host.settings().design_time_border.clone();

        let unit = self.host.create_undo_unit("Table Properties");
        let doc = self.host.document_mut();
        set_or_remove(doc, table, "cellpadding", &properties.cell_padding)?;
        set_or_remove(doc, table, "cellspacing", &properties.cell_spacing)?;
        set_or_remove(doc, table, "border", &properties.border_size)?;

        let existing = table_width(doc, table);
        if !existing.is_percentage() && properties.width.is_pixels() {
            spread_width_change(doc, table, properties.width.value() - existing.value())?;
        }
        set_or_remove(doc, table, "width", &properties.width.to_string())?;

        update_design_time_borders(doc, table, &border)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    pub fn delete_table(&mut self) -> Result<()> {
        let table = self.require_table()?;
        let unit = self.host.create_undo_unit("Delete Table");
        self.remove_table(table)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    // =========================================================================
    // Row level commands
    // =========================================================================

    pub fn row_properties(&self) -> Result<RowProperties> {
        let row = self.selection.begin_row().ok_or(TableEditError::NoTableSelected)?;
        let doc = self.host.document();
        let cells = doc.row_cells(row);
        Ok(RowProperties {
            height: row_height(doc, row),
            cell_properties: CellProperties {
                background_color: Mixable::reduce(cells.iter().map(|c| read_background_color(doc, *c)), None),
                horizontal_alignment: Mixable::reduce(
                    cells.iter().map(|c| read_horizontal_alignment(doc, *c)),
                    HorizontalAlignment::Left,
                ),
                vertical_alignment: Mixable::reduce(
                    cells.iter().map(|c| read_vertical_alignment(doc, *c)),
                    VerticalAlignment::Middle,
                ),
            },
        })
    }

    /// Apply a row height (0 removes it) and cell formatting to every cell
    /// of the first selected row
    pub fn set_row_properties(&mut self, properties: &RowProperties) -> Result<()> {
        let row = self.selection.begin_row().ok_or(TableEditError::NoTableSelected)?;
        if self.row_properties()? == *properties {
            return Ok(());
        }

        let unit = self.host.create_undo_unit("Row Properties");
        let doc = self.host.document_mut();
        if properties.height > 0 {
            set_or_remove(doc, row, "height", &properties.height.to_string())?;
        } else {
            doc.remove_attribute(row, "height")?;
        }
        for cell in doc.row_cells(row) {
            write_cell_properties(doc, cell, &properties.cell_properties)?;
        }
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    /// Insert a copy of the first selected row above it; `None` without a row
    pub fn insert_row_above(&mut self) -> Result<Option<NodeId>> {
        self.insert_row(false)
    }

    /// Insert a copy of the last selected row below it; `None` without a row
    pub fn insert_row_below(&mut self) -> Result<Option<NodeId>> {
        self.insert_row(true)
    }

    pub fn move_row_up(&mut self) -> Result<()> {
        self.preserving_selection(|editor| editor.move_row(false))
    }

    pub fn move_row_down(&mut self) -> Result<()> {
        self.preserving_selection(|editor| editor.move_row(true))
    }

    /// Delete the selected rows, and the table if no cells remain
    pub fn delete_rows(&mut self) -> Result<()> {
        let (Some(table), Some(begin_row), Some(end_row), Some(end_column)) = (
            self.selection.table(),
            self.selection.begin_row(),
            self.selection.end_row(),
            self.selection.end_column(),
        ) else {
            tracing::debug!("delete rows without a selected row");
            return Ok(());
        };

        let doc = self.host.document();
        let rows = doc.table_rows(table);
        let (Some(begin_index), Some(end_index)) = (doc.row_index(begin_row), doc.row_index(end_row)) else {
            return Err(TableEditError::InvalidOperation("selected row is not in its table".into()));
        };
        let column_index = end_column.index(doc).unwrap_or(0);

        // Move the caret out of the rows before they go
        let next_cell = rows
            .get(end_index + 1)
            .and_then(|next| doc.row_cells(*next).get(column_index).copied());
        let caret = match next_cell {
            Some(cell) => doc.after_begin(cell)?,
            None => doc.after_end(table)?,
        };

        let unit = self.host.create_undo_unit("Delete Rows");
        self.host.select(Range::collapsed(caret));
        let doc = self.host.document_mut();
        for row in &rows[begin_index..=end_index] {
            doc.remove(*row)?;
        }
        self.delete_table_if_empty(table)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    // =========================================================================
    // Column oriented commands
    // =========================================================================

    pub fn column_properties(&self) -> Result<ColumnProperties> {
        let column = self.selection.begin_column().ok_or(TableEditError::NoTableSelected)?;
        let doc = self.host.document();
        Ok(ColumnProperties {
            width: column.width(doc),
            cell_properties: column.cell_properties(doc),
        })
    }

    pub fn set_column_properties(&mut self, properties: &ColumnProperties) -> Result<()> {
        let column = self.selection.begin_column().ok_or(TableEditError::NoTableSelected)?;
        if self.column_properties()? == *properties {
            return Ok(());
        }

        let unit = self.host.create_undo_unit("Column Properties");
        let doc = self.host.document_mut();
        column.set_width(doc, properties.width)?;
        column.set_cell_properties(doc, &properties.cell_properties)?;
        self.sync_widths(column.table())?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    pub fn insert_column_left(&mut self) -> Result<()> {
        match self.selection.begin_column() {
            Some(column) => self.insert_adjacent_column(column, false),
            None => Ok(()),
        }
    }

    pub fn insert_column_right(&mut self) -> Result<()> {
        match self.selection.end_column() {
            Some(column) => self.insert_adjacent_column(column, true),
            None => Ok(()),
        }
    }

    pub fn move_column_left(&mut self) -> Result<()> {
        self.preserving_selection(|editor| editor.move_column(false))
    }

    pub fn move_column_right(&mut self) -> Result<()> {
        self.preserving_selection(|editor| editor.move_column(true))
    }

    /// Delete the selected columns from every row, and the table if no
    /// cells remain
    pub fn delete_columns(&mut self) -> Result<()> {
        let (Some(table), Some(end_row), Some(begin_column), Some(end_column)) = (
            self.selection.table(),
            self.selection.end_row(),
            self.selection.begin_column(),
            self.selection.end_column(),
        ) else {
            tracing::debug!("delete columns without a selected column");
            return Ok(());
        };

        let doc = self.host.document();
        let (Some(begin_index), Some(end_index)) = (begin_column.index(doc), end_column.index(doc)) else {
            return Err(TableEditError::InvalidOperation("selected cell is not in a row".into()));
        };
        let (first, last) = (begin_index.min(end_index), begin_index.max(end_index));
        let doomed: Vec<NodeId> = doc
            .table_rows(table)
            .into_iter()
            .flat_map(|row| {
                let cells = doc.row_cells(row);
                cells.into_iter().skip(first).take(last - first + 1)
            })
            .collect();

        let caret = match doc.row_cells(end_row).get(last + 1) {
            Some(next) => doc.after_begin(*next)?,
            None => doc.after_end(table)?,
        };

        let unit = self.host.create_undo_unit("Delete Columns");
        self.host.select(Range::collapsed(caret));

        let doc = self.host.document_mut();
        for cell in doomed {
            doc.remove(cell)?;
        }
        self.sync_widths(table)?;
        self.delete_table_if_empty(table)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    // =========================================================================
    // Cell oriented commands
    // =========================================================================

    pub fn cell_properties(&self) -> Result<CellProperties> {
        let cell = self.selection.begin_cell().ok_or(TableEditError::NoTableSelected)?;
        Ok(read_cell_properties(self.host.document(), cell))
    }

    /// Apply formatting to the first selected cell
    pub fn set_cell_properties(&mut self, properties: &CellProperties) -> Result<()> {
        let cell = self.selection.begin_cell().ok_or(TableEditError::NoTableSelected)?;
        if self.cell_properties()? == *properties {
            return Ok(());
        }
        let unit = self.host.create_undo_unit("Cell Properties");
        write_cell_properties(self.host.document_mut(), cell, properties)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    /// Empty every selected cell and put the caret in the first one
    pub fn clear_cells(&mut self) -> Result<()> {
        let Some(begin_cell) = self.selection.begin_cell() else {
            return Ok(());
        };
        let unit = self.host.create_undo_unit("Clear Cells");
        let doc = self.host.document_mut();
        for cell in self.selection.selected_cells() {
            doc.clear_children(*cell)?;
        }
        select_cell(self.host, begin_cell)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    /// Put the placeholder into empty cells so they keep their size.
    ///
    /// Hosts call this before handing the live document to a consumer that
    /// collapses empty cells, such as saving a draft. It undoes
    /// [`Self::make_empty_cells_null`], which runs when the table gains the
    /// selection. Published markup is padded by
    /// [`fixup_empty_cells_for_publishing`](crate::fixup_empty_cells_for_publishing)
    /// instead.
    pub fn make_empty_cells_nbsp(&mut self) -> Result<()> {
        let Some(table) = self.selection.table() else {
            return Ok(());
        };
        let placeholder = self.host.settings().empty_cell_placeholder.clone();
        let doc = self.host.document();
        let empty: Vec<NodeId> = all_cells(doc, table)
            .into_iter()
            .filter(|cell| doc.inner_html(*cell).is_empty())
            .collect();
        if empty.is_empty() {
            return Ok(());
        }

        let unit = self.host.create_invisible_undo_unit("Pad Empty Cells");
        let doc = self.host.document_mut();
        for cell in empty {
            doc.set_inner_html(cell, &placeholder)?;
        }
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    /// Turn placeholder-only cells back into empty cells
    pub fn make_empty_cells_null(&mut self) -> Result<()> {
        let Some(table) = self.selection.table() else {
            return Ok(());
        };
        let placeholder = self.host.settings().empty_cell_placeholder.clone();
        let doc = self.host.document();
        let padded: Vec<NodeId> = all_cells(doc, table)
            .into_iter()
            .filter(|cell| {
                let inner = doc.inner_html(*cell);
                inner == placeholder && !doc.children(*cell).is_empty()
            })
            .collect();
        if padded.is_empty() {
            return Ok(());
        }

        // The caret would be left dangling inside a removed placeholder
        let caret = self.host.selected_range().start.container;
        let caret_cell = padded
            .iter()
            .copied()
            .find(|cell| *cell == caret || doc.is_ancestor_of(*cell, caret));

        let unit = self.host.create_invisible_undo_unit("Empty Cells");
        let doc = self.host.document_mut();
        for cell in padded {
            doc.clear_children(cell)?;
        }
        if let Some(cell) = caret_cell {
            let start = doc.after_begin(cell)?;
            self.host.select(Range::collapsed(start));
        }
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    // =========================================================================
    // Selection mutating commands
    // =========================================================================

    /// Insert a `<br>` at the start of the live selection and put the caret after it
    pub fn insert_line_break(&mut self) -> Result<()> {
        let range = self.host.selected_range();
        let unit = self.host.create_invisible_undo_unit("Line Break");
        let doc = self.host.document_mut();
        let line_break = doc.create_element("br");
        let after = doc.insert_at(range.start, line_break)?;
        self.host.select(Range::collapsed(after));
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    /// Move to the next cell, adding a row when leaving the last cell. A
    /// multi-cell selection collapses to its first cell.
    pub fn select_next_cell(&mut self) -> Result<()> {
        let (Some(table), Some(begin_cell)) = (self.selection.table(), self.selection.begin_cell()) else {
            return Ok(());
        };
        let mut target = if self.selection.has_contiguous_selection() {
            Some(begin_cell)
        } else {
            let doc = self.host.document();
            doc.seek_element_right(doc.after_end(begin_cell)?, doc.before_end(table)?, |node| node.is_cell())?
        };

        if target.is_none() {
            if let Some(row) = self.insert_row_below()? {
                target = self.host.document().row_cells(row).first().copied();
            }
        }
        match target {
            Some(cell) => select_cell(self.host, cell),
            None => Ok(()),
        }
    }

    /// Move to the previous cell. A multi-cell selection collapses to its
    /// first cell.
    pub fn select_previous_cell(&mut self) -> Result<()> {
        let (Some(table), Some(begin_cell)) = (self.selection.table(), self.selection.begin_cell()) else {
            return Ok(());
        };
        let target = if self.selection.has_contiguous_selection() {
            Some(begin_cell)
        } else {
            let doc = self.host.document();
            doc.seek_element_left(doc.before_begin(begin_cell)?, doc.after_begin(table)?, |node| node.is_cell())?
        };
        match target {
            Some(cell) => select_cell(self.host, cell),
            None => Ok(()),
        }
    }

    pub fn select_cell(&mut self, cell: NodeId) -> Result<()> {
        select_cell(self.host, cell)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_table(&self) -> Result<NodeId> {
        self.selection.table().ok_or(TableEditError::NoTableSelected)
    }

    fn sync_widths(&mut self, table: NodeId) -> Result<()> {
        let options = self.host.layout_options().clone();
        synchronize_cell_and_table_widths_for_editing(self.host.document_mut(), &options, table)
    }

    /// Run a command and restore the live selection afterwards
    fn preserving_selection(&mut self, command: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let preserved = self.host.selected_range();
        let result = command(self);
        let doc = self.host.document();
        if doc.is_valid_position(preserved.start) && doc.is_valid_position(preserved.end) {
            self.host.select(preserved);
        }
        result
    }

    fn insert_row(&mut self, below: bool) -> Result<Option<NodeId>> {
        let selected_row = if below { self.selection.end_row() } else { self.selection.begin_row() };
        let (Some(table), Some(selected_row)) = (self.selection.table(), selected_row) else {
            tracing::debug!("insert row without a selected row");
            return Ok(None);
        };

        let unit = self.host.create_undo_unit("Insert Row");
        let doc = self.host.document_mut();
        let index = doc
            .row_index(selected_row)
            .ok_or_else(|| TableEditError::InvalidOperation("selected row is not in its table".into()))?;
        let new_row = doc.insert_row(table, if below { index + 1 } else { index })?;
        doc.copy_attributes(selected_row, new_row)?;
        for (position, cell) in doc.row_cells(selected_row).into_iter().enumerate() {
            let new_cell = doc.insert_cell(new_row, position)?;
            doc.copy_attributes(cell, new_cell)?;
        }
        self.host.commit_undo_unit(unit);
        Ok(Some(new_row))
    }

    fn move_row(&mut self, down: bool) -> Result<()> {
        let (Some(table), Some(row)) = (self.selection.table(), self.selection.begin_row()) else {
            return Ok(());
        };
        if !self.selection.single_row_selected() {
            tracing::debug!("move row ignored for a multi-row selection");
            return Ok(());
        }
        let doc = self.host.document();
        let rows = doc.table_rows(table);
        let Some(index) = doc.row_index(row) else {
            return Ok(());
        };
        let target = if down {
            rows.get(index + 1).copied()
        } else {
            index.checked_sub(1).and_then(|i| rows.get(i).copied())
        };
        let Some(target) = target else {
            tracing::debug!(index, "move row ignored at the table edge");
            return Ok(());
        };

        let unit = self.host.create_undo_unit("Move Row");
        self.host.document_mut().swap_nodes(row, target)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    fn move_column(&mut self, right: bool) -> Result<()> {
        let (Some(table), Some(row), Some(column)) = (
            self.selection.table(),
            self.selection.begin_row(),
            self.selection.begin_column(),
        ) else {
            return Ok(());
        };
        if !self.selection.single_column_selected() {
            tracing::debug!("move column ignored for a multi-cell selection");
            return Ok(());
        }
        let doc = self.host.document();
        let Some(source) = column.index(doc) else {
            return Ok(());
        };
        let target = if right {
            let row_length = doc.row_cells(row).len();
            if source + 1 >= row_length {
                None
            } else {
                Some(source + 1)
            }
        } else {
            source.checked_sub(1)
        };
        let Some(target) = target else {
            tracing::debug!(source, "move column ignored at the table edge");
            return Ok(());
        };

        let swaps: Vec<(NodeId, NodeId)> = doc
            .table_rows(table)
            .into_iter()
            .filter_map(|row| {
                let cells = doc.row_cells(row);
                Some((*cells.get(source)?, *cells.get(target)?))
            })
            .collect();

        let unit = self.host.create_undo_unit("Move Column");
        let doc = self.host.document_mut();
        for (a, b) in swaps {
            doc.swap_nodes(a, b)?;
        }
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    /// Insert a cell beside the column in every row that reaches it, each
    /// copying the attributes of its own row's cell in the column
    fn insert_adjacent_column(&mut self, column: TableColumn, after: bool) -> Result<()> {
        let table = column.table();
        let doc = self.host.document();
        let Some(index) = column.index(doc) else {
            return Ok(());
        };
        let unit = self.host.create_undo_unit("Insert Column");
        let doc = self.host.document_mut();
        for row in doc.table_rows(table) {
            let Some(source) = doc.row_cells(row).get(index).copied() else {
                continue;
            };
            let new_cell = doc.insert_cell(row, if after { index + 1 } else { index })?;
            doc.copy_attributes(source, new_cell)?;
        }
        self.sync_widths(table)?;
        self.host.commit_undo_unit(unit);
        Ok(())
    }

    fn delete_table_if_empty(&mut self, table: NodeId) -> Result<()> {
        if all_cells(self.host.document(), table).is_empty() {
            tracing::debug!(%table, "last cell removed, deleting table");
            self.remove_table(table)?;
        }
        Ok(())
    }

    /// Remove a table, leaving the caret where it stood
    fn remove_table(&mut self, table: NodeId) -> Result<()> {
        let doc = self.host.document_mut();
        let caret = doc.before_begin(table)?;
        doc.remove(table)?;
        self.host.select(Range::collapsed(caret));
        self.host.fire_selection_changed();
        Ok(())
    }
}

/// Select the contents of a cell; an empty cell gets a caret at its start
pub fn select_cell(host: &mut dyn EditorHost, cell: NodeId) -> Result<()> {
    let doc = host.document();
    let range = if doc.children(cell).is_empty() {
        Range::collapsed(doc.after_begin(cell)?)
    } else {
        doc.inner_range(cell)?
    };
    host.select(range);
    Ok(())
}

/// Every cell inside a table, nested tables included
fn all_cells(doc: &Document, table: NodeId) -> Vec<NodeId> {
    doc.descendants(table)
        .into_iter()
        .filter(|id| doc.get(*id).is_some_and(|node| node.is_cell()))
        .collect()
}

/// Write a string attribute, removing it when the value is empty
fn set_or_remove(doc: &mut Document, id: NodeId, name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        doc.remove_attribute(id, name)?;
    } else if doc.attribute(id, name) != Some(value) {
        doc.set_attribute(id, name, value)?;
    }
    Ok(())
}

/// Distribute a change in table width over the first row's columns
fn spread_width_change(doc: &mut Document, table: NodeId, change: i32) -> Result<()> {
    if change == 0 {
        return Ok(());
    }
    let Some(first_row) = doc.table_rows(table).first().copied() else {
        return Ok(());
    };
    let cells = doc.row_cells(first_row);
    let count = i32::try_from(cells.len()).unwrap_or(i32::MAX);
    if count == 0 {
        return Ok(());
    }
    let per_column = change / count;
    let mut leftover = change % count;
    for cell in cells {
        let column = TableColumn::new(table, cell);
        let current = match column.width(doc) {
            Mixable::Value(width) if width.is_percentage() => {
                leftover = 0;
                continue;
            }
            Mixable::Value(width) => width.value(),
            Mixable::Mixed => read_cell_width(doc, cell).value(),
        };
        let updated = PixelPercent::pixels(current.saturating_add(per_column).saturating_add(leftover));
        column.set_width(doc, Mixable::Value(updated))?;
        leftover = 0;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::EditorSession;
    use crate::Color;
    use html_dom::Position;

    const GRID: &str = "<table unselectable=\"on\"><tbody><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></tbody></table>";

    fn session(html: &str) -> EditorSession {
        EditorSession::from_html(html).unwrap()
    }

    fn first_table(session: &EditorSession) -> NodeId {
        let doc = session.document();
        doc.descendants(doc.root())
            .into_iter()
            .find(|id| doc.get(*id).is_some_and(|n| n.is_table()))
            .unwrap()
    }

    fn cells(session: &EditorSession) -> Vec<NodeId> {
        session.document().table_cells(first_table(session))
    }

    fn caret_in(session: &mut EditorSession, cell: NodeId) {
        session.select(Range::collapsed(Position::new(cell, 0)));
    }

    fn texts(session: &EditorSession) -> Vec<String> {
        cells(session).into_iter().map(|c| session.document().text_content(c)).collect()
    }

    #[test]
    fn test_insert_row_above_and_below() {
        let mut session = session(GRID);
        let original = cells(&session)[2];
        caret_in(&mut session, original);
        TableEditor::new(&mut session).insert_row_above().unwrap();
        caret_in(&mut session, original);
        TableEditor::new(&mut session).insert_row_below().unwrap();

        let doc = session.document();
        let rows = doc.table_rows(first_table(&session));
        assert_eq!(rows.len(), 4);
        for row in rows {
            assert_eq!(doc.row_cells(row).len(), 2);
        }
        assert_eq!(doc.row_index(doc.parent(original).unwrap()), Some(2));
    }

    #[test]
    fn test_inserted_row_copies_attributes() {
        let mut session = session(
            "<table unselectable=\"on\"><tr class=\"r\"><td width=\"40\" id=\"x\">a</td></tr></table>",
        );
        let cell = cells(&session)[0];
        caret_in(&mut session, cell);
        let row = TableEditor::new(&mut session).insert_row_below().unwrap().unwrap();
        let doc = session.document();
        assert_eq!(doc.attribute(row, "class"), Some("r"));
        let new_cell = doc.row_cells(row)[0];
        assert_eq!(doc.attribute(new_cell, "width"), Some("40"));
        assert_eq!(doc.attribute(new_cell, "id"), None);
    }

    #[test]
    fn test_insert_row_without_selection_is_none() {
        let mut session = session(GRID);
        assert_eq!(TableEditor::new(&mut session).insert_row_above().unwrap(), None);
        assert_eq!(session.history().undo_depth(), 0);
    }

    #[test]
    fn test_delete_only_row_deletes_table() {
        let mut session = session("<p>x</p><table unselectable=\"on\"><tr><td>a</td><td>b</td></tr></table>");
        let cell = cells(&session)[1];
        caret_in(&mut session, cell);
        TableEditor::new(&mut session).delete_rows().unwrap();

        assert_eq!(session.to_html(), "<p>x</p>");
        let caret = session.selection().start;
        assert_eq!(caret, Position::new(session.document().root(), 1));
    }

    #[test]
    fn test_delete_rows_moves_caret_to_next_row() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[1]);
        TableEditor::new(&mut session).delete_rows().unwrap();
        assert_eq!(texts(&session), vec!["c", "d"]);
        assert_eq!(session.selection().start, Position::new(all[3], 0));
    }

    #[test]
    fn test_move_row_down_and_boundary() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        TableEditor::new(&mut session).move_row_down().unwrap();
        assert_eq!(texts(&session), vec!["c", "d", "a", "b"]);
        assert_eq!(session.selection().start, Position::new(all[0], 0));

        let depth = session.history().undo_depth();
        TableEditor::new(&mut session).move_row_down().unwrap();
        assert_eq!(session.history().undo_depth(), depth);
        assert_eq!(texts(&session), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_move_row_ignores_multi_row_selection() {
        let mut session = session(GRID);
        let all = cells(&session);
        session.select(Range::new(Position::new(all[0], 0), Position::new(all[3], 1)));
        TableEditor::new(&mut session).move_row_down().unwrap();
        assert_eq!(texts(&session), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_move_column_left_and_right() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[1]);
        TableEditor::new(&mut session).move_column_left().unwrap();
        assert_eq!(texts(&session), vec!["b", "a", "d", "c"]);

        caret_in(&mut session, all[1]);
        TableEditor::new(&mut session).move_column_left().unwrap();
        assert_eq!(texts(&session), vec!["b", "a", "d", "c"]);

        TableEditor::new(&mut session).move_column_right().unwrap();
        assert_eq!(texts(&session), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_insert_column_clones_each_rows_cell() {
        let mut session = session(
            "<table unselectable=\"on\"><tr><td bgcolor=\"#FF0000\">a</td><td>b</td></tr><tr><td align=\"right\">c</td><td>d</td></tr></table>",
        );
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        TableEditor::new(&mut session).insert_column_right().unwrap();

        let doc = session.document();
        let rows = doc.table_rows(first_table(&session));
        let first = doc.row_cells(rows[0]);
        let second = doc.row_cells(rows[1]);
        assert_eq!(first.len(), 3);
        assert_eq!(doc.attribute(first[1], "bgcolor"), Some("#FF0000"));
        assert_eq!(doc.attribute(second[1], "align"), Some("right"));
        assert_eq!(doc.attribute(second[1], "bgcolor"), None);
    }

    #[test]
    fn test_structural_commands_survive_oversized_attributes() {
        for html in [
            "<table unselectable=\"on\" width=\"100\" border=\"1500000000\"><tr><td>a</td></tr></table>",
            "<table unselectable=\"on\"><tr><td width=\"2000000000\">a</td><td width=\"2000000000\">b</td></tr></table>",
        ] {
            let mut session = session(html);
            let before = cells(&session);
            caret_in(&mut session, before[0]);
            TableEditor::new(&mut session).insert_column_right().unwrap();

            let doc = session.document();
            let table = first_table(&session);
            assert_eq!(doc.table_cells(table).len(), before.len() + 1, "{html}");
            for id in std::iter::once(table).chain(doc.table_cells(table)) {
                if let Some(width) = doc.attribute(id, "width") {
                    let width: i32 = width.parse().unwrap();
                    assert!((0..i32::MAX).contains(&width), "{html}: {width}");
                }
            }
        }
    }

    #[test]
    fn test_delete_columns() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        TableEditor::new(&mut session).delete_columns().unwrap();
        assert_eq!(texts(&session), vec!["b", "d"]);
        assert_eq!(session.selection().start, Position::new(all[1], 0));

        caret_in(&mut session, all[1]);
        TableEditor::new(&mut session).delete_columns().unwrap();
        assert_eq!(session.to_html(), "");
    }

    #[test]
    fn test_table_width_spread_over_columns() {
        let mut session = session(
            "<table unselectable=\"on\"><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>",
        );
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        let mut properties = TableEditor::new(&mut session).table_properties().unwrap();
        assert_eq!(properties.width, PixelPercent::UNDEFINED);
        properties.width = PixelPercent::pixels(200);
        TableEditor::new(&mut session).set_table_properties(&properties).unwrap();

        let doc = session.document();
        let table = first_table(&session);
        assert_eq!(doc.attribute(table, "width"), Some("200"));
        for cell in doc.table_cells(table) {
            assert_eq!(doc.attribute(cell, "width"), Some("100"));
        }
    }

    #[test]
    fn test_table_properties_round_trip_is_noop() {
        let html = "<table unselectable=\"on\" border=\"1\" width=\"50%\" cellpadding=\"3\"><tr><td>a</td></tr></table>";
        let mut session = session(html);
        let cell = cells(&session)[0];
        caret_in(&mut session, cell);
        let properties = TableEditor::new(&mut session).table_properties().unwrap();
        assert_eq!(properties.border_size, "1");
        assert_eq!(properties.cell_padding, "3");
        assert_eq!(properties.cell_spacing, "");
        TableEditor::new(&mut session).set_table_properties(&properties).unwrap();
        assert_eq!(session.to_html(), html);
        assert_eq!(session.history().undo_depth(), 0);
    }

    #[test]
    fn test_table_properties_remove_empty_attributes() {
        let mut session = session("<table unselectable=\"on\" border=\"1\" cellspacing=\"2\"><tr><td>a</td></tr></table>");
        let cell = cells(&session)[0];
        caret_in(&mut session, cell);
        let properties = TableProperties::default();
        TableEditor::new(&mut session).set_table_properties(&properties).unwrap();
        let table = first_table(&session);
        assert_eq!(session.document().attribute(table, "border"), None);
        assert_eq!(session.document().attribute(table, "cellspacing"), None);
        assert!(session.history().can_undo());
    }

    #[test]
    fn test_row_properties() {
        let mut session = session(
            "<table unselectable=\"on\"><tr><td align=\"center\">a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>",
        );
        let all = cells(&session);
        caret_in(&mut session, all[0]);
        let properties = TableEditor::new(&mut session).row_properties().unwrap();
        assert_eq!(properties.height, 0);
        assert_eq!(properties.cell_properties.horizontal_alignment, Mixable::Mixed);
        assert_eq!(properties.cell_properties.vertical_alignment, Mixable::Value(VerticalAlignment::Middle));

        let update = RowProperties {
            height: 40,
            cell_properties: CellProperties {
                background_color: Mixable::Value(Some(Color::new(0, 0, 255))),
                ..CellProperties::hands_off()
            },
        };
        TableEditor::new(&mut session).set_row_properties(&update).unwrap();
        let doc = session.document();
        assert_eq!(doc.attribute(doc.parent(all[0]).unwrap(), "height"), Some("40"));
        assert_eq!(doc.attribute(all[0], "align"), Some("center"));
        assert_eq!(doc.attribute(all[1], "bgcolor"), Some("#0000FF"));
        assert_eq!(doc.attribute(all[2], "bgcolor"), None);
    }

    #[test]
    fn test_cell_properties_apply_to_begin_cell() {
        let mut session = session(GRID);
        let all = cells(&session);
        session.select(Range::new(Position::new(all[0], 0), Position::new(all[1], 1)));
        let properties = CellProperties {
            horizontal_alignment: Mixable::Value(HorizontalAlignment::Right),
            ..CellProperties::default()
        };
        TableEditor::new(&mut session).set_cell_properties(&properties).unwrap();
        assert_eq!(session.document().attribute(all[0], "align"), Some("right"));
        assert_eq!(session.document().attribute(all[1], "align"), None);
    }

    #[test]
    fn test_column_properties() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[1]);
        let mut properties = TableEditor::new(&mut session).column_properties().unwrap();
        assert_eq!(properties.width, Mixable::Value(PixelPercent::UNDEFINED));
        properties.cell_properties.vertical_alignment = Mixable::Value(VerticalAlignment::Bottom);
        TableEditor::new(&mut session).set_column_properties(&properties).unwrap();
        assert_eq!(session.document().attribute(all[1], "valign"), Some("bottom"));
        assert_eq!(session.document().attribute(all[3], "valign"), Some("bottom"));
        assert_eq!(session.document().attribute(all[0], "valign"), None);
    }

    #[test]
    fn test_clear_cells() {
        let mut session = session(GRID);
        let all = cells(&session);
        session.select(Range::new(Position::new(all[1], 0), Position::new(all[2], 1)));
        TableEditor::new(&mut session).clear_cells().unwrap();
        assert_eq!(texts(&session), vec!["a", "", "", "d"]);
        assert_eq!(session.selection(), Range::collapsed(Position::new(all[1], 0)));
    }

    #[test]
    fn test_empty_cell_placeholders() {
        let mut session = session("<table unselectable=\"on\"><tr><td></td><td>x</td></tr></table>");
        let table = first_table(&session);
        TableEditor::for_table(&mut session, table).unwrap().make_empty_cells_nbsp().unwrap();
        assert_eq!(
            session.to_html(),
            "<table unselectable=\"on\"><tr><td>&nbsp;</td><td>x</td></tr></table>"
        );
        TableEditor::for_table(&mut session, table).unwrap().make_empty_cells_null().unwrap();
        assert_eq!(
            session.to_html(),
            "<table unselectable=\"on\"><tr><td></td><td>x</td></tr></table>"
        );
    }

    #[test]
    fn test_select_next_cell_wraps_rows_and_extends_table() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[1]);
        TableEditor::new(&mut session).select_next_cell().unwrap();
        assert_eq!(session.selection(), session.document().inner_range(all[2]).unwrap());

        caret_in(&mut session, all[3]);
        TableEditor::new(&mut session).select_next_cell().unwrap();
        let doc = session.document();
        let rows = doc.table_rows(first_table(&session));
        assert_eq!(rows.len(), 3);
        let new_cell = doc.row_cells(rows[2])[0];
        assert_eq!(session.selection(), Range::collapsed(Position::new(new_cell, 0)));
    }

    #[test]
    fn test_select_previous_cell() {
        let mut session = session(GRID);
        let all = cells(&session);
        caret_in(&mut session, all[2]);
        TableEditor::new(&mut session).select_previous_cell().unwrap();
        assert_eq!(session.selection(), session.document().inner_range(all[1]).unwrap());

        caret_in(&mut session, all[0]);
        TableEditor::new(&mut session).select_previous_cell().unwrap();
        assert_eq!(session.selection(), Range::collapsed(Position::new(all[0], 0)));
    }

    #[test]
    fn test_insert_line_break() {
        let mut session = session(GRID);
        let all = cells(&session);
        let text = session.document().children(all[0])[0];
        session.select(Range::collapsed(Position::new(text, 1)));
        TableEditor::new(&mut session).insert_line_break().unwrap();
        assert_eq!(session.document().inner_html(all[0]), "a<br />");
        assert_eq!(session.selection(), Range::collapsed(Position::new(all[0], 2)));
        assert_eq!(session.history().undo_depth(), 1);
    }

    #[test]
    fn test_insert_table() {
        let mut session = session("<p>x</p>");
        let parameters = TableCreationParameters::new(
            2,
            3,
            TableProperties {
                border_size: "1".into(),
                width: PixelPercent::pixels(300),
                ..TableProperties::default()
            },
        );
        let table = TableEditor::insert_table(&mut session, &parameters).unwrap();
        let doc = session.document();
        assert_eq!(doc.attribute(table, "width"), Some("300"));
        assert_eq!(doc.attribute(table, "border"), Some("1"));
        assert_eq!(doc.attribute(table, "unselectable"), Some("on"));
        let table_cells = doc.table_cells(table);
        assert_eq!(table_cells.len(), 6);
        assert_eq!(doc.attribute(table_cells[0], "width"), Some("100"));
        assert_eq!(doc.attribute(table_cells[0], "valign"), Some("top"));
        assert_eq!(session.selection(), Range::collapsed(Position::new(table_cells[0], 0)));
        assert!(session.undo());
        assert_eq!(session.to_html(), "<p>x</p>");
    }

    #[test]
    fn test_insert_table_percentage_and_validation() {
        let mut session = session("");
        let parameters = TableCreationParameters::new(
            1,
            3,
            TableProperties {
                width: PixelPercent::parse("100%", PixelPercentUnits::Pixels),
                ..TableProperties::default()
            },
        );
        let table = TableEditor::insert_table(&mut session, &parameters).unwrap();
        let first = session.document().table_cells(table)[0];
        assert_eq!(session.document().attribute(first, "width"), Some("33%"));

        let invalid = TableCreationParameters::new(0, 3, TableProperties::default());
        assert!(matches!(
            TableEditor::insert_table(&mut session, &invalid),
            Err(TableEditError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_insert_table_clipped_to_cell() {
        let mut session = session("<table unselectable=\"on\"><tr><td width=\"120\">a</td></tr></table>");
        let outer_cell = cells(&session)[0];
        caret_in(&mut session, outer_cell);
        let parameters = TableCreationParameters::new(1, 2, TableProperties {
            width: PixelPercent::pixels(400),
            ..TableProperties::default()
        });
        let table = TableEditor::insert_table(&mut session, &parameters).unwrap();
        assert_eq!(session.document().attribute(table, "width"), Some("120"));
    }

    #[test]
    fn test_delete_table() {
        let mut session = session(GRID);
        let cell = cells(&session)[0];
        caret_in(&mut session, cell);
        session.take_selection_changed();
        TableEditor::new(&mut session).delete_table().unwrap();
        assert_eq!(session.to_html(), "");
        assert!(session.take_selection_changed());
        assert!(session.undo());
        assert_eq!(session.to_html(), GRID);
    }

    #[test]
    fn test_property_commands_need_a_table() {
        let mut session = session("<p>x</p>");
        assert!(matches!(
            TableEditor::new(&mut session).table_properties(),
            Err(TableEditError::NoTableSelected)
        ));
        assert!(TableEditor::new(&mut session).delete_rows().is_ok());
    }
}
