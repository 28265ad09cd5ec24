//! Element behaviors for editable tables and their cells
//!
//! A [`TableEditingElementBehavior`] is attached to every table in the
//! document. For editable tables it owns the column size editor and reacts
//! to selection changes and keys. A [`TableCellEditingElementBehavior`] is
//! attached to each cell of an editable table through the
//! [`TableEditingContext`].

use crate::column_sizing::{MouseEvent, SizingPhase, TableColumnSizeEditor};
use crate::context::TableEditingContext;
use crate::host::EditorHost;
use crate::table_editor::TableEditor;
use crate::table_helper::{
    containing_block, make_table_writer_editable_if_rectangular, table_element_is_editable,
    update_design_time_borders,
};
use crate::table_selection::TableSelection;
use crate::Result;
use html_dom::{Layout, NodeId, Point, Rect};
use quick_xml::events::Event;
use quick_xml::Reader;

// =============================================================================
// Keyboard input
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            alt: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }
}

// =============================================================================
// Table behavior
// =============================================================================

#[derive(Debug)]
pub struct TableEditingElementBehavior {
    table: NodeId,
    editable: bool,
    selected: bool,
    current_selection: Option<TableSelection>,
    draw_selection_border: bool,
    size_editor: Option<TableColumnSizeEditor>,
}

impl TableEditingElementBehavior {
    /// Attach to a table. Rectangular tables are stamped editable; editable
    /// tables get a column size editor, cell behaviors and design-time borders.
    pub fn attach(host: &mut dyn EditorHost, context: &mut TableEditingContext, table: NodeId) -> Self {
        make_table_writer_editable_if_rectangular(host.document_mut(), table);
        let editable = table_element_is_editable(host.document(), table, host.settings());

        let mut behavior = Self {
            table,
            editable,
            selected: false,
            current_selection: None,
            draw_selection_border: false,
            size_editor: None,
        };
        if editable {
            let sizing = host.settings().sizing.clone();
            let border = host.settings().design_time_border.clone();
            behavior.size_editor = Some(TableColumnSizeEditor::new(table, sizing));
            context.register_table(host.document(), table);
            if let Err(e) = update_design_time_borders(host.document_mut(), table, &border) {
                tracing::error!(error = %e, %table, "could not apply design-time borders");
            }
        }
        tracing::debug!(%table, editable, "table behavior attached");
        behavior
    }

    /// Release the table's cell behaviors
    pub fn detach(self, context: &mut TableEditingContext) {
        context.unregister_table(self.table);
        tracing::debug!(table = %self.table, "table behavior detached");
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Whether the live selection was inside this table at the last
    /// selection change
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn current_selection(&self) -> Option<&TableSelection> {
        self.current_selection.as_ref()
    }

    /// The whole table is selected and outlined
    pub fn draws_selection_border(&self) -> bool {
        self.draw_selection_border
    }

    pub fn size_editor(&self) -> Option<&TableColumnSizeEditor> {
        self.size_editor.as_ref()
    }

    /// A column boundary is armed or being dragged
    pub fn is_sizing(&self) -> bool {
        self.size_editor
            .as_ref()
            .is_some_and(|editor| !matches!(editor.operation().phase(), SizingPhase::Idle))
    }

    /// Selection of the live range when it resolves to this table
    fn query_selection(&self, host: &dyn EditorHost) -> Option<TableSelection> {
        if !self.editable {
            return None;
        }
        let selection = TableSelection::new(host.document(), host.selected_range());
        (selection.table() == Some(self.table)).then_some(selection)
    }

    /// React to a change of the live selection
    pub fn on_selection_changed(&mut self, host: &mut dyn EditorHost, context: &mut TableEditingContext) -> Result<()> {
        if !self.editable || !host.document().contains(self.table) {
            return Ok(());
        }

        let was_selected = self.selected;
        self.current_selection = self.query_selection(host);
        self.selected = self.current_selection.is_some();
        if self.selected && !was_selected {
            // Placeholder-only cells become empty while the table is being edited
            TableEditor::for_table(host, self.table)?.make_empty_cells_null()?;
            self.current_selection = self.query_selection(host);
        }

        match &self.current_selection {
            Some(selection) => {
                if !selection.entire_table_selected()
                    && selection.selected_cells().len() > 1
                    && selection.selection_spans_all_cells(host.document())
                {
                    // Deferred so this handler is not re-entered
                    let table = self.table;
                    host.post(Box::new(move |host: &mut dyn EditorHost| select_entire_table(host, table)));
                }
                self.draw_selection_border = selection.entire_table_selected();
            }
            None => {
                if host.document().parent(self.table).is_some() {
                    self.draw_selection_border = false;
                }
            }
        }
        context.track_cell_selection(self.table, self.current_selection.as_ref());
        Ok(())
    }

    /// Enter inserts a line break when the caret sits directly in a cell;
    /// Tab and Shift+Tab move between cells outside of lists. True when the
    /// key was consumed.
    pub fn handle_key_down(&mut self, host: &mut dyn EditorHost, event: KeyEvent) -> Result<bool> {
        if self.query_selection(host).is_none() {
            return Ok(false);
        }
        let start = host.selected_range().start;
        let doc = host.document();

        match event.key {
            Key::Enter if !event.shift && !event.ctrl && !event.alt => {
                let in_cell = containing_block(doc, start)
                    .and_then(|block| doc.get(block))
                    .is_some_and(|block| block.is_cell());
                if in_cell {
                    TableEditor::new(host).insert_line_break()?;
                }
                Ok(in_cell)
            }
            Key::Tab if !event.ctrl && !event.alt => {
                let in_list = doc
                    .containing_element(start)
                    .and_then(|element| doc.closest(element, |node| node.tag() == "li"))
                    .is_some();
                if in_list {
                    return Ok(false);
                }
                if event.shift {
                    TableEditor::new(host).select_previous_cell()?;
                } else {
                    TableEditor::new(host).select_next_cell()?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Delete over several (not all) cells empties them instead
    pub fn handle_clear(&mut self, host: &mut dyn EditorHost) -> Result<bool> {
        if !self.clears_cells(host) {
            return Ok(false);
        }
        TableEditor::new(host).clear_cells()?;
        Ok(true)
    }

    /// Cut over several (not all) cells copies, then empties them
    pub fn handle_cut(&mut self, host: &mut dyn EditorHost) -> Result<bool> {
        if !self.clears_cells(host) {
            return Ok(false);
        }
        host.copy_selection();
        TableEditor::new(host).clear_cells()?;
        Ok(true)
    }

    fn clears_cells(&self, host: &dyn EditorHost) -> bool {
        self.query_selection(host)
            .is_some_and(|selection| selection.has_contiguous_selection() && !selection.entire_table_selected())
    }

    /// A double-click inside the selected table brings up its commands
    pub fn handle_double_click(&self) -> bool {
        self.selected
    }

    pub fn handle_mouse_event(
        &mut self,
        host: &mut dyn EditorHost,
        context: &TableEditingContext,
        event: MouseEvent,
    ) -> bool {
        match self.size_editor.as_mut() {
            Some(editor) => editor.handle_mouse_event(host, context, event),
            None => false,
        }
    }
}

/// Replace the live selection with the whole table
pub fn select_entire_table(host: &mut dyn EditorHost, table: NodeId) {
    match host.document().outer_range(table) {
        Ok(range) => host.select(range),
        Err(e) => tracing::error!(error = %e, %table, "could not select the entire table"),
    }
}

// =============================================================================
// Cell behavior
// =============================================================================

/// Per-cell behavior: coordinate mapping and the multi-cell highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCellEditingElementBehavior {
    cell: NodeId,
    table: NodeId,
    highlighted: bool,
}

impl TableCellEditingElementBehavior {
    pub fn new(cell: NodeId, table: NodeId) -> Self {
        Self {
            cell,
            table,
            highlighted: false,
        }
    }

    pub fn cell(&self) -> NodeId {
        self.cell
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Map a client point into the cell's own coordinates
    pub fn transform_global_to_local(&self, layout: &Layout, client: Point) -> Option<Point> {
        let rect = layout.rect(self.cell)?;
        Some(Point::new(client.x.saturating_sub(rect.x), client.y.saturating_sub(rect.y)))
    }

    /// Area to paint with the selection highlight, if highlighted
    pub fn highlight_rect(&self, layout: &Layout) -> Option<Rect> {
        if self.highlighted {
            layout.rect(self.cell)
        } else {
            None
        }
    }
}

// =============================================================================
// Publishing
// =============================================================================

/// Put `&nbsp;` into every `<td></td>` so empty cells keep their shape once
/// published. Markup that cannot be scanned is returned unchanged.
pub fn fixup_empty_cells_for_publishing(html: &str) -> String {
    if !html.contains("table") {
        return html.to_string();
    }

    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;

    let is_cell = |name: &[u8]| name.eq_ignore_ascii_case(b"td");
    let mut output = String::with_capacity(html.len() + 16);
    let mut copied = 0;
    let mut after_cell_start = false;
    loop {
        let event = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "could not scan markup for empty cells");
                return html.to_string();
            }
        };
        let position = usize::try_from(reader.buffer_position()).unwrap_or(html.len()).min(html.len());

        if after_cell_start && matches!(&event, Event::End(end) if is_cell(end.name().as_ref())) {
            output.push_str("&nbsp;");
        }
        after_cell_start = matches!(&event, Event::Start(start) if is_cell(start.name().as_ref()));
        output.push_str(&html[copied..position]);
        copied = position;
    }
    output.push_str(&html[copied..]);
    output
}
