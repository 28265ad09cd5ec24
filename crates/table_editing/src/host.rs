//! The editing surface the table core runs against
//!
//! [`EditorHost`] is everything table editing needs from the surrounding
//! editor: the document, the live selection, undo units, the cursor, and a
//! single-threaded queue of deferred continuations. [`EditorSession`] is a
//! complete in-process implementation backed by [`UndoHistory`].

use crate::settings::TableEditingSettings;
use html_dom::{Document, Layout, LayoutOptions, Point, Position, Range, Rect, UndoHistory, UndoKind, UndoUnit};
use std::collections::VecDeque;

/// Mouse cursor shapes the table core asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    IBeam,
    /// Column boundary resize cursor
    VSplit,
}

/// Work deferred until the current event handler has returned
pub type Continuation = Box<dyn FnOnce(&mut dyn EditorHost)>;

/// Services provided by the editor hosting the table core
pub trait EditorHost {
    /// The document being edited
    fn document(&self) -> &Document;

    /// Mutable access to the document being edited
    fn document_mut(&mut self) -> &mut Document;

    /// Geometry configuration for rendered widths and hit testing
    fn layout_options(&self) -> &LayoutOptions;

    /// Lay out the current document
    fn layout(&self) -> Layout {
        self.document().layout(self.layout_options())
    }

    /// Table editing configuration
    fn settings(&self) -> &TableEditingSettings;

    /// The live selection, start first
    fn selected_range(&self) -> Range;

    /// Make `range` the live selection
    fn select(&mut self, range: Range);

    /// Open an undo unit that becomes its own undo step
    fn create_undo_unit(&mut self, label: &str) -> UndoUnit;

    /// Open an undo unit that merges into the previous undo step
    fn create_invisible_undo_unit(&mut self, label: &str) -> UndoUnit;

    /// Record a finished undo unit
    fn commit_undo_unit(&mut self, unit: UndoUnit);

    /// Override the mouse cursor, or restore the default with `None`
    fn set_override_cursor(&mut self, cursor: Option<Cursor>);

    /// Mark the document as modified
    fn force_dirty(&mut self);

    /// Announce that the selection changed without a call to `select`
    fn fire_selection_changed(&mut self);

    /// Consume the pending selection-changed notification
    fn take_selection_changed(&mut self) -> bool;

    /// Queue a continuation to run after the current handler returns
    fn post(&mut self, continuation: Continuation);

    /// Take every queued continuation, oldest first
    fn take_posted(&mut self) -> Vec<Continuation>;

    /// Copy the live selection to the clipboard
    fn copy_selection(&mut self);

    /// Whether the editor accepts edits
    fn edit_mode(&self) -> bool;

    /// Whether the post template lays text out right to left
    fn is_rtl_template(&self) -> bool;

    /// Whether a client point lies over the editable document area
    fn point_is_over_document_area(&self, point: Point) -> bool;
}

/// Single-threaded in-process editor
pub struct EditorSession {
    document: Document,
    selection: Range,
    history: UndoHistory,
    settings: TableEditingSettings,
    layout_options: LayoutOptions,
    cursor: Option<Cursor>,
    dirty: bool,
    edit_mode: bool,
    rtl_template: bool,
    selection_changed: bool,
    posted: VecDeque<Continuation>,
    clipboard: Option<String>,
    document_area: Option<Rect>,
}

impl EditorSession {
    /// Start a session on `document` with the caret at the end of the document
    pub fn new(document: Document) -> Self {
        let selection = end_of_document(&document);
        Self {
            document,
            selection,
            history: UndoHistory::new(),
            settings: TableEditingSettings::default(),
            layout_options: LayoutOptions::default(),
            cursor: None,
            dirty: false,
            edit_mode: true,
            rtl_template: false,
            selection_changed: false,
            posted: VecDeque::new(),
            clipboard: None,
            document_area: None,
        }
    }

    /// Parse `html` into a design-mode document and start a session on it
    pub fn from_html(html: &str) -> crate::Result<Self> {
        let mut document = Document::parse_fragment(html)?;
        document.set_design_mode(true);
        Ok(Self::new(document))
    }

    pub fn with_settings(mut self, settings: TableEditingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_layout_options(mut self, options: LayoutOptions) -> Self {
        self.layout_options = options;
        self
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    pub fn set_rtl_template(&mut self, rtl: bool) {
        self.rtl_template = rtl;
    }

    /// Restrict the editable document area; `None` means everywhere
    pub fn set_document_area(&mut self, area: Option<Rect>) {
        self.document_area = area;
    }

    pub fn selection(&self) -> Range {
        self.selected_range()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn to_html(&self) -> String {
        self.document.to_html()
    }

    /// Run queued continuations, including any they queue in turn.
    /// Returns how many ran.
    pub fn run_posted(&mut self) -> usize {
        let mut count = 0;
        while let Some(continuation) = self.posted.pop_front() {
            continuation(self);
            count += 1;
        }
        count
    }

    /// Revert the last undo step. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let Some(restored) = self.history.undo(self.document.clone()) else {
            return false;
        };
        self.restore(restored);
        true
    }

    /// Reapply the last undone step
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let Some(restored) = self.history.redo(self.document.clone()) else {
            return false;
        };
        self.restore(restored);
        true
    }

    fn restore(&mut self, document: Document) {
        self.document = document;
        self.dirty = true;
        self.selection_changed = true;
        if !self.is_selection_valid() {
            self.selection = end_of_document(&self.document);
        }
    }

    fn is_selection_valid(&self) -> bool {
        self.document.is_valid_position(self.selection.start)
            && self.document.is_valid_position(self.selection.end)
    }
}

fn end_of_document(document: &Document) -> Range {
    let root = document.root();
    Range::collapsed(Position::new(root, document.children(root).len()))
}

impl EditorHost for EditorSession {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn layout_options(&self) -> &LayoutOptions {
        &self.layout_options
    }

    fn settings(&self) -> &TableEditingSettings {
        &self.settings
    }

    fn selected_range(&self) -> Range {
        if !self.is_selection_valid() {
            return end_of_document(&self.document);
        }
        self.document
            .normalize_range(self.selection)
            .unwrap_or(self.selection)
    }

    fn select(&mut self, range: Range) {
        self.selection = range;
        self.selection_changed = true;
    }

    fn create_undo_unit(&mut self, label: &str) -> UndoUnit {
        UndoUnit::new(UndoKind::Visible, label, self.document.clone())
    }

    fn create_invisible_undo_unit(&mut self, label: &str) -> UndoUnit {
        UndoUnit::new(UndoKind::Invisible, label, self.document.clone())
    }

    fn commit_undo_unit(&mut self, unit: UndoUnit) {
        tracing::trace!(label = unit.label(), kind = ?unit.kind(), "committing undo unit");
        self.history.commit(unit);
        self.dirty = true;
    }

    fn set_override_cursor(&mut self, cursor: Option<Cursor>) {
        self.cursor = cursor;
    }

    fn force_dirty(&mut self) {
        self.dirty = true;
    }

    fn fire_selection_changed(&mut self) {
        self.selection_changed = true;
    }

    fn take_selection_changed(&mut self) -> bool {
        std::mem::take(&mut self.selection_changed)
    }

    fn post(&mut self, continuation: Continuation) {
        self.posted.push_back(continuation);
    }

    fn take_posted(&mut self) -> Vec<Continuation> {
        self.posted.drain(..).collect()
    }

    fn copy_selection(&mut self) {
        let range = self.selected_range();
        let cells = self
            .document
            .elements_in_range(range, |node| node.is_cell())
            .unwrap_or_default();
        let copied = if cells.is_empty() {
            self.document
                .containing_element(range.start)
                .map(|element| self.document.text_content(element))
                .unwrap_or_default()
        } else {
            cells
                .iter()
                .map(|cell| self.document.outer_html(*cell))
                .collect::<Vec<_>>()
                .join("")
        };
        tracing::debug!(bytes = copied.len(), "copied selection");
        self.clipboard = Some(copied);
    }

    fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    fn is_rtl_template(&self) -> bool {
        self.rtl_template
    }

    fn point_is_over_document_area(&self, point: Point) -> bool {
        self.document_area.map_or(true, |area| area.contains(point))
    }
}
