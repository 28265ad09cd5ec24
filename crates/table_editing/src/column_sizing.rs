//! Mouse driven column resizing
//!
//! [`TableColumnSizeEditor`] watches mouse events over one table. Hovering
//! near a column boundary arms a [`SizingOperation`] (Pending); pressing the
//! button starts the drag (InProgress, one undo unit open); releasing the
//! button or leaving the table ends it.

use crate::context::TableEditingContext;
use crate::host::{Cursor, EditorHost};
use crate::settings::SizingSettings;
use crate::table_column::TableColumn;
use crate::table_helper::{
    attribute_as_integer, containing_cell, containing_row, containing_table, rendered_width,
    synchronize_cell_widths_for_editing, synchronize_table_width_for_editing,
};
use crate::Result;
use html_dom::{Layout, NodeId, Point, Rect, UndoUnit};

// =============================================================================
// Mouse events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Move,
    Down,
    Up,
}

/// A mouse event in client (document) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub client: Point,
}

impl MouseEvent {
    pub fn moved(x: i32, y: i32) -> Self {
        Self {
            kind: MouseEventKind::Move,
            client: Point::new(x, y),
        }
    }

    pub fn pressed(x: i32, y: i32) -> Self {
        Self {
            kind: MouseEventKind::Down,
            client: Point::new(x, y),
        }
    }

    pub fn released(x: i32, y: i32) -> Self {
        Self {
            kind: MouseEventKind::Up,
            client: Point::new(x, y),
        }
    }
}

// =============================================================================
// Sizing operation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingPhase {
    Idle,
    Pending,
    InProgress,
}

/// The two columns on either side of a boundary. `right` is `None` at the
/// trailing edge of the table, where dragging resizes the table itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBoundary {
    pub left: usize,
    pub right: Option<usize>,
}

#[derive(Debug)]
struct ActiveResize {
    undo_unit: UndoUnit,
    left: TableColumn,
    right: Option<TableColumn>,
    widths_fixed: bool,
}

#[derive(Debug)]
enum SizingState {
    Idle,
    Pending(ColumnBoundary),
    InProgress(ActiveResize),
}

/// State of one resize gesture on a table
#[derive(Debug)]
pub struct SizingOperation {
    table: NodeId,
    settings: SizingSettings,
    state: SizingState,
    last_client_x: i32,
}

impl SizingOperation {
    pub fn new(table: NodeId, settings: SizingSettings) -> Self {
        Self {
            table,
            settings,
            state: SizingState::Idle,
            last_client_x: 0,
        }
    }

    pub fn phase(&self) -> SizingPhase {
        match self.state {
            SizingState::Idle => SizingPhase::Idle,
            SizingState::Pending(_) => SizingPhase::Pending,
            SizingState::InProgress(_) => SizingPhase::InProgress,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SizingState::Pending(_))
    }

    pub fn in_progress(&self) -> bool {
        matches!(self.state, SizingState::InProgress(_))
    }

    /// Boundary armed by the last hover, if any
    pub fn pending_boundary(&self) -> Option<ColumnBoundary> {
        match self.state {
            SizingState::Pending(boundary) => Some(boundary),
            _ => None,
        }
    }

    /// Arm a resize of `boundary` and show the resize cursor
    pub fn track_pending(&mut self, host: &mut dyn EditorHost, client_x: i32, boundary: ColumnBoundary) {
        if self.in_progress() {
            tracing::debug!("ignoring hover while a resize is in progress");
            return;
        }
        tracing::trace!(client_x, left = boundary.left, right = ?boundary.right, "column boundary armed");
        self.state = SizingState::Pending(boundary);
        self.last_client_x = client_x;
        host.set_override_cursor(Some(Cursor::VSplit));
    }

    pub fn clear_pending(&mut self, host: &mut dyn EditorHost) {
        if self.is_pending() {
            host.set_override_cursor(None);
            self.state = SizingState::Idle;
        }
    }

    /// Start dragging the armed boundary. The target cell supplies the row
    /// the boundary's columns are taken from.
    pub fn begin_sizing(&mut self, host: &mut dyn EditorHost, target_cell: Option<NodeId>) {
        let boundary = match std::mem::replace(&mut self.state, SizingState::Idle) {
            SizingState::Pending(boundary) => boundary,
            other => {
                self.state = other;
                return;
            }
        };

        let doc = host.document();
        let Some(row) = target_cell.and_then(|cell| containing_row(doc, cell)) else {
            tracing::debug!("resize started away from any cell");
            host.set_override_cursor(None);
            return;
        };
        let cells = doc.row_cells(row);
        let column_at = |index: usize| cells.get(index).map(|cell| TableColumn::new(self.table, *cell));
        let Some(left) = column_at(boundary.left) else {
            tracing::debug!(index = boundary.left, "resize boundary outside the row");
            host.set_override_cursor(None);
            return;
        };
        let right = boundary.right.and_then(column_at);

        // Cell widths are pinned on the first drag delta, not here, so the
        // borders do not move on mouse down
        self.state = SizingState::InProgress(ActiveResize {
            undo_unit: host.create_undo_unit("Resize Column"),
            left,
            right,
            widths_fixed: false,
        });
        host.set_override_cursor(Some(Cursor::VSplit));
    }

    /// Apply the horizontal movement since the last event
    pub fn continue_sizing(&mut self, host: &mut dyn EditorHost, client_x: i32) -> Result<()> {
        let offset = client_x.saturating_sub(self.last_client_x);
        if offset == 0 {
            return Ok(());
        }
        let (left, right, needs_fixup) = match &mut self.state {
            SizingState::InProgress(active) => {
                let needs_fixup = !active.widths_fixed;
                active.widths_fixed = true;
                (active.left, active.right, needs_fixup)
            }
            _ => return Ok(()),
        };

        let options = host.layout_options().clone();
        if needs_fixup {
            synchronize_cell_widths_for_editing(host.document_mut(), &options, self.table)?;
        }

        let minimum = self.settings.minimum_column_width;
        let layout = host.layout();
        let doc = host.document();
        let left_width = left.pixel_width(doc, &layout);
        let right_width = right.map(|column| column.pixel_width(doc, &layout));
        let resized_left = left_width.saturating_add(offset);
        let resized_right = right_width.map(|width| width.saturating_sub(offset));
        if resized_left < minimum || resized_right.is_some_and(|width| width < minimum) {
            tracing::debug!(left_width, ?right_width, offset, "resize would shrink a column below the minimum");
            self.end_sizing(host);
            return Ok(());
        }

        let doc = host.document_mut();
        left.set_pixel_width(doc, resized_left.max(minimum))?;
        match (right, resized_right) {
            (Some(right), Some(resized_right)) => {
                right.set_pixel_width(doc, resized_right.max(minimum))?;
            }
            _ => synchronize_table_width_for_editing(doc, &options, self.table)?,
        }
        tracing::trace!(offset, left_width, ?right_width, "columns resized");

        self.last_client_x = client_x;
        host.set_override_cursor(Some(Cursor::VSplit));
        Ok(())
    }

    /// Finish any resize: commit its undo unit, restore the cursor and mark
    /// the document dirty. Always leaves the operation idle.
    pub fn end_sizing(&mut self, host: &mut dyn EditorHost) {
        match std::mem::replace(&mut self.state, SizingState::Idle) {
            SizingState::InProgress(active) => {
                host.commit_undo_unit(active.undo_unit);
                host.set_override_cursor(None);
                host.force_dirty();
                tracing::debug!(table = %self.table, "column resize finished");
            }
            SizingState::Pending(_) => host.set_override_cursor(None),
            SizingState::Idle => {}
        }
    }
}

// =============================================================================
// Column size editor
// =============================================================================

/// Routes mouse events over a table to its [`SizingOperation`]
#[derive(Debug)]
pub struct TableColumnSizeEditor {
    table: NodeId,
    operation: SizingOperation,
}

impl TableColumnSizeEditor {
    pub fn new(table: NodeId, settings: SizingSettings) -> Self {
        Self {
            table,
            operation: SizingOperation::new(table, settings),
        }
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    pub fn operation(&self) -> &SizingOperation {
        &self.operation
    }

    /// Handle a mouse event; true when the event was consumed and should
    /// be hidden from the editor. Errors end the resize and are logged.
    pub fn handle_mouse_event(
        &mut self,
        host: &mut dyn EditorHost,
        context: &TableEditingContext,
        event: MouseEvent,
    ) -> bool {
        match self.dispatch(host, context, event) {
            Ok(handled) => handled,
            Err(e) => {
                tracing::error!(error = %e, table = %self.table, "unexpected error during column sizing");
                self.operation.end_sizing(host);
                false
            }
        }
    }

    fn dispatch(&mut self, host: &mut dyn EditorHost, context: &TableEditingContext, event: MouseEvent) -> Result<bool> {
        let layout = host.layout();
        let Some(bounds) = layout.rect(self.table).filter(|rect| rect.width > 0 && rect.height > 0) else {
            return Ok(false);
        };

        let local = Point::new(event.client.x.saturating_sub(bounds.x), event.client.y.saturating_sub(bounds.y));
        let slop = self.operation.settings.right_edge_slop;
        let hit_area = Rect::new(-1, -1, bounds.width.saturating_add(slop), bounds.height.saturating_add(1));
        if !hit_area.contains(local) && !self.operation.in_progress() {
            self.operation.end_sizing(host);
            return Ok(false);
        }

        match event.kind {
            MouseEventKind::Move if self.operation.in_progress() => {
                self.operation.continue_sizing(host, event.client.x)?;
                Ok(true)
            }
            MouseEventKind::Move => Ok(self.track_hover(host, context, &layout, event.client)),
            MouseEventKind::Down if self.operation.is_pending() => {
                let target = self.target_cell(host, &layout, event.client);
                self.operation.begin_sizing(host, target);
                Ok(true)
            }
            MouseEventKind::Up if self.operation.in_progress() => {
                self.operation.end_sizing(host);
                Ok(true)
            }
            MouseEventKind::Down | MouseEventKind::Up => Ok(false),
        }
    }

    /// Cell of this table under the point. Scans left up to the cell spacing
    /// so the trailing edge of the table still finds its last cell.
    fn target_cell(&self, host: &dyn EditorHost, layout: &Layout, client: Point) -> Option<NodeId> {
        let doc = host.document();
        let scan = attribute_as_integer(doc.attribute(self.table, "cellspacing")).max(2);
        let cell = (client.x.saturating_sub(scan)..=client.x).rev().find_map(|x| {
            layout
                .element_at(Point::new(x, client.y))
                .and_then(|element| containing_cell(doc, element))
                .filter(|cell| containing_table(doc, *cell) == Some(self.table))
        })?;
        host.point_is_over_document_area(client).then_some(cell)
    }

    /// Arm or disarm a boundary for a hover; true when a boundary is armed
    fn track_hover(
        &mut self,
        host: &mut dyn EditorHost,
        context: &TableEditingContext,
        layout: &Layout,
        client: Point,
    ) -> bool {
        let Some(cell) = self.target_cell(host, layout, client) else {
            self.operation.end_sizing(host);
            return false;
        };

        let doc = host.document();
        let local = context
            .cell_behavior(cell)
            .and_then(|behavior| behavior.transform_global_to_local(layout, client));
        let (Some(local), Some(row), Some(index)) = (local, containing_row(doc, cell), doc.cell_index(cell)) else {
            self.operation.clear_pending(host);
            return false;
        };
        let row_length = doc.row_cells(row).len();

        let spacing = attribute_as_integer(doc.attribute(self.table, "cellspacing"));
        let start_x = -(spacing / 2);
        let end_x = rendered_width(layout, cell) + spacing / 2;
        let hot_region = (spacing / 2).max(self.operation.settings.minimum_hot_region);
        let near = |edge: i32| (local.x - edge).abs() <= hot_region;

        if near(start_x) {
            // The leading edge of the first column does not resize
            if index == 0 {
                self.operation.clear_pending(host);
                return false;
            }
            let boundary = ColumnBoundary {
                left: index - 1,
                right: Some(index),
            };
            self.operation.track_pending(host, client.x, boundary);
            true
        } else if near(end_x) {
            let boundary = ColumnBoundary {
                left: index,
                right: (index + 1 < row_length).then_some(index + 1),
            };
            self.operation.track_pending(host, client.x, boundary);
            true
        } else {
            self.operation.clear_pending(host);
            false
        }
    }
}
