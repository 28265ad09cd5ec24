//! Block and table geometry
//!
//! A deliberately small layout model that produces the rendered sizes an
//! editing surface needs: offset widths of tables and cells, and boxes for
//! hit testing. Blocks stack vertically; tables resolve column widths from
//! their `width` attributes the way a browser does for fixed widths:
//! - Column width is the widest explicit cell width in that column
//! - Unsized columns share whatever the table width leaves over
//! - A fixed table width scales the columns to fit exactly

use crate::{clamp_length_px, css_length_px, Document, Node, NodeId};
use std::collections::HashMap;

/// A point in client coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle; contains points on its left/top edge but not
/// on its right/bottom edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x.saturating_add(self.width)
            && point.y >= self.y
            && point.y < self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Configuration for document layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Width available to top-level blocks
    pub container_width: i32,
    /// Width given to a column with no explicit width when nothing else decides
    pub default_column_width: i32,
    /// Height of a line of content and the minimum row height
    pub line_height: i32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            container_width: 600,
            default_column_width: 80,
            line_height: 20,
        }
    }
}

/// Boxes for every laid-out node of a document
#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: HashMap<NodeId, Rect>,
    depth: HashMap<NodeId, usize>,
}

impl Layout {
    /// Lay out a whole document
    pub fn compute(doc: &Document, options: &LayoutOptions) -> Self {
        let mut layout = Self::default();
        let mut y: i32 = 0;
        for child in doc.children(doc.root()) {
            y = y.saturating_add(layout.layout_block(doc, options, *child, Point::new(0, y), options.container_width, 0));
        }
        layout
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.boxes.get(&id).copied()
    }

    /// Deepest laid-out element containing `point`
    pub fn element_at(&self, point: Point) -> Option<NodeId> {
        self.boxes
            .iter()
            .filter(|(_, rect)| rect.contains(point))
            .max_by_key(|(id, _)| self.depth.get(id).copied().unwrap_or(0))
            .map(|(id, _)| *id)
    }

    /// Lay out a block and return its height
    fn layout_block(
        &mut self,
        doc: &Document,
        options: &LayoutOptions,
        id: NodeId,
        origin: Point,
        available_width: i32,
        depth: usize,
    ) -> i32 {
        let Some(node) = doc.get(id) else {
            return 0;
        };
        if node.is_table() {
            return self.layout_table(doc, options, id, origin, available_width, depth);
        }
        if node.is_text() {
            return if node.text().trim().is_empty() { 0 } else { options.line_height };
        }

        let mut content_height: i32 = 0;
        for child in node.children() {
            content_height = content_height.saturating_add(self.layout_block(
                doc,
                options,
                *child,
                Point::new(origin.x, origin.y.saturating_add(content_height)),
                available_width,
                depth + 1,
            ));
        }
        let height = content_height.max(options.line_height);
        self.place(id, Rect::new(origin.x, origin.y, available_width, height), depth);
        height
    }

    fn layout_table(
        &mut self,
        doc: &Document,
        options: &LayoutOptions,
        table: NodeId,
        origin: Point,
        available_width: i32,
        depth: usize,
    ) -> i32 {
        let spacing = attribute_px(doc.get(table), "cellspacing").unwrap_or(0).max(0);
        let border = table_border_offset(doc, table);
        let rows = doc.table_rows(table);
        let columns = calculate_column_widths(doc, options, table, available_width);
        let table_width = saturating_sum(columns.iter().copied())
            .saturating_add(spacing.saturating_mul(count_i32(columns.len()).saturating_add(1)))
            .saturating_add(border);

        let mut y = origin.y.saturating_add(border / 2).saturating_add(spacing);
        for row in &rows {
            let row_top = y;
            let mut row_height = attribute_px(doc.get(*row), "height")
                .unwrap_or(0)
                .max(options.line_height);
            let mut x = origin.x.saturating_add(border / 2).saturating_add(spacing);
            let mut cell_boxes = Vec::new();
            for (index, cell) in doc.row_cells(*row).into_iter().enumerate() {
                let width = columns.get(index).copied().unwrap_or(options.default_column_width);
                let mut content_height: i32 = 0;
                for child in doc.children(cell) {
                    content_height = content_height.saturating_add(self.layout_block(
                        doc,
                        options,
                        *child,
                        Point::new(x, row_top.saturating_add(content_height)),
                        width,
                        depth + 3,
                    ));
                }
                let cell_height = attribute_px(doc.get(cell), "height").unwrap_or(0);
                row_height = row_height.max(content_height).max(cell_height);
                cell_boxes.push((cell, x, width));
                x = x.saturating_add(width).saturating_add(spacing);
            }
            for (cell, cell_x, width) in cell_boxes {
                self.place(cell, Rect::new(cell_x, row_top, width, row_height), depth + 2);
            }
            self.place(
                *row,
                Rect::new(origin.x.saturating_add(border / 2), row_top, table_width.saturating_sub(border), row_height),
                depth + 1,
            );
            y = y.saturating_add(row_height).saturating_add(spacing);
        }

        let height = y.saturating_sub(origin.y).saturating_add(border - border / 2);
        self.place(table, Rect::new(origin.x, origin.y, table_width, height), depth);
        height
    }

    fn place(&mut self, id: NodeId, rect: Rect, depth: usize) {
        self.boxes.insert(id, rect);
        self.depth.insert(id, depth);
    }
}

/// Sum that stops at the `i32` bounds instead of overflowing
pub fn saturating_sum(values: impl IntoIterator<Item = i32>) -> i32 {
    values.into_iter().fold(0, i32::saturating_add)
}

fn count_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// `percent` of `basis`, clamped like any other length from markup
fn percent_of(basis: i32, percent: i32) -> i32 {
    let scaled = i64::from(basis) * i64::from(percent) / 100;
    clamp_length_px(i32::try_from(scaled).unwrap_or(if scaled < 0 { i32::MIN } else { i32::MAX }))
}

/// Whole-pixel value of an integer attribute (`"12"`, `"12px"`)
fn attribute_px(node: Option<&Node>, name: &str) -> Option<i32> {
    node?.attribute(name).and_then(css_length_px)
}

/// Horizontal space taken by the table's own borders (both sides)
pub fn table_border_offset(doc: &Document, table: NodeId) -> i32 {
    let Some(node) = doc.get(table) else {
        return 0;
    };
    if let Some(border) = attribute_px(Some(node), "border") {
        return border.max(0).saturating_mul(2);
    }
    if let Some(border) = node.style().border_width_px() {
        return border.max(0).saturating_mul(2);
    }
    node.runtime_style()
        .border_width_px()
        .map(|border| border.max(0).saturating_mul(2))
        .unwrap_or(0)
}

/// Requested width of a table: pixels, or percentage of the available width
fn requested_table_width(node: &Node, available_width: i32) -> Option<i32> {
    let raw = node.attribute("width")?.trim();
    match raw.strip_suffix('%') {
        Some(percent) => percent
            .trim()
            .parse::<i32>()
            .ok()
            .map(|p| percent_of(available_width, p)),
        None => css_length_px(raw),
    }
}

/// Resolve column widths for a table.
fn calculate_column_widths(
    doc: &Document,
    options: &LayoutOptions,
    table: NodeId,
    available_width: i32,
) -> Vec<i32> {
    let rows = doc.table_rows(table);
    let column_count = rows.iter().map(|r| doc.row_cells(*r).len()).max().unwrap_or(0);
    if column_count == 0 {
        return Vec::new();
    }

    let Some(table_node) = doc.get(table) else {
        return Vec::new();
    };
    let spacing = attribute_px(Some(table_node), "cellspacing").unwrap_or(0).max(0);
    let border = table_border_offset(doc, table);
    let chrome = spacing
        .saturating_mul(count_i32(column_count).saturating_add(1))
        .saturating_add(border);
    let requested = requested_table_width(table_node, available_width);
    let percent_basis = requested.unwrap_or(available_width).saturating_sub(chrome).max(0);

    // First pass: explicit cell widths, widest wins
    let mut explicit: Vec<Option<i32>> = vec![None; column_count];
    for row in &rows {
        for (index, cell) in doc.row_cells(*row).into_iter().enumerate() {
            let Some(raw) = doc.attribute(cell, "width") else {
                continue;
            };
            let raw = raw.trim();
            let width = match raw.strip_suffix('%') {
                Some(percent) => percent.trim().parse::<i32>().ok().map(|p| percent_of(percent_basis, p)),
                None => css_length_px(raw),
            };
            if let Some(width) = width.filter(|w| *w > 0) {
                explicit[index] = Some(explicit[index].map_or(width, |w| w.max(width)));
            }
        }
    }

    let mut widths: Vec<i32> = explicit
        .iter()
        .map(|w| w.unwrap_or(options.default_column_width))
        .collect();

    // Second pass: fit to a fixed table width
    if let Some(requested) = requested {
        let content = requested.saturating_sub(chrome).max(0);
        let auto_columns: Vec<usize> = (0..column_count).filter(|i| explicit[*i].is_none()).collect();
        let fixed_sum = saturating_sum(explicit.iter().flatten().copied());
        if !auto_columns.is_empty() && fixed_sum <= content {
            share(&mut widths, &auto_columns, content - fixed_sum, true);
        } else {
            let all: Vec<usize> = (0..column_count).collect();
            let current = saturating_sum(widths.iter().copied());
            share(&mut widths, &all, content.saturating_sub(current), false);
        }
    }
    widths
}

/// Spread `amount` over `columns`, remainder on the last one. With `replace`
/// the columns are set to their share; otherwise the share is added.
fn share(widths: &mut [i32], columns: &[usize], amount: i32, replace: bool) {
    let count = count_i32(columns.len());
    if count == 0 {
        return;
    }
    let each = amount / count;
    let remainder = amount % count;
    for (position, column) in columns.iter().enumerate() {
        let mut delta = each;
        if position as i32 == count - 1 {
            delta += remainder;
        }
        let updated = if replace { delta } else { widths[*column].saturating_add(delta) };
        widths[*column] = updated.max(0);
    }
}

impl Document {
    /// Lay out the document with the given options
    pub fn layout(&self, options: &LayoutOptions) -> Layout {
        Layout::compute(self, options)
    }
}
