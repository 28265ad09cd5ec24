//! Stateless helpers over table elements
//!
//! Lookups of the table, row and cell around a node, width synchronization
//! between attributes and rendered geometry, design-time borders, and the
//! editability marker that separates tables this editor may restructure
//! from foreign markup.

use crate::settings::{DesignTimeBorder, TableEditingSettings};
use crate::{Color, PixelPercent, PixelPercentUnits, Result};
use html_dom::{clamp_length_px, saturating_sum, Document, Layout, LayoutOptions, NodeId, Position};

/// Attribute stamped on tables that may be edited structurally
pub const EDITABLE_MARKER_ATTRIBUTE: &str = "unselectable";
pub const EDITABLE_MARKER_VALUE: &str = "on";

const BLOCK_TAGS: &[&str] = &[
    "address", "blockquote", "body", "center", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4",
    "h5", "h6", "li", "ol", "p", "pre", "td", "th", "ul",
];

const BORDER_PROPERTIES: &[&str] = &["border-width", "border-color", "border-style", "border-collapse"];

// =============================================================================
// Containment
// =============================================================================

/// Nearest table at or above `id`
pub fn containing_table(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, |node| node.is_table())
}

/// Nearest row at or above `id`
pub fn containing_row(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, |node| node.is_row())
}

/// Nearest cell at or above `id`
pub fn containing_cell(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, |node| node.is_cell())
}

/// Nearest block-level element or cell around a position
pub fn containing_block(doc: &Document, position: Position) -> Option<NodeId> {
    let element = doc.containing_element(position)?;
    doc.closest(element, |node| {
        node.is_cell() || BLOCK_TAGS.contains(&node.tag())
    })
}

// =============================================================================
// Attribute readers
// =============================================================================

/// Integer value of a length attribute; anything unparseable counts as 0
/// and out-of-range values are clamped
pub fn attribute_as_integer(value: Option<&str>) -> i32 {
    value
        .and_then(|v| v.trim().parse::<i32>().ok())
        .map(clamp_length_px)
        .unwrap_or(0)
}

/// Width of a cell: its integer width attribute, else its rendered width
pub fn cell_width(doc: &Document, layout: &Layout, cell: NodeId) -> i32 {
    doc.attribute(cell, "width")
        .and_then(|width| width.trim().parse::<i32>().ok())
        .map(clamp_length_px)
        .unwrap_or_else(|| rendered_width(layout, cell))
}

/// Rendered width of an element, 0 if it was not laid out
pub fn rendered_width(layout: &Layout, id: NodeId) -> i32 {
    layout.rect(id).map(|rect| rect.width).unwrap_or(0)
}

pub fn table_width(doc: &Document, table: NodeId) -> PixelPercent {
    doc.attribute(table, "width")
        .map(|width| PixelPercent::parse(width, PixelPercentUnits::Pixels))
        .unwrap_or(PixelPercent::UNDEFINED)
}

/// Fixed height of a row, 0 meaning size to content
pub fn row_height(doc: &Document, row: NodeId) -> i32 {
    attribute_as_integer(doc.attribute(row, "height"))
}

/// Background color of a cell; missing or unreadable means none
pub fn color_for_html(value: Option<&str>) -> Option<Color> {
    value.and_then(Color::parse)
}

// =============================================================================
// Width synchronization
// =============================================================================

/// Horizontal space taken by the table border while editing. Tables without
/// a border of their own show the one pixel design-time border.
pub fn table_border_editing_offset(doc: &Document, table: NodeId) -> i32 {
    let border = attribute_as_integer(doc.attribute(table, "border")).saturating_mul(2);
    if border != 0 {
        return border;
    }
    let style_border = doc
        .get(table)
        .and_then(|node| node.style().border_width_px())
        .unwrap_or(0)
        .saturating_mul(2);
    if style_border != 0 {
        return style_border;
    }
    2
}

/// Width of the table as implied by its first row. Percentage and undefined
/// widths are returned unchanged.
pub fn table_logical_editing_width(doc: &Document, layout: &Layout, table: NodeId) -> PixelPercent {
    let width = table_width(doc, table);
    if !width.is_pixels() {
        return width;
    }

    let rows = doc.table_rows(table);
    let Some(first_row) = rows.first() else {
        return PixelPercent::pixels(0);
    };
    let spacing = attribute_as_integer(doc.attribute(table, "cellspacing"));
    let cells = saturating_sum(
        doc.row_cells(*first_row)
            .into_iter()
            .map(|cell| cell_width(doc, layout, cell).saturating_add(spacing)),
    );
    PixelPercent::pixels(
        cells
            .saturating_add(spacing)
            .saturating_add(table_border_editing_offset(doc, table)),
    )
}

/// Pin a cell's width attribute to its rendered width
pub fn synchronize_cell_width_for_editing(doc: &mut Document, layout: &Layout, cell: NodeId) -> Result<()> {
    let rendered = rendered_width(layout, cell);
    if cell_width(doc, layout, cell) != rendered {
        doc.set_attribute(cell, "width", &rendered.to_string())?;
    }
    Ok(())
}

pub fn synchronize_cell_widths_for_editing(doc: &mut Document, options: &LayoutOptions, table: NodeId) -> Result<()> {
    let layout = doc.layout(options);
    for cell in doc.table_cells(table) {
        synchronize_cell_width_for_editing(doc, &layout, cell)?;
    }
    Ok(())
}

/// Set the table width to its logical width, or drop it when there is none
pub fn synchronize_table_width_for_editing(doc: &mut Document, options: &LayoutOptions, table: NodeId) -> Result<()> {
    let layout = doc.layout(options);
    let logical = table_logical_editing_width(doc, &layout, table);
    if logical.is_defined() && logical.value() > 0 {
        doc.set_attribute(table, "width", &logical.to_string())?;
    } else {
        doc.remove_attribute(table, "width")?;
    }
    Ok(())
}

pub fn synchronize_cell_and_table_widths_for_editing(
    doc: &mut Document,
    options: &LayoutOptions,
    table: NodeId,
) -> Result<()> {
    synchronize_cell_widths_for_editing(doc, options, table)?;
    synchronize_table_width_for_editing(doc, options, table)
}

// =============================================================================
// Design-time borders
// =============================================================================

/// Show a light runtime border on a table without a border of its own and on
/// each of its cells; defer to the real border when there is one. Elements
/// with an inline border style are left alone.
pub fn update_design_time_borders(doc: &mut Document, table: NodeId, border: &DesignTimeBorder) -> Result<()> {
    let has_real_border = doc
        .attribute(table, "border")
        .map(str::trim)
        .is_some_and(|value| !value.is_empty() && value != "0");
    let collapse = if doc.attribute(table, "cellspacing").map(str::trim) == Some("0") {
        "collapse"
    } else {
        "separate"
    };

    let mut elements = vec![table];
    elements.extend(doc.table_cells(table));
    for element in elements {
        let node = doc.node_mut(element)?;
        let style = node.style();
        if style.border_style().is_some() {
            continue;
        }
        let runtime = node.runtime_style_mut();
        if has_real_border {
            for property in BORDER_PROPERTIES {
                runtime.set(property, style.get(property).unwrap_or(""));
            }
        } else {
            runtime.set("border-width", &border.width);
            runtime.set("border-color", &border.color);
            runtime.set("border-style", &border.style);
            runtime.set("border-collapse", collapse);
        }
    }
    Ok(())
}

// =============================================================================
// Editability
// =============================================================================

/// Whether the table around `element` carries the editability marker
pub fn table_element_contains_editing_mark(doc: &Document, element: NodeId) -> bool {
    containing_table(doc, element)
        .and_then(|table| doc.attribute(table, EDITABLE_MARKER_ATTRIBUTE))
        .is_some_and(|value| value == EDITABLE_MARKER_VALUE)
}

/// Whether `element` sits inside an opaque smart content region
pub fn is_in_smart_content(doc: &Document, element: NodeId, settings: &TableEditingSettings) -> bool {
    doc.closest(element, |node| {
        node.attribute("class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|class_name| settings.is_smart_content_class(class_name))
        })
    })
    .is_some()
}

/// Tables are editable only when marked and outside smart content
pub fn table_element_is_editable(doc: &Document, element: NodeId, settings: &TableEditingSettings) -> bool {
    table_element_contains_editing_mark(doc, element) && !is_in_smart_content(doc, element, settings)
}

/// Stamp the editability marker on a table whose rows all have the same
/// number of cells. Failures are logged and otherwise ignored.
pub fn make_table_writer_editable_if_rectangular(doc: &mut Document, table: NodeId) {
    if let Err(e) = mark_if_rectangular(doc, table) {
        tracing::error!(%table, error = %e, "unexpected error marking table editable");
    }
}

fn mark_if_rectangular(doc: &mut Document, table: NodeId) -> Result<()> {
    if !doc.node(table)?.is_table() || table_element_contains_editing_mark(doc, table) {
        return Ok(());
    }
    let counts: Vec<usize> = doc
        .table_rows(table)
        .into_iter()
        .map(|row| doc.row_cells(row).len())
        .collect();
    let Some(first) = counts.first() else {
        return Ok(());
    };
    if counts.iter().any(|count| count != first) {
        tracing::debug!(%table, "table is not rectangular, leaving it read-only");
        return Ok(());
    }
    doc.set_attribute(table, EDITABLE_MARKER_ATTRIBUTE, EDITABLE_MARKER_VALUE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (Document, NodeId) {
        let doc = Document::parse_fragment(html).unwrap();
        let table = doc
            .descendants(doc.root())
            .into_iter()
            .find(|id| doc.get(*id).is_some_and(|n| n.is_table()))
            .unwrap();
        (doc, table)
    }

    #[test]
    fn test_containment() {
        let (doc, table) = parse("<table><tr><td><p>x</p></td></tr></table>");
        let cell = doc.table_cells(table)[0];
        let paragraph = doc.children(cell)[0];
        assert_eq!(containing_table(&doc, paragraph), Some(table));
        assert_eq!(containing_cell(&doc, paragraph), Some(cell));
        assert_eq!(containing_row(&doc, cell), doc.parent(cell));
        assert_eq!(containing_table(&doc, doc.root()), None);
        assert_eq!(containing_block(&doc, Position::new(paragraph, 0)), Some(paragraph));
    }

    #[test]
    fn test_rectangular_table_is_marked() {
        let (mut doc, table) = parse("<table><tr><td></td><td></td></tr><tr><td></td><td></td></tr></table>");
        make_table_writer_editable_if_rectangular(&mut doc, table);
        assert_eq!(doc.attribute(table, "unselectable"), Some("on"));
    }

    #[test]
    fn test_ragged_table_is_not_marked() {
        let (mut doc, table) = parse("<table><tr><td></td><td></td></tr><tr><td></td></tr></table>");
        make_table_writer_editable_if_rectangular(&mut doc, table);
        assert_eq!(doc.attribute(table, "unselectable"), None);
    }

    #[test]
    fn test_editability_excludes_smart_content() {
        let settings = TableEditingSettings::default();
        let (doc, table) = parse(
            "<div class=\"wlWriterSmartContent\"><table unselectable=\"on\"><tr><td></td></tr></table></div>",
        );
        let cell = doc.table_cells(table)[0];
        assert!(table_element_contains_editing_mark(&doc, cell));
        assert!(!table_element_is_editable(&doc, cell, &settings));

        let (doc, table) = parse("<table unselectable=\"on\"><tr><td></td></tr></table>");
        assert!(table_element_is_editable(&doc, table, &settings));

        let (doc, table) = parse("<table><tr><td></td></tr></table>");
        assert!(!table_element_is_editable(&doc, table, &settings));
    }

    #[test]
    fn test_border_editing_offset() {
        let (doc, table) = parse("<table border=\"3\"><tr><td></td></tr></table>");
        assert_eq!(table_border_editing_offset(&doc, table), 6);
        let (doc, table) = parse("<table style=\"border-width: 2px\"><tr><td></td></tr></table>");
        assert_eq!(table_border_editing_offset(&doc, table), 4);
        let (doc, table) = parse("<table border=\"0\"><tr><td></td></tr></table>");
        assert_eq!(table_border_editing_offset(&doc, table), 2);
    }

    #[test]
    fn test_logical_width_sums_first_row() {
        let (doc, table) = parse(
            "<table width=\"1\" cellspacing=\"2\" border=\"1\"><tr><td width=\"50\"></td><td width=\"60\"></td></tr></table>",
        );
        let layout = doc.layout(&LayoutOptions::default());
        // 50 + 2 + 60 + 2 + 2 spacing at the end + 2 border
        assert_eq!(table_logical_editing_width(&doc, &layout, table), PixelPercent::pixels(118));
    }

    #[test]
    fn test_logical_width_keeps_percentages() {
        let (doc, table) = parse("<table width=\"50%\"><tr><td></td></tr></table>");
        let layout = doc.layout(&LayoutOptions::default());
        let width = table_logical_editing_width(&doc, &layout, table);
        assert!(width.is_percentage());
        assert_eq!(width.value(), 50);
    }

    #[test]
    fn test_synchronize_widths() {
        let (mut doc, table) = parse(
            "<table width=\"200\"><tr><td width=\"100\"></td><td width=\"100\"></td></tr></table>",
        );
        update_design_time_borders(&mut doc, table, &DesignTimeBorder::default()).unwrap();
        synchronize_cell_and_table_widths_for_editing(&mut doc, &LayoutOptions::default(), table).unwrap();
        let cells = doc.table_cells(table);
        assert_eq!(doc.attribute(cells[0], "width"), Some("99"));
        assert_eq!(doc.attribute(cells[1], "width"), Some("99"));
        assert_eq!(doc.attribute(table, "width"), Some("200"));
    }

    #[test]
    fn test_synchronize_removes_undefined_table_width() {
        let (mut doc, table) = parse("<table width=\"\"><tr><td></td></tr></table>");
        synchronize_table_width_for_editing(&mut doc, &LayoutOptions::default(), table).unwrap();
        assert_eq!(doc.attribute(table, "width"), None);
    }

    #[test]
    fn test_design_time_borders_attach_and_remove() {
        let (mut doc, table) = parse("<table cellspacing=\"0\"><tr><td></td></tr></table>");
        let cell = doc.table_cells(table)[0];
        update_design_time_borders(&mut doc, table, &DesignTimeBorder::default()).unwrap();
        let runtime = doc.node(table).unwrap().runtime_style();
        assert_eq!(runtime.get("border-style"), Some("dotted"));
        assert_eq!(runtime.get("border-collapse"), Some("collapse"));
        assert_eq!(
            doc.node(cell).unwrap().runtime_style().get("border-color"),
            Some("#BCBCBC")
        );

        doc.set_attribute(table, "border", "2").unwrap();
        update_design_time_borders(&mut doc, table, &DesignTimeBorder::default()).unwrap();
        assert!(doc.node(table).unwrap().runtime_style().is_empty());
        assert!(doc.node(cell).unwrap().runtime_style().is_empty());
    }

    #[test]
    fn test_design_time_borders_skip_styled_elements() {
        let (mut doc, table) = parse("<table style=\"border-style: solid\"><tr><td></td></tr></table>");
        let cell = doc.table_cells(table)[0];
        update_design_time_borders(&mut doc, table, &DesignTimeBorder::default()).unwrap();
        assert!(doc.node(table).unwrap().runtime_style().is_empty());
        assert_eq!(doc.node(cell).unwrap().runtime_style().get("border-style"), Some("dotted"));
    }

    #[test]
    fn test_attribute_readers() {
        assert_eq!(attribute_as_integer(Some(" 12 ")), 12);
        assert_eq!(attribute_as_integer(Some("12px")), 0);
        assert_eq!(attribute_as_integer(None), 0);
        assert_eq!(attribute_as_integer(Some("1500000000")), html_dom::MAX_LENGTH_PX);
        assert_eq!(color_for_html(Some("#FF0000")), Some(Color::new(255, 0, 0)));
        assert_eq!(color_for_html(Some("nonsense")), None);
        assert_eq!(color_for_html(None), None);
    }
}
