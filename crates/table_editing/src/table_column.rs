//! Column view over a table
//!
//! A column is not an element of its own: column `i` is the cell at index
//! `i` of every row long enough to have one. [`TableColumn`] reads a
//! property across those cells, reporting `Mixed` when they disagree, and
//! writes a property to all of them. Writing `Mixed` leaves every cell
//! alone; writing a property's default removes the attribute.

use crate::table_helper::{cell_width, color_for_html};
use crate::{CellColor, CellProperties, Color, HorizontalAlignment, Mixable, PixelPercent, PixelPercentUnits, Result, VerticalAlignment};
use html_dom::{Document, Layout, NodeId};

/// The cells sharing a column index with a base cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColumn {
    table: NodeId,
    base_cell: NodeId,
}

impl TableColumn {
    pub fn new(table: NodeId, base_cell: NodeId) -> Self {
        Self { table, base_cell }
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    pub fn base_cell(&self) -> NodeId {
        self.base_cell
    }

    /// Current index of the column, following the base cell as it moves
    pub fn index(&self, doc: &Document) -> Option<usize> {
        doc.cell_index(self.base_cell)
    }

    /// The column's cell in each row that has one, top to bottom
    pub fn cells(&self, doc: &Document) -> Vec<NodeId> {
        let Some(index) = self.index(doc) else {
            return Vec::new();
        };
        doc.table_rows(self.table)
            .into_iter()
            .filter_map(|row| doc.row_cells(row).get(index).copied())
            .collect()
    }

    // =========================================================================
    // Width
    // =========================================================================

    pub fn width(&self, doc: &Document) -> Mixable<PixelPercent> {
        Mixable::reduce(
            self.cells(doc).into_iter().map(|cell| read_cell_width(doc, cell)),
            PixelPercent::UNDEFINED,
        )
    }

    pub fn set_width(&self, doc: &mut Document, width: Mixable<PixelPercent>) -> Result<()> {
        let Mixable::Value(width) = width else {
            return Ok(());
        };
        for cell in self.cells(doc) {
            write_cell_width(doc, cell, width)?;
        }
        Ok(())
    }

    /// Width in pixels used while dragging a column border: the shared
    /// pixel width of the column, else the base cell's width
    pub fn pixel_width(&self, doc: &Document, layout: &Layout) -> i32 {
        match self.width(doc) {
            Mixable::Value(width) if width.is_pixels() => width.value(),
            _ => cell_width(doc, layout, self.base_cell),
        }
    }

    pub fn set_pixel_width(&self, doc: &mut Document, width: i32) -> Result<()> {
        self.set_width(doc, Mixable::Value(PixelPercent::pixels(width)))
    }

    // =========================================================================
    // Cell appearance
    // =========================================================================

    pub fn background_color(&self, doc: &Document) -> CellColor {
        Mixable::reduce(
            self.cells(doc).into_iter().map(|cell| read_background_color(doc, cell)),
            None,
        )
    }

    pub fn set_background_color(&self, doc: &mut Document, color: CellColor) -> Result<()> {
        let Mixable::Value(color) = color else {
            return Ok(());
        };
        for cell in self.cells(doc) {
            write_background_color(doc, cell, color)?;
        }
        Ok(())
    }

    pub fn horizontal_alignment(&self, doc: &Document) -> Mixable<HorizontalAlignment> {
        Mixable::reduce(
            self.cells(doc).into_iter().map(|cell| read_horizontal_alignment(doc, cell)),
            HorizontalAlignment::default(),
        )
    }

    pub fn set_horizontal_alignment(&self, doc: &mut Document, alignment: Mixable<HorizontalAlignment>) -> Result<()> {
        let Mixable::Value(alignment) = alignment else {
            return Ok(());
        };
        for cell in self.cells(doc) {
            write_horizontal_alignment(doc, cell, alignment)?;
        }
        Ok(())
    }

    pub fn vertical_alignment(&self, doc: &Document) -> Mixable<VerticalAlignment> {
        Mixable::reduce(
            self.cells(doc).into_iter().map(|cell| read_vertical_alignment(doc, cell)),
            VerticalAlignment::default(),
        )
    }

    pub fn set_vertical_alignment(&self, doc: &mut Document, alignment: Mixable<VerticalAlignment>) -> Result<()> {
        let Mixable::Value(alignment) = alignment else {
            return Ok(());
        };
        for cell in self.cells(doc) {
            write_vertical_alignment(doc, cell, alignment)?;
        }
        Ok(())
    }

    /// Appearance shared by the column's cells
    pub fn cell_properties(&self, doc: &Document) -> CellProperties {
        CellProperties {
            background_color: self.background_color(doc),
            horizontal_alignment: self.horizontal_alignment(doc),
            vertical_alignment: self.vertical_alignment(doc),
        }
    }

    pub fn set_cell_properties(&self, doc: &mut Document, properties: &CellProperties) -> Result<()> {
        self.set_background_color(doc, properties.background_color)?;
        self.set_horizontal_alignment(doc, properties.horizontal_alignment)?;
        self.set_vertical_alignment(doc, properties.vertical_alignment)
    }
}

// =============================================================================
// Single-cell attribute access
// =============================================================================

pub fn read_cell_width(doc: &Document, cell: NodeId) -> PixelPercent {
    doc.attribute(cell, "width")
        .map(|width| PixelPercent::parse(width, PixelPercentUnits::Pixels))
        .unwrap_or(PixelPercent::UNDEFINED)
}

/// Write a width; undefined or non-positive widths remove the attribute
pub fn write_cell_width(doc: &mut Document, cell: NodeId, width: PixelPercent) -> Result<()> {
    if doc.attribute(cell, "width").is_some() && read_cell_width(doc, cell) == width {
        return Ok(());
    }
    if !width.is_defined() || width.value() <= 0 {
        doc.remove_attribute(cell, "width")?;
    } else {
        doc.set_attribute(cell, "width", &width.to_string())?;
    }
    Ok(())
}

pub fn read_background_color(doc: &Document, cell: NodeId) -> Option<Color> {
    color_for_html(doc.attribute(cell, "bgcolor"))
}

pub fn write_background_color(doc: &mut Document, cell: NodeId, color: Option<Color>) -> Result<()> {
    if read_background_color(doc, cell) == color {
        return Ok(());
    }
    match color {
        Some(color) => doc.set_attribute(cell, "bgcolor", &color.to_html())?,
        None => {
            doc.remove_attribute(cell, "bgcolor")?;
        }
    }
    Ok(())
}

pub fn read_horizontal_alignment(doc: &Document, cell: NodeId) -> HorizontalAlignment {
    HorizontalAlignment::from_html(doc.attribute(cell, "align"))
}

pub fn write_horizontal_alignment(doc: &mut Document, cell: NodeId, alignment: HorizontalAlignment) -> Result<()> {
    if read_horizontal_alignment(doc, cell) == alignment {
        return Ok(());
    }
    if alignment == HorizontalAlignment::default() {
        doc.remove_attribute(cell, "align")?;
    } else {
        doc.set_attribute(cell, "align", alignment.as_html())?;
    }
    Ok(())
}

pub fn read_vertical_alignment(doc: &Document, cell: NodeId) -> VerticalAlignment {
    VerticalAlignment::from_html(doc.attribute(cell, "valign"))
}

pub fn write_vertical_alignment(doc: &mut Document, cell: NodeId, alignment: VerticalAlignment) -> Result<()> {
    if read_vertical_alignment(doc, cell) == alignment {
        return Ok(());
    }
    if alignment == VerticalAlignment::default() {
        doc.remove_attribute(cell, "valign")?;
    } else {
        doc.set_attribute(cell, "valign", alignment.as_html())?;
    }
    Ok(())
}

/// Appearance of a single cell
pub fn read_cell_properties(doc: &Document, cell: NodeId) -> CellProperties {
    CellProperties {
        background_color: Mixable::Value(read_background_color(doc, cell)),
        horizontal_alignment: Mixable::Value(read_horizontal_alignment(doc, cell)),
        vertical_alignment: Mixable::Value(read_vertical_alignment(doc, cell)),
    }
}

/// Apply cell appearance, skipping every `Mixed` part
pub fn write_cell_properties(doc: &mut Document, cell: NodeId, properties: &CellProperties) -> Result<()> {
    if let Mixable::Value(color) = properties.background_color {
        write_background_color(doc, cell, color)?;
    }
    if let Mixable::Value(alignment) = properties.horizontal_alignment {
        write_horizontal_alignment(doc, cell, alignment)?;
    }
    if let Mixable::Value(alignment) = properties.vertical_alignment {
        write_vertical_alignment(doc, cell, alignment)?;
    }
    Ok(())
}
