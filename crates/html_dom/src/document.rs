//! Document tree storage and structural operations

use crate::{DomError, Node, NodeId, NodeKind, Result};
use std::collections::HashMap;

/// Table section elements that may sit between a table and its rows
const TABLE_SECTIONS: &[&str] = &["thead", "tbody", "tfoot"];

/// An editable HTML document.
///
/// Nodes live in an arena keyed by [`NodeId`]; parent/child links are ids.
/// Cloning a document is a full snapshot, which is what undo relies on.
#[derive(Debug, Clone)]
pub struct Document {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    design_mode: bool,
}

impl Document {
    /// Create an empty document in design mode
    pub fn new() -> Self {
        let root = Node::root();
        let root_id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            root: root_id,
            nodes,
            design_mode: true,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether content without an explicit `contenteditable` is editable
    pub fn design_mode(&self) -> bool {
        self.design_mode
    }

    pub fn set_design_mode(&mut self, design_mode: bool) {
        self.design_mode = design_mode;
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Whether the node exists and is connected to the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = self.get(node_id).and_then(Node::parent);
        }
        false
    }

    // =========================================================================
    // Creation and linking
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.adopt(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.adopt(Node::text_node(text))
    }

    fn adopt(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.node(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it first
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        if child == self.root {
            return Err(DomError::TreeStructure("the root cannot be re-parented".into()));
        }
        if self.node(parent)?.is_text() {
            return Err(DomError::TreeStructure("text nodes cannot have children".into()));
        }
        self.node(child)?;
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(DomError::TreeStructure(format!(
                "inserting {} under {} would create a cycle",
                child, parent
            )));
        }

        self.detach(child)?;
        let parent_node = self.node_mut(parent)?;
        if index > parent_node.children.len() {
            return Err(DomError::InvalidPosition {
                node_id: parent,
                offset: index,
            });
        }
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlink a node from its parent, keeping it in the arena
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Remove a node and its whole subtree from the document
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(DomError::TreeStructure("the root cannot be removed".into()));
        }
        self.detach(id)?;
        let mut doomed = vec![id];
        while let Some(next) = doomed.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                doomed.extend(node.children);
            }
        }
        Ok(())
    }

    /// Remove every child of a node
    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Exchange the tree positions of two attached nodes
    pub fn swap_nodes(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        if a == b {
            return Ok(());
        }
        if self.is_ancestor_of(a, b) || self.is_ancestor_of(b, a) {
            return Err(DomError::TreeStructure("cannot swap a node with its ancestor".into()));
        }
        let parent_a = self.parent(a).ok_or_else(|| detached(a))?;
        let parent_b = self.parent(b).ok_or_else(|| detached(b))?;
        let index_a = self.index_in_parent(a).ok_or_else(|| detached(a))?;
        let index_b = self.index_in_parent(b).ok_or_else(|| detached(b))?;

        self.node_mut(parent_a)?.children[index_a] = b;
        self.node_mut(parent_b)?.children[index_b] = a;
        self.node_mut(a)?.parent = Some(parent_b);
        self.node_mut(b)?.parent = Some(parent_a);
        Ok(())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Children of a node (empty for unknown ids)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Ancestors of a node, nearest first, not including the node itself
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(node_id) = current {
            result.push(node_id);
            current = self.parent(node_id);
        }
        result
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Nearest node, starting with `id` itself, that satisfies `predicate`
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if predicate(node) {
                return Some(node_id);
            }
            current = node.parent();
        }
        None
    }

    /// All descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let Some(node) = self.get(id) {
            if node.is_text() {
                text.push_str(node.text());
            }
        }
        for descendant in self.descendants(id) {
            if let Some(node) = self.get(descendant) {
                if node.is_text() {
                    text.push_str(node.text());
                }
            }
        }
        text
    }

    // =========================================================================
    // Attributes and editability
    // =========================================================================

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|node| node.attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.node_mut(id)?.set_attribute(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        Ok(self.node_mut(id)?.remove_attribute(name))
    }

    /// Copy every attribute except `id` from one element onto another
    pub fn copy_attributes(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let attributes: Vec<(String, String)> = self
            .node(from)?
            .attributes()
            .filter(|(name, _)| *name != "id")
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        let target = self.node_mut(to)?;
        for (name, value) in attributes {
            target.set_attribute(&name, &value);
        }
        Ok(())
    }

    /// The nearest `contenteditable` attribute decides; otherwise design mode does
    pub fn is_content_editable(&self, id: NodeId) -> bool {
        let decided = self.closest(id, |node| node.has_attribute("contenteditable"));
        match decided.and_then(|node_id| self.attribute(node_id, "contenteditable")) {
            Some(value) => !value.eq_ignore_ascii_case("false"),
            None => self.design_mode,
        }
    }

    // =========================================================================
    // Table structure
    // =========================================================================

    /// Rows of a table in document order, looking through section elements
    pub fn table_rows(&self, table: NodeId) -> Vec<NodeId> {
        let mut rows = Vec::new();
        for child in self.children(table) {
            match self.get(*child) {
                Some(node) if node.is_row() => rows.push(*child),
                Some(node) if TABLE_SECTIONS.contains(&node.tag()) => rows.extend(
                    self.children(*child)
                        .iter()
                        .copied()
                        .filter(|c| self.kind(*c) == Some(NodeKind::Row)),
                ),
                _ => {}
            }
        }
        rows
    }

    /// Cells of a row in order
    pub fn row_cells(&self, row: NodeId) -> Vec<NodeId> {
        self.children(row)
            .iter()
            .copied()
            .filter(|c| self.kind(*c) == Some(NodeKind::Cell))
            .collect()
    }

    /// Table owning a row or section, skipping the section level
    fn table_of_row(&self, row: NodeId) -> Option<NodeId> {
        let parent = self.parent(row)?;
        match self.get(parent)? {
            node if node.is_table() => Some(parent),
            node if TABLE_SECTIONS.contains(&node.tag()) => self
                .parent(parent)
                .filter(|t| self.kind(*t) == Some(NodeKind::Table)),
            _ => None,
        }
    }

    /// Index of a row within its table
    pub fn row_index(&self, row: NodeId) -> Option<usize> {
        let table = self.table_of_row(row)?;
        self.table_rows(table).iter().position(|r| *r == row)
    }

    /// Index of a cell within its row
    pub fn cell_index(&self, cell: NodeId) -> Option<usize> {
        let row = self.parent(cell)?;
        self.row_cells(row).iter().position(|c| *c == cell)
    }

    /// Every cell of a table, row by row, excluding cells of nested tables
    pub fn table_cells(&self, table: NodeId) -> Vec<NodeId> {
        self.table_rows(table)
            .into_iter()
            .flat_map(|row| self.row_cells(row))
            .collect()
    }

    /// Create an empty `<tr>` at `index` among the table's rows
    pub fn insert_row(&mut self, table: NodeId, index: usize) -> Result<NodeId> {
        if !self.node(table)?.is_table() {
            return Err(DomError::InvalidOperation(format!("{} is not a table", table)));
        }
        let rows = self.table_rows(table);
        let (parent, position) = match rows.get(index) {
            Some(anchor) => {
                let parent = self.parent(*anchor).ok_or_else(|| detached(*anchor))?;
                let position = self.index_in_parent(*anchor).ok_or_else(|| detached(*anchor))?;
                (parent, position)
            }
            None => match rows.last() {
                Some(last) => {
                    let parent = self.parent(*last).ok_or_else(|| detached(*last))?;
                    let position = self.index_in_parent(*last).ok_or_else(|| detached(*last))?;
                    (parent, position + 1)
                }
                None => {
                    let body = self.ensure_body(table)?;
                    (body, self.children(body).len())
                }
            },
        };
        let row = self.create_element("tr");
        self.insert_child(parent, position, row)?;
        Ok(row)
    }

    /// Create an empty `<td>` at `index` among the row's cells
    pub fn insert_cell(&mut self, row: NodeId, index: usize) -> Result<NodeId> {
        if !self.node(row)?.is_row() {
            return Err(DomError::InvalidOperation(format!("{} is not a row", row)));
        }
        let position = match self.row_cells(row).get(index) {
            Some(anchor) => self.index_in_parent(*anchor).ok_or_else(|| detached(*anchor))?,
            None => self.children(row).len(),
        };
        let cell = self.create_element("td");
        self.insert_child(row, position, cell)?;
        Ok(cell)
    }

    fn ensure_body(&mut self, table: NodeId) -> Result<NodeId> {
        let existing = self
            .children(table)
            .iter()
            .copied()
            .find(|c| self.get(*c).map(|n| n.tag() == "tbody").unwrap_or(false));
        match existing {
            Some(body) => Ok(body),
            None => {
                let body = self.create_element("tbody");
                self.append_child(table, body)?;
                Ok(body)
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn detached(id: NodeId) -> DomError {
    DomError::TreeStructure(format!("node {} is not attached", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(doc: &mut Document, rows: usize, cols: usize) -> NodeId {
        let table = doc.create_element("table");
        let root = doc.root();
        doc.append_child(root, table).unwrap();
        for r in 0..rows {
            let row = doc.insert_row(table, r).unwrap();
            for c in 0..cols {
                doc.insert_cell(row, c).unwrap();
            }
        }
        table
    }

    #[test]
    fn test_insert_rows_go_into_tbody() {
        let mut doc = Document::new();
        let table = table_with(&mut doc, 2, 3);
        let body = doc.children(table)[0];
        assert_eq!(doc.node(body).unwrap().tag(), "tbody");
        assert_eq!(doc.table_rows(table).len(), 2);
        assert_eq!(doc.table_cells(table).len(), 6);
    }

    #[test]
    fn test_row_and_cell_indices() {
        let mut doc = Document::new();
        let table = table_with(&mut doc, 2, 2);
        let rows = doc.table_rows(table);
        let inserted = doc.insert_row(table, 1).unwrap();
        assert_eq!(doc.row_index(inserted), Some(1));
        assert_eq!(doc.row_index(rows[1]), Some(2));
        let cells = doc.row_cells(rows[0]);
        assert_eq!(doc.cell_index(cells[1]), Some(1));
    }

    #[test]
    fn test_remove_deletes_subtree() {
        let mut doc = Document::new();
        let table = table_with(&mut doc, 1, 2);
        let cells = doc.table_cells(table);
        doc.remove(table).unwrap();
        assert!(!doc.contains(table));
        assert!(!doc.contains(cells[0]));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_swap_nodes() {
        let mut doc = Document::new();
        let table = table_with(&mut doc, 2, 1);
        let rows = doc.table_rows(table);
        doc.swap_nodes(rows[0], rows[1]).unwrap();
        assert_eq!(doc.table_rows(table), vec![rows[1], rows[0]]);
    }

    #[test]
    fn test_insert_child_rejects_cycles() {
        let mut doc = Document::new();
        let table = table_with(&mut doc, 1, 1);
        let cell = doc.table_cells(table)[0];
        assert!(doc.append_child(cell, table).is_err());
    }

    #[test]
    fn test_copy_attributes_skips_id() {
        let mut doc = Document::new();
        let a = doc.create_element("td");
        let b = doc.create_element("td");
        doc.set_attribute(a, "id", "first").unwrap();
        doc.set_attribute(a, "bgcolor", "#FF0000").unwrap();
        doc.copy_attributes(a, b).unwrap();
        assert_eq!(doc.attribute(b, "bgcolor"), Some("#FF0000"));
        assert_eq!(doc.attribute(b, "id"), None);
    }

    #[test]
    fn test_content_editable_resolution() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        let root = doc.root();
        doc.append_child(root, div).unwrap();
        doc.append_child(div, span).unwrap();
        assert!(doc.is_content_editable(span));
        doc.set_attribute(div, "contenteditable", "false").unwrap();
        assert!(!doc.is_content_editable(span));
        doc.set_design_mode(false);
        doc.set_attribute(span, "contenteditable", "true").unwrap();
        assert!(doc.is_content_editable(span));
    }
}
