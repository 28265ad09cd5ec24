//! Node kinds and node storage

use crate::{NodeId, StyleDeclarations};
use serde::{Deserialize, Serialize};

/// Elements that never have children or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "wbr",
];

/// Kind of a node. Table structure gets dedicated kinds so callers can
/// match on them instead of comparing tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    Table,
    Row,
    Cell,
    Text,
    Element,
}

impl NodeKind {
    /// Kind for an element tag name
    pub fn for_tag(tag: &str) -> Self {
        match tag {
            "table" => NodeKind::Table,
            "tr" => NodeKind::Row,
            "td" | "th" => NodeKind::Cell,
            _ => NodeKind::Element,
        }
    }

    pub fn is_element(&self) -> bool {
        !matches!(self, NodeKind::Root | NodeKind::Text)
    }
}

/// A node in an HTML document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    kind: NodeKind,
    tag: String,
    attributes: Vec<(String, String)>,
    /// Editing-only style, never written out
    #[serde(skip)]
    runtime_style: StyleDeclarations,
    pub(crate) text: String,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::with_kind(NodeKind::Root, "#document")
    }

    pub(crate) fn element(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        Self::with_kind(NodeKind::for_tag(&tag), &tag)
    }

    pub(crate) fn text_node(text: &str) -> Self {
        let mut node = Self::with_kind(NodeKind::Text, "#text");
        node.text = text.to_string();
        node
    }

    fn with_kind(kind: NodeKind, tag: &str) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            children: Vec::new(),
            kind,
            tag: tag.to_string(),
            attributes: Vec::new(),
            runtime_style: StyleDeclarations::new(),
            text: String::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Lowercase tag name (`#text` / `#document` for non-elements)
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Text of a text node
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_table(&self) -> bool {
        self.kind == NodeKind::Table
    }

    pub fn is_row(&self) -> bool {
        self.kind == NodeKind::Row
    }

    pub fn is_cell(&self) -> bool {
        self.kind == NodeKind::Cell
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_element(&self) -> bool {
        self.kind.is_element()
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    /// Number of boundary offsets inside this node minus one
    pub fn length(&self) -> usize {
        if self.is_text() {
            self.text.chars().count()
        } else {
            self.children.len()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Set an attribute, keeping its original position when it already exists
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name, value.to_string())),
        }
    }

    /// Remove an attribute; returns whether it was present
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.attributes.len();
        self.attributes.retain(|(n, _)| *n != name);
        self.attributes.len() != before
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parsed persisted `style` attribute
    pub fn style(&self) -> StyleDeclarations {
        self.attribute("style")
            .map(StyleDeclarations::parse)
            .unwrap_or_default()
    }

    pub fn runtime_style(&self) -> &StyleDeclarations {
        &self.runtime_style
    }

    pub fn runtime_style_mut(&mut self) -> &mut StyleDeclarations {
        &mut self.runtime_style
    }

    /// Whether the `class` attribute lists `class_name`
    pub fn has_class(&self, class_name: &str) -> bool {
        self.attribute("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_tag() {
        assert_eq!(NodeKind::for_tag("table"), NodeKind::Table);
        assert_eq!(NodeKind::for_tag("tr"), NodeKind::Row);
        assert_eq!(NodeKind::for_tag("th"), NodeKind::Cell);
        assert_eq!(NodeKind::for_tag("tbody"), NodeKind::Element);
    }

    #[test]
    fn test_attributes_case_insensitive() {
        let mut node = Node::element("TD");
        assert_eq!(node.tag(), "td");
        node.set_attribute("BGColor", "#FF0000");
        assert_eq!(node.attribute("bgcolor"), Some("#FF0000"));
        node.set_attribute("width", "10");
        node.set_attribute("bgcolor", "#00FF00");
        let names: Vec<_> = node.attributes().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["bgcolor", "width"]);
        assert!(node.remove_attribute("BGCOLOR"));
        assert!(!node.remove_attribute("bgcolor"));
    }

    #[test]
    fn test_has_class() {
        let mut node = Node::element("div");
        node.set_attribute("class", "a wlWriterSmartContent b");
        assert!(node.has_class("wlWriterSmartContent"));
        assert!(!node.has_class("wlWriter"));
    }
}
