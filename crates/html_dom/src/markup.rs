//! Reading and writing HTML fragments
//!
//! Fragments are read with quick-xml in a lenient mode: end tags need not
//! match, void elements may be left open, and attributes may be unquoted or
//! valueless. Named entities beyond the XML set are limited to `&nbsp;`.

use crate::{Document, DomError, NodeId, Result, VOID_ELEMENTS};
use quick_xml::escape::{escape, partial_escape, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Containers whose whitespace-only text is not content
const WHITESPACE_INSENSITIVE: &[&str] = &["#document", "table", "thead", "tbody", "tfoot", "tr"];

fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        _ => None,
    }
}

fn decode(raw: &str) -> Result<String> {
    unescape_with(raw, resolve_entity)
        .map(|text| text.into_owned())
        .map_err(|e| DomError::Parse(e.to_string()))
}

impl Document {
    /// Parse a fragment into a new document
    pub fn parse_fragment(html: &str) -> Result<Self> {
        let mut doc = Self::new();
        let root = doc.root();
        doc.append_html(root, html)?;
        Ok(doc)
    }

    /// Parse a fragment and append its top-level nodes to `parent`
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        let index = self.node(parent)?.children().len();
        self.insert_html(parent, index, html)
    }

    /// Parse a fragment and insert its top-level nodes at `index` in `parent`
    pub fn insert_html(&mut self, parent: NodeId, index: usize, html: &str) -> Result<Vec<NodeId>> {
        let mut reader = Reader::from_str(html);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;

        let mut buf = Vec::new();
        let mut top_level = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let element = self.element_from_tag(e)?;
                    self.place_parsed(parent, index, &open, &mut top_level, element)?;
                    if !self.node(element)?.is_void() {
                        open.push(element);
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    let element = self.element_from_tag(e)?;
                    self.place_parsed(parent, index, &open, &mut top_level, element)?;
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    if let Some(depth) = open
                        .iter()
                        .rposition(|id| self.get(*id).map(|n| n.tag() == name).unwrap_or(false))
                    {
                        open.truncate(depth);
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let text = decode(&String::from_utf8_lossy(e))?;
                    self.place_text(parent, index, &open, &mut top_level, &text)?;
                }
                Ok(Event::CData(ref e)) => {
                    let text = String::from_utf8_lossy(e).into_owned();
                    self.place_text(parent, index, &open, &mut top_level, &text)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(DomError::Parse(format!(
                        "at {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
            buf.clear();
        }
        Ok(top_level)
    }

    /// Replace the content of an element with a parsed fragment
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<()> {
        self.clear_children(id)?;
        self.append_html(id, html)?;
        Ok(())
    }

    fn element_from_tag(&mut self, start: &BytesStart<'_>) -> Result<NodeId> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        let element = self.create_element(&tag);
        for attribute in start.html_attributes() {
            let attribute = attribute.map_err(|e| DomError::Parse(e.to_string()))?;
            let name = String::from_utf8_lossy(attribute.key.as_ref()).to_ascii_lowercase();
            let value = decode(&String::from_utf8_lossy(&attribute.value))?;
            self.node_mut(element)?.set_attribute(&name, &value);
        }
        Ok(element)
    }

    fn place_parsed(
        &mut self,
        parent: NodeId,
        index: usize,
        open: &[NodeId],
        top_level: &mut Vec<NodeId>,
        node: NodeId,
    ) -> Result<()> {
        match open.last() {
            Some(container) => self.append_child(*container, node),
            None => {
                self.insert_child(parent, index + top_level.len(), node)?;
                top_level.push(node);
                Ok(())
            }
        }
    }

    fn place_text(
        &mut self,
        parent: NodeId,
        index: usize,
        open: &[NodeId],
        top_level: &mut Vec<NodeId>,
        text: &str,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let container = open.last().copied().unwrap_or(parent);
        let container_tag = self.node(container)?.tag().to_string();
        if text.chars().all(|c| c.is_ascii_whitespace())
            && WHITESPACE_INSENSITIVE.contains(&container_tag.as_str())
        {
            return Ok(());
        }
        let node = self.create_text(text);
        self.place_parsed(parent, index, open, top_level, node)
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Markup of the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    /// Markup of an element's content
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    /// Markup of an element including its own tags
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.is_text() {
            out.push_str(&partial_escape(node.text()).replace('\u{a0}', "&nbsp;"));
            return;
        }
        if !node.is_element() {
            for child in node.children() {
                self.write_node(*child, out);
            }
            return;
        }

        out.push('<');
        out.push_str(node.tag());
        for (name, value) in node.attributes() {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        if VOID_ELEMENTS.contains(&node.tag()) {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for child in node.children() {
            self.write_node(*child, out);
        }
        out.push_str("</");
        out.push_str(node.tag());
        out.push('>');
    }
}
