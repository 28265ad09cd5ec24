//! Boundary-point positions and ranges
//!
//! A [`Position`] is a point between two children of a container (or between
//! two characters of a text node). Positions are ordered by document order,
//! which is computed from the child-index path leading to them.

use crate::{Document, DomError, Node, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A boundary point inside a container node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub container: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(container: NodeId, offset: usize) -> Self {
        Self { container, offset }
    }
}

/// A pair of positions; `start` is expected not to follow `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A caret at `position`
    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn collapse_to_start(self) -> Self {
        Self::collapsed(self.start)
    }

    pub fn collapse_to_end(self) -> Self {
        Self::collapsed(self.end)
    }
}

impl Document {
    /// Child-index path of a position, the sort key for document order
    pub fn position_key(&self, position: Position) -> Result<Vec<usize>> {
        let container = self.node(position.container)?;
        if position.offset > container.length() {
            return Err(DomError::InvalidPosition {
                node_id: position.container,
                offset: position.offset,
            });
        }
        let mut key = vec![position.offset];
        let mut current = position.container;
        while current != self.root() {
            let index = self.index_in_parent(current).ok_or(DomError::InvalidPosition {
                node_id: position.container,
                offset: position.offset,
            })?;
            key.push(index);
            current = self.parent(current).ok_or(DomError::NodeNotFound(current))?;
        }
        key.reverse();
        Ok(key)
    }

    pub fn compare_positions(&self, a: Position, b: Position) -> Result<Ordering> {
        Ok(self.position_key(a)?.cmp(&self.position_key(b)?))
    }

    /// Whether the position refers to an attached node at an in-bounds offset
    pub fn is_valid_position(&self, position: Position) -> bool {
        self.get(position.container)
            .map(|node| position.offset <= node.length())
            .unwrap_or(false)
            && self.is_attached(position.container)
    }

    /// Swap the ends of a backwards range
    pub fn normalize_range(&self, range: Range) -> Result<Range> {
        if self.compare_positions(range.start, range.end)? == Ordering::Greater {
            Ok(Range::new(range.end, range.start))
        } else {
            Ok(range)
        }
    }

    // =========================================================================
    // Positions around an element
    // =========================================================================

    /// Just outside the start tag
    pub fn before_begin(&self, id: NodeId) -> Result<Position> {
        let parent = self.parent(id).ok_or(DomError::NodeNotFound(id))?;
        let index = self.index_in_parent(id).ok_or(DomError::NodeNotFound(id))?;
        Ok(Position::new(parent, index))
    }

    /// Just inside the start tag
    pub fn after_begin(&self, id: NodeId) -> Result<Position> {
        self.node(id)?;
        Ok(Position::new(id, 0))
    }

    /// Just inside the end tag
    pub fn before_end(&self, id: NodeId) -> Result<Position> {
        Ok(Position::new(id, self.node(id)?.length()))
    }

    /// Just outside the end tag
    pub fn after_end(&self, id: NodeId) -> Result<Position> {
        let parent = self.parent(id).ok_or(DomError::NodeNotFound(id))?;
        let index = self.index_in_parent(id).ok_or(DomError::NodeNotFound(id))?;
        Ok(Position::new(parent, index + 1))
    }

    /// Range enclosing the element including its tags
    pub fn outer_range(&self, id: NodeId) -> Result<Range> {
        Ok(Range::new(self.before_begin(id)?, self.after_end(id)?))
    }

    /// Range over the element's content
    pub fn inner_range(&self, id: NodeId) -> Result<Range> {
        Ok(Range::new(self.after_begin(id)?, self.before_end(id)?))
    }

    /// Whether `inner` lies within `outer` (inclusive at both ends)
    pub fn range_contains(&self, outer: Range, inner: Range) -> Result<bool> {
        Ok(self.position_key(outer.start)? <= self.position_key(inner.start)?
            && self.position_key(inner.end)? <= self.position_key(outer.end)?)
    }

    /// The element a position sits in (the parent, for text positions)
    pub fn containing_element(&self, position: Position) -> Option<NodeId> {
        let node = self.get(position.container)?;
        if node.is_text() {
            node.parent()
        } else {
            Some(position.container)
        }
    }

    // =========================================================================
    // Searching
    // =========================================================================

    /// Elements matching `predicate` that overlap a non-collapsed range,
    /// in document order
    pub fn elements_in_range(
        &self,
        range: Range,
        predicate: impl Fn(&Node) -> bool,
    ) -> Result<Vec<NodeId>> {
        if range.is_collapsed() {
            return Ok(Vec::new());
        }
        let start = self.position_key(range.start)?;
        let end = self.position_key(range.end)?;
        let mut found = Vec::new();
        for id in self.descendants(self.root()) {
            let node = self.node(id)?;
            if !node.is_element() || !predicate(node) {
                continue;
            }
            let begin = self.position_key(self.before_begin(id)?)?;
            let finish = self.position_key(self.after_end(id)?)?;
            if begin < end && finish > start {
                found.push(id);
            }
        }
        Ok(found)
    }

    /// First element matching `predicate` whose start tag lies at or after
    /// `from` and before `bound`
    pub fn seek_element_right(
        &self,
        from: Position,
        bound: Position,
        predicate: impl Fn(&Node) -> bool,
    ) -> Result<Option<NodeId>> {
        let from = self.position_key(from)?;
        let bound = self.position_key(bound)?;
        let mut best: Option<(Vec<usize>, NodeId)> = None;
        for id in self.descendants(self.root()) {
            let node = self.node(id)?;
            if !node.is_element() || !predicate(node) {
                continue;
            }
            let key = self.position_key(self.before_begin(id)?)?;
            if key >= from && key < bound && best.as_ref().map_or(true, |(k, _)| key < *k) {
                best = Some((key, id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    /// Last element matching `predicate` whose end tag lies at or before
    /// `from` and after `bound`
    pub fn seek_element_left(
        &self,
        from: Position,
        bound: Position,
        predicate: impl Fn(&Node) -> bool,
    ) -> Result<Option<NodeId>> {
        let from = self.position_key(from)?;
        let bound = self.position_key(bound)?;
        let mut best: Option<(Vec<usize>, NodeId)> = None;
        for id in self.descendants(self.root()) {
            let node = self.node(id)?;
            if !node.is_element() || !predicate(node) {
                continue;
            }
            let key = self.position_key(self.after_end(id)?)?;
            if key <= from && key > bound && best.as_ref().map_or(true, |(k, _)| key > *k) {
                best = Some((key, id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    // =========================================================================
    // Insertion at a position
    // =========================================================================

    /// Split a text node at a character offset; returns the new right half
    pub fn split_text(&mut self, text: NodeId, offset: usize) -> Result<NodeId> {
        let node = self.node(text)?;
        if !node.is_text() || offset > node.length() {
            return Err(DomError::InvalidPosition {
                node_id: text,
                offset,
            });
        }
        let byte_offset = node
            .text()
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(node.text().len());
        let tail = node.text()[byte_offset..].to_string();
        let parent = self.parent(text).ok_or(DomError::NodeNotFound(text))?;
        let index = self.index_in_parent(text).ok_or(DomError::NodeNotFound(text))?;

        self.node_mut(text)?.text.truncate(byte_offset);
        let right = self.create_text(&tail);
        self.insert_child(parent, index + 1, right)?;
        Ok(right)
    }

    /// Insert a detached node at a position, splitting text if needed.
    /// Returns the position just after the inserted node.
    pub fn insert_at(&mut self, position: Position, node: NodeId) -> Result<Position> {
        let container = self.node(position.container)?;
        let (parent, index) = if container.is_text() {
            let parent = self
                .parent(position.container)
                .ok_or(DomError::NodeNotFound(position.container))?;
            let index = self
                .index_in_parent(position.container)
                .ok_or(DomError::NodeNotFound(position.container))?;
            if position.offset == 0 {
                (parent, index)
            } else if position.offset >= container.length() {
                (parent, index + 1)
            } else {
                self.split_text(position.container, position.offset)?;
                (parent, index + 1)
            }
        } else {
            (position.container, position.offset)
        };
        self.insert_child(parent, index, node)?;
        Ok(Position::new(parent, index + 1))
    }
}
