//! Snapshot-based undo units and history
//!
//! An [`UndoUnit`] captures the document as it was when the unit was opened.
//! Committing a visible unit pushes that snapshot as a new undo step;
//! committing an invisible unit folds its changes into the previous step.
//! Dropping a unit without committing records nothing and restores nothing.

use crate::Document;

/// Whether a unit creates its own undo step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Visible,
    Invisible,
}

/// An open undo transaction
#[derive(Debug)]
pub struct UndoUnit {
    kind: UndoKind,
    label: String,
    before: Option<Document>,
}

impl UndoUnit {
    pub fn new(kind: UndoKind, label: impl Into<String>, before: Document) -> Self {
        Self {
            kind,
            label: label.into(),
            before: Some(before),
        }
    }

    pub fn kind(&self) -> UndoKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consume the unit for committing
    pub(crate) fn take_snapshot(mut self) -> (UndoKind, String, Option<Document>) {
        (self.kind, std::mem::take(&mut self.label), self.before.take())
    }
}

impl Drop for UndoUnit {
    fn drop(&mut self) {
        if self.before.is_some() {
            tracing::debug!(label = %self.label, "undo unit discarded without commit");
        }
    }
}

struct UndoEntry {
    label: String,
    snapshot: Document,
}

/// Undo and redo stacks of document snapshots
pub struct UndoHistory {
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    max_entries: usize,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
        }
    }

    /// Record a finished unit
    pub fn commit(&mut self, unit: UndoUnit) {
        let (kind, label, snapshot) = unit.take_snapshot();
        let Some(snapshot) = snapshot else {
            return;
        };
        self.redo_stack.clear();

        if kind == UndoKind::Invisible && !self.undo_stack.is_empty() {
            // The previous step's snapshot predates this change too
            return;
        }
        self.undo_stack.push(UndoEntry { label, snapshot });
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Step back; `current` becomes the redo state. Returns the restored document.
    pub fn undo(&mut self, current: Document) -> Option<Document> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(UndoEntry {
            label: entry.label.clone(),
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self, current: Document) -> Option<Document> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(UndoEntry {
            label: entry.label.clone(),
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the step `undo` would revert
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.label.as_str())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(html: &str) -> Document {
        Document::parse_fragment(html).unwrap()
    }

    #[test]
    fn test_visible_units_undo_and_redo() {
        let mut history = UndoHistory::new();
        let before = doc_with("<p>a</p>");
        let after = doc_with("<p>b</p>");
        history.commit(UndoUnit::new(UndoKind::Visible, "edit", before));

        let restored = history.undo(after).unwrap();
        assert_eq!(restored.to_html(), "<p>a</p>");
        let again = history.redo(restored).unwrap();
        assert_eq!(again.to_html(), "<p>b</p>");
    }

    #[test]
    fn test_invisible_unit_merges_into_previous_step() {
        let mut history = UndoHistory::new();
        history.commit(UndoUnit::new(UndoKind::Visible, "edit", doc_with("<p>a</p>")));
        history.commit(UndoUnit::new(UndoKind::Invisible, "fixup", doc_with("<p>b</p>")));
        assert_eq!(history.undo_depth(), 1);
        let restored = history.undo(doc_with("<p>c</p>")).unwrap();
        assert_eq!(restored.to_html(), "<p>a</p>");
    }

    #[test]
    fn test_dropped_unit_records_nothing() {
        let history = UndoHistory::new();
        {
            let _unit = UndoUnit::new(UndoKind::Visible, "abandoned", Document::new());
        }
        assert!(!history.can_undo());
    }

    #[test]
    fn test_history_limit() {
        let mut history = UndoHistory::with_limit(2);
        for _ in 0..3 {
            history.commit(UndoUnit::new(UndoKind::Visible, "edit", Document::new()));
        }
        assert_eq!(history.undo_depth(), 2);
    }
}
