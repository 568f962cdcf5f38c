use std::collections::BTreeMap;

use crate::data::model::{SampleKey, TableId, Truncation};

/// Chosen samples of one table with their truncation points.
pub type SelectionEntry = BTreeMap<SampleKey, Truncation>;

/// The complete active selection at one point in time.
pub type Selection = BTreeMap<TableId, SelectionEntry>;

/// One entry of the undo history, stamped with a revision number so that
/// "unsaved changes" survive undo-then-edit sequences.
#[derive(Debug, Clone)]
struct Revision {
    id: u64,
    selection: Selection,
}

// ---------------------------------------------------------------------------
// History – linear undo/redo over whole-selection copies
// ---------------------------------------------------------------------------

/// Ordered snapshots plus a pointer to the current one.
///
/// Pushing discards every snapshot after the pointer.
#[derive(Debug, Clone)]
pub struct History {
    revisions: Vec<Revision>,
    pointer: usize,
    next_id: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::starting_with(Selection::new())
    }
}

impl History {
    /// A history whose only entry is `selection`.
    pub fn starting_with(selection: Selection) -> Self {
        Self {
            revisions: vec![Revision { id: 0, selection }],
            pointer: 0,
            next_id: 1,
        }
    }

    pub fn current(&self) -> &Selection {
        &self.revisions[self.pointer].selection
    }

    /// Revision number of the current snapshot.
    pub fn revision(&self) -> u64 {
        self.revisions[self.pointer].id
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Number of stored snapshots, including undone ones.
    pub fn depth(&self) -> usize {
        self.revisions.len()
    }

    pub fn push(&mut self, selection: Selection) {
        self.revisions.truncate(self.pointer + 1);
        self.revisions.push(Revision {
            id: self.next_id,
            selection,
        });
        self.next_id += 1;
        self.pointer += 1;
    }

    /// Step back. Returns `(moved, can_undo_again)`.
    pub fn undo(&mut self) -> (bool, bool) {
        if self.pointer == 0 {
            return (false, false);
        }
        self.pointer -= 1;
        (true, self.can_undo())
    }

    /// Step forward. Returns `(moved, can_redo_again)`.
    pub fn redo(&mut self) -> (bool, bool) {
        if !self.can_redo() {
            return (false, false);
        }
        self.pointer += 1;
        (true, self.can_redo())
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.revisions.len()
    }

    /// Whether any stored snapshot, current or not, selects from `table`.
    pub fn references(&self, table: TableId) -> bool {
        self.revisions
            .iter()
            .any(|r| r.selection.contains_key(&table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_sample() -> Selection {
        let mut entry = SelectionEntry::new();
        entry.insert(SampleKey::new(1, 1), None);
        let mut selection = Selection::new();
        selection.insert(TableId::next(), entry);
        selection
    }

    #[test]
    fn boundaries_do_not_move() {
        let mut history = History::default();
        assert_eq!(history.undo(), (false, false));
        assert_eq!(history.redo(), (false, false));
        assert_eq!(history.pointer(), 0);
    }

    #[test]
    fn push_discards_redo_branch() {
        let mut history = History::default();
        history.push(one_sample());
        history.push(one_sample());
        assert_eq!(history.undo(), (true, true));
        assert_eq!(history.undo(), (true, false));
        assert_eq!(history.redo(), (true, true));

        history.push(one_sample());
        assert_eq!(history.depth(), 3);
        assert!(!history.can_redo());
        assert_eq!(history.pointer(), 2);
    }

    #[test]
    fn revisions_are_never_reused() {
        let mut history = History::default();
        history.push(one_sample());
        let first = history.revision();
        history.undo();
        history.push(one_sample());
        assert_eq!(history.pointer(), 1);
        assert_ne!(history.revision(), first);
    }
}
