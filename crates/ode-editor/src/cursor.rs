// SPDX-License-Identifier: MIT
//
// Cursors — an ordered multi-cursor set per view.
//
// Each cursor owns a mark in the shared buffer (its insertion point) and
// optionally an anchor mark (the fixed end of a selection). Cursors can
// be put to sleep: a sleeping cursor keeps its position but is skipped
// by multi-cursor command fan-out until woken.
//
// Invariant: a view's set always holds at least one cursor, and exactly
// one is active. The active cursor is the command target and the one the
// hardware terminal cursor tracks. Removing the active cursor promotes
// its previous neighbor (or the next, at the front). Removing the last
// cursor is a caller logic error, guarded by a debug assertion.

use crate::buffer::{Buffer, MarkId};
use crate::error::Error;
use crate::position::{Position, Range};

/// One cursor: insertion mark, optional selection anchor, sleep state,
/// and a private cut buffer for cut/uncut.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub mark: MarkId,
    pub anchor: Option<MarkId>,
    pub is_asleep: bool,
    pub cut_buffer: Option<String>,
}

impl Cursor {
    /// True when a selection anchor is set.
    #[inline]
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// The selected range, ordered, if anchored.
    #[must_use]
    pub fn selection(&self, buf: &Buffer) -> Option<Range> {
        self.anchor
            .map(|a| Range::ordered(buf.mark(a), buf.mark(self.mark)))
    }
}

/// The ordered cursor collection of one view.
#[derive(Debug, Default)]
pub struct CursorSet {
    cursors: Vec<Cursor>,
    active: usize,
}

impl CursorSet {
    /// A set holding one cursor at `pos`. The view initializer calls
    /// this; the set is never empty afterwards.
    #[must_use]
    pub fn with_initial(buf: &mut Buffer, pos: Position) -> Self {
        let mark = buf.add_mark(pos);
        Self {
            cursors: vec![Cursor {
                mark,
                anchor: None,
                is_asleep: false,
                cut_buffer: None,
            }],
            active: 0,
        }
    }

    /// Number of cursors, sleeping included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Always false after initialization.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Number of awake cursors.
    #[must_use]
    pub fn awake_count(&self) -> usize {
        self.cursors.iter().filter(|c| !c.is_asleep).count()
    }

    /// Index of the active cursor.
    #[inline]
    #[must_use]
    pub const fn active_index(&self) -> usize {
        self.active
    }

    /// The active cursor.
    #[must_use]
    pub fn active(&self) -> &Cursor {
        &self.cursors[self.active]
    }

    /// The active cursor, mutably.
    #[must_use]
    pub fn active_mut(&mut self) -> &mut Cursor {
        &mut self.cursors[self.active]
    }

    /// All cursors in order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Cursor> {
        self.cursors.iter()
    }

    /// Mark ids of all awake cursors, in order. Commands fan out over
    /// this list; collecting ids first keeps the borrow short.
    #[must_use]
    pub fn awake_marks(&self) -> Vec<MarkId> {
        self.cursors
            .iter()
            .filter(|c| !c.is_asleep)
            .map(|c| c.mark)
            .collect()
    }

    /// Indices of all awake cursors, in order.
    #[must_use]
    pub fn awake_indices(&self) -> Vec<usize> {
        self.cursors
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_asleep)
            .map(|(i, _)| i)
            .collect()
    }

    /// Cursor by index.
    #[must_use]
    pub fn cursor(&self, index: usize) -> Option<&Cursor> {
        self.cursors.get(index)
    }

    /// Cursor by index, mutably.
    pub fn cursor_mut(&mut self, index: usize) -> Option<&mut Cursor> {
        self.cursors.get_mut(index)
    }

    /// Drop an anchor on every awake cursor that lacks one.
    pub fn drop_anchors_all(&mut self, buf: &mut Buffer) {
        for c in &mut self.cursors {
            if !c.is_asleep && c.anchor.is_none() {
                let pos = buf.mark(c.mark);
                c.anchor = Some(buf.add_mark(pos));
            }
        }
    }

    /// Lift the anchor of the cursor at `index`, if set.
    pub fn lift_anchor_at(&mut self, buf: &mut Buffer, index: usize) {
        if let Some(c) = self.cursors.get_mut(index) {
            if let Some(anchor) = c.anchor.take() {
                buf.remove_mark(anchor);
            }
        }
    }

    /// Add an awake cursor at `pos` and return its index.
    pub fn add(&mut self, buf: &mut Buffer, pos: Position) -> usize {
        self.push(buf, pos, false)
    }

    /// Add a sleeping cursor at `pos` and return its index. Sleeping
    /// cursors sit out of command fan-out until [`wake_all`](Self::wake_all).
    pub fn add_asleep(&mut self, buf: &mut Buffer, pos: Position) -> usize {
        self.push(buf, pos, true)
    }

    fn push(&mut self, buf: &mut Buffer, pos: Position, asleep: bool) -> usize {
        let mark = buf.add_mark(pos);
        self.cursors.push(Cursor {
            mark,
            anchor: None,
            is_asleep: asleep,
            cut_buffer: None,
        });
        self.cursors.len() - 1
    }

    /// Wake every sleeping cursor. Returns how many woke.
    pub fn wake_all(&mut self) -> usize {
        let mut woken = 0;
        for c in &mut self.cursors {
            if c.is_asleep {
                c.is_asleep = false;
                woken += 1;
            }
        }
        woken
    }

    /// Remove the cursor at `index`, releasing its marks and cut buffer.
    /// Removing the active cursor promotes the previous neighbor, or the
    /// next one at the front.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchCursor`] when `index` is out of range.
    ///
    /// # Panics
    ///
    /// Debug-asserts that this is not the last cursor; release builds
    /// refuse with [`Error::NoSuchCursor`] instead of leaving the view
    /// cursorless.
    pub fn remove(&mut self, buf: &mut Buffer, index: usize) -> Result<(), Error> {
        if index >= self.cursors.len() {
            return Err(Error::NoSuchCursor);
        }
        debug_assert!(
            self.cursors.len() > 1,
            "a view must always retain one cursor"
        );
        if self.cursors.len() == 1 {
            return Err(Error::NoSuchCursor);
        }

        let cursor = self.cursors.remove(index);
        buf.remove_mark(cursor.mark);
        if let Some(anchor) = cursor.anchor {
            buf.remove_mark(anchor);
        }

        if index < self.active || (index == self.active && self.active > 0) {
            self.active -= 1;
        }
        // index == active == 0: the next neighbor (now at 0) is promoted
        // implicitly.
        Ok(())
    }

    /// Remove every cursor except the one at `keep`; it becomes active.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchCursor`] when `keep` is out of range.
    pub fn remove_all_except(&mut self, buf: &mut Buffer, keep: usize) -> Result<(), Error> {
        if keep >= self.cursors.len() {
            return Err(Error::NoSuchCursor);
        }
        for (i, c) in self.cursors.iter().enumerate() {
            if i != keep {
                buf.remove_mark(c.mark);
                if let Some(a) = c.anchor {
                    buf.remove_mark(a);
                }
            }
        }
        let kept = self.cursors.swap_remove(keep);
        self.cursors.clear();
        self.cursors.push(kept);
        self.active = 0;
        Ok(())
    }

    /// Drop an anchor on the active cursor at its current position, if
    /// not anchored yet.
    pub fn drop_anchor(&mut self, buf: &mut Buffer) {
        let pos = buf.mark(self.active().mark);
        let cursor = self.active_mut();
        if cursor.anchor.is_none() {
            cursor.anchor = Some(buf.add_mark(pos));
        }
    }

    /// Lift the active cursor's anchor, releasing its mark.
    pub fn lift_anchor(&mut self, buf: &mut Buffer) {
        if let Some(anchor) = self.active_mut().anchor.take() {
            buf.remove_mark(anchor);
        }
    }

    /// Lift anchors on all cursors.
    pub fn lift_all_anchors(&mut self, buf: &mut Buffer) {
        for c in &mut self.cursors {
            if let Some(anchor) = c.anchor.take() {
                buf.remove_mark(anchor);
            }
        }
    }

    /// Release every mark this set owns. Called at view teardown.
    pub fn release_all(&mut self, buf: &mut Buffer) {
        for c in self.cursors.drain(..) {
            buf.remove_mark(c.mark);
            if let Some(a) = c.anchor {
                buf.remove_mark(a);
            }
        }
        self.active = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup() -> (Buffer, CursorSet) {
        let mut buf = Buffer::from_text("one\ntwo\nthree");
        let set = CursorSet::with_initial(&mut buf, Position::ZERO);
        (buf, set)
    }

    #[test]
    fn initial_cursor_is_active() {
        let (buf, set) = setup();
        assert_eq!(set.len(), 1);
        assert_eq!(set.active_index(), 0);
        assert_eq!(buf.mark(set.active().mark), Position::ZERO);
    }

    #[test]
    fn add_appends_and_keeps_active() {
        let (mut buf, mut set) = setup();
        let idx = set.add(&mut buf, Position::new(1, 1));
        assert_eq!(idx, 1);
        assert_eq!(set.len(), 2);
        assert_eq!(set.active_index(), 0);
    }

    #[test]
    fn asleep_cursors_sit_out_of_fanout() {
        let (mut buf, mut set) = setup();
        set.add_asleep(&mut buf, Position::new(1, 0));
        set.add(&mut buf, Position::new(2, 0));
        assert_eq!(set.len(), 3);
        assert_eq!(set.awake_count(), 2);
        assert_eq!(set.awake_marks().len(), 2);
    }

    #[test]
    fn wake_all_wakes() {
        let (mut buf, mut set) = setup();
        set.add_asleep(&mut buf, Position::new(1, 0));
        set.add_asleep(&mut buf, Position::new(2, 0));
        assert_eq!(set.wake_all(), 2);
        assert_eq!(set.awake_count(), 3);
        assert_eq!(set.wake_all(), 0);
    }

    #[test]
    fn remove_nonactive_keeps_active_cursor() {
        let (mut buf, mut set) = setup();
        set.add(&mut buf, Position::new(1, 0));
        let active_mark = set.active().mark;
        set.remove(&mut buf, 1).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.active().mark, active_mark);
    }

    #[test]
    fn remove_active_promotes_previous() {
        let (mut buf, mut set) = setup();
        let first_mark = set.active().mark;
        set.add(&mut buf, Position::new(1, 0));
        set.active = 1;
        set.remove(&mut buf, 1).unwrap();
        assert_eq!(set.active_index(), 0);
        assert_eq!(set.active().mark, first_mark);
    }

    #[test]
    fn remove_active_front_promotes_next() {
        let (mut buf, mut set) = setup();
        let second = set.add(&mut buf, Position::new(1, 0));
        let second_mark = set.cursors[second].mark;
        set.remove(&mut buf, 0).unwrap();
        assert_eq!(set.active_index(), 0);
        assert_eq!(set.active().mark, second_mark);
    }

    #[test]
    fn remove_before_active_shifts_index() {
        let (mut buf, mut set) = setup();
        set.add(&mut buf, Position::new(1, 0));
        set.add(&mut buf, Position::new(2, 0));
        set.active = 2;
        let mark = set.active().mark;
        set.remove(&mut buf, 0).unwrap();
        assert_eq!(set.active_index(), 1);
        assert_eq!(set.active().mark, mark);
    }

    #[test]
    fn remove_out_of_range_errors() {
        let (mut buf, mut set) = setup();
        set.add(&mut buf, Position::new(1, 0));
        assert_eq!(set.remove(&mut buf, 9), Err(Error::NoSuchCursor));
    }

    #[test]
    fn remove_releases_marks() {
        let (mut buf, mut set) = setup();
        set.add(&mut buf, Position::new(1, 0));
        let before = buf.mark_count();
        set.remove(&mut buf, 1).unwrap();
        assert_eq!(buf.mark_count(), before - 1);
    }

    #[test]
    fn remove_all_except_keeps_one_active() {
        let (mut buf, mut set) = setup();
        set.add(&mut buf, Position::new(1, 0));
        let keep = set.add(&mut buf, Position::new(2, 1));
        set.remove_all_except(&mut buf, keep).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.active_index(), 0);
        assert_eq!(buf.mark(set.active().mark), Position::new(2, 1));
        assert_eq!(buf.mark_count(), 1);
    }

    #[test]
    fn cursor_invariant_under_add_remove_sequences() {
        // Any add/remove sequence that never removes the last cursor
        // keeps an active cursor that is a member of the set.
        let (mut buf, mut set) = setup();
        for i in 0..5 {
            set.add(&mut buf, Position::new(i % 3, 0));
        }
        for idx in [3, 0, 2, 1] {
            set.remove(&mut buf, idx).unwrap();
            assert!(set.active_index() < set.len());
            assert!(!set.is_empty());
        }
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn anchor_drop_and_lift() {
        let (mut buf, mut set) = setup();
        assert!(!set.active().is_anchored());
        set.drop_anchor(&mut buf);
        assert!(set.active().is_anchored());

        // Move the cursor mark and check the selection spans the gap.
        let mark = set.active().mark;
        buf.set_mark(mark, Position::new(1, 2));
        let sel = set.active().selection(&buf).unwrap();
        assert_eq!(sel.start, Position::ZERO);
        assert_eq!(sel.end, Position::new(1, 2));

        set.lift_anchor(&mut buf);
        assert!(!set.active().is_anchored());
        assert_eq!(set.active().selection(&buf), None);
    }

    #[test]
    fn drop_anchor_twice_is_stable() {
        let (mut buf, mut set) = setup();
        set.drop_anchor(&mut buf);
        let anchor = set.active().anchor;
        set.drop_anchor(&mut buf);
        assert_eq!(set.active().anchor, anchor);
    }

    #[test]
    fn release_all_returns_marks() {
        let (mut buf, mut set) = setup();
        set.add(&mut buf, Position::new(1, 0));
        set.drop_anchor(&mut buf);
        set.release_all(&mut buf);
        assert_eq!(buf.mark_count(), 0);
        assert!(set.is_empty());
    }
}
