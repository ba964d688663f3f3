// SPDX-License-Identifier: MIT
//
// Text buffer — ropey-backed storage with marks and change actions.
//
// The dispatch/view core treats this as a black-box service. What it
// relies on:
//
// - **Marks**: buffer-owned positions that shift under edits. Cursors
//   and selection anchors hold `MarkId`s, so multi-cursor fan-out stays
//   valid as earlier cursors' edits move text underneath later ones.
// - **Change actions**: every mutation appends a `BufferAction` with its
//   line delta. The editor drains the queue after each command and
//   propagates viewport/gutter recomputation to every view sharing the
//   buffer — before the next frame renders.
// - **Visual columns**: tab expansion and wide-character widths are
//   computed here, where the tab width lives. The viewport rectifier
//   and renderer work in visual columns for the x axis.
//
// Columns are char offsets, not bytes. A column equal to the line's
// content length is the valid cursor-after-last-char position.
//
// No undo log and no syntax rules here — out of scope by design.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ropey::{Rope, RopeSlice};
use unicode_width::UnicodeWidthChar;

use crate::position::{Position, Range};

/// Handle to a buffer-owned mark.
pub type MarkId = usize;

/// Cap on how far bracket matching scans, in characters.
pub const BRACKET_SEARCH_LIMIT: usize = 10_000;

// ---------------------------------------------------------------------------
// Change actions
// ---------------------------------------------------------------------------

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Insert,
    Delete,
}

/// One buffer mutation, as reported to the change queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferAction {
    pub kind: ActionKind,
    /// Where the mutation started.
    pub at: Position,
    /// Net change in line count.
    pub line_delta: isize,
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// A text buffer shared by any number of views.
pub struct Buffer {
    rope: Rope,
    path: Option<PathBuf>,
    dirty: bool,
    tab_width: usize,
    marks: Vec<Option<Position>>,
    actions: Vec<BufferAction>,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// An empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            path: None,
            dirty: false,
            tab_width: 4,
            marks: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// A buffer holding `text`, no path.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::new()
        }
    }

    /// Load a buffer from a file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not UTF-8.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self {
            rope: Rope::from_str(&text),
            path: Some(path.to_path_buf()),
            ..Self::new()
        })
    }

    // -- Metadata -----------------------------------------------------------

    /// The backing file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Attach or change the backing path.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// True when the buffer has unsaved changes.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Current tab stop width.
    #[inline]
    #[must_use]
    pub const fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Set the tab stop width (minimum 1).
    pub fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width.max(1);
    }

    /// Write to the backing path.
    ///
    /// # Errors
    ///
    /// Fails when there is no path or the write fails.
    pub fn save(&mut self) -> io::Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "buffer has no path"))?;
        self.save_to(&path)?;
        self.dirty = false;
        Ok(())
    }

    /// Write to `path` and adopt it as the backing path.
    ///
    /// # Errors
    ///
    /// Fails when the write fails.
    pub fn save_as(&mut self, path: PathBuf) -> io::Result<()> {
        self.save_to(&path)?;
        self.path = Some(path);
        self.dirty = false;
        Ok(())
    }

    /// Write to `path` without adopting it (crash backups).
    ///
    /// # Errors
    ///
    /// Fails when the write fails.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.rope.to_string())
    }

    // -- Text access --------------------------------------------------------

    /// Total number of lines. An empty buffer has one (empty) line.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// A line by index, including its trailing line ending.
    #[must_use]
    pub fn line(&self, line: usize) -> Option<RopeSlice<'_>> {
        (line < self.rope.len_lines()).then(|| self.rope.line(line))
    }

    /// Chars in a line excluding the trailing line ending. This is the
    /// range of valid cursor columns (inclusive of the past-end slot).
    #[must_use]
    pub fn line_content_len(&self, line: usize) -> Option<usize> {
        self.line(line).map(|l| {
            let total = l.len_chars();
            if total == 0 {
                return 0;
            }
            match l.char(total - 1) {
                '\n' => {
                    if total >= 2 && l.char(total - 2) == '\r' {
                        total - 2
                    } else {
                        total - 1
                    }
                }
                '\r' => total - 1,
                _ => total,
            }
        })
    }

    /// Character at a position.
    #[must_use]
    pub fn char_at(&self, pos: Position) -> Option<char> {
        let idx = self.pos_to_char_idx(pos)?;
        (idx < self.rope.len_chars()).then(|| self.rope.char(idx))
    }

    /// Text of a range, as an owned string.
    #[must_use]
    pub fn text_of(&self, range: Range) -> String {
        let Some(start) = self.pos_to_char_idx(range.start) else {
            return String::new();
        };
        let Some(end) = self.pos_to_char_idx(range.end) else {
            return String::new();
        };
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    /// The whole buffer as a string. Allocates.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    // -- Coordinate conversion ----------------------------------------------

    /// `(line, col)` → absolute char index. `None` when out of bounds; a
    /// column equal to the line length is valid (past-end position).
    #[must_use]
    pub fn pos_to_char_idx(&self, pos: Position) -> Option<usize> {
        if pos.line >= self.rope.len_lines() {
            return None;
        }
        let line_start = self.rope.line_to_char(pos.line);
        let line_len = self.rope.line(pos.line).len_chars();
        (pos.col <= line_len).then_some(line_start + pos.col)
    }

    /// Absolute char index → `(line, col)`.
    #[must_use]
    pub fn char_idx_to_pos(&self, idx: usize) -> Option<Position> {
        if idx > self.rope.len_chars() {
            return None;
        }
        let line = self.rope.char_to_line(idx);
        Some(Position::new(line, idx - self.rope.line_to_char(line)))
    }

    /// Clamp to the nearest valid cursor position (col may sit one past
    /// the last content char).
    #[must_use]
    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        let max_col = self.line_content_len(line).unwrap_or(0);
        Position::new(line, pos.col.min(max_col))
    }

    // -- Visual columns -----------------------------------------------------

    /// Visual column of a position: tabs expand to the next tab stop,
    /// wide characters count two columns.
    #[must_use]
    pub fn vcol_of(&self, pos: Position) -> usize {
        let Some(line) = self.line(pos.line) else {
            return 0;
        };
        let tw = self.tab_width;
        let mut v = 0;
        for (i, ch) in line.chars().enumerate() {
            if i >= pos.col || ch == '\n' || ch == '\r' {
                break;
            }
            v = advance_vcol(v, ch, tw);
        }
        v
    }

    /// Char column whose span covers `vcol` (or the line end when the
    /// target lies past the content).
    #[must_use]
    pub fn col_at_vcol(&self, line: usize, vcol: usize) -> usize {
        let Some(slice) = self.line(line) else {
            return 0;
        };
        let tw = self.tab_width;
        let mut v = 0;
        for (i, ch) in slice.chars().enumerate() {
            if ch == '\n' || ch == '\r' {
                return i;
            }
            let next = advance_vcol(v, ch, tw);
            if next > vcol {
                return i;
            }
            v = next;
        }
        self.line_content_len(line).unwrap_or(0)
    }

    /// Visual width of a line's content.
    #[must_use]
    pub fn line_vwidth(&self, line: usize) -> usize {
        let len = self.line_content_len(line).unwrap_or(0);
        self.vcol_of(Position::new(line, len))
    }

    // -- Marks --------------------------------------------------------------

    /// Register a mark at `pos` (clamped). Marks shift under edits until
    /// removed.
    pub fn add_mark(&mut self, pos: Position) -> MarkId {
        let pos = self.clamp(pos);
        if let Some(slot) = self.marks.iter().position(Option::is_none) {
            self.marks[slot] = Some(pos);
            slot
        } else {
            self.marks.push(Some(pos));
            self.marks.len() - 1
        }
    }

    /// Release a mark. Releasing twice is harmless.
    pub fn remove_mark(&mut self, id: MarkId) {
        if let Some(slot) = self.marks.get_mut(id) {
            *slot = None;
        }
    }

    /// Current position of a mark (clamped to the buffer).
    #[must_use]
    pub fn mark(&self, id: MarkId) -> Position {
        self.clamp(self.marks.get(id).copied().flatten().unwrap_or(Position::ZERO))
    }

    /// Move a mark to `pos` (clamped).
    pub fn set_mark(&mut self, id: MarkId, pos: Position) {
        let pos = self.clamp(pos);
        if let Some(slot) = self.marks.get_mut(id) {
            *slot = Some(pos);
        }
    }

    /// Number of live marks.
    #[must_use]
    pub fn mark_count(&self) -> usize {
        self.marks.iter().filter(|m| m.is_some()).count()
    }

    // -- Editing ------------------------------------------------------------

    /// Insert text at a position (clamped). Marks at or after the point
    /// shift forward; an action is queued.
    pub fn insert(&mut self, pos: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        let pos = self.clamp_insert(pos);
        let idx = self
            .pos_to_char_idx(pos)
            .unwrap_or_else(|| self.rope.len_chars());
        self.rope.insert(idx, text);
        self.dirty = true;

        let newlines = text.matches('\n').count();
        let last_len = text
            .rsplit('\n')
            .next()
            .map_or(0, |seg| seg.chars().count());
        let inserted_chars = text.chars().count();

        for slot in self.marks.iter_mut().flatten() {
            if slot.line == pos.line && slot.col >= pos.col {
                if newlines == 0 {
                    slot.col += inserted_chars;
                } else {
                    slot.line += newlines;
                    slot.col = slot.col - pos.col + last_len;
                }
            } else if slot.line > pos.line {
                slot.line += newlines;
            }
        }

        self.actions.push(BufferAction {
            kind: ActionKind::Insert,
            at: pos,
            line_delta: isize::try_from(newlines).unwrap_or(isize::MAX),
        });
    }

    /// Delete a range. Marks inside collapse to the start; marks after
    /// shift back; an action is queued.
    pub fn delete(&mut self, range: Range) {
        let start = self.clamp_insert(range.start);
        let end = self.clamp_insert(range.end);
        if start >= end {
            return;
        }
        let (Some(a), Some(b)) = (self.pos_to_char_idx(start), self.pos_to_char_idx(end)) else {
            return;
        };
        self.rope.remove(a..b);
        self.dirty = true;

        let removed_lines = end.line - start.line;
        for slot in self.marks.iter_mut().flatten() {
            let m = *slot;
            if m <= start {
                continue;
            }
            if m < end {
                *slot = start;
            } else if m.line == end.line {
                slot.line = start.line;
                slot.col = start.col + (m.col - end.col);
            } else {
                slot.line -= removed_lines;
            }
        }

        self.actions.push(BufferAction {
            kind: ActionKind::Delete,
            at: start,
            line_delta: -isize::try_from(removed_lines).unwrap_or(isize::MAX),
        });
    }

    /// Drain the queued change actions.
    pub fn take_actions(&mut self) -> Vec<BufferAction> {
        std::mem::take(&mut self.actions)
    }

    /// Clamp like [`clamp`](Self::clamp), but allow a column up to the
    /// full line length including the line ending slot — the valid range
    /// of edit positions.
    fn clamp_insert(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        let max_col = self.line_content_len(line).unwrap_or(0);
        Position::new(line, pos.col.min(max_col))
    }

    // -- Navigation helpers -------------------------------------------------

    /// One position left, wrapping to the previous line end.
    #[must_use]
    pub fn pos_left(&self, pos: Position) -> Position {
        if pos.col > 0 {
            Position::new(pos.line, pos.col - 1)
        } else if pos.line > 0 {
            let line = pos.line - 1;
            Position::new(line, self.line_content_len(line).unwrap_or(0))
        } else {
            pos
        }
    }

    /// One position right, wrapping to the next line start.
    #[must_use]
    pub fn pos_right(&self, pos: Position) -> Position {
        let content = self.line_content_len(pos.line).unwrap_or(0);
        if pos.col < content {
            Position::new(pos.line, pos.col + 1)
        } else if pos.line + 1 < self.line_count() {
            Position::new(pos.line + 1, 0)
        } else {
            pos
        }
    }

    /// The last valid cursor position in the buffer.
    #[must_use]
    pub fn end_position(&self) -> Position {
        let line = self.line_count().saturating_sub(1);
        Position::new(line, self.line_content_len(line).unwrap_or(0))
    }

    /// Start of the next word after `pos`: skip the current word run,
    /// then any separators, crossing line boundaries.
    #[must_use]
    pub fn word_forward(&self, pos: Position) -> Position {
        let mut p = pos;
        // Skip the word under the cursor, if any.
        while let Some(c) = self.char_at(p) {
            if !is_word_char(c) {
                break;
            }
            let next = self.pos_right(p);
            if next == p {
                return p;
            }
            p = next;
        }
        // Skip separators to the next word start.
        loop {
            match self.char_at(p) {
                Some(c) if !is_word_char(c) => {
                    let next = self.pos_right(p);
                    if next == p {
                        return p;
                    }
                    p = next;
                }
                Some(_) => return p,
                None => {
                    let next = self.pos_right(p);
                    if next == p {
                        return p;
                    }
                    p = next;
                }
            }
        }
    }

    /// Start of the previous word before `pos`.
    #[must_use]
    pub fn word_back(&self, pos: Position) -> Position {
        let mut p = self.pos_left(pos);
        // Skip separators backwards.
        loop {
            if p == Position::ZERO {
                return p;
            }
            match self.char_at(p) {
                Some(c) if is_word_char(c) => break,
                _ => p = self.pos_left(p),
            }
        }
        // Walk to the start of this word.
        loop {
            if p.col == 0 {
                return p;
            }
            let prev = Position::new(p.line, p.col - 1);
            match self.char_at(prev) {
                Some(c) if is_word_char(c) => p = prev,
                _ => return p,
            }
        }
    }

    /// Next occurrence of `ch` strictly after `pos`, scanning forward
    /// across lines.
    #[must_use]
    pub fn find_char_forward(&self, pos: Position, ch: char) -> Option<Position> {
        let start = self.pos_to_char_idx(self.clamp_insert(pos))? + 1;
        for idx in start..self.rope.len_chars() {
            if self.rope.char(idx) == ch {
                return self.char_idx_to_pos(idx);
            }
        }
        None
    }

    /// Nearest occurrence of `ch` strictly before `pos`.
    #[must_use]
    pub fn find_char_back(&self, pos: Position, ch: char) -> Option<Position> {
        let start = self.pos_to_char_idx(self.clamp_insert(pos))?;
        for idx in (0..start).rev() {
            if self.rope.char(idx) == ch {
                return self.char_idx_to_pos(idx);
            }
        }
        None
    }

    /// First regex match at or after `pos`, wrapping to the buffer start
    /// when `wrap` is set. Returns the match's span.
    #[must_use]
    pub fn search_forward(
        &self,
        pattern: &regex::Regex,
        pos: Position,
        wrap: bool,
    ) -> Option<Range> {
        let hay = self.rope.to_string();
        let from = self
            .pos_to_char_idx(self.clamp_insert(pos))
            .unwrap_or(0);
        let byte_from = char_to_byte(&hay, from);
        let found = pattern
            .find_at(&hay, byte_from)
            .or_else(|| if wrap { pattern.find(&hay) } else { None })?;
        let start = byte_to_char(&hay, found.start());
        let end = byte_to_char(&hay, found.end());
        Some(Range::new(
            self.char_idx_to_pos(start)?,
            self.char_idx_to_pos(end)?,
        ))
    }

    /// Matching bracket for the bracket at `pos`, if `pos` sits on one.
    /// Scans at most [`BRACKET_SEARCH_LIMIT`] characters.
    #[must_use]
    pub fn matching_bracket(&self, pos: Position) -> Option<Position> {
        let ch = self.char_at(pos)?;
        let (open, close, forward) = match ch {
            '(' => ('(', ')', true),
            '[' => ('[', ']', true),
            '{' => ('{', '}', true),
            ')' => ('(', ')', false),
            ']' => ('[', ']', false),
            '}' => ('{', '}', false),
            _ => return None,
        };
        let idx = self.pos_to_char_idx(pos)?;
        let mut depth = 0usize;
        if forward {
            let limit = (idx + BRACKET_SEARCH_LIMIT).min(self.rope.len_chars());
            for i in idx..limit {
                match self.rope.char(i) {
                    c if c == open => depth += 1,
                    c if c == close => {
                        depth -= 1;
                        if depth == 0 {
                            return self.char_idx_to_pos(i);
                        }
                    }
                    _ => {}
                }
            }
        } else {
            let limit = idx.saturating_sub(BRACKET_SEARCH_LIMIT);
            for i in (limit..=idx).rev() {
                match self.rope.char(i) {
                    c if c == close => depth += 1,
                    c if c == open => {
                        depth -= 1;
                        if depth == 0 {
                            return self.char_idx_to_pos(i);
                        }
                    }
                    _ => {}
                }
            }
        }
        None
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Word characters: alphanumerics and underscore.
#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Advance a visual column over one character.
#[inline]
fn advance_vcol(v: usize, ch: char, tab_width: usize) -> usize {
    if ch == '\t' {
        (v / tab_width + 1) * tab_width
    } else {
        v + ch.width().unwrap_or(0)
    }
}

fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map_or(s.len(), |(b, _)| b)
}

fn byte_to_char(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].chars().count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    // ── Construction and lines ──────────────────────────────────────────

    #[test]
    fn empty_buffer_has_one_line() {
        let b = Buffer::new();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line_content_len(0), Some(0));
        assert!(!b.is_dirty());
    }

    #[test]
    fn line_content_excludes_ending() {
        let b = Buffer::from_text("abc\ndefg\n");
        assert_eq!(b.line_count(), 3);
        assert_eq!(b.line_content_len(0), Some(3));
        assert_eq!(b.line_content_len(1), Some(4));
        assert_eq!(b.line_content_len(2), Some(0));
    }

    #[test]
    fn crlf_content_len() {
        let b = Buffer::from_text("ab\r\ncd");
        assert_eq!(b.line_content_len(0), Some(2));
    }

    #[test]
    fn char_at_positions() {
        let b = Buffer::from_text("ab\ncd");
        assert_eq!(b.char_at(pos(0, 1)), Some('b'));
        assert_eq!(b.char_at(pos(1, 0)), Some('c'));
        assert_eq!(b.char_at(pos(5, 0)), None);
    }

    #[test]
    fn clamp_limits_line_and_col() {
        let b = Buffer::from_text("abc\nde");
        assert_eq!(b.clamp(pos(9, 9)), pos(1, 2));
        assert_eq!(b.clamp(pos(0, 99)), pos(0, 3));
    }

    // ── Editing and dirty flag ──────────────────────────────────────────

    #[test]
    fn insert_and_contents() {
        let mut b = Buffer::from_text("hello");
        b.insert(pos(0, 5), " world");
        assert_eq!(b.contents(), "hello world");
        assert!(b.is_dirty());
    }

    #[test]
    fn insert_newline_changes_line_count() {
        let mut b = Buffer::from_text("ab");
        b.insert(pos(0, 1), "\n");
        assert_eq!(b.contents(), "a\nb");
        assert_eq!(b.line_count(), 2);
    }

    #[test]
    fn delete_range() {
        let mut b = Buffer::from_text("hello world");
        b.delete(Range::new(pos(0, 5), pos(0, 11)));
        assert_eq!(b.contents(), "hello");
    }

    #[test]
    fn delete_across_lines() {
        let mut b = Buffer::from_text("one\ntwo\nthree");
        b.delete(Range::new(pos(0, 2), pos(2, 1)));
        assert_eq!(b.contents(), "onhree");
        assert_eq!(b.line_count(), 1);
    }

    #[test]
    fn empty_insert_is_a_noop() {
        let mut b = Buffer::from_text("x");
        b.insert(pos(0, 0), "");
        assert!(!b.is_dirty());
        assert!(b.take_actions().is_empty());
    }

    // ── Actions queue ───────────────────────────────────────────────────

    #[test]
    fn actions_report_line_delta() {
        let mut b = Buffer::from_text("ab");
        b.insert(pos(0, 1), "x\ny\n");
        b.delete(Range::new(pos(0, 0), pos(1, 0)));
        let actions = b.take_actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, ActionKind::Insert);
        assert_eq!(actions[0].line_delta, 2);
        assert_eq!(actions[1].kind, ActionKind::Delete);
        assert_eq!(actions[1].line_delta, -1);
        assert!(b.take_actions().is_empty());
    }

    // ── Marks ───────────────────────────────────────────────────────────

    #[test]
    fn mark_shifts_on_insert_before() {
        let mut b = Buffer::from_text("hello");
        let m = b.add_mark(pos(0, 3));
        b.insert(pos(0, 0), "xx");
        assert_eq!(b.mark(m), pos(0, 5));
    }

    #[test]
    fn mark_at_insert_point_advances() {
        let mut b = Buffer::from_text("ab");
        let m = b.add_mark(pos(0, 1));
        b.insert(pos(0, 1), "zz");
        assert_eq!(b.mark(m), pos(0, 3));
    }

    #[test]
    fn mark_before_insert_point_stays() {
        let mut b = Buffer::from_text("ab");
        let m = b.add_mark(pos(0, 0));
        b.insert(pos(0, 1), "zz");
        assert_eq!(b.mark(m), pos(0, 0));
    }

    #[test]
    fn mark_shifts_on_multiline_insert() {
        let mut b = Buffer::from_text("ab");
        let m = b.add_mark(pos(0, 1));
        b.insert(pos(0, 1), "x\ny");
        assert_eq!(b.mark(m), pos(1, 1));
    }

    #[test]
    fn mark_on_later_line_shifts_down() {
        let mut b = Buffer::from_text("ab\ncd");
        let m = b.add_mark(pos(1, 1));
        b.insert(pos(0, 0), "line\n");
        assert_eq!(b.mark(m), pos(2, 1));
    }

    #[test]
    fn mark_inside_deleted_range_collapses() {
        let mut b = Buffer::from_text("abcdef");
        let m = b.add_mark(pos(0, 3));
        b.delete(Range::new(pos(0, 1), pos(0, 5)));
        assert_eq!(b.mark(m), pos(0, 1));
    }

    #[test]
    fn mark_after_deleted_range_shifts_back() {
        let mut b = Buffer::from_text("abcdef");
        let m = b.add_mark(pos(0, 5));
        b.delete(Range::new(pos(0, 1), pos(0, 3)));
        assert_eq!(b.mark(m), pos(0, 3));
    }

    #[test]
    fn mark_after_multiline_delete() {
        let mut b = Buffer::from_text("one\ntwo\nthree");
        let m = b.add_mark(pos(2, 2));
        b.delete(Range::new(pos(0, 1), pos(1, 2)));
        assert_eq!(b.mark(m), pos(1, 2));
    }

    #[test]
    fn mark_slots_are_reused() {
        let mut b = Buffer::from_text("abc");
        let a = b.add_mark(pos(0, 0));
        b.remove_mark(a);
        let c = b.add_mark(pos(0, 2));
        assert_eq!(a, c);
        assert_eq!(b.mark_count(), 1);
    }

    #[test]
    fn multi_cursor_fanout_stays_valid() {
        // Two marks on separate lines; inserting at the first must keep
        // the second pointing at the same character.
        let mut b = Buffer::from_text("aa\nbb");
        let first = b.add_mark(pos(0, 0));
        let second = b.add_mark(pos(1, 0));
        let p = b.mark(first);
        b.insert(p, "X");
        let p = b.mark(second);
        b.insert(p, "X");
        assert_eq!(b.contents(), "Xaa\nXbb");
    }

    // ── Visual columns ──────────────────────────────────────────────────

    #[test]
    fn vcol_expands_tabs() {
        let mut b = Buffer::from_text("\tab");
        b.set_tab_width(4);
        assert_eq!(b.vcol_of(pos(0, 0)), 0);
        assert_eq!(b.vcol_of(pos(0, 1)), 4);
        assert_eq!(b.vcol_of(pos(0, 2)), 5);
    }

    #[test]
    fn vcol_counts_wide_chars() {
        let b = Buffer::from_text("中a");
        assert_eq!(b.vcol_of(pos(0, 1)), 2);
        assert_eq!(b.vcol_of(pos(0, 2)), 3);
    }

    #[test]
    fn col_at_vcol_is_inverse() {
        let mut b = Buffer::from_text("\tabc");
        b.set_tab_width(4);
        assert_eq!(b.col_at_vcol(0, 0), 0);
        assert_eq!(b.col_at_vcol(0, 3), 0); // inside the tab span
        assert_eq!(b.col_at_vcol(0, 4), 1);
        assert_eq!(b.col_at_vcol(0, 6), 3);
        assert_eq!(b.col_at_vcol(0, 99), 4); // past content
    }

    #[test]
    fn line_vwidth() {
        let mut b = Buffer::from_text("\ta中\nx");
        b.set_tab_width(4);
        assert_eq!(b.line_vwidth(0), 7);
        assert_eq!(b.line_vwidth(1), 1);
    }

    // ── Navigation ──────────────────────────────────────────────────────

    #[test]
    fn pos_left_wraps_lines() {
        let b = Buffer::from_text("ab\ncd");
        assert_eq!(b.pos_left(pos(1, 0)), pos(0, 2));
        assert_eq!(b.pos_left(pos(0, 0)), pos(0, 0));
        assert_eq!(b.pos_left(pos(1, 1)), pos(1, 0));
    }

    #[test]
    fn pos_right_wraps_lines() {
        let b = Buffer::from_text("ab\ncd");
        assert_eq!(b.pos_right(pos(0, 2)), pos(1, 0));
        assert_eq!(b.pos_right(pos(1, 2)), pos(1, 2));
    }

    #[test]
    fn word_forward_stops_at_next_word() {
        let b = Buffer::from_text("foo bar_baz  qux");
        assert_eq!(b.word_forward(pos(0, 0)), pos(0, 4));
        assert_eq!(b.word_forward(pos(0, 4)), pos(0, 13));
    }

    #[test]
    fn word_forward_crosses_lines() {
        let b = Buffer::from_text("foo\n  bar");
        assert_eq!(b.word_forward(pos(0, 0)), pos(1, 2));
    }

    #[test]
    fn word_back_stops_at_word_start() {
        let b = Buffer::from_text("foo bar baz");
        assert_eq!(b.word_back(pos(0, 11)), pos(0, 8));
        assert_eq!(b.word_back(pos(0, 8)), pos(0, 4));
        assert_eq!(b.word_back(pos(0, 1)), pos(0, 0));
    }

    #[test]
    fn find_char_forward_and_back() {
        let b = Buffer::from_text("abcabc\nxaz");
        assert_eq!(b.find_char_forward(pos(0, 0), 'c'), Some(pos(0, 2)));
        assert_eq!(b.find_char_forward(pos(0, 2), 'c'), Some(pos(0, 5)));
        assert_eq!(b.find_char_forward(pos(0, 0), 'z'), Some(pos(1, 2)));
        assert_eq!(b.find_char_back(pos(1, 2), 'a'), Some(pos(1, 1)));
        assert_eq!(b.find_char_forward(pos(1, 2), 'q'), None);
    }

    // ── Search ──────────────────────────────────────────────────────────

    #[test]
    fn search_forward_finds_span() {
        let b = Buffer::from_text("one two\nthree two");
        let re = regex::Regex::new("two").unwrap();
        let m = b.search_forward(&re, pos(0, 0), false).unwrap();
        assert_eq!(m.start, pos(0, 4));
        assert_eq!(m.end, pos(0, 7));
        let m2 = b.search_forward(&re, pos(0, 5), false).unwrap();
        assert_eq!(m2.start, pos(1, 6));
    }

    #[test]
    fn search_wraps_when_asked() {
        let b = Buffer::from_text("needle hay");
        let re = regex::Regex::new("needle").unwrap();
        assert!(b.search_forward(&re, pos(0, 3), false).is_none());
        let m = b.search_forward(&re, pos(0, 3), true).unwrap();
        assert_eq!(m.start, pos(0, 0));
    }

    // ── Brackets ────────────────────────────────────────────────────────

    #[test]
    fn matching_bracket_forward_and_back() {
        let b = Buffer::from_text("f(a[b]c)d");
        assert_eq!(b.matching_bracket(pos(0, 1)), Some(pos(0, 7)));
        assert_eq!(b.matching_bracket(pos(0, 7)), Some(pos(0, 1)));
        assert_eq!(b.matching_bracket(pos(0, 3)), Some(pos(0, 5)));
        assert_eq!(b.matching_bracket(pos(0, 0)), None);
    }

    #[test]
    fn matching_bracket_nested_and_unbalanced() {
        let b = Buffer::from_text("((a)");
        assert_eq!(b.matching_bracket(pos(0, 1)), Some(pos(0, 3)));
        assert_eq!(b.matching_bracket(pos(0, 0)), None);
    }

    // ── Saving ──────────────────────────────────────────────────────────

    #[test]
    fn save_without_path_fails() {
        let mut b = Buffer::from_text("x");
        assert!(b.save().is_err());
    }

    #[test]
    fn save_as_adopts_path_and_clears_dirty() {
        let dir = std::env::temp_dir().join("ode-buffer-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("save_as.txt");
        let mut b = Buffer::from_text("content");
        b.insert(pos(0, 0), "x");
        assert!(b.is_dirty());
        b.save_as(path.clone()).unwrap();
        assert!(!b.is_dirty());
        assert_eq!(b.path(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "xcontent");
        std::fs::remove_file(&path).ok();
    }
}
