// SPDX-License-Identifier: MIT
//
// Differential renderer — emits only the cells that changed.
//
// Keeps a copy of the last frame sent to the terminal. On each render,
// compares the new frame cell by cell and appends ANSI output for the
// differences to an internal byte buffer, minimizing both cursor moves
// (consecutive changed cells need no repositioning) and SGR churn (style
// sequences are emitted only when fg/bg/attrs differ from the previous
// emitted cell).
//
// A resize or an explicit `force_redraw` invalidates the previous frame
// and the next render repaints everything.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::{Attr, Cell, CellColor};
use crate::frame::Frame;

/// Counters from one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Cells that differed and were emitted.
    pub cells_written: usize,
    /// Bytes appended to the output buffer.
    pub bytes_emitted: usize,
}

/// The differential renderer. Call [`render`](Self::render) with each
/// finished frame, then [`flush`](Self::flush) to push the bytes out.
pub struct DiffRenderer {
    /// Last frame emitted to the terminal. `None` forces a full repaint.
    previous: Option<Frame>,
    /// Pending output bytes.
    out: Vec<u8>,
    /// Style state of the last emitted cell, to skip redundant SGR.
    last_style: Option<(CellColor, CellColor, Attr)>,
}

impl DiffRenderer {
    /// A renderer with no previous frame (first render paints all).
    #[must_use]
    pub fn new() -> Self {
        Self {
            previous: None,
            out: Vec::with_capacity(16 * 1024),
            last_style: None,
        }
    }

    /// Drop the previous frame so the next render repaints everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    /// Diff `current` against the previous frame and queue the output.
    pub fn render(&mut self, current: &Frame) -> RenderStats {
        let start_len = self.out.len();
        let mut cells_written = 0;

        let full = match &self.previous {
            Some(prev) => prev.width() != current.width() || prev.height() != current.height(),
            None => true,
        };
        if full {
            let _ = ansi::clear_screen(&mut self.out);
            self.last_style = None;
        }

        // Position of the terminal cursor after the last emitted cell, so
        // runs of changes on one row skip the cursor_to.
        let mut hw_cursor: Option<(u16, u16)> = None;

        for y in 0..current.height() {
            for x in 0..current.width() {
                let cell = *current.get(x, y).unwrap_or(&Cell::EMPTY);
                if !full {
                    if let Some(prev) = &self.previous {
                        if prev.get(x, y) == Some(&cell) {
                            continue;
                        }
                    }
                }

                if hw_cursor != Some((x, y)) {
                    let _ = ansi::cursor_to(&mut self.out, x, y);
                }
                self.emit_cell(&cell);
                cells_written += 1;
                // Continuation cells emit no glyph, so the terminal cursor
                // only advanced for real characters.
                hw_cursor = if cell.is_continuation() {
                    None
                } else {
                    Some((x + 1, y))
                };
            }
        }

        self.previous = Some(current.clone());
        RenderStats {
            cells_written,
            bytes_emitted: self.out.len() - start_len,
        }
    }

    fn emit_cell(&mut self, cell: &Cell) {
        let style = (cell.fg, cell.bg, cell.attrs);
        if self.last_style != Some(style) {
            let _ = ansi::attrs(&mut self.out, cell.attrs);
            let _ = ansi::fg(&mut self.out, cell.fg);
            let _ = ansi::bg(&mut self.out, cell.bg);
            self.last_style = Some(style);
        }
        if !cell.is_continuation() {
            let mut utf8 = [0u8; 4];
            self.out
                .extend_from_slice(cell.ch.encode_utf8(&mut utf8).as_bytes());
        }
    }

    /// Queued output bytes (for tests).
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Write queued output to stdout and clear the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn flush(&mut self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        lock.write_all(&self.out)?;
        lock.flush()?;
        self.out.clear();
        Ok(())
    }

    /// Write queued output to an arbitrary writer and clear the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.out)?;
        self.out.clear();
        Ok(())
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_render_paints_everything() {
        let mut r = DiffRenderer::new();
        let f = Frame::new(3, 2);
        let stats = r.render(&f);
        assert_eq!(stats.cells_written, 6);
        assert!(stats.bytes_emitted > 0);
    }

    #[test]
    fn identical_frame_emits_nothing() {
        let mut r = DiffRenderer::new();
        let f = Frame::new(3, 2);
        r.render(&f);
        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();

        let stats = r.render(&f);
        assert_eq!(stats.cells_written, 0);
        assert_eq!(stats.bytes_emitted, 0);
    }

    #[test]
    fn single_cell_change_is_minimal() {
        let mut r = DiffRenderer::new();
        let mut f = Frame::new(4, 2);
        r.render(&f);
        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();

        f.set(2, 1, Cell::new('x'));
        let stats = r.render(&f);
        assert_eq!(stats.cells_written, 1);

        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("\x1b[2;3H"), "positions at the changed cell: {s:?}");
        assert!(s.ends_with('x'));
    }

    #[test]
    fn resize_forces_full_repaint() {
        let mut r = DiffRenderer::new();
        let f = Frame::new(3, 1);
        r.render(&f);
        let big = Frame::new(4, 2);
        let stats = r.render(&big);
        assert_eq!(stats.cells_written, 8);
    }

    #[test]
    fn force_redraw_repaints() {
        let mut r = DiffRenderer::new();
        let f = Frame::new(2, 2);
        r.render(&f);
        r.force_redraw();
        let stats = r.render(&f);
        assert_eq!(stats.cells_written, 4);
    }

    #[test]
    fn style_change_emits_sgr() {
        let mut r = DiffRenderer::new();
        let mut f = Frame::new(2, 1);
        r.render(&f);
        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();

        f.set(0, 0, Cell::styled('a', CellColor::Ansi256(1), CellColor::Default, Attr::BOLD));
        r.render(&f);
        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("\x1b[1m"), "bold SGR expected: {s:?}");
        assert!(s.contains("\x1b[38;5;1m"), "fg SGR expected: {s:?}");
    }

    #[test]
    fn continuation_cells_emit_no_glyph() {
        let mut r = DiffRenderer::new();
        let mut f = Frame::new(3, 1);
        f.print(
            0,
            0,
            "中",
            CellColor::Default,
            CellColor::Default,
            Attr::empty(),
        );
        r.render(&f);
        let mut out = Vec::new();
        r.flush_to(&mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s.matches('中').count(), 1);
    }
}
