// SPDX-License-Identifier: MIT
//
// ANSI escape sequence writers.
//
// Small, direct functions that write escape sequences to any `Write`.
// Everything here is standard ECMA-48 / xterm: cursor movement, SGR
// styling, alternate screen, mouse tracking, bracketed paste, cursor
// shapes (DECSCUSR).

use std::io::{self, Write};

use crate::cell::{Attr, CellColor};

// ─── Cursor ─────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` — 0-indexed; the wire format is 1-indexed.
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// Hide the cursor.
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor.
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Cursor shape via DECSCUSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    /// Terminal default (usually a blinking block).
    Default,
    /// Steady block.
    Block,
    /// Steady underline.
    Underline,
    /// Steady bar.
    Bar,
}

/// Set the cursor shape.
pub fn set_cursor_shape(w: &mut impl Write, shape: CursorShape) -> io::Result<()> {
    let n = match shape {
        CursorShape::Default => 0,
        CursorShape::Block => 2,
        CursorShape::Underline => 4,
        CursorShape::Bar => 6,
    };
    write!(w, "\x1b[{n} q")
}

// ─── Screen ─────────────────────────────────────────────────────────────────

/// Clear the whole screen.
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Switch to the alternate screen buffer.
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Return to the main screen buffer.
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Styling ────────────────────────────────────────────────────────────────

/// Reset all SGR attributes.
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Set the foreground color.
pub fn fg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[39m"),
        CellColor::Ansi256(n) => write!(w, "\x1b[38;5;{n}m"),
        CellColor::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// Set the background color.
pub fn bg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[49m"),
        CellColor::Ansi256(n) => write!(w, "\x1b[48;5;{n}m"),
        CellColor::Rgb(r, g, b) => write!(w, "\x1b[48;2;{r};{g};{b}m"),
    }
}

/// Reset attributes, then enable the given set.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    w.write_all(b"\x1b[0m")?;
    if attr.contains(Attr::BOLD) {
        w.write_all(b"\x1b[1m")?;
    }
    if attr.contains(Attr::DIM) {
        w.write_all(b"\x1b[2m")?;
    }
    if attr.contains(Attr::ITALIC) {
        w.write_all(b"\x1b[3m")?;
    }
    if attr.contains(Attr::UNDERLINE) {
        w.write_all(b"\x1b[4m")?;
    }
    if attr.contains(Attr::INVERSE) {
        w.write_all(b"\x1b[7m")?;
    }
    Ok(())
}

// ─── Terminal features ──────────────────────────────────────────────────────

/// Enable SGR mouse reporting (click + drag).
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h\x1b[?1002h\x1b[?1006h")
}

/// Disable all mouse reporting.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1002l\x1b[?1000l")
}

/// Enable bracketed paste.
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

/// Disable bracketed paste.
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn cursor_to_is_one_indexed() {
        assert_eq!(collect(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(collect(|w| cursor_to(w, 5, 2)), "\x1b[3;6H");
    }

    #[test]
    fn fg_default() {
        assert_eq!(collect(|w| fg(w, CellColor::Default)), "\x1b[39m");
    }

    #[test]
    fn fg_indexed() {
        assert_eq!(collect(|w| fg(w, CellColor::Ansi256(4))), "\x1b[38;5;4m");
    }

    #[test]
    fn bg_rgb() {
        assert_eq!(
            collect(|w| bg(w, CellColor::Rgb(1, 2, 3))),
            "\x1b[48;2;1;2;3m"
        );
    }

    #[test]
    fn attrs_resets_first() {
        let out = collect(|w| attrs(w, Attr::BOLD | Attr::INVERSE));
        assert!(out.starts_with("\x1b[0m"));
        assert!(out.contains("\x1b[1m"));
        assert!(out.contains("\x1b[7m"));
    }

    #[test]
    fn attrs_empty_only_resets() {
        assert_eq!(collect(|w| attrs(w, Attr::empty())), "\x1b[0m");
    }

    #[test]
    fn cursor_shapes() {
        assert_eq!(
            collect(|w| set_cursor_shape(w, CursorShape::Bar)),
            "\x1b[6 q"
        );
        assert_eq!(
            collect(|w| set_cursor_shape(w, CursorShape::Default)),
            "\x1b[0 q"
        );
    }

    #[test]
    fn alt_screen_sequences() {
        assert_eq!(collect(enter_alt_screen), "\x1b[?1049h");
        assert_eq!(collect(exit_alt_screen), "\x1b[?1049l");
    }
}
