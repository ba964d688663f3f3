// SPDX-License-Identifier: MIT
//
// Cell — the atomic unit of terminal rendering.
//
// Every character position on screen is one Cell: a codepoint, foreground
// and background colors, and an attribute bitfield. The whole rendering
// pipeline exists to produce, diff, and output grids of these.
//
// Wide characters (CJK and friends) occupy two columns. The first cell
// holds the codepoint; the second is a continuation cell (ch = '\0'). The
// renderer skips continuation cells when emitting characters but still
// applies their colors so backgrounds fill correctly.

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR parameters. Combine with bitwise OR:
    /// `Attr::BOLD | Attr::INVERSE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1 — increased intensity.
        const BOLD      = 1 << 0;
        /// SGR 2 — decreased intensity (faint).
        const DIM       = 1 << 1;
        /// SGR 3 — italic or oblique.
        const ITALIC    = 1 << 2;
        /// SGR 4 — underline.
        const UNDERLINE = 1 << 3;
        /// SGR 7 — swap foreground and background.
        const INVERSE   = 1 << 4;
    }
}

/// A terminal color: the terminal's default, one of the 256 indexed
/// colors, or 24-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum CellColor {
    /// The terminal's configured default (SGR 39 / 49).
    #[default]
    Default,
    /// Indexed color 0-255 (SGR 38;5;n / 48;5;n).
    Ansi256(u8),
    /// Truecolor (SGR 38;2;r;g;b / 48;2;r;g;b).
    Rgb(u8, u8, u8),
}

/// A single terminal cell.
///
/// `ch == '\0'` marks a continuation cell: the second column of a wide
/// character. Continuation cells produce no character output of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Codepoint to display. `'\0'` = continuation of a wide character.
    pub ch: char,
    /// Foreground (text) color.
    pub fg: CellColor,
    /// Background color.
    pub bg: CellColor,
    /// Text attributes.
    pub attrs: Attr,
}

impl Cell {
    /// An empty cell: space, default colors, no attributes.
    pub const EMPTY: Self = Self {
        ch: ' ',
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
    };

    /// A cell with a character and default styling.
    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch,
            fg: CellColor::Default,
            bg: CellColor::Default,
            attrs: Attr::empty(),
        }
    }

    /// A fully styled cell.
    #[inline]
    #[must_use]
    pub const fn styled(ch: char, fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self { ch, fg, bg, attrs }
    }

    /// The continuation cell that follows a wide character, carrying the
    /// wide character's colors for correct background fill.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            ch: '\0',
            fg,
            bg,
            attrs,
        }
    }

    /// True for the second column of a wide character.
    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.ch == '\0'
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_is_space() {
        assert_eq!(Cell::EMPTY.ch, ' ');
        assert_eq!(Cell::EMPTY.fg, CellColor::Default);
        assert_eq!(Cell::EMPTY.bg, CellColor::Default);
        assert!(Cell::EMPTY.attrs.is_empty());
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(Cell::default(), Cell::EMPTY);
    }

    #[test]
    fn new_has_default_colors() {
        let c = Cell::new('x');
        assert_eq!(c.ch, 'x');
        assert_eq!(c.fg, CellColor::Default);
    }

    #[test]
    fn styled_keeps_everything() {
        let c = Cell::styled('q', CellColor::Ansi256(4), CellColor::Rgb(1, 2, 3), Attr::BOLD);
        assert_eq!(c.ch, 'q');
        assert_eq!(c.fg, CellColor::Ansi256(4));
        assert_eq!(c.bg, CellColor::Rgb(1, 2, 3));
        assert!(c.attrs.contains(Attr::BOLD));
    }

    #[test]
    fn continuation_marker() {
        let c = Cell::continuation(CellColor::Default, CellColor::Ansi256(7), Attr::empty());
        assert!(c.is_continuation());
        assert!(!Cell::new('a').is_continuation());
    }

    #[test]
    fn attr_combination() {
        let a = Attr::BOLD | Attr::INVERSE;
        assert!(a.contains(Attr::BOLD));
        assert!(a.contains(Attr::INVERSE));
        assert!(!a.contains(Attr::DIM));
    }

    #[test]
    fn color_default_is_default() {
        assert_eq!(CellColor::default(), CellColor::Default);
    }
}
