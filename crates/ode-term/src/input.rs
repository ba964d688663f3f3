// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw stdin bytes into structured events: keys and mouse actions.
// Handled protocols:
//
// - Legacy CSI sequences (arrows, function keys, editing keys)
// - SS3 sequences (F1-F4 alternate encoding)
// - SGR mouse (press / release / drag / scroll)
// - Bracketed paste (content is delivered as ordinary key events, so the
//   editor's paste coalescing sees the same stream a fast typist produces)
// - Alt+key (ESC followed by a printable)
// - Ctrl bytes and UTF-8 multi-byte characters
//
// The parser keeps a small byte buffer because escape sequences can span
// multiple reads. Feed bytes with [`Parser::advance`]; after a timeout
// with no new bytes, call [`Parser::flush`] to emit a pending lone ESC as
// a real Escape keypress.

use bitflags::bitflags;

// ─── Event types ────────────────────────────────────────────────────────────

/// A parsed terminal input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
}

/// A keyboard event: key identity plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: Modifiers,
}

impl KeyEvent {
    /// A plain (unmodified) key.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::empty(),
        }
    }
}

/// Identity of a key. Printables use [`Char`](KeyCode::Char); named keys
/// have dedicated variants; function keys F1-F12 use [`F`](KeyCode::F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags, matching the xterm CSI modifier encoding
    /// (`param = 1 + bitmask`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

/// A mouse event with position and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    /// 0-indexed column.
    pub x: u16,
    /// 0-indexed row.
    pub y: u16,
    pub mods: Modifiers,
}

/// Mouse event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press(MouseButton),
    Release(MouseButton),
    Drag(MouseButton),
    ScrollUp,
    ScrollDown,
}

/// Mouse button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Bracketed paste delimiters: `CSI 200~` / `CSI 201~`.
const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

/// Terminal input parser. Feed raw bytes via [`advance`](Parser::advance)
/// and collect structured [`Event`]s; buffered partial sequences resume
/// when more bytes arrive.
pub struct Parser {
    buf: Vec<u8>,
    /// Inside a bracketed paste: content bytes become plain key events
    /// until the closing delimiter.
    in_paste: bool,
}

impl Parser {
    /// A parser with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
            in_paste: false,
        }
    }

    /// Feed bytes from stdin and return all events that parse completely.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            let remaining = &self.buf[pos..];

            // Paste delimiters are matched before general CSI parsing.
            if self.in_paste {
                if remaining.len() >= PASTE_END.len() && remaining.starts_with(PASTE_END) {
                    self.in_paste = false;
                    pos += PASTE_END.len();
                    continue;
                }
                if remaining[0] == 0x1b {
                    if PASTE_END.starts_with(remaining) {
                        break; // partial closing delimiter
                    }
                    // Stray ESC inside a paste: drop it.
                    pos += 1;
                    continue;
                }
                match paste_byte(remaining) {
                    Parsed::Event(ev, n) => {
                        events.push(ev);
                        pos += n;
                    }
                    Parsed::Incomplete => break,
                    Parsed::Skip(n) => pos += n,
                }
                continue;
            }

            if remaining.len() >= PASTE_START.len() && remaining.starts_with(PASTE_START) {
                self.in_paste = true;
                pos += PASTE_START.len();
                continue;
            }
            if remaining.len() < PASTE_START.len()
                && PASTE_START.starts_with(remaining)
                && remaining.starts_with(b"\x1b[")
            {
                break; // could still become the paste opener
            }

            match try_parse(remaining) {
                Parsed::Event(event, consumed) => {
                    events.push(event);
                    pos += consumed;
                }
                Parsed::Incomplete => break,
                Parsed::Skip(n) => pos += n,
            }
        }

        if pos > 0 {
            self.buf.drain(..pos);
        }
        events
    }

    /// Unconsumed bytes that might complete with more data?
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Flush pending bytes as literal key events. Called after a timeout
    /// to resolve the lone-ESC ambiguity.
    pub fn flush(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for &byte in &self.buf {
            let (code, mods) = match byte {
                0x1b => (KeyCode::Escape, Modifiers::empty()),
                0x00 => (KeyCode::Char('@'), Modifiers::CTRL),
                b @ 0x01..=0x1a => (KeyCode::Char((b + b'a' - 1) as char), Modifiers::CTRL),
                0x7f => (KeyCode::Backspace, Modifiers::empty()),
                b @ 0x20..=0x7e => (KeyCode::Char(b as char), Modifiers::empty()),
                _ => continue,
            };
            events.push(Event::Key(KeyEvent { code, mods }));
        }
        self.buf.clear();
        events
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Stateless parsing functions ────────────────────────────────────────────

enum Parsed {
    /// Parsed an event, consuming N bytes.
    Event(Event, usize),
    /// Need more bytes.
    Incomplete,
    /// Unrecognized, skip N bytes.
    Skip(usize),
}

fn press(code: KeyCode) -> Event {
    Event::Key(KeyEvent::plain(code))
}

fn ctrl_key(code: KeyCode) -> Event {
    Event::Key(KeyEvent {
        code,
        mods: Modifiers::CTRL,
    })
}

/// One byte of bracketed-paste content as a key event.
fn paste_byte(buf: &[u8]) -> Parsed {
    match buf[0] {
        0x0a | 0x0d => Parsed::Event(press(KeyCode::Enter), 1),
        0x09 => Parsed::Event(press(KeyCode::Tab), 1),
        b @ 0x20..=0x7e => Parsed::Event(press(KeyCode::Char(b as char)), 1),
        0xc0..=0xff => parse_utf8(buf),
        _ => Parsed::Skip(1),
    }
}

/// Parse one event from the head of `buf`.
fn try_parse(buf: &[u8]) -> Parsed {
    match buf[0] {
        0x1b => parse_escape(buf),
        0x00 => Parsed::Event(ctrl_key(KeyCode::Char('@')), 1),
        b @ (0x01..=0x07 | 0x0b..=0x0c | 0x0e..=0x1a) => {
            Parsed::Event(ctrl_key(KeyCode::Char((b + b'a' - 1) as char)), 1)
        }
        // 0x1c-0x1f: Ctrl with backslash, bracket, caret, slash.
        0x1c => Parsed::Event(ctrl_key(KeyCode::Char('\\')), 1),
        0x1d => Parsed::Event(ctrl_key(KeyCode::Char(']')), 1),
        0x1e => Parsed::Event(ctrl_key(KeyCode::Char('^')), 1),
        0x1f => Parsed::Event(ctrl_key(KeyCode::Char('/')), 1),
        0x08 | 0x7f => Parsed::Event(press(KeyCode::Backspace), 1),
        0x09 => Parsed::Event(press(KeyCode::Tab), 1),
        0x0a | 0x0d => Parsed::Event(press(KeyCode::Enter), 1),
        b @ 0x20..=0x7e => Parsed::Event(press(KeyCode::Char(b as char)), 1),
        0xc0..=0xff => parse_utf8(buf),
        // Bare continuation byte — invalid lead, skip.
        _ => Parsed::Skip(1),
    }
}

fn parse_escape(buf: &[u8]) -> Parsed {
    debug_assert_eq!(buf[0], 0x1b);
    if buf.len() < 2 {
        return Parsed::Incomplete;
    }
    match buf[1] {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        0x1b => Parsed::Event(
            Event::Key(KeyEvent {
                code: KeyCode::Escape,
                mods: Modifiers::ALT,
            }),
            2,
        ),
        b @ 0x20..=0x7e => Parsed::Event(
            Event::Key(KeyEvent {
                code: KeyCode::Char(b as char),
                mods: Modifiers::ALT,
            }),
            2,
        ),
        // Alt + control byte (e.g. Alt+Enter). Decode the inner byte.
        b @ (0x01..=0x1a) => {
            let code = match b {
                0x09 => KeyCode::Tab,
                0x0a | 0x0d => KeyCode::Enter,
                0x08 => KeyCode::Backspace,
                n => KeyCode::Char((n + b'a' - 1) as char),
            };
            let mods = match b {
                0x08..=0x0a | 0x0d => Modifiers::ALT,
                _ => Modifiers::ALT | Modifiers::CTRL,
            };
            Parsed::Event(Event::Key(KeyEvent { code, mods }), 2)
        }
        0x7f => Parsed::Event(
            Event::Key(KeyEvent {
                code: KeyCode::Backspace,
                mods: Modifiers::ALT,
            }),
            2,
        ),
        _ => Parsed::Skip(2),
    }
}

/// Decode an xterm modifier parameter (`1 + bitmask`).
fn decode_mods(param: u16) -> Modifiers {
    let bits = param.saturating_sub(1);
    Modifiers::from_bits_truncate(u8::try_from(bits & 0b111).unwrap_or(0))
}

/// CSI: `ESC [ params final`.
fn parse_csi(buf: &[u8]) -> Parsed {
    // Collect parameter bytes until a final byte (0x40-0x7e).
    let mut i = 2;
    while i < buf.len() {
        let b = buf[i];
        if (0x40..=0x7e).contains(&b) {
            break;
        }
        if !b.is_ascii_digit() && b != b';' && b != b'<' {
            return Parsed::Skip(i + 1);
        }
        i += 1;
    }
    if i >= buf.len() {
        return Parsed::Incomplete;
    }

    let final_byte = buf[i];
    let consumed = i + 1;
    let param_bytes = &buf[2..i];

    // SGR mouse: CSI < btn ; x ; y (M|m)
    if param_bytes.first() == Some(&b'<') {
        return parse_sgr_mouse(&param_bytes[1..], final_byte, consumed);
    }

    let params = split_params(param_bytes);
    let mods = decode_mods(params.get(1).copied().unwrap_or(1));

    let code = match final_byte {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        b'Z' => {
            // Back-tab: Shift+Tab.
            return Parsed::Event(
                Event::Key(KeyEvent {
                    code: KeyCode::Tab,
                    mods: Modifiers::SHIFT,
                }),
                consumed,
            );
        }
        b'~' => {
            let code = match params.first().copied().unwrap_or(0) {
                1 | 7 => Some(KeyCode::Home),
                2 => Some(KeyCode::Insert),
                3 => Some(KeyCode::Delete),
                4 | 8 => Some(KeyCode::End),
                5 => Some(KeyCode::PageUp),
                6 => Some(KeyCode::PageDown),
                11..=15 => Some(KeyCode::F(u8::try_from(params[0] - 10).unwrap_or(1))),
                17..=21 => Some(KeyCode::F(u8::try_from(params[0] - 11).unwrap_or(6))),
                23 => Some(KeyCode::F(11)),
                24 => Some(KeyCode::F(12)),
                _ => None,
            };
            return match code {
                Some(code) => Parsed::Event(Event::Key(KeyEvent { code, mods }), consumed),
                None => Parsed::Skip(consumed),
            };
        }
        _ => None,
    };

    match code {
        Some(code) => Parsed::Event(Event::Key(KeyEvent { code, mods }), consumed),
        None => Parsed::Skip(consumed),
    }
}

/// SS3: `ESC O final` — F1-F4 and application-mode arrows.
fn parse_ss3(buf: &[u8]) -> Parsed {
    if buf.len() < 3 {
        return Parsed::Incomplete;
    }
    let code = match buf[2] {
        b'P' => Some(KeyCode::F(1)),
        b'Q' => Some(KeyCode::F(2)),
        b'R' => Some(KeyCode::F(3)),
        b'S' => Some(KeyCode::F(4)),
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        _ => None,
    };
    match code {
        Some(code) => Parsed::Event(press(code), 3),
        None => Parsed::Skip(3),
    }
}

fn parse_sgr_mouse(params: &[u8], final_byte: u8, consumed: usize) -> Parsed {
    let fields = split_params(params);
    if fields.len() < 3 || (final_byte != b'M' && final_byte != b'm') {
        return Parsed::Skip(consumed);
    }
    let btn = fields[0];
    let x = fields[1].saturating_sub(1);
    let y = fields[2].saturating_sub(1);

    let mods = {
        let mut m = Modifiers::empty();
        if btn & 4 != 0 {
            m |= Modifiers::SHIFT;
        }
        if btn & 8 != 0 {
            m |= Modifiers::ALT;
        }
        if btn & 16 != 0 {
            m |= Modifiers::CTRL;
        }
        m
    };

    let kind = if btn & 64 != 0 {
        if btn & 1 == 0 {
            MouseEventKind::ScrollUp
        } else {
            MouseEventKind::ScrollDown
        }
    } else {
        let button = match btn & 3 {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => return Parsed::Skip(consumed),
        };
        if final_byte == b'm' {
            MouseEventKind::Release(button)
        } else if btn & 32 != 0 {
            MouseEventKind::Drag(button)
        } else {
            MouseEventKind::Press(button)
        }
    };

    Parsed::Event(Event::Mouse(MouseEvent { kind, x, y, mods }), consumed)
}

/// Split `;`-separated decimal parameters. Missing fields read as 0;
/// non-digit bytes are ignored.
fn split_params(bytes: &[u8]) -> Vec<u16> {
    bytes
        .split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .filter(|b| b.is_ascii_digit())
                .fold(0u16, |acc, &b| {
                    acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                })
        })
        .collect()
}

/// Decode one UTF-8 scalar from the head of `buf`.
fn parse_utf8(buf: &[u8]) -> Parsed {
    let len = match buf[0] {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Parsed::Skip(1),
    };
    if buf.len() < len {
        return Parsed::Incomplete;
    }
    match std::str::from_utf8(&buf[..len]) {
        Ok(s) => {
            let ch = s.chars().next().unwrap_or('\u{fffd}');
            Parsed::Event(press(KeyCode::Char(ch)), len)
        }
        Err(_) => Parsed::Skip(1),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::plain(code))
    }

    fn keym(code: KeyCode, mods: Modifiers) -> Event {
        Event::Key(KeyEvent { code, mods })
    }

    #[test]
    fn printable_ascii() {
        let mut p = Parser::new();
        assert_eq!(p.advance(b"ab"), vec![key(KeyCode::Char('a')), key(KeyCode::Char('b'))]);
    }

    #[test]
    fn ctrl_bytes() {
        let mut p = Parser::new();
        assert_eq!(
            p.advance(&[0x01]),
            vec![keym(KeyCode::Char('a'), Modifiers::CTRL)]
        );
        assert_eq!(
            p.advance(&[0x18]),
            vec![keym(KeyCode::Char('x'), Modifiers::CTRL)]
        );
    }

    #[test]
    fn ctrl_at_from_nul() {
        let mut p = Parser::new();
        assert_eq!(
            p.advance(&[0x00]),
            vec![keym(KeyCode::Char('@'), Modifiers::CTRL)]
        );
    }

    #[test]
    fn enter_tab_backspace() {
        let mut p = Parser::new();
        assert_eq!(
            p.advance(&[0x0d, 0x09, 0x7f]),
            vec![key(KeyCode::Enter), key(KeyCode::Tab), key(KeyCode::Backspace)]
        );
    }

    #[test]
    fn arrow_keys() {
        let mut p = Parser::new();
        assert_eq!(p.advance(b"\x1b[A"), vec![key(KeyCode::Up)]);
        assert_eq!(p.advance(b"\x1b[B"), vec![key(KeyCode::Down)]);
        assert_eq!(p.advance(b"\x1b[C"), vec![key(KeyCode::Right)]);
        assert_eq!(p.advance(b"\x1b[D"), vec![key(KeyCode::Left)]);
    }

    #[test]
    fn modified_arrows() {
        let mut p = Parser::new();
        // CSI 1;2A = Shift+Up, 1;5C = Ctrl+Right, 1;6D = Ctrl+Shift+Left.
        assert_eq!(
            p.advance(b"\x1b[1;2A"),
            vec![keym(KeyCode::Up, Modifiers::SHIFT)]
        );
        assert_eq!(
            p.advance(b"\x1b[1;5C"),
            vec![keym(KeyCode::Right, Modifiers::CTRL)]
        );
        assert_eq!(
            p.advance(b"\x1b[1;6D"),
            vec![keym(KeyCode::Left, Modifiers::CTRL | Modifiers::SHIFT)]
        );
    }

    #[test]
    fn tilde_keys() {
        let mut p = Parser::new();
        assert_eq!(p.advance(b"\x1b[3~"), vec![key(KeyCode::Delete)]);
        assert_eq!(p.advance(b"\x1b[5~"), vec![key(KeyCode::PageUp)]);
        assert_eq!(p.advance(b"\x1b[6~"), vec![key(KeyCode::PageDown)]);
        assert_eq!(p.advance(b"\x1b[15~"), vec![key(KeyCode::F(5))]);
        assert_eq!(p.advance(b"\x1b[24~"), vec![key(KeyCode::F(12))]);
    }

    #[test]
    fn ss3_function_keys() {
        let mut p = Parser::new();
        assert_eq!(p.advance(b"\x1bOP"), vec![key(KeyCode::F(1))]);
        assert_eq!(p.advance(b"\x1bOS"), vec![key(KeyCode::F(4))]);
    }

    #[test]
    fn alt_char() {
        let mut p = Parser::new();
        assert_eq!(
            p.advance(b"\x1bx"),
            vec![keym(KeyCode::Char('x'), Modifiers::ALT)]
        );
    }

    #[test]
    fn back_tab() {
        let mut p = Parser::new();
        assert_eq!(
            p.advance(b"\x1b[Z"),
            vec![keym(KeyCode::Tab, Modifiers::SHIFT)]
        );
    }

    #[test]
    fn utf8_multibyte() {
        let mut p = Parser::new();
        assert_eq!(p.advance("é".as_bytes()), vec![key(KeyCode::Char('é'))]);
        assert_eq!(p.advance("中".as_bytes()), vec![key(KeyCode::Char('中'))]);
    }

    #[test]
    fn utf8_split_across_reads() {
        let mut p = Parser::new();
        let bytes = "中".as_bytes();
        assert!(p.advance(&bytes[..1]).is_empty());
        assert!(p.has_pending());
        assert_eq!(p.advance(&bytes[1..]), vec![key(KeyCode::Char('中'))]);
    }

    #[test]
    fn lone_esc_flushes_to_escape() {
        let mut p = Parser::new();
        assert!(p.advance(&[0x1b]).is_empty());
        assert!(p.has_pending());
        assert_eq!(p.flush(), vec![key(KeyCode::Escape)]);
        assert!(!p.has_pending());
    }

    #[test]
    fn csi_split_across_reads() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[").is_empty());
        assert_eq!(p.advance(b"A"), vec![key(KeyCode::Up)]);
    }

    #[test]
    fn bracketed_paste_becomes_key_events() {
        let mut p = Parser::new();
        let events = p.advance(b"\x1b[200~hi\nyo\x1b[201~");
        assert_eq!(
            events,
            vec![
                key(KeyCode::Char('h')),
                key(KeyCode::Char('i')),
                key(KeyCode::Enter),
                key(KeyCode::Char('y')),
                key(KeyCode::Char('o')),
            ]
        );
        assert!(!p.has_pending());
    }

    #[test]
    fn paste_split_across_reads() {
        let mut p = Parser::new();
        let mut events = p.advance(b"\x1b[200~ab");
        events.extend(p.advance(b"c\x1b[201~d"));
        assert_eq!(
            events,
            vec![
                key(KeyCode::Char('a')),
                key(KeyCode::Char('b')),
                key(KeyCode::Char('c')),
                key(KeyCode::Char('d')),
            ]
        );
    }

    #[test]
    fn sgr_mouse_press_release() {
        let mut p = Parser::new();
        let events = p.advance(b"\x1b[<0;10;5M\x1b[<0;10;5m");
        assert_eq!(events.len(), 2);
        match events[0] {
            Event::Mouse(m) => {
                assert_eq!(m.kind, MouseEventKind::Press(MouseButton::Left));
                assert_eq!((m.x, m.y), (9, 4));
            }
            Event::Key(_) => panic!("expected mouse event"),
        }
        match events[1] {
            Event::Mouse(m) => assert_eq!(m.kind, MouseEventKind::Release(MouseButton::Left)),
            Event::Key(_) => panic!("expected mouse event"),
        }
    }

    #[test]
    fn sgr_mouse_scroll() {
        let mut p = Parser::new();
        let events = p.advance(b"\x1b[<64;1;1M\x1b[<65;1;1M");
        match (events[0], events[1]) {
            (Event::Mouse(a), Event::Mouse(b)) => {
                assert_eq!(a.kind, MouseEventKind::ScrollUp);
                assert_eq!(b.kind, MouseEventKind::ScrollDown);
            }
            _ => panic!("expected mouse events"),
        }
    }

    #[test]
    fn unknown_csi_skipped() {
        let mut p = Parser::new();
        let events = p.advance(b"\x1b[99Xa");
        assert_eq!(events, vec![key(KeyCode::Char('a'))]);
    }
}
