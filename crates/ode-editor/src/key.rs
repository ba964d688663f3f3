// SPDX-License-Identifier: MIT
//
// Key chords and symbolic key names.
//
// A `KeyChord` is one atomic input event: key identity plus modifier
// state. Chords are the edge labels of the binding trie, so they are
// `Eq + Hash` value types.
//
// Symbolic names are how keymaps are written: `"C-a"`, `"M-x"`,
// `"S-home"`, `"CS-left"`, `"f5"`, `"enter"`, or a literal character.
// Modifier prefixes are a cluster of `C`/`M`/`S` letters before a dash
// (`C-` = Ctrl, `M-` = Alt, `S-` = Shift, combinable as `CS-`, `MS-`,
// `CMS-`). Resolution is a pure function over a static table plus the
// literal-character fallback.

use std::fmt;

use ode_term::input::{KeyCode, KeyEvent, Modifiers};

use crate::error::Error;

/// One atomic input event: key identity + modifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub code: KeyCode,
    pub mods: Modifiers,
}

impl KeyChord {
    /// An unmodified chord.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::empty(),
        }
    }

    /// An unmodified character chord.
    #[inline]
    #[must_use]
    pub const fn ch(ch: char) -> Self {
        Self::plain(KeyCode::Char(ch))
    }

    /// The decimal digit this chord types, if it is a bare `0`-`9`.
    /// Modified digits (e.g. Alt-5) do not count.
    #[must_use]
    pub fn digit(self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if c.is_ascii_digit() && self.mods.is_empty() => Some(c),
            _ => None,
        }
    }

    /// The character this chord carries, `'\0'` for named keys. This is
    /// what a wildcard edge captures.
    #[must_use]
    pub const fn char_value(self) -> char {
        match self.code {
            KeyCode::Char(c) => c,
            _ => '\0',
        }
    }

    /// The text this chord would insert, if any. Enter and Tab map to
    /// their characters; control-modified chords insert nothing.
    #[must_use]
    pub fn insert_text(self) -> Option<char> {
        if self.mods.intersects(Modifiers::CTRL | Modifiers::ALT) {
            return None;
        }
        match self.code {
            KeyCode::Char(c) => Some(c),
            KeyCode::Enter => Some('\n'),
            KeyCode::Tab => Some('\t'),
            _ => None,
        }
    }
}

impl From<KeyEvent> for KeyChord {
    fn from(ev: KeyEvent) -> Self {
        Self {
            code: ev.code,
            mods: ev.mods,
        }
    }
}

impl fmt::Display for KeyChord {
    /// `CMS-` modifier prefix then the key name — the same notation the
    /// symbolic resolver accepts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prefix = String::new();
        if self.mods.contains(Modifiers::CTRL) {
            prefix.push('C');
        }
        if self.mods.contains(Modifiers::ALT) {
            prefix.push('M');
        }
        if self.mods.contains(Modifiers::SHIFT) {
            prefix.push('S');
        }
        if !prefix.is_empty() {
            write!(f, "{prefix}-")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "f{n}"),
            KeyCode::Enter => write!(f, "enter"),
            KeyCode::Tab => write!(f, "tab"),
            KeyCode::Backspace => write!(f, "backspace"),
            KeyCode::Escape => write!(f, "escape"),
            KeyCode::Delete => write!(f, "delete"),
            KeyCode::Insert => write!(f, "insert"),
            KeyCode::Up => write!(f, "up"),
            KeyCode::Down => write!(f, "down"),
            KeyCode::Left => write!(f, "left"),
            KeyCode::Right => write!(f, "right"),
            KeyCode::Home => write!(f, "home"),
            KeyCode::End => write!(f, "end"),
            KeyCode::PageUp => write!(f, "page-up"),
            KeyCode::PageDown => write!(f, "page-down"),
        }
    }
}

impl fmt::Debug for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyChord({self})")
    }
}

// ---------------------------------------------------------------------------
// Symbolic resolution
// ---------------------------------------------------------------------------

/// Named keys. Function keys are handled separately so `f1`..`f12` need
/// no table rows.
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("enter", KeyCode::Enter),
    ("tab", KeyCode::Tab),
    ("space", KeyCode::Char(' ')),
    ("backspace", KeyCode::Backspace),
    ("escape", KeyCode::Escape),
    ("esc", KeyCode::Escape),
    ("delete", KeyCode::Delete),
    ("insert", KeyCode::Insert),
    ("up", KeyCode::Up),
    ("down", KeyCode::Down),
    ("left", KeyCode::Left),
    ("right", KeyCode::Right),
    ("home", KeyCode::Home),
    ("end", KeyCode::End),
    ("page-up", KeyCode::PageUp),
    ("page-down", KeyCode::PageDown),
];

/// Resolve a symbolic key name to a chord.
///
/// Grammar: `[CMS]+ '-'` modifier prefix, then a named key (case
/// insensitive), `fN` function key, or a literal character (taken
/// verbatim, case sensitive).
///
/// # Errors
///
/// [`Error::UnknownKey`] when the name is empty or resolves to nothing.
pub fn resolve_symbolic_key(name: &str) -> Result<KeyChord, Error> {
    if name.is_empty() {
        return Err(Error::UnknownKey(name.to_string()));
    }

    // Split off a modifier cluster: letters from {C, M, S} followed by a
    // dash, with at least one character remaining ("M--" is Alt+dash).
    let (mods, rest) = split_modifiers(name);
    if rest.is_empty() {
        return Err(Error::UnknownKey(name.to_string()));
    }

    // Named key (case-insensitive).
    let lower = rest.to_ascii_lowercase();
    for &(key_name, code) in NAMED_KEYS {
        if lower == key_name {
            return Ok(KeyChord { code, mods });
        }
    }

    // Function keys f1..f12.
    if let Some(num) = lower.strip_prefix('f') {
        if let Ok(n) = num.parse::<u8>() {
            if (1..=12).contains(&n) {
                return Ok(KeyChord {
                    code: KeyCode::F(n),
                    mods,
                });
            }
        }
    }

    // Literal character fallback: exactly one Unicode scalar.
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(KeyChord {
            code: KeyCode::Char(c),
            mods,
        }),
        _ => Err(Error::UnknownKey(name.to_string())),
    }
}

/// Split `"CS-left"` into `(CTRL|SHIFT, "left")`. Names without a valid
/// prefix come back unchanged with empty modifiers.
fn split_modifiers(name: &str) -> (Modifiers, &str) {
    let bytes = name.as_bytes();
    let mut i = 0;
    let mut mods = Modifiers::empty();
    while i < bytes.len() {
        match bytes[i] {
            b'C' => mods |= Modifiers::CTRL,
            b'M' => mods |= Modifiers::ALT,
            b'S' => mods |= Modifiers::SHIFT,
            _ => break,
        }
        i += 1;
    }
    // Valid prefix: at least one modifier letter, a dash, and a nonempty
    // remainder.
    if i > 0 && i < bytes.len() && bytes[i] == b'-' && i + 1 < bytes.len() {
        (mods, &name[i + 1..])
    } else {
        (Modifiers::empty(), name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
