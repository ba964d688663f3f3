// SPDX-License-Identifier: MIT
//
// Input sources — where the dispatch loop gets its chords.
//
// The loop reads from an `InputSource`: the terminal in normal use, a
// scripted chord list in tests and headless runs. Macro playback is NOT
// a source — it is layered above this seam inside the editor, so a
// recorded macro replays through dispatch identically from any source.
//
// Peek semantics: `peek` is non-blocking and non-consuming; the paste
// coalescer peeks, decides, and either `consume_peeked`s the chord into
// the batch or leaves it queued for the next regular read. An event a
// peek refuses is therefore replayed as the next normal input with no
// extra bookkeeping.

use ode_term::events::{EventSource, TermEvent};
use ode_term::input::Event;

use crate::key::KeyChord;

/// One read from an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    /// A key chord.
    Chord(KeyChord),
    /// The terminal was resized to `cols × rows`.
    Resize(u16, u16),
    /// The source is exhausted; no more input will arrive.
    Eof,
}

/// A blocking chord source with non-blocking peek.
pub trait InputSource {
    /// Block for the next event.
    fn next(&mut self) -> SourceEvent;
    /// Non-blocking, non-consuming look at the next chord. `None` when
    /// nothing is buffered or the next event is not a chord.
    fn peek(&mut self) -> Option<KeyChord>;
    /// Consume the chord last returned by [`peek`](Self::peek).
    fn consume_peeked(&mut self);
}

// ---------------------------------------------------------------------------
// Terminal source
// ---------------------------------------------------------------------------

/// Live terminal input via `ode-term`. Mouse events are dropped here —
/// the core binds no mouse commands.
pub struct TermSource {
    events: EventSource,
}

impl TermSource {
    #[must_use]
    pub fn new(events: EventSource) -> Self {
        Self { events }
    }
}

impl InputSource for TermSource {
    fn next(&mut self) -> SourceEvent {
        loop {
            match self.events.poll() {
                TermEvent::Input(Event::Key(key)) => return SourceEvent::Chord(key.into()),
                TermEvent::Input(Event::Mouse(m)) => {
                    log::trace!("dropping mouse event at {},{}", m.x, m.y);
                }
                TermEvent::Resize(size) => return SourceEvent::Resize(size.cols, size.rows),
                TermEvent::Eof => return SourceEvent::Eof,
            }
        }
    }

    fn peek(&mut self) -> Option<KeyChord> {
        match self.events.peek() {
            Some(Event::Key(key)) => Some((*key).into()),
            _ => None,
        }
    }

    fn consume_peeked(&mut self) {
        self.events.consume_peeked();
    }
}

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

/// A fixed chord sequence: headless runs and tests. Exhausts to `Eof`.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    chords: Vec<KeyChord>,
    index: usize,
}

impl ScriptedSource {
    /// A source that will deliver `chords` in order, then EOF.
    #[must_use]
    pub fn new(chords: Vec<KeyChord>) -> Self {
        Self { chords, index: 0 }
    }

    /// Build from a plain string, one chord per char.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::new(text.chars().map(KeyChord::ch).collect())
    }

    /// Append more chords (used by tests that feed in stages).
    pub fn push(&mut self, chord: KeyChord) {
        self.chords.push(chord);
    }
}

impl InputSource for ScriptedSource {
    fn next(&mut self) -> SourceEvent {
        match self.chords.get(self.index).copied() {
            Some(chord) => {
                self.index += 1;
                SourceEvent::Chord(chord)
            }
            None => SourceEvent::Eof,
        }
    }

    fn peek(&mut self) -> Option<KeyChord> {
        self.chords.get(self.index).copied()
    }

    fn consume_peeked(&mut self) {
        if self.index < self.chords.len() {
            self.index += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
