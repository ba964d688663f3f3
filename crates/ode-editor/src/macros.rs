// SPDX-License-Identifier: MIT
//
// Keyboard macros — named chord sequences recorded at the input seam.
//
// Recording and playback both live at the "get next input" boundary of
// the dispatch loop, which makes replayed chords indistinguishable from
// live typing to the trie walk. The toggle chord itself is intercepted
// before dispatch; since it was already recorded by the time the toggle
// is recognized, stopping drops the final recorded chord.
//
// Playback is strictly sequential and exhausts once, then live input
// resumes. A macro that applies itself replays from the start each time
// it is applied — nothing guards the loop; that matches the recorded
// behavior of the system this design follows.

use std::collections::HashMap;

use crate::key::KeyChord;

/// A named, recorded chord sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub inputs: Vec<KeyChord>,
}

/// An in-progress playback: a private copy of the chords plus a read
/// index. Copying at apply time keeps playback stable even if the macro
/// is re-recorded mid-replay.
#[derive(Debug)]
pub struct Playback {
    inputs: Vec<KeyChord>,
    index: usize,
}

impl Playback {
    /// Begin playback of a macro's chords.
    #[must_use]
    pub fn new(inputs: Vec<KeyChord>) -> Self {
        Self { inputs, index: 0 }
    }

    /// Next chord, advancing the index; `None` once exhausted.
    pub fn next(&mut self) -> Option<KeyChord> {
        let chord = self.inputs.get(self.index).copied();
        if chord.is_some() {
            self.index += 1;
        }
        chord
    }
}

/// Macro storage plus recording state.
#[derive(Debug, Default)]
pub struct MacroBank {
    macros: HashMap<String, Macro>,
    /// The macro being recorded, if any.
    recording: Option<Macro>,
}

impl MacroBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a recording is open.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Start recording under `name`, replacing any previous recording
    /// state.
    pub fn start_recording(&mut self, name: &str) {
        self.recording = Some(Macro {
            name: name.to_string(),
            inputs: Vec::new(),
        });
    }

    /// Append a chord to the open recording, if one is open.
    pub fn record(&mut self, chord: KeyChord) {
        if let Some(rec) = &mut self.recording {
            rec.inputs.push(chord);
        }
    }

    /// Close the recording and store the macro. The final chord is the
    /// toggle key that ended the recording, so it is dropped.
    pub fn stop_recording(&mut self) {
        if let Some(mut rec) = self.recording.take() {
            rec.inputs.pop();
            self.macros.insert(rec.name.clone(), rec);
        }
    }

    /// A stored macro by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    /// Install a macro directly (startup `-M name=keys` definitions).
    pub fn insert(&mut self, mac: Macro) {
        self.macros.insert(mac.name.clone(), mac);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ch(c: char) -> KeyChord {
        KeyChord::ch(c)
    }

    #[test]
    fn record_drops_trailing_toggle() {
        let mut bank = MacroBank::new();
        bank.start_recording("foo");
        assert!(bank.is_recording());
        for c in ['a', 'b', 'c', 'T'] {
            bank.record(ch(c)); // 'T' stands in for the toggle chord
        }
        bank.stop_recording();
        assert!(!bank.is_recording());
        assert_eq!(
            bank.get("foo").unwrap().inputs,
            vec![ch('a'), ch('b'), ch('c')]
        );
    }

    #[test]
    fn empty_recording_stores_empty_macro() {
        let mut bank = MacroBank::new();
        bank.start_recording("empty");
        bank.record(ch('T'));
        bank.stop_recording();
        assert_eq!(bank.get("empty").unwrap().inputs, Vec::<KeyChord>::new());
    }

    #[test]
    fn record_without_recording_is_noop() {
        let mut bank = MacroBank::new();
        bank.record(ch('x'));
        bank.stop_recording();
        assert!(!bank.is_recording());
    }

    #[test]
    fn rerecording_overwrites() {
        let mut bank = MacroBank::new();
        bank.start_recording("m");
        bank.record(ch('a'));
        bank.record(ch('T'));
        bank.stop_recording();
        bank.start_recording("m");
        bank.record(ch('z'));
        bank.record(ch('T'));
        bank.stop_recording();
        assert_eq!(bank.get("m").unwrap().inputs, vec![ch('z')]);
    }

    #[test]
    fn playback_is_sequential_and_exhausts_once() {
        let mut pb = Playback::new(vec![ch('a'), ch('b')]);
        assert_eq!(pb.next(), Some(ch('a')));
        assert_eq!(pb.next(), Some(ch('b')));
        assert_eq!(pb.next(), None);
        assert_eq!(pb.next(), None);
    }

    #[test]
    fn unknown_macro_is_none() {
        let bank = MacroBank::new();
        assert!(bank.get("nope").is_none());
    }
}
