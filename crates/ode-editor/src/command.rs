// SPDX-License-Identifier: MIT
//
// Command registry and invocation context.
//
// Bindings carry command *names*; the registry maps names to functions.
// Resolution happens by name at every dispatch — there are no cached
// function pointers anywhere, so unregistering a command (a plugin going
// away) takes effect on the very next keypress and nothing dangles.

use std::collections::HashMap;

use crate::error::Error;
use crate::key::KeyChord;

/// A command function. Commands receive the whole editor plus the
/// per-invocation context and mutate state directly.
pub type CommandFn = fn(&mut crate::editor::Editor, &mut CmdContext) -> Result<(), Error>;

/// Per-invocation context: the resolved input and its parameters, all
/// owned values so the command may freely re-borrow the editor.
#[derive(Debug, Clone)]
pub struct CmdContext {
    /// The chord that completed the binding.
    pub input: KeyChord,
    /// Fixed parameter from the binding definition.
    pub static_param: Option<String>,
    /// Numeric prefixes collected by `##` edges, oldest first.
    pub numeric_params: Vec<u64>,
    /// Chords captured by `**` edges, oldest first.
    pub wildcard_params: Vec<char>,
    /// True when the chord came from the terminal rather than macro
    /// playback — the gate for paste coalescing.
    pub is_user_input: bool,
    /// Chords batched by paste coalescing, to be inserted together with
    /// `input` in one buffer mutation.
    pub pastebuf: Vec<KeyChord>,
}

impl CmdContext {
    /// A context for `input` with no parameters.
    #[must_use]
    pub fn new(input: KeyChord) -> Self {
        Self {
            input,
            static_param: None,
            numeric_params: Vec::new(),
            wildcard_params: Vec::new(),
            is_user_input: false,
            pastebuf: Vec::new(),
        }
    }

    /// First numeric parameter, or `default`.
    #[must_use]
    pub fn count_or(&self, default: u64) -> u64 {
        self.numeric_params.first().copied().unwrap_or(default)
    }

    /// First wildcard capture, if any.
    #[must_use]
    pub fn wildcard(&self) -> Option<char> {
        self.wildcard_params.first().copied()
    }
}

/// Name → function map. Insertion and removal are both cheap; dispatch
/// resolves through [`resolve`](Self::resolve) each time.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandFn>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a command under `name`.
    pub fn register(&mut self, name: &str, func: CommandFn) {
        self.commands.insert(name.to_string(), func);
    }

    /// Remove a command. Bindings that still name it will simply fail to
    /// resolve — dispatch treats that as an unmatched chord.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    /// Resolve a name to a live function.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<CommandFn> {
        self.commands.get(name).copied()
    }

    /// Registered command count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut crate::editor::Editor, _: &mut CmdContext) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn register_and_resolve() {
        let mut reg = CommandRegistry::new();
        assert!(reg.resolve("noop").is_none());
        reg.register("noop", noop);
        assert!(reg.resolve("noop").is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregister_takes_effect_immediately() {
        let mut reg = CommandRegistry::new();
        reg.register("gone", noop);
        assert!(reg.unregister("gone"));
        assert!(!reg.unregister("gone"));
        assert!(reg.resolve("gone").is_none());
    }

    #[test]
    fn context_param_helpers() {
        let mut ctx = CmdContext::new(KeyChord::ch('g'));
        assert_eq!(ctx.count_or(1), 1);
        assert_eq!(ctx.wildcard(), None);
        ctx.numeric_params = vec![42, 7];
        ctx.wildcard_params = vec!['q'];
        assert_eq!(ctx.count_or(1), 42);
        assert_eq!(ctx.wildcard(), Some('q'));
    }
}
