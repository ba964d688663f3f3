// SPDX-License-Identifier: MIT
//
// ode-editor — the editor core.
//
// Everything between a parsed key event and a painted frame lives here:
//
//   key.rs      symbolic key names → KeyChord
//   keymap.rs   binding trie, keymaps, dispatch state
//   command.rs  command registry and invocation context
//   buffer.rs   ropey-backed text buffer with marks and change actions
//   cursor.rs   multi-cursor set per view
//   view.rs     views, split links, viewport rectification
//   editor.rs   the editor state machine and dispatch loop
//   commands.rs built-in commands and default keymaps
//   render.rs   painting views into the terminal frame
//   macros.rs   keyboard macro recording and playback
//   source.rs   input sources (terminal, scripted)
//   hooks.rs    before/after command event sink
//
// The crate deliberately owns no terminal state; `ode-term` is the only
// boundary to the outside world.

pub mod buffer;
pub mod command;
pub mod commands;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod hooks;
pub mod key;
pub mod keymap;
pub mod macros;
pub mod options;
pub mod position;
pub mod render;
pub mod source;
pub mod view;

pub use editor::Editor;
pub use error::Error;
pub use key::KeyChord;
pub use position::{Position, Range};
