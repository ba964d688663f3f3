// SPDX-License-Identifier: MIT
//
// Typed errors for structural failures.
//
// These surface to the user as transient status-line messages, never as
// process aborts. Resolution failures (an unmatched chord) are not
// errors at all — dispatch just discards the input.

use thiserror::Error;

/// Errors returned by editor operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A key pattern token did not resolve to a known key.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// Split requested on a view that already has a split child.
    #[error("view is already split")]
    AlreadySplit,

    /// Split or edit operation on a non-edit view.
    #[error("not an edit view")]
    NotAnEditView,

    /// A view id that is not in the registry.
    #[error("no such view")]
    NoSuchView,

    /// A cursor that is not in the view's cursor set.
    #[error("no such cursor")]
    NoSuchCursor,

    /// Pop requested on a keymap stack holding only the initial keymap.
    #[error("keymap stack is empty")]
    EmptyKmapStack,

    /// A keymap name that is not registered.
    #[error("no such keymap: {0}")]
    NoSuchKeymap(String),

    /// A macro name that is not recorded.
    #[error("no such macro: {0}")]
    NoSuchMacro(String),

    /// Buffer has no path to save to.
    #[error("buffer has no path")]
    NoPath,

    /// A buffer position that is off screen (overlay coordinate lookup).
    #[error("position is not visible")]
    OffScreen,

    /// Filesystem failure, carried as a message (keeps `Eq` for tests).
    #[error("io: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
