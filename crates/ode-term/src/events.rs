// SPDX-License-Identifier: MIT
//
// EventSource — the pull side of terminal input.
//
// Bridges the background stdin reader, the byte parser, and the signal
// flags into two operations the editor loop needs:
//
// - [`poll`](EventSource::poll): block until the next event (key, mouse,
//   resize) or EOF. An internal ~10ms tick doubles as the escape-sequence
//   timeout: when no bytes follow a lone ESC, it is flushed as a real
//   Escape keypress.
// - [`peek`](EventSource::peek) / [`consume_peeked`](EventSource::consume_peeked):
//   non-blocking, non-consuming look at the next already-buffered event.
//   This is the seam paste coalescing uses to batch a flood of character
//   events without stealing the first non-insert event.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::input::{Event, Parser};
use crate::reader::StdinReader;
use crate::signal;
use crate::terminal::Size;

/// What [`EventSource::poll`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermEvent {
    /// A parsed input event.
    Input(Event),
    /// The terminal was resized (already re-queried).
    Resize(Size),
    /// Stdin closed — no more input will ever arrive.
    Eof,
}

/// Escape-sequence disambiguation timeout. A lone ESC older than this is
/// delivered as the Escape key.
const ESC_TIMEOUT: Duration = Duration::from_millis(10);

/// Pull-based event source over the stdin reader thread.
pub struct EventSource {
    /// Keeps the reader thread alive; dropped (and joined) with us.
    _reader: Option<StdinReader>,
    rx: Receiver<Vec<u8>>,
    parser: Parser,
    queue: VecDeque<Event>,
    /// Size query hook, so resize events carry fresh dimensions.
    query: fn() -> Option<Size>,
    /// Whether to consult the global SIGWINCH flag. Channel-backed
    /// sources (tests) leave the process-wide flag alone.
    watch_resize: bool,
}

impl EventSource {
    /// Spawn the stdin reader and build a source over it.
    #[must_use]
    pub fn new() -> Self {
        let (reader, rx) = StdinReader::spawn();
        Self {
            _reader: Some(reader),
            rx,
            parser: Parser::new(),
            queue: VecDeque::new(),
            query: crate::terminal::query_size,
            watch_resize: true,
        }
    }

    /// Build a source over an arbitrary byte channel (tests).
    #[must_use]
    pub fn from_channel(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            _reader: None,
            rx,
            parser: Parser::new(),
            queue: VecDeque::new(),
            query: || None,
            watch_resize: false,
        }
    }

    /// Block until the next event. Resize flags are checked between
    /// ticks, so SIGWINCH latency is one tick at most.
    pub fn poll(&mut self) -> TermEvent {
        loop {
            if self.watch_resize && signal::take_resize() {
                let size = (self.query)().unwrap_or(Size { cols: 80, rows: 24 });
                return TermEvent::Resize(size);
            }
            if let Some(ev) = self.queue.pop_front() {
                return TermEvent::Input(ev);
            }

            match self.rx.recv_timeout(ESC_TIMEOUT) {
                Ok(bytes) => {
                    self.queue.extend(self.parser.advance(&bytes));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.parser.has_pending() {
                        self.queue.extend(self.parser.flush());
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Drain whatever the parser still holds, then EOF.
                    if self.parser.has_pending() {
                        self.queue.extend(self.parser.flush());
                        continue;
                    }
                    return TermEvent::Eof;
                }
            }
        }
    }

    /// Non-blocking, non-consuming look at the next buffered event.
    /// Drains any bytes already sitting in the channel first.
    pub fn peek(&mut self) -> Option<&Event> {
        while let Ok(bytes) = self.rx.try_recv() {
            let events = self.parser.advance(&bytes);
            self.queue.extend(events);
        }
        self.queue.front()
    }

    /// Consume the event last returned by [`peek`](Self::peek).
    pub fn consume_peeked(&mut self) {
        self.queue.pop_front();
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
