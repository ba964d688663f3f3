// SPDX-License-Identifier: MIT
//
// Event sink — the plugin hook boundary.
//
// The dispatch loop calls `before`/`after` around every command whose
// name does not start with `_` (internal prompt plumbing stays silent).
// Hook outcomes never influence the command: an extension observing the
// editor cannot veto core behavior through this seam.

use crate::key::KeyChord;

/// Context handed to hooks: what fired and where.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Command name without any prefix.
    pub command: String,
    /// The chord that resolved the command.
    pub input: KeyChord,
    /// Static parameter from the binding, if any.
    pub static_param: Option<String>,
}

/// Receives before/after command notifications.
pub trait EventSink {
    /// Called before a command body runs.
    fn before(&mut self, _ctx: &HookContext) {}
    /// Called after a command body ran (even when it errored).
    fn after(&mut self, _ctx: &HookContext) {}
}

/// The default sink: ignores everything.
#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}

/// A sink that records hook firings, for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// `("before"|"after", command)` pairs in firing order.
    pub events: Vec<(&'static str, String)>,
}

impl EventSink for RecordingSink {
    fn before(&mut self, ctx: &HookContext) {
        self.events.push(("before", ctx.command.clone()));
    }

    fn after(&mut self, ctx: &HookContext) {
        self.events.push(("after", ctx.command.clone()));
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        let ctx = HookContext {
            command: "move_left".into(),
            input: KeyChord::ch('h'),
            static_param: None,
        };
        sink.before(&ctx);
        sink.after(&ctx);
    }

    #[test]
    fn recording_sink_orders_events() {
        let mut sink = RecordingSink::default();
        let ctx = HookContext {
            command: "save".into(),
            input: KeyChord::ch('s'),
            static_param: None,
        };
        sink.before(&ctx);
        sink.after(&ctx);
        assert_eq!(
            sink.events,
            vec![("before", "save".to_string()), ("after", "save".to_string())]
        );
    }
}
