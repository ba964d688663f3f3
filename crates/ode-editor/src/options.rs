// SPDX-License-Identifier: MIT
//
// Editor options — the knobs the CLI and rc surface expose.

/// Line-number gutter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinenumType {
    /// No gutter.
    None,
    /// Absolute line numbers.
    #[default]
    Abs,
    /// Distance from the cursor line.
    Rel,
    /// Absolute and relative side by side.
    Both,
}

/// Editor-wide configuration. Defaults match an out-of-the-box build;
/// `main` overlays CLI flags on top.
#[derive(Debug, Clone)]
pub struct Options {
    /// Tab stop width in display columns.
    pub tab_width: usize,
    /// Insert spaces up to the next tab stop instead of a tab byte.
    pub tab_to_space: bool,
    /// Line-number gutter mode.
    pub linenum: LinenumType,
    /// Soft-wrap the active cursor line instead of scrolling it.
    pub soft_wrap: bool,
    /// Horizontal rectify scope: negative = edge margin, non-negative =
    /// midpoint window.
    pub scope_x: isize,
    /// Vertical rectify scope.
    pub scope_y: isize,
    /// Strip trailing whitespace from pasted lines.
    pub trim_paste: bool,
    /// Underline the bracket pair under the cursor.
    pub highlight_brackets: bool,
    /// Symbolic name of the macro record/stop toggle key.
    pub macro_toggle_key: String,
    /// Name of the keymap views start in.
    pub initial_keymap: String,
    /// Run without a terminal: exit when the input source is exhausted.
    pub headless: bool,
    /// Macro to run once the loop starts.
    pub startup_macro: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tab_width: 4,
            tab_to_space: true,
            linenum: LinenumType::Abs,
            soft_wrap: false,
            scope_x: -5,
            scope_y: -5,
            trim_paste: true,
            highlight_brackets: true,
            macro_toggle_key: "M-r".to_string(),
            initial_keymap: "normal".to_string(),
            headless: false,
            startup_macro: None,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let o = Options::default();
        assert_eq!(o.tab_width, 4);
        assert_eq!(o.linenum, LinenumType::Abs);
        assert!(o.scope_x < 0, "edge mode by default");
        assert_eq!(o.initial_keymap, "normal");
        assert!(!o.headless);
    }
}
