// SPDX-License-Identifier: MIT
//
// Built-in commands and the default keymaps.
//
// Commands are plain functions over `(&mut Editor, &mut CmdContext)`,
// registered by name; keymaps bind chord patterns to those names. The
// CLI/rc surface feeds user definitions through the exact same
// `Editor::add_binding` entry point these tables use.
//
// Edit commands fan out over every awake cursor; buffer marks keep the
// later cursors valid while earlier ones shift text. Motion commands
// lift selections (anchored `select_*` variants extend them instead).
//
// Names starting with `_` are internal plumbing (prompt and isearch
// keystrokes) and fire no before/after hooks.

use std::path::{Path, PathBuf};

use crate::command::{CmdContext, CommandRegistry};
use crate::editor::Editor;
use crate::error::Error;
use crate::keymap::Keymap;
use crate::position::{Position, Range};
use crate::view::ViewId;

/// The insert command's registered name. The dispatch engine compares
/// against this for paste coalescing.
pub const INSERT_DATA: &str = "insert_data";

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register every built-in command.
#[allow(clippy::too_many_lines)]
pub fn register_builtin(reg: &mut CommandRegistry) {
    reg.register(INSERT_DATA, insert_data);
    reg.register("insert_newline", insert_newline);
    reg.register("insert_newline_above", insert_newline_above);
    reg.register("insert_tab", insert_tab);
    reg.register("delete_before", delete_before);
    reg.register("delete_after", delete_after);
    reg.register("delete_word_before", delete_word_before);
    reg.register("delete_word_after", delete_word_after);
    reg.register("cut", cut);
    reg.register("copy", copy);
    reg.register("uncut", uncut);

    reg.register("move_left", move_left);
    reg.register("move_right", move_right);
    reg.register("move_up", move_up);
    reg.register("move_down", move_down);
    reg.register("move_bol", move_bol);
    reg.register("move_eol", move_eol);
    reg.register("move_beginning", move_beginning);
    reg.register("move_end", move_end);
    reg.register("move_page_up", move_page_up);
    reg.register("move_page_down", move_page_down);
    reg.register("move_word_forward", move_word_forward);
    reg.register("move_word_back", move_word_back);
    reg.register("move_bracket", move_bracket);
    reg.register("move_to_line", move_to_line);
    reg.register("move_relative", move_relative);
    reg.register("move_until_forward", move_until_forward);
    reg.register("move_until_back", move_until_back);

    reg.register("select_left", select_left);
    reg.register("select_right", select_right);
    reg.register("select_up", select_up);
    reg.register("select_down", select_down);
    reg.register("select_bol", select_bol);
    reg.register("select_eol", select_eol);
    reg.register("select_word_forward", select_word_forward);
    reg.register("select_word_back", select_word_back);

    reg.register("new_cursor_up", new_cursor_up);
    reg.register("new_cursor_down", new_cursor_down);
    reg.register("drop_sleeping_cursor", drop_sleeping_cursor);
    reg.register("wake_sleeping_cursors", wake_sleeping_cursors);
    reg.register("remove_extra_cursors", remove_extra_cursors);

    reg.register("scroll_up", scroll_up);
    reg.register("scroll_down", scroll_down);
    reg.register("viewport_top", viewport_top);
    reg.register("viewport_mid", viewport_mid);
    reg.register("viewport_bot", viewport_bot);

    reg.register("split_horizontal", split_horizontal);
    reg.register("split_vertical", split_vertical);
    reg.register("close", close);
    reg.register("next_view", next_view);
    reg.register("prev_view", prev_view);

    reg.register("open_new", open_new);
    reg.register("open_file", open_file);
    reg.register("save", save);
    reg.register("save_as", save_as);
    reg.register("quit", quit);
    reg.register("force_quit", force_quit);

    reg.register("push_kmap", push_kmap);
    reg.register("pop_kmap", pop_kmap);

    reg.register("apply_macro", apply_macro);
    reg.register("apply_macro_by", apply_macro_by);

    reg.register("isearch", isearch);
    reg.register("search_next", search_next);

    reg.register("noop", noop);

    reg.register("_prompt_submit", prompt_submit);
    reg.register("_prompt_cancel", prompt_cancel);
    reg.register("_isearch_input", isearch_input);
    reg.register("_isearch_backspace", isearch_backspace);
    reg.register("_isearch_next", isearch_next);
}

/// The default keymaps: `normal` plus the prompt modes.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn default_keymaps() -> Vec<Keymap> {
    let mut normal = Keymap::new("normal", Some(INSERT_DATA), false);
    let normal_binds: &[(&str, &str, Option<&str>)] = &[
        ("delete_before", "backspace", None),
        ("delete_after", "delete", None),
        ("delete_word_before", "C-h", None),
        ("delete_word_after", "M-d", None),
        ("insert_newline", "enter", None),
        ("insert_newline_above", "C-\\", None),
        ("insert_tab", "tab", None),
        ("move_bol", "C-a", None),
        ("move_bol", "home", None),
        ("move_eol", "C-e", None),
        ("move_eol", "end", None),
        ("move_beginning", "C-home", None),
        ("move_end", "C-end", None),
        ("move_left", "left", None),
        ("move_right", "right", None),
        ("move_up", "up", None),
        ("move_down", "down", None),
        ("move_page_up", "page-up", None),
        ("move_page_down", "page-down", None),
        ("move_word_forward", "M-f", None),
        ("move_word_forward", "C-right", None),
        ("move_word_back", "M-b", None),
        ("move_word_back", "C-left", None),
        ("move_word_back", "C-b", None),
        ("move_bracket", "M-]", None),
        ("move_bracket", "M-[", None),
        ("move_to_line", "M-g", None),
        ("move_relative", "M-y ## u", Some("up")),
        ("move_relative", "M-y ## d", Some("down")),
        ("move_until_forward", "M-' **", None),
        ("move_until_back", "M-; **", None),
        ("select_up", "S-up", None),
        ("select_down", "S-down", None),
        ("select_left", "S-left", None),
        ("select_right", "S-right", None),
        ("select_bol", "S-home", None),
        ("select_eol", "S-end", None),
        ("select_word_forward", "CS-right", None),
        ("select_word_back", "CS-left", None),
        ("new_cursor_up", "MS-up", None),
        ("new_cursor_down", "MS-down", None),
        ("drop_sleeping_cursor", "C-/ .", None),
        ("wake_sleeping_cursors", "C-/ a", None),
        ("remove_extra_cursors", "C-/ /", None),
        ("cut", "C-k", None),
        ("copy", "C-c", None),
        ("uncut", "C-u", None),
        ("isearch", "C-f", None),
        ("search_next", "C-g", None),
        ("search_next", "f3", None),
        ("scroll_up", "M-up", None),
        ("scroll_down", "M-down", None),
        ("viewport_top", "M--", None),
        ("viewport_mid", "C-l", None),
        ("viewport_bot", "M-=", None),
        ("split_vertical", "M-v", None),
        ("split_horizontal", "M-h", None),
        ("close", "C-x", None),
        ("next_view", "M-.", None),
        ("prev_view", "M-,", None),
        ("open_new", "C-n", None),
        ("open_file", "C-o", None),
        ("save", "C-s", None),
        ("save_as", "M-s", None),
        ("quit", "C-q", None),
        ("force_quit", "M-q", None),
        ("push_kmap", "M-x p", None),
        ("pop_kmap", "M-x P", None),
        ("apply_macro", "M-j", None),
        ("apply_macro_by", "M-m **", None),
    ];
    for (cmd, patt, param) in normal_binds {
        normal
            .bind(patt, cmd, *param)
            .expect("built-in normal binding");
    }

    let mut prompt_input = Keymap::new("prompt_input", Some(INSERT_DATA), false);
    for (cmd, patt) in [
        ("_prompt_submit", "enter"),
        ("_prompt_cancel", "escape"),
        ("_prompt_cancel", "C-c"),
        ("delete_before", "backspace"),
        ("delete_after", "delete"),
        ("move_left", "left"),
        ("move_right", "right"),
        ("move_bol", "home"),
        ("move_eol", "end"),
    ] {
        prompt_input
            .bind(patt, cmd, None)
            .expect("built-in prompt binding");
    }

    let mut prompt_isearch = Keymap::new("prompt_isearch", Some("_isearch_input"), false);
    for (cmd, patt) in [
        ("_prompt_submit", "enter"),
        ("_prompt_cancel", "escape"),
        ("_isearch_backspace", "backspace"),
        ("_isearch_next", "C-f"),
        ("_isearch_next", "f3"),
    ] {
        prompt_isearch
            .bind(patt, cmd, None)
            .expect("built-in isearch binding");
    }

    vec![normal, prompt_input, prompt_isearch]
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// The view window/file commands target: the focused view when it is an
/// edit view, otherwise the last focused edit view.
fn edit_target(ed: &Editor) -> ViewId {
    if ed.view_exists(ed.active) && ed.view(ed.active).is_edit() {
        ed.active
    } else {
        ed.active_edit
    }
}

/// Move every awake cursor of the focused view through `step`, `count`
/// times, lifting selections first. Rectifies afterwards.
fn motion(
    ed: &mut Editor,
    count: u64,
    step: impl Fn(&crate::buffer::Buffer, Position) -> Position,
) {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return;
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    view.cursors.lift_all_anchors(buffer);
    for mark in view.cursors.awake_marks() {
        let mut pos = buffer.mark(mark);
        for _ in 0..count {
            pos = step(buffer, pos);
        }
        buffer.set_mark(mark, pos);
    }
    view.rectify_viewport(buffer);
}

/// Like [`motion`], but drops anchors first so the move extends a
/// selection.
fn select_motion(
    ed: &mut Editor,
    count: u64,
    step: impl Fn(&crate::buffer::Buffer, Position) -> Position,
) {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return;
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    view.cursors.drop_anchors_all(buffer);
    for mark in view.cursors.awake_marks() {
        let mut pos = buffer.mark(mark);
        for _ in 0..count {
            pos = step(buffer, pos);
        }
        buffer.set_mark(mark, pos);
    }
    view.rectify_viewport(buffer);
}

/// Insert `text` at every awake cursor of the focused view.
fn insert_at_cursors(ed: &mut Editor, text: &str) {
    let vid = ed.active;
    if !ed.view_exists(vid) || text.is_empty() {
        return;
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for mark in view.cursors.awake_marks() {
        let pos = buffer.mark(mark);
        buffer.insert(pos, text);
    }
    view.rectify_viewport(buffer);
}

/// Delete the selection of every awake anchored cursor of the focused
/// view. Used before a user-typed insert replaces the selection.
pub fn delete_active_selection(ed: &mut Editor) {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return;
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for idx in view.cursors.awake_indices() {
        let sel = view.cursors.cursor(idx).and_then(|c| c.selection(buffer));
        if let Some(range) = sel {
            buffer.delete(range);
            view.cursors.lift_anchor_at(buffer, idx);
        }
    }
}

/// Trim trailing spaces and tabs from every line of pasted text.
fn trim_paste_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(nl) = rest.find('\n') {
        out.push_str(rest[..nl].trim_end_matches([' ', '\t']));
        out.push('\n');
        rest = &rest[nl + 1..];
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Text entry
// ---------------------------------------------------------------------------

/// The default command of the normal keymap: insert the triggering
/// chord's text plus any paste-coalesced batch, at every awake cursor,
/// in one buffer mutation per cursor.
fn insert_data(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let mut text = String::new();
    if let Some(c) = ctx.input.insert_text() {
        text.push(c);
    }
    for chord in &ctx.pastebuf {
        if let Some(c) = chord.insert_text() {
            text.push(c);
        }
    }
    if !ctx.pastebuf.is_empty() && ed.options.trim_paste {
        text = trim_paste_text(&text);
    }
    insert_at_cursors(ed, &text);
    Ok(())
}

fn insert_newline(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    insert_at_cursors(ed, "\n");
    Ok(())
}

/// Open a line above each cursor and move onto it.
fn insert_newline_above(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for mark in view.cursors.awake_marks() {
        let pos = buffer.mark(mark);
        buffer.insert(Position::new(pos.line, 0), "\n");
        buffer.set_mark(mark, Position::new(pos.line, 0));
    }
    view.rectify_viewport(buffer);
    Ok(())
}

fn insert_tab(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return Ok(());
    }
    if ed.options.tab_to_space {
        let tw = ed.options.tab_width.max(1);
        let (view, buffer) = ed.view_and_buffer_mut(vid);
        for mark in view.cursors.awake_marks() {
            let pos = buffer.mark(mark);
            let vcol = buffer.vcol_of(pos);
            let spaces = tw - (vcol % tw);
            buffer.insert(pos, &" ".repeat(spaces));
        }
        view.rectify_viewport(buffer);
    } else {
        insert_at_cursors(ed, "\t");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Deletion, cut, copy
// ---------------------------------------------------------------------------

fn delete_before(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for idx in view.cursors.awake_indices() {
        let Some(cursor) = view.cursors.cursor(idx) else {
            continue;
        };
        if let Some(range) = cursor.selection(buffer) {
            buffer.delete(range);
            view.cursors.lift_anchor_at(buffer, idx);
        } else {
            let pos = buffer.mark(cursor.mark);
            let left = buffer.pos_left(pos);
            buffer.delete(Range::new(left, pos));
        }
    }
    view.rectify_viewport(buffer);
    Ok(())
}

fn delete_after(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for idx in view.cursors.awake_indices() {
        let Some(cursor) = view.cursors.cursor(idx) else {
            continue;
        };
        if let Some(range) = cursor.selection(buffer) {
            buffer.delete(range);
            view.cursors.lift_anchor_at(buffer, idx);
        } else {
            let pos = buffer.mark(cursor.mark);
            let right = buffer.pos_right(pos);
            buffer.delete(Range::new(pos, right));
        }
    }
    view.rectify_viewport(buffer);
    Ok(())
}

fn delete_word_before(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for mark in view.cursors.awake_marks() {
        let pos = buffer.mark(mark);
        let start = buffer.word_back(pos);
        buffer.delete(Range::ordered(start, pos));
    }
    view.rectify_viewport(buffer);
    Ok(())
}

fn delete_word_after(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = ed.active;
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for mark in view.cursors.awake_marks() {
        let pos = buffer.mark(mark);
        let end = buffer.word_forward(pos);
        buffer.delete(Range::ordered(pos, end));
    }
    view.rectify_viewport(buffer);
    Ok(())
}

/// Cut the selection (or the whole line) into each cursor's private cut
/// buffer.
fn cut(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    cut_or_copy(ed, ctx, true)
}

/// Copy without deleting.
fn copy(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    cut_or_copy(ed, ctx, false)
}

fn cut_or_copy(ed: &mut Editor, _ctx: &mut CmdContext, is_cut: bool) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for idx in view.cursors.awake_indices() {
        let Some(cursor) = view.cursors.cursor(idx) else {
            continue;
        };
        let range = cursor.selection(buffer).unwrap_or_else(|| {
            // No selection: the whole line, line ending included.
            let line = buffer.mark(cursor.mark).line;
            let end = if line + 1 < buffer.line_count() {
                Position::new(line + 1, 0)
            } else {
                Position::new(line, buffer.line_content_len(line).unwrap_or(0))
            };
            Range::new(Position::new(line, 0), end)
        });
        let text = buffer.text_of(range);
        if is_cut {
            buffer.delete(range);
            view.cursors.lift_anchor_at(buffer, idx);
        }
        if let Some(c) = view.cursors.cursor_mut(idx) {
            c.cut_buffer = Some(text);
        }
    }
    view.rectify_viewport(buffer);
    Ok(())
}

/// Insert each cursor's cut buffer back at its position.
fn uncut(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    for idx in view.cursors.awake_indices() {
        let Some(text) = view.cursors.cursor(idx).and_then(|c| c.cut_buffer.clone()) else {
            continue;
        };
        let Some(mark) = view.cursors.cursor(idx).map(|c| c.mark) else {
            continue;
        };
        let pos = buffer.mark(mark);
        buffer.insert(pos, &text);
    }
    view.rectify_viewport(buffer);
    Ok(())
}

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

fn move_left(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, ctx.count_or(1), |b, p| b.pos_left(p));
    Ok(())
}

fn move_right(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, ctx.count_or(1), |b, p| b.pos_right(p));
    Ok(())
}

fn move_up(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, ctx.count_or(1), |b, p| {
        b.clamp(Position::new(p.line.saturating_sub(1), p.col))
    });
    Ok(())
}

fn move_down(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, ctx.count_or(1), |b, p| {
        b.clamp(Position::new(p.line + 1, p.col))
    });
    Ok(())
}

fn move_bol(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, 1, |_, p| Position::new(p.line, 0));
    Ok(())
}

fn move_eol(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, 1, |b, p| {
        Position::new(p.line, b.line_content_len(p.line).unwrap_or(0))
    });
    Ok(())
}

fn move_beginning(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, 1, |_, _| Position::ZERO);
    Ok(())
}

fn move_end(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, 1, |b, _| b.end_position());
    Ok(())
}

fn move_page_up(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let page = usize::from(ed.view(ed.active).rect_buffer.h).max(1);
    motion(ed, 1, move |b, p| {
        b.clamp(Position::new(p.line.saturating_sub(page), p.col))
    });
    Ok(())
}

fn move_page_down(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let page = usize::from(ed.view(ed.active).rect_buffer.h).max(1);
    motion(ed, 1, move |b, p| b.clamp(Position::new(p.line + page, p.col)));
    Ok(())
}

fn move_word_forward(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, ctx.count_or(1), |b, p| b.word_forward(p));
    Ok(())
}

fn move_word_back(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, ctx.count_or(1), |b, p| b.word_back(p));
    Ok(())
}

/// Jump to the bracket matching the one under the cursor.
fn move_bracket(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    motion(ed, 1, |b, p| b.matching_bracket(p).unwrap_or(p));
    Ok(())
}

/// Go to a line: the numeric prefix when one was collected, otherwise a
/// prompt. 1-indexed, clamped, centered.
fn move_to_line(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let line = match ctx.numeric_params.first() {
        Some(&n) => Some(n),
        None => ed
            .prompt("goto line:", "prompt_input")
            .and_then(|s| s.trim().parse::<u64>().ok()),
    };
    let Some(line) = line else {
        return Ok(());
    };
    let vid = edit_target(ed);
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let target = buffer.clamp(Position::new(usize::try_from(line.saturating_sub(1)).unwrap_or(0), 0));
    let mark = view.cursors.active().mark;
    buffer.set_mark(mark, target);
    view.center_viewport_y(buffer, target.line);
    view.rectify_viewport(buffer);
    Ok(())
}

/// Move the active cursor N lines up or down — the numeric-prefix
/// binding (`M-y 12 u`); direction comes from the static param.
fn move_relative(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let count = ctx.count_or(1);
    match ctx.static_param.as_deref() {
        Some("up") => motion(ed, count, |b, p| {
            b.clamp(Position::new(p.line.saturating_sub(1), p.col))
        }),
        Some("down") => motion(ed, count, |b, p| b.clamp(Position::new(p.line + 1, p.col))),
        _ => {}
    }
    Ok(())
}

/// Move to the next occurrence of the wildcard-captured character.
fn move_until_forward(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(target) = ctx.wildcard() else {
        return Ok(());
    };
    motion(ed, ctx.count_or(1), move |b, p| {
        b.find_char_forward(p, target).unwrap_or(p)
    });
    Ok(())
}

/// Move to the previous occurrence of the wildcard-captured character.
fn move_until_back(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(target) = ctx.wildcard() else {
        return Ok(());
    };
    motion(ed, ctx.count_or(1), move |b, p| {
        b.find_char_back(p, target).unwrap_or(p)
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn select_left(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, ctx.count_or(1), |b, p| b.pos_left(p));
    Ok(())
}

fn select_right(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, ctx.count_or(1), |b, p| b.pos_right(p));
    Ok(())
}

fn select_up(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, ctx.count_or(1), |b, p| {
        b.clamp(Position::new(p.line.saturating_sub(1), p.col))
    });
    Ok(())
}

fn select_down(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, ctx.count_or(1), |b, p| {
        b.clamp(Position::new(p.line + 1, p.col))
    });
    Ok(())
}

fn select_bol(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, 1, |_, p| Position::new(p.line, 0));
    Ok(())
}

fn select_eol(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, 1, |b, p| {
        Position::new(p.line, b.line_content_len(p.line).unwrap_or(0))
    });
    Ok(())
}

fn select_word_forward(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, ctx.count_or(1), |b, p| b.word_forward(p));
    Ok(())
}

fn select_word_back(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    select_motion(ed, ctx.count_or(1), |b, p| b.word_back(p));
    Ok(())
}

// ---------------------------------------------------------------------------
// Multiple cursors
// ---------------------------------------------------------------------------

fn new_cursor_up(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    add_cursor_relative(ed, -1);
    Ok(())
}

fn new_cursor_down(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    add_cursor_relative(ed, 1);
    Ok(())
}

fn add_cursor_relative(ed: &mut Editor, delta: isize) {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return;
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let pos = buffer.mark(view.cursors.active().mark);
    let line = if delta < 0 {
        pos.line.saturating_sub(delta.unsigned_abs())
    } else {
        pos.line + delta.unsigned_abs()
    };
    let target = buffer.clamp(Position::new(line, pos.col));
    if target.line != pos.line {
        view.cursors.add(buffer, target);
    }
}

/// Park a sleeping cursor at the active position; it joins fan-out when
/// woken.
fn drop_sleeping_cursor(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let pos = buffer.mark(view.cursors.active().mark);
    view.cursors.add_asleep(buffer, pos);
    Ok(())
}

fn wake_sleeping_cursors(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let woken = ed.view_mut(vid).cursors.wake_all();
    if woken > 0 {
        ed.set_info(format!("woke {woken} cursors"));
    }
    Ok(())
}

fn remove_extra_cursors(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let keep = view.cursors.active_index();
    view.cursors.remove_all_except(buffer, keep)
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

fn scroll_up(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    scroll_by(ed, -i64::try_from(ctx.count_or(1)).unwrap_or(1));
    Ok(())
}

fn scroll_down(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    scroll_by(ed, i64::try_from(ctx.count_or(1)).unwrap_or(1));
    Ok(())
}

/// Scroll the viewport and pull the cursor along so rectification does
/// not immediately undo the scroll.
fn scroll_by(ed: &mut Editor, delta: i64) {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return;
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    view.scroll_viewport(buffer, isize::try_from(delta).unwrap_or(0));
    let h = usize::from(view.rect_buffer.h).max(1);
    let mark = view.cursors.active().mark;
    let pos = buffer.mark(mark);
    let clamped_line = pos.line.clamp(view.viewport_y, view.viewport_y + h - 1);
    if clamped_line != pos.line {
        let target = buffer.clamp(Position::new(clamped_line, pos.col));
        buffer.set_mark(mark, target);
    }
    view.rectify_viewport(buffer);
}

fn viewport_top(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    reposition_viewport(ed, VerticalSpot::Top)
}

fn viewport_mid(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    reposition_viewport(ed, VerticalSpot::Mid)
}

fn viewport_bot(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    reposition_viewport(ed, VerticalSpot::Bottom)
}

enum VerticalSpot {
    Top,
    Mid,
    Bottom,
}

fn reposition_viewport(ed: &mut Editor, spot: VerticalSpot) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let line = buffer.mark(view.cursors.active().mark).line;
    match spot {
        VerticalSpot::Top => view.top_viewport_y(line),
        VerticalSpot::Mid => view.center_viewport_y(buffer, line),
        VerticalSpot::Bottom => view.bottom_viewport_y(buffer, line),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

fn split_horizontal(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    ed.split_view(vid, false, 0.5)?;
    Ok(())
}

fn split_vertical(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    ed.split_view(vid, true, 0.5)?;
    Ok(())
}

fn close(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    ed.close_view(vid)
}

fn next_view(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    cycle_view(ed, 1)
}

fn prev_view(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    cycle_view(ed, -1)
}

/// Cycle among the top-level views (split roots), wrapping.
fn cycle_view(ed: &mut Editor, dir: isize) -> Result<(), Error> {
    if ed.top_views.is_empty() {
        return Ok(());
    }
    // Root of the focused edit view's split tree.
    let mut root = edit_target(ed);
    while let Some(parent) = ed.view(root).split_parent {
        root = parent;
    }
    let len = ed.top_views.len();
    let idx = ed.top_views.iter().position(|&v| v == root).unwrap_or(0);
    let next = if dir < 0 {
        (idx + len - 1) % len
    } else {
        (idx + 1) % len
    };
    ed.set_active(ed.top_views[next])
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

fn open_new(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    ed.open_view(None)?;
    Ok(())
}

fn open_file(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(path) = ed.prompt("open: path?", "prompt_input") else {
        return Ok(());
    };
    if path.is_empty() {
        return Ok(());
    }
    ed.open_view(Some(Path::new(&path)))?;
    Ok(())
}

fn save(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    let bid = ed.view(vid).buffer;
    if ed.buffer(bid).path().is_none() {
        return save_as(ed, ctx);
    }
    ed.buffer_mut(bid).save()?;
    let shown = ed
        .buffer(bid)
        .path()
        .map_or_else(|| "?".to_string(), |p| p.display().to_string());
    ed.set_info(format!("wrote {shown}"));
    Ok(())
}

fn save_as(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(path) = ed.prompt("save as: path?", "prompt_input") else {
        return Ok(());
    };
    if path.is_empty() {
        return Ok(());
    }
    let vid = edit_target(ed);
    let bid = ed.view(vid).buffer;
    ed.buffer_mut(bid).save_as(PathBuf::from(&path))?;
    ed.set_info(format!("wrote {path}"));
    Ok(())
}

/// Quit, refusing while any edit buffer holds unsaved changes.
fn quit(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let dirty = ed.all_view_ids().iter().any(|&v| {
        let view = ed.view(v);
        view.is_edit() && ed.buffer(view.buffer).is_dirty()
    });
    if dirty {
        ed.set_error("unsaved changes (C-s to save, M-q to discard)");
    } else {
        ed.should_quit = true;
    }
    Ok(())
}

fn force_quit(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    ed.should_quit = true;
    Ok(())
}

// ---------------------------------------------------------------------------
// Keymap stack
// ---------------------------------------------------------------------------

fn push_kmap(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(name) = ed.prompt("push_kmap: name?", "prompt_input") else {
        return Ok(());
    };
    let Some(id) = ed.kmap_id(&name) else {
        return Err(Error::NoSuchKeymap(name));
    };
    let vid = edit_target(ed);
    ed.view_mut(vid).push_kmap(id);
    ed.set_info(format!("pushed keymap {name}"));
    Ok(())
}

fn pop_kmap(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    ed.view_mut(vid).pop_kmap()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

fn apply_macro(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(name) = ed.prompt("apply_macro: name?", "prompt_input") else {
        return Ok(());
    };
    if name.is_empty() {
        return Ok(());
    }
    ed.apply_macro(&name)
}

/// Apply the single-letter macro named by the wildcard chord.
fn apply_macro_by(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    let Some(ch) = ctx.wildcard() else {
        return Ok(());
    };
    ed.apply_macro(&ch.to_string())
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Incremental search: a prompt loop under the isearch keymap updates
/// the match as the pattern grows. Enter keeps the cursor on the match;
/// Escape restores the starting position.
fn isearch(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let origin = {
        let view = ed.view(vid);
        ed.buffer(view.buffer).mark(view.cursors.active().mark)
    };
    ed.isearch_origin = Some((vid, origin));
    let answer = ed.prompt("isearch:", "prompt_isearch");
    ed.isearch_origin = None;

    match answer {
        Some(pattern) if !pattern.is_empty() => {
            ed.view_mut(vid).last_search = Some(pattern);
        }
        _ => {
            // Cancelled: back to where the search started.
            let (view, buffer) = ed.view_and_buffer_mut(vid);
            let mark = view.cursors.active().mark;
            buffer.set_mark(mark, origin);
            view.rectify_viewport(buffer);
        }
    }
    Ok(())
}

/// Jump to the next match of the last confirmed pattern.
fn search_next(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let vid = edit_target(ed);
    if !ed.view_exists(vid) {
        return Ok(());
    }
    let Some(pattern) = ed.view(vid).last_search.clone() else {
        ed.set_error("no previous search");
        return Ok(());
    };
    let Ok(re) = regex::Regex::new(&pattern) else {
        ed.set_error(format!("bad pattern: {pattern}"));
        return Ok(());
    };
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let mark = view.cursors.active().mark;
    let from = buffer.pos_right(buffer.mark(mark));
    if let Some(m) = buffer.search_forward(&re, from, true) {
        buffer.set_mark(mark, m.start);
        view.center_viewport_y(buffer, m.start.line);
        view.rectify_viewport(buffer);
    } else {
        ed.set_info("no match");
    }
    Ok(())
}

/// Re-run the incremental search against the current prompt contents
/// and move the origin view's cursor to the first match.
fn isearch_update(ed: &mut Editor, from_origin: bool) {
    let Some((vid, origin)) = ed.isearch_origin else {
        return;
    };
    if !ed.view_exists(vid) {
        return;
    }
    let pattern = ed.prompt_text();
    if pattern.is_empty() {
        let (view, buffer) = ed.view_and_buffer_mut(vid);
        let mark = view.cursors.active().mark;
        buffer.set_mark(mark, origin);
        view.rectify_viewport(buffer);
        return;
    }
    let Ok(re) = regex::Regex::new(&pattern) else {
        return; // user is mid-pattern; wait for it to become valid
    };
    let (view, buffer) = ed.view_and_buffer_mut(vid);
    let mark = view.cursors.active().mark;
    let from = if from_origin {
        origin
    } else {
        buffer.pos_right(buffer.mark(mark))
    };
    if let Some(m) = buffer.search_forward(&re, from, true) {
        buffer.set_mark(mark, m.start);
        view.center_viewport_y(buffer, m.start.line);
        view.rectify_viewport(buffer);
    }
}

// ---------------------------------------------------------------------------
// Internal prompt plumbing
// ---------------------------------------------------------------------------

fn prompt_submit(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    let answer = ed.prompt_text();
    ed.finish_prompt(Some(answer));
    Ok(())
}

fn prompt_cancel(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    ed.finish_prompt(None);
    Ok(())
}

fn isearch_input(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    insert_data(ed, ctx)?;
    isearch_update(ed, true);
    Ok(())
}

fn isearch_backspace(ed: &mut Editor, ctx: &mut CmdContext) -> Result<(), Error> {
    delete_before(ed, ctx)?;
    isearch_update(ed, true);
    Ok(())
}

fn isearch_next(ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    isearch_update(ed, false);
    Ok(())
}

fn noop(_ed: &mut Editor, _ctx: &mut CmdContext) -> Result<(), Error> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
