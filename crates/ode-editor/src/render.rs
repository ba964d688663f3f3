// SPDX-License-Identifier: MIT
//
// Renderer — paints the view tree into the terminal frame.
//
// Walks the active split tree, then the status line, then the prompt
// when it has focus. Per visible line: the number gutter (absolute,
// relative, or both), a `^` marker when the cursor line is horizontally
// scrolled, the text cells, and a `$` marker when a line is truncated at
// the right edge.
//
// Soft wrap applies to the active-cursor line only: that one line
// reflows across as many rows as remain in the window, with the gutter
// dotted on continuation rows; every other line truncates. Horizontal
// scrolling likewise shifts only the cursor line — other lines always
// render from column zero.
//
// Overlays run after base content: selections and extra cursors flip
// cells to inverse, matched bracket pairs get underlined. All overlay
// positions go through the `screen_coords` mapping, which reports
// off-screen positions as errors rather than clamping them.

use ode_term::cell::{Attr, Cell, CellColor};
use ode_term::frame::{char_width, Frame};

use crate::buffer::Buffer;
use crate::editor::Editor;
use crate::error::Error;
use crate::options::LinenumType;
use crate::position::Position;
use crate::view::{View, ViewId, ViewKind};

/// Gutter foreground for line numbers.
const LINENUM_STYLE: Attr = Attr::DIM;
/// Fallback glyph for unprintable codepoints.
const UNPRINTABLE: char = '?';

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Paint the whole editor: the focused split tree, the status line, and
/// the prompt when it has focus.
pub fn draw_editor(ed: &Editor, frame: &mut Frame) {
    // The focused edit view's split root and its chain of children.
    if ed.view_exists(ed.active_edit) {
        let mut root = ed.active_edit;
        while let Some(parent) = ed.view(root).split_parent {
            root = parent;
        }
        let mut cur = Some(root);
        while let Some(id) = cur {
            draw_view(ed, id, frame);
            cur = ed.view(id).split_child;
        }
    }

    draw_status(ed, frame);
    if ed.active == ed.prompt_view {
        draw_prompt(ed, frame);
    }
}

/// Screen position of a view's buffer position.
///
/// # Errors
///
/// [`Error::OffScreen`] when the position is not currently visible.
pub fn screen_coords(ed: &Editor, vid: ViewId, pos: Position) -> Result<(u16, u16), Error> {
    if !ed.view_exists(vid) {
        return Err(Error::NoSuchView);
    }
    let view = ed.view(vid);
    let buf = ed.buffer(view.buffer);
    let rect = view.rect_buffer;
    let w = usize::from(rect.w);
    let h = usize::from(rect.h);
    if w == 0 || h == 0 {
        return Err(Error::OffScreen);
    }

    let vcol = buf.vcol_of(pos);

    if view.kind == ViewKind::Prompt {
        // Prompt input is offset by its label.
        let label_w = ode_term::frame::string_width(ed.prompt_label()) + 1;
        let x = label_w + vcol;
        if x >= w {
            return Err(Error::OffScreen);
        }
        return Ok((rect.x + to_u16(x), rect.y));
    }

    if pos.line < view.viewport_y || pos.line >= view.viewport_y + h {
        return Err(Error::OffScreen);
    }
    let row = pos.line - view.viewport_y;

    let cursor_line = buf.mark(view.cursors.active().mark).line;
    let on_cursor_line = pos.line == cursor_line;

    if ed.options.soft_wrap && on_cursor_line && view.kind == ViewKind::Edit {
        let y = row + vcol / w;
        if y >= h {
            return Err(Error::OffScreen);
        }
        return Ok((rect.x + to_u16(vcol % w), rect.y + to_u16(y)));
    }

    // Horizontal scroll shifts the cursor line only.
    let start = if on_cursor_line { view.viewport_x_vcol } else { 0 };
    if vcol < start || vcol - start >= w {
        return Err(Error::OffScreen);
    }
    Ok((rect.x + to_u16(vcol - start), rect.y + to_u16(row)))
}

/// Screen position of the focused view's active cursor.
///
/// # Errors
///
/// [`Error::OffScreen`] when the cursor is not visible.
pub fn screen_coords_active(ed: &Editor) -> Result<(u16, u16), Error> {
    if !ed.view_exists(ed.active) {
        return Err(Error::NoSuchView);
    }
    let view = ed.view(ed.active);
    let pos = ed.buffer(view.buffer).mark(view.cursors.active().mark);
    screen_coords(ed, ed.active, pos)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

fn draw_view(ed: &Editor, vid: ViewId, frame: &mut Frame) {
    let view = ed.view(vid);
    if view.kind != ViewKind::Edit {
        return;
    }
    let buf = ed.buffer(view.buffer);

    draw_caption(ed, vid, frame);

    let h = usize::from(view.rect_buffer.h);
    let cursor_line = buf.mark(view.cursors.active().mark).line;

    let mut row = 0;
    let mut line = view.viewport_y;
    while row < h {
        if line >= buf.line_count() {
            break;
        }
        let consumed = draw_line(ed, view, buf, line, row, cursor_line, frame);
        row += consumed;
        line += 1;
    }

    draw_overlays(ed, vid, frame);
}

fn draw_caption(ed: &Editor, vid: ViewId, frame: &mut Frame) {
    let view = ed.view(vid);
    let buf = ed.buffer(view.buffer);
    let rect = view.rect_caption;
    if rect.w == 0 {
        return;
    }

    let focused = vid == ed.active || vid == ed.active_edit;
    let attrs = if focused { Attr::INVERSE } else { Attr::INVERSE | Attr::DIM };

    let name = buf
        .path()
        .and_then(|p| p.file_name())
        .map_or_else(|| "[no name]".to_string(), |n| n.to_string_lossy().into_owned());
    let dirty = if buf.is_dirty() { " [+]" } else { "" };
    let left = format!(" {name}{dirty}");

    let pos = buf.mark(view.cursors.active().mark);
    let right = format!(" {}  {}L ", pos, buf.line_count());

    frame.fill(
        rect.x,
        rect.y,
        rect.w,
        1,
        Cell::styled(' ', CellColor::Default, CellColor::Default, attrs),
    );
    frame.print(rect.x, rect.y, &left, CellColor::Default, CellColor::Default, attrs);
    let right_w = to_u16(ode_term::frame::string_width(&right));
    if right_w < rect.w {
        frame.print(
            rect.x + rect.w - right_w,
            rect.y,
            &right,
            CellColor::Default,
            CellColor::Default,
            attrs,
        );
    }
}

/// Draw one buffer line. Returns the number of screen rows consumed
/// (more than one only when the cursor line soft-wraps).
#[allow(clippy::too_many_arguments)]
fn draw_line(
    ed: &Editor,
    view: &View,
    buf: &Buffer,
    line: usize,
    row: usize,
    cursor_line: usize,
    frame: &mut Frame,
) -> usize {
    let is_cursor_line = line == cursor_line;
    let soft_wrap = ed.options.soft_wrap && is_cursor_line;
    let rect = view.rect_buffer;
    let w = usize::from(rect.w);
    let h = usize::from(rect.h);
    if w == 0 {
        return 1;
    }

    draw_gutter(ed, view, line, row, cursor_line, frame);

    // `^` marks a horizontally scrolled cursor line.
    if view.rect_margin_left.w > 0 && ed.options.linenum != LinenumType::None {
        let marker = if is_cursor_line && view.viewport_x_vcol > 0 && !soft_wrap {
            '^'
        } else {
            ' '
        };
        frame.set(
            view.rect_margin_left.x,
            view.rect_margin_left.y + to_u16(row),
            Cell::styled(marker, CellColor::Ansi256(4), CellColor::Default, Attr::empty()),
        );
    }

    // Horizontal scroll applies to the cursor line only.
    let start_vcol = if is_cursor_line && !soft_wrap {
        view.viewport_x_vcol
    } else {
        0
    };

    // `$` marks truncation on the right.
    if !soft_wrap
        && view.rect_margin_right.w > 0
        && buf.line_vwidth(line).saturating_sub(start_vcol) > w
    {
        frame.set(
            view.rect_margin_right.x,
            view.rect_margin_right.y + to_u16(row),
            Cell::styled('$', CellColor::Ansi256(4), CellColor::Default, Attr::empty()),
        );
    }

    let Some(slice) = buf.line(line) else {
        return 1;
    };
    let tab_width = buf.tab_width();

    let mut vcol = 0usize;
    let mut screen_col = 0usize;
    let mut extra_rows = 0usize;

    for ch in slice.chars() {
        if ch == '\n' || ch == '\r' {
            break;
        }

        // Visual span of this character.
        let span = if ch == '\t' {
            (vcol / tab_width + 1) * tab_width - vcol
        } else {
            char_width(ch).max(1)
        };

        // Display form: tabs as one space cell per span column, control
        // and other unprintable codepoints as `?`.
        let glyph = display_glyph(ch);

        for i in 0..span {
            if vcol + i < start_vcol {
                continue;
            }
            if screen_col >= w {
                if soft_wrap && row + extra_rows + 1 < h {
                    extra_rows += 1;
                    screen_col = 0;
                    dot_gutter(view, row + extra_rows, frame);
                } else {
                    return 1 + extra_rows;
                }
            }
            let cell = if ch == '\t' || i > 0 {
                // Tab padding and wide-char continuations.
                if ch == '\t' {
                    Cell::new(' ')
                } else {
                    Cell::continuation(CellColor::Default, CellColor::Default, Attr::empty())
                }
            } else {
                Cell::new(glyph)
            };
            frame.set(
                rect.x + to_u16(screen_col),
                rect.y + to_u16(row + extra_rows),
                cell,
            );
            screen_col += 1;
        }
        vcol += span;
    }

    1 + extra_rows
}

fn display_glyph(ch: char) -> char {
    if ch == '\t' {
        ' '
    } else if ch == '\u{1b}' {
        '['
    } else if ch.is_control() || (char_width(ch) == 0 && !ch.is_alphabetic()) {
        UNPRINTABLE
    } else {
        ch
    }
}

fn draw_gutter(
    ed: &Editor,
    view: &View,
    line: usize,
    row: usize,
    cursor_line: usize,
    frame: &mut Frame,
) {
    let linenum = ed.options.linenum;
    if linenum == LinenumType::None || view.rect_lines.w == 0 {
        return;
    }
    let abs = line + 1;
    let rel = line.abs_diff(cursor_line);
    let text = match linenum {
        LinenumType::Abs => format!("{abs:>width$}", width = usize::from(view.abs_linenum_width)),
        LinenumType::Rel => {
            let shown = if line == cursor_line { abs } else { rel };
            format!("{shown:>width$}", width = usize::from(view.linenum_width))
        }
        LinenumType::Both => format!(
            "{abs:>aw$} {rel:>rw$}",
            aw = usize::from(view.abs_linenum_width),
            rw = usize::from(view.rel_linenum_width)
        ),
        LinenumType::None => return,
    };
    let attrs = if line == cursor_line { Attr::empty() } else { LINENUM_STYLE };
    frame.print(
        view.rect_lines.x,
        view.rect_lines.y + to_u16(row),
        &text,
        CellColor::Default,
        CellColor::Default,
        attrs,
    );
}

/// Fill the gutter of a soft-wrap continuation row with dots.
fn dot_gutter(view: &View, row: usize, frame: &mut Frame) {
    for i in 0..view.rect_lines.w {
        frame.set(
            view.rect_lines.x + i,
            view.rect_lines.y + to_u16(row),
            Cell::styled('.', CellColor::Default, CellColor::Default, LINENUM_STYLE),
        );
    }
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

fn draw_overlays(ed: &Editor, vid: ViewId, frame: &mut Frame) {
    let view = ed.view(vid);
    let buf = ed.buffer(view.buffer);

    // Selections: inverse every visible cell in each awake selection.
    for cursor in view.cursors.iter() {
        if cursor.is_asleep {
            continue;
        }
        if let Some(range) = cursor.selection(buf) {
            for line in range.start.line..=range.end.line.min(buf.line_count().saturating_sub(1)) {
                let from = if line == range.start.line { range.start.col } else { 0 };
                let to = if line == range.end.line {
                    range.end.col
                } else {
                    buf.line_content_len(line).unwrap_or(0)
                };
                for col in from..to {
                    set_attr_at(ed, vid, Position::new(line, col), Attr::INVERSE, frame);
                }
            }
        }
    }

    // Extra cursors: inverse awake ones, underline sleeping ones. The
    // active cursor is the hardware cursor, drawn by the terminal.
    let active_idx = view.cursors.active_index();
    for (idx, cursor) in view.cursors.iter().enumerate() {
        if idx == active_idx {
            continue;
        }
        let attr = if cursor.is_asleep { Attr::UNDERLINE } else { Attr::INVERSE };
        set_attr_at(ed, vid, buf.mark(cursor.mark), attr, frame);
    }

    // Matching bracket pair under the active cursor.
    if ed.options.highlight_brackets {
        let pos = buf.mark(view.cursors.active().mark);
        if let Some(other) = buf.matching_bracket(pos) {
            set_attr_at(ed, vid, pos, Attr::UNDERLINE, frame);
            set_attr_at(ed, vid, other, Attr::UNDERLINE, frame);
        }
    }
}

/// Merge an attribute into the cell at a buffer position, if visible.
fn set_attr_at(ed: &Editor, vid: ViewId, pos: Position, attr: Attr, frame: &mut Frame) {
    if let Ok((x, y)) = screen_coords(ed, vid, pos) {
        if let Some(cell) = frame.get(x, y) {
            let mut cell = *cell;
            cell.attrs |= attr;
            frame.set(x, y, cell);
        }
    }
}

// ---------------------------------------------------------------------------
// Status and prompt
// ---------------------------------------------------------------------------

fn draw_status(ed: &Editor, frame: &mut Frame) {
    let view = ed.view(ed.status_view);
    let rect = view.rect_buffer;
    if rect.w == 0 {
        return;
    }

    frame.fill(
        rect.x,
        rect.y,
        rect.w,
        rect.h,
        Cell::styled(' ', CellColor::Default, CellColor::Default, Attr::INVERSE),
    );

    // Messages take the line over for one cycle.
    if let Some(msg) = &ed.error_message {
        frame.print(
            rect.x,
            rect.y,
            msg,
            CellColor::Ansi256(1),
            CellColor::Default,
            Attr::INVERSE,
        );
        return;
    }
    if let Some(msg) = &ed.info_message {
        frame.print(rect.x, rect.y, msg, CellColor::Default, CellColor::Default, Attr::INVERSE);
        return;
    }

    let (kmap_name, cursors, pos, line_count) = if ed.view_exists(ed.active_edit) {
        let v = ed.view(ed.active_edit);
        let b = ed.buffer(v.buffer);
        let name = v
            .kmap_stack
            .last()
            .map_or("?", |&k| ed.kmap(k).name())
            .to_string();
        (
            name,
            v.cursors.len(),
            b.mark(v.cursors.active().mark),
            b.line_count(),
        )
    } else {
        ("?".to_string(), 0, Position::ZERO, 0)
    };

    let rec = if ed.macros.is_recording() { " [rec]" } else { "" };
    let cursors_part = if cursors > 1 {
        format!("  {cursors} cursors")
    } else {
        String::new()
    };
    let left = format!(" {kmap_name}{rec}{cursors_part}  views:{}", ed.top_views.len());
    let right = format!(" {pos}  {line_count}L ");

    frame.print(rect.x, rect.y, &left, CellColor::Default, CellColor::Default, Attr::INVERSE);
    let right_w = to_u16(ode_term::frame::string_width(&right));
    if right_w < rect.w {
        frame.print(
            rect.x + rect.w - right_w,
            rect.y,
            &right,
            CellColor::Default,
            CellColor::Default,
            Attr::INVERSE,
        );
    }
}

fn draw_prompt(ed: &Editor, frame: &mut Frame) {
    let view = ed.view(ed.prompt_view);
    let rect = view.rect_buffer;
    if rect.w == 0 {
        return;
    }
    frame.fill(rect.x, rect.y, rect.w, rect.h, Cell::EMPTY);
    let label = ed.prompt_label();
    let end = frame.print(
        rect.x,
        rect.y,
        label,
        CellColor::Ansi256(6),
        CellColor::Default,
        Attr::BOLD,
    );
    frame.print(
        end + 1,
        rect.y,
        &ed.prompt_text(),
        CellColor::Default,
        CellColor::Default,
        Attr::empty(),
    );
}

#[allow(clippy::cast_possible_truncation)]
fn to_u16(v: usize) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopSink;
    use crate::options::Options;
    use crate::source::ScriptedSource;
    use pretty_assertions::assert_eq;

    fn editor(text: &str) -> Editor {
        editor_sized(text, 40, 10)
    }

    fn editor_sized(text: &str, w: u16, h: u16) -> Editor {
        let mut ed = Editor::new(
            Options::default(),
            Box::new(ScriptedSource::new(vec![])),
            Box::new(NoopSink),
        );
        ed.resize(w, h);
        let bid = ed.view(ed.active).buffer;
        ed.buffer_mut(bid).insert(Position::ZERO, text);
        let mark = ed.view(ed.active).cursors.active().mark;
        ed.buffer_mut(bid).set_mark(mark, Position::ZERO);
        ed.propagate_buffer_changes();
        ed
    }

    fn painted(ed: &Editor) -> Frame {
        let mut frame = Frame::new(ed.width, ed.height);
        draw_editor(ed, &mut frame);
        frame
    }

    fn row_text(frame: &Frame, y: u16) -> String {
        frame
            .row(y)
            .unwrap()
            .iter()
            .filter(|c| !c.is_continuation())
            .map(|c| c.ch)
            .collect()
    }

    // ── Basic painting ──────────────────────────────────────────────────

    #[test]
    fn caption_row_then_text_rows() {
        let ed = editor("hello\nworld");
        let frame = painted(&ed);
        // Row 0 is the caption with the placeholder name.
        assert!(row_text(&frame, 0).contains("[no name]"));
        // Row 1: gutter "1", margin, then text.
        let row1 = row_text(&frame, 1);
        assert!(row1.contains("hello"), "row1 = {row1:?}");
        let row2 = row_text(&frame, 2);
        assert!(row2.contains("world"), "row2 = {row2:?}");
    }

    #[test]
    fn caption_shows_dirty_marker() {
        let ed = editor("x");
        let frame = painted(&ed);
        assert!(row_text(&frame, 0).contains("[+]"));
    }

    #[test]
    fn gutter_numbers_are_right_aligned() {
        let text = (1..=12).map(|i| format!("line{i}\n")).collect::<String>();
        let ed = editor_sized(&text, 40, 16);
        let frame = painted(&ed);
        // 13 lines → width 2. Row 1 shows " 1".
        let row1 = row_text(&frame, 1);
        assert!(row1.starts_with(" 1 "), "row1 = {row1:?}");
        let row10 = row_text(&frame, 10);
        assert!(row10.starts_with("10"), "row10 = {row10:?}");
    }

    #[test]
    fn tabs_render_as_spaces() {
        let ed = editor("\tx");
        let frame = painted(&ed);
        let row = row_text(&frame, 1);
        // Gutter "1" + margin + 4 blank columns then 'x'.
        assert!(row.contains("    x"), "row = {row:?}");
    }

    #[test]
    fn unprintables_render_as_question_mark() {
        let ed = editor("a\u{1}b");
        let frame = painted(&ed);
        let row = row_text(&frame, 1);
        assert!(row.contains("a?b"), "row = {row:?}");
    }

    #[test]
    fn wide_chars_get_continuations() {
        let ed = editor("中x");
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let x0 = view.rect_buffer.x;
        assert_eq!(frame.get(x0, 1).unwrap().ch, '中');
        assert!(frame.get(x0 + 1, 1).unwrap().is_continuation());
        assert_eq!(frame.get(x0 + 2, 1).unwrap().ch, 'x');
    }

    // ── Truncation and soft wrap ────────────────────────────────────────

    #[test]
    fn long_line_gets_dollar_marker() {
        let ed = editor_sized(&"z".repeat(100), 20, 6);
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let mx = view.rect_margin_right.x;
        assert_eq!(frame.get(mx, 1).unwrap().ch, '$');
    }

    #[test]
    fn short_line_has_no_dollar_marker() {
        let ed = editor_sized("short", 20, 6);
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let mx = view.rect_margin_right.x;
        assert_eq!(frame.get(mx, 1).unwrap().ch, ' ');
    }

    #[test]
    fn soft_wrap_reflows_cursor_line() {
        let mut ed = editor_sized(&"ab".repeat(30), 20, 8);
        ed.options.soft_wrap = true;
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let w = usize::from(view.rect_buffer.w);
        // First text row is full; the continuation row carries the rest
        // and its gutter is dotted.
        let row1 = row_text(&frame, 1);
        let row2 = row_text(&frame, 2);
        assert!(row1.len() >= w, "row1 = {row1:?}");
        assert!(row2.starts_with('.'), "row2 = {row2:?}");
        assert!(row2.contains("ab"), "row2 = {row2:?}");
    }

    #[test]
    fn soft_wrap_consumes_following_rows() {
        // Cursor line wraps over 2 rows, pushing line 2 down.
        let text = format!("{}\nsecond", "x".repeat(30));
        let mut ed = editor_sized(&text, 20, 8);
        ed.options.soft_wrap = true;
        let frame = painted(&ed);
        // 30 x's over a ~17-wide window: rows 1 and 2; "second" on row 3.
        assert!(row_text(&frame, 3).contains("second"));
    }

    // ── Overlays ────────────────────────────────────────────────────────

    #[test]
    fn selection_cells_are_inverse() {
        let mut ed = editor("abcdef");
        {
            let vid = ed.active_edit;
            let (view, buffer) = ed.view_and_buffer_mut(vid);
            view.cursors.drop_anchors_all(buffer);
            let mark = view.cursors.active().mark;
            buffer.set_mark(mark, Position::new(0, 3));
        }
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let x0 = view.rect_buffer.x;
        for i in 0..3 {
            assert!(
                frame.get(x0 + i, 1).unwrap().attrs.contains(Attr::INVERSE),
                "col {i} not inverse"
            );
        }
        assert!(!frame.get(x0 + 3, 1).unwrap().attrs.contains(Attr::INVERSE));
    }

    #[test]
    fn bracket_pair_is_underlined() {
        let ed = editor("(abc)");
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let x0 = view.rect_buffer.x;
        assert!(frame.get(x0, 1).unwrap().attrs.contains(Attr::UNDERLINE));
        assert!(frame.get(x0 + 4, 1).unwrap().attrs.contains(Attr::UNDERLINE));
    }

    #[test]
    fn extra_cursor_is_inverse() {
        let mut ed = editor("aa\nbb");
        {
            let vid = ed.active_edit;
            let (view, buffer) = ed.view_and_buffer_mut(vid);
            view.cursors.add(buffer, Position::new(1, 1));
        }
        let frame = painted(&ed);
        let view = ed.view(ed.active_edit);
        let x0 = view.rect_buffer.x;
        assert!(frame.get(x0 + 1, 2).unwrap().attrs.contains(Attr::INVERSE));
    }

    // ── Status line ─────────────────────────────────────────────────────

    #[test]
    fn status_shows_keymap_and_position() {
        let ed = editor("x");
        let frame = painted(&ed);
        let status = row_text(&frame, ed.height - 1);
        assert!(status.contains("normal"), "status = {status:?}");
        assert!(status.contains("1:1"), "status = {status:?}");
    }

    #[test]
    fn status_error_message_takes_over() {
        let mut ed = editor("x");
        ed.set_error("boom");
        let frame = painted(&ed);
        let status = row_text(&frame, ed.height - 1);
        assert!(status.starts_with("boom"), "status = {status:?}");
    }

    // ── Coordinate mapping ──────────────────────────────────────────────

    #[test]
    fn screen_coords_basic() {
        let ed = editor("abc\ndef");
        let view = ed.view(ed.active_edit);
        let (x, y) = screen_coords(&ed, ed.active_edit, Position::new(1, 2)).unwrap();
        assert_eq!(x, view.rect_buffer.x + 2);
        assert_eq!(y, view.rect_buffer.y + 1);
    }

    #[test]
    fn screen_coords_counts_tabs() {
        let ed = editor("\tx");
        let view = ed.view(ed.active_edit);
        let (x, _) = screen_coords(&ed, ed.active_edit, Position::new(0, 1)).unwrap();
        assert_eq!(x, view.rect_buffer.x + 4);
    }

    #[test]
    fn screen_coords_off_screen_below() {
        let text = "l\n".repeat(50);
        let ed = editor_sized(&text, 30, 6);
        assert_eq!(
            screen_coords(&ed, ed.active_edit, Position::new(40, 0)),
            Err(Error::OffScreen)
        );
    }

    #[test]
    fn active_cursor_coords() {
        let ed = editor("hello");
        let view = ed.view(ed.active_edit);
        let (x, y) = screen_coords_active(&ed).unwrap();
        assert_eq!((x, y), (view.rect_buffer.x, view.rect_buffer.y));
    }
}
