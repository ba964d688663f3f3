// SPDX-License-Identifier: MIT
//
// The editor — state, view tree operations, and the dispatch loop.
//
// One `Editor` owns every arena (buffers, views, keymaps), the command
// registry, macro storage, and the input source. There is no global
// state anywhere; anything a command touches flows through `&mut Editor`.
//
// The dispatch loop is the heartbeat:
//
//   get_input (macro seam) → macro toggle check → trie resolution
//   (DispatchState carries partial matches across iterations) → command
//   invocation (hooks around it) → buffer-change propagation → render
//
// Prompts run a *nested* dispatch loop over the prompt view with its own
// DispatchState, which is how modal questions return answers to the
// command that asked without any callback machinery.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::mem;
use std::path::{Path, PathBuf};

use ode_term::ansi;
use ode_term::diff::DiffRenderer;
use ode_term::frame::Frame;
use ode_term::signal;

use crate::buffer::Buffer;
use crate::command::{CmdContext, CommandRegistry};
use crate::commands;
use crate::error::Error;
use crate::hooks::{EventSink, HookContext, NoopSink};
use crate::key::{resolve_symbolic_key, KeyChord};
use crate::keymap::{DispatchState, Keymap, KmapId, Step, ROOT};
use crate::macros::{MacroBank, Playback};
use crate::options::{LinenumType, Options};
use crate::position::Position;
use crate::render;
use crate::source::{InputSource, SourceEvent};
use crate::view::{BufferId, Rect, View, ViewId, ViewKind};

/// A binding resolution: what to run and with which fixed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub command: String,
    pub static_param: Option<String>,
}

/// The drain side of an external async helper: called once per loop
/// iteration, returns pending output or `None`. The helper itself (a
/// child process, usually) lives outside this crate.
pub type Drain = Box<dyn FnMut() -> Option<String>>;

/// State of one dispatch loop activation. The outer loop has one; every
/// prompt pushes another.
#[derive(Debug, Default)]
struct LoopCtx {
    dispatch: DispatchState,
    should_exit: bool,
    prompt_answer: Option<String>,
}

/// The editor.
pub struct Editor {
    pub options: Options,

    // Screen geometry.
    pub width: u16,
    pub height: u16,
    rect_edit: Rect,
    rect_bottom: Rect,

    // Arenas. Slots are tombstoned on close so ids stay stable.
    buffers: Vec<Option<Buffer>>,
    views: Vec<Option<View>>,
    /// Roots of split trees (the "tab" list). Never empty after startup.
    pub top_views: Vec<ViewId>,
    /// The focused view (may be the prompt).
    pub active: ViewId,
    /// The last focused edit view.
    pub active_edit: ViewId,
    pub status_view: ViewId,
    pub prompt_view: ViewId,

    // Keymaps.
    kmaps: Vec<Keymap>,

    // Commands and hooks.
    pub registry: CommandRegistry,
    sink: Box<dyn EventSink>,

    // Macros.
    pub macros: MacroBank,
    playback: Option<Playback>,
    macro_toggle: KeyChord,

    // Input.
    source: Box<dyn InputSource>,
    /// Chords queued ahead of the source (startup injection).
    injected: VecDeque<KeyChord>,
    /// Non-blocking drains of external helpers (shell/grep processes
    /// live outside this crate). Polled once per loop iteration before
    /// blocking on input.
    drains: Vec<Drain>,

    // Dispatch loops, innermost last.
    loops: Vec<LoopCtx>,
    pub should_quit: bool,
    pub exit_code: i32,

    // Status-line message slots, cleared after one render cycle.
    pub info_message: Option<String>,
    pub error_message: Option<String>,

    // Prompt state.
    prompt_label: String,
    /// Origin of an in-flight incremental search: (view, saved position).
    pub isearch_origin: Option<(ViewId, Position)>,

    // Display plumbing. Headless runs leave `display_enabled` off.
    pub display_enabled: bool,
    frame: Frame,
    renderer: DiffRenderer,
}

impl Editor {
    /// Build an editor: registers the built-in commands and keymaps,
    /// creates the status and prompt views, and opens one scratch edit
    /// view so there is always a top-level view.
    #[must_use]
    pub fn new(options: Options, source: Box<dyn InputSource>, sink: Box<dyn EventSink>) -> Self {
        let macro_toggle = resolve_symbolic_key(&options.macro_toggle_key)
            .unwrap_or_else(|_| resolve_symbolic_key("M-r").expect("default toggle key"));

        let mut ed = Self {
            options,
            width: 0,
            height: 0,
            rect_edit: Rect::default(),
            rect_bottom: Rect::default(),
            buffers: Vec::new(),
            views: Vec::new(),
            top_views: Vec::new(),
            active: 0,
            active_edit: 0,
            status_view: 0,
            prompt_view: 0,
            kmaps: Vec::new(),
            registry: CommandRegistry::new(),
            sink,
            macros: MacroBank::new(),
            playback: None,
            macro_toggle,
            source,
            injected: VecDeque::new(),
            drains: Vec::new(),
            loops: Vec::new(),
            should_quit: false,
            exit_code: 0,
            info_message: None,
            error_message: None,
            prompt_label: String::new(),
            isearch_origin: None,
            display_enabled: false,
            frame: Frame::new(0, 0),
            renderer: DiffRenderer::new(),
        };

        commands::register_builtin(&mut ed.registry);
        for kmap in commands::default_keymaps() {
            ed.add_kmap(kmap);
        }

        // Status and prompt are ordinary views over private buffers.
        ed.status_view = ed.new_view_raw(ViewKind::Status, None);
        ed.prompt_view = ed.new_view_raw(ViewKind::Prompt, None);
        if let Some(id) = ed.kmap_id("prompt_input") {
            ed.views[ed.prompt_view]
                .as_mut()
                .expect("prompt view")
                .kmap_stack
                .push(id);
        }

        // The initial scratch view keeps the editor non-empty.
        let first = ed.open_view(None).expect("scratch view cannot fail");
        ed.active = first;
        ed.active_edit = first;
        ed
    }

    // ── Messages ─────────────────────────────────────────────────────────

    /// Post an informational status message.
    pub fn set_info(&mut self, msg: impl Into<String>) {
        self.info_message = Some(msg.into());
    }

    /// Post an error status message.
    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error_message = Some(msg.into());
    }

    // ── Keymaps ──────────────────────────────────────────────────────────

    /// Register a keymap, returning its id. A keymap with the same name
    /// shadows the old one for future lookups.
    pub fn add_kmap(&mut self, kmap: Keymap) -> KmapId {
        self.kmaps.push(kmap);
        self.kmaps.len() - 1
    }

    /// Latest keymap registered under `name`.
    #[must_use]
    pub fn kmap_id(&self, name: &str) -> Option<KmapId> {
        self.kmaps.iter().rposition(|k| k.name() == name)
    }

    /// Keymap by id.
    #[must_use]
    pub fn kmap(&self, id: KmapId) -> &Keymap {
        &self.kmaps[id]
    }

    /// Add a binding to a registered keymap — the same entry point the
    /// built-in tables use, exposed for CLI/rc definitions.
    ///
    /// # Errors
    ///
    /// Unknown keymap name or unresolvable key token.
    pub fn add_binding(
        &mut self,
        kmap_name: &str,
        pattern: &str,
        command: &str,
        static_param: Option<&str>,
    ) -> Result<(), Error> {
        let id = self
            .kmap_id(kmap_name)
            .ok_or_else(|| Error::NoSuchKeymap(kmap_name.to_string()))?;
        self.kmaps[id].bind(pattern, command, static_param)
    }

    /// Parse a `name,default_cmd,allow_fallthrough` keymap definition.
    ///
    /// # Errors
    ///
    /// Malformed definition strings.
    pub fn add_kmap_str(&mut self, def: &str) -> Result<KmapId, Error> {
        let mut parts = def.splitn(3, ',');
        let name = parts.next().filter(|s| !s.is_empty());
        let default_cmd = parts.next();
        let fallthrough = parts.next();
        match (name, default_cmd, fallthrough) {
            (Some(name), Some(default_cmd), Some(ft)) => {
                let default = (!default_cmd.is_empty()).then_some(default_cmd);
                Ok(self.add_kmap(Keymap::new(name, default, ft.trim() == "1")))
            }
            _ => Err(Error::UnknownKey(def.to_string())),
        }
    }

    /// Parse a `kmap,command,pattern[,param]` binding definition.
    ///
    /// # Errors
    ///
    /// Unknown keymap, unknown key, or malformed string.
    pub fn add_binding_str(&mut self, def: &str) -> Result<(), Error> {
        let mut parts = def.splitn(4, ',');
        let (Some(kmap), Some(cmd), Some(patt)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::UnknownKey(def.to_string()));
        };
        self.add_binding(kmap, patt, cmd, parts.next())
    }

    // ── Arena access ─────────────────────────────────────────────────────

    /// True when `id` names a live view.
    #[must_use]
    pub fn view_exists(&self, id: ViewId) -> bool {
        self.views.get(id).is_some_and(Option::is_some)
    }

    /// A live view. Panics on a dead id — callers go through
    /// [`view_exists`](Self::view_exists) or hold ids they own.
    #[must_use]
    pub fn view(&self, id: ViewId) -> &View {
        self.views[id].as_ref().expect("live view id")
    }

    /// A live view, mutably.
    pub fn view_mut(&mut self, id: ViewId) -> &mut View {
        self.views[id].as_mut().expect("live view id")
    }

    /// A live buffer.
    #[must_use]
    pub fn buffer(&self, id: BufferId) -> &Buffer {
        self.buffers[id].as_ref().expect("live buffer id")
    }

    /// A live buffer, mutably.
    pub fn buffer_mut(&mut self, id: BufferId) -> &mut Buffer {
        self.buffers[id].as_mut().expect("live buffer id")
    }

    /// The view and its buffer, both mutable (disjoint arenas).
    pub fn view_and_buffer_mut(&mut self, id: ViewId) -> (&mut View, &mut Buffer) {
        let view = self.views[id].as_mut().expect("live view id");
        let buffer = self.buffers[view.buffer].as_mut().expect("live buffer id");
        (view, buffer)
    }

    /// How many views (of any kind) display `buffer` — the reference
    /// count that decides when a buffer dies.
    #[must_use]
    pub fn count_views_of_buffer(&self, buffer: BufferId) -> usize {
        self.views
            .iter()
            .flatten()
            .filter(|v| v.buffer == buffer)
            .count()
    }

    /// Ids of all live views, in arena order.
    #[must_use]
    pub fn all_view_ids(&self) -> Vec<ViewId> {
        self.views
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|_| i))
            .collect()
    }

    fn add_buffer(&mut self, buf: Buffer) -> BufferId {
        if let Some(slot) = self.buffers.iter().position(Option::is_none) {
            self.buffers[slot] = Some(buf);
            slot
        } else {
            self.buffers.push(Some(buf));
            self.buffers.len() - 1
        }
    }

    fn add_view(&mut self, view: View) -> ViewId {
        if let Some(slot) = self.views.iter().position(Option::is_none) {
            self.views[slot] = Some(view);
            slot
        } else {
            self.views.push(Some(view));
            self.views.len() - 1
        }
    }

    /// Create a view over a fresh buffer without touching the top list.
    fn new_view_raw(&mut self, kind: ViewKind, buf: Option<Buffer>) -> ViewId {
        let bid = self.add_buffer(buf.unwrap_or_default());
        let tab_width = self.options.tab_width;
        let buffer = self.buffers[bid].as_mut().expect("fresh buffer");
        buffer.set_tab_width(tab_width);
        let mut view = View::new(kind, bid, buffer);
        view.viewport_scope_x = self.options.scope_x;
        view.viewport_scope_y = self.options.scope_y;
        self.add_view(view)
    }

    // ── View lifecycle ───────────────────────────────────────────────────

    /// Open an edit view. A `path` of `None` opens a scratch buffer; a
    /// path that fails to read degrades to a scratch buffer plus an
    /// error message (never fatal). `path:NN` suffixes become a startup
    /// line jump applied on the first resize.
    ///
    /// # Errors
    ///
    /// Currently infallible; `Result` mirrors the other lifecycle calls.
    pub fn open_view(&mut self, path: Option<&Path>) -> Result<ViewId, Error> {
        let (buf, startup_line) = match path {
            None => (None, None),
            Some(p) => {
                let (real, line) = split_startup_line(p);
                match Buffer::from_file(&real) {
                    Ok(b) => (Some(b), line),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        // New file: empty buffer that saves to the path.
                        let mut b = Buffer::new();
                        b.set_path(real);
                        (Some(b), line)
                    }
                    Err(e) => {
                        self.set_error(format!("open failed: {e}"));
                        (None, None)
                    }
                }
            }
        };

        let id = self.new_view_raw(ViewKind::Edit, buf);
        if let Some(kmap) = self.kmap_id(&self.options.initial_keymap.clone()) {
            self.views[id].as_mut().expect("new view").kmap_stack.push(kmap);
        }
        self.views[id].as_mut().expect("new view").startup_line = startup_line;
        self.top_views.push(id);
        self.active = id;
        self.active_edit = id;

        if self.width > 0 {
            self.resize_view(id, self.rect_edit);
        }
        Ok(id)
    }

    /// Focus a view.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchView`] when `id` is not live.
    pub fn set_active(&mut self, id: ViewId) -> Result<(), Error> {
        if !self.view_exists(id) {
            return Err(Error::NoSuchView);
        }
        self.active = id;
        if self.view(id).is_edit() {
            self.active_edit = id;
        }
        Ok(())
    }

    /// Split a view. The child shares the buffer, clones the active
    /// cursor position, and centers its viewport on it; the parent keeps
    /// `factor` of the split dimension.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadySplit`] / [`Error::NotAnEditView`].
    pub fn split_view(
        &mut self,
        id: ViewId,
        is_vertical: bool,
        factor: f32,
    ) -> Result<ViewId, Error> {
        if !self.view_exists(id) {
            return Err(Error::NoSuchView);
        }
        if self.view(id).split_child.is_some() {
            return Err(Error::AlreadySplit);
        }
        if !self.view(id).is_edit() {
            return Err(Error::NotAnEditView);
        }

        let bid = self.view(id).buffer;
        let cursor_pos = {
            let view = self.view(id);
            self.buffer(bid).mark(view.cursors.active().mark)
        };

        // Child over the *same* buffer.
        let child = {
            let buffer = self.buffers[bid].as_mut().expect("live buffer id");
            let mut v = View::new(ViewKind::Edit, bid, buffer);
            v.viewport_scope_x = self.options.scope_x;
            v.viewport_scope_y = self.options.scope_y;
            v.split_parent = Some(id);
            self.add_view(v)
        };
        if let Some(kmap) = self.kmap_id(&self.options.initial_keymap.clone()) {
            self.views[child].as_mut().expect("child view").kmap_stack.push(kmap);
        }

        {
            let parent = self.views[id].as_mut().expect("live view id");
            parent.split_child = Some(child);
            parent.split_factor = factor.clamp(0.05, 0.95);
            parent.split_is_vertical = is_vertical;
        }

        // Same cursor position in the child.
        {
            let (view, buffer) = self.view_and_buffer_mut(child);
            let mark = view.cursors.active().mark;
            buffer.set_mark(mark, cursor_pos);
        }

        // Re-carve the parent's rectangle; the child gets the rest.
        let rect = {
            let p = self.view(id);
            Rect::new(p.x, p.y, p.w, p.h)
        };
        if self.width > 0 {
            self.resize_view(id, rect);
        }
        {
            let (view, buffer) = self.view_and_buffer_mut(child);
            view.center_viewport_y(buffer, cursor_pos.line);
        }

        self.set_active(child)?;
        Ok(child)
    }

    /// Close a view: its split child first (recursively), then itself.
    /// Un-splits into the parent when one exists; otherwise activates a
    /// sibling top-level view or opens a fresh scratch view — the editor
    /// never reaches zero top-level views.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchView`] when `id` is not live.
    pub fn close_view(&mut self, id: ViewId) -> Result<(), Error> {
        if !self.view_exists(id) {
            return Err(Error::NoSuchView);
        }

        if let Some(child) = self.view(id).split_child {
            self.close_view(child)?;
        }

        let parent = self.view(id).split_parent;
        let bid = self.view(id).buffer;

        // Tear down: release marks, tombstone the slot.
        {
            let mut view = self.views[id].take().expect("live view id");
            let buffer = self.buffers[bid].as_mut().expect("live buffer id");
            view.cursors.release_all(buffer);
        }
        self.top_views.retain(|&v| v != id);

        // Last reference drops the buffer.
        if self.count_views_of_buffer(bid) == 0 {
            self.buffers[bid] = None;
        }

        if let Some(p) = parent {
            self.views[p].as_mut().expect("split parent").split_child = None;
            let rect = {
                let v = self.view(p);
                Rect::new(v.x, v.y, v.w, v.h)
            };
            if self.width > 0 {
                self.resize_view(p, rect);
            }
            self.set_active(p)?;
        } else if self.active == id || !self.view_exists(self.active) {
            if let Some(&sibling) = self.top_views.first() {
                self.set_active(sibling)?;
            } else {
                self.open_view(None)?;
            }
        }
        Ok(())
    }

    // ── Resize and layout ────────────────────────────────────────────────

    /// Screen resize: re-carve every top-level split tree plus the
    /// bottom status/prompt line.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.rect_edit = Rect::new(0, 0, width, height.saturating_sub(1));
        self.rect_bottom = Rect::new(0, height.saturating_sub(1), width, 1);
        self.frame.resize(width, height);
        self.renderer.force_redraw();

        for id in self.top_views.clone() {
            self.resize_view(id, self.rect_edit);
        }
        let bottom = self.rect_bottom;
        self.resize_view(self.status_view, bottom);
        self.resize_view(self.prompt_view, bottom);
        log::debug!("resize to {width}x{height}");
    }

    /// Assign `rect` to a view: carve caption/gutter/margins/buffer
    /// rectangles, recurse into the split child with the complementary
    /// rectangle, fire the one-time initial-resize hook, and rectify.
    pub fn resize_view(&mut self, id: ViewId, rect: Rect) {
        if !self.view_exists(id) {
            return;
        }
        let linenum = self.options.linenum;
        let line_count = {
            let bid = self.view(id).buffer;
            self.buffer(bid).line_count()
        };

        let (child, child_rect) = {
            let view = self.views[id].as_mut().expect("live view id");
            view.x = rect.x;
            view.y = rect.y;
            view.w = rect.w;
            view.h = rect.h;

            // The parent's retained share of the split dimension.
            let (mut aw, mut ah) = (rect.w, rect.h);
            if view.split_child.is_some() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                if view.split_is_vertical {
                    aw = ((f32::from(rect.w) * view.split_factor) as u16).max(1);
                } else {
                    ah = ((f32::from(rect.h) * view.split_factor) as u16).max(1);
                }
            }

            if view.kind == ViewKind::Edit {
                view.set_linenum_width(line_count, linenum);
                let lw = if linenum == LinenumType::None {
                    0
                } else {
                    view.linenum_width
                };
                view.rect_caption = Rect::new(rect.x, rect.y, aw, 1);
                view.rect_lines = Rect::new(rect.x, rect.y + 1, lw, ah.saturating_sub(1));
                view.rect_margin_left =
                    Rect::new(rect.x + lw, rect.y + 1, 1, ah.saturating_sub(1));
                view.rect_buffer = Rect::new(
                    rect.x + lw + 1,
                    rect.y + 1,
                    aw.saturating_sub(lw + 2),
                    ah.saturating_sub(1),
                );
                view.rect_margin_right = Rect::new(
                    rect.x + aw.saturating_sub(1),
                    rect.y + 1,
                    1,
                    ah.saturating_sub(1),
                );
            } else {
                view.rect_buffer = Rect::new(rect.x, rect.y, aw, ah);
            }

            let child = view.split_child;
            let child_rect = if view.split_is_vertical {
                Rect::new(rect.x + aw, rect.y, rect.w.saturating_sub(aw), rect.h)
            } else {
                Rect::new(rect.x, rect.y + ah, rect.w, rect.h.saturating_sub(ah))
            };
            (child, child_rect)
        };

        if let Some(child) = child {
            self.resize_view(child, child_rect);
        }

        // One-time initial-resize hook: the startup line jump.
        let startup = {
            let view = self.views[id].as_mut().expect("live view id");
            if view.is_resized {
                None
            } else {
                view.is_resized = true;
                view.startup_line.take()
            }
        };
        if let Some(line) = startup {
            let (view, buffer) = self.view_and_buffer_mut(id);
            let mark = view.cursors.active().mark;
            buffer.set_mark(mark, Position::new(line.saturating_sub(1), 0));
            let pos = buffer.mark(mark);
            view.center_viewport_y(buffer, pos.line);
        }

        self.rectify_view(id);
    }

    /// Rectify a view's viewport against its active cursor.
    pub fn rectify_view(&mut self, id: ViewId) -> bool {
        if !self.view_exists(id) {
            return false;
        }
        let (view, buffer) = self.view_and_buffer_mut(id);
        view.rectify_viewport(buffer)
    }

    // ── Buffer-change propagation ────────────────────────────────────────

    /// Drain every buffer's action queue: rectify the active view when
    /// its buffer changed, and when a line count changed, recompute the
    /// gutter for every view of that buffer (re-carving on width change).
    /// Runs synchronously before the next frame renders.
    pub fn propagate_buffer_changes(&mut self) {
        for bid in 0..self.buffers.len() {
            let Some(buf) = self.buffers[bid].as_mut() else {
                continue;
            };
            let actions = buf.take_actions();
            if actions.is_empty() {
                continue;
            }
            let line_changed = actions.iter().any(|a| a.line_delta != 0);

            if self.view_exists(self.active) && self.view(self.active).buffer == bid {
                self.rectify_view(self.active);
            }

            if line_changed {
                let line_count = self.buffer(bid).line_count();
                let linenum = self.options.linenum;
                for vid in self.all_view_ids() {
                    if self.view(vid).buffer != bid {
                        continue;
                    }
                    let (changed, rect) = {
                        let view = self.views[vid].as_mut().expect("live view id");
                        (
                            view.set_linenum_width(line_count, linenum),
                            Rect::new(view.x, view.y, view.w, view.h),
                        )
                    };
                    if changed {
                        self.resize_view(vid, rect);
                    } else {
                        self.rectify_view(vid);
                    }
                }
            }
        }
    }

    // ── Input and macros ─────────────────────────────────────────────────

    /// Queue chords ahead of the source (startup bindings replay).
    pub fn inject_input(&mut self, chords: impl IntoIterator<Item = KeyChord>) {
        self.injected.extend(chords);
    }

    /// Attach an external helper's drain.
    pub fn add_drain(&mut self, drain: Drain) {
        self.drains.push(drain);
    }

    /// Tear down all attached helpers (the menu-cancel path).
    pub fn clear_drains(&mut self) {
        self.drains.clear();
    }

    /// Poll every drain once. Output is appended to the focused edit
    /// view's buffer. Returns whether anything arrived — the loop then
    /// restarts instead of blocking for a key.
    fn poll_drains(&mut self) -> bool {
        let mut collected = String::new();
        for drain in &mut self.drains {
            while let Some(chunk) = drain() {
                collected.push_str(&chunk);
            }
        }
        if collected.is_empty() {
            return false;
        }
        if self.view_exists(self.active_edit) {
            let bid = self.view(self.active_edit).buffer;
            let end = self.buffer(bid).end_position();
            self.buffer_mut(bid).insert(end, &collected);
        }
        true
    }

    /// Begin playback of a stored macro.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchMacro`] when `name` is not recorded.
    pub fn apply_macro(&mut self, name: &str) -> Result<(), Error> {
        let mac = self
            .macros
            .get(name)
            .ok_or_else(|| Error::NoSuchMacro(name.to_string()))?;
        self.playback = Some(Playback::new(mac.inputs.clone()));
        Ok(())
    }

    /// The get-next-input seam. Macro playback substitutes for the live
    /// source until exhausted; everything that passes through here is
    /// recorded when a recording is open. Returns the event and whether
    /// it came from the real source.
    fn get_input(&mut self) -> (SourceEvent, bool) {
        if let Some(pb) = &mut self.playback {
            if let Some(chord) = pb.next() {
                self.macros.record(chord);
                return (SourceEvent::Chord(chord), false);
            }
            self.playback = None;
        }

        if let Some(chord) = self.injected.pop_front() {
            self.macros.record(chord);
            return (SourceEvent::Chord(chord), false);
        }

        let ev = self.source.next();
        if let SourceEvent::Chord(chord) = ev {
            self.macros.record(chord);
        }
        (ev, matches!(ev, SourceEvent::Chord(_)))
    }

    /// Intercept the macro toggle chord before trie dispatch. Returns
    /// true when the chord was the toggle (and is consumed).
    fn maybe_toggle_macro(&mut self, chord: KeyChord) -> bool {
        if chord != self.macro_toggle {
            return false;
        }
        if self.macros.is_recording() {
            // The toggle chord was recorded on the way in; stop drops it.
            self.macros.stop_recording();
            self.set_info("macro recorded");
        } else {
            match self.prompt("record_macro: name?", "prompt_input") {
                Some(name) if !name.is_empty() => {
                    self.macros.start_recording(&name);
                    self.set_info(format!("recording macro '{name}'"));
                }
                _ => {}
            }
        }
        true
    }

    // ── Binding resolution ───────────────────────────────────────────────

    /// Resolve one chord against the active view's keymap stack.
    ///
    /// Live dispatch carries the current loop's `DispatchState` across
    /// calls; peek mode uses a throwaway state, matching only exact
    /// edges, so look-ahead cannot disturb an in-progress sequence.
    pub fn resolve_binding(&mut self, chord: KeyChord, is_peek: bool) -> Option<ResolvedBinding> {
        let stack = self.views.get(self.active)?.as_ref()?.kmap_stack.clone();
        if stack.is_empty() {
            return None;
        }

        let mut throwaway = DispatchState::new();
        let state = if is_peek {
            &mut throwaway
        } else {
            &mut self.loops.last_mut()?.dispatch
        };

        let pending = if is_peek { None } else { state.pending.take() };
        if !is_peek {
            state.need_more_input = false;
        }

        let mut stack_pos = stack.len() - 1;
        let (mut kmap_id, mut node) = match pending {
            Some((k, n)) => (k, n),
            None => (stack[stack_pos], ROOT),
        };

        loop {
            let kmap = &self.kmaps[kmap_id];
            match kmap.lookup_step(node, chord, state, is_peek) {
                Step::Again => {
                    if !is_peek {
                        state.need_more_input = true;
                        state.pending = Some((kmap_id, node));
                    }
                    return None;
                }
                Step::Node(id) => {
                    if let Some(leaf) = kmap.leaf(id) {
                        return Some(ResolvedBinding {
                            command: leaf.command.clone(),
                            static_param: leaf.static_param.clone(),
                        });
                    }
                    if kmap.has_children(id) {
                        if !is_peek {
                            state.need_more_input = true;
                            state.pending = Some((kmap_id, id));
                        }
                        return None;
                    }
                    return None;
                }
                Step::Miss => {
                    // Only a miss at a keymap *root* may fall back; a
                    // mid-sequence miss discards the chord.
                    if node == ROOT {
                        if let Some(default) = &kmap.default_command {
                            return Some(ResolvedBinding {
                                command: default.clone(),
                                static_param: None,
                            });
                        }
                        if kmap.allow_fallthrough && stack_pos > 0 {
                            stack_pos -= 1;
                            kmap_id = stack[stack_pos];
                            node = ROOT;
                            continue;
                        }
                    }
                    return None;
                }
            }
        }
    }

    /// Greedily peek already-buffered input after a live insert resolved:
    /// every successive chord that would resolve to the same insert
    /// command is consumed into the paste batch; the first that would
    /// not stays queued and replays as the next normal input.
    fn ingest_paste(&mut self, ctx: &mut CmdContext) {
        loop {
            let Some(chord) = self.source.peek() else {
                break;
            };
            if chord == self.macro_toggle {
                break;
            }
            let resolves_to_insert = self
                .resolve_binding(chord, true)
                .is_some_and(|r| r.command == commands::INSERT_DATA);
            if resolves_to_insert {
                ctx.pastebuf.push(chord);
                self.source.consume_peeked();
                // Batched chords still belong in an open recording.
                self.macros.record(chord);
            } else {
                break;
            }
        }
        if !ctx.pastebuf.is_empty() {
            log::debug!("coalesced paste of {} chords", ctx.pastebuf.len() + 1);
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    /// Dispatch one chord: resolve, invoke with hooks, reset state.
    fn dispatch_chord(&mut self, chord: KeyChord, is_user: bool) {
        let Some(resolved) = self.resolve_binding(chord, false) else {
            let Some(cur) = self.loops.last_mut() else {
                return;
            };
            if !cur.dispatch.need_more_input {
                // Unmatched chord: discard silently, reset to idle.
                log::debug!("unmatched chord {chord}");
                cur.dispatch.reset();
                cur.dispatch.clear_params();
            }
            return;
        };

        let Some(func) = self.registry.resolve(&resolved.command) else {
            // Named command is gone (unregistered): treated as a miss.
            log::debug!("binding names unknown command {}", resolved.command);
            if let Some(cur) = self.loops.last_mut() {
                cur.dispatch.reset();
                cur.dispatch.clear_params();
            }
            return;
        };

        let mut ctx = CmdContext::new(chord);
        ctx.static_param = resolved.static_param.clone();
        ctx.is_user_input = is_user;
        if let Some(cur) = self.loops.last_mut() {
            ctx.numeric_params = mem::take(&mut cur.dispatch.numeric_params);
            ctx.wildcard_params = mem::take(&mut cur.dispatch.wildcard_params);
        }

        if is_user && resolved.command == commands::INSERT_DATA {
            commands::delete_active_selection(self);
            self.ingest_paste(&mut ctx);
        }

        let hook_ctx = HookContext {
            command: resolved.command.clone(),
            input: chord,
            static_param: resolved.static_param,
        };
        let external = !resolved.command.starts_with('_');

        if external {
            self.with_sink(|sink, ctx| sink.before(ctx), &hook_ctx);
        }
        if let Err(e) = func(self, &mut ctx) {
            self.set_error(e.to_string());
        }
        if external {
            self.with_sink(|sink, ctx| sink.after(ctx), &hook_ctx);
        }

        if let Some(cur) = self.loops.last_mut() {
            cur.dispatch.reset();
            cur.dispatch.clear_params();
        }
    }

    /// Run a hook with the sink temporarily detached, so the sink can
    /// never re-enter a half-borrowed editor.
    fn with_sink(&mut self, f: impl FnOnce(&mut dyn EventSink, &HookContext), ctx: &HookContext) {
        let mut sink = mem::replace(&mut self.sink, Box::new(NoopSink));
        f(sink.as_mut(), ctx);
        self.sink = sink;
    }

    // ── Loops ────────────────────────────────────────────────────────────

    /// The outer dispatch loop. Returns when the editor quits or the
    /// input source is exhausted.
    pub fn run_loop(&mut self) {
        self.loops.push(LoopCtx::default());
        self.run_current_loop();
        self.loops.pop();
    }

    fn run_current_loop(&mut self) {
        loop {
            if self.should_quit || self.loops.last().is_none_or(|l| l.should_exit) {
                break;
            }
            if signal::fatal_pending() {
                self.emergency_backup();
                self.should_quit = true;
                self.exit_code = 1;
                break;
            }

            self.propagate_buffer_changes();
            self.display();

            // External helpers drain before we block on input; fresh
            // output restarts the iteration to keep the UI live.
            if self.poll_drains() {
                continue;
            }

            let (event, is_user) = self.get_input();
            match event {
                SourceEvent::Chord(chord) => {
                    if self.maybe_toggle_macro(chord) {
                        continue;
                    }
                    self.dispatch_chord(chord, is_user);
                }
                SourceEvent::Resize(w, h) => self.resize(w, h),
                SourceEvent::Eof => break,
            }
        }
        // Mutations from the final command still propagate (headless
        // runs assert on this state).
        self.propagate_buffer_changes();
    }

    /// Ask a modal question through the prompt view, running a nested
    /// dispatch loop under `kmap_name` until a prompt command answers.
    /// Returns `None` on cancel or input exhaustion.
    pub fn prompt(&mut self, label: &str, kmap_name: &str) -> Option<String> {
        let prompt_view = self.prompt_view;
        let kmap = self.kmap_id(kmap_name)?;

        // Reset the prompt buffer.
        {
            let (view, buffer) = self.view_and_buffer_mut(prompt_view);
            let end = buffer.end_position();
            buffer.delete(crate::position::Range::new(Position::ZERO, end));
            let _ = buffer.take_actions();
            let mark = view.cursors.active().mark;
            buffer.set_mark(mark, Position::ZERO);
        }

        let prev_active = self.active;
        let prev_label = mem::replace(&mut self.prompt_label, label.to_string());
        self.views[prompt_view]
            .as_mut()
            .expect("prompt view")
            .kmap_stack
            .push(kmap);
        self.active = prompt_view;

        self.loops.push(LoopCtx::default());
        self.run_current_loop();
        let ctx = self.loops.pop().unwrap_or_default();

        let _ = self
            .views[prompt_view]
            .as_mut()
            .expect("prompt view")
            .pop_kmap();
        self.active = prev_active;
        self.prompt_label = prev_label;
        ctx.prompt_answer
    }

    /// The prompt view's current input text.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        let bid = self.view(self.prompt_view).buffer;
        let buf = self.buffer(bid);
        let end = buf.end_position();
        buf.text_of(crate::position::Range::new(Position::ZERO, end))
    }

    /// The prompt label shown while a prompt is active.
    #[must_use]
    pub fn prompt_label(&self) -> &str {
        &self.prompt_label
    }

    /// Answer the innermost prompt loop and exit it. Called by prompt
    /// commands.
    pub fn finish_prompt(&mut self, answer: Option<String>) {
        if let Some(cur) = self.loops.last_mut() {
            cur.prompt_answer = answer;
            cur.should_exit = true;
        }
    }

    /// True while a prompt loop is active.
    #[must_use]
    pub fn in_prompt(&self) -> bool {
        self.loops.len() > 1
    }

    // ── Display ──────────────────────────────────────────────────────────

    /// Attach the screen: enables painting through the diff renderer.
    pub fn enable_display(&mut self) {
        self.display_enabled = true;
    }

    fn display(&mut self) {
        if !self.display_enabled || self.width == 0 {
            return;
        }
        let mut frame = mem::replace(&mut self.frame, Frame::new(0, 0));
        frame.clear();
        render::draw_editor(self, &mut frame);
        self.frame = frame;
        self.renderer.render(&self.frame);
        if let Err(e) = self.renderer.flush() {
            log::error!("render flush failed: {e}");
        }

        // Hardware cursor follows the active view's cursor.
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Ok((x, y)) = render::screen_coords_active(self) {
            let _ = ansi::cursor_to(&mut lock, x, y);
            let _ = ansi::cursor_show(&mut lock);
        } else {
            let _ = ansi::cursor_hide(&mut lock);
        }
        let _ = lock.flush();

        // Message slots live for exactly one render cycle.
        self.info_message = None;
        self.error_message = None;
    }

    // ── Emergency backup ─────────────────────────────────────────────────

    /// Best-effort write of every dirty edit buffer to a backup path.
    /// Runs at the loop's safe point after a fatal signal flag, never
    /// inside the handler.
    pub fn emergency_backup(&mut self) {
        let pid = std::process::id();
        let mut dirty: Vec<BufferId> = self
            .all_view_ids()
            .into_iter()
            .filter(|&v| self.view(v).is_edit())
            .map(|v| self.view(v).buffer)
            .filter(|&b| self.buffer(b).is_dirty())
            .collect();
        dirty.sort_unstable();
        dirty.dedup();

        for (n, bid) in dirty.into_iter().enumerate() {
            let path = PathBuf::from(format!(".ode.bak.{pid}.{n}"));
            match self.buffer(bid).save_to(&path) {
                Ok(()) => log::warn!("backed up dirty buffer to {}", path.display()),
                Err(e) => log::error!("backup failed: {e}"),
            }
        }
    }
}

/// Split a `path:NN` suffix off a path argument.
fn split_startup_line(path: &Path) -> (PathBuf, Option<usize>) {
    let s = path.to_string_lossy();
    if let Some((head, tail)) = s.rsplit_once(':') {
        if !head.is_empty() {
            if let Ok(line) = tail.parse::<usize>() {
                return (PathBuf::from(head), Some(line));
            }
        }
    }
    (path.to_path_buf(), None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedSource;

    fn chords(s: &str) -> Vec<KeyChord> {
        s.chars().map(KeyChord::ch).collect()
    }

    fn key(s: &str) -> KeyChord {
        resolve_symbolic_key(s).unwrap()
    }

    /// A headless editor over scripted input, already sized.
    fn editor_with(input: Vec<KeyChord>) -> Editor {
        let mut options = Options::default();
        options.headless = true;
        let mut ed = Editor::new(
            options,
            Box::new(ScriptedSource::new(input)),
            Box::new(NoopSink),
        );
        ed.resize(80, 24);
        ed
    }

    fn active_text(ed: &Editor) -> String {
        let bid = ed.view(ed.active_edit).buffer;
        ed.buffer(bid).contents()
    }

    fn active_cursor(ed: &Editor) -> Position {
        let view = ed.view(ed.active_edit);
        ed.buffer(view.buffer).mark(view.cursors.active().mark)
    }

    // ── Startup shape ───────────────────────────────────────────────────

    #[test]
    fn starts_with_one_scratch_view() {
        let ed = editor_with(vec![]);
        assert_eq!(ed.top_views.len(), 1);
        assert!(ed.view(ed.active).is_edit());
        assert_eq!(active_text(&ed), "");
    }

    #[test]
    fn status_and_prompt_views_exist() {
        let ed = editor_with(vec![]);
        assert_eq!(ed.view(ed.status_view).kind, ViewKind::Status);
        assert_eq!(ed.view(ed.prompt_view).kind, ViewKind::Prompt);
    }

    // ── Typing through the loop ─────────────────────────────────────────

    #[test]
    fn typed_text_lands_in_buffer() {
        let mut ed = editor_with(chords("hi"));
        ed.run_loop();
        assert_eq!(active_text(&ed), "hi");
        assert_eq!(active_cursor(&ed), Position::new(0, 2));
    }

    #[test]
    fn enter_inserts_newline() {
        let mut input = chords("ab");
        input.push(key("enter"));
        input.extend(chords("c"));
        let mut ed = editor_with(input);
        ed.run_loop();
        assert_eq!(active_text(&ed), "ab\nc");
    }

    #[test]
    fn paste_coalescing_batches_inserts() {
        // All buffered printable chords resolve to insert_data and are
        // consumed in one command; the trailing motion stays separate.
        let mut input = chords("paste");
        input.push(key("left"));
        let mut ed = editor_with(input);
        ed.run_loop();
        assert_eq!(active_text(&ed), "paste");
        // Cursor moved left once after the single batched insert.
        assert_eq!(active_cursor(&ed), Position::new(0, 4));
    }

    // ── Binding resolution scenarios ────────────────────────────────────

    #[test]
    fn ctrl_x_resolves_to_close() {
        let mut ed = editor_with(vec![]);
        ed.loops.push(LoopCtx::default());
        let resolved = ed.resolve_binding(key("C-x"), false).unwrap();
        assert_eq!(resolved.command, "close");
        assert_eq!(resolved.static_param, None);
        ed.loops.pop();
    }

    #[test]
    fn wildcard_scenario_captures_chord() {
        let mut ed = editor_with(vec![]);
        ed.loops.push(LoopCtx::default());
        assert!(ed.resolve_binding(key("M-'"), false).is_none());
        assert!(ed.loops.last().unwrap().dispatch.need_more_input);
        let resolved = ed.resolve_binding(KeyChord::ch('q'), false).unwrap();
        assert_eq!(resolved.command, "move_until_forward");
        assert_eq!(ed.loops.last().unwrap().dispatch.wildcard_params, vec!['q']);
        ed.loops.pop();
    }

    #[test]
    fn unbound_control_chord_is_discarded() {
        let mut input = vec![key("C-]")];
        input.extend(chords("ok"));
        let mut ed = editor_with(input);
        ed.run_loop();
        assert_eq!(active_text(&ed), "ok");
    }

    // ── Fallthrough law ─────────────────────────────────────────────────

    #[test]
    fn fallthrough_continues_into_lower_keymap() {
        let mut ed = editor_with(vec![]);
        let mut upper = Keymap::new("upper", None, true);
        upper.bind("C-a", "_upper_only", None).unwrap();
        let upper_id = ed.add_kmap(upper);
        ed.view_mut(ed.active).push_kmap(upper_id);

        ed.loops.push(LoopCtx::default());
        // C-b misses in `upper`, falls through to `normal`, which binds
        // it to a motion.
        let resolved = ed.resolve_binding(key("C-b"), false).unwrap();
        assert_eq!(resolved.command, "move_word_back");
        ed.loops.pop();
    }

    #[test]
    fn no_fallthrough_blocks_lower_keymap() {
        let mut ed = editor_with(vec![]);
        let sealed = Keymap::new("sealed", None, false);
        let sealed_id = ed.add_kmap(sealed);
        ed.view_mut(ed.active).push_kmap(sealed_id);

        ed.loops.push(LoopCtx::default());
        // `normal` would match C-b, but `sealed` refuses to fall through.
        assert!(ed.resolve_binding(key("C-b"), false).is_none());
        ed.loops.pop();
    }

    #[test]
    fn default_command_consumes_root_miss() {
        let mut ed = editor_with(vec![]);
        ed.loops.push(LoopCtx::default());
        let resolved = ed.resolve_binding(KeyChord::ch('z'), false).unwrap();
        assert_eq!(resolved.command, commands::INSERT_DATA);
        ed.loops.pop();
    }

    // ── Macro round-trip ────────────────────────────────────────────────

    #[test]
    fn macro_record_and_replay_roundtrip() {
        // Record "abc" under the name "m" (toggle, name, enter, a b c,
        // toggle), then apply: text appears twice, in order.
        let toggle = key("M-r");
        let mut input = vec![toggle];
        input.extend(chords("m"));
        input.push(key("enter"));
        input.extend(chords("abc"));
        input.push(toggle);
        let mut ed = editor_with(input);
        ed.run_loop();

        assert_eq!(active_text(&ed), "abc");
        assert_eq!(ed.macros.get("m").unwrap().inputs, chords("abc"));

        ed.apply_macro("m").unwrap();
        ed.run_loop();
        assert_eq!(active_text(&ed), "abcabc");
    }

    #[test]
    fn macro_toggle_chord_not_stored_in_macro() {
        let toggle = key("M-r");
        let mut input = vec![toggle];
        input.extend(chords("x"));
        input.push(key("enter"));
        input.extend(chords("hi"));
        input.push(toggle);
        let mut ed = editor_with(input);
        ed.run_loop();
        let mac = ed.macros.get("x").unwrap();
        assert!(!mac.inputs.contains(&toggle));
        assert_eq!(mac.inputs, chords("hi"));
    }

    #[test]
    fn apply_unknown_macro_errors() {
        let mut ed = editor_with(vec![]);
        assert_eq!(
            ed.apply_macro("nope"),
            Err(Error::NoSuchMacro("nope".into()))
        );
    }

    // ── Split / close lifecycle ─────────────────────────────────────────

    #[test]
    fn split_links_parent_and_child() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        assert_eq!(ed.view(parent).split_child, Some(child));
        assert_eq!(ed.view(child).split_parent, Some(parent));
        assert_eq!(ed.active, child);
        // Same buffer, cloned cursor.
        assert_eq!(ed.view(parent).buffer, ed.view(child).buffer);
    }

    #[test]
    fn split_twice_fails() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        ed.split_view(parent, false, 0.5).unwrap();
        assert_eq!(
            ed.split_view(parent, false, 0.5),
            Err(Error::AlreadySplit)
        );
    }

    #[test]
    fn split_non_edit_fails() {
        let mut ed = editor_with(vec![]);
        let status = ed.status_view;
        assert_eq!(
            ed.split_view(status, true, 0.5),
            Err(Error::NotAnEditView)
        );
    }

    #[test]
    fn close_child_unsplits_parent() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        ed.close_view(child).unwrap();
        assert_eq!(ed.view(parent).split_child, None);
        assert_eq!(ed.active, parent);
        assert!(!ed.view_exists(child));
    }

    #[test]
    fn close_parent_closes_whole_chain() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        let grandchild = ed.split_view(child, false, 0.5).unwrap();
        ed.close_view(parent).unwrap();
        assert!(!ed.view_exists(parent));
        assert!(!ed.view_exists(child));
        assert!(!ed.view_exists(grandchild));
        // A fresh scratch view keeps the editor non-empty.
        assert_eq!(ed.top_views.len(), 1);
        assert!(ed.view_exists(ed.active));
    }

    #[test]
    fn split_tree_stays_acyclic() {
        let mut ed = editor_with(vec![]);
        let root = ed.active;
        let a = ed.split_view(root, true, 0.5).unwrap();
        let b = ed.split_view(a, false, 0.5).unwrap();
        let c = ed.split_view(b, true, 0.4).unwrap();

        // Walk child links from the root: must terminate, no repeats.
        let mut seen = vec![];
        let mut cur = Some(root);
        while let Some(id) = cur {
            assert!(!seen.contains(&id), "cycle through view {id}");
            seen.push(id);
            cur = ed.view(id).split_child;
        }
        assert_eq!(seen, vec![root, a, b, c]);

        // Every non-root has exactly its one parent link.
        assert_eq!(ed.view(a).split_parent, Some(root));
        assert_eq!(ed.view(b).split_parent, Some(a));
        assert_eq!(ed.view(c).split_parent, Some(b));
    }

    #[test]
    fn close_middle_then_shape_holds() {
        let mut ed = editor_with(vec![]);
        let root = ed.active;
        let a = ed.split_view(root, true, 0.5).unwrap();
        let b = ed.split_view(a, false, 0.5).unwrap();
        // Closing `a` closes `b` first (recursive), then unsplits root.
        ed.close_view(a).unwrap();
        assert!(!ed.view_exists(b));
        assert_eq!(ed.view(root).split_child, None);
        assert_eq!(ed.active, root);
    }

    #[test]
    fn buffer_dies_with_last_view() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let bid = ed.view(parent).buffer;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        ed.close_view(child).unwrap();
        // Parent still references the buffer.
        assert_eq!(ed.count_views_of_buffer(bid), 1);
        ed.close_view(parent).unwrap();
        assert_eq!(ed.count_views_of_buffer(bid), 0);
    }

    #[test]
    fn close_dead_view_errors() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        ed.close_view(child).unwrap();
        assert_eq!(ed.close_view(child), Err(Error::NoSuchView));
    }

    // ── Resize and gutters ──────────────────────────────────────────────

    #[test]
    fn resize_carves_edit_rectangles() {
        let mut ed = editor_with(vec![]);
        let v = ed.view(ed.active);
        assert_eq!(v.rect_caption.h, 1);
        assert_eq!(v.rect_caption.y, 0);
        assert_eq!(v.rect_buffer.y, 1);
        // 1-line buffer: gutter 1 + margins 2.
        assert_eq!(v.rect_buffer.w, 80 - 3);
        assert_eq!(v.rect_buffer.h, 23 - 1);
    }

    #[test]
    fn gutter_width_recomputes_after_line_growth() {
        // line_count 1 → width 1; inserting to 100 lines → width 3,
        // observable after the buffer-change propagation runs.
        let mut ed = editor_with(vec![]);
        let vid = ed.active;
        assert_eq!(ed.view(vid).linenum_width, 1);

        let bid = ed.view(vid).buffer;
        ed.buffer_mut(bid).insert(Position::ZERO, &"x\n".repeat(99));
        assert_eq!(ed.buffer(bid).line_count(), 100);

        ed.propagate_buffer_changes();
        assert_eq!(ed.view(vid).linenum_width, 3);
        // The text rectangle narrowed to match.
        assert_eq!(ed.view(vid).rect_buffer.w, 80 - 5);
    }

    #[test]
    fn vertical_split_divides_width() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        assert_eq!(ed.view(parent).rect_caption.w, 40);
        assert_eq!(ed.view(child).x, 40);
        assert_eq!(ed.view(child).w, 40);
    }

    #[test]
    fn horizontal_split_divides_height() {
        let mut ed = editor_with(vec![]);
        let parent = ed.active;
        let child = ed.split_view(parent, false, 0.5).unwrap();
        assert_eq!(ed.view(child).y, 11);
        assert_eq!(ed.view(child).h, 12);
    }

    // ── Shared buffer across views ──────────────────────────────────────

    #[test]
    fn edit_through_one_view_visible_in_other() {
        let mut ed = editor_with(chords("shared"));
        let parent = ed.active;
        let child = ed.split_view(parent, true, 0.5).unwrap();
        ed.run_loop();
        // One buffer, both views see the text.
        assert_eq!(ed.view(parent).buffer, ed.view(child).buffer);
        assert_eq!(active_text(&ed), "shared");
    }

    // ── Keymap stack dispatch ───────────────────────────────────────────

    #[test]
    fn pushed_kmap_shadows_lower_bindings() {
        let mut ed = editor_with(vec![]);
        let mut veto = Keymap::new("veto", None, false);
        veto.bind("C-x", "noop", None).unwrap();
        let veto_id = ed.add_kmap(veto);
        ed.view_mut(ed.active).push_kmap(veto_id);

        ed.loops.push(LoopCtx::default());
        let resolved = ed.resolve_binding(key("C-x"), false).unwrap();
        assert_eq!(resolved.command, "noop");
        ed.loops.pop();
    }

    // ── Unregistration ──────────────────────────────────────────────────

    #[test]
    fn unregistered_command_fails_dispatch_silently() {
        let mut input = vec![key("C-x")]; // bound to `close`
        input.extend(chords("ok"));
        let mut ed = editor_with(input);
        ed.registry.unregister("close");
        let views_before = ed.top_views.len();
        ed.run_loop();
        // close never ran; typing continued normally.
        assert_eq!(ed.top_views.len(), views_before);
        assert_eq!(active_text(&ed), "ok");
    }

    // ── Startup line ────────────────────────────────────────────────────

    #[test]
    fn startup_line_suffix_parses() {
        let (p, l) = split_startup_line(Path::new("src/main.rs:42"));
        assert_eq!(p, PathBuf::from("src/main.rs"));
        assert_eq!(l, Some(42));
        let (p, l) = split_startup_line(Path::new("no-line.txt"));
        assert_eq!(p, PathBuf::from("no-line.txt"));
        assert_eq!(l, None);
    }

    // ── Injection ───────────────────────────────────────────────────────

    #[test]
    fn injected_input_runs_before_source() {
        let mut ed = editor_with(chords("b"));
        ed.inject_input(chords("a"));
        ed.run_loop();
        assert_eq!(active_text(&ed), "ab");
    }

    // ── Drains ──────────────────────────────────────────────────────────

    #[test]
    fn drain_output_lands_in_buffer_before_input() {
        let mut ed = editor_with(chords("x"));
        let mut chunks = vec!["out1\n".to_string(), "out2\n".to_string()].into_iter();
        ed.add_drain(Box::new(move || chunks.next()));
        ed.run_loop();
        let text = active_text(&ed);
        assert!(text.contains("out1\nout2\n"), "text = {text:?}");
        assert!(text.contains('x'), "text = {text:?}");
    }

    #[test]
    fn cleared_drains_never_fire() {
        let mut ed = editor_with(vec![]);
        ed.add_drain(Box::new(|| Some("never".to_string())));
        ed.clear_drains();
        ed.run_loop();
        assert_eq!(active_text(&ed), "");
    }

    // ── Hooks ───────────────────────────────────────────────────────────

    #[test]
    fn hooks_fire_around_commands_but_not_internals() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Spy(Rc<RefCell<Vec<(&'static str, String)>>>);
        impl EventSink for Spy {
            fn before(&mut self, ctx: &HookContext) {
                self.0.borrow_mut().push(("before", ctx.command.clone()));
            }
            fn after(&mut self, ctx: &HookContext) {
                self.0.borrow_mut().push(("after", ctx.command.clone()));
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        // "a", then goto-line via a prompt (whose internal submit must
        // not fire hooks).
        let mut input = chords("a");
        input.push(key("M-g"));
        input.extend(chords("1"));
        input.push(key("enter"));

        let mut options = Options::default();
        options.headless = true;
        let mut ed = Editor::new(
            options,
            Box::new(ScriptedSource::new(input)),
            Box::new(Spy(Rc::clone(&log))),
        );
        ed.resize(80, 24);
        ed.run_loop();

        let log = log.borrow();
        assert!(log.contains(&("before", "insert_data".to_string())));
        assert!(log.contains(&("after", "insert_data".to_string())));
        assert!(log.contains(&("before", "move_to_line".to_string())));
        assert!(
            !log.iter().any(|(_, c)| c.starts_with('_')),
            "internal commands must not fire hooks: {log:?}"
        );
        // before always precedes its after.
        let b = log.iter().position(|e| e == &("before", "insert_data".to_string()));
        let a = log.iter().position(|e| e == &("after", "insert_data".to_string()));
        assert!(b < a);
    }
}
