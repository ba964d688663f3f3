// SPDX-License-Identifier: MIT
//
// ode — a terminal text editor.
//
// This is the binary that wires the crates together:
//
//   ode-term   → terminal control, cell grid, ANSI output, input events
//   ode-editor → buffers, cursors, keymaps, dispatch, rendering
//
// Each keypress flows through:
//
//   stdin → parser → input source → dispatch (keymap trie) → command
//   → buffer/cursor mutation → viewport rectification → frame → diff →
//   terminal
//
// In headless mode there is no terminal at all: stdin seeds the buffer,
// a startup macro drives the dispatch loop, and the resulting buffer is
// written to stdout. The same loop, the same keymaps — just a scripted
// input source. That is also how the end-to-end tests run.

use std::io::Read;
use std::path::Path;
use std::process;

use clap::{Parser, ValueEnum};

use ode_editor::hooks::NoopSink;
use ode_editor::key::resolve_symbolic_key;
use ode_editor::macros::Macro;
use ode_editor::options::{LinenumType, Options};
use ode_editor::position::Position;
use ode_editor::source::{ScriptedSource, TermSource};
use ode_editor::Editor;
use ode_term::events::EventSource;
use ode_term::signal;
use ode_term::terminal::Terminal;

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LinenumArg {
    None,
    Abs,
    Rel,
    Both,
}

impl From<LinenumArg> for LinenumType {
    fn from(v: LinenumArg) -> Self {
        match v {
            LinenumArg::None => Self::None,
            LinenumArg::Abs => Self::Abs,
            LinenumArg::Rel => Self::Rel,
            LinenumArg::Both => Self::Both,
        }
    }
}

/// A small terminal text editor.
#[derive(Debug, Parser)]
#[command(name = "ode", version, about)]
struct Cli {
    /// Files to open; `path:NN` jumps to line NN.
    files: Vec<String>,

    /// Tab stop width.
    #[arg(short = 't', long, default_value_t = 4)]
    tab_width: usize,

    /// Insert tab characters instead of spaces.
    #[arg(long)]
    tab_bytes: bool,

    /// Line-number gutter mode.
    #[arg(short = 'n', long, value_enum, default_value_t = LinenumArg::Abs)]
    linenum: LinenumArg,

    /// Soft-wrap the cursor line instead of scrolling it.
    #[arg(short = 'w', long)]
    soft_wrap: bool,

    /// Horizontal viewport scope (negative: edge margin; else midpoint).
    #[arg(long, default_value_t = -5)]
    scope_x: isize,

    /// Vertical viewport scope.
    #[arg(long, default_value_t = -5)]
    scope_y: isize,

    /// Name of the keymap views start in.
    #[arg(short = 'K', long, default_value = "normal")]
    keymap: String,

    /// Define a keymap: `name,default_cmd,allow_fallthrough`.
    /// Repeatable; parsed through the same entry point as built-ins.
    #[arg(short = 'k', long = "def-kmap")]
    def_kmaps: Vec<String>,

    /// Define a binding: `kmap,command,pattern[,param]`. Repeatable.
    #[arg(short = 'b', long = "def-bind")]
    def_binds: Vec<String>,

    /// Define a macro: `name=key key key...`. Repeatable.
    #[arg(short = 'm', long = "def-macro")]
    def_macros: Vec<String>,

    /// Macro to run once the loop starts.
    #[arg(short = 'M', long)]
    startup_macro: Option<String>,

    /// Headless: seed from stdin, run the startup macro, print the
    /// buffer to stdout.
    #[arg(short = 'H', long)]
    headless: bool,
}

fn options_from(cli: &Cli) -> Options {
    Options {
        tab_width: cli.tab_width.max(1),
        tab_to_space: !cli.tab_bytes,
        linenum: cli.linenum.into(),
        soft_wrap: cli.soft_wrap,
        scope_x: cli.scope_x,
        scope_y: cli.scope_y,
        initial_keymap: cli.keymap.clone(),
        headless: cli.headless,
        startup_macro: cli.startup_macro.clone(),
        ..Options::default()
    }
}

/// Install user definitions from the CLI. Bad definitions are reported
/// and skipped; they never abort startup.
fn apply_user_defs(ed: &mut Editor, cli: &Cli) {
    for def in &cli.def_kmaps {
        if let Err(e) = ed.add_kmap_str(def) {
            eprintln!("ode: bad keymap definition '{def}': {e}");
        }
    }
    for def in &cli.def_binds {
        if let Err(e) = ed.add_binding_str(def) {
            eprintln!("ode: bad binding definition '{def}': {e}");
        }
    }
    for def in &cli.def_macros {
        match parse_macro_def(def) {
            Ok(mac) => ed.macros.insert(mac),
            Err(bad) => eprintln!("ode: bad macro definition '{def}': unknown key '{bad}'"),
        }
    }
}

/// Parse `name=key key key` into a macro.
fn parse_macro_def(def: &str) -> Result<Macro, String> {
    let (name, keys) = def.split_once('=').ok_or_else(|| def.to_string())?;
    let mut inputs = Vec::new();
    for token in keys.split_whitespace() {
        match resolve_symbolic_key(token) {
            Ok(chord) => inputs.push(chord),
            Err(_) => return Err(token.to_string()),
        }
    }
    Ok(Macro {
        name: name.to_string(),
        inputs,
    })
}

fn open_files(ed: &mut Editor, files: &[String]) {
    if files.is_empty() {
        return;
    }
    let scratch = ed.active;
    for file in files {
        if let Err(e) = ed.open_view(Some(Path::new(file))) {
            eprintln!("ode: {file}: {e}");
        }
    }
    // The placeholder scratch view has served its purpose.
    if ed.top_views.len() > 1 {
        let _ = ed.close_view(scratch);
    }
}

// ─── Modes ──────────────────────────────────────────────────────────────────

/// Headless run: stdin → buffer, startup macro → dispatch, buffer →
/// stdout. The contract the integration tests rely on.
fn run_headless(cli: &Cli) -> i32 {
    let options = options_from(cli);
    let mut ed = Editor::new(
        options,
        Box::new(ScriptedSource::new(Vec::new())),
        Box::new(NoopSink),
    );
    apply_user_defs(&mut ed, cli);
    open_files(&mut ed, &cli.files);
    ed.resize(80, 24);

    if cli.files.is_empty() {
        let mut input = String::new();
        if std::io::stdin().read_to_string(&mut input).is_ok() && !input.is_empty() {
            let bid = ed.view(ed.active).buffer;
            ed.buffer_mut(bid).insert(Position::ZERO, &input);
            let mark = ed.view(ed.active).cursors.active().mark;
            ed.buffer_mut(bid).set_mark(mark, Position::ZERO);
            ed.propagate_buffer_changes();
        }
    }

    if let Some(name) = cli.startup_macro.clone() {
        if let Err(e) = ed.apply_macro(&name) {
            eprintln!("ode: {e}");
            return 1;
        }
    }
    ed.run_loop();

    let bid = ed.view(ed.active_edit).buffer;
    print!("{}", ed.buffer(bid).contents());
    ed.exit_code
}

/// Interactive run: raw mode, alternate screen, the works.
fn run_interactive(cli: &Cli) -> i32 {
    signal::install_handlers();

    let mut terminal = match Terminal::new() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("ode: terminal init failed: {e}");
            return 1;
        }
    };
    if let Err(e) = terminal.enter() {
        eprintln!("ode: cannot enter raw mode: {e}");
        return 1;
    }

    let options = options_from(cli);
    let mut ed = Editor::new(
        options,
        Box::new(TermSource::new(EventSource::new())),
        Box::new(NoopSink),
    );
    apply_user_defs(&mut ed, cli);
    open_files(&mut ed, &cli.files);

    let size = terminal.size();
    log::info!("starting at {}x{}", size.cols, size.rows);
    ed.resize(size.cols, size.rows);
    ed.enable_display();

    if let Some(name) = cli.startup_macro.clone() {
        if let Err(e) = ed.apply_macro(&name) {
            ed.set_error(e.to_string());
        }
    }

    ed.run_loop();

    if let Err(e) = terminal.leave() {
        eprintln!("ode: terminal restore failed: {e}");
    }
    ed.exit_code
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let code = if cli.headless {
        run_headless(&cli)
    } else {
        run_interactive(&cli)
    };
    process::exit(code);
}

// ─── Tests ──────────────────────────────────────────────────────────────────
