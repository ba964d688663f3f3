// SPDX-License-Identifier: MIT
//
// Binding trie and keymaps.
//
// A keymap is a named trie mapping chord sequences to command names.
// Edges are a tagged variant — a concrete chord, the numeric edge `##`
// (any digit run), or the wildcard edge `**` (any single chord, captured
// as a parameter). Nodes live in an arena owned by the keymap, addressed
// by `NodeId`; teardown is ordinary drop.
//
// Lookup is a one-chord step driven by the dispatch engine, which keeps
// a `DispatchState` alive across input events while a multi-chord
// sequence is in progress. Matching priority at a node:
//
//   1. digit + numeric edge present → accumulate, stay on the node
//   2. first non-digit after accumulation → flush the digits into
//      `numeric_params`, resume the walk from the numeric child
//   3. exact chord edge
//   4. wildcard edge, capturing the chord
//
// Peek mode (paste-ingestion look-ahead) disables the numeric and
// wildcard side effects so a speculative lookup cannot corrupt state.

use std::collections::HashMap;

use crate::error::Error;
use crate::key::{resolve_symbolic_key, KeyChord};

/// Index of a node within its keymap's arena. The root is node 0.
pub type NodeId = usize;

/// Index of a keymap within the editor's keymap registry.
pub type KmapId = usize;

/// Numeric accumulation buffer cap (digits).
pub const MAX_NUMERIC_LEN: usize = 20;
/// Cap on collected numeric parameters per dispatch.
pub const MAX_NUMERIC_PARAMS: usize = 8;
/// Cap on collected wildcard parameters per dispatch.
pub const MAX_WILDCARD_PARAMS: usize = 8;

// ---------------------------------------------------------------------------
// Edges and nodes
// ---------------------------------------------------------------------------

/// A trie edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// A concrete chord.
    Chord(KeyChord),
    /// `##` — matches any run of digits, collected into a numeric param.
    Numeric,
    /// `**` — matches any single chord, captured as a wildcard param.
    Wildcard,
}

/// Payload of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Command name, resolved through the registry at dispatch time.
    pub command: String,
    /// Optional fixed parameter attached at binding time (e.g. a
    /// direction string disambiguating one command).
    pub static_param: Option<String>,
}

/// A trie node: outgoing edges plus an optional leaf payload. A node can
/// be both a leaf and an interior node; the leaf wins at lookup, which
/// is also how duplicate insertion on a prefix path behaves.
#[derive(Debug, Default)]
struct BindingNode {
    children: HashMap<Edge, NodeId>,
    leaf: Option<Leaf>,
}

// ---------------------------------------------------------------------------
// Dispatch state
// ---------------------------------------------------------------------------

/// Partial-match state carried across input events — the dispatch
/// engine's analogue of a parser's cursor. Reset when a command resolves
/// or a dispatch attempt fails.
#[derive(Debug, Default)]
pub struct DispatchState {
    /// Saved trie position when a multi-chord sequence is in progress.
    pub pending: Option<(KmapId, NodeId)>,
    /// Digits accumulated on a numeric edge, not yet flushed.
    numeric: String,
    /// The numeric child we are accumulating toward.
    numeric_node: Option<NodeId>,
    /// Flushed numeric parameters, oldest first.
    pub numeric_params: Vec<u64>,
    /// Captured wildcard chords, oldest first.
    pub wildcard_params: Vec<char>,
    /// Set when the last dispatch step consumed input but needs more.
    pub need_more_input: bool,
}

impl DispatchState {
    /// Fresh, idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no partial match is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.numeric.is_empty() && self.numeric_node.is_none()
    }

    /// Clear everything back to idle. Numeric/wildcard params survive a
    /// command resolution just long enough for the command to consume
    /// them; the dispatch loop clears them after invocation.
    pub fn reset(&mut self) {
        self.pending = None;
        self.numeric.clear();
        self.numeric_node = None;
        self.need_more_input = false;
    }

    /// Drop collected parameters (after command invocation).
    pub fn clear_params(&mut self) {
        self.numeric_params.clear();
        self.wildcard_params.clear();
    }
}

/// Result of one lookup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Digit consumed into the numeric buffer; stay on the same node and
    /// wait for the next chord.
    Again,
    /// Advanced to a child node. The caller inspects leaf/interior.
    Node(NodeId),
    /// Nothing matched at this node.
    Miss,
}

// ---------------------------------------------------------------------------
// Keymap
// ---------------------------------------------------------------------------

/// A named binding trie plus its fallback policy.
#[derive(Debug)]
pub struct Keymap {
    name: String,
    nodes: Vec<BindingNode>,
    /// Consulted on a miss at the trie root before fallthrough.
    pub default_command: Option<String>,
    /// Whether a root miss may continue into the next keymap down the
    /// view's stack.
    pub allow_fallthrough: bool,
}

/// The root node id of every keymap.
pub const ROOT: NodeId = 0;

impl Keymap {
    /// An empty keymap.
    #[must_use]
    pub fn new(name: &str, default_command: Option<&str>, allow_fallthrough: bool) -> Self {
        Self {
            name: name.to_string(),
            nodes: vec![BindingNode::default()],
            default_command: default_command.map(str::to_string),
            allow_fallthrough,
        }
    }

    /// The keymap's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a binding.
    ///
    /// `pattern` is a space-separated chord sequence; each token is a
    /// symbolic key name, `##` (numeric), or `**` (wildcard). The final
    /// node becomes a leaf carrying `command` and `static_param`.
    /// Re-inserting on the same path overwrites the leaf.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownKey`] when a token resolves to nothing. The trie
    /// keeps nodes created for earlier tokens; they are unreachable as
    /// bindings and harmless.
    pub fn bind(
        &mut self,
        pattern: &str,
        command: &str,
        static_param: Option<&str>,
    ) -> Result<(), Error> {
        let mut tokens = pattern.split(' ').filter(|t| !t.is_empty()).peekable();
        if tokens.peek().is_none() {
            return Err(Error::UnknownKey(pattern.to_string()));
        }

        let mut node = ROOT;
        for token in tokens {
            let edge = match token {
                "##" => Edge::Numeric,
                "**" => Edge::Wildcard,
                _ => Edge::Chord(resolve_symbolic_key(token)?),
            };
            node = self.child_or_insert(node, edge);
        }

        self.nodes[node].leaf = Some(Leaf {
            command: command.to_string(),
            static_param: static_param.map(str::to_string),
        });
        Ok(())
    }

    fn child_or_insert(&mut self, node: NodeId, edge: Edge) -> NodeId {
        if let Some(&id) = self.nodes[node].children.get(&edge) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(BindingNode::default());
        self.nodes[node].children.insert(edge, id);
        id
    }

    /// Child of `node` along `edge`, if present.
    #[must_use]
    pub fn child(&self, node: NodeId, edge: &Edge) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.children.get(edge)).copied()
    }

    /// Leaf payload of a node, if it is a leaf.
    #[must_use]
    pub fn leaf(&self, node: NodeId) -> Option<&Leaf> {
        self.nodes.get(node).and_then(|n| n.leaf.as_ref())
    }

    /// True when the node has outgoing edges.
    #[must_use]
    pub fn has_children(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .is_some_and(|n| !n.children.is_empty())
    }

    /// One lookup step from `node` with `chord`.
    ///
    /// In peek mode, digit accumulation and wildcard capture are
    /// disabled: only exact edges match, and `state` is never mutated.
    pub fn lookup_step(
        &self,
        node: NodeId,
        chord: KeyChord,
        state: &mut DispatchState,
        is_peek: bool,
    ) -> Step {
        let mut node = node;

        if !is_peek {
            // Digit with a numeric edge in reach: accumulate and stay.
            if let Some(digit) = chord.digit() {
                if state.numeric_node.is_none() {
                    state.numeric_node = self.child(node, &Edge::Numeric);
                }
                if state.numeric_node.is_some() {
                    if state.numeric.len() < MAX_NUMERIC_LEN {
                        state.numeric.push(digit);
                        return Step::Again;
                    }
                    // Numeric buffer exhausted: dispatch failure.
                    state.numeric.clear();
                    state.numeric_node = None;
                    return Step::Miss;
                }
            }

            // First non-digit after accumulation: flush and resume the
            // walk from the numeric child.
            if !state.numeric.is_empty() {
                if state.numeric_params.len() >= MAX_NUMERIC_PARAMS {
                    state.numeric.clear();
                    state.numeric_node = None;
                    return Step::Miss;
                }
                let value = state.numeric.parse::<u64>().unwrap_or(u64::MAX);
                state.numeric_params.push(value);
                state.numeric.clear();
                if let Some(numeric_child) = state.numeric_node.take() {
                    node = numeric_child;
                }
            }
        }

        // Exact match beats wildcard.
        if let Some(id) = self.child(node, &Edge::Chord(chord)) {
            return Step::Node(id);
        }

        if !is_peek {
            if let Some(id) = self.child(node, &Edge::Wildcard) {
                if state.wildcard_params.len() >= MAX_WILDCARD_PARAMS {
                    return Step::Miss;
                }
                state.wildcard_params.push(chord.char_value());
                return Step::Node(id);
            }
        }

        Step::Miss
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
