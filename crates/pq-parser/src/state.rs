//! The parse state machine (§4.1): the token cursor plus the NIM and its
//! id counter, and the primitive operations every recognizer is built from.

use std::rc::Rc;

use log::trace;
use pq_common::{Position, Token, TokenKind, TokenRange};

use crate::ast::{AstNode, LeafPayload, NodeId, NodeKind};
use crate::context::ParseContext;
use crate::error::{ParseError, ParseErrorKind};
use crate::nim::NodeIdMapCollection;

/// How hard the parser should work to resolve an ambiguous `[` or `(`
/// lookahead (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisambiguationPolicy {
    /// Emit `UnterminatedSequence` rather than attempt speculative parses.
    Strict,
    /// Fall back to speculative parsing, scored by tokens consumed.
    Thorough,
}

/// A way for a long-running parse to be told to stop between recognizer
/// calls (§4.1, §9). Checked at the top of every `start_context`.
pub trait CancellationHandle {
    fn is_cancelled(&self) -> bool;
}

impl CancellationHandle for () {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A snapshot sufficient to roll the whole parse state back to an earlier
/// point (§3.8). Restoring deletes every node with id >= `id_counter` and
/// rewinds the cursor; `current_context_attribute_counter` additionally
/// rewinds the one piece of mutable state on a *surviving* node (the
/// still-open context that was current at snapshot time) that isn't
/// implied by id truncation alone.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    token_index: u32,
    id_counter: NodeId,
    current_context_node_id: Option<NodeId>,
    current_context_attribute_counter: u32,
}

/// The full mutable state a parse thread carries: token cursor, NIM, and
/// the cursor into "what context is currently open".
///
/// `Clone` is cheap on `tokens` (an `Rc`) and the rest is only as large as
/// the parse so far -- cloning is how the `Thorough` disambiguation
/// policy tries an alternative without disturbing the original (§4.1's
/// `copyState`/`applyState`).
#[derive(Debug, Clone)]
pub struct ParseState {
    pub tokens: Rc<Vec<Token>>,
    pub token_index: u32,
    pub nim: NodeIdMapCollection,
    pub id_counter: NodeId,
    pub current_context_node_id: Option<NodeId>,
    pub disambiguation_policy: DisambiguationPolicy,
}

impl ParseState {
    pub fn new(tokens: Vec<Token>, disambiguation_policy: DisambiguationPolicy) -> Self {
        Self {
            tokens: Rc::new(tokens),
            token_index: 0,
            nim: NodeIdMapCollection::new(),
            id_counter: 0,
            current_context_node_id: None,
            disambiguation_policy,
        }
    }

    /// `copyState` (§4.1): an independent branch to try a speculative
    /// parse on, so failure never has to be unwound by hand.
    pub fn branch(&self) -> ParseState {
        self.clone()
    }

    /// `applyState` (§4.1): commit a winning branch, replacing `self`
    /// wholesale.
    pub fn apply_branch(&mut self, branch: ParseState) {
        *self = branch;
    }

    // ── Token cursor ─────────────────────────────────────────────────

    pub fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.token_index as usize)
    }

    pub fn current_token_kind(&self) -> Option<TokenKind> {
        self.current_token().map(|t| t.kind)
    }

    pub fn is_at(&self, kind: TokenKind) -> bool {
        self.current_token_kind() == Some(kind)
    }

    pub fn is_at_any(&self, kinds: &[TokenKind]) -> bool {
        self.current_token_kind().map(|k| kinds.contains(&k)).unwrap_or(false)
    }

    pub fn peek_kind(&self, offset: u32) -> Option<TokenKind> {
        self.tokens.get((self.token_index + offset) as usize).map(|t| t.kind)
    }

    fn advance_cursor(&mut self) {
        self.token_index += 1;
    }

    // ── Context stack (§4.1) ────────────────────────────────────────

    /// Begin recognizing `kind` as a new child of the current context.
    pub fn start_context(&mut self, kind: NodeKind) -> NodeId {
        let id = self.id_counter;
        self.id_counter += 1;

        let attribute_index = if let Some(parent_id) = self.current_context_node_id {
            let parent = self
                .nim
                .context_node_mut(parent_id)
                .expect("current context must be an open context");
            let slot = parent.attribute_counter;
            parent.attribute_counter += 1;
            Some(slot)
        } else {
            None
        };

        let context = ParseContext {
            id,
            kind,
            token_index_start: self.token_index,
            token_start: self.current_token().cloned(),
            attribute_counter: 0,
            attribute_index,
            parent_id: self.current_context_node_id,
        };
        trace!("start_context: {kind:?} id={id} at token {}", self.token_index);
        self.nim.insert_context(context);
        self.current_context_node_id = Some(id);
        id
    }

    /// Retroactively wrap the current context's most recent sibling-so-far
    /// in a new parent of kind `kind` (§4.2, §4.4): used by
    /// RecursivePrimaryExpression to fold `f(x)[y]` into a single node
    /// after the fact, without having predicted the wrap when `f` was
    /// first opened. `existing_child_id` becomes attribute 0 of the new
    /// parent; the new parent is reparented into `existing_child_id`'s
    /// former slot.
    pub fn start_context_as_parent(&mut self, kind: NodeKind, existing_child_id: NodeId) -> NodeId {
        let grandparent_id = self.nim.parent_id(existing_child_id);
        let existing_attribute_index = self
            .nim
            .xor_node(existing_child_id)
            .and_then(|x| x.attribute_index());

        let new_id = self.id_counter;
        self.id_counter += 1;

        let token_index_start = self
            .nim
            .xor_node(existing_child_id)
            .map(|x| x.token_index_start())
            .unwrap_or(self.token_index);

        let new_context = ParseContext {
            id: new_id,
            kind,
            token_index_start,
            token_start: self.tokens.get(token_index_start as usize).cloned(),
            attribute_counter: 1, // existing_child_id occupies slot 0 already
            attribute_index: existing_attribute_index,
            parent_id: grandparent_id,
        };
        self.nim.insert_context(new_context);

        // Detach `existing_child_id` from the grandparent and re-parent it
        // under the new context as attribute 0, preserving grandparent's
        // own child-slot position (the new context now sits there instead).
        self.nim
            .reparent(existing_child_id, new_id)
            .expect("existing_child_id must be a live node");

        self.current_context_node_id = Some(new_id);
        new_id
    }

    /// Finish the current context, converting it into a completed
    /// [`AstNode`] in place (same id).
    pub fn end_context(&mut self, leaf: Option<LeafPayload>) -> Result<NodeId, ParseError> {
        let id = self
            .current_context_node_id
            .ok_or_else(|| ParseError::invariant("end_context with no open context", self.token_index))?;
        let ctx = self
            .nim
            .context_node(id)
            .ok_or_else(|| ParseError::invariant(format!("no open context with id {id}"), self.token_index))?
            .clone();

        let children = self.nim.children(id).to_vec();
        let start_position = ctx
            .token_start
            .as_ref()
            .map(|t| t.position_start)
            .unwrap_or_else(Position::start);
        let end_position = self
            .tokens
            .get(self.token_index.wrapping_sub(1) as usize)
            .map(|t| t.position_end)
            .unwrap_or(start_position);

        let node = AstNode {
            id,
            kind: ctx.kind,
            attribute_index: ctx.attribute_index,
            token_range: TokenRange::new(ctx.token_index_start, self.token_index, start_position, end_position),
            children,
            leaf,
        };
        trace!("end_context: {:?} id={id}", node.kind);
        self.nim.complete_context(id, node).map_err(|e| ParseError::invariant(e.message, self.token_index))?;
        self.current_context_node_id = ctx.parent_id;
        Ok(id)
    }

    /// Abandon the current context (or `id`, if given) entirely: used when
    /// a speculative attempt fails and its partial tree must be scrubbed,
    /// and by the binary-operator combiner to discard its throwaway
    /// placeholder context once the flat operand/operator sequence has
    /// been read (§4.4).
    pub fn delete_context(&mut self, id: Option<NodeId>) -> Result<(), ParseError> {
        let id = id.or(self.current_context_node_id).ok_or_else(|| {
            ParseError::invariant("delete_context with no open context and no id given", self.token_index)
        })?;
        let parent_id = self.nim.parent_id(id);
        let attribute_index = self.nim.context_node(id).and_then(|c| c.attribute_index);
        self.nim.delete_id(id).map_err(|e| ParseError::invariant(e.message, self.token_index))?;
        // If this context was the most recently assigned attribute of its
        // parent -- always true for a throwaway context deleted right
        // after being opened, with nothing else touching the parent in
        // between -- give the parent's slot back so the eventual real
        // attachment doesn't skip one.
        if let (Some(parent_id), Some(attribute_index)) = (parent_id, attribute_index) {
            if let Some(parent_ctx) = self.nim.context_node_mut(parent_id) {
                if parent_ctx.attribute_counter == attribute_index + 1 {
                    parent_ctx.attribute_counter = attribute_index;
                }
            }
        }
        if self.current_context_node_id == Some(id) {
            self.current_context_node_id = parent_id;
        }
        Ok(())
    }

    /// Advance the current context's attribute counter without producing a
    /// child: used when an optional attribute slot is skipped outright.
    pub fn increment_attribute_counter(&mut self) -> Result<(), ParseError> {
        let id = self
            .current_context_node_id
            .ok_or_else(|| ParseError::invariant("increment_attribute_counter with no open context", self.token_index))?;
        let ctx = self
            .nim
            .context_node_mut(id)
            .ok_or_else(|| ParseError::invariant(format!("no open context with id {id}"), self.token_index))?;
        ctx.attribute_counter += 1;
        Ok(())
    }

    /// Attach an already-completed, currently-parentless node as the next
    /// attribute of the current context. Used by the binary-operator
    /// combiner (§4.4) when its flat read produced no operators at all,
    /// so the lone operand passes through unwrapped.
    pub fn attach_existing_child(&mut self, child_id: NodeId) -> Result<(), ParseError> {
        let parent_id = self
            .current_context_node_id
            .ok_or_else(|| ParseError::invariant("attach_existing_child with no open context", self.token_index))?;
        let attribute_index = {
            let ctx = self
                .nim
                .context_node_mut(parent_id)
                .ok_or_else(|| ParseError::invariant(format!("no open context with id {parent_id}"), self.token_index))?;
            let slot = ctx.attribute_counter;
            ctx.attribute_counter += 1;
            slot
        };
        self.nim.reparent(child_id, parent_id).map_err(|e| ParseError::invariant(e.message, self.token_index))?;
        if let Some(node) = self.nim.ast_node_mut(child_id) {
            node.attribute_index = Some(attribute_index);
        }
        Ok(())
    }

    /// Allocate a fresh id and insert `kind`/`children` as a completed
    /// node directly, bypassing `start_context`/`end_context` (§4.4). The
    /// new node is parentless; the caller attaches it (another fold step,
    /// or `attach_existing_child`).
    pub fn create_composite_node(&mut self, kind: NodeKind, children: Vec<NodeId>, token_range: TokenRange) -> NodeId {
        let id = self.id_counter;
        self.id_counter += 1;
        let node = AstNode { id, kind, attribute_index: None, token_range, children, leaf: None };
        self.nim.insert_composite_direct(node)
    }

    /// Read and consume the current token as a `Constant` leaf, creating
    /// its own single-token node directly rather than via
    /// `start_context`/`end_context` -- used by the combiner to record an
    /// operator token without going through the normal context protocol.
    pub fn consume_constant_leaf(&mut self, constant: LeafPayload) -> Result<NodeId, ParseError> {
        let token = self
            .current_token()
            .cloned()
            .ok_or_else(|| ParseError::invariant("consume_constant_leaf at end of input", self.token_index))?;
        let id = self.id_counter;
        self.id_counter += 1;
        let token_range = TokenRange::new(self.token_index, self.token_index + 1, token.position_start, token.position_end);
        self.advance_cursor();
        let node = AstNode { id, kind: NodeKind::Constant, attribute_index: None, token_range, children: vec![], leaf: Some(constant) };
        Ok(self.nim.insert_composite_direct(node))
    }

    // ── LL(1) token consumption ──────────────────────────────────────

    /// Consume the current token as a `Constant` leaf child, if it matches
    /// `expected`; otherwise raise `ExpectedTokenKind`.
    pub fn expect_token_kind(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        match self.current_token() {
            Some(token) if token.kind == expected => {
                let token = token.clone();
                self.advance_cursor();
                Ok(token)
            }
            found => Err(ParseError::new(
                ParseErrorKind::ExpectedTokenKind { expected, found: found.cloned() },
                self.current_context_kind(),
                self.token_index,
            )),
        }
    }

    pub fn expect_any_token_kind(&mut self, expected: &[TokenKind]) -> Result<Token, ParseError> {
        match self.current_token() {
            Some(token) if expected.contains(&token.kind) => {
                let token = token.clone();
                self.advance_cursor();
                Ok(token)
            }
            found => Err(ParseError::new(
                ParseErrorKind::ExpectedAnyTokenKind { expected: expected.to_vec(), found: found.cloned() },
                self.current_context_kind(),
                self.token_index,
            )),
        }
    }

    pub fn expect_closing_token_kind(&mut self, expected: TokenKind, opened_at: Position) -> Result<Token, ParseError> {
        match self.current_token() {
            Some(token) if token.kind == expected => {
                let token = token.clone();
                self.advance_cursor();
                Ok(token)
            }
            found => Err(ParseError::new(
                ParseErrorKind::ExpectedClosingTokenKind { expected, opened_at, found: found.cloned() },
                self.current_context_kind(),
                self.token_index,
            )),
        }
    }

    fn current_context_kind(&self) -> Option<NodeKind> {
        self.current_context_node_id.and_then(|id| self.nim.context_node(id)).map(|c| c.kind)
    }

    // ── Checkpoint / restore (§3.8) ──────────────────────────────────

    pub fn create_checkpoint(&self) -> Checkpoint {
        let current_context_attribute_counter = self
            .current_context_node_id
            .and_then(|id| self.nim.context_node(id))
            .map(|c| c.attribute_counter)
            .unwrap_or(0);
        Checkpoint {
            token_index: self.token_index,
            id_counter: self.id_counter,
            current_context_node_id: self.current_context_node_id,
            current_context_attribute_counter,
        }
    }

    pub fn restore_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.nim.truncate_from(checkpoint.id_counter);
        self.id_counter = checkpoint.id_counter;
        self.token_index = checkpoint.token_index;
        self.current_context_node_id = checkpoint.current_context_node_id;
        if let Some(id) = checkpoint.current_context_node_id {
            if let Some(ctx) = self.nim.context_node_mut(id) {
                ctx.attribute_counter = checkpoint.current_context_attribute_counter;
            }
        }
    }
}
