//! The Node-Identity Map: the mutable spine of the parse (§3.6, §4.2).
//!
//! Every mutation goes through this API; nothing outside this module may
//! write `astNodeById`/`contextNodeById`/etc. directly, which is what keeps
//! the five derived indexes consistent.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{AstNode, NodeId, NodeKind};
use crate::context::ParseContext;
use crate::xor_node::XorNode;

/// Raised when an id-taking operation is asked to act on an id that isn't
/// present, or when a caller's expected-kind assertion fails. Never
/// attributable to input text -- always a bug in the recognizer calling in.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantError {
    pub message: String,
}

impl InvariantError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// The parallel, mutable representation of in-flight and completed nodes.
///
/// `Clone` backs the `Thorough` disambiguation policy's speculative
/// parsing (§4.3): a whole branch of parse state, NIM included, is
/// deep-copied so alternatives can be tried independently and the loser
/// discarded (the `copyState`/`applyState` pair in §4.1).
#[derive(Debug, Default, Clone)]
pub struct NodeIdMapCollection {
    ast_node_by_id: FxHashMap<NodeId, AstNode>,
    context_node_by_id: FxHashMap<NodeId, ParseContext>,
    parent_id_by_id: FxHashMap<NodeId, NodeId>,
    child_ids_by_id: FxHashMap<NodeId, Vec<NodeId>>,
    leaf_ids: FxHashSet<NodeId>,
    ids_by_node_kind: FxHashMap<NodeKind, BTreeSet<NodeId>>,
}

impl NodeIdMapCollection {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Basic lookups ────────────────────────────────────────────────

    pub fn ast_node(&self, id: NodeId) -> Option<&AstNode> {
        self.ast_node_by_id.get(&id)
    }

    pub fn ast_node_mut(&mut self, id: NodeId) -> Option<&mut AstNode> {
        self.ast_node_by_id.get_mut(&id)
    }

    pub fn context_node(&self, id: NodeId) -> Option<&ParseContext> {
        self.context_node_by_id.get(&id)
    }

    pub fn context_node_mut(&mut self, id: NodeId) -> Option<&mut ParseContext> {
        self.context_node_by_id.get_mut(&id)
    }

    pub fn xor_node(&self, id: NodeId) -> Option<XorNode<'_>> {
        if let Some(node) = self.ast_node_by_id.get(&id) {
            Some(XorNode::Ast(node))
        } else {
            self.context_node_by_id.get(&id).map(XorNode::Context)
        }
    }

    pub fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        self.parent_id_by_id.get(&id).copied()
    }

    pub fn parent_xor(&self, id: NodeId) -> Option<XorNode<'_>> {
        self.parent_id(id).and_then(|p| self.xor_node(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.child_ids_by_id.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_xor_by_attribute(
        &self,
        id: NodeId,
        index: usize,
        expected_kinds: Option<&[NodeKind]>,
    ) -> Result<Option<XorNode<'_>>, InvariantError> {
        let Some(&child_id) = self.children(id).get(index) else {
            return Ok(None);
        };
        let xor = self
            .xor_node(child_id)
            .ok_or_else(|| InvariantError::new(format!("dangling child id {child_id}")))?;
        if let Some(expected) = expected_kinds {
            if !expected.contains(&xor.kind()) {
                return Err(InvariantError::new(format!(
                    "child {child_id} of {id} at attribute {index} has kind {:?}, expected one of {:?}",
                    xor.kind(),
                    expected
                )));
            }
        }
        Ok(Some(xor))
    }

    pub fn leaf_ids(&self) -> &FxHashSet<NodeId> {
        &self.leaf_ids
    }

    pub fn ids_by_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.ids_by_node_kind.get(&kind).into_iter().flatten().copied()
    }

    pub fn is_ast_node(&self, id: NodeId) -> bool {
        self.ast_node_by_id.contains_key(&id)
    }

    pub fn is_context_node(&self, id: NodeId) -> bool {
        self.context_node_by_id.contains_key(&id)
    }

    /// Leftmost leaf under `id`, found by repeatedly descending to the
    /// first recorded child (§4.2).
    pub fn leftmost_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.children(current).first() {
                Some(&first) => current = first,
                None => return Some(current),
            }
        }
    }

    /// Rightmost leaf under `id`, found by repeatedly descending to the
    /// last recorded child.
    pub fn rightmost_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.children(current).last() {
                Some(&last) => current = last,
                None => return Some(current),
            }
        }
    }

    /// `n, parent(n), parent(parent(n)), ...` up to (and including) the
    /// root. A fresh, non-restartable pull iterator each call (§9).
    pub fn ancestry(&self, id: NodeId) -> Ancestry<'_> {
        Ancestry {
            nim: self,
            next: Some(id),
        }
    }

    // ── Mutation primitives ─────────────────────────────────────────

    /// Register a brand-new context. The caller has already chosen `id`
    /// (from the monotone counter) and set `parent_id`/`attribute_index`
    /// appropriately; this just wires up the indexes.
    pub fn insert_context(&mut self, context: ParseContext) {
        let id = context.id;
        if let Some(parent_id) = context.parent_id {
            self.parent_id_by_id.insert(id, parent_id);
            self.child_ids_by_id.entry(parent_id).or_default().push(id);
        }
        self.child_ids_by_id.entry(id).or_default();
        self.context_node_by_id.insert(id, context);
    }

    /// Convert a context into a completed node, in place (same id).
    pub fn complete_context(&mut self, id: NodeId, node: AstNode) -> Result<(), InvariantError> {
        if self.context_node_by_id.remove(&id).is_none() {
            return Err(InvariantError::new(format!("no open context with id {id}")));
        }
        if node.is_leaf() {
            self.leaf_ids.insert(id);
        }
        self.ids_by_node_kind.entry(node.kind).or_default().insert(id);
        self.ast_node_by_id.insert(id, node);
        Ok(())
    }

    /// Detach `child_id` from its current parent (if any, orphaned or
    /// not) and append it as the last attribute of `new_parent_id`, which
    /// must already exist. Used both by `startContextAsParent` (§4.2),
    /// where `new_parent_id` starts out childless, and by the
    /// binary-operator combiner's `attach_existing_child` (§4.4), where it
    /// appends an orphaned operand into the context actually current at
    /// the time.
    pub fn reparent(&mut self, child_id: NodeId, new_parent_id: NodeId) -> Result<(), InvariantError> {
        if !self.is_ast_node(child_id) && !self.is_context_node(child_id) {
            return Err(InvariantError::new(format!("reparent: no node with id {child_id}")));
        }
        if let Some(old_parent) = self.parent_id_by_id.get(&child_id).copied() {
            if let Some(siblings) = self.child_ids_by_id.get_mut(&old_parent) {
                siblings.retain(|&c| c != child_id);
            }
        }
        self.parent_id_by_id.insert(child_id, new_parent_id);
        self.child_ids_by_id.entry(new_parent_id).or_default().push(child_id);
        Ok(())
    }

    /// Insert a fully-formed composite node directly, bypassing the
    /// open-context protocol (§4.4): the binary-operator combiner folds
    /// its flat operand/operator read into nested nodes this way instead
    /// of via `start_context`/`end_context`, since the nesting shape isn't
    /// known until the whole flat sequence and its precedences are in
    /// hand. `node.children` become children of `node.id`; the new node
    /// itself starts out parentless.
    pub fn insert_composite_direct(&mut self, node: AstNode) -> NodeId {
        let id = node.id;
        for &child in &node.children {
            self.parent_id_by_id.insert(child, id);
        }
        self.child_ids_by_id.insert(id, node.children.clone());
        self.ids_by_node_kind.entry(node.kind).or_default().insert(id);
        if node.is_leaf() {
            self.leaf_ids.insert(id);
        }
        self.ast_node_by_id.insert(id, node);
        id
    }

    /// Delete a single node (context or completed). Its own children are
    /// orphaned (their parent link is cleared) rather than deleted --
    /// callers that want a recursive delete use `truncate_from`.
    pub fn delete_id(&mut self, id: NodeId) -> Result<(), InvariantError> {
        if let Some(parent_id) = self.parent_id_by_id.remove(&id) {
            if let Some(siblings) = self.child_ids_by_id.get_mut(&parent_id) {
                siblings.retain(|&c| c != id);
            }
        }
        if let Some(children) = self.child_ids_by_id.remove(&id) {
            for child in children {
                self.parent_id_by_id.remove(&child);
            }
        }
        self.leaf_ids.remove(&id);
        for set in self.ids_by_node_kind.values_mut() {
            set.remove(&id);
        }
        let was_context = self.context_node_by_id.remove(&id).is_some();
        let was_ast = self.ast_node_by_id.remove(&id).is_some();
        if !was_context && !was_ast {
            return Err(InvariantError::new(format!("delete_id: no node with id {id}")));
        }
        Ok(())
    }

    /// Delete every node with id >= `min_id`, used by checkpoint restore.
    /// Unlike `delete_id`, this recursively removes whole subtrees rooted
    /// at ids >= `min_id`: since ids are monotone in pre-order, a
    /// surviving ancestor never has id >= `min_id`, so a single filter
    /// pass over all maps is sufficient.
    pub fn truncate_from(&mut self, min_id: NodeId) {
        self.ast_node_by_id.retain(|&id, _| id < min_id);
        self.context_node_by_id.retain(|&id, _| id < min_id);
        self.parent_id_by_id.retain(|&id, &mut parent| id < min_id && parent < min_id);
        for children in self.child_ids_by_id.values_mut() {
            children.retain(|&c| c < min_id);
        }
        self.child_ids_by_id.retain(|&id, _| id < min_id);
        self.leaf_ids.retain(|&id| id < min_id);
        for set in self.ids_by_node_kind.values_mut() {
            set.retain(|&id| id < min_id);
        }
    }

    /// Reassign every id in the subtree rooted at `root_id` to a fresh,
    /// contiguous, ascending block starting at `*next_id` (pre-order),
    /// preserving the "ids are monotone in pre-order" property that
    /// `startContextAsParent` and recursive-primary rewrites depend on
    /// (§4.2, §9). Returns the new id of what was `root_id`.
    pub fn recalculate_and_update_ids(&mut self, root_id: NodeId, next_id: &mut NodeId) -> NodeId {
        let preorder = self.preorder_ids(root_id);
        let mut remap: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        for &old in &preorder {
            remap.insert(old, *next_id);
            *next_id += 1;
        }

        let external_parent = self.parent_id_by_id.remove(&root_id);

        for &old in &preorder {
            let new = remap[&old];

            let children_old = self.child_ids_by_id.remove(&old).unwrap_or_default();
            let children_new: Vec<NodeId> = children_old.iter().map(|c| remap[c]).collect();
            self.child_ids_by_id.insert(new, children_new);

            if let Some(parent_old) = self.parent_id_by_id.remove(&old) {
                let parent_new = remap.get(&parent_old).copied().unwrap_or(parent_old);
                self.parent_id_by_id.insert(new, parent_new);
            }

            if self.leaf_ids.remove(&old) {
                self.leaf_ids.insert(new);
            }
            for set in self.ids_by_node_kind.values_mut() {
                if set.remove(&old) {
                    set.insert(new);
                }
            }

            if let Some(mut node) = self.ast_node_by_id.remove(&old) {
                node.id = new;
                node.children = node.children.iter().map(|c| remap[c]).collect();
                self.ast_node_by_id.insert(new, node);
            } else if let Some(mut ctx) = self.context_node_by_id.remove(&old) {
                ctx.id = new;
                self.context_node_by_id.insert(new, ctx);
            }
        }

        let new_root = remap[&root_id];
        if let Some(parent_id) = external_parent {
            self.parent_id_by_id.insert(new_root, parent_id);
            if let Some(siblings) = self.child_ids_by_id.get_mut(&parent_id) {
                for slot in siblings.iter_mut() {
                    if *slot == root_id {
                        *slot = new_root;
                    }
                }
            }
        }
        new_root
    }

    fn preorder_ids(&self, root_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root_id];
        // A manual stack-based pre-order that still visits children in
        // left-to-right order (push in reverse).
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(children) = self.child_ids_by_id.get(&id) {
                for &child in children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }
}

pub struct Ancestry<'a> {
    nim: &'a NodeIdMapCollection,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.nim.parent_id(current);
        Some(current)
    }
}
