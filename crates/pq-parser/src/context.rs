//! The in-flight mirror of a node being built (§3.4).

use pq_common::Token;

use crate::ast::{NodeId, NodeKind};

/// A partially-constructed node. Exists in `contextNodeById` until
/// `end_context` converts it (in place, same id) into an [`crate::ast::AstNode`].
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub id: NodeId,
    pub kind: NodeKind,
    pub token_index_start: u32,
    /// The token at `token_index_start` when this context was opened.
    /// `None` only when opened at the very end of the token stream.
    pub token_start: Option<Token>,
    /// Advances each time the recognizer finishes or deliberately skips an
    /// attribute slot (`increment_attribute_counter`). Used as the next
    /// child's `attribute_index` and, for `start_context`, as this
    /// context's own slot within its parent at the moment it closes.
    pub attribute_counter: u32,
    /// This context's own index within its parent's attribute list, once
    /// known (i.e. once the context has actually become a child -- it is
    /// set at `start_context` time, matching the parent's counter then).
    pub attribute_index: Option<u32>,
    pub parent_id: Option<NodeId>,
}
