//! The hybrid node view (§3.5): consumers that need to walk the tree
//! during or after a parse see either a completed [`AstNode`] or an
//! in-flight [`ParseContext`], without caring which.

use crate::ast::{AstNode, NodeId, NodeKind};
use crate::context::ParseContext;

/// Either a completed node or an in-flight context, identified by the same
/// id space. A context converts to an Ast node exactly once, in place,
/// when its production completes successfully.
#[derive(Debug, Clone, Copy)]
pub enum XorNode<'a> {
    Ast(&'a AstNode),
    Context(&'a ParseContext),
}

impl<'a> XorNode<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            XorNode::Ast(node) => node.id,
            XorNode::Context(ctx) => ctx.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            XorNode::Ast(node) => node.kind,
            XorNode::Context(ctx) => ctx.kind,
        }
    }

    pub fn attribute_index(&self) -> Option<u32> {
        match self {
            XorNode::Ast(node) => node.attribute_index,
            XorNode::Context(ctx) => ctx.attribute_index,
        }
    }

    pub fn token_index_start(&self) -> u32 {
        match self {
            XorNode::Ast(node) => node.token_range.token_index_start,
            XorNode::Context(ctx) => ctx.token_index_start,
        }
    }

    pub fn as_ast(&self) -> Option<&'a AstNode> {
        match self {
            XorNode::Ast(node) => Some(node),
            XorNode::Context(_) => None,
        }
    }

    pub fn as_context(&self) -> Option<&'a ParseContext> {
        match self {
            XorNode::Ast(_) => None,
            XorNode::Context(ctx) => Some(ctx),
        }
    }
}
