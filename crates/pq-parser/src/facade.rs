//! The parser façade (§4.5): the recognizer entry point held behind a
//! function pointer, so a caller (or a future incremental-reparse layer)
//! can swap in an alternative `Document` recognizer without touching the
//! public `parse` API.

use crate::ast::NodeId;
use crate::error::ParseError;
use crate::parser::document::read_document;
use crate::state::ParseState;

pub type DocumentRecognizer = fn(&mut ParseState) -> Result<NodeId, ParseError>;

/// Bundles the recognizer function pointer the façade dispatches through.
/// The default (and, today, only) recognizer is [`read_document`]; the
/// indirection exists so `parse` itself never hard-codes which recognizer
/// it calls.
#[derive(Clone, Copy)]
pub struct ParserFacade {
    document: DocumentRecognizer,
}

impl ParserFacade {
    pub fn new() -> Self {
        Self { document: read_document }
    }

    pub fn with_document_recognizer(document: DocumentRecognizer) -> Self {
        Self { document }
    }

    pub fn parse_document(&self, state: &mut ParseState) -> Result<NodeId, ParseError> {
        (self.document)(state)
    }
}

impl Default for ParserFacade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DisambiguationPolicy;

    #[test]
    fn default_facade_parses_a_bare_expression_document() {
        let (tokens, errors) = pq_lexer::tokenize("1 + 2");
        assert!(errors.is_empty());
        let mut state = ParseState::new(tokens, DisambiguationPolicy::Strict);
        let facade = ParserFacade::new();
        assert!(facade.parse_document(&mut state).is_ok());
    }
}
