//! Concept expression language.
//!
//! A tiny, side-effect-free expression language over concepts: identifiers,
//! function calls, `==`/`!=` equality tests, `&&`/`||`/`!` boolean
//! connectives, and the `cond ? a : b` conditional. Parsing produces an
//! arena-allocated AST ([`ParsedExpression`]); evaluation happens against a
//! set of argument bindings and declared ontologies in
//! [`eval::Evaluator`].

pub mod eval;
pub mod lexer;
mod parser;

use crate::error::ExprError;

pub use eval::{ConceptValue, Evaluator};
pub use lexer::Span;

/// Index of a node in a [`ParsedExpression`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AstId(pub(crate) usize);

impl AstId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    And,
    Or,
}

/// One node of a parsed concept expression.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// A leaf name, resolved at evaluation time against bindings first and
    /// then concept names.
    Identifier(String),
    /// A function application.
    Call { function: String, args: Vec<AstId> },
    Unary {
        op: UnaryOp,
        operand: AstId,
    },
    Binary {
        op: BinaryOp,
        lhs: AstId,
        rhs: AstId,
    },
    Conditional {
        condition: AstId,
        then_branch: AstId,
        else_branch: AstId,
    },
}

/// A parsed concept expression: an arena of nodes plus the root.
///
/// Children always precede their parent in the arena, so iterating ids in
/// order visits the tree bottom-up.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    nodes: Vec<AstNode>,
    root: AstId,
    source: String,
}

impl ParsedExpression {
    /// Parse an expression from source text.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = lexer::tokenize(source)?;
        let (nodes, root) = parser::parse(&tokens, source.len())?;
        Ok(Self {
            nodes,
            root,
            source: source.to_string(),
        })
    }

    /// The root node id.
    pub fn root(&self) -> AstId {
        self.root
    }

    /// The node behind an id.
    pub fn node(&self, id: AstId) -> &AstNode {
        &self.nodes[id.0]
    }

    /// All node ids in bottom-up order.
    pub fn ids(&self) -> impl Iterator<Item = AstId> + '_ {
        (0..self.nodes.len()).map(AstId)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the expression has no nodes. Never true for a parsed
    /// expression, present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The ids of a node's direct children.
    pub fn children(&self, id: AstId) -> Vec<AstId> {
        match self.node(id) {
            AstNode::Identifier(_) => Vec::new(),
            AstNode::Call { args, .. } => args.clone(),
            AstNode::Unary { operand, .. } => vec![*operand],
            AstNode::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            AstNode::Conditional {
                condition,
                then_branch,
                else_branch,
            } => vec![*condition, *then_branch, *else_branch],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_conditional_shape() {
        let expr = ParsedExpression::parse("x == Const ? Const : NonConst").unwrap();
        match expr.node(expr.root()) {
            AstNode::Conditional { condition, .. } => match expr.node(*condition) {
                AstNode::Binary { op: BinaryOp::Eq, .. } => {}
                other => panic!("expected equality condition, got {other:?}"),
            },
            other => panic!("expected conditional root, got {other:?}"),
        }
    }

    #[test]
    fn children_precede_parent() {
        let expr = ParsedExpression::parse("lub(a, glb(b, c))").unwrap();
        for id in expr.ids() {
            for child in expr.children(id) {
                assert!(child < id);
            }
        }
    }

    #[test]
    fn unbalanced_parens_rejected() {
        assert!(ParsedExpression::parse("lub(a, b").is_err());
        assert!(ParsedExpression::parse("a)").is_err());
    }

    #[test]
    fn empty_expression_rejected() {
        assert!(ParsedExpression::parse("").is_err());
        assert!(ParsedExpression::parse("   ").is_err());
    }
}
