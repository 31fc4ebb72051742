//! Constraint generation from attribute expression ASTs.
//!
//! Every concept-valued node of a parsed attribute expression becomes a
//! constraint variable, so inference recurses into expression structure
//! uniformly with model structure. Leaf identifiers tie their node to a
//! named concept or a sibling model element; calls tie a function
//! application term to the call node; the root ties back to the attribute
//! itself.
//!
//! Generation is best-effort: an unresolvable name or unknown function is
//! recorded as a session diagnostic and skipped rather than aborting the
//! whole pass.

use crate::error::OntolatResult;
use crate::expr::{AstNode, ParsedExpression};
use crate::model::Element;
use crate::solver::inequality::{Inequality, Term};

use super::ConstraintContext;

/// Whether a node evaluates to a concept (rather than a boolean).
/// Conditionals count: both branches are concept-valued, so the node is too.
pub fn is_concept_valued(node: &AstNode) -> bool {
    matches!(
        node,
        AstNode::Identifier(_) | AstNode::Call { .. } | AstNode::Conditional { .. }
    )
}

/// Parse an expression, swallowing errors. Used where a failed parse just
/// means "no expression structure to analyze".
pub fn parse_quiet(expression: &str) -> Option<ParsedExpression> {
    ParsedExpression::parse(expression).ok()
}

fn equality(a: Term, b: Term) -> [Inequality; 2] {
    [
        Inequality::new(a.clone(), b.clone()),
        Inequality::new(b, a),
    ]
}

/// Emit the structural constraints of one attribute's expression.
pub fn ast_constraints(
    ctx: &ConstraintContext<'_>,
    attribute: &Element,
    expression: &str,
) -> OntolatResult<Vec<Inequality>> {
    let parsed = match ctx
        .session
        .parse_cached(attribute.id, ctx.model.version(), expression)
    {
        Ok(parsed) => parsed,
        Err(err) => {
            ctx.session.diagnostic(format!(
                "skipping expression of {}: {err}",
                ctx.model.full_name(attribute.id)
            ));
            return Ok(Vec::new());
        }
    };

    let container_path = attribute
        .container
        .map(|container| ctx.model.full_name(container));

    let mut out = Vec::new();
    for id in parsed.ids() {
        match parsed.node(id) {
            AstNode::Identifier(name) => {
                let node_term = Term::Variable(ctx.ast_var(attribute.id, id));
                if let Some(concept) = ctx.ontology.lookup(name) {
                    out.extend(equality(node_term, Term::Constant(concept)));
                    continue;
                }
                // A sibling element of the attribute, by relative path.
                let sibling = container_path
                    .as_ref()
                    .and_then(|path| {
                        ctx.model.find_by_full_name(&format!("{path}.{name}")).ok()
                    })
                    .or_else(|| ctx.model.find_by_full_name(name).ok());
                match sibling {
                    Some(element) => {
                        out.extend(equality(
                            node_term,
                            Term::Variable(ctx.element_var(element)),
                        ));
                    }
                    None => {
                        ctx.session.diagnostic(format!(
                            "{}: {name:?} names neither a concept nor a model element",
                            ctx.model.full_name(attribute.id)
                        ));
                    }
                }
            }
            AstNode::Call { function, args } => {
                let node_term = Term::Variable(ctx.ast_var(attribute.id, id));
                match ctx.library.get(function) {
                    Some(function) => {
                        let arg_terms = args
                            .iter()
                            .map(|&arg| Term::Variable(ctx.ast_var(attribute.id, arg)))
                            .collect();
                        out.push(Inequality::new(
                            Term::Apply {
                                function,
                                args: arg_terms,
                            },
                            node_term,
                        ));
                    }
                    None => {
                        ctx.session.diagnostic(format!(
                            "{}: no concept function named {function:?}",
                            ctx.model.full_name(attribute.id)
                        ));
                    }
                }
            }
            AstNode::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                // The branch actually taken is unknown statically, so the
                // conditional's concept bounds both branches.
                let node_term = Term::Variable(ctx.ast_var(attribute.id, id));
                for &branch in [then_branch, else_branch] {
                    out.push(Inequality::new(
                        Term::Variable(ctx.ast_var(attribute.id, branch)),
                        node_term.clone(),
                    ));
                }
            }
            _ => {}
        }
    }

    // The attribute's own concept tracks its expression root.
    if is_concept_valued(parsed.node(parsed.root())) {
        out.extend(equality(
            Term::Variable(ctx.element_var(attribute.id)),
            Term::Variable(ctx.ast_var(attribute.id, parsed.root())),
        ));
    }

    Ok(out)
}
