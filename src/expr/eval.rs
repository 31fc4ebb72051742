//! Evaluator for parsed concept expressions.
//!
//! Evaluation is pure: it reads argument bindings, concept names across the
//! declared ontologies, and the function library, and produces either a
//! concept or a boolean. Leaf identifiers resolve against bindings first and
//! concept names second, so a formal argument shadows a concept of the same
//! name.

use std::collections::HashMap;

use crate::concept::{ConceptId, ConceptKind};
use crate::error::{ExprError, FunctionError, OntolatResult};
use crate::function::EvalContext;

use super::{AstId, AstNode, BinaryOp, ParsedExpression, UnaryOp};

/// Result of evaluating an expression node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConceptValue {
    Concept(ConceptId),
    Bool(bool),
}

impl ConceptValue {
    fn kind_name(self) -> &'static str {
        match self {
            ConceptValue::Concept(_) => "concept",
            ConceptValue::Bool(_) => "boolean",
        }
    }

    /// The concept inside, or a type-mismatch error naming `context`.
    pub fn expect_concept(self, context: &'static str) -> Result<ConceptId, ExprError> {
        match self {
            ConceptValue::Concept(c) => Ok(c),
            other => Err(ExprError::TypeMismatch {
                expected: "concept",
                actual: other.kind_name(),
                context,
            }),
        }
    }

    /// The boolean inside, or a type-mismatch error naming `context`.
    pub fn expect_bool(self, context: &'static str) -> Result<bool, ExprError> {
        match self {
            ConceptValue::Bool(b) => Ok(b),
            other => Err(ExprError::TypeMismatch {
                expected: "boolean",
                actual: other.kind_name(),
                context,
            }),
        }
    }
}

/// Evaluates parsed expressions against bindings and an [`EvalContext`].
pub struct Evaluator<'a> {
    context: &'a EvalContext<'a>,
    bindings: HashMap<String, ConceptId>,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a EvalContext<'a>) -> Self {
        Self {
            context,
            bindings: HashMap::new(),
        }
    }

    /// Bind a formal argument name to a concept.
    pub fn bind(&mut self, name: impl Into<String>, concept: ConceptId) {
        self.bindings.insert(name.into(), concept);
    }

    /// Evaluate the whole expression.
    pub fn evaluate(&self, expr: &ParsedExpression) -> OntolatResult<ConceptValue> {
        self.eval_node(expr, expr.root())
    }

    /// Evaluate a single node of the expression.
    pub fn eval_node(&self, expr: &ParsedExpression, id: AstId) -> OntolatResult<ConceptValue> {
        match expr.node(id) {
            AstNode::Identifier(name) => self.resolve(name),
            AstNode::Call { function, args } => {
                let mut concepts = Vec::with_capacity(args.len());
                for &arg in args {
                    concepts
                        .push(self.eval_node(expr, arg)?.expect_concept("a call argument")?);
                }
                self.apply(function, &concepts)
            }
            AstNode::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let value = self
                    .eval_node(expr, *operand)?
                    .expect_bool("the operand of `!`")?;
                Ok(ConceptValue::Bool(!value))
            }
            AstNode::Binary { op, lhs, rhs } => self.eval_binary(expr, *op, *lhs, *rhs),
            AstNode::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let taken = self
                    .eval_node(expr, *condition)?
                    .expect_bool("a conditional guard")?;
                if taken {
                    self.eval_node(expr, *then_branch)
                } else {
                    self.eval_node(expr, *else_branch)
                }
            }
        }
    }

    fn eval_binary(
        &self,
        expr: &ParsedExpression,
        op: BinaryOp,
        lhs: AstId,
        rhs: AstId,
    ) -> OntolatResult<ConceptValue> {
        match op {
            BinaryOp::And => {
                let left = self
                    .eval_node(expr, lhs)?
                    .expect_bool("the left operand of `&&`")?;
                if !left {
                    return Ok(ConceptValue::Bool(false));
                }
                let right = self
                    .eval_node(expr, rhs)?
                    .expect_bool("the right operand of `&&`")?;
                Ok(ConceptValue::Bool(right))
            }
            BinaryOp::Or => {
                let left = self
                    .eval_node(expr, lhs)?
                    .expect_bool("the left operand of `||`")?;
                if left {
                    return Ok(ConceptValue::Bool(true));
                }
                let right = self
                    .eval_node(expr, rhs)?
                    .expect_bool("the right operand of `||`")?;
                Ok(ConceptValue::Bool(right))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let left = self.eval_node(expr, lhs)?;
                let right = self.eval_node(expr, rhs)?;
                let equal = match (left, right) {
                    (ConceptValue::Concept(a), ConceptValue::Concept(b)) => a == b,
                    (ConceptValue::Bool(a), ConceptValue::Bool(b)) => a == b,
                    (_, other) => {
                        return Err(ExprError::TypeMismatch {
                            expected: left.kind_name(),
                            actual: other.kind_name(),
                            context: "the right operand of an equality test",
                        }
                        .into());
                    }
                };
                Ok(ConceptValue::Bool(match op {
                    BinaryOp::Eq => equal,
                    _ => !equal,
                }))
            }
        }
    }

    fn resolve(&self, name: &str) -> OntolatResult<ConceptValue> {
        if let Some(&concept) = self.bindings.get(name) {
            return Ok(ConceptValue::Concept(concept));
        }
        if let Some(concept) = self.context.lookup_concept(name) {
            return Ok(ConceptValue::Concept(concept));
        }
        Err(ExprError::UnknownName {
            name: name.to_string(),
        }
        .into())
    }

    /// Apply a function by name: the four built-ins first, then the library.
    fn apply(&self, name: &str, args: &[ConceptId]) -> OntolatResult<ConceptValue> {
        match name {
            "lub" => {
                let (&first, _) = args.split_first().ok_or(FunctionError::ArityMismatch {
                    name: name.to_string(),
                    expected: 1,
                    actual: 0,
                })?;
                let ont = self.context.ontology_for(first)?;
                Ok(ConceptValue::Concept(ont.least_upper_bound_set(args)?))
            }
            "glb" => {
                let [a, b] = args else {
                    return Err(FunctionError::ArityMismatch {
                        name: name.to_string(),
                        expected: 2,
                        actual: args.len(),
                    }
                    .into());
                };
                let ont = self.context.ontology_for(*a)?;
                Ok(ConceptValue::Concept(ont.greatest_lower_bound(*a, *b)?))
            }
            "projectLeft" => self.project(args, true),
            "projectRight" => self.project(args, false),
            _ => {
                let function = self.context.function(name)?;
                Ok(ConceptValue::Concept(
                    function.evaluate(self.context, args)?,
                ))
            }
        }
    }

    fn project(&self, args: &[ConceptId], left: bool) -> OntolatResult<ConceptValue> {
        let name: &'static str = if left { "projectLeft" } else { "projectRight" };
        let [concept] = args else {
            return Err(FunctionError::ArityMismatch {
                name: name.to_string(),
                expected: 1,
                actual: args.len(),
            }
            .into());
        };
        let ont = self.context.ontology_for(*concept)?;
        let data = ont.concept(*concept)?;
        match data.kind {
            ConceptKind::Product {
                left: l, right: r, ..
            } => Ok(ConceptValue::Concept(if left { l } else { r })),
            _ => Err(FunctionError::NotAProduct {
                name,
                concept: data.name,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptOrdering;
    use crate::function::FunctionLibrary;
    use crate::ontology::Ontology;

    fn const_ontology() -> (Ontology, ConceptId, ConceptId, ConceptId) {
        let ont = Ontology::new("constAnalysis");
        let unknown = ont.add_concept("Unknown").unwrap();
        let constant = ont.add_concept("Const").unwrap();
        let nonconst = ont.add_concept("NonConst").unwrap();
        ont.add_edge(unknown, constant).unwrap();
        ont.add_edge(constant, nonconst).unwrap();
        (ont, unknown, constant, nonconst)
    }

    #[test]
    fn binding_shadows_concept_name() {
        let (ont, _, constant, nonconst) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("Const", nonconst);

        let expr = ParsedExpression::parse("Const").unwrap();
        assert_eq!(
            eval.evaluate(&expr).unwrap(),
            ConceptValue::Concept(nonconst)
        );

        let unbound = Evaluator::new(&cx);
        assert_eq!(
            unbound.evaluate(&expr).unwrap(),
            ConceptValue::Concept(constant)
        );
    }

    #[test]
    fn conditional_selects_branch() {
        let (ont, _, constant, nonconst) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("x", constant);

        let expr = ParsedExpression::parse("x == Const ? Const : NonConst").unwrap();
        assert_eq!(
            eval.evaluate(&expr).unwrap(),
            ConceptValue::Concept(constant)
        );

        let mut eval = Evaluator::new(&cx);
        eval.bind("x", nonconst);
        assert_eq!(
            eval.evaluate(&expr).unwrap(),
            ConceptValue::Concept(nonconst)
        );
    }

    #[test]
    fn builtin_lub_folds_arguments() {
        let (ont, unknown, constant, nonconst) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("a", unknown);
        eval.bind("b", nonconst);
        eval.bind("c", constant);

        let expr = ParsedExpression::parse("lub(a, b, c)").unwrap();
        assert_eq!(
            eval.evaluate(&expr).unwrap(),
            ConceptValue::Concept(nonconst)
        );
    }

    #[test]
    fn builtin_projections_decompose_products() {
        let (ont, _, constant, nonconst) = const_ontology();
        let rep = ont.add_concept("Pair").unwrap();
        ont.add_edge(nonconst, rep).unwrap();
        let pair = ont.product_concept(rep, constant, nonconst).unwrap();

        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("p", pair);

        let left = ParsedExpression::parse("projectLeft(p)").unwrap();
        let right = ParsedExpression::parse("projectRight(p)").unwrap();
        assert_eq!(
            eval.evaluate(&left).unwrap(),
            ConceptValue::Concept(constant)
        );
        assert_eq!(
            eval.evaluate(&right).unwrap(),
            ConceptValue::Concept(nonconst)
        );

        let not_a_pair = ParsedExpression::parse("projectLeft(Const)").unwrap();
        assert!(eval.evaluate(&not_a_pair).is_err());
    }

    #[test]
    fn boolean_connectives_short_circuit() {
        let (ont, _, constant, _) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("x", constant);

        // The right operand references an unknown name; `||` must not reach it.
        let expr = ParsedExpression::parse("x == Const || missing == Const").unwrap();
        assert_eq!(eval.evaluate(&expr).unwrap(), ConceptValue::Bool(true));

        let expr = ParsedExpression::parse("x != Const && missing == Const").unwrap();
        assert_eq!(eval.evaluate(&expr).unwrap(), ConceptValue::Bool(false));
    }

    #[test]
    fn unknown_leaf_name_errors() {
        let (ont, _, _, _) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let eval = Evaluator::new(&cx);
        let expr = ParsedExpression::parse("NoSuchConcept").unwrap();
        assert!(eval.evaluate(&expr).is_err());
    }

    #[test]
    fn concept_guard_rejected_as_boolean() {
        let (ont, _, constant, _) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("x", constant);

        let expr = ParsedExpression::parse("x ? Const : NonConst").unwrap();
        assert!(eval.evaluate(&expr).is_err());
    }

    #[test]
    fn glb_meets_through_evaluator() {
        let (ont, unknown, constant, nonconst) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        let mut eval = Evaluator::new(&cx);
        eval.bind("a", constant);
        eval.bind("b", nonconst);

        let expr = ParsedExpression::parse("glb(a, b)").unwrap();
        let result = eval.evaluate(&expr).unwrap().expect_concept("test").unwrap();
        assert_eq!(result, constant);
        assert_eq!(ont.compare(unknown, result).unwrap(), ConceptOrdering::Lower);
    }
}
