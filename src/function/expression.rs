//! Concept functions defined by a concept expression.
//!
//! The body is parsed once at construction; each application binds the formal
//! argument names to the actual concepts and evaluates. Formals shadow
//! concept names, so an expression can freely name both.

use crate::concept::{ConceptId, OntologyId};
use crate::error::{FunctionError, OntolatResult};
use crate::expr::{Evaluator, ParsedExpression};

use super::{ConceptFunction, EvalContext, FunctionSignature};

#[derive(Debug)]
pub struct ExpressionConceptFunction {
    signature: FunctionSignature,
    formals: Vec<String>,
    body: ParsedExpression,
}

impl ExpressionConceptFunction {
    /// Parse and declare an expression-bodied concept function.
    ///
    /// The formal name list and the domain list must have the same length;
    /// each formal's binding is checked against its domain at call time.
    pub fn new(
        name: impl Into<String>,
        formals: Vec<String>,
        domains: Vec<OntologyId>,
        range: OntologyId,
        source: &str,
    ) -> OntolatResult<Self> {
        let name = name.into();
        if formals.len() != domains.len() {
            return Err(FunctionError::BadDeclaration {
                name,
                message: format!(
                    "{} formal argument(s) but {} domain ontologies",
                    formals.len(),
                    domains.len()
                ),
            }
            .into());
        }
        let body = ParsedExpression::parse(source)?;
        Ok(Self {
            signature: FunctionSignature::fixed(name, domains, range),
            formals,
            body,
        })
    }

    /// The parsed body.
    pub fn body(&self) -> &ParsedExpression {
        &self.body
    }

    /// The formal argument names, in declaration order.
    pub fn formals(&self) -> &[String] {
        &self.formals
    }
}

impl ConceptFunction for ExpressionConceptFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn apply(&self, cx: &EvalContext<'_>, args: &[ConceptId]) -> OntolatResult<ConceptId> {
        let mut evaluator = Evaluator::new(cx);
        for (formal, &arg) in self.formals.iter().zip(args) {
            evaluator.bind(formal.clone(), arg);
        }
        let value = evaluator.evaluate(&self.body)?;
        Ok(value.expect_concept("the function body")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn multiply_style_function_evaluates() {
        let (ont, _, constant, nonconst) = const_ontology();
        let f = ExpressionConceptFunction::new(
            "multiplyFunction",
            vec!["a".to_string(), "b".to_string()],
            vec![ont.id(), ont.id()],
            ont.id(),
            "a == Const && b == Const ? Const : NonConst",
        )
        .unwrap();

        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        assert_eq!(f.evaluate(&cx, &[constant, constant]).unwrap(), constant);
        assert_eq!(f.evaluate(&cx, &[constant, nonconst]).unwrap(), nonconst);
    }

    #[test]
    fn nested_library_calls_resolve() {
        let (ont, _, constant, nonconst) = const_ontology();
        let inner = ExpressionConceptFunction::new(
            "negate",
            vec!["x".to_string()],
            vec![ont.id()],
            ont.id(),
            "x == Const ? NonConst : Const",
        )
        .unwrap();

        let mut library = FunctionLibrary::new();
        library.register(std::sync::Arc::new(inner));

        let outer = ExpressionConceptFunction::new(
            "doubleNegate",
            vec!["x".to_string()],
            vec![ont.id()],
            ont.id(),
            "negate(negate(x))",
        )
        .unwrap();

        let cx = EvalContext::new(vec![&ont], &library);
        assert_eq!(outer.evaluate(&cx, &[constant]).unwrap(), constant);
        assert_eq!(outer.evaluate(&cx, &[nonconst]).unwrap(), nonconst);
    }

    #[test]
    fn formal_and_domain_counts_must_match() {
        let (ont, _, _, _) = const_ontology();
        let err = ExpressionConceptFunction::new(
            "bad",
            vec!["a".to_string()],
            vec![ont.id(), ont.id()],
            ont.id(),
            "a",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::OntolatError::Function(FunctionError::BadDeclaration { .. })
        ));
    }

    #[test]
    fn boolean_body_is_rejected() {
        let (ont, _, constant, _) = const_ontology();
        let f = ExpressionConceptFunction::new(
            "isConst",
            vec!["a".to_string()],
            vec![ont.id()],
            ont.id(),
            "a == Const",
        )
        .unwrap();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);
        assert!(f.evaluate(&cx, &[constant]).is_err());
    }
}
