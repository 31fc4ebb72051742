//! Built-in concept function implementations.
//!
//! The lattice built-ins `lub`, `glb`, `projectLeft`, and `projectRight` are
//! handled directly by the expression evaluator because they are generic over
//! every ontology in scope. The functions here are the ones a solver
//! registers by name in its library.

use crate::concept::{ConceptId, OntologyId};
use crate::error::{FunctionError, OntolatResult};

use super::{ConceptFunction, EvalContext, FunctionSignature};

/// Ignores its arguments and returns a fixed concept.
pub struct ConstantConceptFunction {
    signature: FunctionSignature,
    value: ConceptId,
}

impl ConstantConceptFunction {
    pub fn new(name: impl Into<String>, domains: Vec<OntologyId>, value: ConceptId) -> Self {
        Self {
            signature: FunctionSignature::fixed(name, domains, value.ontology()),
            value,
        }
    }
}

impl ConceptFunction for ConstantConceptFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn apply(&self, _cx: &EvalContext<'_>, _args: &[ConceptId]) -> OntolatResult<ConceptId> {
        Ok(self.value)
    }
}

/// Joins all arguments with the least upper bound of their shared ontology.
pub struct LeastUpperBoundFunction {
    signature: FunctionSignature,
}

impl LeastUpperBoundFunction {
    pub fn new(ontology: OntologyId) -> Self {
        Self {
            signature: FunctionSignature::variable("lub", ontology, ontology),
        }
    }
}

impl ConceptFunction for LeastUpperBoundFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn apply(&self, cx: &EvalContext<'_>, args: &[ConceptId]) -> OntolatResult<ConceptId> {
        let (&first, _) = args.split_first().ok_or(FunctionError::ArityMismatch {
            name: self.signature.name.clone(),
            expected: 1,
            actual: 0,
        })?;
        cx.ontology_for(first)?.least_upper_bound_set(args)
    }
}

/// Builds a record concept from individually computed field concepts.
///
/// The field names are fixed at construction; argument `i` becomes the
/// component of field `i`. Produces the interned record under the configured
/// representative.
pub struct RecordFromIndividualConcepts {
    signature: FunctionSignature,
    representative: ConceptId,
    field_names: Vec<String>,
}

impl RecordFromIndividualConcepts {
    pub fn new(
        name: impl Into<String>,
        representative: ConceptId,
        field_names: Vec<String>,
    ) -> Self {
        let ontology = representative.ontology();
        let domains = vec![ontology; field_names.len()];
        Self {
            signature: FunctionSignature::fixed(name, domains, ontology),
            representative,
            field_names,
        }
    }
}

impl ConceptFunction for RecordFromIndividualConcepts {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn apply(&self, cx: &EvalContext<'_>, args: &[ConceptId]) -> OntolatResult<ConceptId> {
        let fields = self
            .field_names
            .iter()
            .cloned()
            .zip(args.iter().copied())
            .collect();
        cx.ontology_for(self.representative)?
            .record_concept(self.representative, fields)
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
    fn lub_function_joins_all_arguments() {
        let (ont, unknown, constant, nonconst) = const_ontology();
        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);

        let f = LeastUpperBoundFunction::new(ont.id());
        assert_eq!(
            f.evaluate(&cx, &[unknown, constant]).unwrap(),
            constant
        );
        assert_eq!(
            f.evaluate(&cx, &[unknown, constant, nonconst]).unwrap(),
            nonconst
        );
    }

    #[test]
    fn record_function_builds_interned_records() {
        let (ont, _, constant, nonconst) = const_ontology();
        let rep = ont.add_concept("Record").unwrap();
        ont.add_edge(nonconst, rep).unwrap();

        let library = FunctionLibrary::new();
        let cx = EvalContext::new(vec![&ont], &library);

        let f = RecordFromIndividualConcepts::new(
            "recordOf",
            rep,
            vec!["x".to_string(), "y".to_string()],
        );
        let a = f.evaluate(&cx, &[constant, nonconst]).unwrap();
        let b = f.evaluate(&cx, &[constant, nonconst]).unwrap();
        assert_eq!(a, b);
        assert_eq!(ont.field_concept(a, "x").unwrap(), Some(constant));
        assert_eq!(ont.compare(a, rep).unwrap(), ConceptOrdering::Lower);

        // Wrong argument count is caught by the signature.
        assert!(f.evaluate(&cx, &[constant]).is_err());
    }
}
