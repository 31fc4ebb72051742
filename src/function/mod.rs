//! Concept functions: monotonic mappings from concepts to concepts.
//!
//! A concept function declares a [`FunctionSignature`] (arity, per-argument
//! domain ontologies, range ontology) and an `apply` body. The
//! [`ConceptFunction::evaluate`] wrapper enforces the signature on the way in
//! and out, so bodies can assume well-typed arguments. Functions are
//! registered by name in a [`FunctionLibrary`] and invoked from expressions
//! and constraint terms through an [`EvalContext`].

pub mod builtin;
pub mod expression;

use std::collections::HashMap;
use std::sync::Arc;

use crate::concept::{ConceptId, OntologyId};
use crate::error::{FunctionError, OntolatResult, OntologyError};
use crate::ontology::Ontology;

pub use expression::ExpressionConceptFunction;

/// How many arguments a concept function takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(usize),
    /// Any number of arguments; all share one domain ontology.
    Variable,
}

/// Declared type of a concept function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub arity: Arity,
    /// Domain ontology per argument position. For [`Arity::Variable`] a
    /// single entry covers every position.
    pub domains: Vec<OntologyId>,
    pub range: OntologyId,
}

impl FunctionSignature {
    /// A fixed-arity signature; the argument count is the domain count.
    pub fn fixed(
        name: impl Into<String>,
        domains: Vec<OntologyId>,
        range: OntologyId,
    ) -> Self {
        Self {
            name: name.into(),
            arity: Arity::Fixed(domains.len()),
            domains,
            range,
        }
    }

    /// A variable-arity signature over a single domain ontology.
    pub fn variable(name: impl Into<String>, domain: OntologyId, range: OntologyId) -> Self {
        Self {
            name: name.into(),
            arity: Arity::Variable,
            domains: vec![domain],
            range,
        }
    }
}

/// Shared evaluation context: the ontologies in scope and the function
/// library. Passed explicitly everywhere a lookup by name can happen.
pub struct EvalContext<'a> {
    ontologies: Vec<&'a Ontology>,
    library: &'a FunctionLibrary,
}

impl<'a> EvalContext<'a> {
    pub fn new(ontologies: Vec<&'a Ontology>, library: &'a FunctionLibrary) -> Self {
        Self {
            ontologies,
            library,
        }
    }

    /// The ontology with the given id, if it is in scope.
    pub fn ontology(&self, id: OntologyId) -> Option<&'a Ontology> {
        self.ontologies.iter().copied().find(|o| o.id() == id)
    }

    /// The ontology owning `concept`, or an error if it is not in scope.
    pub fn ontology_for(&self, concept: ConceptId) -> OntolatResult<&'a Ontology> {
        self.ontology(concept.ontology()).ok_or_else(|| {
            OntologyError::ForeignConcept {
                ontology: "the evaluation context".to_string(),
                concept: concept.to_string(),
            }
            .into()
        })
    }

    /// Resolve a concept name across the in-scope ontologies, in declaration
    /// order. The first match wins.
    pub fn lookup_concept(&self, name: &str) -> Option<ConceptId> {
        self.ontologies.iter().find_map(|o| o.lookup(name))
    }

    /// Look a concept function up by name.
    pub fn function(&self, name: &str) -> OntolatResult<Arc<dyn ConceptFunction>> {
        self.library.get(name).ok_or_else(|| {
            FunctionError::UnknownFunction {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// The ontologies in scope.
    pub fn ontologies(&self) -> &[&'a Ontology] {
        &self.ontologies
    }
}

/// A monotonic mapping from argument concepts to a result concept.
pub trait ConceptFunction: Send + Sync {
    fn signature(&self) -> &FunctionSignature;

    /// The function body. May assume [`ConceptFunction::evaluate`] has
    /// already checked arity and domains.
    fn apply(&self, cx: &EvalContext<'_>, args: &[ConceptId]) -> OntolatResult<ConceptId>;

    /// Apply with full signature enforcement: arity and per-argument domains
    /// before the body, the range after it.
    fn evaluate(&self, cx: &EvalContext<'_>, args: &[ConceptId]) -> OntolatResult<ConceptId> {
        let sig = self.signature();
        if let Arity::Fixed(expected) = sig.arity {
            if args.len() != expected {
                return Err(FunctionError::ArityMismatch {
                    name: sig.name.clone(),
                    expected,
                    actual: args.len(),
                }
                .into());
            }
        }
        for (index, &arg) in args.iter().enumerate() {
            let domain = match sig.arity {
                Arity::Fixed(_) => sig.domains.get(index).copied(),
                Arity::Variable => sig.domains.first().copied(),
            };
            if let Some(domain) = domain {
                if arg.ontology() != domain {
                    return Err(FunctionError::DomainMismatch {
                        name: sig.name.clone(),
                        index,
                        concept: describe_concept(cx, arg),
                        ontology: describe_ontology(cx, domain),
                    }
                    .into());
                }
            }
        }
        let out = self.apply(cx, args)?;
        if out.ontology() != sig.range {
            return Err(FunctionError::RangeMismatch {
                name: sig.name.clone(),
                concept: describe_concept(cx, out),
                ontology: describe_ontology(cx, sig.range),
            }
            .into());
        }
        Ok(out)
    }
}

fn describe_concept(cx: &EvalContext<'_>, concept: ConceptId) -> String {
    cx.ontology(concept.ontology())
        .and_then(|o| o.name_of(concept))
        .unwrap_or_else(|| concept.to_string())
}

fn describe_ontology(cx: &EvalContext<'_>, ontology: OntologyId) -> String {
    cx.ontology(ontology)
        .map(|o| o.name().to_string())
        .unwrap_or_else(|| ontology.to_string())
}

/// Named registry of concept functions.
#[derive(Default)]
pub struct FunctionLibrary {
    functions: HashMap<String, Arc<dyn ConceptFunction>>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its signature name, replacing any previous
    /// function of that name.
    pub fn register(&mut self, function: Arc<dyn ConceptFunction>) {
        self.functions
            .insert(function.signature().name.clone(), function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ConceptFunction>> {
        self.functions.get(name).cloned()
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionLibrary")
            .field("functions", &self.names())
            .finish()
    }
}
