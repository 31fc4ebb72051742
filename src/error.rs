//! Rich diagnostic error types for the ontolat engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ontolat engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntolatError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lattice(#[from] LatticeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("duplicate concept name {name:?} in ontology {ontology}")]
    #[diagnostic(
        code(ontolat::ontology::duplicate_concept),
        help(
            "Every concept in an ontology must have a unique name. \
             Look the existing concept up with `Ontology::lookup` instead of \
             adding it a second time."
        )
    )]
    DuplicateConcept { ontology: String, name: String },

    #[error("concept {concept} not found in ontology {ontology}")]
    #[diagnostic(
        code(ontolat::ontology::unknown_concept),
        help("The concept id does not refer to a concept of this ontology.")
    )]
    UnknownConcept { ontology: String, concept: String },

    #[error("concept {concept} belongs to a different ontology than {ontology}")]
    #[diagnostic(
        code(ontolat::ontology::foreign_concept),
        help(
            "A concept belongs to exactly one ontology for its lifetime. \
             Order edges and lattice operations may only involve concepts \
             created by the same ontology."
        )
    )]
    ForeignConcept { ontology: String, concept: String },

    #[error("representative {representative} for an infinite concept must be a finite concept")]
    #[diagnostic(
        code(ontolat::ontology::bad_representative),
        help(
            "Flat-token, record, and product concepts anchor their position in \
             the lattice through a finite representative concept. Pass a \
             concept created with `Ontology::add_concept`."
        )
    )]
    BadRepresentative { representative: String },
}

// ---------------------------------------------------------------------------
// Lattice errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LatticeError {
    #[error("ontology {ontology} has no concepts")]
    #[diagnostic(
        code(ontolat::lattice::empty),
        help("An ontology must contain at least one concept before its graph can be built.")
    )]
    Empty { ontology: String },

    #[error("concept graph of {ontology} contains a cycle through {concept}")]
    #[diagnostic(
        code(ontolat::lattice::cyclic),
        help(
            "Order edges must form a directed acyclic graph. Remove the edge \
             that closes the cycle."
        )
    )]
    Cyclic { ontology: String, concept: String },

    #[error("ontology {ontology} is not a lattice: {a} and {b} have no unique {bound}")]
    #[diagnostic(
        code(ontolat::lattice::not_a_lattice),
        help(
            "Every pair of concepts must have a unique least upper bound and \
             greatest lower bound. Add intermediate concepts or edges so the \
             named pair has one."
        )
    )]
    NotALattice {
        ontology: String,
        a: String,
        b: String,
        /// Which bound is missing or ambiguous: "least upper bound" or
        /// "greatest lower bound".
        bound: &'static str,
    },

    #[error("ontology {ontology} has {count} maximal concepts, expected exactly one top")]
    #[diagnostic(
        code(ontolat::lattice::no_unique_top),
        help("A lattice needs a unique top element. Add a concept above all maximal concepts.")
    )]
    NoUniqueTop { ontology: String, count: usize },

    #[error("ontology {ontology} has {count} minimal concepts, expected exactly one bottom")]
    #[diagnostic(
        code(ontolat::lattice::no_unique_bottom),
        help("A lattice needs a unique bottom element. Add a concept below all minimal concepts.")
    )]
    NoUniqueBottom { ontology: String, count: usize },

    #[error("concept {concept} is not part of the finite concept graph")]
    #[diagnostic(
        code(ontolat::lattice::unknown_concept),
        help(
            "Only finite concepts registered before the graph was built take \
             part in graph queries. Infinite concepts must be compared through \
             `Ontology::compare`, which substitutes their representative."
        )
    )]
    UnknownConcept { concept: String },

    #[error("least upper bound requested over an empty concept set")]
    #[diagnostic(
        code(ontolat::lattice::empty_bound_set),
        help("Provide at least one concept to a set-valued bound operation.")
    )]
    EmptyBoundSet,
}

// ---------------------------------------------------------------------------
// Expression errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExprError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    #[diagnostic(
        code(ontolat::expr::unexpected_char),
        help("Concept expressions allow identifiers, calls, ==, !=, &&, ||, !, ?: and parentheses.")
    )]
    UnexpectedChar { ch: char, offset: usize },

    #[error("parse error at offset {offset}: {message}")]
    #[diagnostic(
        code(ontolat::expr::parse),
        help("Check for balanced parentheses and complete conditional branches.")
    )]
    Parse { message: String, offset: usize },

    #[error("{name:?} is neither a bound argument nor a concept in the declared ontologies")]
    #[diagnostic(
        code(ontolat::expr::unknown_name),
        help(
            "Leaf identifiers resolve first against the function's formal \
             arguments and then against concept names across the declared \
             ontologies. Check the spelling, or declare the missing concept."
        )
    )]
    UnknownName { name: String },

    #[error("expected a {expected} value but {context} evaluated to a {actual}")]
    #[diagnostic(
        code(ontolat::expr::type_mismatch),
        help(
            "Boolean operators and conditional guards need boolean operands; \
             everything else must evaluate to a concept."
        )
    )]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
        context: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Concept function errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FunctionError {
    #[error("function {name} expects {expected} argument(s), got {actual}")]
    #[diagnostic(
        code(ontolat::function::arity),
        help("Fixed-arity concept functions must be called with exactly their declared argument count.")
    )]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} of {name} is {concept}, which is outside the declared domain ontology {ontology}")]
    #[diagnostic(
        code(ontolat::function::domain),
        help("Every argument must be a concept of the domain ontology declared for its position.")
    )]
    DomainMismatch {
        name: String,
        index: usize,
        concept: String,
        ontology: String,
    },

    #[error("output {concept} of {name} is outside the declared range ontology {ontology}")]
    #[diagnostic(
        code(ontolat::function::range),
        help(
            "A concept function must produce a concept of its declared range \
             ontology. The function body is inconsistent with its signature."
        )
    )]
    RangeMismatch {
        name: String,
        concept: String,
        ontology: String,
    },

    #[error("no concept function named {name}")]
    #[diagnostic(
        code(ontolat::function::unknown),
        help(
            "The name matched neither a built-in (lub, glb, projectLeft, \
             projectRight) nor a function registered in the solver's function \
             library."
        )
    )]
    UnknownFunction { name: String },

    #[error("malformed declaration for function {name}: {message}")]
    #[diagnostic(
        code(ontolat::function::declaration),
        help("The declared arity, domain list, and formal argument names must be consistent.")
    )]
    BadDeclaration { name: String, message: String },

    #[error("{name} requires a product concept, got {concept}")]
    #[diagnostic(
        code(ontolat::function::not_a_product),
        help("projectLeft and projectRight decompose product-lattice concepts only.")
    )]
    NotAProduct { name: &'static str, concept: String },
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("element {element} not found in the model")]
    #[diagnostic(
        code(ontolat::model::unknown_element),
        help("The element id does not refer to an element of this model tree.")
    )]
    UnknownElement { element: String },

    #[error("container {container} already holds an element named {name:?}")]
    #[diagnostic(
        code(ontolat::model::duplicate_name),
        help("Sibling elements must have distinct names so dotted paths stay unambiguous.")
    )]
    DuplicateName { container: String, name: String },

    #[error("{element} is not a port and cannot take part in a connection")]
    #[diagnostic(
        code(ontolat::model::not_a_port),
        help("Connections link a source port to a sink port.")
    )]
    NotAPort { element: String },

    #[error("malformed annotation expression {expression:?}: {message}")]
    #[diagnostic(
        code(ontolat::model::bad_annotation),
        help("Annotations take the form `path.to.element >= ConceptName` (or <=, ==).")
    )]
    BadAnnotation { expression: String, message: String },

    #[error("no element with full name {full_name:?}")]
    #[diagnostic(
        code(ontolat::model::unknown_path),
        help("The dotted path in the annotation does not resolve to a model element.")
    )]
    UnknownPath { full_name: String },
}

// ---------------------------------------------------------------------------
// Adapter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AdapterError {
    #[error("no adapter registered for element kind {kind}")]
    #[diagnostic(
        code(ontolat::adapter::no_adapter),
        help(
            "The adapter registry maps every element kind to a factory. \
             Register a factory for this kind before building constraints; \
             `AdapterRegistry::with_defaults` covers the built-in kinds."
        )
    )]
    NoAdapterForKind { kind: String },
}

// ---------------------------------------------------------------------------
// Solver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("invalid solver configuration: {message}")]
    #[diagnostic(
        code(ontolat::solver::invalid_config),
        help("Strategy must be one of forward, backward, bidirectional, none; fixed point must be least or greatest.")
    )]
    InvalidConfig { message: String },

    #[error("concept conflicts in {toplevel} on the following inequalities:\n{conflicts}")]
    #[diagnostic(
        code(ontolat::solver::conflicts),
        help(
            "The constraint system has no consistent assignment: after the \
             fixpoint ran, the listed inequalities were still unsatisfied. \
             The model's annotations or default constraints contradict each other."
        )
    )]
    Conflicts { toplevel: String, conflicts: String },

    #[error("solver {solver} accumulated {count} error(s):\n{report}")]
    #[diagnostic(
        code(ontolat::solver::aggregated),
        help(
            "Every offending propertyable is listed, sorted by name. \
             Unacceptable resolved concepts and regression mismatches are \
             collected across the whole pass before this error is raised."
        )
    )]
    Aggregated {
        solver: String,
        count: usize,
        report: String,
    },

    #[error("solver {solver} has not been trained, so its analysis cannot be tested")]
    #[diagnostic(
        code(ontolat::solver::not_trained),
        help("Call `train` once to record expected concepts before running `test`.")
    )]
    NotTrained { solver: String },

    #[error("solver {solver} has not resolved concepts yet")]
    #[diagnostic(
        code(ontolat::solver::not_resolved),
        help("Call `invoke` (or `initialize` followed by `resolve`) before reading results.")
    )]
    NotResolved { solver: String },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("failed to write resolved concepts: {0}")]
    #[diagnostic(
        code(ontolat::export::io),
        help("Check that the target path exists and is writable.")
    )]
    Io(#[from] std::io::Error),

    #[error("failed to serialize resolved concepts: {0}")]
    #[diagnostic(code(ontolat::export::serialize))]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias for functions returning ontolat results.
pub type OntolatResult<T> = std::result::Result<T, OntolatError>;
