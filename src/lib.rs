//! # ontolat
//!
//! Lattice-based concept analysis for hierarchical component models:
//! ontologies of partially ordered concepts, constraint generation over
//! model structure and expressions, and fixpoint resolution.
//!
//! ## Architecture
//!
//! - **Ontologies** (`ontology`): finite concept lattices over a DAG, plus
//!   interned infinite families (flat tokens, records, products)
//! - **Expressions** (`expr`): a small concept-expression language with a
//!   lexer, parser, and evaluator
//! - **Concept functions** (`function`): monotonic functions over concepts,
//!   including expression-defined ones
//! - **Adapters** (`adapter`): per-element behaviors that emit inequality
//!   constraints for a model
//! - **Solver** (`solver`): worklist fixpoint over the constraint set, with
//!   trained-outcome regression support
//! - **Exception analysis** (`analyzer`): best-effort re-solve after a
//!   model fault to show how far an error reaches
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ontolat::config::SolverConfig;
//! use ontolat::model::{Model, PortDirection};
//! use ontolat::ontology::Ontology;
//! use ontolat::solver::{AnalysisSession, OntologySolver};
//!
//! let ontology = Ontology::new("constAnalysis");
//! let unknown = ontology.add_concept("Unknown").unwrap();
//! let constant = ontology.add_concept("Const").unwrap();
//! ontology.add_edge(unknown, constant).unwrap();
//!
//! let mut model = Model::new("top");
//! let ramp = model.add_atomic(None, "ramp").unwrap();
//! model.add_port(ramp, "output", PortDirection::Output).unwrap();
//! model.annotate(ramp, "constSolver", "c0", "output == Const").unwrap();
//!
//! let mut solver = OntologySolver::new(
//!     "constSolver",
//!     SolverConfig::default(),
//!     Arc::new(ontology),
//!     Arc::new(AnalysisSession::new()),
//! );
//! solver.invoke(&model).unwrap();
//! ```

pub mod adapter;
pub mod analyzer;
pub mod concept;
pub mod config;
pub mod error;
pub mod export;
pub mod expr;
pub mod function;
pub mod model;
pub mod ontology;
pub mod solver;

pub use analyzer::{ExceptionAnalyzer, ModelFault, ERROR_SOLVER_NAME};
pub use concept::{ConceptId, ConceptKind, OntologyId};
pub use config::{FixedPoint, SolverConfig, Strategy};
pub use error::{OntolatError, OntolatResult};
pub use model::Model;
pub use ontology::Ontology;
pub use solver::{AnalysisSession, OntologySolver};
