//! Solver orchestration.
//!
//! An [`OntologySolver`] walks a model, builds one adapter per element
//! through its registry, interns a constraint variable per propertyable,
//! gathers inequality constraints (structural defaults, expression ASTs,
//! manual annotations), runs the lattice fixpoint, and checks the result.
//!
//! State machine: reset → adapters-built → resolving → resolved → checked,
//! and back to reset on explicit reset or on any resolution failure (full
//! rollback, propagated to sibling solvers through the session epoch).

pub mod inequality;
pub mod lattice;
pub mod session;
pub mod trained;

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::adapter::{
    parse_annotation, AdapterRegistry, AnnotationConstraint, ConstraintContext, OntologyAdapter,
    Propertyable,
};
use crate::concept::ConceptId;
use crate::config::SolverConfig;
use crate::error::{OntolatResult, SolverError};
use crate::expr::AstId;
use crate::function::{ConceptFunction, EvalContext, FunctionLibrary};
use crate::model::{Element, ElementId, ElementKind, Model};
use crate::ontology::Ontology;

use inequality::{Inequality, Term, TermManager};
use lattice::FixpointStats;

pub use session::AnalysisSession;
pub use trained::{TrainedConceptRecord, TrainedOutcome};

/// Where the solver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Reset,
    AdaptersBuilt,
    Resolving,
    Resolved,
    Checked,
}

pub struct OntologySolver {
    name: String,
    config: SolverConfig,
    ontology: Arc<Ontology>,
    session: Arc<AnalysisSession>,
    registry: AdapterRegistry,
    library: FunctionLibrary,
    terms: TermManager,
    adapters: Vec<OntologyAdapter>,
    constraints: Vec<Inequality>,
    state: SolverState,
    stats: FixpointStats,
    trained: Option<TrainedOutcome>,
    epoch_seen: u64,
    toplevel: String,
}

impl OntologySolver {
    pub fn new(
        name: impl Into<String>,
        config: SolverConfig,
        ontology: Arc<Ontology>,
        session: Arc<AnalysisSession>,
    ) -> Self {
        let epoch_seen = session.epoch();
        Self {
            name: name.into(),
            config,
            ontology,
            session,
            registry: AdapterRegistry::with_defaults(),
            library: FunctionLibrary::new(),
            terms: TermManager::new(),
            adapters: Vec::new(),
            constraints: Vec::new(),
            state: SolverState::Reset,
            stats: FixpointStats::default(),
            trained: None,
            epoch_seen,
            toplevel: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> SolverConfig {
        self.config
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn ontology(&self) -> &Arc<Ontology> {
        &self.ontology
    }

    pub fn session(&self) -> &Arc<AnalysisSession> {
        &self.session
    }

    pub fn stats(&self) -> FixpointStats {
        self.stats
    }

    /// Register a concept function in this solver's library.
    pub fn register_function(&mut self, function: Arc<dyn ConceptFunction>) {
        self.library.register(function);
    }

    pub fn library(&self) -> &FunctionLibrary {
        &self.library
    }

    /// The adapter registry, for registering custom behaviors.
    pub fn registry_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.registry
    }

    /// Full reset: clears adapters, constraints, variables, and the cached
    /// infinite concepts, and bumps the session epoch so sibling solvers
    /// reset in lock-step.
    pub fn reset(&mut self) {
        self.local_reset();
        self.ontology.clear_infinite();
        self.epoch_seen = self.session.reset();
        debug!(solver = %self.name, epoch = self.epoch_seen, "solver reset");
    }

    fn local_reset(&mut self) {
        self.terms.clear();
        self.adapters.clear();
        self.constraints.clear();
        self.stats = FixpointStats::default();
        self.state = SolverState::Reset;
    }

    /// Build adapters and gather every constraint for the model.
    #[instrument(skip_all, fields(solver = %self.name, model = model.name()))]
    pub fn initialize(&mut self, model: &Model) -> OntolatResult<()> {
        // Another solver's reset invalidates our caches too.
        if self.epoch_seen != self.session.epoch() {
            self.epoch_seen = self.session.epoch();
        }
        self.local_reset();
        self.toplevel = model.name().to_string();

        let elements: Vec<Element> = model.elements().cloned().collect();
        for element in &elements {
            self.adapters.push(self.registry.adapter_for(element)?);
        }

        // Intern a variable per propertyable before constraint generation so
        // pinning annotations can address them.
        for adapter in &self.adapters {
            for prop in adapter.propertyables(model)? {
                self.intern(model, prop);
            }
        }

        self.apply_annotations(model)?;

        let ctx = ConstraintContext {
            model,
            config: &self.config,
            terms: &self.terms,
            session: &self.session,
            library: &self.library,
            ontology: &self.ontology,
            solver_name: &self.name,
        };
        let mut constraints = Vec::new();
        for adapter in &self.adapters {
            constraints.extend(adapter.constraints(&ctx)?);
        }
        self.constraints = constraints;

        self.state = SolverState::AdaptersBuilt;
        debug!(
            adapters = self.adapters.len(),
            variables = self.terms.len(),
            constraints = self.constraints.len(),
            "solver initialized"
        );
        Ok(())
    }

    fn intern(&self, model: &Model, prop: Propertyable) -> inequality::VarId {
        match prop {
            Propertyable::Element(element) => self
                .terms
                .variable_for(prop, &model.full_name(element)),
            Propertyable::AstNode { attribute, node } => self.terms.variable_for(
                prop,
                &format!("{}#ast{}", model.full_name(attribute), node.index()),
            ),
        }
    }

    /// Re-evaluate the manual annotations addressed to this solver.
    fn apply_annotations(&mut self, model: &Model) -> OntolatResult<()> {
        for annotation in model.annotations_for(&self.name) {
            let ElementKind::Attribute { expression, .. } = &annotation.kind else {
                continue;
            };
            match parse_annotation(model, &self.ontology, annotation, expression)? {
                AnnotationConstraint::GreaterEqual(element, concept) => {
                    let var = self.intern(model, Propertyable::Element(element));
                    self.constraints.push(Inequality::new(
                        Term::Constant(concept),
                        Term::Variable(var),
                    ));
                }
                AnnotationConstraint::LessEqual(element, concept) => {
                    let var = self.intern(model, Propertyable::Element(element));
                    self.constraints.push(Inequality::new(
                        Term::Variable(var),
                        Term::Constant(concept),
                    ));
                }
                AnnotationConstraint::Pin(element, concept) => {
                    let var = self.intern(model, Propertyable::Element(element));
                    self.terms.pin(var, concept);
                }
            }
        }
        Ok(())
    }

    /// Pin a propertyable to a fixed concept, overriding inference.
    ///
    /// Equivalent to an `==` annotation, but addressable from code. The pin
    /// lives in the current variable set, so call this after `initialize`
    /// (re-initializing rebuilds the variables and drops the pin).
    pub fn set_equals(&mut self, model: &Model, prop: Propertyable, concept: ConceptId) {
        let var = self.intern(model, prop);
        self.terms.pin(var, concept);
    }

    /// Run the fixpoint. Any failure rolls the solver back to reset.
    #[instrument(skip_all, fields(solver = %self.name))]
    pub fn resolve(&mut self) -> OntolatResult<()> {
        self.state = SolverState::Resolving;
        let cx = EvalContext::new(vec![&*self.ontology], &self.library);
        let outcome = match lattice::solve(
            &self.ontology,
            &cx,
            &self.terms,
            &self.constraints,
            self.config.fixed_point,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.reset();
                return Err(err);
            }
        };

        if !outcome.is_consistent() {
            let mut rendered: Vec<String> = outcome
                .conflicts
                .iter()
                .map(|&index| self.constraints[index].render(&self.terms))
                .collect();
            rendered.sort();
            let err = SolverError::Conflicts {
                toplevel: self.toplevel.clone(),
                conflicts: rendered.join("\n"),
            };
            self.reset();
            return Err(err.into());
        }

        self.stats = outcome.stats;
        self.state = SolverState::Resolved;
        info!(
            variables = self.stats.variables,
            constraints = self.stats.constraints,
            "concepts resolved"
        );
        Ok(())
    }

    /// Acceptability pass: every resolved concept must be a valid terminal
    /// result. Violations are accumulated, sorted, and reported in one
    /// aggregated error.
    pub fn check_errors(&mut self) -> OntolatResult<()> {
        if !matches!(self.state, SolverState::Resolved | SolverState::Checked) {
            return Err(SolverError::NotResolved {
                solver: self.name.clone(),
            }
            .into());
        }
        let mut errors = Vec::new();
        for var in self.terms.variables() {
            let Some(concept) = self.terms.value(var) else {
                continue;
            };
            if !self.ontology.is_acceptable(concept) {
                let concept_name = self
                    .ontology
                    .name_of(concept)
                    .unwrap_or_else(|| concept.to_string());
                errors.push(format!(
                    "{} resolved to unacceptable concept {}",
                    self.terms.name_of(var),
                    concept_name
                ));
            }
        }
        self.state = SolverState::Checked;
        if errors.is_empty() {
            return Ok(());
        }
        errors.sort();
        Err(SolverError::Aggregated {
            solver: self.name.clone(),
            count: errors.len(),
            report: errors.join("\n"),
        }
        .into())
    }

    /// Initialize, resolve, and check in one call.
    pub fn invoke(&mut self, model: &Model) -> OntolatResult<()> {
        self.initialize(model)?;
        self.resolve()?;
        self.check_errors()
    }

    /// Every propertyable known to the solver, in variable order.
    pub fn all_propertyables(&self) -> Vec<Propertyable> {
        self.terms
            .variables()
            .into_iter()
            .filter_map(|var| self.terms.propertyable_of(var))
            .collect()
    }

    /// The resolved concept of a model element, if any.
    pub fn concept_for_element(&self, element: ElementId) -> Option<ConceptId> {
        self.concept_for(Propertyable::Element(element))
    }

    /// The resolved concept of an expression node, if any.
    pub fn concept_for_ast_node(&self, attribute: ElementId, node: AstId) -> Option<ConceptId> {
        self.concept_for(Propertyable::AstNode { attribute, node })
    }

    /// The resolved concept of any propertyable, if any.
    pub fn concept_for(&self, prop: Propertyable) -> Option<ConceptId> {
        if !matches!(self.state, SolverState::Resolved | SolverState::Checked) {
            return None;
        }
        self.terms.lookup(prop).and_then(|var| self.terms.value(var))
    }

    /// The full resolved assignment.
    pub fn resolved_concepts(&self) -> OntolatResult<Vec<(Propertyable, ConceptId)>> {
        if !matches!(self.state, SolverState::Resolved | SolverState::Checked) {
            return Err(SolverError::NotResolved {
                solver: self.name.clone(),
            }
            .into());
        }
        Ok(self.terms.resolved())
    }

    pub(crate) fn terms(&self) -> &TermManager {
        &self.terms
    }

    pub(crate) fn trained_outcome(&self) -> Option<&TrainedOutcome> {
        self.trained.as_ref()
    }

    pub(crate) fn set_trained_outcome(&mut self, outcome: TrainedOutcome) {
        self.trained = Some(outcome);
    }
}

impl std::fmt::Debug for OntologySolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologySolver")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("variables", &self.terms.len())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use crate::model::PortDirection;

    fn const_ontology() -> (Arc<Ontology>, ConceptId, ConceptId, ConceptId) {
        let ont = Ontology::new("constAnalysis");
        let unknown = ont.add_concept("Unknown").unwrap();
        let constant = ont.add_concept("Const").unwrap();
        let nonconst = ont.add_concept("NonConst").unwrap();
        ont.add_edge(unknown, constant).unwrap();
        ont.add_edge(constant, nonconst).unwrap();
        (Arc::new(ont), unknown, constant, nonconst)
    }

    /// One source port fanning out to two sink ports on separate actors.
    fn fanout_model() -> (Model, ElementId, ElementId, ElementId) {
        let mut model = Model::new("top");
        let source = model.add_atomic(None, "source").unwrap();
        let middle = model.add_atomic(None, "middle").unwrap();
        let sink = model.add_atomic(None, "sink").unwrap();
        let s_out = model
            .add_port(source, "out", PortDirection::Output)
            .unwrap();
        let m_in = model.add_port(middle, "in", PortDirection::Input).unwrap();
        let k_in = model.add_port(sink, "in", PortDirection::Input).unwrap();
        model.connect(s_out, m_in).unwrap();
        model.connect(s_out, k_in).unwrap();
        (model, s_out, m_in, k_in)
    }

    #[test]
    fn forward_least_propagates_an_annotation_downstream() {
        let (ontology, _, constant, _) = const_ontology();
        let (mut model, s_out, m_in, k_in) = fanout_model();
        let source = model.element(s_out).unwrap().container.unwrap();
        model
            .annotate(source, "constSolver", "c0", "out == Const")
            .unwrap();

        let session = Arc::new(AnalysisSession::new());
        let mut solver = OntologySolver::new(
            "constSolver",
            SolverConfig::default(),
            Arc::clone(&ontology),
            session,
        );
        solver.invoke(&model).unwrap();

        assert_eq!(solver.concept_for_element(s_out), Some(constant));
        assert_eq!(solver.concept_for_element(m_in), Some(constant));
        assert_eq!(solver.concept_for_element(k_in), Some(constant));
        assert_eq!(solver.state(), SolverState::Checked);
    }

    #[test]
    fn unannotated_model_rests_at_bottom() {
        let (ontology, unknown, _, _) = const_ontology();
        let (model, s_out, _, k_in) = fanout_model();

        let session = Arc::new(AnalysisSession::new());
        let mut solver = OntologySolver::new(
            "constSolver",
            SolverConfig::default(),
            ontology,
            session,
        );
        solver.invoke(&model).unwrap();
        assert_eq!(solver.concept_for_element(s_out), Some(unknown));
        assert_eq!(solver.concept_for_element(k_in), Some(unknown));
    }

    #[test]
    fn conflicting_annotations_roll_back_to_reset() {
        let (ontology, _, _, _) = const_ontology();
        let (mut model, s_out, _, k_in) = fanout_model();
        let source = model.element(s_out).unwrap().container.unwrap();
        let sink = model.element(k_in).unwrap().container.unwrap();
        model
            .annotate(source, "constSolver", "c0", "out == NonConst")
            .unwrap();
        model
            .annotate(sink, "constSolver", "c1", "in == Const")
            .unwrap();

        let session = Arc::new(AnalysisSession::new());
        let epoch_before = session.epoch();
        let mut solver = OntologySolver::new(
            "constSolver",
            SolverConfig::default(),
            ontology,
            Arc::clone(&session),
        );
        let err = solver.invoke(&model).unwrap_err();
        assert!(matches!(
            err,
            crate::error::OntolatError::Solver(SolverError::Conflicts { .. })
        ));
        assert_eq!(solver.state(), SolverState::Reset);
        assert!(session.epoch() > epoch_before);
        assert!(solver.concept_for_element(s_out).is_none());
    }

    #[test]
    fn unacceptable_results_aggregate_sorted() {
        let ontology = Ontology::new("errorAnalysis");
        let ok = ontology.add_concept("Ok").unwrap();
        let error = ontology.add_concept_full("Error", false, Some("red")).unwrap();
        ontology.add_edge(ok, error).unwrap();
        let ontology = Arc::new(ontology);

        let (mut model, s_out, _, k_in) = fanout_model();
        let source = model.element(s_out).unwrap().container.unwrap();
        model
            .annotate(source, "errorSolver", "c0", "out >= Error")
            .unwrap();

        let session = Arc::new(AnalysisSession::new());
        let mut solver = OntologySolver::new(
            "errorSolver",
            SolverConfig::default(),
            ontology,
            session,
        );
        let err = solver.invoke(&model).unwrap_err();
        match err {
            crate::error::OntolatError::Solver(SolverError::Aggregated {
                count, report, ..
            }) => {
                // The error reached both downstream ports and the source.
                assert!(count >= 3);
                let lines: Vec<&str> = report.lines().collect();
                let mut sorted = lines.clone();
                sorted.sort();
                assert_eq!(lines, sorted);
                assert!(report.contains("top.sink.in"));
            }
            other => panic!("expected aggregated error, got {other:?}"),
        }
        let _ = k_in;
    }

    #[test]
    fn backward_strategy_flips_propagation() {
        let (ontology, _, constant, _) = const_ontology();
        let (mut model, s_out, _, k_in) = fanout_model();
        let sink = model.element(k_in).unwrap().container.unwrap();
        model
            .annotate(sink, "constSolver", "c0", "in == Const")
            .unwrap();

        let session = Arc::new(AnalysisSession::new());
        let config = SolverConfig {
            strategy: Strategy::Backward,
            ..SolverConfig::default()
        };
        let mut solver = OntologySolver::new("constSolver", config, ontology, session);
        solver.invoke(&model).unwrap();
        // source >= sink under backward/least, so the source rose to Const.
        assert_eq!(solver.concept_for_element(s_out), Some(constant));
    }

    #[test]
    fn reinitializing_twice_yields_the_same_state() {
        let (ontology, unknown, _, _) = const_ontology();
        let (model, s_out, m_in, _) = fanout_model();

        let session = Arc::new(AnalysisSession::new());
        let mut solver = OntologySolver::new(
            "constSolver",
            SolverConfig::default(),
            ontology,
            session,
        );

        solver.initialize(&model).unwrap();
        let vars_first = solver.terms().len();
        solver.initialize(&model).unwrap();
        assert_eq!(solver.state(), SolverState::AdaptersBuilt);
        assert_eq!(solver.terms().len(), vars_first);

        solver.resolve().unwrap();
        let first = solver.resolved_concepts().unwrap();
        solver.invoke(&model).unwrap();
        let second = solver.resolved_concepts().unwrap();
        assert_eq!(first, second);
        assert_eq!(solver.concept_for_element(s_out), Some(unknown));
        assert_eq!(solver.concept_for_element(m_in), Some(unknown));
    }

    #[test]
    fn set_equals_pins_a_propertyable() {
        let (ontology, _, constant, _) = const_ontology();
        let (model, s_out, m_in, k_in) = fanout_model();

        let session = Arc::new(AnalysisSession::new());
        let mut solver = OntologySolver::new(
            "constSolver",
            SolverConfig::default(),
            ontology,
            session,
        );
        solver.initialize(&model).unwrap();
        solver.set_equals(&model, Propertyable::Element(s_out), constant);
        solver.resolve().unwrap();
        solver.check_errors().unwrap();

        // The pin held against inference and propagated downstream.
        assert_eq!(solver.concept_for_element(s_out), Some(constant));
        assert_eq!(solver.concept_for_element(m_in), Some(constant));
        assert_eq!(solver.concept_for_element(k_in), Some(constant));
    }

    #[test]
    fn reading_results_before_resolve_is_an_error() {
        let (ontology, _, _, _) = const_ontology();
        let session = Arc::new(AnalysisSession::new());
        let solver = OntologySolver::new(
            "constSolver",
            SolverConfig::default(),
            ontology,
            session,
        );
        assert!(solver.resolved_concepts().is_err());
    }
}
