//! End-to-end integration tests for the ontolat solver.
//!
//! These tests exercise the full pipeline from ontology construction through
//! model annotation, fixpoint resolution, export, and exception analysis,
//! validating that the adapters, expression layer, and solver all work
//! together.

use std::sync::Arc;

use ontolat::analyzer::{ExceptionAnalyzer, ModelFault, ERROR_SOLVER_NAME};
use ontolat::config::{SolverConfig, Strategy};
use ontolat::export::{export_resolved_to_path, resolved_records};
use ontolat::function::expression::ExpressionConceptFunction;
use ontolat::model::{AttributeRole, Model, PortDirection, Visibility};
use ontolat::ontology::Ontology;
use ontolat::solver::{AnalysisSession, OntologySolver, TrainedOutcome};

fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn const_ontology() -> Arc<Ontology> {
    let ontology = Ontology::new("constAnalysis");
    let unknown = ontology.add_concept("Unknown").unwrap();
    let constant = ontology
        .add_concept_full("Const", true, Some("green"))
        .unwrap();
    let nonconst = ontology
        .add_concept_full("NonConst", true, Some("blue"))
        .unwrap();
    ontology.add_edge(unknown, constant).unwrap();
    ontology.add_edge(constant, nonconst).unwrap();
    Arc::new(ontology)
}

#[test]
fn hierarchical_model_resolves_and_exports() {
    trace_init();
    let ontology = const_ontology();
    let constant = ontology.lookup("Const").unwrap();

    // top.sub.ramp.{gain, output} -> top.display.input
    let mut model = Model::new("top");
    let sub = model.add_composite(None, "sub").unwrap();
    let ramp = model.add_atomic(Some(sub), "ramp").unwrap();
    let output = model
        .add_port(ramp, "output", PortDirection::Output)
        .unwrap();
    let gain = model
        .add_attribute(ramp, "gain", AttributeRole::Parameter, Visibility::Full, "Const")
        .unwrap();
    let display = model.add_atomic(None, "display").unwrap();
    let input = model
        .add_port(display, "input", PortDirection::Input)
        .unwrap();
    model.connect(output, input).unwrap();
    model
        .annotate(ramp, "constSolver", "c0", "output == Const")
        .unwrap();

    let mut solver = OntologySolver::new(
        "constSolver",
        SolverConfig::default(),
        Arc::clone(&ontology),
        Arc::new(AnalysisSession::new()),
    );
    solver.invoke(&model).unwrap();

    // The parameter's expression names a concept directly; the port's
    // annotation propagates across the hierarchy-crossing link.
    assert_eq!(solver.concept_for_element(gain), Some(constant));
    assert_eq!(solver.concept_for_element(output), Some(constant));
    assert_eq!(solver.concept_for_element(input), Some(constant));

    let records = resolved_records(&solver, &model).unwrap();
    assert!(records
        .iter()
        .any(|r| r.element == "top.display.input" && r.concept == "Const"));

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("resolved.json");
    export_resolved_to_path(&solver, &model, &path).unwrap();
    let reread: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reread.as_array().unwrap().len(), records.len());
}

#[test]
fn expression_function_joins_port_concepts() {
    let ontology = const_ontology();
    let constant = ontology.lookup("Const").unwrap();
    let nonconst = ontology.lookup("NonConst").unwrap();

    let mut model = Model::new("top");
    let actor = model.add_atomic(None, "multiply").unwrap();
    model
        .add_port(actor, "in1", PortDirection::Input)
        .unwrap();
    model
        .add_port(actor, "in2", PortDirection::Input)
        .unwrap();
    let body = model
        .add_attribute(
            actor,
            "result",
            AttributeRole::ExpressionBody,
            Visibility::Full,
            "merge(in1, in2)",
        )
        .unwrap();
    model
        .annotate(actor, "constSolver", "c0", "in1 == Const")
        .unwrap();
    model
        .annotate(actor, "constSolver", "c1", "in2 == Const")
        .unwrap();

    let merge = ExpressionConceptFunction::new(
        "merge",
        vec!["a".into(), "b".into()],
        vec![ontology.id(), ontology.id()],
        ontology.id(),
        "a == Const && b == Const ? Const : NonConst",
    )
    .unwrap();

    let mut solver = OntologySolver::new(
        "constSolver",
        SolverConfig::default(),
        Arc::clone(&ontology),
        Arc::new(AnalysisSession::new()),
    );
    solver.register_function(Arc::new(merge));

    solver.invoke(&model).unwrap();
    assert_eq!(solver.concept_for_element(body), Some(constant));

    // Degrade one input and the function result follows.
    model
        .annotate(actor, "constSolver", "c1", "in2 == NonConst")
        .unwrap();
    solver.invoke(&model).unwrap();
    assert_eq!(solver.concept_for_element(body), Some(nonconst));
}

#[test]
fn train_then_test_catches_a_regression() {
    let ontology = const_ontology();
    let mut model = Model::new("top");
    let source = model.add_atomic(None, "source").unwrap();
    let sink = model.add_atomic(None, "sink").unwrap();
    let out = model
        .add_port(source, "out", PortDirection::Output)
        .unwrap();
    let inp = model.add_port(sink, "in", PortDirection::Input).unwrap();
    model.connect(out, inp).unwrap();
    model
        .annotate(source, "constSolver", "c0", "out == Const")
        .unwrap();

    let mut solver = OntologySolver::new(
        "constSolver",
        SolverConfig::default(),
        ontology,
        Arc::new(AnalysisSession::new()),
    );
    match solver.train(&model) {
        TrainedOutcome::Concepts(records) => assert!(!records.is_empty()),
        other => panic!("expected a successful training run, got {other:?}"),
    }
    solver.test(&model).unwrap();

    model
        .annotate(source, "constSolver", "c0", "out == NonConst")
        .unwrap();
    assert!(solver.test(&model).is_err());
}

#[test]
fn backward_solver_shares_a_session_with_forward() {
    let ontology = const_ontology();
    let constant = ontology.lookup("Const").unwrap();
    let session = Arc::new(AnalysisSession::new());

    let mut model = Model::new("top");
    let source = model.add_atomic(None, "source").unwrap();
    let sink = model.add_atomic(None, "sink").unwrap();
    let out = model
        .add_port(source, "out", PortDirection::Output)
        .unwrap();
    let inp = model.add_port(sink, "in", PortDirection::Input).unwrap();
    model.connect(out, inp).unwrap();
    model
        .annotate(source, "fwd", "c0", "out == Const")
        .unwrap();
    model.annotate(sink, "bwd", "c0", "in == Const").unwrap();

    let mut forward = OntologySolver::new(
        "fwd",
        SolverConfig::default(),
        Arc::clone(&ontology),
        Arc::clone(&session),
    );
    let mut backward = OntologySolver::new(
        "bwd",
        SolverConfig {
            strategy: Strategy::Backward,
            ..SolverConfig::default()
        },
        Arc::clone(&ontology),
        Arc::clone(&session),
    );

    forward.invoke(&model).unwrap();
    backward.invoke(&model).unwrap();
    assert_eq!(forward.concept_for_element(inp), Some(constant));
    assert_eq!(backward.concept_for_element(out), Some(constant));

    // A reset on one solver bumps the shared epoch for both.
    let before = session.epoch();
    forward.reset();
    assert!(session.epoch() > before);
}

#[test]
fn fault_analysis_marks_error_reach() {
    trace_init();
    let error_ontology = {
        let ontology = Ontology::new("errorAnalysis");
        let ok = ontology.add_concept("Ok").unwrap();
        let error = ontology
            .add_concept_full("Error", true, Some("red"))
            .unwrap();
        ontology.add_edge(ok, error).unwrap();
        Arc::new(ontology)
    };
    let error = error_ontology.lookup("Error").unwrap();

    let mut model = Model::new("top");
    let ramp = model.add_atomic(None, "ramp").unwrap();
    let display = model.add_atomic(None, "display").unwrap();
    let out = model
        .add_port(ramp, "output", PortDirection::Output)
        .unwrap();
    let inp = model
        .add_port(display, "input", PortDirection::Input)
        .unwrap();
    model.connect(out, inp).unwrap();

    let mut solvers = vec![OntologySolver::new(
        ERROR_SOLVER_NAME,
        SolverConfig::default(),
        error_ontology,
        Arc::new(AnalysisSession::new()),
    )];

    let mut analyzer = ExceptionAnalyzer::new();
    let fault = ModelFault::Structured {
        message: "divide by zero in ramp".into(),
        primary: Some(out),
        secondary: None,
    };
    assert!(analyzer.exception_occurred(&mut solvers, &mut model, &fault));
    assert!(analyzer.status().contains("divide by zero in ramp"));

    // The error reached the downstream input through the link.
    assert_eq!(solvers[0].concept_for_element(out), Some(error));
    assert_eq!(solvers[0].concept_for_element(inp), Some(error));
}
