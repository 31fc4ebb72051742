//! Trained-outcome regression support.
//!
//! `train` runs the solver once and records the outcome as ground truth:
//! either the full concept assignment or, for models that are expected to
//! fail, the failure message. `test` re-runs the solver and compares against
//! the recording. Real faults stay in the error channel; an expected failure
//! is data, not an exception.

use serde::{Deserialize, Serialize};

use crate::error::{OntolatResult, SolverError};
use crate::model::Model;

use super::{OntologySolver, SolverState};

/// One propertyable's recorded concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainedConceptRecord {
    /// Variable name (the propertyable's full name).
    pub element: String,
    /// Resolved concept name, `None` if the variable stayed unassigned.
    pub concept: Option<String>,
}

/// What a training run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainedOutcome {
    /// Resolution succeeded with this assignment, sorted by element name.
    Concepts(Vec<TrainedConceptRecord>),
    /// Resolution failed with this message.
    Failure(String),
}

impl OntologySolver {
    /// Run the solver and record the outcome as the regression baseline.
    pub fn train(&mut self, model: &Model) -> &TrainedOutcome {
        let outcome = match self.invoke(model) {
            Ok(()) => TrainedOutcome::Concepts(self.snapshot_records()),
            Err(err) => TrainedOutcome::Failure(err.to_string()),
        };
        self.set_trained_outcome(outcome);
        self.trained_outcome().expect("outcome was just recorded")
    }

    /// Re-run the solver and compare against the trained baseline.
    ///
    /// Every mismatch is accumulated into one aggregated error; a matching
    /// run (including a matching expected failure) returns `Ok`.
    pub fn test(&mut self, model: &Model) -> OntolatResult<()> {
        let Some(expected) = self.trained_outcome().cloned() else {
            return Err(SolverError::NotTrained {
                solver: self.name().to_string(),
            }
            .into());
        };

        let actual = match self.invoke(model) {
            Ok(()) => TrainedOutcome::Concepts(self.snapshot_records()),
            Err(err) => TrainedOutcome::Failure(err.to_string()),
        };

        let mut mismatches = Vec::new();
        match (&expected, &actual) {
            (TrainedOutcome::Failure(want), TrainedOutcome::Failure(got)) => {
                if want != got {
                    mismatches.push(format!(
                        "expected failure {want:?}, got failure {got:?}"
                    ));
                }
            }
            (TrainedOutcome::Failure(want), TrainedOutcome::Concepts(_)) => {
                mismatches.push(format!(
                    "expected failure {want:?}, but resolution succeeded"
                ));
            }
            (TrainedOutcome::Concepts(_), TrainedOutcome::Failure(got)) => {
                mismatches.push(format!(
                    "expected successful resolution, got failure {got:?}"
                ));
            }
            (TrainedOutcome::Concepts(want), TrainedOutcome::Concepts(got)) => {
                compare_records(want, got, &mut mismatches);
            }
        }

        if mismatches.is_empty() {
            return Ok(());
        }
        mismatches.sort();
        Err(SolverError::Aggregated {
            solver: self.name().to_string(),
            count: mismatches.len(),
            report: mismatches.join("\n"),
        }
        .into())
    }

    /// Whether a baseline has been recorded.
    pub fn is_trained(&self) -> bool {
        self.trained_outcome().is_some()
    }

    /// The current assignment as records, sorted by element name.
    fn snapshot_records(&self) -> Vec<TrainedConceptRecord> {
        debug_assert!(matches!(
            self.state(),
            SolverState::Resolved | SolverState::Checked
        ));
        let terms = self.terms();
        let mut records: Vec<TrainedConceptRecord> = terms
            .variables()
            .into_iter()
            .map(|var| TrainedConceptRecord {
                element: terms.name_of(var),
                concept: terms
                    .value(var)
                    .and_then(|concept| self.ontology().name_of(concept)),
            })
            .collect();
        records.sort_by(|a, b| a.element.cmp(&b.element));
        records
    }
}

fn compare_records(
    want: &[TrainedConceptRecord],
    got: &[TrainedConceptRecord],
    mismatches: &mut Vec<String>,
) {
    let by_element: std::collections::HashMap<&str, &TrainedConceptRecord> =
        got.iter().map(|r| (r.element.as_str(), r)).collect();
    for record in want {
        match by_element.get(record.element.as_str()) {
            Some(actual) if actual.concept == record.concept => {}
            Some(actual) => mismatches.push(format!(
                "{}: expected {:?}, got {:?}",
                record.element, record.concept, actual.concept
            )),
            None => mismatches.push(format!(
                "{}: expected {:?}, got no variable",
                record.element, record.concept
            )),
        }
    }
    let wanted: std::collections::HashSet<&str> =
        want.iter().map(|r| r.element.as_str()).collect();
    for record in got {
        if !wanted.contains(record.element.as_str()) {
            mismatches.push(format!(
                "{}: unexpected variable resolved to {:?}",
                record.element, record.concept
            ));
        }
    }
}
