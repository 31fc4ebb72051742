//! Reactive exception analysis.
//!
//! When a model run fails, the [`ExceptionAnalyzer`] tries to turn the fault
//! into constraint annotations: it finds the conventionally named error
//! solver, lower-bounds every output port of the implicated actor at
//! `Error`, and re-invokes the solver so the error's reach through the model
//! becomes visible. The whole analysis is best-effort: any missing piece
//! abandons it with a status message and `false`, never an error, and never
//! blocks the original fault.

use tracing::{debug, warn};

use crate::model::{ElementKind, ElementId, Model, PortDirection};
use crate::solver::OntologySolver;

/// Conventional name of the solver the analyzer looks for.
pub const ERROR_SOLVER_NAME: &str = "ErrorOntologySolver";

/// A fault reported by a model run.
#[derive(Debug, Clone)]
pub enum ModelFault {
    /// A fault with structured location data: up to two implicated elements.
    Structured {
        message: String,
        primary: Option<ElementId>,
        secondary: Option<ElementId>,
    },
    /// A fault with no location data. Cannot be analyzed.
    Plain { message: String },
}

/// Best-effort re-solve on model failure.
#[derive(Debug, Default)]
pub struct ExceptionAnalyzer {
    status: String,
}

impl ExceptionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The outcome message of the last analysis attempt.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Analyze a fault: annotate the implicated actor's output ports with an
    /// `Error` lower bound and re-invoke the error solver.
    ///
    /// Returns `false` (with a status message) whenever the analysis cannot
    /// proceed: no solver named [`ERROR_SOLVER_NAME`], an unstructured
    /// fault, or no identifiable actor.
    pub fn exception_occurred(
        &mut self,
        solvers: &mut [OntologySolver],
        model: &mut Model,
        fault: &ModelFault,
    ) -> bool {
        let Some(solver) = solvers
            .iter_mut()
            .find(|s| s.name() == ERROR_SOLVER_NAME)
        else {
            self.status = format!(
                "No ontology solver found: nothing named {ERROR_SOLVER_NAME} is attached to {}",
                model.name()
            );
            debug!(status = %self.status, "exception analysis abandoned");
            return false;
        };

        let ModelFault::Structured {
            message,
            primary,
            secondary,
        } = fault
        else {
            self.status = "Fault carries no location data; analysis skipped".to_string();
            debug!(status = %self.status, "exception analysis abandoned");
            return false;
        };

        let Some(actor) = [*primary, *secondary]
            .into_iter()
            .flatten()
            .find_map(|id| implicated_actor(model, id))
        else {
            self.status = "No actor could be identified from the fault".to_string();
            debug!(status = %self.status, "exception analysis abandoned");
            return false;
        };

        let ports: Vec<ElementId> = model
            .ports_of(actor, Some(PortDirection::Output))
            .iter()
            .map(|p| p.id)
            .collect();
        for port in ports {
            let label = model.full_name(port).replace('.', "_");
            let Ok(element) = model.element(port) else { continue };
            let expression = format!("{} >= Error", element.name);
            if model
                .annotate(actor, ERROR_SOLVER_NAME, &label, &expression)
                .is_err()
            {
                warn!(port = %model.full_name(port), "failed to annotate output port");
            }
        }

        match solver.invoke(model) {
            Ok(()) => {
                self.status = format!("Re-solved after fault: {message}");
            }
            Err(err) => {
                // The re-solve surfacing errors is expected here: the whole
                // point is to mark error reach. Record, do not propagate.
                self.status = format!("Re-solve reported: {err}");
            }
        }
        debug!(status = %self.status, "exception analysis complete");
        true
    }
}

/// The entity to annotate for an implicated element: the element itself if
/// it is an entity, otherwise its containing entity.
fn implicated_actor(model: &Model, id: ElementId) -> Option<ElementId> {
    let element = model.element(id).ok()?;
    match element.kind {
        ElementKind::AtomicEntity | ElementKind::CompositeEntity => Some(element.id),
        _ => element.container.and_then(|c| implicated_actor(model, c)),
    }
}
