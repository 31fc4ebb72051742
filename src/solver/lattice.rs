//! The lattice fixpoint algorithm.
//!
//! A worklist implementation of Rehof–Mogensen constraint solving: settable
//! variables start at one extreme of the lattice and move monotonically
//! toward the other until every inequality holds or nothing changes.
//! Inequalities whose updatable side is pinned (or is not a plain variable)
//! are checked after the fixpoint; violations are reported as conflicts
//! rather than failing fast, so one pass reports every inconsistency.

use tracing::{debug, trace};

use crate::config::{FixedPoint, Strategy};
use crate::concept::ConceptOrdering;
use crate::error::OntolatResult;
use crate::function::EvalContext;
use crate::ontology::Ontology;

use super::inequality::{Inequality, Term, TermManager};

/// What a link between a source and a sink port contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// sink >= source
    SinkGeSource,
    /// source >= sink
    SourceGeSink,
    /// source == sink
    Equals,
    /// no constraint
    None,
}

/// The constraint direction implied by a strategy under a fixpoint.
///
/// Propagating forward under a least fixpoint pushes sinks up from sources;
/// under a greatest fixpoint the same strategy pulls sources down from
/// sinks, which flips the inequality. Backward is the mirror image.
pub fn constraint_type(strategy: Strategy, fixed_point: FixedPoint) -> ConstraintType {
    match (strategy, fixed_point) {
        (Strategy::Forward, FixedPoint::Least) | (Strategy::Backward, FixedPoint::Greatest) => {
            ConstraintType::SinkGeSource
        }
        (Strategy::Backward, FixedPoint::Least) | (Strategy::Forward, FixedPoint::Greatest) => {
            ConstraintType::SourceGeSink
        }
        (Strategy::Bidirectional, _) => ConstraintType::Equals,
        (Strategy::None, _) => ConstraintType::None,
    }
}

/// Counters from one fixpoint run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixpointStats {
    pub variables: usize,
    pub constraints: usize,
    /// Constraint evaluations performed before the worklist drained.
    pub evaluations: usize,
}

/// The result of a fixpoint run: statistics plus the indexes of constraints
/// still violated after convergence.
#[derive(Debug, Clone, Default)]
pub struct FixpointOutcome {
    pub stats: FixpointStats,
    pub conflicts: Vec<usize>,
}

impl FixpointOutcome {
    pub fn is_consistent(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Run the fixpoint over the given constraints.
///
/// Every settable variable is initialized to the lattice bottom (least) or
/// top (greatest); pinned variables keep their values. Terminates because
/// updates move monotonically through a finite lattice skeleton.
pub fn solve(
    ontology: &Ontology,
    cx: &EvalContext<'_>,
    terms: &TermManager,
    constraints: &[Inequality],
    fixed_point: FixedPoint,
) -> OntolatResult<FixpointOutcome> {
    let start = match fixed_point {
        FixedPoint::Least => ontology.bottom()?,
        FixedPoint::Greatest => ontology.top()?,
    };
    for var in terms.variables() {
        if terms.is_settable(var) && terms.value(var).is_none() {
            terms.set_value(var, start);
        }
    }

    // Map each variable to the constraints that must be re-examined when it
    // moves: for a least fixpoint a change to the lesser side can push the
    // greater side up, so constraints index by their lesser-side variables.
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); terms.len()];
    for (index, constraint) in constraints.iter().enumerate() {
        let watched = match fixed_point {
            FixedPoint::Least => constraint.lesser.variables(),
            FixedPoint::Greatest => constraint.greater.variables(),
        };
        for var in watched {
            dependents[var.index()].push(index);
        }
    }

    let mut stats = FixpointStats {
        variables: terms.len(),
        constraints: constraints.len(),
        evaluations: 0,
    };

    let mut queued = vec![true; constraints.len()];
    let mut worklist: Vec<usize> = (0..constraints.len()).collect();
    while let Some(index) = worklist.pop() {
        queued[index] = false;
        stats.evaluations += 1;
        let constraint = &constraints[index];

        let updated = match fixed_point {
            FixedPoint::Least => raise_greater(ontology, cx, terms, constraint)?,
            FixedPoint::Greatest => lower_lesser(ontology, cx, terms, constraint)?,
        };
        if let Some(moved) = updated {
            trace!(constraint = index, variable = moved.index(), "variable moved");
            for &dependent in &dependents[moved.index()] {
                if !queued[dependent] {
                    queued[dependent] = true;
                    worklist.push(dependent);
                }
            }
        }
    }

    // Post-fixpoint check: every inequality must hold, including those whose
    // updatable side was pinned or structured.
    let mut conflicts = Vec::new();
    for (index, constraint) in constraints.iter().enumerate() {
        let lesser = constraint.lesser.value(terms, cx)?;
        let greater = constraint.greater.value(terms, cx)?;
        let satisfied = match (lesser, greater) {
            (Some(l), Some(g)) => matches!(
                ontology.compare(l, g)?,
                ConceptOrdering::Lower | ConceptOrdering::Same
            ),
            // An unassigned side means the constraint never took part.
            _ => true,
        };
        if !satisfied {
            conflicts.push(index);
        }
    }

    debug!(
        variables = stats.variables,
        constraints = stats.constraints,
        evaluations = stats.evaluations,
        conflicts = conflicts.len(),
        "fixpoint converged"
    );
    Ok(FixpointOutcome { stats, conflicts })
}

/// Least-fixpoint step: join the greater-side variable up to cover the
/// lesser side. Returns the variable that moved, if any.
fn raise_greater(
    ontology: &Ontology,
    cx: &EvalContext<'_>,
    terms: &TermManager,
    constraint: &Inequality,
) -> OntolatResult<Option<super::inequality::VarId>> {
    let Term::Variable(target) = &constraint.greater else {
        return Ok(None);
    };
    let target = *target;
    if !terms.is_settable(target) {
        return Ok(None);
    }
    let Some(lesser) = constraint.lesser.value(terms, cx)? else {
        return Ok(None);
    };
    let Some(current) = terms.value(target) else {
        return Ok(None);
    };
    if matches!(
        ontology.compare(lesser, current)?,
        ConceptOrdering::Lower | ConceptOrdering::Same
    ) {
        return Ok(None);
    }
    let joined = ontology.least_upper_bound(lesser, current)?;
    terms.set_value(target, joined);
    Ok(Some(target))
}

/// Greatest-fixpoint step: meet the lesser-side variable down under the
/// greater side.
fn lower_lesser(
    ontology: &Ontology,
    cx: &EvalContext<'_>,
    terms: &TermManager,
    constraint: &Inequality,
) -> OntolatResult<Option<super::inequality::VarId>> {
    let Term::Variable(target) = &constraint.lesser else {
        return Ok(None);
    };
    let target = *target;
    if !terms.is_settable(target) {
        return Ok(None);
    }
    let Some(greater) = constraint.greater.value(terms, cx)? else {
        return Ok(None);
    };
    let Some(current) = terms.value(target) else {
        return Ok(None);
    };
    if matches!(
        ontology.compare(current, greater)?,
        ConceptOrdering::Lower | ConceptOrdering::Same
    ) {
        return Ok(None);
    }
    let met = ontology.greatest_lower_bound(current, greater)?;
    terms.set_value(target, met);
    Ok(Some(target))
}
