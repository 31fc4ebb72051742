//! Solver configuration.
//!
//! A solver is configured by two axes: the propagation strategy along model
//! links and the fixpoint direction. The combination picks the constraint
//! type emitted for every source-to-sink link (see
//! [`crate::solver::lattice::constraint_type`]).

use serde::{Deserialize, Serialize};

use crate::error::{OntolatResult, SolverError};

/// Which way concepts propagate along links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Source constrains sink.
    #[default]
    Forward,
    /// Sink constrains source.
    Backward,
    /// Source and sink are forced equal.
    Bidirectional,
    /// Links emit no constraints.
    None,
}

/// Which fixpoint the solver computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedPoint {
    /// Start at bottom, join upward.
    #[default]
    Least,
    /// Start at top, meet downward.
    Greatest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub strategy: Strategy,
    #[serde(rename = "fixed-point")]
    pub fixed_point: FixedPoint,
}

impl SolverConfig {
    /// Parse a configuration from TOML, e.g.
    /// `strategy = "backward"` / `fixed-point = "greatest"`.
    pub fn from_toml_str(source: &str) -> OntolatResult<Self> {
        toml::from_str(source).map_err(|err| {
            SolverError::InvalidConfig {
                message: err.to_string(),
            }
            .into()
        })
    }
}
