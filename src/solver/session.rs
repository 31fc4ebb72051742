//! Shared analysis session state.
//!
//! One session is owned by the enclosing model analysis and handed by
//! reference to every solver attached to the same model. It carries the
//! parse-tree cache, accumulated diagnostics, and the reset epoch that keeps
//! all solvers in lock-step: any solver's reset bumps the epoch, and every
//! other solver re-resets itself before its next run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::ExprError;
use crate::expr::ParsedExpression;
use crate::model::ElementId;

#[derive(Default)]
pub struct AnalysisSession {
    epoch: AtomicU64,
    diagnostics: RwLock<Vec<String>>,
    parse_cache: RwLock<HashMap<(ElementId, u64), Arc<ParsedExpression>>>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current reset epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Bump the epoch and clear shared state. Called by any solver's reset.
    pub fn reset(&self) -> u64 {
        self.diagnostics
            .write()
            .expect("session lock poisoned")
            .clear();
        self.parse_cache
            .write()
            .expect("session lock poisoned")
            .clear();
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record a best-effort diagnostic message.
    pub fn diagnostic(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(diagnostic = %message, "analysis diagnostic");
        self.diagnostics
            .write()
            .expect("session lock poisoned")
            .push(message);
    }

    /// Diagnostics accumulated since the last reset.
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .read()
            .expect("session lock poisoned")
            .clone()
    }

    /// Parse an attribute's expression, cached by (attribute, model version)
    /// so each expression is parsed once per model state.
    pub fn parse_cached(
        &self,
        attribute: ElementId,
        model_version: u64,
        expression: &str,
    ) -> Result<Arc<ParsedExpression>, ExprError> {
        let key = (attribute, model_version);
        {
            let cache = self.parse_cache.read().expect("session lock poisoned");
            if let Some(parsed) = cache.get(&key) {
                return Ok(Arc::clone(parsed));
            }
        }
        let parsed = Arc::new(ParsedExpression::parse(expression)?);
        self.parse_cache
            .write()
            .expect("session lock poisoned")
            .insert(key, Arc::clone(&parsed));
        Ok(parsed)
    }
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("epoch", &self.epoch())
            .field("diagnostics", &self.diagnostics().len())
            .finish()
    }
}
