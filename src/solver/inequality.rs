//! Constraint terms and inequalities.
//!
//! A [`Term`] is either a constant concept, a variable standing for a
//! propertyable's concept, or a function application over sub-terms. An
//! [`Inequality`] requires its lesser term to stay at or below its greater
//! term in the lattice order. The [`TermManager`] interns one variable per
//! propertyable and holds the current assignment during fixpoint iteration.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::adapter::Propertyable;
use crate::concept::ConceptId;
use crate::error::OntolatResult;
use crate::function::{ConceptFunction, EvalContext};

/// Index of a constraint variable in a [`TermManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One side of an inequality.
#[derive(Clone)]
pub enum Term {
    /// A fixed concept.
    Constant(ConceptId),
    /// The concept of a propertyable, assigned during resolution.
    Variable(VarId),
    /// A concept function applied to sub-terms.
    Apply {
        function: Arc<dyn ConceptFunction>,
        args: Vec<Term>,
    },
}

impl Term {
    /// All variables mentioned by the term, in depth-first order.
    pub fn variables(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<VarId>) {
        match self {
            Term::Constant(_) => {}
            Term::Variable(var) => out.push(*var),
            Term::Apply { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Current value of the term, `None` while any mentioned variable is
    /// still unassigned.
    pub fn value(
        &self,
        terms: &TermManager,
        cx: &EvalContext<'_>,
    ) -> OntolatResult<Option<ConceptId>> {
        match self {
            Term::Constant(concept) => Ok(Some(*concept)),
            Term::Variable(var) => Ok(terms.value(*var)),
            Term::Apply { function, args } => {
                let mut concepts = Vec::with_capacity(args.len());
                for arg in args {
                    match arg.value(terms, cx)? {
                        Some(concept) => concepts.push(concept),
                        None => return Ok(None),
                    }
                }
                Ok(Some(function.evaluate(cx, &concepts)?))
            }
        }
    }

    /// Render the term using the manager's variable names.
    pub fn render(&self, terms: &TermManager) -> String {
        match self {
            Term::Constant(concept) => concept.to_string(),
            Term::Variable(var) => terms.name_of(*var),
            Term::Apply { function, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.render(terms)).collect();
                format!("{}({})", function.signature().name, rendered.join(", "))
            }
        }
    }
}

impl std::fmt::Debug for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Constant(concept) => f.debug_tuple("Constant").field(concept).finish(),
            Term::Variable(var) => f.debug_tuple("Variable").field(var).finish(),
            Term::Apply { function, args } => f
                .debug_struct("Apply")
                .field("function", &function.signature().name)
                .field("args", args)
                .finish(),
        }
    }
}

/// Lesser must end up at or below greater.
#[derive(Debug, Clone)]
pub struct Inequality {
    pub lesser: Term,
    pub greater: Term,
}

impl Inequality {
    pub fn new(lesser: Term, greater: Term) -> Self {
        Self { lesser, greater }
    }

    /// Human-readable form, `lesser <= greater`.
    pub fn render(&self, terms: &TermManager) -> String {
        format!(
            "{} <= {}",
            self.lesser.render(terms),
            self.greater.render(terms)
        )
    }
}

struct VarInfo {
    prop: Propertyable,
    name: String,
    value: Option<ConceptId>,
    /// Pinned variables are never updated by the fixpoint.
    settable: bool,
}

/// Interns one constraint variable per propertyable and holds the current
/// assignment.
#[derive(Default)]
pub struct TermManager {
    inner: RwLock<TmInner>,
}

#[derive(Default)]
struct TmInner {
    vars: Vec<VarInfo>,
    by_prop: HashMap<Propertyable, VarId>,
}

impl TermManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The variable for a propertyable, created on first request.
    pub fn variable_for(&self, prop: Propertyable, name: &str) -> VarId {
        let mut inner = self.inner.write().expect("term manager lock poisoned");
        if let Some(&var) = inner.by_prop.get(&prop) {
            return var;
        }
        let var = VarId(inner.vars.len());
        inner.vars.push(VarInfo {
            prop,
            name: name.to_string(),
            value: None,
            settable: true,
        });
        inner.by_prop.insert(prop, var);
        var
    }

    /// The variable for a propertyable, if one was created.
    pub fn lookup(&self, prop: Propertyable) -> Option<VarId> {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner.by_prop.get(&prop).copied()
    }

    pub fn value(&self, var: VarId) -> Option<ConceptId> {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner.vars.get(var.0).and_then(|v| v.value)
    }

    pub fn set_value(&self, var: VarId, concept: ConceptId) {
        let mut inner = self.inner.write().expect("term manager lock poisoned");
        if let Some(info) = inner.vars.get_mut(var.0) {
            info.value = Some(concept);
        }
    }

    /// Pin a variable to a concept and mark it non-settable, overriding
    /// inference for its propertyable.
    pub fn pin(&self, var: VarId, concept: ConceptId) {
        let mut inner = self.inner.write().expect("term manager lock poisoned");
        if let Some(info) = inner.vars.get_mut(var.0) {
            info.value = Some(concept);
            info.settable = false;
        }
    }

    pub fn is_settable(&self, var: VarId) -> bool {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner.vars.get(var.0).map(|v| v.settable).unwrap_or(false)
    }

    pub fn name_of(&self, var: VarId) -> String {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner
            .vars
            .get(var.0)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| format!("var:{}", var.0))
    }

    pub fn propertyable_of(&self, var: VarId) -> Option<Propertyable> {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner.vars.get(var.0).map(|v| v.prop)
    }

    /// All variables, in creation order.
    pub fn variables(&self) -> Vec<VarId> {
        let inner = self.inner.read().expect("term manager lock poisoned");
        (0..inner.vars.len()).map(VarId).collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The resolved assignment: every propertyable with a value.
    pub fn resolved(&self) -> Vec<(Propertyable, ConceptId)> {
        let inner = self.inner.read().expect("term manager lock poisoned");
        inner
            .vars
            .iter()
            .filter_map(|v| v.value.map(|c| (v.prop, c)))
            .collect()
    }

    /// Drop every variable and assignment.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("term manager lock poisoned");
        inner.vars.clear();
        inner.by_prop.clear();
    }
}
