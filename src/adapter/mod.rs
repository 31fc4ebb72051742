//! Adapters: the bridge from model elements to the constraint system.
//!
//! One generic [`OntologyAdapter`] wraps every element; what varies per
//! element kind is the [`ElementBehavior`] capability it is composed with.
//! Behaviors enumerate an element's propertyables and emit its default
//! inequality constraints; the registry maps element kinds to behaviors.

pub mod ast;
pub mod registry;

use std::sync::Arc;

use crate::concept::ConceptId;
use crate::config::SolverConfig;
use crate::error::{ModelError, OntolatResult};
use crate::expr::AstId;
use crate::function::FunctionLibrary;
use crate::model::{
    is_denied_attribute, AttributeRole, Element, ElementId, ElementKind, Model, Visibility,
};
use crate::ontology::Ontology;
use crate::solver::inequality::{Inequality, Term, TermManager, VarId};
use crate::solver::lattice::{constraint_type, ConstraintType};
use crate::solver::session::AnalysisSession;

pub use registry::AdapterRegistry;

/// Anything that can receive a resolved concept: a model element or one node
/// of an attribute's parsed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Propertyable {
    Element(ElementId),
    AstNode { attribute: ElementId, node: AstId },
}

/// Everything constraint generation needs to see, passed by reference.
pub struct ConstraintContext<'a> {
    pub model: &'a Model,
    pub config: &'a SolverConfig,
    pub terms: &'a TermManager,
    pub session: &'a AnalysisSession,
    pub library: &'a FunctionLibrary,
    pub ontology: &'a Ontology,
    pub solver_name: &'a str,
}

impl ConstraintContext<'_> {
    /// The constraint variable for a model element, interned by full name.
    pub fn element_var(&self, element: ElementId) -> VarId {
        self.terms.variable_for(
            Propertyable::Element(element),
            &self.model.full_name(element),
        )
    }

    /// The constraint variable for an expression node of an attribute.
    pub fn ast_var(&self, attribute: ElementId, node: AstId) -> VarId {
        self.terms.variable_for(
            Propertyable::AstNode { attribute, node },
            &format!("{}#ast{}", self.model.full_name(attribute), node.index()),
        )
    }
}

/// Per-element-kind capability: what can be constrained and how.
pub trait ElementBehavior: Send + Sync {
    /// The element's constrainable sub-elements (including the element
    /// itself where applicable).
    fn propertyables(&self, model: &Model, element: &Element) -> Vec<Propertyable>;

    /// Default constraints emitted for the element.
    fn constraints(
        &self,
        ctx: &ConstraintContext<'_>,
        element: &Element,
    ) -> OntolatResult<Vec<Inequality>>;
}

/// The generic adapter: one element plus the behavior for its kind.
pub struct OntologyAdapter {
    element: ElementId,
    behavior: Arc<dyn ElementBehavior>,
}

impl std::fmt::Debug for OntologyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyAdapter")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl OntologyAdapter {
    pub fn new(element: ElementId, behavior: Arc<dyn ElementBehavior>) -> Self {
        Self { element, behavior }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn propertyables(&self, model: &Model) -> OntolatResult<Vec<Propertyable>> {
        let element = model.element(self.element)?;
        Ok(self.behavior.propertyables(model, element))
    }

    pub fn constraints(&self, ctx: &ConstraintContext<'_>) -> OntolatResult<Vec<Inequality>> {
        let element = ctx.model.element(self.element)?;
        self.behavior.constraints(ctx, element)
    }
}

/// Whether an attribute takes part in the analysis.
///
/// Guard and expression-body attributes are always in; parameters only when
/// fully visible and not on the deny list; internal bookkeeping and
/// annotations never.
pub fn is_analyzable_attribute(element: &Element) -> bool {
    match &element.kind {
        ElementKind::Attribute {
            role, visibility, ..
        } => match role {
            AttributeRole::Guard | AttributeRole::ExpressionBody => true,
            AttributeRole::Parameter => {
                *visibility == Visibility::Full && !is_denied_attribute(&element.name)
            }
            AttributeRole::Internal | AttributeRole::Annotation { .. } => false,
        },
        _ => false,
    }
}

/// Behavior for composite and atomic entities.
///
/// Propertyables are the entity's ports plus its analyzable attributes.
/// Default constraints come from the links terminating at this entity's
/// ports, directed by the configured strategy and fixpoint.
pub struct EntityBehavior;

impl ElementBehavior for EntityBehavior {
    fn propertyables(&self, model: &Model, element: &Element) -> Vec<Propertyable> {
        let mut out = Vec::new();
        for child in model.children(element.id) {
            match &child.kind {
                ElementKind::Port { .. } => out.push(Propertyable::Element(child.id)),
                ElementKind::Attribute { .. } if is_analyzable_attribute(child) => {
                    out.push(Propertyable::Element(child.id));
                }
                _ => {}
            }
        }
        out
    }

    fn constraints(
        &self,
        ctx: &ConstraintContext<'_>,
        element: &Element,
    ) -> OntolatResult<Vec<Inequality>> {
        let direction = constraint_type(ctx.config.strategy, ctx.config.fixed_point);
        if direction == ConstraintType::None {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for &(source, sink) in ctx.model.links() {
            // Each link is emitted once, by the sink port's owning entity.
            let sink_element = ctx.model.element(sink)?;
            if sink_element.container != Some(element.id) {
                continue;
            }
            let source_term = Term::Variable(ctx.element_var(source));
            let sink_term = Term::Variable(ctx.element_var(sink));
            match direction {
                ConstraintType::SinkGeSource => {
                    out.push(Inequality::new(source_term, sink_term));
                }
                ConstraintType::SourceGeSink => {
                    out.push(Inequality::new(sink_term, source_term));
                }
                ConstraintType::Equals => {
                    out.push(Inequality::new(source_term.clone(), sink_term.clone()));
                    out.push(Inequality::new(sink_term, source_term));
                }
                ConstraintType::None => {}
            }
        }
        Ok(out)
    }
}

/// Behavior for ports: the port itself is propertyable, no default
/// constraints (its links are owned by the containing entity).
pub struct PortBehavior;

impl ElementBehavior for PortBehavior {
    fn propertyables(&self, _model: &Model, element: &Element) -> Vec<Propertyable> {
        vec![Propertyable::Element(element.id)]
    }

    fn constraints(
        &self,
        _ctx: &ConstraintContext<'_>,
        _element: &Element,
    ) -> OntolatResult<Vec<Inequality>> {
        Ok(Vec::new())
    }
}

/// Behavior for attributes: analyzable attributes expose themselves plus the
/// concept-valued nodes of their parsed expression, and emit the expression's
/// structural constraints.
pub struct AttributeBehavior;

impl ElementBehavior for AttributeBehavior {
    fn propertyables(&self, model: &Model, element: &Element) -> Vec<Propertyable> {
        if !is_analyzable_attribute(element) {
            return Vec::new();
        }
        let mut out = vec![Propertyable::Element(element.id)];
        if let ElementKind::Attribute { expression, .. } = &element.kind {
            if let Some(parsed) = ast::parse_quiet(expression) {
                for id in parsed.ids() {
                    if ast::is_concept_valued(parsed.node(id)) {
                        out.push(Propertyable::AstNode {
                            attribute: element.id,
                            node: id,
                        });
                    }
                }
            }
        }
        out
    }

    fn constraints(
        &self,
        ctx: &ConstraintContext<'_>,
        element: &Element,
    ) -> OntolatResult<Vec<Inequality>> {
        if !is_analyzable_attribute(element) {
            return Ok(Vec::new());
        }
        let ElementKind::Attribute { expression, .. } = &element.kind else {
            return Ok(Vec::new());
        };
        ast::ast_constraints(ctx, element, expression)
    }
}

/// Parse a manual annotation expression into the constraint it describes.
///
/// The form is `path op ConceptName` with `op` one of `>=`, `<=`, `==`. The
/// path is resolved relative to the annotation's container first and the
/// model root second. `==` pins the element rather than emitting
/// inequalities.
pub enum AnnotationConstraint {
    GreaterEqual(ElementId, ConceptId),
    LessEqual(ElementId, ConceptId),
    Pin(ElementId, ConceptId),
}

pub fn parse_annotation(
    model: &Model,
    ontology: &Ontology,
    annotation: &Element,
    expression: &str,
) -> OntolatResult<AnnotationConstraint> {
    let bad = |message: &str| -> crate::error::OntolatError {
        ModelError::BadAnnotation {
            expression: expression.to_string(),
            message: message.to_string(),
        }
        .into()
    };

    let (lhs, op, rhs) = if let Some((l, r)) = expression.split_once(">=") {
        (l, ">=", r)
    } else if let Some((l, r)) = expression.split_once("<=") {
        (l, "<=", r)
    } else if let Some((l, r)) = expression.split_once("==") {
        (l, "==", r)
    } else {
        return Err(bad("no `>=`, `<=`, or `==` operator"));
    };

    let path = lhs.trim();
    let concept_name = rhs.trim();
    if path.is_empty() || concept_name.is_empty() {
        return Err(bad("empty path or concept name"));
    }

    let concept = ontology
        .lookup(concept_name)
        .ok_or_else(|| bad(&format!("unknown concept {concept_name:?}")))?;

    // Relative to the annotation's container first, then from the root.
    let element = annotation
        .container
        .and_then(|container| {
            let prefixed = format!("{}.{}", model.full_name(container), path);
            model.find_by_full_name(&prefixed).ok()
        })
        .map_or_else(|| model.find_by_full_name(path), Ok)?;

    Ok(match op {
        ">=" => AnnotationConstraint::GreaterEqual(element, concept),
        "<=" => AnnotationConstraint::LessEqual(element, concept),
        _ => AnnotationConstraint::Pin(element, concept),
    })
}
