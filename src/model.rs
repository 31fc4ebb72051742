//! A minimal hierarchical model tree for ontology analyses.
//!
//! Entities contain ports, attributes, and other entities; links connect
//! ports. The tree is the subject of analysis: adapters attach to elements by
//! kind and emit constraints over them. Elements are addressed by
//! [`ElementId`] or by dotted full name.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, OntolatResult};

/// Attribute names that never take part in an analysis.
///
/// Matches iteration bookkeeping and display-surface hints that would
/// otherwise show up as spurious analysis variables.
pub const ATTRIBUTE_DENY_LIST: &[&str] = &[
    "firingCountLimit",
    "_icon",
    "_location",
    "_vergilSize",
    "_vergilCenter",
    "_vergilZoomFactor",
];

/// Whether an attribute name is excluded from analysis.
pub fn is_denied_attribute(name: &str) -> bool {
    ATTRIBUTE_DENY_LIST.contains(&name)
}

/// Unique identifier for a model element, scoped to one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ElementId(NonZeroU64);

impl ElementId {
    fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ElementId)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "element:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// What role an attribute plays in its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeRole {
    /// A user-set parameter value.
    Parameter,
    /// A transition guard expression.
    Guard,
    /// An expression actor's body.
    ExpressionBody,
    /// Implementation detail, invisible to analyses.
    Internal,
    /// A manual constraint annotation addressed to one solver by name.
    Annotation { solver: String },
}

/// How prominently the display surface shows an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Full,
    Expert,
    Hidden,
}

/// The kind of a model element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// An entity that contains other entities.
    CompositeEntity,
    /// A leaf entity with ports and attributes.
    AtomicEntity,
    Port {
        direction: PortDirection,
    },
    Attribute {
        role: AttributeRole,
        visibility: Visibility,
        expression: String,
    },
}

/// Registry key derived from an element's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementTag {
    CompositeEntity,
    AtomicEntity,
    Port,
    Attribute,
}

impl ElementKind {
    pub fn tag(&self) -> ElementTag {
        match self {
            ElementKind::CompositeEntity => ElementTag::CompositeEntity,
            ElementKind::AtomicEntity => ElementTag::AtomicEntity,
            ElementKind::Port { .. } => ElementTag::Port,
            ElementKind::Attribute { .. } => ElementTag::Attribute,
        }
    }
}

impl std::fmt::Display for ElementTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementTag::CompositeEntity => "composite entity",
            ElementTag::AtomicEntity => "atomic entity",
            ElementTag::Port => "port",
            ElementTag::Attribute => "attribute",
        };
        f.write_str(name)
    }
}

/// One node of the model tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub container: Option<ElementId>,
    pub kind: ElementKind,
}

/// The model: a tree of elements plus port-to-port links.
///
/// Every mutation bumps an internal version counter, which downstream parse
/// caches use to detect staleness.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    elements: Vec<Element>,
    links: Vec<(ElementId, ElementId)>,
    version: u64,
    next_raw: u64,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            links: Vec::new(),
            version: 0,
            next_raw: 1,
        }
    }

    /// The toplevel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Add a composite entity. `container = None` places it at the toplevel.
    pub fn add_composite(
        &mut self,
        container: Option<ElementId>,
        name: impl Into<String>,
    ) -> OntolatResult<ElementId> {
        self.add_element(container, name.into(), ElementKind::CompositeEntity)
    }

    /// Add an atomic entity.
    pub fn add_atomic(
        &mut self,
        container: Option<ElementId>,
        name: impl Into<String>,
    ) -> OntolatResult<ElementId> {
        self.add_element(container, name.into(), ElementKind::AtomicEntity)
    }

    /// Add a port to an entity.
    pub fn add_port(
        &mut self,
        container: ElementId,
        name: impl Into<String>,
        direction: PortDirection,
    ) -> OntolatResult<ElementId> {
        self.add_element(Some(container), name.into(), ElementKind::Port { direction })
    }

    /// Add an attribute to an element.
    pub fn add_attribute(
        &mut self,
        container: ElementId,
        name: impl Into<String>,
        role: AttributeRole,
        visibility: Visibility,
        expression: impl Into<String>,
    ) -> OntolatResult<ElementId> {
        self.add_element(
            Some(container),
            name.into(),
            ElementKind::Attribute {
                role,
                visibility,
                expression: expression.into(),
            },
        )
    }

    fn add_element(
        &mut self,
        container: Option<ElementId>,
        name: String,
        kind: ElementKind,
    ) -> OntolatResult<ElementId> {
        if let Some(container) = container {
            self.element(container)?;
        }
        let clash = self
            .elements
            .iter()
            .any(|e| e.container == container && e.name == name);
        if clash {
            return Err(ModelError::DuplicateName {
                container: container
                    .map(|c| self.full_name(c))
                    .unwrap_or_else(|| self.name.clone()),
                name,
            }
            .into());
        }
        let id = ElementId::new(self.next_raw).expect("element id space exhausted");
        self.next_raw += 1;
        self.elements.push(Element {
            id,
            name,
            container,
            kind,
        });
        self.version += 1;
        Ok(id)
    }

    /// Link a source port to a sink port.
    pub fn connect(&mut self, source: ElementId, sink: ElementId) -> OntolatResult<()> {
        for port in [source, sink] {
            let element = self.element(port)?;
            if !matches!(element.kind, ElementKind::Port { .. }) {
                return Err(ModelError::NotAPort {
                    element: self.full_name(port),
                }
                .into());
            }
        }
        self.links.push((source, sink));
        self.version += 1;
        Ok(())
    }

    pub fn element(&self, id: ElementId) -> OntolatResult<&Element> {
        self.elements
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| {
                ModelError::UnknownElement {
                    element: id.to_string(),
                }
                .into()
            })
    }

    /// All elements, in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Direct children of an element, in insertion order.
    pub fn children(&self, container: ElementId) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(move |e| e.container == Some(container))
    }

    /// Toplevel elements.
    pub fn roots(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.container.is_none())
    }

    /// Ports of an entity, optionally filtered by direction.
    pub fn ports_of(
        &self,
        entity: ElementId,
        direction: Option<PortDirection>,
    ) -> Vec<&Element> {
        self.children(entity)
            .filter(|e| match e.kind {
                ElementKind::Port { direction: d } => direction.is_none() || direction == Some(d),
                _ => false,
            })
            .collect()
    }

    /// All port-to-port links.
    pub fn links(&self) -> &[(ElementId, ElementId)] {
        &self.links
    }

    /// Source ports linked into the given sink port.
    pub fn sources_of(&self, sink: ElementId) -> Vec<ElementId> {
        self.links
            .iter()
            .filter(|(_, s)| *s == sink)
            .map(|(src, _)| *src)
            .collect()
    }

    /// Sink ports fed by the given source port.
    pub fn sinks_of(&self, source: ElementId) -> Vec<ElementId> {
        self.links
            .iter()
            .filter(|(s, _)| *s == source)
            .map(|(_, sink)| *sink)
            .collect()
    }

    /// The dotted full name, starting with the model name:
    /// `model.entity.port`.
    pub fn full_name(&self, id: ElementId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.elements.iter().find(|e| e.id == current) {
                Some(element) => {
                    parts.push(element.name.clone());
                    cursor = element.container;
                }
                None => break,
            }
        }
        parts.push(self.name.clone());
        parts.reverse();
        parts.join(".")
    }

    /// Resolve a dotted path to an element. The leading model name is
    /// optional.
    pub fn find_by_full_name(&self, full_name: &str) -> OntolatResult<ElementId> {
        let mut segments: Vec<&str> = full_name.split('.').filter(|s| !s.is_empty()).collect();
        if segments.first() == Some(&self.name.as_str()) {
            segments.remove(0);
        }
        let mut container: Option<ElementId> = None;
        let mut found: Option<ElementId> = None;
        for segment in &segments {
            found = self
                .elements
                .iter()
                .find(|e| e.container == container && e.name == *segment)
                .map(|e| e.id);
            match found {
                Some(id) => container = Some(id),
                None => {
                    return Err(ModelError::UnknownPath {
                        full_name: full_name.to_string(),
                    }
                    .into());
                }
            }
        }
        found.ok_or_else(|| {
            ModelError::UnknownPath {
                full_name: full_name.to_string(),
            }
            .into()
        })
    }

    /// Add or replace a constraint annotation for one solver.
    ///
    /// If the container already holds an annotation with the same label
    /// addressed to the same solver, its expression is replaced instead of
    /// adding a second attribute, so repeated annotation is deterministic.
    /// Labels live in the container's sibling namespace: two solvers cannot
    /// share a label on the same container.
    pub fn annotate(
        &mut self,
        container: ElementId,
        solver: &str,
        label: &str,
        expression: &str,
    ) -> OntolatResult<ElementId> {
        self.element(container)?;
        let existing = self.elements.iter_mut().find(|e| {
            e.container == Some(container)
                && e.name == label
                && matches!(
                    &e.kind,
                    ElementKind::Attribute { role: AttributeRole::Annotation { solver: s }, .. }
                        if s == solver
                )
        });
        if let Some(element) = existing {
            if let ElementKind::Attribute { expression: expr, .. } = &mut element.kind {
                *expr = expression.to_string();
            }
            let id = element.id;
            self.version += 1;
            return Ok(id);
        }
        self.add_attribute(
            container,
            label,
            AttributeRole::Annotation {
                solver: solver.to_string(),
            },
            Visibility::Expert,
            expression,
        )
    }

    /// All annotations addressed to the named solver, paired with their
    /// containers.
    pub fn annotations_for(&self, solver: &str) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|e| {
                matches!(
                    &e.kind,
                    ElementKind::Attribute { role: AttributeRole::Annotation { solver: s }, .. }
                        if s == solver
                )
            })
            .collect()
    }
}
