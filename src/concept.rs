//! Core concept types for the ontolat engine.
//!
//! Concepts are the values of a lattice-ordered abstract domain. Every concept
//! is identified by a [`ConceptId`] that also names its owning ontology, and
//! described by [`ConceptData`]. Finite concepts form the graph-connected
//! skeleton of the lattice; record, flat-token, and product concepts are
//! generated on demand and anchored to a finite *representative*.

use std::collections::BTreeMap;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for an ontology.
///
/// Allocated process-wide so that a [`ConceptId`] can name its owning ontology,
/// making cross-ontology misuse detectable instead of silently comparing
/// unrelated arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct OntologyId(NonZeroU64);

static NEXT_ONTOLOGY_ID: AtomicU64 = AtomicU64::new(1);

impl OntologyId {
    /// Allocate the next process-wide ontology id.
    pub(crate) fn next() -> Self {
        let raw = NEXT_ONTOLOGY_ID.fetch_add(1, Ordering::Relaxed);
        OntologyId(NonZeroU64::new(raw).expect("ontology id space exhausted"))
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for OntologyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ont:{}", self.0)
    }
}

/// Unique, niche-optimized identifier for a concept.
///
/// Carries the owning [`OntologyId`] so a concept belongs to exactly one
/// ontology for its lifetime. Uses `NonZeroU32` for the arena index so that
/// `Option<ConceptId>` pays no size penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConceptId {
    ontology: OntologyId,
    raw: NonZeroU32,
}

impl ConceptId {
    pub(crate) fn new(ontology: OntologyId, raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(|raw| ConceptId { ontology, raw })
    }

    /// The ontology this concept belongs to.
    pub fn ontology(self) -> OntologyId {
        self.ontology
    }

    /// Arena index within the owning ontology (1-based).
    pub fn get(self) -> u32 {
        self.raw.get()
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "concept:{}:{}", self.ontology.get(), self.raw)
    }
}

/// Result of comparing two concepts in the lattice order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptOrdering {
    /// The left concept is strictly below the right one.
    Lower,
    /// The two concepts are the same lattice element.
    Same,
    /// The left concept is strictly above the right one.
    Higher,
    /// Neither is above the other.
    Incomparable,
}

impl ConceptOrdering {
    /// The ordering seen from the other operand's side.
    ///
    /// `Lower` and `Higher` swap; `Same` and `Incomparable` are self-inverse.
    pub fn reverse(self) -> Self {
        match self {
            ConceptOrdering::Lower => ConceptOrdering::Higher,
            ConceptOrdering::Higher => ConceptOrdering::Lower,
            other => other,
        }
    }
}

impl std::fmt::Display for ConceptOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConceptOrdering::Lower => write!(f, "lower"),
            ConceptOrdering::Same => write!(f, "same"),
            ConceptOrdering::Higher => write!(f, "higher"),
            ConceptOrdering::Incomparable => write!(f, "incomparable"),
        }
    }
}

/// Underlying value of a flat-token infinite concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl TokenValue {
    /// Stable string key used for per-representative caching.
    pub fn key(&self) -> String {
        match self {
            TokenValue::Int(v) => format!("i:{v}"),
            TokenValue::Float(v) => format!("f:{v}"),
            TokenValue::Str(v) => format!("s:{v}"),
            TokenValue::Bool(v) => format!("b:{v}"),
        }
    }
}

impl std::fmt::Display for TokenValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenValue::Int(v) => write!(f, "{v}"),
            TokenValue::Float(v) => write!(f, "{v}"),
            TokenValue::Str(v) => write!(f, "{v}"),
            TokenValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// The two families of concepts: finite (graph-connected) and infinite
/// (generated on demand, anchored by a finite representative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConceptKind {
    /// A named node of the finite lattice skeleton.
    Finite,
    /// A member of an unbounded token-valued family.
    FlatToken {
        value: TokenValue,
        representative: ConceptId,
    },
    /// A sorted field-name → concept mapping.
    Record {
        fields: BTreeMap<String, ConceptId>,
        representative: ConceptId,
    },
    /// A pairing of two component concepts from a product lattice.
    Product {
        left: ConceptId,
        right: ConceptId,
        representative: ConceptId,
    },
}

impl ConceptKind {
    /// Whether this is a finite concept.
    pub fn is_finite(&self) -> bool {
        matches!(self, ConceptKind::Finite)
    }

    /// The finite concept anchoring this one in the lattice skeleton.
    ///
    /// A finite concept is its own representative, so callers pass the
    /// concept's id for that case.
    pub fn representative(&self, own_id: ConceptId) -> ConceptId {
        match self {
            ConceptKind::Finite => own_id,
            ConceptKind::FlatToken { representative, .. }
            | ConceptKind::Record { representative, .. }
            | ConceptKind::Product { representative, .. } => *representative,
        }
    }
}

/// Immutable description of a concept.
///
/// Comparisons and lattice operations never mutate a concept's identity;
/// acceptability and display color are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptData {
    /// Unique identifier (also names the owning ontology).
    pub id: ConceptId,
    /// Concept name, unique within the ontology. For record concepts this is
    /// the rendered `{ x = C1, y = C2 }` form.
    pub name: String,
    /// Whether the concept is a valid terminal inference result.
    pub acceptable: bool,
    /// Optional display color hint for the display surface.
    pub color: Option<String>,
    /// Finite or infinite family membership.
    pub kind: ConceptKind,
}

impl ConceptData {
    pub(crate) fn new(id: ConceptId, name: impl Into<String>, kind: ConceptKind) -> Self {
        Self {
            id,
            name: name.into(),
            acceptable: true,
            color: None,
            kind,
        }
    }

    pub(crate) fn unacceptable(mut self) -> Self {
        self.acceptable = false;
        self
    }

    pub(crate) fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The representative finite concept for this concept.
    pub fn representative(&self) -> ConceptId {
        self.kind.representative(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<ConceptId>>(),
            std::mem::size_of::<ConceptId>()
        );
    }

    #[test]
    fn concept_id_zero_index_is_none() {
        let ont = OntologyId::next();
        assert!(ConceptId::new(ont, 0).is_none());
        assert!(ConceptId::new(ont, 1).is_some());
    }

    #[test]
    fn ordering_reverse_is_involutive() {
        for ord in [
            ConceptOrdering::Lower,
            ConceptOrdering::Same,
            ConceptOrdering::Higher,
            ConceptOrdering::Incomparable,
        ] {
            assert_eq!(ord.reverse().reverse(), ord);
        }
        assert_eq!(ConceptOrdering::Lower.reverse(), ConceptOrdering::Higher);
        assert_eq!(ConceptOrdering::Same.reverse(), ConceptOrdering::Same);
    }

    #[test]
    fn token_value_keys_distinguish_types() {
        assert_ne!(TokenValue::Int(1).key(), TokenValue::Str("1".into()).key());
        assert_ne!(TokenValue::Bool(true).key(), TokenValue::Str("true".into()).key());
    }

    #[test]
    fn finite_concept_is_its_own_representative() {
        let ont = OntologyId::next();
        let id = ConceptId::new(ont, 1).unwrap();
        let data = ConceptData::new(id, "Const", ConceptKind::Finite);
        assert_eq!(data.representative(), id);
    }
}
