//! Ontology: a named lattice of concepts plus their ordering edges.
//!
//! The ontology owns an arena of [`ConceptData`] and the lower → higher order
//! edges between finite concepts. The derived [`ConceptGraph`] is built
//! lazily and cached; any mutation of the finite skeleton marks the cache
//! dirty and the next query rebuilds (and re-validates) the graph.
//!
//! Infinite concepts (flat tokens, records, products) are created on demand,
//! interned per representative, and cleared explicitly on solver reset. They
//! never invalidate the finite graph cache.

pub mod graph;
mod record;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::concept::{ConceptData, ConceptId, ConceptKind, ConceptOrdering, OntologyId, TokenValue};
use crate::error::{OntolatResult, OntologyError};

pub use graph::ConceptGraph;

/// A named container of concepts and their graph edges.
pub struct Ontology {
    id: OntologyId,
    name: String,
    inner: RwLock<Inner>,
    graph_cache: RwLock<Option<Arc<ConceptGraph>>>,
}

struct Inner {
    concepts: HashMap<u32, ConceptData>,
    by_name: HashMap<String, ConceptId>,
    /// Finite concepts in insertion order.
    finite: Vec<ConceptId>,
    /// Order edges, lower → higher, between finite concepts.
    edges: Vec<(ConceptId, ConceptId)>,
    next_raw: u32,
    /// (representative, token key) → interned flat-token concept.
    flat_cache: HashMap<(ConceptId, String), ConceptId>,
    /// (representative, rendered name) → interned record concept.
    record_cache: HashMap<(ConceptId, String), ConceptId>,
    /// (representative, left, right) → interned product concept.
    product_cache: HashMap<(ConceptId, ConceptId, ConceptId), ConceptId>,
}

impl Ontology {
    /// Create a new, empty ontology.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OntologyId::next(),
            name: name.into(),
            inner: RwLock::new(Inner {
                concepts: HashMap::new(),
                by_name: HashMap::new(),
                finite: Vec::new(),
                edges: Vec::new(),
                next_raw: 1,
                flat_cache: HashMap::new(),
                record_cache: HashMap::new(),
                product_cache: HashMap::new(),
            }),
            graph_cache: RwLock::new(None),
        }
    }

    /// This ontology's process-wide id.
    pub fn id(&self) -> OntologyId {
        self.id
    }

    /// The ontology's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a finite concept with default acceptability.
    pub fn add_concept(&self, name: impl Into<String>) -> OntolatResult<ConceptId> {
        self.add_concept_full(name, true, None)
    }

    /// Add a finite concept, specifying acceptability and an optional display
    /// color. Concepts are immutable once constructed.
    pub fn add_concept_full(
        &self,
        name: impl Into<String>,
        acceptable: bool,
        color: Option<&str>,
    ) -> OntolatResult<ConceptId> {
        let name = name.into();
        let mut inner = self.inner.write().expect("ontology lock poisoned");
        if inner.by_name.contains_key(&name) {
            return Err(OntologyError::DuplicateConcept {
                ontology: self.name.clone(),
                name,
            }
            .into());
        }
        let id = inner.allocate(self.id);
        let mut data = ConceptData::new(id, name.clone(), ConceptKind::Finite);
        if !acceptable {
            data = data.unacceptable();
        }
        if let Some(color) = color {
            data = data.with_color(color);
        }
        inner.concepts.insert(id.get(), data);
        inner.by_name.insert(name, id);
        inner.finite.push(id);
        drop(inner);
        self.invalidate_graph();
        Ok(id)
    }

    /// Add an order edge `lower` → `higher` between two finite concepts.
    pub fn add_edge(&self, lower: ConceptId, higher: ConceptId) -> OntolatResult<()> {
        self.require_finite(lower)?;
        self.require_finite(higher)?;
        let mut inner = self.inner.write().expect("ontology lock poisoned");
        inner.edges.push((lower, higher));
        drop(inner);
        self.invalidate_graph();
        Ok(())
    }

    /// Look a finite concept up by name.
    pub fn lookup(&self, name: &str) -> Option<ConceptId> {
        let inner = self.inner.read().expect("ontology lock poisoned");
        inner.by_name.get(name).copied()
    }

    /// Get a concept's full description.
    pub fn concept(&self, id: ConceptId) -> OntolatResult<ConceptData> {
        if id.ontology() != self.id {
            return Err(OntologyError::ForeignConcept {
                ontology: self.name.clone(),
                concept: id.to_string(),
            }
            .into());
        }
        let inner = self.inner.read().expect("ontology lock poisoned");
        inner
            .concepts
            .get(&id.get())
            .cloned()
            .ok_or_else(|| {
                OntologyError::UnknownConcept {
                    ontology: self.name.clone(),
                    concept: id.to_string(),
                }
                .into()
            })
    }

    /// The concept's name, if it belongs to this ontology.
    pub fn name_of(&self, id: ConceptId) -> Option<String> {
        self.concept(id).ok().map(|c| c.name)
    }

    /// Whether the concept is a valid terminal inference result.
    pub fn is_acceptable(&self, id: ConceptId) -> bool {
        self.concept(id).map(|c| c.acceptable).unwrap_or(true)
    }

    /// Display color hint, if any.
    pub fn color_of(&self, id: ConceptId) -> Option<String> {
        self.concept(id).ok().and_then(|c| c.color)
    }

    /// Whether the id refers to a concept of this ontology.
    pub fn contains(&self, id: ConceptId) -> bool {
        self.concept(id).is_ok()
    }

    /// Number of concepts currently alive (finite and infinite).
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("ontology lock poisoned");
        inner.concepts.len()
    }

    /// Whether the ontology has no concepts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The validated concept graph, rebuilt if the finite skeleton changed.
    pub fn graph(&self) -> OntolatResult<Arc<ConceptGraph>> {
        {
            let cache = self.graph_cache.read().expect("graph cache poisoned");
            if let Some(graph) = cache.as_ref() {
                return Ok(Arc::clone(graph));
            }
        }
        let (names, finite, edges) = {
            let inner = self.inner.read().expect("ontology lock poisoned");
            let names: HashMap<ConceptId, String> = inner
                .finite
                .iter()
                .map(|&id| (id, inner.concepts[&id.get()].name.clone()))
                .collect();
            (names, inner.finite.clone(), inner.edges.clone())
        };
        let graph = Arc::new(ConceptGraph::build(&self.name, &names, &finite, &edges)?);
        let mut cache = self.graph_cache.write().expect("graph cache poisoned");
        *cache = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Whether the concept set and edges form a valid lattice.
    pub fn is_lattice(&self) -> bool {
        self.graph().is_ok()
    }

    /// The unique maximal finite concept.
    pub fn top(&self) -> OntolatResult<ConceptId> {
        Ok(self.graph()?.top())
    }

    /// The unique minimal finite concept.
    pub fn bottom(&self) -> OntolatResult<ConceptId> {
        Ok(self.graph()?.bottom())
    }

    // -----------------------------------------------------------------------
    // Lattice operations
    // -----------------------------------------------------------------------

    /// Compare two concepts of this ontology.
    ///
    /// Infinite concepts with different representatives delegate to the finite
    /// comparison of the representatives; an infinite concept is strictly
    /// below its own representative. Incomparable situations degrade to
    /// `Incomparable` rather than erroring.
    pub fn compare(&self, a: ConceptId, b: ConceptId) -> OntolatResult<ConceptOrdering> {
        let da = self.concept(a)?;
        let db = self.concept(b)?;
        if a == b {
            return Ok(ConceptOrdering::Same);
        }
        match (&da.kind, &db.kind) {
            (ConceptKind::Finite, ConceptKind::Finite) => Ok(self.graph()?.compare(a, b)?),
            (
                ConceptKind::Record { fields: fa, representative: ra },
                ConceptKind::Record { fields: fb, representative: rb },
            ) if ra == rb => record::compare_fields(self, fa, fb),
            (
                ConceptKind::FlatToken { value: va, representative: ra },
                ConceptKind::FlatToken { value: vb, representative: rb },
            ) if ra == rb => Ok(if va == vb {
                ConceptOrdering::Same
            } else {
                ConceptOrdering::Incomparable
            }),
            (
                ConceptKind::Product { left: la, right: ra, representative: pa },
                ConceptKind::Product { left: lb, right: rb, representative: pb },
            ) if pa == pb => {
                let left = self.compare(*la, *lb)?;
                let right = self.compare(*ra, *rb)?;
                Ok(combine_directions(left, right))
            }
            _ => {
                let ra = da.representative();
                let rb = db.representative();
                if ra == rb {
                    // One side may be the representative itself; an infinite
                    // concept sits strictly below its representative.
                    if da.kind.is_finite() {
                        Ok(ConceptOrdering::Higher)
                    } else if db.kind.is_finite() {
                        Ok(ConceptOrdering::Lower)
                    } else {
                        Ok(ConceptOrdering::Incomparable)
                    }
                } else {
                    Ok(self.graph()?.compare(ra, rb)?)
                }
            }
        }
    }

    /// Least upper bound of two concepts.
    ///
    /// Over a finite+infinite pair the representative is substituted; if the
    /// raw result degenerates to the representative itself, the original
    /// infinite concept is returned so precision is not lost.
    pub fn least_upper_bound(&self, a: ConceptId, b: ConceptId) -> OntolatResult<ConceptId> {
        let da = self.concept(a)?;
        let db = self.concept(b)?;
        if a == b {
            return Ok(a);
        }
        match (&da.kind, &db.kind) {
            (ConceptKind::Finite, ConceptKind::Finite) => {
                Ok(self.graph()?.least_upper_bound(a, b)?)
            }
            (
                ConceptKind::Record { fields: fa, representative: ra },
                ConceptKind::Record { fields: fb, representative: rb },
            ) if ra == rb => {
                let fields = record::lub_fields(self, fa, fb)?;
                self.record_concept(*ra, fields)
            }
            (
                ConceptKind::FlatToken { value: va, representative: ra },
                ConceptKind::FlatToken { value: vb, representative: rb },
            ) if ra == rb => {
                // Distinct members of the same family join at the family's
                // representative.
                Ok(if va == vb { a } else { *ra })
            }
            (
                ConceptKind::Product { left: la, right: ra, representative: pa },
                ConceptKind::Product { left: lb, right: rb, representative: pb },
            ) if pa == pb => {
                let left = self.least_upper_bound(*la, *lb)?;
                let right = self.least_upper_bound(*ra, *rb)?;
                self.product_concept(*pa, left, right)
            }
            _ => {
                let ra = da.representative();
                let rb = db.representative();
                if ra == rb {
                    if da.kind.is_finite() {
                        Ok(a)
                    } else if db.kind.is_finite() {
                        Ok(b)
                    } else {
                        Ok(ra)
                    }
                } else {
                    let raw = self.graph()?.least_upper_bound(ra, rb)?;
                    if raw == ra && !da.kind.is_finite() {
                        Ok(a)
                    } else if raw == rb && !db.kind.is_finite() {
                        Ok(b)
                    } else {
                        Ok(raw)
                    }
                }
            }
        }
    }

    /// Greatest lower bound of two concepts.
    pub fn greatest_lower_bound(&self, a: ConceptId, b: ConceptId) -> OntolatResult<ConceptId> {
        let da = self.concept(a)?;
        let db = self.concept(b)?;
        if a == b {
            return Ok(a);
        }
        match (&da.kind, &db.kind) {
            (ConceptKind::Finite, ConceptKind::Finite) => {
                Ok(self.graph()?.greatest_lower_bound(a, b)?)
            }
            (
                ConceptKind::Record { fields: fa, representative: ra },
                ConceptKind::Record { fields: fb, representative: rb },
            ) if ra == rb => {
                let fields = record::glb_fields(self, fa, fb)?;
                self.record_concept(*ra, fields)
            }
            (
                ConceptKind::FlatToken { value: va, representative: ra },
                ConceptKind::FlatToken { value: vb, .. },
            ) if *ra == db.representative() => {
                // Distinct members of the same family have no structure below
                // them; the meet collapses to the lattice bottom.
                if va == vb {
                    Ok(a)
                } else {
                    Ok(self.graph()?.bottom())
                }
            }
            (
                ConceptKind::Product { left: la, right: ra, representative: pa },
                ConceptKind::Product { left: lb, right: rb, representative: pb },
            ) if pa == pb => {
                let left = self.greatest_lower_bound(*la, *lb)?;
                let right = self.greatest_lower_bound(*ra, *rb)?;
                self.product_concept(*pa, left, right)
            }
            _ => {
                let ra = da.representative();
                let rb = db.representative();
                if ra == rb {
                    if da.kind.is_finite() {
                        Ok(b)
                    } else if db.kind.is_finite() {
                        Ok(a)
                    } else {
                        Ok(self.graph()?.bottom())
                    }
                } else {
                    let raw = self.graph()?.greatest_lower_bound(ra, rb)?;
                    if raw == ra && !da.kind.is_finite() {
                        Ok(a)
                    } else if raw == rb && !db.kind.is_finite() {
                        Ok(b)
                    } else {
                        Ok(raw)
                    }
                }
            }
        }
    }

    /// Least upper bound over a non-empty concept set.
    pub fn least_upper_bound_set(&self, concepts: &[ConceptId]) -> OntolatResult<ConceptId> {
        let (&first, rest) = concepts
            .split_first()
            .ok_or(crate::error::LatticeError::EmptyBoundSet)?;
        let mut acc = first;
        for &c in rest {
            acc = self.least_upper_bound(acc, c)?;
        }
        Ok(acc)
    }

    // -----------------------------------------------------------------------
    // Infinite concepts
    // -----------------------------------------------------------------------

    /// Get or create the flat-token concept for `value` under the given
    /// finite representative. Interned for the lifetime of the ontology
    /// (until [`Ontology::clear_infinite`]).
    pub fn flat_token(
        &self,
        representative: ConceptId,
        value: TokenValue,
    ) -> OntolatResult<ConceptId> {
        self.require_finite(representative)?;
        let key = value.key();
        let name = format!(
            "{}_{}",
            self.name_of(representative).unwrap_or_default(),
            value
        );
        let mut inner = self.inner.write().expect("ontology lock poisoned");
        if let Some(&id) = inner.flat_cache.get(&(representative, key.clone())) {
            return Ok(id);
        }
        let id = inner.allocate(self.id);
        let data = ConceptData::new(
            id,
            name,
            ConceptKind::FlatToken {
                value,
                representative,
            },
        );
        inner.concepts.insert(id.get(), data);
        inner.flat_cache.insert((representative, key), id);
        Ok(id)
    }

    /// Look a previously created flat-token concept up by its string key
    /// without creating it.
    pub fn flat_token_by_key(&self, representative: ConceptId, key: &str) -> Option<ConceptId> {
        let inner = self.inner.read().expect("ontology lock poisoned");
        inner
            .flat_cache
            .get(&(representative, key.to_string()))
            .copied()
    }

    /// Get or create the record concept with the given fields under a finite
    /// representative. Field concepts must belong to this ontology.
    pub fn record_concept(
        &self,
        representative: ConceptId,
        fields: BTreeMap<String, ConceptId>,
    ) -> OntolatResult<ConceptId> {
        self.require_finite(representative)?;
        for &component in fields.values() {
            self.concept(component)?;
        }
        let name = record::render_name(self, &fields);
        let mut inner = self.inner.write().expect("ontology lock poisoned");
        if let Some(&id) = inner.record_cache.get(&(representative, name.clone())) {
            return Ok(id);
        }
        let id = inner.allocate(self.id);
        let data = ConceptData::new(
            id,
            name.clone(),
            ConceptKind::Record {
                fields,
                representative,
            },
        );
        inner.concepts.insert(id.get(), data);
        inner.record_cache.insert((representative, name), id);
        Ok(id)
    }

    /// Get or create the product concept pairing `left` and `right`.
    pub fn product_concept(
        &self,
        representative: ConceptId,
        left: ConceptId,
        right: ConceptId,
    ) -> OntolatResult<ConceptId> {
        self.require_finite(representative)?;
        self.concept(left)?;
        self.concept(right)?;
        let name = format!(
            "({} x {})",
            self.name_of(left).unwrap_or_default(),
            self.name_of(right).unwrap_or_default()
        );
        let mut inner = self.inner.write().expect("ontology lock poisoned");
        if let Some(&id) = inner.product_cache.get(&(representative, left, right)) {
            return Ok(id);
        }
        let id = inner.allocate(self.id);
        let data = ConceptData::new(
            id,
            name,
            ConceptKind::Product {
                left,
                right,
                representative,
            },
        );
        inner.concepts.insert(id.get(), data);
        inner.product_cache.insert((representative, left, right), id);
        Ok(id)
    }

    /// Component concept for a field of a record concept, or `None` if the
    /// field is absent.
    pub fn field_concept(
        &self,
        record: ConceptId,
        field: &str,
    ) -> OntolatResult<Option<ConceptId>> {
        let data = self.concept(record)?;
        match data.kind {
            ConceptKind::Record { fields, .. } => Ok(fields.get(field).copied()),
            _ => Ok(None),
        }
    }

    /// Drop all infinite concepts and their interning caches.
    ///
    /// Called on solver reset; ids handed out for infinite concepts become
    /// invalid after this.
    pub fn clear_infinite(&self) {
        let mut inner = self.inner.write().expect("ontology lock poisoned");
        let finite: std::collections::HashSet<u32> =
            inner.finite.iter().map(|id| id.get()).collect();
        inner.concepts.retain(|raw, _| finite.contains(raw));
        inner.flat_cache.clear();
        inner.record_cache.clear();
        inner.product_cache.clear();
    }

    fn invalidate_graph(&self) {
        let mut cache = self.graph_cache.write().expect("graph cache poisoned");
        *cache = None;
    }

    fn require_finite(&self, id: ConceptId) -> OntolatResult<()> {
        let data = self.concept(id).map_err(|_| OntologyError::BadRepresentative {
            representative: id.to_string(),
        })?;
        if data.kind.is_finite() {
            Ok(())
        } else {
            Err(OntologyError::BadRepresentative {
                representative: data.name,
            }
            .into())
        }
    }
}

impl Inner {
    fn allocate(&mut self, ontology: OntologyId) -> ConceptId {
        let raw = self.next_raw;
        self.next_raw += 1;
        ConceptId::new(ontology, raw).expect("concept arena index overflow")
    }
}

impl std::fmt::Debug for Ontology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ontology")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("concepts", &self.len())
            .finish()
    }
}

/// Combine two component orderings into one: directions must agree.
fn combine_directions(a: ConceptOrdering, b: ConceptOrdering) -> ConceptOrdering {
    match (a, b) {
        (ConceptOrdering::Same, other) | (other, ConceptOrdering::Same) => other,
        (x, y) if x == y => x,
        _ => ConceptOrdering::Incomparable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The two-concept scenario: Const → NonConst.
    fn const_nonconst() -> (Ontology, ConceptId, ConceptId) {
        let ont = Ontology::new("constness");
        let constant = ont.add_concept("Const").unwrap();
        let nonconst = ont.add_concept("NonConst").unwrap();
        ont.add_edge(constant, nonconst).unwrap();
        (ont, constant, nonconst)
    }

    #[test]
    fn two_concept_chain_extremes() {
        let (ont, constant, nonconst) = const_nonconst();
        assert_eq!(
            ont.compare(constant, nonconst).unwrap(),
            ConceptOrdering::Lower
        );
        assert_eq!(ont.top().unwrap(), nonconst);
        assert_eq!(ont.bottom().unwrap(), constant);
    }

    #[test]
    fn duplicate_concept_name_rejected() {
        let ont = Ontology::new("dup");
        ont.add_concept("A").unwrap();
        assert!(ont.add_concept("A").is_err());
    }

    #[test]
    fn graph_cache_invalidated_by_mutation() {
        let (ont, constant, nonconst) = const_nonconst();
        assert_eq!(ont.top().unwrap(), nonconst);

        // Adding a concept above NonConst changes the top once re-queried.
        let error = ont.add_concept("Error").unwrap();
        ont.add_edge(nonconst, error).unwrap();
        assert_eq!(ont.top().unwrap(), error);
        assert_eq!(ont.bottom().unwrap(), constant);
    }

    #[test]
    fn foreign_concept_rejected() {
        let (ont, constant, _) = const_nonconst();
        let other = Ontology::new("other");
        let alien = other.add_concept("Alien").unwrap();
        assert!(ont.compare(constant, alien).is_err());
        assert!(ont.add_edge(constant, alien).is_err());
    }

    #[test]
    fn flat_tokens_are_interned_and_below_representative() {
        let (ont, _, nonconst) = const_nonconst();
        let two_a = ont.flat_token(nonconst, TokenValue::Int(2)).unwrap();
        let two_b = ont.flat_token(nonconst, TokenValue::Int(2)).unwrap();
        let three = ont.flat_token(nonconst, TokenValue::Int(3)).unwrap();
        assert_eq!(two_a, two_b);
        assert_ne!(two_a, three);

        assert_eq!(ont.compare(two_a, nonconst).unwrap(), ConceptOrdering::Lower);
        assert_eq!(
            ont.compare(two_a, three).unwrap(),
            ConceptOrdering::Incomparable
        );
        // Distinct siblings join at the representative.
        assert_eq!(ont.least_upper_bound(two_a, three).unwrap(), nonconst);
        assert_eq!(ont.flat_token_by_key(nonconst, "i:2"), Some(two_a));
    }

    #[test]
    fn lub_with_infinite_preserves_precision() {
        let (ont, constant, nonconst) = const_nonconst();
        let token = ont.flat_token(nonconst, TokenValue::Int(7)).unwrap();
        // lub(rep(token)=NonConst, Const) = NonConst, which degenerates to the
        // representative, so the original infinite concept is returned.
        assert_eq!(ont.least_upper_bound(token, constant).unwrap(), token);
        assert_eq!(ont.least_upper_bound(constant, token).unwrap(), token);
        // Against the representative itself, the bound is the representative.
        assert_eq!(ont.least_upper_bound(token, nonconst).unwrap(), nonconst);
        assert_eq!(ont.greatest_lower_bound(token, nonconst).unwrap(), token);
    }

    #[test]
    fn record_round_trip_and_rendering() {
        let (ont, constant, nonconst) = const_nonconst();
        let rep = ont.add_concept("Record").unwrap();
        ont.add_edge(nonconst, rep).unwrap();

        let mut fields = BTreeMap::new();
        fields.insert("y".to_string(), nonconst);
        fields.insert("x".to_string(), constant);
        let rec = ont.record_concept(rep, fields).unwrap();

        assert_eq!(ont.field_concept(rec, "x").unwrap(), Some(constant));
        assert_eq!(ont.field_concept(rec, "y").unwrap(), Some(nonconst));
        assert_eq!(ont.field_concept(rec, "z").unwrap(), None);
        assert_eq!(
            ont.name_of(rec).unwrap(),
            "{ x = Const, y = NonConst }"
        );
    }

    #[test]
    fn record_superset_of_fields_is_lower() {
        let (ont, constant, nonconst) = const_nonconst();
        let rep = ont.add_concept("Record").unwrap();
        ont.add_edge(nonconst, rep).unwrap();

        let mut wide = BTreeMap::new();
        wide.insert("x".to_string(), constant);
        wide.insert("y".to_string(), nonconst);
        let mut narrow = BTreeMap::new();
        narrow.insert("x".to_string(), constant);

        let wide = ont.record_concept(rep, wide).unwrap();
        let narrow = ont.record_concept(rep, narrow).unwrap();
        assert_eq!(ont.compare(wide, narrow).unwrap(), ConceptOrdering::Lower);
        assert_eq!(ont.compare(narrow, wide).unwrap(), ConceptOrdering::Higher);
    }

    #[test]
    fn product_concept_components_drive_ordering() {
        let (ont, constant, nonconst) = const_nonconst();
        let rep = ont.add_concept("Pair").unwrap();
        ont.add_edge(nonconst, rep).unwrap();

        let low = ont.product_concept(rep, constant, constant).unwrap();
        let high = ont.product_concept(rep, nonconst, constant).unwrap();
        let mixed = ont.product_concept(rep, constant, nonconst).unwrap();

        assert_eq!(ont.compare(low, high).unwrap(), ConceptOrdering::Lower);
        assert_eq!(
            ont.compare(high, mixed).unwrap(),
            ConceptOrdering::Incomparable
        );
        let join = ont.least_upper_bound(high, mixed).unwrap();
        let data = ont.concept(join).unwrap();
        match data.kind {
            ConceptKind::Product { left, right, .. } => {
                assert_eq!(left, nonconst);
                assert_eq!(right, nonconst);
            }
            other => panic!("expected product concept, got {other:?}"),
        }
    }

    #[test]
    fn clear_infinite_drops_caches() {
        let (ont, _, nonconst) = const_nonconst();
        let token = ont.flat_token(nonconst, TokenValue::Str("v".into())).unwrap();
        assert!(ont.contains(token));
        ont.clear_infinite();
        assert!(!ont.contains(token));
        assert!(ont.flat_token_by_key(nonconst, "s:v").is_none());

        // The finite skeleton is untouched.
        assert!(ont.contains(nonconst));
        // A fresh request re-creates the member.
        let again = ont.flat_token(nonconst, TokenValue::Str("v".into())).unwrap();
        assert!(ont.contains(again));
    }

    #[test]
    fn lub_set_folds_across_the_chain() {
        let (ont, constant, nonconst) = const_nonconst();
        assert_eq!(
            ont.least_upper_bound_set(&[constant, nonconst, constant])
                .unwrap(),
            nonconst
        );
        assert!(ont.least_upper_bound_set(&[]).is_err());
    }
}
