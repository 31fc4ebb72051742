//! Finite concept graph: DAG-backed partial-order operations.
//!
//! Uses `petgraph` for the graph structure with a side index for O(1) node
//! lookups by [`ConceptId`]. Order edges run lower → higher. Up-sets and
//! down-sets are precomputed at construction so `compare`, `lub`, and `glb`
//! are set operations at query time.
//!
//! Construction validates the lattice property: the edge set must be acyclic,
//! have a unique top and bottom, and give every concept pair a unique least
//! upper bound and greatest lower bound. A graph that fails validation is
//! never handed to the solver.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::concept::{ConceptId, ConceptOrdering};
use crate::error::LatticeError;

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, LatticeError>;

/// Validated partial order over the finite concepts of one ontology.
#[derive(Debug)]
pub struct ConceptGraph {
    graph: DiGraph<ConceptId, ()>,
    node_index: HashMap<ConceptId, NodeIndex>,
    /// For each concept, every concept at or above it (reflexive).
    up_sets: HashMap<ConceptId, HashSet<ConceptId>>,
    /// For each concept, every concept at or below it (reflexive).
    down_sets: HashMap<ConceptId, HashSet<ConceptId>>,
    top: ConceptId,
    bottom: ConceptId,
}

impl ConceptGraph {
    /// Build and validate the graph from a concept list and lower → higher
    /// order edges.
    ///
    /// Fails if the concept set is empty, the edges are cyclic, top or bottom
    /// is not unique, or some pair lacks a unique LUB or GLB. The failing pair
    /// is named in the error.
    pub fn build(
        ontology_name: &str,
        names: &HashMap<ConceptId, String>,
        concepts: &[ConceptId],
        edges: &[(ConceptId, ConceptId)],
    ) -> GraphResult<Self> {
        if concepts.is_empty() {
            return Err(LatticeError::Empty {
                ontology: ontology_name.to_string(),
            });
        }

        let mut graph: DiGraph<ConceptId, ()> = DiGraph::new();
        let mut node_index = HashMap::new();
        for &concept in concepts {
            let idx = graph.add_node(concept);
            node_index.insert(concept, idx);
        }
        for &(lower, higher) in edges {
            let (Some(&li), Some(&hi)) = (node_index.get(&lower), node_index.get(&higher)) else {
                let missing = if node_index.contains_key(&lower) { higher } else { lower };
                return Err(LatticeError::UnknownConcept {
                    concept: display_name(names, missing),
                });
            };
            graph.add_edge(li, hi, ());
        }

        if let Err(cycle) = toposort(&graph, None) {
            let concept = graph[cycle.node_id()];
            return Err(LatticeError::Cyclic {
                ontology: ontology_name.to_string(),
                concept: display_name(names, concept),
            });
        }

        let up_sets = reachable_sets(&graph, &node_index, Direction::Outgoing);
        let down_sets = reachable_sets(&graph, &node_index, Direction::Incoming);

        let maximal: Vec<ConceptId> = concepts
            .iter()
            .copied()
            .filter(|c| up_sets[c].len() == 1)
            .collect();
        if maximal.len() != 1 {
            return Err(LatticeError::NoUniqueTop {
                ontology: ontology_name.to_string(),
                count: maximal.len(),
            });
        }
        let minimal: Vec<ConceptId> = concepts
            .iter()
            .copied()
            .filter(|c| down_sets[c].len() == 1)
            .collect();
        if minimal.len() != 1 {
            return Err(LatticeError::NoUniqueBottom {
                ontology: ontology_name.to_string(),
                count: minimal.len(),
            });
        }

        let built = Self {
            graph,
            node_index,
            up_sets,
            down_sets,
            top: maximal[0],
            bottom: minimal[0],
        };

        // Pairwise counter-example search for the lattice property.
        for (i, &a) in concepts.iter().enumerate() {
            for &b in &concepts[i + 1..] {
                if built.unique_bound(a, b, Bound::Least).is_none() {
                    return Err(LatticeError::NotALattice {
                        ontology: ontology_name.to_string(),
                        a: display_name(names, a),
                        b: display_name(names, b),
                        bound: "least upper bound",
                    });
                }
                if built.unique_bound(a, b, Bound::Greatest).is_none() {
                    return Err(LatticeError::NotALattice {
                        ontology: ontology_name.to_string(),
                        a: display_name(names, a),
                        b: display_name(names, b),
                        bound: "greatest lower bound",
                    });
                }
            }
        }

        tracing::debug!(
            ontology = ontology_name,
            concepts = concepts.len(),
            edges = edges.len(),
            top = %built.top,
            bottom = %built.bottom,
            "validated concept lattice"
        );

        Ok(built)
    }

    /// Compare two finite concepts.
    pub fn compare(&self, a: ConceptId, b: ConceptId) -> GraphResult<ConceptOrdering> {
        let up_a = self.up_set(a)?;
        let down_a = self.down_set(a)?;
        // Also validates b.
        self.up_set(b)?;
        if a == b {
            Ok(ConceptOrdering::Same)
        } else if up_a.contains(&b) {
            Ok(ConceptOrdering::Lower)
        } else if down_a.contains(&b) {
            Ok(ConceptOrdering::Higher)
        } else {
            Ok(ConceptOrdering::Incomparable)
        }
    }

    /// Least upper bound of two finite concepts.
    pub fn least_upper_bound(&self, a: ConceptId, b: ConceptId) -> GraphResult<ConceptId> {
        self.up_set(a)?;
        self.up_set(b)?;
        // Existence and uniqueness were established at construction.
        Ok(self
            .unique_bound(a, b, Bound::Least)
            .expect("validated lattice has a unique lub"))
    }

    /// Greatest lower bound of two finite concepts.
    pub fn greatest_lower_bound(&self, a: ConceptId, b: ConceptId) -> GraphResult<ConceptId> {
        self.down_set(a)?;
        self.down_set(b)?;
        Ok(self
            .unique_bound(a, b, Bound::Greatest)
            .expect("validated lattice has a unique glb"))
    }

    /// Least upper bound over a non-empty concept set.
    pub fn least_upper_bound_set(&self, concepts: &[ConceptId]) -> GraphResult<ConceptId> {
        let (&first, rest) = concepts.split_first().ok_or(LatticeError::EmptyBoundSet)?;
        let mut acc = first;
        self.up_set(acc)?;
        for &c in rest {
            acc = self.least_upper_bound(acc, c)?;
        }
        Ok(acc)
    }

    /// The unique maximal finite concept.
    pub fn top(&self) -> ConceptId {
        self.top
    }

    /// The unique minimal finite concept.
    pub fn bottom(&self) -> ConceptId {
        self.bottom
    }

    /// Number of finite concepts in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no concepts. Never true for a validated graph.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether the concept takes part in this graph.
    pub fn contains(&self, concept: ConceptId) -> bool {
        self.node_index.contains_key(&concept)
    }

    fn up_set(&self, concept: ConceptId) -> GraphResult<&HashSet<ConceptId>> {
        self.up_sets
            .get(&concept)
            .ok_or(LatticeError::UnknownConcept {
                concept: concept.to_string(),
            })
    }

    fn down_set(&self, concept: ConceptId) -> GraphResult<&HashSet<ConceptId>> {
        self.down_sets
            .get(&concept)
            .ok_or(LatticeError::UnknownConcept {
                concept: concept.to_string(),
            })
    }

    /// Find the unique extremum of the common upper (or lower) set of `a` and
    /// `b`, or `None` if it does not exist or is ambiguous.
    fn unique_bound(&self, a: ConceptId, b: ConceptId, bound: Bound) -> Option<ConceptId> {
        let sets: &HashMap<_, HashSet<_>> = match bound {
            Bound::Least => &self.up_sets,
            Bound::Greatest => &self.down_sets,
        };
        let common: HashSet<ConceptId> = sets[&a].intersection(&sets[&b]).copied().collect();
        // The extremum is the member whose own reachability set covers the
        // whole common set: for a lub, every common upper bound sits above it.
        let mut extremum = None;
        for &candidate in &common {
            if common.iter().all(|c| sets[&candidate].contains(c)) {
                if extremum.is_some() {
                    return None;
                }
                extremum = Some(candidate);
            }
        }
        extremum
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Least,
    Greatest,
}

/// Reflexive reachability sets in the given direction, one per node.
fn reachable_sets(
    graph: &DiGraph<ConceptId, ()>,
    node_index: &HashMap<ConceptId, NodeIndex>,
    direction: Direction,
) -> HashMap<ConceptId, HashSet<ConceptId>> {
    let mut sets = HashMap::with_capacity(node_index.len());
    for (&concept, &start) in node_index {
        let mut reached = HashSet::new();
        reached.insert(concept);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for neighbor in graph.neighbors_directed(current, direction) {
                if reached.insert(graph[neighbor]) {
                    queue.push_back(neighbor);
                }
            }
        }
        sets.insert(concept, reached);
    }
    sets
}

fn display_name(names: &HashMap<ConceptId, String>, concept: ConceptId) -> String {
    names
        .get(&concept)
        .cloned()
        .unwrap_or_else(|| concept.to_string())
}
