//! Record-concept ordering and bounds.
//!
//! A record concept maps field names to component concepts. The ordering rule
//! is fixed: a record with a *superset* of fields is *lower* in the lattice
//! than one with a subset (more constrained = lower), and the per-field
//! comparisons across all common fields must agree in direction, else the two
//! records are incomparable. The tie-break between the field-set direction and
//! the per-field direction is part of the rule; changing it would silently
//! change inference results.

use std::collections::BTreeMap;

use crate::concept::{ConceptId, ConceptOrdering};
use crate::error::OntolatResult;

use super::Ontology;

type Fields = BTreeMap<String, ConceptId>;

/// Compare two field maps under the record-lattice rule.
pub(crate) fn compare_fields(ont: &Ontology, a: &Fields, b: &Fields) -> OntolatResult<ConceptOrdering> {
    let mut has_lower = false;
    let mut has_higher = false;
    for (name, &ac) in a {
        let Some(&bc) = b.get(name) else { continue };
        match ont.compare(ac, bc)? {
            ConceptOrdering::Lower => has_lower = true,
            ConceptOrdering::Higher => has_higher = true,
            ConceptOrdering::Same => {}
            ConceptOrdering::Incomparable => return Ok(ConceptOrdering::Incomparable),
        }
    }
    if has_lower && has_higher {
        return Ok(ConceptOrdering::Incomparable);
    }
    let per_field = if has_lower {
        ConceptOrdering::Lower
    } else if has_higher {
        ConceptOrdering::Higher
    } else {
        ConceptOrdering::Same
    };

    let a_extra = a.keys().any(|k| !b.contains_key(k));
    let b_extra = b.keys().any(|k| !a.contains_key(k));
    // Superset of fields ⇒ lower.
    let field_set = match (a_extra, b_extra) {
        (true, true) => return Ok(ConceptOrdering::Incomparable),
        (true, false) => ConceptOrdering::Lower,
        (false, true) => ConceptOrdering::Higher,
        (false, false) => ConceptOrdering::Same,
    };

    Ok(match (field_set, per_field) {
        (ConceptOrdering::Same, dir) => dir,
        (dir, ConceptOrdering::Same) => dir,
        (fs, pf) if fs == pf => fs,
        _ => ConceptOrdering::Incomparable,
    })
}

/// Field map of the least upper bound: the intersection of fields, each
/// component joined. Dropping a field moves the record up the lattice.
pub(crate) fn lub_fields(ont: &Ontology, a: &Fields, b: &Fields) -> OntolatResult<Fields> {
    let mut out = Fields::new();
    for (name, &ac) in a {
        if let Some(&bc) = b.get(name) {
            out.insert(name.clone(), ont.least_upper_bound(ac, bc)?);
        }
    }
    Ok(out)
}

/// Field map of the greatest lower bound: the union of fields, common
/// components met. Adding a field moves the record down the lattice.
pub(crate) fn glb_fields(ont: &Ontology, a: &Fields, b: &Fields) -> OntolatResult<Fields> {
    let mut out = Fields::new();
    for (name, &ac) in a {
        let component = match b.get(name) {
            Some(&bc) => ont.greatest_lower_bound(ac, bc)?,
            None => ac,
        };
        out.insert(name.clone(), component);
    }
    for (name, &bc) in b {
        out.entry(name.clone()).or_insert(bc);
    }
    Ok(out)
}

/// Render the canonical record name, fields in sorted key order:
/// `{ x = C1, y = C2 }`.
pub(crate) fn render_name(ont: &Ontology, fields: &Fields) -> String {
    let mut out = String::from("{ ");
    let mut first = true;
    for (name, &concept) in fields {
        if !first {
            out.push_str(", ");
        }
        first = false;
        out.push_str(name);
        out.push_str(" = ");
        out.push_str(&ont.name_of(concept).unwrap_or_else(|| concept.to_string()));
    }
    out.push_str(" }");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::Ontology;

    /// Unknown → Const → NonConst plus a Record representative above Unknown.
    fn const_ontology() -> (Ontology, ConceptId, ConceptId, ConceptId) {
        let ont = Ontology::new("constAnalysis");
        let unknown = ont.add_concept("Unknown").unwrap();
        let constant = ont.add_concept("Const").unwrap();
        let nonconst = ont.add_concept("NonConst").unwrap();
        ont.add_edge(unknown, constant).unwrap();
        ont.add_edge(constant, nonconst).unwrap();
        (ont, unknown, constant, nonconst)
    }

    fn fields(pairs: &[(&str, ConceptId)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn superset_of_fields_is_lower() {
        let (ont, _, constant, nonconst) = const_ontology();
        let wide = fields(&[("x", constant), ("y", nonconst)]);
        let narrow = fields(&[("x", constant)]);
        assert_eq!(
            compare_fields(&ont, &wide, &narrow).unwrap(),
            ConceptOrdering::Lower
        );
        assert_eq!(
            compare_fields(&ont, &narrow, &wide).unwrap(),
            ConceptOrdering::Higher
        );
    }

    #[test]
    fn equal_fields_compare_per_component() {
        let (ont, _, constant, nonconst) = const_ontology();
        let low = fields(&[("x", constant), ("y", constant)]);
        let high = fields(&[("x", nonconst), ("y", constant)]);
        assert_eq!(
            compare_fields(&ont, &low, &high).unwrap(),
            ConceptOrdering::Lower
        );
        assert_eq!(
            compare_fields(&ont, &low, &low).unwrap(),
            ConceptOrdering::Same
        );
    }

    #[test]
    fn mixed_directions_are_incomparable() {
        let (ont, _, constant, nonconst) = const_ontology();
        let a = fields(&[("x", constant), ("y", nonconst)]);
        let b = fields(&[("x", nonconst), ("y", constant)]);
        assert_eq!(
            compare_fields(&ont, &a, &b).unwrap(),
            ConceptOrdering::Incomparable
        );
    }

    #[test]
    fn field_set_and_component_direction_must_agree() {
        let (ont, _, constant, nonconst) = const_ontology();
        // a has more fields (⇒ lower) but its common component is higher.
        let a = fields(&[("x", nonconst), ("y", constant)]);
        let b = fields(&[("x", constant)]);
        assert_eq!(
            compare_fields(&ont, &a, &b).unwrap(),
            ConceptOrdering::Incomparable
        );
    }

    #[test]
    fn disjoint_field_sets_are_incomparable() {
        let (ont, _, constant, _) = const_ontology();
        let a = fields(&[("x", constant)]);
        let b = fields(&[("y", constant)]);
        assert_eq!(
            compare_fields(&ont, &a, &b).unwrap(),
            ConceptOrdering::Incomparable
        );
    }

    #[test]
    fn lub_keeps_common_fields_joined() {
        let (ont, _, constant, nonconst) = const_ontology();
        let a = fields(&[("x", constant), ("y", constant)]);
        let b = fields(&[("x", nonconst)]);
        let joined = lub_fields(&ont, &a, &b).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined["x"], nonconst);
    }

    #[test]
    fn glb_takes_field_union() {
        let (ont, unknown, constant, nonconst) = const_ontology();
        let a = fields(&[("x", constant), ("y", unknown)]);
        let b = fields(&[("x", nonconst), ("z", constant)]);
        let met = glb_fields(&ont, &a, &b).unwrap();
        assert_eq!(met.len(), 3);
        assert_eq!(met["x"], constant);
        assert_eq!(met["y"], unknown);
        assert_eq!(met["z"], constant);
    }
}
