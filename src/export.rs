//! Export of resolved concepts.
//!
//! Serializes a solver's resolved assignment as JSON so external consumers
//! (a display surface, regression tooling) can highlight elements by concept
//! color or diff runs. Records are sorted by element name for stable output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapter::Propertyable;
use crate::error::{ExportError, OntolatResult};
use crate::model::Model;
use crate::solver::OntologySolver;

/// One resolved propertyable, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConceptRecord {
    /// Full name of the element (or `name#astN` for an expression node).
    pub element: String,
    /// Resolved concept name.
    pub concept: String,
    /// Whether the concept is a valid terminal result.
    pub acceptable: bool,
    /// Display color hint, if the concept declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The resolved assignment as records, sorted by element name.
pub fn resolved_records(
    solver: &OntologySolver,
    model: &Model,
) -> OntolatResult<Vec<ResolvedConceptRecord>> {
    let ontology = solver.ontology();
    let mut records = Vec::new();
    for (prop, concept) in solver.resolved_concepts()? {
        let element = match prop {
            Propertyable::Element(id) => model.full_name(id),
            Propertyable::AstNode { attribute, node } => {
                format!("{}#ast{}", model.full_name(attribute), node.index())
            }
        };
        records.push(ResolvedConceptRecord {
            element,
            concept: ontology
                .name_of(concept)
                .unwrap_or_else(|| concept.to_string()),
            acceptable: ontology.is_acceptable(concept),
            color: ontology.color_of(concept),
        });
    }
    records.sort_by(|a, b| a.element.cmp(&b.element));
    Ok(records)
}

/// Write the resolved assignment as pretty-printed JSON.
pub fn export_resolved<W: Write>(
    solver: &OntologySolver,
    model: &Model,
    writer: W,
) -> OntolatResult<()> {
    let records = resolved_records(solver, model)?;
    serde_json::to_writer_pretty(writer, &records).map_err(ExportError::Serialize)?;
    Ok(())
}

/// Write the resolved assignment to a file path.
pub fn export_resolved_to_path(
    solver: &OntologySolver,
    model: &Model,
    path: impl AsRef<Path>,
) -> OntolatResult<()> {
    let file = File::create(path).map_err(ExportError::Io)?;
    export_resolved(solver, model, BufWriter::new(file))
}
