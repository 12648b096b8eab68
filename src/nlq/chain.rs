//! Path chain construction
//!
//! Turns analyzer output into one connected, linear traversal whose every
//! edge exists in the schema with matching endpoints.

use crate::schema::EdgeDef;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// One traversal step. An empty `edge` marks a single-vertex chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSegment {
    pub from: String,
    pub edge: String,
    pub to: String,
}

impl PathSegment {
    fn new(from: &str, edge: &str, to: &str) -> Self {
        Self { from: from.to_string(), edge: edge.to_string(), to: to.to_string() }
    }

    /// Single-vertex marker
    pub fn vertex(label: &str) -> Self {
        Self::new(label, "", "")
    }

    pub fn is_vertex(&self) -> bool {
        self.edge.is_empty()
    }
}

pub type PathChain = Vec<PathSegment>;

/// Build a traversal from detected entities and relationships.
///
/// Returns `None` when nothing usable was detected; the caller picks a
/// default vertex.
pub fn build_path_chain(
    entities: &[String],
    relationships: &[String],
    edges: &IndexMap<String, EdgeDef>,
) -> Option<PathChain> {
    if let Some(chain) = chain_from_relationships(relationships, edges) {
        return Some(chain);
    }

    if entities.len() >= 2 {
        if let Some(segment) = link_entities(entities, edges) {
            return Some(vec![segment]);
        }
    }

    entities.first().map(|label| vec![PathSegment::vertex(label)])
}

fn chain_from_relationships(
    relationships: &[String],
    edges: &IndexMap<String, EdgeDef>,
) -> Option<PathChain> {
    let mut pending: Vec<(&str, &EdgeDef)> = Vec::new();
    for rel in relationships {
        match edges.get(rel) {
            Some(edge) if !pending.iter().any(|(label, _)| *label == rel.as_str()) => {
                pending.push((rel.as_str(), edge));
            }
            Some(_) => {}
            None => debug!("Relationship {} has no schema edge", rel),
        }
    }
    if pending.is_empty() {
        return None;
    }

    let (seed_label, seed) = pending.remove(0);
    let mut chain = vec![PathSegment::new(&seed.from, seed_label, &seed.to)];

    // Attach at either end until nothing else fits
    loop {
        let first = chain[0].from.clone();
        let last = chain[chain.len() - 1].to.clone();
        let Some(pos) = pending.iter().position(|(_, e)| e.from == last || e.to == first) else {
            break;
        };
        let (label, edge) = pending.remove(pos);
        let segment = PathSegment::new(&edge.from, label, &edge.to);
        if edge.from == last {
            chain.push(segment);
        } else {
            chain.insert(0, segment);
        }
    }

    for (label, _) in pending {
        debug!("Dropping relationship {} that does not connect to the path", label);
    }
    Some(chain)
}

/// An edge joining two mentioned entities, preferring first -> last order
fn link_entities(entities: &[String], edges: &IndexMap<String, EdgeDef>) -> Option<PathSegment> {
    let first = entities.first()?;
    let last = entities.last()?;
    let mentioned = |label: &str| entities.iter().any(|e| e == label);

    let candidates: Vec<(&String, &EdgeDef)> = edges
        .iter()
        .filter(|(_, e)| e.from != e.to && mentioned(e.from.as_str()) && mentioned(e.to.as_str()))
        .collect();

    candidates
        .iter()
        .find(|(_, e)| (&e.from == first && &e.to == last) || (&e.to == first && &e.from == last))
        .or_else(|| candidates.first())
        .map(|(label, e)| PathSegment::new(&e.from, label, &e.to))
}
