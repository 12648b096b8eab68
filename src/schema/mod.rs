//! Graph schema model
//!
//! Loads the property-graph view of relational data (vertices with typed
//! attributes, edges with fixed endpoints) from a schema document and exposes
//! the lookups the analyzer, generator and validator need. The raw document is
//! retained so it can be redacted and shown to an external text generator.

pub mod provider;
pub mod redact;

pub use provider::{SchemaFile, SchemaProvider};
pub use redact::{redact_for_external_use, REDACTED_PLACEHOLDER};

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Attribute types treated as numeric for threshold filters
pub const NUMERIC_TYPES: [&str; 4] = ["Decimal", "Int", "Float", "Long"];

/// Schema errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// A vertex attribute with its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: String,
    pub data_type: String,
}

impl AttributeDef {
    pub fn is_numeric(&self) -> bool {
        NUMERIC_TYPES.contains(&self.data_type.as_str())
    }
}

/// Vertex definition: id fields first, then attributes, de-duplicated by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDef {
    pub attributes: Vec<AttributeDef>,
}

impl VertexDef {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}

/// Edge definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDef {
    pub from: String,
    pub to: String,
}

/// Immutable graph schema, supplied per call and never mutated
#[derive(Debug, Clone)]
pub struct GraphSchema {
    vertices: IndexMap<String, VertexDef>,
    edges: IndexMap<String, EdgeDef>,
    document: Value,
}

impl GraphSchema {
    /// Build a schema from a document of the shape
    /// `{ graph: { vertices: [...], edges: [...] }, catalogs: [...] }`.
    ///
    /// Vertices without a label and edges missing any endpoint are skipped.
    pub fn from_document(document: Value) -> SchemaResult<Self> {
        let graph = document
            .get("graph")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::InvalidDocument("missing 'graph' object".to_string()))?;

        let mut vertices = IndexMap::new();
        for vertex in graph.get("vertices").and_then(Value::as_array).into_iter().flatten() {
            let Some(label) = vertex.get("label").and_then(Value::as_str).filter(|l| !l.is_empty()) else {
                debug!("Skipping vertex without label");
                continue;
            };
            vertices.insert(label.to_string(), parse_vertex(vertex));
        }

        let mut edges = IndexMap::new();
        for edge in graph.get("edges").and_then(Value::as_array).into_iter().flatten() {
            let field = |key: &str| edge.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
            match (field("label"), field("fromVertex"), field("toVertex")) {
                (Some(label), Some(from), Some(to)) => {
                    edges.insert(
                        label.to_string(),
                        EdgeDef { from: from.to_string(), to: to.to_string() },
                    );
                }
                _ => debug!("Skipping incomplete edge definition"),
            }
        }

        Ok(Self { vertices, edges, document })
    }

    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    /// Load a schema file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let document: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)?,
            _ => serde_json::from_str(&raw)?,
        };
        let schema = Self::from_document(document)?;
        info!(
            "Loaded graph schema from {:?}: {} vertices, {} edges",
            path,
            schema.vertices.len(),
            schema.edges.len()
        );
        Ok(schema)
    }

    /// Vertex labels in document order
    pub fn vertex_labels(&self) -> impl Iterator<Item = &str> {
        self.vertices.keys().map(String::as_str)
    }

    pub fn sorted_vertex_labels(&self) -> Vec<&str> {
        self.vertex_labels().collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn has_vertex(&self, label: &str) -> bool {
        self.vertices.contains_key(label)
    }

    pub fn vertex(&self, label: &str) -> Option<&VertexDef> {
        self.vertices.get(label)
    }

    pub fn vertices(&self) -> &IndexMap<String, VertexDef> {
        &self.vertices
    }

    /// Edge label -> endpoints
    pub fn edges_by_label(&self) -> &IndexMap<String, EdgeDef> {
        &self.edges
    }

    pub fn edge(&self, label: &str) -> Option<&EdgeDef> {
        self.edges.get(label)
    }

    pub fn sorted_edge_labels(&self) -> Vec<&str> {
        self.edges.keys().map(String::as_str).collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Attribute names of a vertex; empty when the label is unknown
    pub fn attribute_names(&self, label: &str) -> Vec<&str> {
        self.vertices
            .get(label)
            .map(|v| v.attribute_names().collect())
            .unwrap_or_default()
    }

    /// `(vertex label, attribute name)` for every numeric attribute, in schema order
    pub fn numeric_attributes(&self) -> Vec<(&str, &str)> {
        self.vertices
            .iter()
            .flat_map(|(label, vertex)| {
                vertex
                    .attributes
                    .iter()
                    .filter(|a| a.is_numeric())
                    .map(move |a| (label.as_str(), a.name.as_str()))
            })
            .collect()
    }

    /// The document as supplied, credentials included. Never send this anywhere.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Deep copy of the document with credential-like keys replaced
    pub fn redacted_document(&self) -> Value {
        redact_for_external_use(&self.document)
    }

    /// Compact, human-readable description used in generation prompts
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Vertex labels (use exactly these in node patterns, no space after colon): {}",
                self.sorted_vertex_labels().join(", ")
            ),
            "Edges (use exactly these in relationship patterns, direction from -> to):".to_string(),
        ];
        for label in self.sorted_edge_labels() {
            if let Some(edge) = self.edges.get(label) {
                lines.push(format!("  {}: ({})-[:{}]->({})", label, edge.from, label, edge.to));
            }
        }
        lines.push(
            "Vertex attributes (use in RETURN, WHERE, ORDER BY). Type in parens:".to_string(),
        );
        for label in self.sorted_vertex_labels() {
            let Some(vertex) = self.vertices.get(label) else { continue };
            if vertex.attributes.is_empty() {
                continue;
            }
            let parts: Vec<String> = vertex
                .attributes
                .iter()
                .take(10)
                .map(|a| format!("{}({})", a.name, a.data_type))
                .collect();
            lines.push(format!("  {}: {}", label, parts.join(", ")));
        }
        lines.push(
            "Ordering: for risk-style attributes (values may be high/med/low or HIGH/MEDIUM/LOW) use \
             ORDER BY CASE upper(trim(toString(var.risk_rating))) WHEN 'HIGH' THEN 3 WHEN 'MEDIUM' THEN 2 \
             WHEN 'MED' THEN 2 WHEN 'LOW' THEN 1 ELSE 0 END DESC."
                .to_string(),
        );
        lines.join("\n")
    }
}

fn parse_vertex(vertex: &Value) -> VertexDef {
    let one_to_one = vertex.get("oneToOne");
    let id_fields = one_to_one
        .and_then(|o| o.get("id"))
        .and_then(|id| id.get("fields"))
        .and_then(Value::as_array);
    let attributes = one_to_one
        .and_then(|o| o.get("attributes"))
        .and_then(Value::as_array);

    let mut def = VertexDef::default();
    let sources = [(id_fields, "Int"), (attributes, "String")];
    for (entries, default_type) in sources {
        for entry in entries.into_iter().flatten() {
            let name = entry
                .get("alias")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| entry.get("field").and_then(Value::as_str))
                .filter(|s| !s.is_empty());
            let Some(name) = name else { continue };
            if def.has_attribute(name) {
                continue;
            }
            let data_type = entry
                .get("type")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(default_type);
            def.attributes.push(AttributeDef {
                name: name.to_string(),
                data_type: data_type.to_string(),
            });
        }
    }
    def
}

#[cfg(test)]
pub(crate) fn aml_schema() -> GraphSchema {
    GraphSchema::from_json_str(include_str!("../../schemas/aml-schema.json"))
        .expect("bundled AML schema parses")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vertex_labels_and_edges() {
        let schema = aml_schema();
        let labels = schema.sorted_vertex_labels();
        assert_eq!(labels, vec!["Account", "Alert", "Case", "Customer", "Transaction"]);

        let owns = schema.edge("OWNS").unwrap();
        assert_eq!(owns.from, "Customer");
        assert_eq!(owns.to, "Account");
        assert_eq!(schema.edges_by_label().len(), 6);
    }

    #[test]
    fn test_attributes_include_id_fields_first() {
        let schema = aml_schema();
        let names = schema.attribute_names("Customer");
        assert_eq!(names[0], "customer_id");
        assert!(names.contains(&"risk_rating"));
        assert!(schema.attribute_names("Nope").is_empty());
    }

    #[test]
    fn test_numeric_attributes() {
        let schema = aml_schema();
        let numeric = schema.numeric_attributes();
        assert!(numeric.contains(&("Transaction", "amount")));
        assert!(numeric.contains(&("Account", "balance")));
        assert!(!numeric.contains(&("Customer", "name")));
        assert!(!numeric.contains(&("Transaction", "txn_time")));
    }

    #[test]
    fn test_field_fallback_and_default_types() {
        let schema = GraphSchema::from_document(json!({
            "graph": {
                "vertices": [
                    {"label": "Device", "oneToOne": {
                        "id": {"fields": [{"field": "device_id"}]},
                        "attributes": [{"field": "model"}, {"alias": "model", "type": "Int"}]
                    }},
                    {"oneToOne": {}}
                ],
                "edges": [{"label": "BROKEN", "fromVertex": "Device"}]
            }
        }))
        .unwrap();

        let device = schema.vertex("Device").unwrap();
        assert_eq!(device.attributes.len(), 2);
        assert_eq!(device.attributes[0].data_type, "Int");
        assert_eq!(device.attributes[1].data_type, "String");
        assert_eq!(schema.vertices().len(), 1);
        assert!(schema.edges_by_label().is_empty());
    }

    #[test]
    fn test_missing_graph_is_rejected() {
        let result = GraphSchema::from_document(json!({"catalogs": []}));
        assert!(matches!(result, Err(SchemaError::InvalidDocument(_))));
    }

    #[test]
    fn test_summary_lists_edges_with_direction() {
        let summary = aml_schema().summary();
        assert!(summary.contains("OWNS: (Customer)-[:OWNS]->(Account)"));
        assert!(summary.contains("amount(Decimal)"));
        assert!(!summary.contains("s3cr3t"));
    }
}
