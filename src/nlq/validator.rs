//! Schema validation of Cypher text
//!
//! All checks are heuristic: every node label and relationship type must
//! exist in the schema, every `var.prop` access on a variable bound with
//! `(var:Label)` must name an attribute of that label, and the statement
//! must not contain write clauses.

use crate::cypher::{extract_node_labels, extract_relationship_types};
use crate::schema::GraphSchema;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

static VARIABLE_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid binding regex")
});

static PROPERTY_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid property regex")
});

static WRITE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|DELETE|DETACH|SET|REMOVE|DROP|CALL|FOREACH|LOAD\s+CSV)\b")
        .expect("valid write clause regex")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`[^`]*`"#).expect("valid quoted text regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }
}

/// Every node label and relationship type must be defined in the schema
pub fn validate_against_schema(cypher: &str, schema: &GraphSchema) -> Vec<String> {
    let mut errors = Vec::new();
    for label in extract_node_labels(cypher) {
        if !schema.has_vertex(&label) {
            errors.push(format!(
                "Vertex label '{}' is not in the graph schema. Valid: {:?}",
                label,
                schema.sorted_vertex_labels()
            ));
        }
    }
    for rel in extract_relationship_types(cypher) {
        if schema.edge(&rel).is_none() {
            errors.push(format!(
                "Relationship type '{}' is not in the graph schema. Valid: {:?}",
                rel,
                schema.sorted_edge_labels()
            ));
        }
    }
    errors
}

/// Variable -> label, first binding wins
fn variable_labels(cypher: &str) -> HashMap<&str, &str> {
    let mut bindings = HashMap::new();
    for caps in VARIABLE_BINDING.captures_iter(cypher) {
        if let (Some(var), Some(label)) = (caps.get(1), caps.get(2)) {
            bindings.entry(var.as_str()).or_insert(label.as_str());
        }
    }
    bindings
}

/// Property accesses on bound variables must use the label's attributes.
/// Unbound variables and labels outside the schema are not checked here.
pub fn validate_properties(cypher: &str, schema: &GraphSchema) -> Vec<String> {
    let bindings = variable_labels(cypher);
    let mut errors = Vec::new();
    for caps in PROPERTY_ACCESS.captures_iter(cypher) {
        let (var, prop) = (&caps[1], &caps[2]);
        let Some(label) = bindings.get(var) else { continue };
        let Some(vertex) = schema.vertex(label) else { continue };
        if !vertex.has_attribute(prop) {
            let mut valid: Vec<&str> = vertex.attribute_names().collect();
            valid.sort_unstable();
            errors.push(format!(
                "Property '{}.{}' is not in schema for {}. Valid attributes: {:?}",
                var, prop, label, valid
            ));
        }
    }
    errors
}

/// Only MATCH/WHERE/RETURN/ORDER BY/LIMIT statements are accepted.
/// Quoted literals and escaped identifiers are ignored, and a keyword only
/// counts where it can open a clause.
pub fn validate_read_only(cypher: &str) -> Vec<String> {
    let unquoted = QUOTED.replace_all(cypher, "''");
    let mut errors: Vec<String> = Vec::new();
    for m in WRITE_CLAUSE.find_iter(&unquoted) {
        if !opens_clause(&unquoted[..m.start()]) {
            continue;
        }
        let clause = m.as_str().to_uppercase();
        let error = format!("Clause '{}' is not allowed; the query must be read-only", clause);
        if !errors.contains(&error) {
            errors.push(error);
        }
    }
    errors
}

/// True at the start of the text, or after whitespace outside any
/// `(...)`, `[...]` or `{...}` group. Excludes labels, relationship types,
/// property names and map keys.
fn opens_clause(before: &str) -> bool {
    if before.chars().next_back().is_some_and(|c| !c.is_whitespace()) {
        return false;
    }
    let depth = before.chars().fold(0i32, |depth, c| match c {
        '(' | '[' | '{' => depth + 1,
        ')' | ']' | '}' => depth - 1,
        _ => depth,
    });
    depth <= 0
}

/// Run every check
pub fn validate_cypher(cypher: &str, schema: &GraphSchema) -> ValidationReport {
    let mut errors = validate_against_schema(cypher, schema);
    errors.extend(validate_properties(cypher, schema));
    errors.extend(validate_read_only(cypher));
    ValidationReport::from_errors(errors)
}
