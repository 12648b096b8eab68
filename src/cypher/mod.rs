//! Regex-based Cypher inspection
//!
//! Extracts structural metadata (labels, relationship types, depth, clause
//! flags) and ABAC resource attributes from arbitrary query text. This is not
//! a parser: there is no grammar and no AST, only best-effort pattern
//! matching over single linear MATCH/WHERE/RETURN/ORDER BY/LIMIT shapes.
//! Nothing here depends on a schema.

pub mod attributes;
pub mod metadata;

pub use attributes::{extract_resource_attributes, AttributeValue, ResourceAttributes};
pub use metadata::{
    calculate_traversal_depth, detect_query_pattern, estimate_edge_count, estimate_node_count,
    extract_node_labels, extract_path_variables, extract_relationship_types,
    has_aggregation_functions, has_limit, has_order_by, has_where_clause, parse_query_metadata,
    QueryMetadata, QueryPattern,
};

use regex::Regex;
use std::sync::LazyLock;

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//.*$").expect("valid line comment regex"));
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strip `//` and `/* */` comments and collapse whitespace runs to one space
pub fn normalize_query(query: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(query, "");
    let without_blocks = BLOCK_COMMENT.replace_all(&without_lines, "");
    WHITESPACE.replace_all(&without_blocks, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_comments() {
        let query = "MATCH (c:Customer) // who\n/* multi\nline */ RETURN   c";
        assert_eq!(normalize_query(query), "MATCH (c:Customer) RETURN c");
    }

    #[test]
    fn test_normalize_blank() {
        assert_eq!(normalize_query("  \n\t "), "");
    }
}
