//! Structural query metadata for authorization
//!
//! Every function here works on raw text; [`parse_query_metadata`] normalizes
//! comments and whitespace once and then runs them all.

use super::normalize_query;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

/// `(var:Label)`, `(:Label)`, `(var:Label1:Label2)`, optionally with an inline property map
static NODE_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\(\s*[A-Za-z0-9_]*\s*:\s*({IDENT}(?:\s*:\s*{IDENT})*)\s*(?:\{{[^}}]*\}})?\s*\)"
    ))
    .expect("valid node label regex")
});

/// `-[:TYPE]->`, `<-[:TYPE]-`, `-[r:A|B*1..3]-`
static REL_TYPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"-\[\s*[A-Za-z0-9_]*\s*:\s*({IDENT}(?:\s*[:|]\s*:?\s*{IDENT})*)[^\]]*\]"
    ))
    .expect("valid relationship type regex")
});

/// Any relationship bracket, typed or not
static REL_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\[[^\]]*\]").expect("valid relationship bracket regex"));

static MATCH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bMATCH\s+").expect("valid match split regex"));
static CLAUSE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:WHERE|RETURN|WITH|ORDER|LIMIT|MATCH)\b").expect("valid clause end regex")
});
static PATH_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpath\s*=\s*\([^)]*\)(?:<?-\[[^\]]*\]->?\([^)]*\))+")
        .expect("valid path assignment regex")
});
static PATH_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({IDENT})\s*=\s*\([^)]*\)(?:<?-\[[^\]]*\]->?\([^)]*\))+"))
        .expect("valid path variable regex")
});

static AGGREGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:COUNT|SUM|AVG|MAX|MIN|COLLECT|DISTINCT)\s*\(")
        .expect("valid aggregation regex")
});
static UNION_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bUNION\b").expect("valid union regex"));
static PATH_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpath\s*=").expect("valid path keyword regex"));
static MATCH_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bMATCH\b").expect("valid match regex"));
static WITH_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWITH\b").expect("valid with regex"));
static WHERE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWHERE\b").expect("valid where regex"));
static ORDER_BY_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bORDER\s+BY\b").expect("valid order by regex"));
static LIMIT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\b").expect("valid limit regex"));
static LIMIT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)").expect("valid limit value regex"));

/// Overall query shape, first match wins in declaration order of the checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPattern {
    #[default]
    Simple,
    Path,
    MultiMatch,
    WithClause,
    Union,
}

impl QueryPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryPattern::Simple => "simple",
            QueryPattern::Path => "path",
            QueryPattern::MultiMatch => "multi_match",
            QueryPattern::WithClause => "with_clause",
            QueryPattern::Union => "union",
        }
    }
}

impl fmt::Display for QueryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata extracted from one query. `estimated_nodes` and
/// `estimated_edges` are rough heuristics, never exact counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub node_labels: BTreeSet<String>,
    pub relationship_types: BTreeSet<String>,
    pub max_depth: usize,
    pub has_aggregations: bool,
    pub query_pattern: QueryPattern,
    pub path_variables: Vec<String>,
    pub has_where_clause: bool,
    pub has_order_by: bool,
    pub has_limit: bool,
    pub estimated_nodes: usize,
    pub estimated_edges: usize,
}

/// Parse a query into [`QueryMetadata`]; blank input gives the empty record
pub fn parse_query_metadata(query: &str) -> QueryMetadata {
    if query.trim().is_empty() {
        return QueryMetadata::default();
    }
    let query = normalize_query(query);

    QueryMetadata {
        node_labels: extract_node_labels(&query),
        relationship_types: extract_relationship_types(&query),
        max_depth: calculate_traversal_depth(&query),
        has_aggregations: has_aggregation_functions(&query),
        query_pattern: detect_query_pattern(&query),
        path_variables: extract_path_variables(&query),
        has_where_clause: has_where_clause(&query),
        has_order_by: has_order_by(&query),
        has_limit: has_limit(&query),
        estimated_nodes: estimate_node_count(&query),
        estimated_edges: estimate_edge_count(&query),
    }
}

fn split_labels(group: &str, separators: &[char]) -> Vec<String> {
    group
        .split(|c: char| separators.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Node labels; multi-label nodes contribute every label, unlabeled nodes nothing
pub fn extract_node_labels(query: &str) -> BTreeSet<String> {
    NODE_LABELS
        .captures_iter(query)
        .filter_map(|caps| caps.get(1))
        .flat_map(|group| split_labels(group.as_str(), &[':']))
        .collect()
}

/// Relationship types, regardless of direction
pub fn extract_relationship_types(query: &str) -> BTreeSet<String> {
    REL_TYPES
        .captures_iter(query)
        .filter_map(|caps| caps.get(1))
        .flat_map(|group| split_labels(group.as_str(), &[':', '|']))
        .collect()
}

/// Longest hop count of any single MATCH clause or `path = ...` assignment.
///
/// Separate MATCH clauses are not summed even when they share a variable, so
/// `MATCH (a)-[:R]->(b) MATCH (b)-[:S]->(c)` has depth 1.
pub fn calculate_traversal_depth(query: &str) -> usize {
    let mut max_depth = 0;

    for part in MATCH_SPLIT.split(query).skip(1) {
        let clause = match CLAUSE_END.find(part) {
            Some(end) => &part[..end.start()],
            None => part,
        };
        max_depth = max_depth.max(REL_BRACKET.find_iter(clause).count());
    }

    for path in PATH_ASSIGNMENT.find_iter(query) {
        max_depth = max_depth.max(REL_BRACKET.find_iter(path.as_str()).count());
    }

    max_depth
}

pub fn has_aggregation_functions(query: &str) -> bool {
    AGGREGATION.is_match(query)
}

/// Priority: union, path assignment, several MATCH clauses, WITH, simple
pub fn detect_query_pattern(query: &str) -> QueryPattern {
    if UNION_KEYWORD.is_match(query) {
        QueryPattern::Union
    } else if PATH_KEYWORD.is_match(query) {
        QueryPattern::Path
    } else if MATCH_KEYWORD.find_iter(query).count() > 1 {
        QueryPattern::MultiMatch
    } else if WITH_KEYWORD.is_match(query) {
        QueryPattern::WithClause
    } else {
        QueryPattern::Simple
    }
}

/// Names bound by `name = (..)-[..]->(..)` assignments
pub fn extract_path_variables(query: &str) -> Vec<String> {
    PATH_VARIABLE
        .captures_iter(query)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn has_where_clause(query: &str) -> bool {
    WHERE_KEYWORD.is_match(query)
}

pub fn has_order_by(query: &str) -> bool {
    ORDER_BY_KEYWORD.is_match(query)
}

pub fn has_limit(query: &str) -> bool {
    LIMIT_KEYWORD.is_match(query)
}

/// Explicit LIMIT value, else ten per labeled node pattern
pub fn estimate_node_count(query: &str) -> usize {
    if let Some(limit) = LIMIT_VALUE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
    {
        return limit;
    }
    NODE_LABELS.find_iter(query).count() * 10
}

/// Ten per relationship pattern
pub fn estimate_edge_count(query: &str) -> usize {
    REL_BRACKET.find_iter(query).count() * 10
}
