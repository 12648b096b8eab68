//! Natural language analysis
//!
//! Maps free text to schema entities, relationships, a numeric threshold,
//! a row limit and an ordering target. Every phrase is derived from the
//! schema; nothing about a particular domain is hardcoded except the
//! "risk" ordering shortcut.

use crate::schema::GraphSchema;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Comparison used by a numeric threshold filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equal,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::LessThan => "<",
            ComparisonOp::Equal => "=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric threshold on a vertex attribute, e.g. "transactions over 50,000"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountFilter {
    pub attribute: String,
    pub operator: ComparisonOp,
    pub value: f64,
    pub vertex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub vertex: String,
    pub attribute: String,
    pub direction: SortDirection,
}

/// What the analyzer understood from one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Vertex labels, longest matching phrase first, de-duplicated
    pub entities: Vec<String>,
    pub relationships: Vec<String>,
    pub amount_filter: Option<AmountFilter>,
    pub limit: Option<usize>,
    pub order_by: Option<OrderBy>,
    pub raw_text: String,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.relationships.is_empty()
            && self.amount_filter.is_none()
            && self.limit.is_none()
            && self.order_by.is_none()
    }
}

enum ThresholdOp {
    Compare(ComparisonOp),
    Limit,
}

static THRESHOLD_PATTERNS: LazyLock<Vec<(Regex, ThresholdOp)>> = LazyLock::new(|| {
    [
        (
            r"(?i)(?:over|above|greater than|more than|>\s*)\s*([0-9,]+(?:\.\d+)?)\s*(?:dollars?|usd|\$)?",
            ThresholdOp::Compare(ComparisonOp::GreaterThan),
        ),
        (
            r"(?i)(?:under|below|less than|<\s*)\s*([0-9,]+(?:\.\d+)?)",
            ThresholdOp::Compare(ComparisonOp::LessThan),
        ),
        (r"(?i)limit\s+(\d+)", ThresholdOp::Limit),
    ]
    .into_iter()
    .map(|(pattern, op)| (Regex::new(pattern).expect("valid threshold regex"), op))
    .collect()
});

static LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:first|limit|top)\s+(\d+)").expect("valid limit regex")
});

static DESCENDING: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:order\s+in\s+)?decreasing\s+order",
        r"ordered?\s+in\s+descending\s+order",
        r"descending\s+order",
        r"ordered?\s+from\s+highest\s+to\s+lowest",
        r"highest\s+to\s+lowest",
        r"order\s+by\s+\w+\s+(?:descending|desc)\b",
        r"(?:descending|desc)\s*$",
        r"top\s+(?:\d+\s+)?\w*\s*by\s+\w+",
        r"by\s+risk\s*(?:,|$|and)",
        r"by\s+risk\s+(?:descending|desc)?",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid ordering regex"))
    .collect()
});

/// Analyze a natural-language request against `schema`
pub fn analyze(text: &str, schema: &GraphSchema) -> AnalysisResult {
    let lower = text.to_lowercase();
    let entities = extract_entities(text, &lower, schema);
    let relationships = extract_relationships(&lower, schema);

    let mut limit = extract_limit(text);
    let mut amount_filter = None;
    match extract_threshold(text, &lower, schema) {
        Some(Threshold::Limit(n)) => limit = Some(n),
        Some(Threshold::Compare { operator, value, target }) => {
            let target = target.or_else(|| resolve_threshold_target(&entities, schema));
            amount_filter = target.map(|(vertex, attribute)| AmountFilter {
                attribute,
                operator,
                value,
                vertex,
            });
        }
        None => {}
    }

    AnalysisResult {
        entities,
        relationships,
        amount_filter,
        limit,
        order_by: extract_order_by(&lower, schema),
        raw_text: text.to_string(),
    }
}

/// A phrase that identifies a vertex label
struct EntityPhrase<'a> {
    phrase: String,
    label: &'a str,
    /// Matched against the original text rather than the lowercased one
    exact_case: bool,
}

/// Candidates per label: lowercase label, exact label, naive plural
fn entity_phrases(schema: &GraphSchema) -> Vec<EntityPhrase<'_>> {
    let mut phrases = Vec::new();
    for label in schema.vertex_labels() {
        let low = label.to_lowercase();
        let plural = if low.ends_with('s') { format!("{}es", low) } else { format!("{}s", low) };
        phrases.push(EntityPhrase { phrase: low, label, exact_case: false });
        phrases.push(EntityPhrase { phrase: label.to_string(), label, exact_case: true });
        phrases.push(EntityPhrase { phrase: plural, label, exact_case: false });
    }
    // Stable, so equal-length phrases keep schema order
    phrases.sort_by(|a, b| b.phrase.len().cmp(&a.phrase.len()));
    phrases
}

fn extract_entities(text: &str, lower: &str, schema: &GraphSchema) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for EntityPhrase { phrase, label, exact_case } in entity_phrases(schema) {
        let haystack = if exact_case { text } else { lower };
        if haystack.contains(&phrase) && !found.iter().any(|f| f == label) {
            found.push(label.to_string());
        }
    }
    found
}

fn relationship_phrases(schema: &GraphSchema) -> Vec<(String, &str)> {
    let mut phrases = Vec::new();
    for (label, edge) in schema.edges_by_label() {
        let words = label.to_lowercase().replace('_', " ");
        let from = edge.from.to_lowercase();
        let to = edge.to.to_lowercase();
        phrases.push((words.clone(), label.as_str()));
        phrases.push((label.to_lowercase(), label.as_str()));
        phrases.push((format!("{} {}", from, to), label.as_str()));
        phrases.push((format!("{} {}", to, from), label.as_str()));
        phrases.push((format!("{} {} {}", from, words, to), label.as_str()));
    }
    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    phrases
}

fn extract_relationships(lower: &str, schema: &GraphSchema) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |label: &str| {
        if !found.iter().any(|f| f == label) {
            found.push(label.to_string());
        }
    };
    for (phrase, label) in relationship_phrases(schema) {
        if lower.contains(&phrase) {
            push(label);
        }
    }
    for label in schema.edges_by_label().keys() {
        if lower.contains(&label.to_lowercase()) {
            push(label);
        }
    }
    found
}

enum Threshold {
    Compare {
        operator: ComparisonOp,
        value: f64,
        /// `(vertex, attribute)` when the attribute is named in the text
        target: Option<(String, String)>,
    },
    Limit(usize),
}

fn extract_threshold(text: &str, lower: &str, schema: &GraphSchema) -> Option<Threshold> {
    let numeric = schema.numeric_attributes();
    if numeric.is_empty() {
        return None;
    }

    let (op, value) = THRESHOLD_PATTERNS.iter().find_map(|(pattern, op)| {
        let caps = pattern.captures(text)?;
        let value: f64 = caps[1].replace(',', "").parse().ok()?;
        Some((op, value))
    })?;

    match op {
        ThresholdOp::Limit => Some(Threshold::Limit(value as usize)),
        ThresholdOp::Compare(operator) => {
            let target = numeric
                .iter()
                .find(|(_, attr)| lower.contains(&attr.to_lowercase()))
                .map(|(vertex, attr)| (vertex.to_string(), attr.to_string()));
            Some(Threshold::Compare { operator: *operator, value, target })
        }
    }
}

fn is_identifier(attr: &str) -> bool {
    attr == "id" || attr.ends_with("_id")
}

/// Pick the attribute a bare threshold applies to: `amount` on a mentioned
/// entity, then a non-identifier numeric attribute on one, then any numeric
/// attribute on one, then the first numeric attribute in the schema.
fn resolve_threshold_target(entities: &[String], schema: &GraphSchema) -> Option<(String, String)> {
    let numeric = schema.numeric_attributes();
    let mentioned = |vertex: &str| entities.iter().any(|e| e == vertex);

    numeric
        .iter()
        .find(|(v, a)| mentioned(*v) && *a == "amount")
        .or_else(|| numeric.iter().find(|(v, a)| mentioned(*v) && !is_identifier(a)))
        .or_else(|| numeric.iter().find(|(v, _)| mentioned(*v)))
        .or_else(|| numeric.first())
        .map(|(v, a)| (v.to_string(), a.to_string()))
}

fn extract_limit(text: &str) -> Option<usize> {
    LIMIT.captures(text).and_then(|caps| caps[1].parse().ok())
}

fn extract_order_by(lower: &str, schema: &GraphSchema) -> Option<OrderBy> {
    let direction = if DESCENDING.iter().any(|re| re.is_match(lower)) {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };

    let mentions_risk = lower.contains("risk");
    for (label, vertex) in schema.vertices() {
        for attr in vertex.attribute_names() {
            let attr_low = attr.to_lowercase();
            let spaced = attr_low.replace('_', " ");
            let named = lower.contains(&attr_low) || lower.contains(&spaced);
            if named || (mentions_risk && attr_low.contains("risk")) {
                return Some(OrderBy {
                    vertex: label.clone(),
                    attribute: attr.to_string(),
                    direction,
                });
            }
        }
    }
    None
}
