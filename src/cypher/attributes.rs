//! ABAC resource attributes derived from query text
//!
//! The same extraction runs over machine-generated queries and over queries a
//! user submits directly, so the policy engine sees one vocabulary either
//! way. Keys without a discovered value are absent from the map, never null.

use super::normalize_query;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

pub const RISK_RATING: &str = "risk_rating";
pub const PEP_FLAG: &str = "pep_flag";
pub const SEVERITY: &str = "severity";
pub const STATUS: &str = "status";
pub const CUSTOMER_TEAM: &str = "customer_team";
pub const CUSTOMER_REGION: &str = "customer_region";
pub const TRANSACTION_AMOUNT_MIN: &str = "transaction_amount_min";
pub const TRANSACTION_AMOUNT_MAX: &str = "transaction_amount_max";
pub const TRANSACTION_AMOUNT: &str = "transaction_amount";

/// Quoted string (quotes stripped) or a bare token
const VALUE: &str = r#"(?:'([^']*)'|"([^"]*)"|([^'"\s,)}]+))"#;
const NUMBER: &str = r"(-?\d+(?:\.\d+)?)";

static WHERE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWHERE\s+").expect("valid where start regex"));
static WHERE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:RETURN|WITH|ORDER|LIMIT|MATCH|UNION)\b").expect("valid where end regex")
});
static PROPERTY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("valid property block regex"));

static AMOUNT_COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bamount\b\s*(>=|<=|<>|!=|=|>|<)\s*{NUMBER}"))
        .expect("valid amount comparison regex")
});
static AMOUNT_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bamount\s*:\s*{NUMBER}")).expect("valid amount property regex")
});
static PEP_COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpep_flag\b\s*=\s*(true|false)\b").expect("valid pep comparison regex")
});
static PEP_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpep_flag\s*:\s*(true|false)\b").expect("valid pep property regex")
});

/// String-valued attribute: query property name -> resource attribute key
struct StringRule {
    key: &'static str,
    comparison: Regex,
    property: Regex,
}

impl StringRule {
    fn new(property_name: &str, key: &'static str) -> Self {
        Self {
            key,
            comparison: Regex::new(&format!(r"(?i)\b{property_name}\b\s*[=<>!]+\s*{VALUE}"))
                .expect("valid string comparison regex"),
            property: Regex::new(&format!(r"(?i)\b{property_name}\s*:\s*{VALUE}"))
                .expect("valid string property regex"),
        }
    }
}

static STRING_RULES: LazyLock<[StringRule; 5]> = LazyLock::new(|| {
    [
        StringRule::new("risk_rating", RISK_RATING),
        StringRule::new("severity", SEVERITY),
        StringRule::new("status", STATUS),
        StringRule::new("team", CUSTOMER_TEAM),
        StringRule::new("region", CUSTOMER_REGION),
    ]
});

/// A single resource attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Number(f64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::String(s) => Value::String(s),
            AttributeValue::Bool(b) => Value::Bool(b),
            AttributeValue::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// Flat attribute map in discovery order; later discoveries overwrite earlier ones
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResourceAttributes(IndexMap<String, AttributeValue>);

impl ResourceAttributes {
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn set(&mut self, key: &str, value: AttributeValue) {
        self.0.insert(key.to_string(), value);
    }

    /// JSON object for merging into a policy request. Non-finite numbers are dropped.
    pub fn into_json_map(self) -> Map<String, Value> {
        self.0
            .into_iter()
            .filter_map(|(k, v)| match Value::from(v) {
                Value::Null => None,
                json => Some((k, json)),
            })
            .collect()
    }
}

fn captured_value(caps: &regex::Captures<'_>) -> Option<String> {
    (1..=3)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str().trim_matches(|c: char| c == '\'' || c == '"').to_string())
        .next()
}

fn parse_bool(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

/// WHERE clause bodies, each ending at the next clause keyword or end of text
fn where_clauses(query: &str) -> Vec<&str> {
    WHERE_START
        .find_iter(query)
        .map(|start| {
            let end = WHERE_END
                .find_at(query, start.end())
                .map(|m| m.start())
                .unwrap_or(query.len());
            &query[start.end()..end.max(start.end())]
        })
        .collect()
}

fn scan_where_clause(clause: &str, attributes: &mut ResourceAttributes) {
    let [risk, rest @ ..] = &*STRING_RULES;
    if let Some(value) = risk.comparison.captures(clause).and_then(|c| captured_value(&c)) {
        attributes.set(risk.key, AttributeValue::String(value));
    }

    for caps in AMOUNT_COMPARISON.captures_iter(clause) {
        let Ok(value) = caps[2].parse::<f64>() else { continue };
        let key = match &caps[1] {
            ">" | ">=" => TRANSACTION_AMOUNT_MIN,
            "<" | "<=" => TRANSACTION_AMOUNT_MAX,
            "=" => TRANSACTION_AMOUNT,
            _ => continue,
        };
        attributes.set(key, AttributeValue::Number(value));
    }

    if let Some(caps) = PEP_COMPARISON.captures(clause) {
        attributes.set(PEP_FLAG, AttributeValue::Bool(parse_bool(&caps[1])));
    }

    for rule in rest {
        if let Some(value) = rule.comparison.captures(clause).and_then(|c| captured_value(&c)) {
            attributes.set(rule.key, AttributeValue::String(value));
        }
    }
}

fn scan_property_block(props: &str, attributes: &mut ResourceAttributes) {
    if let Some(caps) = PEP_PROPERTY.captures(props) {
        attributes.set(PEP_FLAG, AttributeValue::Bool(parse_bool(&caps[1])));
    }
    if let Some(value) = AMOUNT_PROPERTY
        .captures(props)
        .and_then(|caps| caps[1].parse::<f64>().ok())
    {
        attributes.set(TRANSACTION_AMOUNT, AttributeValue::Number(value));
    }
    for rule in STRING_RULES.iter() {
        if let Some(value) = rule.property.captures(props).and_then(|c| captured_value(&c)) {
            attributes.set(rule.key, AttributeValue::String(value));
        }
    }
}

/// Extract resource attributes from WHERE clauses and inline `{...}` property maps
pub fn extract_resource_attributes(query: &str) -> ResourceAttributes {
    let mut attributes = ResourceAttributes::default();
    if query.trim().is_empty() {
        return attributes;
    }
    let query = normalize_query(query);

    for clause in where_clauses(&query) {
        scan_where_clause(clause, &mut attributes);
    }
    for caps in PROPERTY_BLOCK.captures_iter(&query) {
        scan_property_block(&caps[1], &mut attributes);
    }

    attributes
}
