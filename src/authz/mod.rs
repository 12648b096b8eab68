//! Authorization context for graph queries
//!
//! Builds the flat attribute map a policy engine evaluates before a graph
//! query runs. Cypher queries contribute their parsed metadata and resource
//! attributes; Gremlin queries only their text. Attributes with no value are
//! left out entirely so that null checks in policy rules behave.

use crate::cypher::{extract_resource_attributes, parse_query_metadata};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource id used for every ad-hoc graph query
pub const GRAPH_QUERY_RESOURCE_ID: &str = "graph-query";

#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("Query is required")]
    EmptyQuery,

    #[error("Query type must be 'cypher' or 'gremlin', got '{0}'")]
    UnsupportedQueryType(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Cypher,
    Gremlin,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Cypher => "cypher",
            QueryType::Gremlin => "gremlin",
        }
    }

    /// Policy resource kind checked for this query type
    pub fn resource_kind(&self) -> &'static str {
        match self {
            QueryType::Cypher => "cypher_query",
            QueryType::Gremlin => "transaction",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            QueryType::Cypher => "execute",
            QueryType::Gremlin => "graph_expand",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cypher" => Ok(QueryType::Cypher),
            "gremlin" => Ok(QueryType::Gremlin),
            other => Err(AuthzError::UnsupportedQueryType(other.to_string())),
        }
    }
}

/// A resource check ready to hand to the policy engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCheck {
    pub kind: &'static str,
    pub id: &'static str,
    pub action: &'static str,
    pub attributes: Map<String, Value>,
}

/// Merge `query_type`, `query`, the query metadata and the extracted
/// resource attributes into one flat map. Later sources win on key clashes.
pub fn authorization_attributes(query: &str, query_type: QueryType) -> AuthzResult<Map<String, Value>> {
    let mut attributes = Map::new();
    attributes.insert("query_type".to_string(), Value::from(query_type.as_str()));
    attributes.insert("query".to_string(), Value::from(query));

    if query_type == QueryType::Cypher {
        if let Value::Object(metadata) = serde_json::to_value(parse_query_metadata(query))? {
            attributes.extend(metadata);
        }
        attributes.extend(extract_resource_attributes(query).into_json_map());
    }
    Ok(attributes)
}

/// Resource kind, action and attributes for one query
pub fn resource_check(query: &str, query_type: QueryType) -> AuthzResult<ResourceCheck> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AuthzError::EmptyQuery);
    }
    Ok(ResourceCheck {
        kind: query_type.resource_kind(),
        id: GRAPH_QUERY_RESOURCE_ID,
        action: query_type.action(),
        attributes: authorization_attributes(query, query_type)?,
    })
}
