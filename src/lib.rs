//! Cyphergate
//!
//! Natural-language to openCypher translation over a property-graph view of
//! relational data, with schema validation and extraction of the
//! authorization attributes a policy engine needs before a query runs.
//!
//! # Components
//!
//! - [`schema`]: graph schema model, credential redaction, schema providers
//! - [`cypher`]: regex-based query metadata and resource attribute extraction
//! - [`nlq`]: analyzer, path chain builder, rule-based generator, validator
//!   and the generate → validate → retry → fallback pipeline
//! - [`authz`]: flat attribute maps for policy decisions
//! - [`config`]: text-generation configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use cyphergate::cypher::{extract_node_labels, extract_resource_attributes};
//! use cyphergate::nlq::rule_based_translation;
//! use cyphergate::schema::GraphSchema;
//!
//! let schema = GraphSchema::from_json_str(r#"{
//!     "graph": {
//!         "vertices": [{
//!             "label": "Transaction",
//!             "oneToOne": {
//!                 "id": { "fields": [{ "field": "txn_id", "type": "Int" }] },
//!                 "attributes": [{ "field": "amount", "type": "Decimal" }]
//!             }
//!         }],
//!         "edges": []
//!     }
//! }"#).unwrap();
//!
//! let (query, _analysis) = rule_based_translation("transactions over 50000", &schema);
//! assert!(query.valid);
//! assert_eq!(
//!     query.text,
//!     "MATCH (t0:Transaction) WHERE t0.amount > 50000\nRETURN t0.txn_id, t0.amount LIMIT 25"
//! );
//!
//! let labels = extract_node_labels(&query.text);
//! assert!(labels.contains("Transaction"));
//!
//! let attributes = extract_resource_attributes(&query.text);
//! assert_eq!(attributes.get("transaction_amount_min").and_then(|v| v.as_f64()), Some(50000.0));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod authz;
pub mod config;
pub mod cypher;
pub mod nlq;
pub mod schema;

// Re-export main types for convenience
pub use authz::{authorization_attributes, resource_check, AuthzError, QueryType, ResourceCheck};
pub use config::{LLMProvider, NLQConfig};
pub use cypher::{
    extract_resource_attributes, parse_query_metadata, AttributeValue, QueryMetadata,
    QueryPattern, ResourceAttributes,
};
pub use nlq::{
    GeneratedQuery, NLQError, NLQPipeline, NLQResult, QuerySource, TextGenerator, Translation,
};
pub use schema::{GraphSchema, SchemaError, SchemaFile, SchemaProvider, SchemaResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
