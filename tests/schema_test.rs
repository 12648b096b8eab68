use cyphergate::schema::{
    redact_for_external_use, GraphSchema, SchemaError, SchemaFile, SchemaProvider,
    REDACTED_PLACEHOLDER,
};
use serde_json::{json, Value};
use std::io::Write;

const AML_SCHEMA: &str = include_str!("../schemas/aml-schema.json");

const YAML_SCHEMA: &str = r#"
catalogs:
  - name: warehouse
    jdbc:
      username: reader
      password: hunter2
graph:
  vertices:
    - label: Customer
      oneToOne:
        id:
          fields:
            - field: customer_id
        attributes:
          - field: risk_rating
          - field: credit_limit
            type: Decimal
  edges: []
"#;

#[test]
fn test_load_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(AML_SCHEMA.as_bytes()).unwrap();

    let schema = GraphSchema::from_path(file.path()).unwrap();
    assert_eq!(schema.vertices().len(), 5);
    assert_eq!(schema.edges_by_label().len(), 6);
}

#[test]
fn test_load_yaml_file_with_default_types() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(YAML_SCHEMA.as_bytes()).unwrap();

    let schema = GraphSchema::from_path(file.path()).unwrap();
    let customer = schema.vertex("Customer").unwrap();
    let types: Vec<(&str, &str)> = customer
        .attributes
        .iter()
        .map(|a| (a.name.as_str(), a.data_type.as_str()))
        .collect();
    assert_eq!(
        types,
        vec![("customer_id", "Int"), ("risk_rating", "String"), ("credit_limit", "Decimal")]
    );
    assert_eq!(
        schema.numeric_attributes(),
        vec![("Customer", "customer_id"), ("Customer", "credit_limit")]
    );
}

#[test]
fn test_missing_graph_is_invalid() {
    let err = GraphSchema::from_json_str(r#"{"catalogs": []}"#).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDocument(_)));
}

#[test]
fn test_incomplete_definitions_skipped() {
    let schema = GraphSchema::from_document(json!({
        "graph": {
            "vertices": [{"label": "A"}, {"oneToOne": {}}],
            "edges": [
                {"label": "A_TO_A", "fromVertex": "A", "toVertex": "A"},
                {"label": "DANGLING", "fromVertex": "A"}
            ]
        }
    }))
    .unwrap();
    assert_eq!(schema.sorted_vertex_labels(), vec!["A"]);
    assert_eq!(schema.sorted_edge_labels(), vec!["A_TO_A"]);
}

#[test]
fn test_schema_file_rereads_on_every_load() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"graph": {"vertices": [{"label": "A"}], "edges": []}}"#).unwrap();
    file.flush().unwrap();

    let provider = SchemaFile::new(file.path());
    assert!(provider.load().unwrap().has_vertex("A"));

    std::fs::write(file.path(), r#"{"graph": {"vertices": [{"label": "B"}], "edges": []}}"#)
        .unwrap();
    let reloaded = provider.load().unwrap();
    assert!(reloaded.has_vertex("B"));
    assert!(!reloaded.has_vertex("A"));
}

#[test]
fn test_redaction_replaces_credentials_at_any_depth() {
    let schema = GraphSchema::from_json_str(AML_SCHEMA).unwrap();
    let redacted = schema.redacted_document();
    let jdbc = &redacted["catalogs"][0]["jdbc"];
    assert_eq!(jdbc["username"], json!(REDACTED_PLACEHOLDER));
    assert_eq!(jdbc["password"], json!(REDACTED_PLACEHOLDER));
    assert_eq!(jdbc["jdbcUri"], json!(REDACTED_PLACEHOLDER));

    let text = serde_json::to_string(&redacted).unwrap();
    assert!(!text.contains("s3cr3t-pa55"));
    assert!(!text.contains("aml_reader"));

    // Source document untouched
    assert_eq!(schema.document()["catalogs"][0]["jdbc"]["password"], json!("s3cr3t-pa55"));
}

#[test]
fn test_redaction_preserves_everything_else() {
    let original: Value = serde_json::from_str(AML_SCHEMA).unwrap();
    let mut redacted = redact_for_external_use(&original);
    assert_eq!(redacted["graph"], original["graph"]);

    assert_eq!(redacted["catalogs"][0]["jdbc"]["driverClass"], json!("org.postgresql.Driver"));

    // Restoring the redacted values gives back the original exactly
    for key in ["username", "password", "jdbcUri"] {
        redacted["catalogs"][0]["jdbc"][key] = original["catalogs"][0]["jdbc"][key].clone();
    }
    assert_eq!(
        serde_json::to_string(&redacted).unwrap(),
        serde_json::to_string(&original).unwrap()
    );
}

#[test]
fn test_redaction_matches_keys_case_insensitively() {
    let doc = json!({
        "auth": {"API_KEY": "k", "Token": "t", "Credentials": {"nested": "x"}, "Secret": 1},
        "list": [{"apiKey": "k2", "keep": "yes"}]
    });
    let redacted = redact_for_external_use(&doc);
    assert_eq!(
        redacted,
        json!({
            "auth": {
                "API_KEY": REDACTED_PLACEHOLDER,
                "Token": REDACTED_PLACEHOLDER,
                "Credentials": REDACTED_PLACEHOLDER,
                "Secret": REDACTED_PLACEHOLDER
            },
            "list": [{"apiKey": REDACTED_PLACEHOLDER, "keep": "yes"}]
        })
    );
}

#[test]
fn test_summary_lists_edges_and_types() {
    let schema = GraphSchema::from_json_str(AML_SCHEMA).unwrap();
    let summary = schema.summary();
    assert!(summary.contains("  SENT_TXN: (Account)-[:SENT_TXN]->(Transaction)"));
    assert!(summary.contains("amount(Decimal)"));
    assert!(!summary.contains("s3cr3t"));
}
