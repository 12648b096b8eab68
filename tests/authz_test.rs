use cyphergate::authz::{resource_check, AuthzError, QueryType, GRAPH_QUERY_RESOURCE_ID};
use serde_json::json;

#[test]
fn test_cypher_check_for_large_transfers() {
    let query = "MATCH path = (c:Customer)-[:OWNS]->(a:Account)-[:SENT_TXN]->(t:Transaction) \
                 WHERE t.amount > 50000 AND c.pep_flag = true RETURN path LIMIT 20";
    let check = resource_check(query, QueryType::Cypher).unwrap();

    assert_eq!(check.kind, "cypher_query");
    assert_eq!(check.id, GRAPH_QUERY_RESOURCE_ID);
    assert_eq!(check.action, "execute");

    let attrs = &check.attributes;
    assert_eq!(attrs["query_type"], json!("cypher"));
    assert_eq!(attrs["query"], json!(query));
    assert_eq!(attrs["node_labels"], json!(["Account", "Customer", "Transaction"]));
    assert_eq!(attrs["relationship_types"], json!(["OWNS", "SENT_TXN"]));
    assert_eq!(attrs["max_depth"], json!(2));
    assert_eq!(attrs["query_pattern"], json!("path"));
    assert_eq!(attrs["path_variables"], json!(["path"]));
    assert_eq!(attrs["transaction_amount_min"], json!(50000.0));
    assert_eq!(attrs["pep_flag"], json!(true));
    assert!(attrs.values().all(|v| !v.is_null()));
}

#[test]
fn test_query_is_trimmed_before_analysis() {
    let check = resource_check("  MATCH (a:Alert) RETURN a  ", QueryType::Cypher).unwrap();
    assert_eq!(check.attributes["query"], json!("MATCH (a:Alert) RETURN a"));
}

#[test]
fn test_gremlin_check_carries_only_text() {
    let check = resource_check("g.V().hasLabel('Alert').out('ESCALATED_TO')", QueryType::Gremlin).unwrap();
    assert_eq!(check.kind, "transaction");
    assert_eq!(check.action, "graph_expand");
    assert_eq!(
        serde_json::to_value(&check.attributes).unwrap(),
        json!({
            "query_type": "gremlin",
            "query": "g.V().hasLabel('Alert').out('ESCALATED_TO')"
        })
    );
}

#[test]
fn test_check_serializes_for_policy_engine() {
    let check = resource_check("MATCH (c:Case) RETURN c", QueryType::Cypher).unwrap();
    let value = serde_json::to_value(&check).unwrap();
    assert_eq!(value["kind"], json!("cypher_query"));
    assert_eq!(value["id"], json!("graph-query"));
    assert_eq!(value["attributes"]["node_labels"], json!(["Case"]));
}

#[test]
fn test_rejected_inputs() {
    assert!(matches!(resource_check("", QueryType::Gremlin), Err(AuthzError::EmptyQuery)));
    let err = "sparql".parse::<QueryType>().unwrap_err();
    assert_eq!(err.to_string(), "Query type must be 'cypher' or 'gremlin', got 'sparql'");
}
