use cyphergate::cypher::{extract_node_labels, extract_relationship_types};
use cyphergate::nlq::{analyze, generate_cypher, rule_based_translation, validate_cypher, QuerySource};
use cyphergate::schema::GraphSchema;

fn aml_schema() -> GraphSchema {
    GraphSchema::from_json_str(include_str!("../schemas/aml-schema.json")).unwrap()
}

#[test]
fn test_owners_of_large_accounts() {
    let schema = aml_schema();
    let (query, analysis) = rule_based_translation("show customers who own accounts over 10000", &schema);

    assert_eq!(analysis.entities, vec!["Customer", "Account"]);
    assert!(analysis.relationships.is_empty());
    assert_eq!(
        query.text,
        "MATCH (c0:Customer)-[:OWNS]->(a1:Account) WHERE a1.balance > 10000\n\
         RETURN c0.customer_id, c0.name, c0.risk_rating, c0.pep_flag, c0.team, \
         a1.account_id, a1.customer_id, a1.account_type, a1.balance, a1.status LIMIT 25"
    );
    assert!(query.valid, "{:?}", query.errors);
    assert_eq!(query.source, QuerySource::RuleBased);
}

#[test]
fn test_riskiest_customers() {
    let schema = aml_schema();
    let (query, _) = rule_based_translation("top 10 customers by risk", &schema);
    assert_eq!(
        query.text,
        "MATCH (c0:Customer)\n\
         RETURN c0.customer_id, c0.name, c0.risk_rating, c0.pep_flag, c0.team\n\
         ORDER BY CASE upper(trim(toString(c0.risk_rating))) WHEN 'HIGH' THEN 3 WHEN 'MEDIUM' THEN 2 \
         WHEN 'MED' THEN 2 WHEN 'LOW' THEN 1 ELSE 0 END DESC LIMIT 10"
    );
    assert!(query.valid, "{:?}", query.errors);
}

#[test]
fn test_multi_hop_chain_returns_terminal_vertex() {
    let schema = aml_schema();
    let analysis = analyze("customer owns account sent txn transaction", &schema);
    assert_eq!(analysis.relationships, vec!["SENT_TXN", "OWNS"]);

    let cypher = generate_cypher(&analysis, &schema);
    assert_eq!(
        cypher,
        "MATCH (c0:Customer)-[:OWNS]->(a1:Account)-[:SENT_TXN]->(t2:Transaction)\n\
         RETURN t2.txn_id, t2.from_account_id, t2.to_account_id, t2.amount, t2.currency LIMIT 25"
    );
    assert!(validate_cypher(&cypher, &schema).valid);
}

#[test]
fn test_unrecognised_text_uses_first_label() {
    let schema = aml_schema();
    let (query, analysis) = rule_based_translation("hello there", &schema);
    assert!(analysis.is_empty());
    assert_eq!(
        query.text,
        "MATCH (a0:Account)\n\
         RETURN a0.account_id, a0.customer_id, a0.account_type, a0.balance, a0.status LIMIT 25"
    );
    assert!(query.valid);
}

#[test]
fn test_generic_schema_without_domain_words() {
    let schema = GraphSchema::from_json_str(
        r#"{"graph": {
            "vertices": [
                {"label": "Sensor", "oneToOne": {
                    "id": {"fields": [{"field": "sensor_id"}]},
                    "attributes": [{"field": "reading", "type": "Float"}, {"field": "site"}]
                }},
                {"label": "Site", "oneToOne": {
                    "id": {"fields": [{"field": "site_id"}]},
                    "attributes": [{"field": "city"}]
                }}
            ],
            "edges": [{"label": "LOCATED_AT", "fromVertex": "Sensor", "toVertex": "Site"}]
        }}"#,
    )
    .unwrap();

    let (query, analysis) = rule_based_translation("sensors below 3.5", &schema);
    let filter = analysis.amount_filter.unwrap();
    assert_eq!((filter.vertex.as_str(), filter.attribute.as_str()), ("Sensor", "reading"));
    assert!(query.text.starts_with("MATCH (s0:Sensor) WHERE s0.reading < 3.5\n"));
    assert!(query.valid, "{:?}", query.errors);
}

#[test]
fn test_valid_rule_based_queries_only_use_schema_names() {
    let schema = aml_schema();
    let questions = [
        "list all cases",
        "alerts escalated to a case",
        "which alerts flag customers",
        "transactions over 250,000 dollars",
        "first 5 accounts ordered by balance descending",
        "customer owns account sent txn transaction to account",
        "top 3 customers by risk in the north team",
        "show me everything",
        "Alert",
    ];

    for question in questions {
        let (query, _) = rule_based_translation(question, &schema);
        assert!(query.valid, "{}: {:?}", question, query.errors);
        for label in extract_node_labels(&query.text) {
            assert!(schema.has_vertex(&label), "{}: unknown label {}", question, label);
        }
        for rel in extract_relationship_types(&query.text) {
            assert!(schema.edge(&rel).is_some(), "{}: unknown relationship {}", question, rel);
        }
        assert!(query.text.contains(" LIMIT "), "{}", question);
    }
}

#[test]
fn test_keyword_shaped_label_is_readable() {
    let schema = GraphSchema::from_json_str(
        r#"{"graph": {"vertices": [
            {"label": "Call", "oneToOne": {"attributes": [{"field": "duration", "type": "Int"}]}}
        ], "edges": []}}"#,
    )
    .unwrap();

    let (query, analysis) = rule_based_translation("list calls", &schema);
    assert_eq!(analysis.entities, vec!["Call"]);
    assert_eq!(query.text, "MATCH (c0:Call)\nRETURN c0.duration LIMIT 25");
    assert!(query.valid, "{:?}", query.errors);
}
