//! Rule-based Cypher generation from an analysis result

use super::analyzer::{AnalysisResult, SortDirection};
use super::chain::{build_path_chain, PathSegment};
use crate::schema::GraphSchema;
use indexmap::IndexMap;

pub const DEFAULT_LIMIT: usize = 25;

/// Attributes projected per returned vertex
const RETURN_ATTRIBUTES: usize = 5;

/// Returned when the schema has no vertices at all
pub const EMPTY_SCHEMA_QUERY: &str = "MATCH (n) RETURN n LIMIT 0";

/// Variable names: first lowercase letter of the label plus its ordinal
#[derive(Default)]
struct Variables(IndexMap<String, String>);

impl Variables {
    fn var_for(&mut self, label: &str) -> String {
        let next = self.0.len();
        self.0
            .entry(label.to_string())
            .or_insert_with(|| {
                let initial = label.chars().next().map(|c| c.to_ascii_lowercase()).unwrap_or('n');
                format!("{}{}", initial, next)
            })
            .clone()
    }

    fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }
}

/// Render a MATCH/WHERE/RETURN/ORDER BY/LIMIT statement for `analysis`
pub fn generate_cypher(analysis: &AnalysisResult, schema: &GraphSchema) -> String {
    let chain = match build_path_chain(
        &analysis.entities,
        &analysis.relationships,
        schema.edges_by_label(),
    ) {
        Some(chain) => chain,
        None => {
            let default = analysis
                .entities
                .first()
                .map(String::as_str)
                .or_else(|| schema.sorted_vertex_labels().first().copied());
            match default {
                Some(label) => vec![PathSegment::vertex(label)],
                None => return EMPTY_SCHEMA_QUERY.to_string(),
            }
        }
    };

    let mut vars = Variables::default();
    let mut pattern = String::new();
    for segment in &chain {
        if segment.is_vertex() {
            let var = vars.var_for(&segment.from);
            pattern.push_str(&format!("({}:{})", var, segment.from));
        } else {
            let from = vars.var_for(&segment.from);
            let to = vars.var_for(&segment.to);
            if pattern.is_empty() {
                pattern.push_str(&format!("({}:{})", from, segment.from));
            }
            pattern.push_str(&format!("-[:{}]->({}:{})", segment.edge, to, segment.to));
        }
    }

    let projection = |vars: &mut Variables, label: &str| -> Vec<String> {
        let var = vars.var_for(label);
        let attrs = schema.attribute_names(label);
        if attrs.is_empty() {
            vec![var]
        } else {
            attrs.iter().take(RETURN_ATTRIBUTES).map(|a| format!("{}.{}", var, a)).collect()
        }
    };

    let returns: Vec<String> = match chain.as_slice() {
        [only] if !only.is_vertex() => {
            let mut parts = projection(&mut vars, &only.from);
            // A self-loop binds one variable; project it once
            if only.to != only.from {
                parts.extend(projection(&mut vars, &only.to));
            }
            parts
        }
        [.., last] => {
            let terminal = if last.is_vertex() { &last.from } else { &last.to };
            projection(&mut vars, terminal)
        }
        [] => Vec::new(),
    };

    let where_clause = analysis
        .amount_filter
        .as_ref()
        .and_then(|filter| {
            let var = vars.get(&filter.vertex)?;
            schema.vertex(&filter.vertex)?.has_attribute(&filter.attribute).then(|| {
                format!(
                    " WHERE {}.{} {} {}",
                    var,
                    filter.attribute,
                    filter.operator,
                    format_number(filter.value)
                )
            })
        })
        .unwrap_or_default();

    let order_clause = analysis
        .order_by
        .as_ref()
        .and_then(|order| {
            let var = vars.get(&order.vertex)?;
            schema
                .vertex(&order.vertex)?
                .has_attribute(&order.attribute)
                .then(|| order_expression(var, &order.attribute, order.direction))
        })
        .unwrap_or_default();

    let limit = analysis.limit.filter(|n| *n > 0).unwrap_or(DEFAULT_LIMIT);

    format!(
        "MATCH {}{}\nRETURN {}{} LIMIT {}",
        pattern,
        where_clause,
        returns.join(", "),
        order_clause,
        limit
    )
}

/// Whole numbers render without a decimal point
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// ORDER BY clause; risk-style attributes sort by severity rather than text
fn order_expression(var: &str, attr: &str, direction: SortDirection) -> String {
    if attr.to_lowercase().contains("risk") {
        format!(
            "\nORDER BY CASE upper(trim(toString({}.{}))) WHEN 'HIGH' THEN 3 WHEN 'MEDIUM' THEN 2 \
             WHEN 'MED' THEN 2 WHEN 'LOW' THEN 1 ELSE 0 END {}",
            var, attr, direction
        )
    } else {
        format!("\nORDER BY {}.{} {}", var, attr, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlq::analyzer::{analyze, AmountFilter, ComparisonOp, OrderBy};
    use crate::schema::aml_schema;

    #[test]
    fn test_single_vertex_query() {
        let schema = aml_schema();
        let analysis = analyze("list all cases", &schema);
        assert_eq!(
            generate_cypher(&analysis, &schema),
            "MATCH (c0:Case)\nRETURN c0.case_id, c0.status, c0.opened_at LIMIT 25"
        );
    }

    #[test]
    fn test_single_edge_returns_both_endpoints() {
        let schema = aml_schema();
        let analysis = AnalysisResult {
            relationships: vec!["OWNS".to_string()],
            limit: Some(10),
            ..Default::default()
        };
        let cypher = generate_cypher(&analysis, &schema);
        assert_eq!(
            cypher,
            "MATCH (c0:Customer)-[:OWNS]->(a1:Account)\n\
             RETURN c0.customer_id, c0.name, c0.risk_rating, c0.pep_flag, c0.team, \
             a1.account_id, a1.customer_id, a1.account_type, a1.balance, a1.status LIMIT 10"
        );
    }

    #[test]
    fn test_self_loop_projects_once() {
        let schema = GraphSchema::from_json_str(
            r#"{"graph": {
                "vertices": [{"label": "Account", "oneToOne": {"attributes": [{"field": "iban"}]}}],
                "edges": [{"label": "TRANSFERS_TO", "fromVertex": "Account", "toVertex": "Account"}]
            }}"#,
        )
        .unwrap();
        let analysis = AnalysisResult {
            relationships: vec!["TRANSFERS_TO".to_string()],
            ..Default::default()
        };
        assert_eq!(
            generate_cypher(&analysis, &schema),
            "MATCH (a0:Account)-[:TRANSFERS_TO]->(a0:Account)
RETURN a0.iban LIMIT 25"
        );
    }

    #[test]
    fn test_threshold_filter_rendered_as_integer() {
        let schema = aml_schema();
        let analysis = analyze("transactions over 50000", &schema);
        let cypher = generate_cypher(&analysis, &schema);
        assert!(cypher.starts_with("MATCH (t0:Transaction) WHERE t0.amount > 50000\n"));
        assert!(cypher.ends_with(" LIMIT 25"));
    }

    #[test]
    fn test_filter_outside_chain_is_ignored() {
        let schema = aml_schema();
        let analysis = AnalysisResult {
            entities: vec!["Case".to_string()],
            amount_filter: Some(AmountFilter {
                attribute: "amount".to_string(),
                operator: ComparisonOp::GreaterThan,
                value: 10.0,
                vertex: "Transaction".to_string(),
            }),
            ..Default::default()
        };
        assert!(!generate_cypher(&analysis, &schema).contains("WHERE"));
    }

    #[test]
    fn test_risk_ordering_uses_case_expression() {
        let schema = aml_schema();
        let analysis = AnalysisResult {
            entities: vec!["Customer".to_string()],
            order_by: Some(OrderBy {
                vertex: "Customer".to_string(),
                attribute: "risk_rating".to_string(),
                direction: SortDirection::Desc,
            }),
            limit: Some(10),
            ..Default::default()
        };
        let cypher = generate_cypher(&analysis, &schema);
        assert!(cypher.contains(
            "\nORDER BY CASE upper(trim(toString(c0.risk_rating))) WHEN 'HIGH' THEN 3 \
             WHEN 'MEDIUM' THEN 2 WHEN 'MED' THEN 2 WHEN 'LOW' THEN 1 ELSE 0 END DESC LIMIT 10"
        ));
    }

    #[test]
    fn test_default_vertex_and_empty_schema() {
        let schema = aml_schema();
        let cypher = generate_cypher(&AnalysisResult::default(), &schema);
        assert!(cypher.starts_with("MATCH (a0:Account)\n"));

        let empty = GraphSchema::from_json_str(r#"{"graph": {"vertices": [], "edges": []}}"#).unwrap();
        assert_eq!(generate_cypher(&AnalysisResult::default(), &empty), EMPTY_SCHEMA_QUERY);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(50000.0), "50000");
        assert_eq!(format_number(99.5), "99.5");
    }
}
