//! Prompt construction for the text generator
//!
//! Only the redacted schema document is ever embedded.

use super::client::CompletionRequest;
use crate::schema::GraphSchema;

/// Validation errors carried into a retry prompt
pub const MAX_RETRY_ERRORS: usize = 8;

const SYSTEM_PROMPT: &str = "You generate a single openCypher (version 9) statement. \
Use ONLY the graph schema provided: vertex labels (graph.vertices[].label), \
edges (graph.edges[].label, fromVertex, toVertex), and vertex attributes \
(oneToOne.attributes, oneToOne.id.fields with alias/field). \
Rules: No space after colon in node labels (e.g. (c:Customer) not (c: Customer)). \
Use only MATCH, RETURN, WHERE, ORDER BY, LIMIT. Integer literals for whole numbers in WHERE. \
Always include LIMIT. For ordering by a risk rating (values may be high/med/low or HIGH/MEDIUM/LOW), \
use ORDER BY CASE upper(trim(toString(var.risk_rating))) WHEN 'HIGH' THEN 3 WHEN 'MEDIUM' THEN 2 \
WHEN 'MED' THEN 2 WHEN 'LOW' THEN 1 ELSE 0 END DESC. \
Output only the Cypher statement, no markdown or explanation.";

const RETRY_SYSTEM_PROMPT: &str = "You generate openCypher (version 9). Use ONLY the provided schema. \
Fix the query so it passes validation. No space after colon in labels. Include LIMIT. \
Output only the Cypher statement, no markdown.";

fn schema_section(schema: &GraphSchema) -> String {
    let document = serde_json::to_string_pretty(&schema.redacted_document()).unwrap_or_default();
    format!("Graph schema (JSON):\n{}\n\nSchema summary:\n{}", document, schema.summary())
}

/// Built-in rules, followed by any configured extra instructions
fn system_message(base: &str, extra: Option<&str>) -> String {
    match extra.map(str::trim).filter(|e| !e.is_empty()) {
        Some(extra) => format!("{}\n\n{}", base, extra),
        None => base.to_string(),
    }
}

/// First attempt
pub fn initial_prompt(question: &str, schema: &GraphSchema, extra: Option<&str>) -> CompletionRequest {
    CompletionRequest {
        system: system_message(SYSTEM_PROMPT, extra),
        user: format!(
            "{}\n\nNatural language question: {}\n\nCypher query:",
            schema_section(schema),
            question
        ),
    }
}

/// Second attempt, carrying the validation errors of the first
pub fn retry_prompt(
    question: &str,
    schema: &GraphSchema,
    errors: &[String],
    extra: Option<&str>,
) -> CompletionRequest {
    let mut user = format!("{}\n\nNatural language question: {}", schema_section(schema), question);
    if errors.is_empty() {
        user.push_str("\n\nCypher query:");
    } else {
        user.push_str("\n\nThe previous Cypher was rejected. Validation errors:\n");
        let bullets: Vec<String> =
            errors.iter().take(MAX_RETRY_ERRORS).map(|e| format!("- {}", e)).collect();
        user.push_str(&bullets.join("\n"));
        user.push_str("\n\nCorrected Cypher query:");
    }
    CompletionRequest { system: system_message(RETRY_SYSTEM_PROMPT, extra), user }
}
