//! Candidate statement extraction from free-form generator output

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[A-Za-z0-9_-]*[ \t]*\r?\n)?(.*?)```").expect("valid fence regex")
});

static MATCH_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)MATCH ").expect("valid match regex"));

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\r?\n").expect("valid blank line regex"));

static SPACE_AFTER_COLON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid colon regex")
});

static WHOLE_NUMBER_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([<>]=?|=)\s*(\d+)\.0+\b").expect("valid float literal regex")
});

/// Pull one Cypher statement out of a response.
///
/// Tried in order: a fenced code block mentioning MATCH or RETURN, the first
/// line starting with `MATCH `/`RETURN ` up to the next fence or blank line,
/// then everything from the first `MATCH ` up to the next fence.
pub fn extract_cypher(response: &str) -> Option<String> {
    let text = response.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(block) = FENCED_BLOCK.captures(text).and_then(|caps| caps.get(1)) {
        let candidate = normalize_cypher(block.as_str().trim());
        let upper = candidate.to_uppercase();
        if upper.contains("MATCH") || upper.contains("RETURN") {
            return Some(candidate);
        }
    }

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let upper = trimmed.to_uppercase();
        if upper.starts_with("MATCH ") || upper.starts_with("RETURN ") {
            let start = offset + (line.len() - trimmed.len());
            let mut block = &text[start..];
            if let Some(end) = BLANK_LINE.find(block) {
                block = &block[..end.start()];
            }
            if let Some(candidate) = until_fence(block) {
                return Some(candidate);
            }
        }
        offset += line.len();
    }

    MATCH_ANYWHERE.find(text).and_then(|m| until_fence(&text[m.start()..]))
}

fn until_fence(block: &str) -> Option<String> {
    let block = block.split("```").next().unwrap_or_default().trim();
    (!block.is_empty()).then(|| normalize_cypher(block))
}

/// Remove whitespace between a colon and an identifier and rewrite
/// whole-number float comparisons (`> 50000.0` becomes `> 50000`).
pub fn normalize_cypher(cypher: &str) -> String {
    if cypher.trim().is_empty() {
        return cypher.to_string();
    }
    let compact = SPACE_AFTER_COLON.replace_all(cypher, ":${1}");
    WHOLE_NUMBER_FLOAT.replace_all(&compact, "${1} ${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let response = "Here you go:\n```cypher\nMATCH (c: Customer) RETURN c LIMIT 5\n```\nThanks";
        assert_eq!(
            extract_cypher(response).as_deref(),
            Some("MATCH (c:Customer) RETURN c LIMIT 5")
        );
    }

    #[test]
    fn test_any_fence_language_tag_is_dropped() {
        for tag in ["sql", "cql", "opencypher", "Cypher", ""] {
            let response = format!("```{}\nMATCH (c:Customer) RETURN c.name LIMIT 5\n```", tag);
            assert_eq!(
                extract_cypher(&response).as_deref(),
                Some("MATCH (c:Customer) RETURN c.name LIMIT 5"),
                "tag {:?}",
                tag
            );
        }
        assert_eq!(
            extract_cypher("```MATCH (a:Account) RETURN a```").as_deref(),
            Some("MATCH (a:Account) RETURN a")
        );
    }

    #[test]
    fn test_fence_without_cypher_falls_through() {
        let response = "```\nno query here\n```\nMATCH (a:Account) RETURN a";
        assert_eq!(extract_cypher(response).as_deref(), Some("MATCH (a:Account) RETURN a"));
    }

    #[test]
    fn test_first_statement_line_until_blank() {
        let response = "The query is\nMATCH (t:Transaction)\nWHERE t.amount > 50000.0\nRETURN t\n\nThis finds large transfers.";
        assert_eq!(
            extract_cypher(response).as_deref(),
            Some("MATCH (t:Transaction)\nWHERE t.amount > 50000\nRETURN t")
        );
    }

    #[test]
    fn test_match_inside_prose() {
        let response = "Try this: match (c:Customer) return c";
        assert_eq!(extract_cypher(response).as_deref(), Some("match (c:Customer) return c"));
    }

    #[test]
    fn test_no_statement() {
        assert!(extract_cypher("I cannot help with that.").is_none());
        assert!(extract_cypher("   ").is_none());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = "MATCH (t: Transaction) WHERE t.amount >= 1000.00 AND t.amount < 20.5 RETURN t";
        let once = normalize_cypher(raw);
        assert_eq!(
            once,
            "MATCH (t:Transaction) WHERE t.amount >= 1000 AND t.amount < 20.5 RETURN t"
        );
        assert_eq!(normalize_cypher(&once), once);
    }
}
