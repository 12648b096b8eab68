//! Cyphergate CLI: translate questions to Cypher and inspect queries
//!
//! Schemas are read from disk on every invocation; nothing is cached.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use cyphergate::authz::{resource_check, QueryType};
use cyphergate::cypher::{extract_resource_attributes, parse_query_metadata};
use cyphergate::nlq::{rule_based_translation, validate_cypher, NLQPipeline, Translation};
use cyphergate::schema::{GraphSchema, SchemaFile, SchemaProvider};
use cyphergate::NLQConfig;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cyphergate", version, about = "Natural-language to Cypher translation")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum QueryKind {
    Cypher,
    Gremlin,
}

impl From<QueryKind> for QueryType {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Cypher => QueryType::Cypher,
            QueryKind::Gremlin => QueryType::Gremlin,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a question into Cypher (LLM with rule-based fallback)
    Translate {
        /// The natural-language question
        question: String,

        /// Graph schema file (.json, .yaml, .yml)
        #[arg(long, env = "CYPHERGATE_SCHEMA")]
        schema: PathBuf,

        /// NLQ config file; falls back to OPENAI_* environment variables
        #[arg(long, env = "CYPHERGATE_NLQ_CONFIG")]
        config: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
    /// Run only the rule-based analyzer and generator
    Analyze {
        question: String,

        #[arg(long, env = "CYPHERGATE_SCHEMA")]
        schema: PathBuf,
    },
    /// Validate a Cypher statement against a schema
    Validate {
        cypher: String,

        #[arg(long, env = "CYPHERGATE_SCHEMA")]
        schema: PathBuf,
    },
    /// Show structural metadata of a Cypher query
    Parse { query: String },
    /// Show ABAC resource attributes of a Cypher query
    Attributes { query: String },
    /// Show the policy resource check for a query
    Authz {
        query: String,

        #[arg(long = "type", value_enum, default_value = "cypher")]
        query_type: QueryKind,
    },
    /// Print a schema with credentials redacted
    Redact {
        schema: PathBuf,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Translate { question, schema, config, timeout_secs } => {
            run_translate(&question, schema, config, timeout_secs, &cli.format).await
        }
        Commands::Analyze { question, schema } => run_analyze(&question, schema, &cli.format),
        Commands::Validate { cypher, schema } => run_validate(&cypher, schema, &cli.format),
        Commands::Parse { query } => run_parse(&query, &cli.format),
        Commands::Attributes { query } => run_attributes(&query, &cli.format),
        Commands::Authz { query, query_type } => run_authz(&query, query_type.into(), &cli.format),
        Commands::Redact { schema, compact } => run_redact(schema, compact),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_schema(path: PathBuf) -> anyhow::Result<GraphSchema> {
    let provider = SchemaFile::new(path);
    provider
        .load()
        .with_context(|| format!("loading schema {}", provider.path().display()))
}

async fn run_translate(
    question: &str,
    schema: PathBuf,
    config: Option<PathBuf>,
    timeout_secs: u64,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let pipeline = match config {
        Some(path) => NLQPipeline::new(NLQConfig::from_path(&path)?)?,
        None => NLQPipeline::from_env()?,
    };
    let provider = SchemaFile::new(schema);

    let translation = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        pipeline.translate_with(question, &provider),
    )
    .await
    .with_context(|| format!("translation timed out after {}s", timeout_secs))??;

    print_translation(&translation, format)?;
    if !translation.query.valid {
        bail!("no valid Cypher produced");
    }
    Ok(())
}

fn print_translation(translation: &Translation, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(translation)?),
        OutputFormat::Table => {
            let query = &translation.query;
            println!("{}", query.text);
            println!();
            let mut table = new_table(&["Field", "Value"]);
            table.add_row(vec!["source".to_string(), query.source.to_string()]);
            table.add_row(vec!["valid".to_string(), query.valid.to_string()]);
            table.add_row(vec!["llm_calls".to_string(), translation.llm_calls.to_string()]);
            for error in &query.errors {
                table.add_row(vec!["error".to_string(), error.clone()]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn run_analyze(question: &str, schema: PathBuf, format: &OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(schema)?;
    let (query, analysis) = rule_based_translation(question, &schema);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "analysis": analysis, "query": query });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let Value::Object(fields) = serde_json::to_value(&analysis)? else {
                bail!("analysis did not serialize to an object");
            };
            print_map(&fields);
            println!("{}", query.text);
            for error in &query.errors {
                println!("error: {}", error);
            }
        }
    }
    Ok(())
}

fn run_validate(cypher: &str, schema: PathBuf, format: &OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(schema)?;
    let report = validate_cypher(cypher, &schema);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            if report.valid {
                println!("valid");
            } else {
                let mut table = new_table(&["Error"]);
                for error in &report.errors {
                    table.add_row(vec![error.clone()]);
                }
                println!("{}", table);
            }
        }
    }
    if !report.valid {
        bail!("{} validation error(s)", report.errors.len());
    }
    Ok(())
}

fn run_parse(query: &str, format: &OutputFormat) -> anyhow::Result<()> {
    let Value::Object(fields) = serde_json::to_value(parse_query_metadata(query))? else {
        bail!("metadata did not serialize to an object");
    };
    print_fields(fields, format)
}

fn run_attributes(query: &str, format: &OutputFormat) -> anyhow::Result<()> {
    let attributes = extract_resource_attributes(query);
    if attributes.is_empty() && matches!(format, OutputFormat::Table) {
        println!("(no attributes)");
        return Ok(());
    }
    print_fields(attributes.into_json_map(), format)
}

fn run_authz(query: &str, query_type: QueryType, format: &OutputFormat) -> anyhow::Result<()> {
    let check = resource_check(query, query_type)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&check)?),
        OutputFormat::Table => {
            println!("Resource: {} ({})", check.kind, check.id);
            println!("Action:   {}", check.action);
            print_map(&check.attributes);
        }
    }
    Ok(())
}

fn run_redact(schema: PathBuf, compact: bool) -> anyhow::Result<()> {
    let schema = load_schema(schema)?;
    let redacted = schema.redacted_document();
    if compact {
        println!("{}", serde_json::to_string(&redacted)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&redacted)?);
    }
    Ok(())
}

fn print_fields(fields: Map<String, Value>, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&Value::Object(fields))?),
        OutputFormat::Table => print_map(&fields),
    }
    Ok(())
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}

fn print_map(fields: &Map<String, Value>) {
    let mut table = new_table(&["Attribute", "Value"]);
    for (key, value) in fields {
        table.add_row(vec![key.clone(), format_table_value(value)]);
    }
    println!("{}", table);
}

fn format_table_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items.iter().map(format_table_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
