//! Schema sources injected into the pipeline

use super::{GraphSchema, SchemaResult};
use std::path::PathBuf;

/// Supplies the schema for one translation call
pub trait SchemaProvider: Send + Sync {
    fn load(&self) -> SchemaResult<GraphSchema>;
}

impl SchemaProvider for GraphSchema {
    fn load(&self) -> SchemaResult<GraphSchema> {
        Ok(self.clone())
    }
}

/// Re-reads a schema file on every call; nothing is cached between requests
#[derive(Debug, Clone)]
pub struct SchemaFile {
    path: PathBuf,
}

impl SchemaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SchemaProvider for SchemaFile {
    fn load(&self) -> SchemaResult<GraphSchema> {
        GraphSchema::from_path(&self.path)
    }
}
