use std::fs;
use std::path::Path;

use serde_json::Value;

use dcimsync_engine::{DocumentLoader, LoadError};

/// Reads YAML definition files into JSON values.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlLoader;

impl DocumentLoader for YamlLoader {
    fn load(&self, path: &Path) -> Result<Value, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        parse_document(&content).map_err(|message| LoadError::parse(path, message))
    }
}

/// Parse YAML text. Blank input yields `Value::Null`.
pub fn parse_document(content: &str) -> Result<Value, String> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string())
}
