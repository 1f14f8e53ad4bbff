use std::collections::HashMap;

use serde::Deserialize;

use super::TerraformError;

/// One entry of `terraform output -json` without a name argument.
#[derive(Debug, Deserialize)]
struct OutputEntry {
    value: serde_json::Value,
}

/// Renders an output value the way scenario checks compare it: strings
/// unquoted, everything else as compact JSON.
pub fn materialize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses the stdout of `output -json <name>`.
pub fn parse_single(name: &str, stdout: &str) -> Result<String, TerraformError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).map_err(|e| TerraformError::OutputParse {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(materialize(&value))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSet {
    values: HashMap<String, String>,
}

impl OutputSet {
    /// Parses the stdout of `output -json`.
    pub fn from_json(stdout: &str) -> Result<Self, TerraformError> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let entries: HashMap<String, OutputEntry> =
            serde_json::from_str(trimmed).map_err(|e| TerraformError::OutputParse {
                name: "*".to_string(),
                message: e.to_string(),
            })?;

        let values = entries
            .into_iter()
            .map(|(name, entry)| (name, materialize(&entry.value)))
            .collect();

        Ok(Self { values })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Like [`get`](Self::get), but an absent or empty value is an error.
    pub fn require(&self, name: &str) -> Result<&str, TerraformError> {
        self.get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TerraformError::OutputMissing {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for OutputSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
