use std::collections::HashMap;
use std::sync::OnceLock;

use askdb_core::{AskDbError, Value};
use regex::Regex;

pub type PromptVars = HashMap<String, Value>;

fn placeholder() -> Result<&'static Regex, AskDbError> {
    static PATTERN: OnceLock<Result<Regex, String>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| AskDbError::InvalidConfig(e.clone()))
}

/// Builds a variable map from `(name, value)` pairs.
pub fn vars<const N: usize>(pairs: [(&str, Value); N]) -> PromptVars {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// `{{ name }}` substitution. String values are inserted verbatim, anything
/// else as compact JSON. Substituted text is never re-scanned.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn placeholders(&self) -> Result<Vec<String>, AskDbError> {
        Ok(placeholder()?
            .captures_iter(&self.template)
            .map(|caps| caps[1].to_string())
            .collect())
    }

    /// Missing variables render as empty text.
    pub fn render(&self, vars: &PromptVars) -> Result<String, AskDbError> {
        let rendered = placeholder()?.replace_all(&self.template, |caps: &regex::Captures| {
            vars.get(&caps[1]).map(value_text).unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }

    /// Fails if any placeholder has no value.
    pub fn render_strict(&self, vars: &PromptVars) -> Result<String, AskDbError> {
        if let Some(missing) = self
            .placeholders()?
            .into_iter()
            .find(|name| !vars.contains_key(name))
        {
            return Err(AskDbError::InvalidConfig(format!(
                "prompt variable '{missing}' has no value"
            )));
        }
        self.render(vars)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
