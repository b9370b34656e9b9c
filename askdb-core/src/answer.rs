use std::collections::BTreeMap;

use serde_json::Map;

use crate::{AskDbError, Value};

pub type TableColumns = BTreeMap<String, Vec<String>>;

/// Typed views over an LLM JSON answer.
///
/// Every accessor fails with an error naming the stage and field, so a
/// malformed answer is fatal at the stage that asked for it.
#[derive(Clone, Copy, Debug)]
pub struct AnswerFields<'a> {
    stage: &'a str,
    answer: &'a Value,
}

impl<'a> AnswerFields<'a> {
    pub fn new(stage: &'a str, answer: &'a Value) -> Self {
        Self { stage, answer }
    }

    pub fn object(&self) -> Result<&'a Map<String, Value>, AskDbError> {
        self.answer.as_object().ok_or_else(|| AskDbError::InvalidField {
            stage: self.stage.to_string(),
            field: "<answer>".to_string(),
            reason: format!("expected a JSON object, got {}", self.answer),
        })
    }

    fn get(&self, field: &str) -> Result<&'a Value, AskDbError> {
        self.object()?
            .get(field)
            .ok_or_else(|| AskDbError::missing_field(self.stage, field))
    }

    /// Any JSON value, untyped; `None` when absent or null.
    pub fn optional_value(&self, field: &str) -> Result<Option<&'a Value>, AskDbError> {
        Ok(self.object()?.get(field).filter(|value| !value.is_null()))
    }

    /// A required text field. Numbers and booleans are rendered as text.
    pub fn text(&self, field: &str) -> Result<String, AskDbError> {
        match self.get(field)? {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            Value::Null => Err(AskDbError::missing_field(self.stage, field)),
            other => Err(self.invalid(field, format!("expected text, got {other}"))),
        }
    }

    /// Text that may be absent or null.
    pub fn optional_text(&self, field: &str) -> Result<Option<String>, AskDbError> {
        match self.object()?.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.text(field).map(Some),
        }
    }

    /// A `"True"`/`"False"` flag. Native JSON booleans and any other
    /// spelling are rejected.
    pub fn flag(&self, field: &str) -> Result<bool, AskDbError> {
        match self.get(field)? {
            Value::String(text) if text == "True" => Ok(true),
            Value::String(text) if text == "False" => Ok(false),
            other => Err(AskDbError::InvalidFlag {
                stage: self.stage.to_string(),
                field: field.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn string_list(&self, field: &str) -> Result<Vec<String>, AskDbError> {
        let Value::Array(items) = self.get(field)? else {
            return Err(self.invalid(field, "expected a list".to_string()));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                other => Err(self.invalid(field, format!("expected text items, got {other}"))),
            })
            .collect()
    }

    /// The whole answer read as `{table: [column, ...]}`.
    pub fn table_columns(&self) -> Result<TableColumns, AskDbError> {
        let mut tables = TableColumns::new();
        for (table, columns) in self.object()? {
            let Value::Array(columns) = columns else {
                return Err(self.invalid(table, "expected a list of columns".to_string()));
            };
            let columns = columns
                .iter()
                .map(|column| match column {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(self.invalid(table, format!("expected column names, got {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            tables.insert(table.clone(), columns);
        }
        Ok(tables)
    }

    fn invalid(&self, field: &str, reason: String) -> AskDbError {
        AskDbError::InvalidField {
            stage: self.stage.to_string(),
            field: field.to_string(),
            reason,
        }
    }
}
