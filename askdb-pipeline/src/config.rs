use std::fmt;
use std::str::FromStr;

use askdb_core::{ApiKey, AskDbError, GuardrailCheck};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    #[default]
    SingleTurn,
    /// Adds question classification, reframing and the consistency check.
    MultiTurn,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::SingleTurn => "single_turn",
            PipelineMode::MultiTurn => "multi_turn",
        }
    }

    pub fn checks(&self) -> &'static [GuardrailCheck] {
        match self {
            PipelineMode::SingleTurn => &GuardrailCheck::SINGLE_TURN,
            PipelineMode::MultiTurn => &GuardrailCheck::MULTI_TURN,
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = AskDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "single_turn" | "single" => Ok(PipelineMode::SingleTurn),
            "multi_turn" | "multi" => Ok(PipelineMode::MultiTurn),
            other => Err(AskDbError::InvalidConfig(format!("unknown pipeline mode '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model for every processing stage.
    pub llm: String,
    /// Model for the policy checks.
    pub guardrails_llm: String,
    /// Describes the database to the model; sent as the system message.
    pub system_message: String,
    /// JSON list of `{"name": ..., "description": ...}` table entries.
    pub table_description: String,
    pub column_description: String,
    /// Columns whose every distinct value is always listed.
    pub indicator_vars: Vec<String>,
    pub num_common_values: usize,
    /// Past turns kept per session.
    pub context_length: usize,
    pub db_type: String,
    pub db_id: String,
    pub temperature: f32,
    pub guardrails_temperature: f32,
    pub mode: PipelineMode,
    #[serde(skip_serializing)]
    pub api_key: Option<ApiKey>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm: "gpt-4o".to_string(),
            guardrails_llm: "gpt-4o-mini".to_string(),
            system_message: String::new(),
            table_description: String::new(),
            column_description: String::new(),
            indicator_vars: Vec::new(),
            num_common_values: 10,
            context_length: 5,
            db_type: "sqlite".to_string(),
            db_id: String::new(),
            temperature: 0.1,
            guardrails_temperature: 0.0,
            mode: PipelineMode::SingleTurn,
            api_key: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), AskDbError> {
        let required = [
            ("llm", &self.llm),
            ("guardrails_llm", &self.guardrails_llm),
            ("db_id", &self.db_id),
            ("db_type", &self.db_type),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AskDbError::InvalidConfig(format!("{name} must not be empty")));
        }
        if self.num_common_values == 0 {
            return Err(AskDbError::InvalidConfig(
                "num_common_values must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads `ASKDB_*` variables from the process environment over the
    /// defaults. The API key falls back to `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, AskDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AskDbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let text = |key: &str, slot: &mut String| {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        };
        text("ASKDB_LLM", &mut config.llm);
        text("ASKDB_GUARDRAILS_LLM", &mut config.guardrails_llm);
        text("ASKDB_SYSTEM_MESSAGE", &mut config.system_message);
        text("ASKDB_TABLE_DESCRIPTION", &mut config.table_description);
        text("ASKDB_COLUMN_DESCRIPTION", &mut config.column_description);
        text("ASKDB_DB_TYPE", &mut config.db_type);
        text("ASKDB_DB_ID", &mut config.db_id);

        if let Some(vars) = lookup("ASKDB_INDICATOR_VARS") {
            config.indicator_vars = vars
                .split(',')
                .map(str::trim)
                .filter(|var| !var.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("ASKDB_NUM_COMMON_VALUES") {
            config.num_common_values = parse("ASKDB_NUM_COMMON_VALUES", &value)?;
        }
        if let Some(value) = lookup("ASKDB_CONTEXT_LENGTH") {
            config.context_length = parse("ASKDB_CONTEXT_LENGTH", &value)?;
        }
        if let Some(value) = lookup("ASKDB_TEMPERATURE") {
            config.temperature = parse("ASKDB_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("ASKDB_GUARDRAILS_TEMPERATURE") {
            config.guardrails_temperature = parse("ASKDB_GUARDRAILS_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("ASKDB_MODE") {
            config.mode = value.parse()?;
        }
        config.api_key = lookup("ASKDB_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .map(ApiKey::new);
        Ok(config)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, AskDbError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| AskDbError::InvalidConfig(format!("{key}={value}: {err}")))
}
