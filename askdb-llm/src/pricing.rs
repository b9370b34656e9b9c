use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// USD per million tokens.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (f64::from(prompt_tokens) * self.input_per_million
            + f64::from(completion_tokens) * self.output_per_million)
            / 1_000_000.0
    }
}

/// Per-model prices. Dated model snapshots ("gpt-4o-2024-08-06") resolve to
/// the longest configured prefix.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct PricingTable(HashMap<String, ModelPricing>);

impl PricingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Published OpenAI list prices for the models the pipeline is usually
    /// configured with.
    pub fn openai_defaults() -> Self {
        Self::empty()
            .with_model("gpt-4o", ModelPricing::new(2.50, 10.00))
            .with_model("gpt-4o-mini", ModelPricing::new(0.15, 0.60))
            .with_model("gpt-4.1", ModelPricing::new(2.00, 8.00))
            .with_model("gpt-4.1-mini", ModelPricing::new(0.40, 1.60))
            .with_model("gpt-4.1-nano", ModelPricing::new(0.10, 0.40))
            .with_model("gpt-4-turbo", ModelPricing::new(10.00, 30.00))
            .with_model("gpt-3.5-turbo", ModelPricing::new(0.50, 1.50))
    }

    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.0.insert(model.into(), pricing);
        self
    }

    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        if let Some(pricing) = self.0.get(model) {
            return Some(*pricing);
        }
        self.0
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, pricing)| *pricing)
    }
}
