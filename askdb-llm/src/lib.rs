mod cache;
mod json;
pub mod openai_compatible;
mod pricing;

pub use askdb_core::{JsonLlm, LlmJsonRequest, LlmJsonResponse};
pub use cache::CachedLlm;
pub use json::parse_json_content;
pub use openai_compatible::{
    ChatCompletionRequest, LlmClientError, OpenAiCompatibleBuilder, OpenAiCompatibleClient,
};
pub use pricing::{ModelPricing, PricingTable};
