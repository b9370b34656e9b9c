//! Prompt templates for every model round trip in the pipeline.
//!
//! Wording is free to change; the JSON keys each prompt asks for are the
//! contract the calling stage parses.

pub mod context;
pub mod descriptor;
pub mod evaluation;
pub mod guardrails;
pub mod language;
pub mod pipeline;
mod template;

pub use template::{vars, PromptTemplate, PromptVars};
