//! Multi-turn memory: a bounded window of past turns plus the model calls
//! that read it (summary, classification, reframing, clarification).

pub mod reframe;
mod reframe_tests;
pub mod summary;
mod summary_tests;
pub mod window;

pub use reframe::QueryReframer;
pub use summary::{ConversationSummarizer, ConversationSummary};
pub use window::{ContextEntry, ContextWindow};
