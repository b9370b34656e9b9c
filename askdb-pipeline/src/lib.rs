pub mod config;
pub mod descriptor;
pub mod processor;
pub mod session;

pub use config::{PipelineConfig, PipelineMode};
pub use descriptor::DatabaseDescriptor;
pub use processor::QueryProcessor;
pub use session::Session;
