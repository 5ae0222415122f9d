pub mod extract;
pub mod orchestrator;
pub mod transform;
pub mod verify;

pub use orchestrator::{EtlPipeline, RunSummary};
