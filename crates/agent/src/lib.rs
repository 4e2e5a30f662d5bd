//! The generation engine of DocForge.
//!
//! A job moves through up to three stages:
//!
//! 1. **Research**: best-effort snippet gathering from the research tools
//! 2. **Draft**: one structured LLM call, retried on malformed output
//! 3. **Render**: the outline is laid out and written as a PDF
//!
//! `JobRegistry` owns the jobs and runs each pipeline on its own task;
//! callers submit a request and poll or wait for the outcome.

pub mod drafting;
pub mod pipeline;
pub mod registry;
pub mod research;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use drafting::{DraftSettings, parse_outline};
pub use pipeline::{Pipeline, PipelineSettings};
pub use registry::JobRegistry;
pub use research::{ResearchLoop, ResearchOutcome, ResearchSettings};
