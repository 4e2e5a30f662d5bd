//! # DocForge Core
//!
//! Domain types, traits, and error definitions for the DocForge document
//! generator. This crate has **no framework dependencies**: it defines the
//! model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM provider, research tool, renderer) is a
//! trait here. Implementations live in their respective crates, which keeps
//! the job pipeline testable with scripted stand-ins.

pub mod document;
pub mod error;
pub mod event;
pub mod job;
pub mod message;
pub mod provider;
pub mod render;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use document::{check_file_name, DocumentOutline, DocumentRequest, ModelProvider, ResearchSnippet, Section, SnippetSource};
pub use error::{GenerationError, ProviderError, RenderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use job::{GenerationJob, JobId, JobSnapshot, JobStatus};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use render::Renderer;
pub use tool::{Tool, ToolHit, ToolRegistry};
