//! Renderer trait: turns a drafted outline into an artifact on disk.

use async_trait::async_trait;
use crate::document::DocumentOutline;
use crate::error::RenderError;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in logs (e.g., "pdf").
    fn name(&self) -> &str;

    /// Render `outline` to `file_name` and return a reference to the
    /// produced file. Section order must be preserved.
    async fn render(&self, outline: &DocumentOutline, file_name: &str) -> Result<String, RenderError>;
}
