//! Save-artifact tool: writes text content into a scratch directory.
//!
//! Each invocation writes a new file and returns its path as the hit
//! reference. JSON content gets a `.json` extension, anything else `.txt`.

use async_trait::async_trait;
use docforge_core::SnippetSource;
use docforge_core::error::ToolError;
use docforge_core::tool::{Tool, ToolHit};
use std::path::{Path, PathBuf};
use tracing::info;

const NAME: &str = "save_artifact";

pub struct SaveArtifactTool {
    scratch_dir: PathBuf,
}

impl SaveArtifactTool {
    pub fn new(scratch_dir: impl AsRef<Path>) -> Self {
        Self {
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
        }
    }

    fn file_name(content: &str) -> String {
        let ext = if serde_json::from_str::<serde_json::Value>(content).is_ok() {
            "json"
        } else {
            "txt"
        };
        format!("draft-{}.{ext}", uuid::Uuid::new_v4().simple())
    }
}

#[async_trait]
impl Tool for SaveArtifactTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Save document content to the scratch directory for later processing."
    }

    fn source(&self) -> Option<SnippetSource> {
        None
    }

    async fn invoke(&self, content: &str) -> Result<Vec<ToolHit>, ToolError> {
        if content.trim().is_empty() {
            return Err(ToolError::InvalidArguments("nothing to save".into()));
        }

        let unavailable = |e: std::io::Error| ToolError::Unavailable {
            tool_name: NAME.into(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(unavailable)?;

        let path = self.scratch_dir.join(Self::file_name(content));
        tokio::fs::write(&path, content).await.map_err(unavailable)?;

        info!(tool = NAME, path = %path.display(), bytes = content.len(), "Artifact saved");
        Ok(vec![ToolHit::new(
            format!("Saved {} bytes", content.len()),
            path.display().to_string(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_json_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveArtifactTool::new(dir.path().join("tmp"));

        let hits = tool.invoke(r#"{"title": "Draft"}"#).await.unwrap();
        assert_eq!(hits.len(), 1);

        let path = PathBuf::from(&hits[0].reference);
        assert!(path.starts_with(dir.path().join("tmp")));
        assert_eq!(path.extension().unwrap(), "json");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"title": "Draft"}"#);
    }

    #[tokio::test]
    async fn plain_text_gets_txt_and_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveArtifactTool::new(dir.path());

        let a = tool.invoke("first draft").await.unwrap();
        let b = tool.invoke("second draft").await.unwrap();
        assert_ne!(a[0].reference, b[0].reference);
        assert!(a[0].reference.ends_with(".txt"));
    }

    #[tokio::test]
    async fn empty_content_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveArtifactTool::new(dir.path());
        assert!(matches!(
            tool.invoke("  ").await.unwrap_err(),
            ToolError::InvalidArguments(_)
        ));
    }

    #[test]
    fn not_a_research_tool() {
        assert!(SaveArtifactTool::new("tmp").source().is_none());
    }
}
