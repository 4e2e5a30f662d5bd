//! PDF renderer for DocForge.
//!
//! Lays an outline out with the standard Helvetica fonts and writes it
//! with `lopdf`. Writing is blocking, so it runs on the blocking pool.

pub mod layout;

use async_trait::async_trait;
use docforge_core::error::RenderError;
use docforge_core::{DocumentOutline, Renderer, check_file_name};
use layout::{Font, PAGE_HEIGHT, PAGE_WIDTH, PlacedLine};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Renders outlines to PDF files under `output_dir`.
pub struct PdfRenderer {
    output_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Where `file_name` lands. Anything but a bare file name is refused,
    /// so the result is always directly under `output_dir`.
    pub fn target_path(&self, file_name: &str) -> Result<PathBuf, RenderError> {
        check_file_name(file_name).map_err(RenderError::new)?;
        Ok(self.output_dir.join(file_name))
    }
}

#[async_trait]
impl Renderer for PdfRenderer {
    fn name(&self) -> &str {
        "pdf"
    }

    async fn render(&self, outline: &DocumentOutline, file_name: &str) -> Result<String, RenderError> {
        if file_name.trim().is_empty() {
            return Err(RenderError::new("output file name is empty"));
        }
        if outline.sections.is_empty() {
            return Err(RenderError::new("outline has no sections"));
        }

        let path = self.target_path(file_name)?;
        let outline = outline.clone();
        let target = path.clone();

        let pages = tokio::task::spawn_blocking(move || write_pdf(&outline, &target))
            .await
            .map_err(|e| RenderError::new(format!("render task failed: {e}")))??;

        info!(path = %path.display(), pages, "PDF document saved");
        Ok(path.display().to_string())
    }
}

fn font_key(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
    }
}

fn page_content(lines: &[PlacedLine]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![font_key(line.style.font).into(), line.style.size.into()],
        ));
        operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(layout::latin1_bytes(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Build and save the PDF. Returns the page count.
fn write_pdf(outline: &DocumentOutline, path: &Path) -> Result<usize, RenderError> {
    let pages = layout::paginate(outline);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in &pages {
        let encoded = page_content(lines)
            .encode()
            .map_err(|e| RenderError::new(format!("failed to encode page: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let mut info = lopdf::Dictionary::new();
    info.set("Title", Object::string_literal(layout::latin1_bytes(&layout::sanitize(&outline.title))));
    info.set("Producer", Object::string_literal("DocForge"));
    let info_id = doc.add_object(info);

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(path)?;
    debug!(path = %path.display(), pages = count, "Wrote PDF");
    Ok(count)
}
