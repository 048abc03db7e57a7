//! OCR fallback: rasterise every page via pdfium and read it with tesseract.
//!
//! Pages are rendered with the longest edge capped at `max_pixels` rather
//! than at a fixed DPI, so an oversized page cannot exhaust memory. Each
//! render is written as a PNG into a [`TempDir`] that is removed when the
//! call returns.

use crate::error::ExtractionError;
use crate::pipeline::extract::bind_pdfium;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Separator placed between page-level OCR text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Character recognition over a whole document.
pub trait OcrEngine: Send + Sync {
    /// Recognise the text of every page and join it with [`PAGE_SEPARATOR`].
    fn recognize(&self, pdf: &[u8]) -> Result<String, ExtractionError>;
}

/// The `tesseract` command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    max_pixels: u32,
    binary: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>, max_pixels: u32) -> Self {
        Self {
            language: language.into(),
            max_pixels,
            binary: "tesseract".to_string(),
        }
    }

    /// Use a tesseract executable other than the one on `PATH`.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn recognize_image(&self, page: usize, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| ExtractionError::EngineUnavailable {
                engine: self.binary.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Page {
                page,
                detail: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(clean_page_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        let pages = render_pages(pdf, self.max_pixels)?;
        info!("OCR processing {} pages", pages.len());

        let temp_dir = tempfile::Builder::new().prefix("evalsum_ocr_").tempdir()?;
        let mut texts = Vec::with_capacity(pages.len());

        for (idx, image) in pages {
            let page = idx + 1;
            let path = write_png(&temp_dir, page, &image)?;
            match self.recognize_image(page, &path) {
                Ok(text) if !text.is_empty() => {
                    debug!("Page {}: {} chars recognised", page, text.len());
                    texts.push(text);
                }
                Ok(_) => debug!("Page {}: no text recognised", page),
                // A missing binary fails every page the same way.
                Err(e @ ExtractionError::EngineUnavailable { .. }) => return Err(e),
                Err(e) => warn!("Page {}: OCR failed: {}", page, e),
            }
        }

        Ok(texts.join(PAGE_SEPARATOR))
    }
}

/// Rasterise every page of `pdf`, longest edge capped at `max_pixels`.
///
/// Returns `(page_index_0based, image)` pairs. Pages that fail to render are
/// skipped with a warning.
pub fn render_pages(pdf: &[u8], max_pixels: u32) -> Result<Vec<(usize, DynamicImage)>, ExtractionError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| ExtractionError::Load(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.render_with_config(&render_config) {
            Ok(bitmap) => {
                let image = bitmap.as_image();
                debug!(
                    "Rendered page {} → {}x{} px",
                    idx + 1,
                    image.width(),
                    image.height()
                );
                results.push((idx, image));
            }
            Err(e) => warn!("Skipping page {}: render failed: {:?}", idx + 1, e),
        }
    }

    Ok(results)
}

fn write_png(dir: &TempDir, page: usize, image: &DynamicImage) -> Result<std::path::PathBuf, ExtractionError> {
    let path = dir.path().join(format!("page-{page:04}.png"));
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|e| ExtractionError::Page {
            page,
            detail: format!("PNG encoding failed: {e}"),
        })?;
    Ok(path)
}

/// Drop form feeds and trailing whitespace tesseract leaves behind.
fn clean_page_text(raw: &str) -> String {
    raw.replace('\x0c', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
