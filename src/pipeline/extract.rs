//! Text extraction: embedded text first, OCR when the document looks scanned.
//!
//! ## Failure policy
//!
//! Neither path propagates errors. A malformed stream, a missing pdfium
//! library, or a tesseract crash is logged at `warn` and yields an empty
//! string; the caller treats an empty [`ExtractedText`] as the single
//! terminal "no extractable text" condition.
//!
//! ## Why spawn_blocking?
//!
//! pdfium and the tesseract process are both blocking. [`extract_document`]
//! moves the whole extraction onto tokio's blocking pool so the runtime's
//! worker threads never stall.

use crate::error::{ExtractionError, SummarizeError};
use crate::output::{ExtractedText, ExtractionMethod, Stage};
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source of a document's embedded text.
pub trait TextLayer: Send + Sync {
    /// Return the concatenated text of every page.
    fn extract(&self, pdf: &[u8]) -> Result<String, ExtractionError>;
}

/// Bind to the pdfium library resolved by `pdfium-auto`.
///
/// `PDFIUM_LIB_PATH` wins; otherwise the per-user cache is used, downloading
/// the platform build on first use. The resolved path is remembered for the
/// rest of the process.
pub fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| ExtractionError::PdfiumBinding(e.to_string()))
}

/// Embedded-text extraction through pdfium.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextLayer;

impl TextLayer for PdfiumTextLayer {
    fn extract(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ExtractionError::Load(format!("{:?}", e)))?;

        let mut full_text = String::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| ExtractionError::Page {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;
            let page_text = text.all();
            debug!("Page {}: {} chars of embedded text", idx + 1, page_text.len());
            full_text.push_str(&page_text);
            full_text.push('\n');
        }

        Ok(full_text.trim().to_string())
    }
}

/// Text layer with an OCR fallback.
#[derive(Clone)]
pub struct TextExtractor {
    text_layer: Arc<dyn TextLayer>,
    ocr: Option<Arc<dyn OcrEngine>>,
    min_text_chars: usize,
    progress: Option<ProgressCallback>,
}

impl TextExtractor {
    /// `ocr = None` disables the fallback.
    pub fn new(
        text_layer: Arc<dyn TextLayer>,
        ocr: Option<Arc<dyn OcrEngine>>,
        min_text_chars: usize,
    ) -> Self {
        Self {
            text_layer,
            ocr,
            min_text_chars,
            progress: None,
        }
    }

    /// Report [`Stage::OcrFallback`] to `progress` when OCR starts.
    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Extract text, never failing. Blocking.
    pub fn extract(&self, pdf: &[u8]) -> ExtractedText {
        let direct = match self.text_layer.extract(pdf) {
            Ok(t) => t.trim().to_string(),
            Err(e) => {
                warn!("Text-layer extraction failed: {}", e);
                String::new()
            }
        };
        let direct_chars = direct.chars().count();

        if direct_chars >= self.min_text_chars {
            info!("Text layer yielded {} chars", direct_chars);
            return ExtractedText {
                text: direct,
                method: ExtractionMethod::TextLayer,
            };
        }

        let Some(ocr) = &self.ocr else {
            debug!("Text layer short ({} chars) and OCR disabled", direct_chars);
            return fallback(direct);
        };

        info!(
            "Text layer yielded {} chars (< {}); running OCR",
            direct_chars, self.min_text_chars
        );
        if let Some(ref cb) = self.progress {
            cb.on_stage(Stage::OcrFallback);
        }
        let recognised = match ocr.recognize(pdf) {
            Ok(t) => t.trim().to_string(),
            Err(e) => {
                warn!("OCR failed: {}", e);
                String::new()
            }
        };

        if recognised.chars().count() > direct_chars {
            info!("OCR yielded {} chars", recognised.chars().count());
            ExtractedText {
                text: recognised,
                method: ExtractionMethod::Ocr,
            }
        } else {
            fallback(direct)
        }
    }
}

fn fallback(direct: String) -> ExtractedText {
    if direct.is_empty() {
        ExtractedText::empty()
    } else {
        ExtractedText {
            text: direct,
            method: ExtractionMethod::TextLayer,
        }
    }
}

/// Run [`TextExtractor::extract`] on the blocking pool.
pub async fn extract_document(
    extractor: TextExtractor,
    pdf: Vec<u8>,
) -> Result<ExtractedText, SummarizeError> {
    tokio::task::spawn_blocking(move || extractor.extract(&pdf))
        .await
        .map_err(|e| SummarizeError::Internal(format!("Extraction task panicked: {}", e)))
}
