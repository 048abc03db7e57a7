//! Pipeline stages for course-evaluation summarisation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ chunk ──▶ select ──▶ llm ──▶ synthesize
//! (bytes)   (text/OCR)  (words)   (model)   (parts)   (merge)
//!                                              │
//!                                         postprocess
//! ```
//!
//! 1. [`input`]      — load the PDF from a path, URL, or bytes; validate the credential
//! 2. [`extract`]    — pdfium text layer, falling back to [`ocr`] for scanned pages
//! 3. [`chunk`]      — word-aligned packing under a character budget
//! 4. [`select`]     — walk the candidate models on the first chunk
//! 5. [`llm`]        — the completion-client seam and per-chunk requests
//! 6. [`synthesize`] — merge part analyses, or degrade to a parts list
//! 7. [`postprocess`] — deterministic cleanup of model Markdown

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod select;
pub mod synthesize;
