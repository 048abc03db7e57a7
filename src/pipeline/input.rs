//! Input resolution: turn a user-supplied path, URL, or byte buffer into a
//! validated [`Document`], and validate the request credential.
//!
//! The document lives only in memory. pdfium can open a byte slice directly,
//! so nothing is written to disk here. The `%PDF` magic check runs before any
//! pdfium call so callers get a meaningful error instead of a parser failure.

use crate::error::SummarizeError;
use std::path::PathBuf;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Raw PDF bytes for one request.
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
    source: String,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("source", &self.source)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Document {
    /// Wrap in-memory bytes, checking the PDF signature.
    pub fn from_bytes(bytes: Vec<u8>, source: impl Into<String>) -> Result<Self, SummarizeError> {
        let source = source.into();
        if bytes.is_empty() {
            return Err(SummarizeError::MissingDocument);
        }
        if !bytes.starts_with(PDF_MAGIC) {
            let magic = bytes.iter().take(4).copied().collect();
            return Err(SummarizeError::NotAPdf {
                source_name: source,
                magic,
            });
        }
        Ok(Self { bytes, source })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Path, URL, or label the bytes came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the document from a local path or an HTTP(S) URL.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<Document, SummarizeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SummarizeError::MissingDocument);
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.contains("://") {
        Err(SummarizeError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        read_local(input).await
    }
}

/// Validate the request credential.
///
/// `None` means the field was never supplied; `Some("")` means it was
/// supplied blank. Both are rejected before any processing starts.
pub fn validate_api_key(api_key: Option<&str>) -> Result<String, SummarizeError> {
    match api_key {
        None => Err(SummarizeError::MissingCredential),
        Some(k) if k.trim().is_empty() => Err(SummarizeError::EmptyCredential),
        Some(k) => Ok(k.trim().to_string()),
    }
}

async fn read_local(path_str: &str) -> Result<Document, SummarizeError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SummarizeError::PermissionDenied { path });
        }
        Err(_) => return Err(SummarizeError::FileNotFound { path }),
    };

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Document::from_bytes(bytes, path.display().to_string())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, SummarizeError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SummarizeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SummarizeError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Document::from_bytes(bytes.to_vec(), url)
}
