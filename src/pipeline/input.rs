//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! The whole document is held in memory; splitting works on a byte slice
//! and every page unit is an independent buffer. The `%PDF` magic is
//! checked here so callers get a meaningful error rather than a decoder
//! failure deep inside the splitter.

use crate::error::TableSearchError;
use std::path::PathBuf;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a document from a local path or an HTTP(S) URL.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<Vec<u8>, TableSearchError> {
    if input.trim().is_empty() {
        return Err(TableSearchError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Reject payloads that do not start with `%PDF`.
///
/// Payloads shorter than four bytes are left to the decoder.
pub fn check_pdf_magic(bytes: &[u8], source_name: &str) -> Result<(), TableSearchError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(TableSearchError::NotAPdf {
            source_name: source_name.to_string(),
            magic,
        });
    }
    Ok(())
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, TableSearchError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TableSearchError::PermissionDenied { path });
        }
        Err(_) => return Err(TableSearchError::FileNotFound { path }),
    };

    check_pdf_magic(&bytes, path_str)?;
    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, TableSearchError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TableSearchError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            TableSearchError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            TableSearchError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(TableSearchError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| TableSearchError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    check_pdf_magic(&bytes, url)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
