use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to extract PDF content: {0}")]
    Parse(String),

    #[error("the PDF has no extractable text")]
    NoText,
}

/// Extracts the text layer of every page, concatenated in page order.
///
/// CPU-bound; call it from `spawn_blocking` inside async code.
///
/// # Errors
///
/// - [`PdfError::Parse`] if the bytes are not a readable PDF
/// - [`PdfError::NoText`] if no page carries any text
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, PdfError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PdfError::Parse(e.to_string()))?;

    let total = pages.len();
    for (i, page) in pages.iter().enumerate() {
        tracing::debug!(page = i + 1, pages = total, chars = page.chars().count(), "extracted page text");
    }

    let text = pages.concat();
    if text.trim().is_empty() {
        return Err(PdfError::NoText);
    }

    tracing::info!(pages = total, chars = text.chars().count(), "PDF text extraction complete");
    Ok(text)
}

/// Runs [`extract_pdf_text`] on the blocking pool.
///
/// A panic inside the PDF parser is reported as [`PdfError::Parse`].
///
/// # Errors
///
/// Same as [`extract_pdf_text`].
pub async fn extract_pdf_text_blocking(bytes: Vec<u8>) -> Result<String, PdfError> {
    tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(|e| PdfError::Parse(format!("extraction aborted: {e}")))?
}
