use std::sync::Arc;

use crate::error::StudyError;

/// A document picked by the user, held in memory until the section is cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Upload {
            file_name: file_name.into(),
            bytes: Arc::new(bytes),
        }
    }
}

/// Extracts the visible text of a PDF, one page after another.
///
/// Runs on the blocking pool. A parser panic is reported as an extraction
/// error, same as a parse failure.
pub async fn extract_pdf_text(bytes: Arc<Vec<u8>>) -> Result<String, StudyError> {
    tracing::info!(bytes = bytes.len(), "extracting text from PDF");

    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| StudyError::Extraction(format!("PDF parser stopped unexpectedly: {}", e)))?
    .map_err(|e| StudyError::Extraction(e.to_string()))?;

    let text = join_pages(pages);
    tracing::debug!(chars = text.chars().count(), "PDF text extracted");
    Ok(text)
}

/// Each page's text followed by a newline.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages.into_iter().fold(String::new(), |mut text, page| {
        text.push_str(page.as_ref());
        text.push('\n');
        text
    })
}

pub fn has_readable_text(text: &str) -> bool {
    !text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages() {
        let text = join_pages(["Chapter 1", "Chapter 2"]);
        assert_eq!(text, "Chapter 1\nChapter 2\n");
        assert_eq!(join_pages(Vec::<String>::new()), "");
    }

    #[test]
    fn test_image_only_pages_have_no_readable_text() {
        let text = join_pages(["", "  ", ""]);
        assert_eq!(text, "\n  \n\n");
        assert!(!has_readable_text(&text));
        assert!(has_readable_text("\n\nMitochondria\n"));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_extraction() {
        let bytes = Arc::new(b"this is not a pdf".to_vec());
        let err = extract_pdf_text(bytes).await.unwrap_err();
        assert!(matches!(err, StudyError::Extraction(_)));
    }

    #[test]
    fn test_upload_shares_bytes() {
        let upload = Upload::new("notes.pdf", vec![1, 2, 3]);
        let copy = upload.clone();
        assert!(Arc::ptr_eq(&upload.bytes, &copy.bytes));
        assert_eq!(copy.file_name, "notes.pdf");
    }
}
