//! PDF text extraction.
//!
//! [`PdfExtractor`] turns PDF bytes into one [`Page`] per document page
//! using `pdf-extract`. Pages are numbered from 1 in document order; a page
//! with no extractable text still yields an (empty) page so numbering stays
//! aligned with the source.

use pdfchat_core::models::Page;
use pdfchat_core::source::TextExtractor;
use pdfchat_core::{PipelineError, Result};

/// [`TextExtractor`] for PDF documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>> {
        if bytes.is_empty() {
            return Err(PipelineError::Extraction("document is empty".to_string()));
        }
        let texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| PipelineError::Extraction(format!("PDF extraction failed: {}", e)))?;
        Ok(pages_from_texts(texts))
    }
}

/// Number per-page texts from 1.
pub fn pages_from_texts(texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page::new(i as u32 + 1, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_numbered_from_one() {
        let pages = pages_from_texts(vec!["first".into(), String::new(), "third".into()]);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], Page::new(1, "first"));
        assert_eq!(pages[1].page_number, 2);
        assert!(pages[1].text.is_empty());
        assert_eq!(pages[2], Page::new(3, "third"));
    }

    #[test]
    fn test_invalid_bytes_are_extraction_error() {
        let err = PdfExtractor.extract(b"not a valid pdf").unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)), "{:?}", err);
    }

    #[test]
    fn test_empty_input_is_extraction_error() {
        assert!(matches!(
            PdfExtractor.extract(&[]),
            Err(PipelineError::Extraction(_))
        ));
    }
}
