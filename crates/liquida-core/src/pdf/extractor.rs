//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::payslip::rules::split_pages;

/// PDF text extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

/// Extracted text of a PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// Whole-document text.
    pub text: String,
    /// Pages with their text.
    pub pages: Vec<PdfPage>,
}

impl PdfContent {
    /// Pages that have no text layer.
    pub fn empty_pages(&self) -> impl Iterator<Item = &PdfPage> {
        self.pages.iter().filter(|p| p.text.trim().is_empty())
    }
}

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Extracted text from this page.
    pub text: String,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }

    /// Extract whole-document and per-page text.
    ///
    /// Pages are read through lopdf. When that yields nothing for some page,
    /// the pdf-extract text is split on form feeds instead, provided it has
    /// one chunk per page.
    pub fn extract_all(&self) -> Result<PdfContent> {
        let page_count = self.document()?.get_pages().len() as u32;
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        let text = self.extract_text()?;
        let mut pages = self.extract_pages()?;

        if pages.iter().any(|p| p.text.trim().is_empty()) {
            let chunks = split_pages(&text);
            if chunks.len() == pages.len() {
                debug!("Using form-feed page split of {} pages", chunks.len());
                for (page, chunk) in pages.iter_mut().zip(chunks) {
                    if page.text.trim().is_empty() {
                        page.text = chunk.to_string();
                    }
                }
            }
        }

        let empty = pages.iter().filter(|p| p.text.trim().is_empty()).count();
        if empty > 0 {
            warn!("{} of {} pages have no text layer", empty, page_count);
        }

        Ok(PdfContent { text, pages })
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Payroll exports are often "protected" with an empty user password.
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads the decrypted bytes.
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        self.document()?;
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self.document()?;
        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }

        doc.extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(format!("page {}: {}", page, e)))
    }
}
