//! PDF text source.
//!
//! Payslip PDFs are text documents, often one month per page. The extractor
//! only reads their text layer; scanned pages come back empty.

mod extractor;

pub use extractor::{PdfContent, PdfExtractor, PdfPage};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF text sources.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract text from a specific page (1-indexed).
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// Extract the text of every page, in order.
    fn extract_pages(&self) -> Result<Vec<PdfPage>> {
        (1..=self.page_count())
            .map(|number| {
                Ok(PdfPage {
                    number,
                    text: self.extract_page_text(number)?,
                })
            })
            .collect()
    }
}
