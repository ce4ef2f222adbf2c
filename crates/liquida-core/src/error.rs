//! Error types for the liquida-core library.

use thiserror::Error;

/// Main error type for the liquida library.
#[derive(Error, Debug)]
pub enum LiquidaError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Payslip extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF text extraction.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors that reject a whole document.
///
/// Anomalies inside a document (rejected amounts, absent sections, totals
/// that do not add up) are recorded on the resulting record instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No month/year pair could be identified.
    #[error("pay period unresolved: {reason}")]
    PeriodUnresolved { reason: String },
}

/// Result type for the liquida library.
pub type Result<T> = std::result::Result<T, LiquidaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractionError::PeriodUnresolved {
            reason: "no month name found".to_string(),
        };
        assert_eq!(err.to_string(), "pay period unresolved: no month name found");

        let wrapped: LiquidaError = err.into();
        assert_eq!(
            wrapped.to_string(),
            "extraction error: pay period unresolved: no month name found"
        );
    }

    #[test]
    fn test_pdf_error_conversion() {
        let err: LiquidaError = PdfError::InvalidPage(7).into();
        assert!(matches!(err, LiquidaError::Pdf(PdfError::InvalidPage(7))));
    }
}
