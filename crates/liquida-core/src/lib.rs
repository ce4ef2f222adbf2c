//! Core library for Chilean payslip (liquidación de sueldo) extraction.
//!
//! This crate provides:
//! - PDF text extraction, one document per page
//! - Pay period resolution from Spanish headers and month names
//! - Amount normalization with mixed separators and identifier rejection
//! - Anchor-delimited section scanning and deduction classification
//! - Cross-checks of line items against stated section totals
//! - An upsert-by-period record store

pub mod error;
pub mod models;
pub mod payslip;
pub mod pdf;
pub mod store;

pub use error::{ExtractionError, LiquidaError, PdfError, Result};
pub use models::config::{LiquidaConfig, UnresolvedPolicy};
pub use models::payslip::{
    AmountRejection, Category, LineItem, PayPeriod, PayslipRecord, SectionKind, SectionTotal,
    ValidationFinding,
};
pub use payslip::{AnchorPayslipParser, BatchOutcome, DocumentFailure, ExtractionResult, PayslipParser};
pub use pdf::{PdfContent, PdfExtractor, PdfPage, PdfProcessor};
pub use store::{RecordStore, SharedRecordStore};
