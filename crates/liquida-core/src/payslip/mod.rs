//! Payslip extraction module.

mod assembler;
mod parser;
pub mod rules;
pub mod validation;

pub use assembler::{assemble, RecordParts};
pub use parser::{AnchorPayslipParser, BatchOutcome, DocumentFailure, ExtractionResult, PayslipParser};
pub use validation::ValidationEngine;

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
