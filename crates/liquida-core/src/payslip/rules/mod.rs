//! Rule-based extractors for payslip text.

pub mod text;
pub mod patterns;
pub mod amounts;
pub mod period;
pub mod sections;
pub mod classify;

pub use text::{split_lines, split_pages, fold};
pub use amounts::{AmountExtractor, AmountNormalizer, NormalizedAmount, format_clp_amount};
pub use period::{month_from_name, MonthExtractor, PeriodResolver};
pub use sections::{extract_section, find_labeled_amount, parse_item_line, RawItem, SectionAnchor, SectionScan};
pub use classify::{ClassificationRule, RuleTable};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
