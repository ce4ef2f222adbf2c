//! Anchor-driven payslip parser.

use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::config::{LiquidaConfig, SectionConfig, UnresolvedPolicy};
use crate::models::payslip::{LineItem, PayPeriod, PayslipRecord, SectionKind, SectionTotal};

use super::assembler::{assemble, RecordParts};
use super::rules::{
    extract_section, find_labeled_amount, split_lines, AmountExtractor, AmountNormalizer,
    PeriodResolver, RuleTable,
};
use super::validation::ValidationEngine;
use super::Result;

/// Result of payslip extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Assembled record.
    pub record: PayslipRecord,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for payslip parsing.
pub trait PayslipParser {
    /// Parse one document's text.
    fn parse(&self, text: &str) -> Result<ExtractionResult>;
}

/// A document of a batch that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Position of the document in the batch input.
    pub index: usize,
    pub error: ExtractionError,
}

/// Outcome of processing a batch of documents.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Records, in input order.
    pub records: Vec<PayslipRecord>,
    /// Documents skipped because they failed.
    pub failures: Vec<DocumentFailure>,
}

/// Parser built from anchors, keyword rules and plausibility limits.
#[derive(Debug, Clone)]
pub struct AnchorPayslipParser {
    extractor: AmountExtractor,
    /// Reads stated totals and net pay; no per-item ceiling.
    totals: AmountExtractor,
    resolver: PeriodResolver,
    sections: SectionConfig,
    rules: RuleTable,
    validator: ValidationEngine,
    on_unresolved: UnresolvedPolicy,
}

impl AnchorPayslipParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::from_config(&LiquidaConfig::default())
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &LiquidaConfig) -> Self {
        let normalizer = AmountNormalizer::from_config(&config.amounts);
        Self {
            totals: AmountExtractor::new(normalizer.for_totals()),
            extractor: AmountExtractor::new(normalizer),
            resolver: PeriodResolver::from_config(&config.period),
            sections: config.sections.clone(),
            rules: config.classification.clone(),
            validator: ValidationEngine::from_config(&config.validation),
            on_unresolved: config.period.on_unresolved,
        }
    }

    /// Set the validation tolerance.
    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.validator = self.validator.with_tolerance(tolerance);
        self
    }

    /// Set the policy for documents without a resolvable period.
    pub fn with_unresolved_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.on_unresolved = policy;
        self
    }

    /// Replace the classification rule table.
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the amount normalizer.
    pub fn with_normalizer(mut self, normalizer: AmountNormalizer) -> Self {
        self.totals = AmountExtractor::new(normalizer.for_totals());
        self.extractor = AmountExtractor::new(normalizer);
        self
    }

    /// Replace the section anchors.
    pub fn with_sections(mut self, sections: SectionConfig) -> Self {
        self.sections = sections;
        self
    }

    /// Process one document into a record.
    pub fn process_document(&self, text: &str) -> Result<PayslipRecord> {
        self.parse(text).map(|result| result.record)
    }

    /// Process documents independently. Failed documents are reported and
    /// skipped; they never abort the batch.
    pub fn process_batch<I, S>(&self, texts: I) -> BatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BatchOutcome::default();

        for (index, text) in texts.into_iter().enumerate() {
            match self.process_document(text.as_ref()) {
                Ok(record) => outcome.records.push(record),
                Err(error) => {
                    warn!("Skipping document {}: {}", index, error);
                    outcome.failures.push(DocumentFailure { index, error });
                }
            }
        }

        info!(
            "Batch finished: {} records, {} failures",
            outcome.records.len(),
            outcome.failures.len()
        );
        outcome
    }

    fn resolve_period(&self, text: &str, warnings: &mut Vec<String>) -> Result<PayPeriod> {
        match self.resolver.resolve(text) {
            Ok(found) => {
                debug!("Period {} from '{}' ({:.2})", found.value, found.source, found.confidence);
                Ok(found.value)
            }
            Err(err) => match self.on_unresolved {
                UnresolvedPolicy::Reject => Err(err),
                UnresolvedPolicy::Sentinel => {
                    warn!("{}, using the unknown period", err);
                    warnings.push(format!("{}; recorded under the unknown period", err));
                    Ok(PayPeriod::unknown())
                }
            },
        }
    }

    /// Scan every section. Returns the kinds whose start anchor was found.
    fn extract_items(
        &self,
        lines: &[&str],
        items: &mut Vec<LineItem>,
        warnings: &mut Vec<String>,
    ) -> Vec<SectionKind> {
        let mut scanned = Vec::new();

        for section in SectionKind::ALL {
            let anchor = self.sections.anchor(section);
            let scan = extract_section(
                lines,
                section,
                anchor,
                &self.sections.stop_anchors(section),
                self.extractor.normalizer(),
                self.sections.min_label_length,
            );

            if !scan.found {
                debug!("Section {} absent", section.display());
                continue;
            }
            scanned.push(section);

            if !scan.terminated {
                warn!("Section {} has no end anchor", section.display());
                warnings.push(format!(
                    "{} section has no '{}' line; captured up to the next anchor or end of document",
                    section.display(),
                    anchor.end
                ));
            }

            for raw in scan.items {
                if let Some(reason) = raw.amount.rejection {
                    warn!("Rejected amount for '{}': {}", raw.label, reason);
                    warnings.push(format!("amount of '{}' rejected: {}", raw.label, reason));
                }

                let category = section.is_deduction().then(|| self.rules.classify(&raw.label));
                items.push(LineItem {
                    label: raw.label,
                    amount: raw.amount.value,
                    section,
                    category,
                    rejection: raw.amount.rejection,
                });
            }
        }

        scanned
    }

    fn extract_section_totals(&self, lines: &[&str], warnings: &mut Vec<String>) -> Vec<SectionTotal> {
        SectionKind::ALL
            .iter()
            .filter_map(|section| {
                let label = &self.sections.anchor(*section).total;
                let amount = self.labeled_amount(lines, label, warnings)?;
                Some(SectionTotal {
                    section: *section,
                    stated_total: amount,
                })
            })
            .collect()
    }

    /// Amount printed after a label, if present and plausible.
    fn labeled_amount(&self, lines: &[&str], label: &str, warnings: &mut Vec<String>) -> Option<Decimal> {
        let found = find_labeled_amount(lines, label, &self.totals)?;
        match found.value.rejection {
            None => Some(found.value.value),
            Some(reason) => {
                warn!("Rejected amount '{}' after '{}': {}", found.source, label, reason);
                warnings.push(format!("amount after '{}' rejected: {}", label, reason));
                None
            }
        }
    }
}

impl Default for AnchorPayslipParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PayslipParser for AnchorPayslipParser {
    fn parse(&self, text: &str) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!("Parsing payslip from {} characters of text", text.len());

        let period = self.resolve_period(text, &mut warnings)?;
        let lines = split_lines(text);

        let mut items = Vec::new();
        let scanned = self.extract_items(&lines, &mut items, &mut warnings);
        let section_totals = self.extract_section_totals(&lines, &mut warnings);

        let net_amount = self.labeled_amount(&lines, &self.sections.net_pay, &mut warnings);
        if net_amount.is_none() {
            warnings.push(format!("could not find '{}'", self.sections.net_pay));
        }

        let findings = self.validator.validate_sections(&items, &section_totals, &scanned);

        let mut parts = RecordParts::new(period);
        parts.net_amount = net_amount;
        parts.total_imponible = self.labeled_amount(&lines, &self.sections.total_imponible, &mut warnings);
        parts.total_tributable = self.labeled_amount(&lines, &self.sections.total_tributable, &mut warnings);
        parts.section_totals = section_totals;
        parts.items = items;
        parts.findings = findings;
        parts.warnings = warnings;

        let record = assemble(parts);

        debug!(
            "Extracted payslip {} with {} items, valid={}",
            record.key(),
            record.items.len(),
            record.is_valid()
        );

        Ok(ExtractionResult {
            record,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
