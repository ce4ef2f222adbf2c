//! Cross-checks of summed line items against stated section totals.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::config::ValidationConfig;
use crate::models::payslip::{LineItem, SectionKind, SectionTotal, ValidationFinding};

/// Compares item sums with stated totals within an absolute tolerance.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    tolerance: Decimal,
}

impl ValidationEngine {
    /// Create an engine with a tolerance of one currency unit.
    pub fn new() -> Self {
        Self {
            tolerance: Decimal::ONE,
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new().with_tolerance(config.tolerance)
    }

    /// Set the absolute tolerance.
    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Check one section.
    pub fn validate_section(
        &self,
        section: SectionKind,
        items: &[LineItem],
        stated: Decimal,
    ) -> ValidationFinding {
        let summed: Decimal = items
            .iter()
            .filter(|i| i.section == section)
            .map(|i| i.amount)
            .sum();

        ValidationFinding {
            section,
            summed_amount: summed,
            stated_amount: stated,
            within_tolerance: (summed - stated).abs() <= self.tolerance,
        }
    }

    /// One finding per scanned section that also has a stated total.
    ///
    /// Sections missing from `scanned` (start anchor absent) or without a
    /// stated total are skipped.
    pub fn validate_sections(
        &self,
        items: &[LineItem],
        totals: &[SectionTotal],
        scanned: &[SectionKind],
    ) -> Vec<ValidationFinding> {
        SectionKind::ALL
            .iter()
            .filter(|s| scanned.contains(s))
            .filter_map(|section| {
                let Some(total) = totals.iter().find(|t| t.section == *section) else {
                    debug!("No stated total for {}, skipping validation", section.display());
                    return None;
                };

                let finding = self.validate_section(*section, items, total.stated_total);
                if !finding.within_tolerance {
                    warn!(
                        "Mismatch in {}: items sum to {}, document states {}",
                        section.display(),
                        finding.summed_amount,
                        finding.stated_amount
                    );
                }
                Some(finding)
            })
            .collect()
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}
