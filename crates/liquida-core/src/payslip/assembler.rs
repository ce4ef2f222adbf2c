//! Record assembly.

use rust_decimal::Decimal;

use crate::models::payslip::{LineItem, PayPeriod, PayslipRecord, SectionTotal, ValidationFinding};

/// Everything extracted from one document, before assembly.
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub period: PayPeriod,
    pub net_amount: Option<Decimal>,
    pub total_imponible: Option<Decimal>,
    pub total_tributable: Option<Decimal>,
    pub section_totals: Vec<SectionTotal>,
    pub items: Vec<LineItem>,
    pub findings: Vec<ValidationFinding>,
    pub warnings: Vec<String>,
}

impl RecordParts {
    /// Empty parts for a period.
    pub fn new(period: PayPeriod) -> Self {
        Self {
            period,
            net_amount: None,
            total_imponible: None,
            total_tributable: None,
            section_totals: Vec::new(),
            items: Vec::new(),
            findings: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Combine extracted parts into a record.
///
/// Gross is the sum of the stated taxable and exempt earnings totals, not of
/// the earnings items, so partially extracted sections still yield the
/// document's own figure.
pub fn assemble(parts: RecordParts) -> PayslipRecord {
    let gross_amount = parts
        .section_totals
        .iter()
        .filter(|t| !t.section.is_deduction())
        .map(|t| t.stated_total)
        .sum();

    PayslipRecord {
        period: parts.period,
        gross_amount,
        net_amount: parts.net_amount,
        total_imponible: parts.total_imponible,
        total_tributable: parts.total_tributable,
        section_totals: parts.section_totals,
        items: parts.items,
        findings: parts.findings,
        warnings: parts.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payslip::SectionKind;
    use pretty_assertions::assert_eq;

    fn total(section: SectionKind, amount: i64) -> SectionTotal {
        SectionTotal {
            section,
            stated_total: Decimal::from(amount),
        }
    }

    #[test]
    fn test_gross_from_stated_totals() {
        let mut parts = RecordParts::new(PayPeriod::new(2024, 3).unwrap());
        parts.section_totals = vec![
            total(SectionKind::EarningsTaxable, 1_200_000),
            total(SectionKind::EarningsExempt, 80_000),
            total(SectionKind::LegalDeduction, 250_000),
        ];
        // A single partially extracted earnings item does not change gross.
        parts.items = vec![LineItem {
            label: "Sueldo base".to_string(),
            amount: Decimal::from(900_000),
            section: SectionKind::EarningsTaxable,
            category: None,
            rejection: None,
        }];

        let record = assemble(parts);
        assert_eq!(record.gross_amount, Decimal::from(1_280_000));
        assert_eq!(record.key(), "2024-03");
        assert_eq!(
            record.stated_total(SectionKind::EarningsExempt),
            Some(Decimal::from(80_000))
        );
    }

    #[test]
    fn test_gross_without_earnings_totals() {
        let record = assemble(RecordParts::new(PayPeriod::unknown()));
        assert_eq!(record.gross_amount, Decimal::ZERO);
        assert!(record.is_valid());
    }
}
