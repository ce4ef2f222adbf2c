//! Anchor-delimited section scanning and labeled totals.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::models::payslip::SectionKind;

use super::amounts::{AmountExtractor, AmountNormalizer, NormalizedAmount};
use super::patterns::{ITEM_LINE, LEADING_AMOUNT};
use super::text::fold;
use super::{ExtractionMatch, FieldExtractor};

/// Anchors delimiting one section and locating its stated total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionAnchor {
    /// Section header text.
    pub start: String,
    /// Line text that closes the section.
    pub end: String,
    /// Label of the stated section total.
    pub total: String,
}

impl SectionAnchor {
    pub fn new(start: impl Into<String>, end: impl Into<String>, total: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            total: total.into(),
        }
    }
}

/// A candidate line item before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub label: String,
    pub amount: NormalizedAmount,
}

/// Outcome of scanning the lines for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionScan {
    pub section: SectionKind,
    /// The start anchor was found.
    pub found: bool,
    /// The end anchor closed the section.
    pub terminated: bool,
    pub items: Vec<RawItem>,
}

/// Parse a `label ... amount` line.
pub fn parse_item_line(line: &str, normalizer: &AmountNormalizer) -> Option<RawItem> {
    let caps = ITEM_LINE.captures(line)?;
    let label = caps["label"]
        .trim()
        .trim_end_matches([':', '.', '$'])
        .trim_end()
        .to_string();

    Some(RawItem {
        label,
        amount: normalizer.normalize(&caps["amount"]),
    })
}

/// Collect the item lines strictly between a section's start and end anchors.
///
/// Capture begins after the first line containing the start anchor that
/// does not itself contain the end anchor, and stops at the first line
/// containing the end anchor. Without an end anchor, capture still stops at
/// the first line containing one of `stops` (other sections' anchors, net
/// pay and the like), leaving the scan unterminated. Lines with a genuine
/// zero amount or a label no longer than `min_label_length` are skipped;
/// rejected amounts are kept.
pub fn extract_section(
    lines: &[&str],
    section: SectionKind,
    anchor: &SectionAnchor,
    stops: &[&str],
    normalizer: &AmountNormalizer,
    min_label_length: usize,
) -> SectionScan {
    let start = fold(&anchor.start);
    let end = fold(&anchor.end);
    let stops: Vec<String> = stops.iter().map(|s| fold(s)).filter(|s| !s.is_empty()).collect();

    let mut scan = SectionScan {
        section,
        found: false,
        terminated: false,
        items: Vec::new(),
    };

    for line in lines {
        let folded = fold(line);

        if !scan.found {
            if folded.contains(&start) && !folded.contains(&end) {
                trace!("Section {:?} starts at '{}'", section, line);
                scan.found = true;
            }
            continue;
        }

        if folded.contains(&end) {
            scan.terminated = true;
            break;
        }
        if let Some(stop) = stops.iter().find(|s| folded.contains(s.as_str())) {
            debug!("Section {:?} cut short by '{}'", section, stop);
            break;
        }

        let Some(item) = parse_item_line(line, normalizer) else {
            continue;
        };

        if item.label.chars().count() <= min_label_length {
            trace!("Skipping short label '{}'", item.label);
            continue;
        }
        if !item.amount.is_rejected() && item.amount.value.is_zero() {
            continue;
        }

        scan.items.push(item);
    }

    debug!(
        "Section {:?}: found={}, terminated={}, {} items",
        section,
        scan.found,
        scan.terminated,
        scan.items.len()
    );

    scan
}

/// Find the amount printed after a label.
///
/// The first line containing the label wins. The amount is the first token
/// after the label on that line, or a leading token on the next line when
/// the label line has none.
pub fn find_labeled_amount(
    lines: &[&str],
    label: &str,
    extractor: &AmountExtractor,
) -> Option<ExtractionMatch<NormalizedAmount>> {
    let label = fold(label);
    if label.is_empty() {
        return None;
    }

    let idx = lines.iter().position(|l| fold(l).contains(&label))?;
    let folded = fold(lines[idx]);
    let after = folded.find(&label).map(|pos| &folded[pos + label.len()..])?;

    if let Some(found) = extractor.extract(after) {
        return Some(ExtractionMatch {
            confidence: 0.95,
            position: None,
            ..found
        });
    }

    let next = lines.get(idx + 1)?;
    let caps = LEADING_AMOUNT.captures(next)?;
    let token = caps.get(1)?.as_str();
    trace!("Label '{}' amount found on following line: {}", label, token);
    Some(ExtractionMatch::new(extractor.normalizer().normalize(token), 0.8, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payslip::AmountRejection;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn legal() -> SectionAnchor {
        SectionAnchor::new("DESCUENTOS LEGALES", "TOTAL DESCUENTOS LEGALES", "TOTAL DESCUENTOS LEGALES")
    }

    fn scan(text: &str) -> SectionScan {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        extract_section(
            &lines,
            SectionKind::LegalDeduction,
            &legal(),
            &["OTROS DESCUENTOS", "LIQUIDO A PAGAR"],
            &AmountNormalizer::new(),
            2,
        )
    }

    #[test]
    fn test_extracts_items_between_anchors() {
        let result = scan(
            "Sueldo base $800.000
             Descuentos Legales
             AFP Capital 11,44%  $100.000
             Salud Fonasa 7%  $50.000
             Total Descuentos Legales: $150.000
             Anticipo $20.000",
        );

        assert!(result.found);
        assert!(result.terminated);
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["AFP Capital 11,44%", "Salud Fonasa 7%"]);
        assert_eq!(result.items[0].amount.value, Decimal::from(100_000));
    }

    #[test]
    fn test_absent_section() {
        let result = scan("Sueldo base $800.000\nLíquido a pagar $650.000");
        assert!(!result.found);
        assert!(result.items.is_empty());
    }

    #[test]
    fn test_total_line_does_not_start_section() {
        let result = scan("TOTAL DESCUENTOS LEGALES $150.000\nAFP $100.000");
        assert!(!result.found);
    }

    #[test]
    fn test_unterminated_section_runs_to_end() {
        let result = scan("DESCUENTOS LEGALES\nAFP $100.000\nImpuesto único $12.000");
        assert!(result.found);
        assert!(!result.terminated);
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn test_unterminated_section_stops_at_next_anchor() {
        let result = scan(
            "DESCUENTOS LEGALES
             AFP Capital $100.000
             Salud Fonasa $50.000
             Otros Descuentos
             Anticipo $20.000
             Total Otros Descuentos $20.000
             Líquido a pagar $630.000",
        );
        assert!(result.found);
        assert!(!result.terminated);
        let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["AFP Capital", "Salud Fonasa"]);
    }

    #[test]
    fn test_skips_zero_and_short_labels() {
        let result = scan(
            "DESCUENTOS LEGALES
             Impuesto único 0
             AB 5.000
             Seguro Cesantía $3.000
             TOTAL DESCUENTOS LEGALES $3.000",
        );
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].label, "Seguro Cesantía");
    }

    #[test]
    fn test_keeps_rejected_amounts() {
        let result = scan(
            "DESCUENTOS LEGALES
             Folio interno 123456789
             TOTAL DESCUENTOS LEGALES $0",
        );
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].amount.value, Decimal::ZERO);
        assert_eq!(result.items[0].amount.rejection, Some(AmountRejection::IdentifierLike));
    }

    #[test]
    fn test_find_labeled_amount() {
        let lines = vec!["Total Haberes Afectos: $1.234.567", "Líquido a pagar: $ 987.654"];
        let extractor = AmountExtractor::default();

        let found = find_labeled_amount(&lines, "TOTAL HABERES AFECTOS", &extractor).unwrap();
        assert_eq!(found.value.value, Decimal::from(1_234_567));

        let found = find_labeled_amount(&lines, "LIQUIDO A PAGAR", &extractor).unwrap();
        assert_eq!(found.value.value, Decimal::from(987_654));

        assert!(find_labeled_amount(&lines, "TOTAL TRIBUTABLE", &extractor).is_none());
    }

    #[test]
    fn test_find_labeled_amount_on_next_line() {
        let lines = vec!["Líquido a pagar:", "$ 987.654", "Son: novecientos..."];
        let found = find_labeled_amount(&lines, "LIQUIDO A PAGAR", &AmountExtractor::default()).unwrap();
        assert_eq!(found.value.value, Decimal::from(987_654));
    }

    #[test]
    fn test_parse_item_line() {
        let item = parse_item_line("Gratificación Legal: $ 209.396", &AmountNormalizer::new()).unwrap();
        assert_eq!(item.label, "Gratificación Legal");
        assert_eq!(item.amount.value, Decimal::from(209_396));
        assert!(parse_item_line("HABERES AFECTOS", &AmountNormalizer::new()).is_none());
    }
}
