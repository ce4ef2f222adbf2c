//! Amount normalization for payslip figures.
//!
//! Tokens arrive in mixed styles: `$1.234.567`, `1.234.567,89`, `1234,56`,
//! `1,234.56` or a bare digit run. Separators are resolved by a fixed,
//! ordered rule list:
//!
//! 1. everything but digits, `.` and `,` is stripped;
//! 2. with both separators present, the right-most one is the decimal marker
//!    and every other separator is dropped;
//! 3. a single `,` is a decimal marker, several are thousands separators;
//! 4. several `.` are thousands separators;
//! 5. a single `.` followed by exactly three digits (integer part 1-3 digits,
//!    no leading zero) groups thousands, any other single `.` is decimal.
//!
//! Plausibility filters then reject long plain digit runs (folio, account
//! and RUT numbers) and values above a per-item ceiling. Rejected tokens
//! normalize to zero and carry the reason.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::trace;

use crate::models::config::AmountConfig;
use crate::models::payslip::AmountRejection;

use super::patterns::AMOUNT_TOKEN;
use super::{ExtractionMatch, FieldExtractor};

/// Default longest plain digit run accepted as money.
pub const DEFAULT_MAX_PLAIN_DIGITS: usize = 8;

/// Default ceiling for a single amount.
pub const DEFAULT_MAX_AMOUNT: i64 = 15_000_000;

/// Result of normalizing one raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedAmount {
    /// Normalized value; zero when rejected.
    pub value: Decimal,
    /// Why the token was rejected, if it was.
    pub rejection: Option<AmountRejection>,
}

impl NormalizedAmount {
    fn accepted(value: Decimal) -> Self {
        Self {
            value,
            rejection: None,
        }
    }

    fn rejected(reason: AmountRejection) -> Self {
        Self {
            value: Decimal::ZERO,
            rejection: Some(reason),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Canonical token form: no grouping, `,` as decimal marker.
    ///
    /// Normalizing this string again yields the same value.
    pub fn canonical(&self) -> String {
        self.value.to_string().replace('.', ",")
    }
}

/// Converts raw amount tokens into decimals.
#[derive(Debug, Clone)]
pub struct AmountNormalizer {
    /// Plain digit runs longer than this are identifiers.
    max_plain_digits: usize,
    /// Values above this are implausible for a single line.
    max_amount: Decimal,
}

impl AmountNormalizer {
    /// Create a normalizer with default limits.
    pub fn new() -> Self {
        Self {
            max_plain_digits: DEFAULT_MAX_PLAIN_DIGITS,
            max_amount: Decimal::from(DEFAULT_MAX_AMOUNT),
        }
    }

    pub fn from_config(config: &AmountConfig) -> Self {
        Self {
            max_plain_digits: config.max_plain_digits,
            max_amount: config.max_amount,
        }
    }

    /// Set the longest plain digit run accepted as money.
    pub fn with_max_plain_digits(mut self, digits: usize) -> Self {
        self.max_plain_digits = digits;
        self
    }

    /// Set the per-item ceiling.
    pub fn with_max_amount(mut self, amount: Decimal) -> Self {
        self.max_amount = amount;
        self
    }

    /// Same identifier filter, no ceiling. Stated totals and net pay may
    /// legitimately exceed what a single item can.
    pub fn for_totals(&self) -> Self {
        self.clone().with_max_amount(Decimal::MAX)
    }

    /// Normalize one raw token.
    pub fn normalize(&self, token: &str) -> NormalizedAmount {
        let cleaned: String = token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .collect();

        let digit_count = cleaned.chars().filter(|c| c.is_ascii_digit()).count();
        if digit_count == 0 {
            return NormalizedAmount::rejected(AmountRejection::Unparseable);
        }

        let has_separator = cleaned.contains([',', '.']);
        if !has_separator && digit_count > self.max_plain_digits {
            trace!("Rejecting {:?}: {} plain digits", token, digit_count);
            return NormalizedAmount::rejected(AmountRejection::IdentifierLike);
        }

        let value = match Decimal::from_str(&resolve_separators(&cleaned)) {
            Ok(v) => v,
            Err(_) => return NormalizedAmount::rejected(AmountRejection::Unparseable),
        };

        if value > self.max_amount {
            trace!("Rejecting {:?}: {} above ceiling {}", token, value, self.max_amount);
            return NormalizedAmount::rejected(AmountRejection::AboveCeiling);
        }

        NormalizedAmount::accepted(value)
    }
}

impl Default for AmountNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite a cleaned token (digits, `.`, `,`) into `Decimal` syntax.
fn resolve_separators(cleaned: &str) -> String {
    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    match (dots, commas) {
        (0, 0) => cleaned.to_string(),
        (d, c) if d > 0 && c > 0 => {
            let decimal_at = cleaned.rfind(['.', ',']).unwrap_or(0);
            cleaned
                .char_indices()
                .filter_map(|(i, ch)| match ch {
                    '.' | ',' if i == decimal_at => Some('.'),
                    '.' | ',' => None,
                    digit => Some(digit),
                })
                .collect()
        }
        (0, 1) => cleaned.replace(',', "."),
        (0, _) => cleaned.replace(',', ""),
        (1, 0) if is_dot_grouping(cleaned) => cleaned.replace('.', ""),
        (1, 0) => cleaned.to_string(),
        _ => cleaned.replace('.', ""),
    }
}

/// `100.000` groups thousands, `0.500` and `12.5` do not.
fn is_dot_grouping(cleaned: &str) -> bool {
    match cleaned.split_once('.') {
        Some((int, frac)) => {
            (1..=3).contains(&int.len()) && !int.starts_with('0') && frac.len() == 3
        }
        None => false,
    }
}

/// Amount token extractor.
#[derive(Debug, Clone, Default)]
pub struct AmountExtractor {
    normalizer: AmountNormalizer,
}

impl AmountExtractor {
    pub fn new(normalizer: AmountNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &AmountNormalizer {
        &self.normalizer
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<NormalizedAmount>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        AMOUNT_TOKEN
            .find_iter(text)
            .map(|m| {
                let amount = self.normalizer.normalize(m.as_str());
                let confidence = if amount.is_rejected() { 0.1 } else { 0.9 };
                ExtractionMatch::new(amount, confidence, m.as_str()).with_position(m.start(), m.end())
            })
            .collect()
    }
}

/// Format an amount in peso style (`$ 1.234.567`, `$ 1.234,50`).
pub fn format_clp_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    if decimal_part.trim_end_matches('0').is_empty() {
        format!("{}$ {}", sign, grouped)
    } else {
        format!("{}$ {},{}", sign, grouped, decimal_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn value(token: &str) -> Decimal {
        AmountNormalizer::new().normalize(token).value
    }

    #[test]
    fn test_thousands_dots() {
        assert_eq!(value("1.234.567"), dec("1234567"));
        assert_eq!(value("$1.234.567"), dec("1234567"));
        assert_eq!(value("$ 100.000"), dec("100000"));
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(value("1234,56"), dec("1234.56"));
        assert_eq!(value("1.234.567,89"), dec("1234567.89"));
    }

    #[test]
    fn test_rightmost_separator_wins() {
        assert_eq!(value("1,234.56"), dec("1234.56"));
        assert_eq!(value("1.234,5"), dec("1234.5"));
    }

    #[test]
    fn test_several_commas_group_thousands() {
        assert_eq!(value("1,234,567"), dec("1234567"));
    }

    #[test]
    fn test_single_dot() {
        assert_eq!(value("12.5"), dec("12.5"));
        assert_eq!(value("0.500"), dec("0.5"));
        assert_eq!(value("1234.567"), dec("1234.567"));
        assert_eq!(value("850"), dec("850"));
    }

    #[test]
    fn test_rejects_identifier_like() {
        let n = AmountNormalizer::new().normalize("123456789");
        assert_eq!(n.value, Decimal::ZERO);
        assert_eq!(n.rejection, Some(AmountRejection::IdentifierLike));

        // A separator makes it a candidate amount again, subject to the ceiling.
        let n = AmountNormalizer::new().normalize("123.456.789");
        assert_eq!(n.rejection, Some(AmountRejection::AboveCeiling));
    }

    #[test]
    fn test_rejects_above_ceiling() {
        let n = AmountNormalizer::new().normalize("$ 15.000.001");
        assert_eq!(n.rejection, Some(AmountRejection::AboveCeiling));
        assert!(AmountNormalizer::new().normalize("$ 15.000.000").rejection.is_none());
    }

    #[test]
    fn test_totals_skip_ceiling_but_keep_identifier_filter() {
        let totals = AmountNormalizer::new().for_totals();
        assert_eq!(totals.normalize("$ 16.000.000").value, Decimal::from(16_000_000));
        assert_eq!(
            totals.normalize("160000000").rejection,
            Some(AmountRejection::IdentifierLike)
        );
    }

    #[test]
    fn test_rejects_unparseable() {
        let n = AmountNormalizer::new().normalize("$ --");
        assert_eq!(n.rejection, Some(AmountRejection::Unparseable));
    }

    #[test]
    fn test_configurable_limits() {
        let normalizer = AmountNormalizer::new()
            .with_max_plain_digits(10)
            .with_max_amount(dec("2000000000"));
        assert_eq!(normalizer.normalize("123456789").value, dec("123456789"));
    }

    #[test]
    fn test_canonical() {
        let n = AmountNormalizer::new().normalize("1.234,56");
        assert_eq!(n.canonical(), "1234,56");
        let n = AmountNormalizer::new().normalize("1.234");
        assert_eq!(n.canonical(), "1234");
    }

    #[test]
    fn test_extract_all_amounts() {
        let extractor = AmountExtractor::default();
        let results = extractor.extract_all("Folio 123456789 Total $1.234.567");

        assert_eq!(results.len(), 2);
        assert!(results[0].value.is_rejected());
        assert_eq!(results[1].value.value, dec("1234567"));
        assert_eq!(results[1].source, "1.234.567");
    }

    #[test]
    fn test_format_clp_amount() {
        assert_eq!(format_clp_amount(dec("1234567")), "$ 1.234.567");
        assert_eq!(format_clp_amount(dec("1234.5")), "$ 1.234,50");
        assert_eq!(format_clp_amount(dec("0")), "$ 0");
        assert_eq!(format_clp_amount(dec("999")), "$ 999");
    }

    proptest! {
        #[test]
        fn normalize_is_deterministic(token in "[0-9.,$ ]{0,16}") {
            let normalizer = AmountNormalizer::new();
            prop_assert_eq!(normalizer.normalize(&token), normalizer.normalize(&token));
        }

        #[test]
        fn normalize_is_idempotent(token in "[0-9.,$ ]{0,16}") {
            let normalizer = AmountNormalizer::new();
            let once = normalizer.normalize(&token);
            let twice = normalizer.normalize(&once.canonical());
            prop_assert_eq!(once.value, twice.value);
        }

        #[test]
        fn long_plain_digit_runs_are_rejected(token in "[1-9][0-9]{8,20}") {
            let n = AmountNormalizer::new().normalize(&token);
            prop_assert_eq!(n.value, Decimal::ZERO);
            prop_assert_eq!(n.rejection, Some(AmountRejection::IdentifierLike));
        }

        #[test]
        fn dot_grouped_integers_round_trip(n in 1_000i64..15_000_000) {
            let grouped = format_clp_amount(Decimal::from(n));
            prop_assert_eq!(value(&grouped), Decimal::from(n));
        }

        #[test]
        fn decimal_comma_tokens_parse(int in 0i64..1_000_000, cents in 0u32..100) {
            let token = format!("{},{:02}", int, cents);
            let expected = Decimal::from(int) + Decimal::new(cents as i64, 2);
            prop_assert_eq!(value(&token), expected);
        }
    }
}
