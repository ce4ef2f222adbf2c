//! Common regex patterns for payslip extraction.
//!
//! Patterns that look for words run against folded text (see
//! [`super::text::fold`]), so they only need to match uppercase ASCII.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Header: "Liquidación de sueldo Marzo 2024", "LIQUIDACION DE REMUNERACIONES MES DE MARZO DE 2024"
    pub static ref PERIOD_HEADER: Regex = Regex::new(
        r"LIQUIDACION\s+DE\s+(?:SUELDOS?|REMUNERACION(?:ES)?)\s+(?:(?:DEL\s+)?MES\s+DE\s+)?([A-Z]+)\s+(?:DEL?\s+)?(\d{4})\b"
    ).unwrap();

    // Standalone 4-digit year candidate
    pub static ref YEAR_TOKEN: Regex = Regex::new(
        r"\b(\d{4})\b"
    ).unwrap();

    // Alphabetic word in folded text
    pub static ref WORD: Regex = Regex::new(
        r"[A-Z]+"
    ).unwrap();

    // Raw amount token: digits with optional '.' / ',' separators
    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\d(?:[\d.,]*\d)?"
    ).unwrap();

    // Item line: a label containing a letter, followed by a trailing amount
    pub static ref ITEM_LINE: Regex = Regex::new(
        r"^(?P<label>.*?\p{L}.*?)[\s:]*\$?\s*(?P<amount>\d(?:[\d.,]*\d)?)\s*$"
    ).unwrap();

    // Leading amount on a continuation line: "$ 1.234.567"
    pub static ref LEADING_AMOUNT: Regex = Regex::new(
        r"^[\s:]*\$?\s*(\d(?:[\d.,]*\d)?)"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_header() {
        let caps = PERIOD_HEADER.captures("LIQUIDACION DE SUELDO MARZO 2024").unwrap();
        assert_eq!(&caps[1], "MARZO");
        assert_eq!(&caps[2], "2024");

        let caps = PERIOD_HEADER
            .captures("LIQUIDACION DE REMUNERACIONES MES DE JUNIO DE 2023")
            .unwrap();
        assert_eq!(&caps[1], "JUNIO");
        assert_eq!(&caps[2], "2023");
    }

    #[test]
    fn test_item_line() {
        let caps = ITEM_LINE.captures("AFP Capital 11,44%   $100.000").unwrap();
        assert_eq!(&caps["label"], "AFP Capital 11,44%");
        assert_eq!(&caps["amount"], "100.000");

        let caps = ITEM_LINE.captures("Sueldo Base: 850.000").unwrap();
        assert_eq!(&caps["label"], "Sueldo Base");
        assert_eq!(&caps["amount"], "850.000");

        assert!(ITEM_LINE.captures("$ 100.000").is_none());
        assert!(ITEM_LINE.captures("DESCUENTOS LEGALES").is_none());
    }

    #[test]
    fn test_amount_token() {
        let found: Vec<&str> = AMOUNT_TOKEN
            .find_iter("Total: $1.234.567. Folio 123456789")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["1.234.567", "123456789"]);
    }
}
