//! Pay period resolution.

use tracing::debug;

use crate::error::ExtractionError;
use crate::models::config::PeriodConfig;
use crate::models::payslip::PayPeriod;

use super::patterns::{PERIOD_HEADER, WORD, YEAR_TOKEN};
use super::text::{fold, split_lines};
use super::{ExtractionMatch, FieldExtractor};

/// Map a folded (uppercase, unaccented) word to its month number.
pub fn month_from_name(word: &str) -> Option<u32> {
    let month = match word {
        "ENERO" | "JANUARY" => 1,
        "FEBRERO" | "FEBRUARY" => 2,
        "MARZO" | "MARCH" => 3,
        "ABRIL" | "APRIL" => 4,
        "MAYO" | "MAY" => 5,
        "JUNIO" | "JUNE" => 6,
        "JULIO" | "JULY" => 7,
        "AGOSTO" | "AUGUST" => 8,
        "SEPTIEMBRE" | "SETIEMBRE" | "SEPTEMBER" => 9,
        "OCTUBRE" | "OCTOBER" => 10,
        "NOVIEMBRE" | "NOVEMBER" => 11,
        "DICIEMBRE" | "DECEMBER" => 12,
        _ => return None,
    };
    Some(month)
}

/// Month name extractor. Positions refer to the folded text.
pub struct MonthExtractor;

impl MonthExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MonthExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for MonthExtractor {
    type Output = ExtractionMatch<u32>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let folded = fold(text);
        WORD.find_iter(&folded)
            .filter_map(|m| {
                month_from_name(m.as_str()).map(|month| {
                    ExtractionMatch::new(month, 0.7, m.as_str()).with_position(m.start(), m.end())
                })
            })
            .collect()
    }
}

/// Resolves the reporting period of a document.
#[derive(Debug, Clone)]
pub struct PeriodResolver {
    /// Earliest plausible year.
    min_year: i32,
    /// Latest plausible year.
    max_year: i32,
}

impl PeriodResolver {
    /// Create a resolver accepting years 2000-2099.
    pub fn new() -> Self {
        Self {
            min_year: 2000,
            max_year: 2099,
        }
    }

    pub fn from_config(config: &PeriodConfig) -> Self {
        Self {
            min_year: config.min_year,
            max_year: config.max_year,
        }
    }

    /// Set the plausible year range (inclusive).
    pub fn with_year_range(mut self, min_year: i32, max_year: i32) -> Self {
        self.min_year = min_year;
        self.max_year = max_year;
        self
    }

    /// Resolve the period from the document header, falling back to the
    /// first month name and its nearest plausible year.
    pub fn resolve(&self, text: &str) -> Result<ExtractionMatch<PayPeriod>, ExtractionError> {
        let folded = fold(text);

        if let Some(found) = self.resolve_header(&folded) {
            debug!("Resolved period {} from header", found.value);
            return Ok(found);
        }

        let found = self.resolve_fallback(&folded)?;
        debug!("Resolved period {} from month keyword '{}'", found.value, found.source);
        Ok(found)
    }

    fn parse_year(&self, s: &str) -> Option<i32> {
        s.parse::<i32>()
            .ok()
            .filter(|y| (self.min_year..=self.max_year).contains(y))
    }

    fn resolve_header(&self, folded: &str) -> Option<ExtractionMatch<PayPeriod>> {
        PERIOD_HEADER.captures_iter(folded).find_map(|caps| {
            let month = month_from_name(&caps[1])?;
            let year = self.parse_year(&caps[2])?;
            let period = PayPeriod::new(year, month)?;
            let full_match = caps.get(0)?;
            Some(
                ExtractionMatch::new(period, 0.95, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            )
        })
    }

    fn resolve_fallback(&self, folded: &str) -> Result<ExtractionMatch<PayPeriod>, ExtractionError> {
        let lines = split_lines(folded);
        let months = MonthExtractor::new();

        let (line_idx, month) = lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| months.extract(line).map(|m| (i, m)))
            .ok_or_else(|| ExtractionError::PeriodUnresolved {
                reason: "no month name found".to_string(),
            })?;

        let year = self.nearest_year(&lines, line_idx, &month).ok_or_else(|| {
            ExtractionError::PeriodUnresolved {
                reason: format!(
                    "month '{}' found but no year between {} and {}",
                    month.source, self.min_year, self.max_year
                ),
            }
        })?;

        let period = PayPeriod::new(year, month.value).ok_or_else(|| ExtractionError::PeriodUnresolved {
            reason: format!("invalid period {}-{}", year, month.value),
        })?;

        Ok(ExtractionMatch::new(period, 0.7, lines[line_idx]))
    }

    /// Same line by character distance first, then outward by line distance,
    /// earlier lines winning ties.
    fn nearest_year(&self, lines: &[&str], line_idx: usize, month: &ExtractionMatch<u32>) -> Option<i32> {
        let month_pos = month.position.map(|(start, _)| start).unwrap_or(0);

        let same_line = YEAR_TOKEN
            .captures_iter(lines[line_idx])
            .filter_map(|caps| {
                let m = caps.get(1)?;
                let year = self.parse_year(m.as_str())?;
                Some((m.start().abs_diff(month_pos), year))
            })
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, year)| year);

        if same_line.is_some() {
            return same_line;
        }

        let first_year_in = |line: &str| {
            YEAR_TOKEN
                .captures_iter(line)
                .find_map(|caps| self.parse_year(&caps[1]))
        };

        for distance in 1..lines.len() {
            let before = line_idx.checked_sub(distance).and_then(|i| lines.get(i));
            if let Some(year) = before.and_then(|l| first_year_in(*l)) {
                return Some(year);
            }
            if let Some(year) = lines.get(line_idx + distance).and_then(|l| first_year_in(*l)) {
                return Some(year);
            }
        }

        None
    }
}

impl Default for PeriodResolver {
    fn default() -> Self {
        Self::new()
    }
}
