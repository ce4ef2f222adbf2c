//! Payslip data models: pay period, line items, section totals and the
//! assembled record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spanish month names, January first.
pub const SPANISH_MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

const UNKNOWN_KEY: &str = "unknown";

/// Reporting period of a payslip (one calendar month).
///
/// Serialized as its canonical key, `YYYY-MM`, or `unknown` for the
/// sentinel period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PayPeriod {
    /// Calendar year (0 for the unknown sentinel).
    pub year: i32,
    /// Month number, 1-12 (0 for the unknown sentinel).
    pub month: u32,
}

impl PayPeriod {
    /// Create a period, returning `None` for an invalid month or year.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if year <= 0 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The explicit sentinel for documents whose period could not be resolved.
    pub const fn unknown() -> Self {
        Self { year: 0, month: 0 }
    }

    pub fn is_unknown(&self) -> bool {
        self.year == 0 && self.month == 0
    }

    /// Canonical `YYYY-MM` key.
    pub fn key(&self) -> String {
        if self.is_unknown() {
            UNKNOWN_KEY.to_string()
        } else {
            format!("{:04}-{:02}", self.year, self.month)
        }
    }

    /// Human-readable label such as `Marzo 2024`.
    pub fn label(&self) -> String {
        match self.month.checked_sub(1).and_then(|i| SPANISH_MONTHS.get(i as usize)) {
            Some(name) if !self.is_unknown() => format!("{} {}", name, self.year),
            _ => "Desconocido".to_string(),
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for PayPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(UNKNOWN_KEY) {
            return Ok(Self::unknown());
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid period key: {}", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in period key: {}", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in period key: {}", s))?;

        Self::new(year, month).ok_or_else(|| format!("period out of range: {}", s))
    }
}

impl From<PayPeriod> for String {
    fn from(period: PayPeriod) -> Self {
        period.key()
    }
}

impl TryFrom<String> for PayPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The four known payslip sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Taxable earnings (haberes afectos).
    EarningsTaxable,
    /// Exempt earnings (haberes exentos).
    EarningsExempt,
    /// Mandatory withholdings (descuentos legales).
    LegalDeduction,
    /// Miscellaneous withholdings (otros descuentos).
    OtherDeduction,
}

impl SectionKind {
    /// All sections in document order.
    pub const ALL: [SectionKind; 4] = [
        SectionKind::EarningsTaxable,
        SectionKind::EarningsExempt,
        SectionKind::LegalDeduction,
        SectionKind::OtherDeduction,
    ];

    pub fn is_deduction(&self) -> bool {
        matches!(self, SectionKind::LegalDeduction | SectionKind::OtherDeduction)
    }

    pub fn display(&self) -> &'static str {
        match self {
            SectionKind::EarningsTaxable => "taxable earnings",
            SectionKind::EarningsExempt => "exempt earnings",
            SectionKind::LegalDeduction => "legal deductions",
            SectionKind::OtherDeduction => "other deductions",
        }
    }
}

/// Deduction category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Pension fund contribution (AFP).
    PensionFund,
    /// Health insurance (Fonasa / Isapre).
    Health,
    /// Income tax withholding.
    IncomeTax,
    /// Unemployment insurance (seguro de cesantía).
    Unemployment,
    /// Anything else.
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::PensionFund,
        Category::Health,
        Category::IncomeTax,
        Category::Unemployment,
        Category::Other,
    ];

    pub fn display(&self) -> &'static str {
        match self {
            Category::PensionFund => "pension_fund",
            Category::Health => "health",
            Category::IncomeTax => "income_tax",
            Category::Unemployment => "unemployment",
            Category::Other => "other",
        }
    }
}

/// Why a raw amount token was not accepted as money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountRejection {
    /// A long plain digit run (folio, account or RUT number).
    IdentifierLike,
    /// Parsed value exceeds the per-item ceiling.
    AboveCeiling,
    /// No digits, or not representable as a decimal.
    Unparseable,
}

impl fmt::Display for AmountRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            AmountRejection::IdentifierLike => "looks like an identifier, not an amount",
            AmountRejection::AboveCeiling => "exceeds the plausible amount ceiling",
            AmountRejection::Unparseable => "not a number",
        };
        f.write_str(reason)
    }
}

/// A single earnings or deduction line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Label as printed on the document.
    pub label: String,

    /// Normalized amount, never negative. Zero when the token was rejected.
    pub amount: Decimal,

    /// Section the line was found in.
    pub section: SectionKind,

    /// Category, only for deduction items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    /// Set when the raw amount failed plausibility checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<AmountRejection>,
}

/// Total claimed by the document for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTotal {
    pub section: SectionKind,
    pub stated_total: Decimal,
}

/// Outcome of cross-checking one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub section: SectionKind,
    pub summed_amount: Decimal,
    pub stated_amount: Decimal,
    pub within_tolerance: bool,
}

impl ValidationFinding {
    /// Absolute difference between summed and stated amounts.
    pub fn difference(&self) -> Decimal {
        (self.summed_amount - self.stated_amount).abs()
    }
}

/// One processed payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayslipRecord {
    /// Reporting period; identifies the record in the store.
    pub period: PayPeriod,

    /// Taxable plus exempt earnings, from the stated section totals.
    pub gross_amount: Decimal,

    /// Net pay (líquido a pagar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount: Option<Decimal>,

    /// Total imponible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_imponible: Option<Decimal>,

    /// Total tributable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tributable: Option<Decimal>,

    /// Totals stated by the document, one per section that has one.
    #[serde(default)]
    pub section_totals: Vec<SectionTotal>,

    /// Extracted line items, grouped by section; document order within each.
    #[serde(default)]
    pub items: Vec<LineItem>,

    /// Validation findings, one per validated section.
    #[serde(default)]
    pub findings: Vec<ValidationFinding>,

    /// Notes about anomalies encountered during extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PayslipRecord {
    /// Store key of this record.
    pub fn key(&self) -> String {
        self.period.key()
    }

    /// True when every finding is within tolerance.
    pub fn is_valid(&self) -> bool {
        self.findings.iter().all(|f| f.within_tolerance)
    }

    /// Items belonging to one section.
    pub fn items_in(&self, section: SectionKind) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(move |i| i.section == section)
    }

    /// Items whose amount was rejected.
    pub fn rejected_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|i| i.rejection.is_some())
    }

    /// Stated total for a section, if the document has one.
    pub fn stated_total(&self, section: SectionKind) -> Option<Decimal> {
        self.section_totals
            .iter()
            .find(|t| t.section == section)
            .map(|t| t.stated_total)
    }

    /// Stated legal plus other deductions.
    pub fn total_deductions(&self) -> Decimal {
        [SectionKind::LegalDeduction, SectionKind::OtherDeduction]
            .iter()
            .filter_map(|s| self.stated_total(*s))
            .sum()
    }

    /// Sum of deduction items per category. Every category is present.
    pub fn category_totals(&self) -> BTreeMap<Category, Decimal> {
        let mut totals: BTreeMap<Category, Decimal> =
            Category::ALL.iter().map(|c| (*c, Decimal::ZERO)).collect();

        for item in &self.items {
            if let Some(category) = item.category {
                *totals.entry(category).or_default() += item.amount;
            }
        }

        totals
    }

    /// Sum of deduction items in one category.
    pub fn category_total(&self, category: Category) -> Decimal {
        self.items
            .iter()
            .filter(|i| i.category == Some(category))
            .map(|i| i.amount)
            .sum()
    }

    /// Net pay per working hour, for a given weekly schedule.
    pub fn net_hourly_rate(&self, weekly_hours: f64) -> Option<Decimal> {
        let net = self.net_amount?;
        let weekly = Decimal::try_from(weekly_hours).ok()?;
        if weekly <= Decimal::ZERO {
            return None;
        }
        let monthly = weekly * Decimal::from(52) / Decimal::from(12);
        Some((net / monthly).round_dp(0))
    }
}
