//! Configuration structures for the extraction pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LiquidaError, Result};
use crate::models::payslip::SectionKind;
use crate::payslip::rules::amounts::{DEFAULT_MAX_AMOUNT, DEFAULT_MAX_PLAIN_DIGITS};
use crate::payslip::rules::{RuleTable, SectionAnchor};

/// Main configuration for the liquida pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidaConfig {
    /// Amount normalization limits.
    pub amounts: AmountConfig,

    /// Period resolution.
    pub period: PeriodConfig,

    /// Section and total anchors.
    pub sections: SectionConfig,

    /// Deduction classification rules, evaluated in order.
    pub classification: RuleTable,

    /// Cross-check settings.
    pub validation: ValidationConfig,

    /// Derived report figures.
    pub report: ReportConfig,
}

/// Amount normalization limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountConfig {
    /// Plain digit runs longer than this are treated as identifiers.
    pub max_plain_digits: usize,

    /// Largest plausible amount for a single line.
    pub max_amount: Decimal,
}

impl Default for AmountConfig {
    fn default() -> Self {
        Self {
            max_plain_digits: DEFAULT_MAX_PLAIN_DIGITS,
            max_amount: Decimal::from(DEFAULT_MAX_AMOUNT),
        }
    }
}

/// What to do with a document whose period cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Reject the document with `PeriodUnresolved`.
    #[default]
    Reject,
    /// Assemble it under the `unknown` sentinel period.
    Sentinel,
}

/// Period resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    /// Earliest plausible year.
    pub min_year: i32,

    /// Latest plausible year.
    pub max_year: i32,

    /// Policy for unresolved periods.
    pub on_unresolved: UnresolvedPolicy,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            min_year: 2000,
            max_year: 2099,
            on_unresolved: UnresolvedPolicy::Reject,
        }
    }
}

/// Anchor texts. Matching ignores case and accents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub taxable_earnings: SectionAnchor,
    pub exempt_earnings: SectionAnchor,
    pub legal_deductions: SectionAnchor,
    pub other_deductions: SectionAnchor,

    /// Label of the net pay line.
    pub net_pay: String,

    /// Label of the total imponible line.
    pub total_imponible: String,

    /// Label of the total tributable line.
    pub total_tributable: String,

    /// Item labels must be longer than this many characters.
    pub min_label_length: usize,
}

impl SectionConfig {
    /// Anchors for one section.
    pub fn anchor(&self, section: SectionKind) -> &SectionAnchor {
        match section {
            SectionKind::EarningsTaxable => &self.taxable_earnings,
            SectionKind::EarningsExempt => &self.exempt_earnings,
            SectionKind::LegalDeduction => &self.legal_deductions,
            SectionKind::OtherDeduction => &self.other_deductions,
        }
    }

    /// Anchors that end an unterminated section: every anchor of the other
    /// sections plus the net pay, imponible and tributable labels.
    pub fn stop_anchors(&self, section: SectionKind) -> Vec<&str> {
        let mut stops: Vec<&str> = SectionKind::ALL
            .iter()
            .filter(|other| **other != section)
            .flat_map(|other| {
                let anchor = self.anchor(*other);
                [anchor.start.as_str(), anchor.end.as_str(), anchor.total.as_str()]
            })
            .collect();
        stops.extend([
            self.net_pay.as_str(),
            self.total_imponible.as_str(),
            self.total_tributable.as_str(),
        ]);
        stops.retain(|s| !s.trim().is_empty());
        stops
    }
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            taxable_earnings: SectionAnchor::new(
                "HABERES AFECTOS",
                "TOTAL HABERES AFECTOS",
                "TOTAL HABERES AFECTOS",
            ),
            exempt_earnings: SectionAnchor::new(
                "HABERES EXENTOS",
                "TOTAL HABERES EXENTOS",
                "TOTAL HABERES EXENTOS",
            ),
            legal_deductions: SectionAnchor::new(
                "DESCUENTOS LEGALES",
                "TOTAL DESCUENTOS LEGALES",
                "TOTAL DESCUENTOS LEGALES",
            ),
            other_deductions: SectionAnchor::new(
                "OTROS DESCUENTOS",
                "TOTAL OTROS DESCUENTOS",
                "TOTAL OTROS DESCUENTOS",
            ),
            net_pay: "LIQUIDO A PAGAR".to_string(),
            total_imponible: "TOTAL IMPONIBLE".to_string(),
            total_tributable: "TOTAL TRIBUTABLE".to_string(),
            min_label_length: 2,
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest accepted absolute difference between summed and stated totals.
    pub tolerance: Decimal,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::ONE,
        }
    }
}

/// Derived report figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Contract hours per week, for the hourly net rate.
    pub weekly_hours: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { weekly_hours: 44.0 }
    }
}

impl LiquidaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| LiquidaError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| LiquidaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "validation": { "tolerance": "5" }, "period": { "on_unresolved": "sentinel" } }"#;
        let config: LiquidaConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.validation.tolerance, Decimal::from(5));
        assert_eq!(config.period.on_unresolved, UnresolvedPolicy::Sentinel);
        assert_eq!(config.period.min_year, 2000);
        assert_eq!(config.amounts.max_plain_digits, 8);
        assert_eq!(config.sections.net_pay, "LIQUIDO A PAGAR");
        assert_eq!(config.classification.rules().len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LiquidaConfig::default();
        config.report.weekly_hours = 40.0;
        config.save(&path).unwrap();

        let loaded = LiquidaConfig::from_file(&path).unwrap();
        assert_eq!(loaded.report.weekly_hours, 40.0);
        assert_eq!(
            loaded.sections.anchor(SectionKind::OtherDeduction).start,
            "OTROS DESCUENTOS"
        );
    }

    #[test]
    fn test_stop_anchors_exclude_own_section() {
        let sections = SectionConfig::default();
        let stops = sections.stop_anchors(SectionKind::EarningsTaxable);

        assert!(stops.contains(&"HABERES EXENTOS"));
        assert!(stops.contains(&"TOTAL DESCUENTOS LEGALES"));
        assert!(stops.contains(&"LIQUIDO A PAGAR"));
        assert!(!stops.contains(&"HABERES AFECTOS"));
        assert!(!stops.contains(&"TOTAL HABERES AFECTOS"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = LiquidaConfig::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, LiquidaError::Io(_)));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ \"validation\": ").unwrap();
        let broken = LiquidaConfig::from_file(&path).unwrap_err();
        assert!(matches!(broken, LiquidaError::Config(_)));
        assert!(broken.to_string().starts_with("configuration error:"));
    }
}
