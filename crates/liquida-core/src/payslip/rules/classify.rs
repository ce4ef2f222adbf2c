//! Keyword rule table mapping deduction labels to categories.

use serde::{Deserialize, Serialize};

use crate::models::payslip::Category;

use super::text::fold;

/// One row of the rule table: any keyword hit assigns the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl ClassificationRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// True when the folded label contains any keyword.
    fn matches(&self, folded_label: &str) -> bool {
        self.keywords
            .iter()
            .map(|k| fold(k))
            .any(|k| !k.is_empty() && folded_label.contains(&k))
    }
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<ClassificationRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Append a rule, evaluated after the existing ones.
    pub fn push(&mut self, rule: ClassificationRule) {
        self.rules.push(rule);
    }

    /// Classify a deduction label. Unmatched labels are [`Category::Other`].
    pub fn classify(&self, label: &str) -> Category {
        let folded = fold(label);
        self.rules
            .iter()
            .find(|rule| rule.matches(&folded))
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(vec![
            ClassificationRule::new(Category::PensionFund, &["AFP", "PENSION", "PREVISION"]),
            ClassificationRule::new(
                Category::Health,
                &[
                    "SALUD",
                    "ISAPRE",
                    "FONASA",
                    "COLMENA",
                    "CONSALUD",
                    "BANMEDICA",
                    "CRUZ BLANCA",
                    "VIDA TRES",
                    "MASVIDA",
                ],
            ),
            ClassificationRule::new(Category::IncomeTax, &["IMPUESTO", "IMPTO", "TRIBUTARIO"]),
            ClassificationRule::new(Category::Unemployment, &["CESANTIA", "AFC"]),
        ])
    }
}
