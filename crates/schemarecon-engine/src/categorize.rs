//! Severity buckets
//!
//! Each discrepancy is rendered to one line and filed under the tier fixed by
//! [`DiscrepancyKind::severity`](schemarecon_core::DiscrepancyKind::severity).

use schemarecon_core::{DiscrepancySet, Severity, SourceLabels};
use serde::{Deserialize, Serialize};

/// Human-readable discrepancy lines grouped by severity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Categories {
    #[serde(default)]
    pub critical: Vec<String>,
    #[serde(default)]
    pub warning: Vec<String>,
    #[serde(default)]
    pub info: Vec<String>,
}

impl Categories {
    pub fn bucket(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Critical => &self.critical,
            Severity::Warning => &self.warning,
            Severity::Info => &self.info,
        }
    }

    /// Empty every bucket whose severity is not listed
    pub fn retain(&mut self, sections: &[Severity]) {
        for severity in Severity::ALL {
            if sections.contains(&severity) {
                continue;
            }
            match severity {
                Severity::Critical => self.critical.clear(),
                Severity::Warning => self.warning.clear(),
                Severity::Info => self.info.clear(),
            }
        }
    }

    pub fn total(&self) -> usize {
        self.critical.len() + self.warning.len() + self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Sort discrepancies into severity buckets
pub fn categorize(discrepancies: &DiscrepancySet, labels: &SourceLabels) -> Categories {
    let mut categories = Categories::default();

    for discrepancy in discrepancies {
        let line = discrepancy.describe(labels);
        match discrepancy.severity() {
            Severity::Critical => categories.critical.push(line),
            Severity::Warning => categories.warning.push(line),
            Severity::Info => categories.info.push(line),
        }
    }

    categories
}
