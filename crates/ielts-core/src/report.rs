//! Score reports with JSON persistence and markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::band::estimate_band;
use crate::model::Response;

/// Aggregate result of grading one response map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Points gained.
    pub raw: u32,
    /// Points available.
    pub max: u32,
    /// Grouped entries first, then ungrouped entries in question order.
    pub details: Vec<DetailEntry>,
}

impl ScoreReport {
    /// Fraction of available points gained, `0.0` when nothing is scorable.
    pub fn percentage(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.raw as f64 / self.max as f64
        }
    }

    /// Detail entry for a question key or group id.
    pub fn detail(&self, key: &str) -> Option<&DetailEntry> {
        self.details.iter().find(|d| d.key == key)
    }
}

/// Score for one question or answer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailEntry {
    /// Question key, or group id for grouped entries.
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub gained: u32,
    pub max: u32,
    /// What was submitted. For groups, the union of the group's selections.
    pub user: Option<Response>,
    /// Accepted values from the answer key, as written there.
    pub accepted: Vec<String>,
}

/// A graded practice attempt: score plus band, stamped for later comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAttempt {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub test_id: String,
    pub module: String,
    /// Estimated band, one decimal place by convention.
    pub band: f64,
    pub score: ScoreReport,
}

impl GradedAttempt {
    /// Stamp a score report and convert its raw score for `module`.
    pub fn new(test_id: impl Into<String>, module: impl Into<String>, score: ScoreReport) -> Self {
        let module = module.into();
        let band = estimate_band(&module, score.raw);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            test_id: test_id.into(),
            module,
            band,
            score,
        }
    }

    /// Save the attempt as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize attempt")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write attempt to {}", path.display()))?;
        Ok(())
    }

    /// Load an attempt from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt from {}", path.display()))?;
        let attempt: GradedAttempt =
            serde_json::from_str(&content).context("failed to parse attempt JSON")?;
        Ok(attempt)
    }

    /// Format the attempt as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**{} / {}:** {} of {} points ({:.1}%), estimated band {:.1}\n\n",
            self.test_id,
            self.module,
            self.score.raw,
            self.score.max,
            self.score.percentage() * 100.0,
            self.band
        ));

        if !self.score.details.is_empty() {
            md.push_str("| Question | Type | Answer | Accepted | Score |\n");
            md.push_str("|----------|------|--------|----------|-------|\n");
            for d in &self.score.details {
                let answer = d.user.as_ref().map(|u| u.to_string()).unwrap_or_default();
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {}/{} |\n",
                    d.key,
                    d.kind,
                    answer,
                    d.accepted.join(" / "),
                    d.gained,
                    d.max
                ));
            }
        }

        md
    }
}
