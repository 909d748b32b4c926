//! Per-build success/failure tally and the end-of-run table.

use crate::outcome::BuildOutcome;
use serde::Serialize;
use std::fmt::Write as _;

/// Counts for one build name.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TallyRow {
    pub build_name: String,
    pub success: u32,
    pub failure: u32,
}

/// Counts for every build name seen, in first-seen order.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ResultTally {
    rows: Vec<TallyRow>,
}

impl ResultTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &BuildOutcome) {
        self.record_result(&outcome.build_name, outcome.succeeded());
    }

    pub fn record_result(&mut self, build_name: &str, succeeded: bool) {
        let idx = match self.rows.iter().position(|r| r.build_name == build_name) {
            Some(idx) => idx,
            None => {
                self.rows.push(TallyRow {
                    build_name: build_name.to_string(),
                    ..Default::default()
                });
                self.rows.len() - 1
            }
        };

        let row = &mut self.rows[idx];
        if succeeded {
            row.success += 1;
        } else {
            row.failure += 1;
        }
    }

    pub fn rows(&self) -> &[TallyRow] {
        &self.rows
    }

    pub fn get(&self, build_name: &str) -> Option<&TallyRow> {
        self.rows.iter().find(|r| r.build_name == build_name)
    }

    pub fn total_success(&self) -> u32 {
        self.rows.iter().map(|r| r.success).sum()
    }

    pub fn total_failure(&self) -> u32 {
        self.rows.iter().map(|r| r.failure).sum()
    }

    /// Whether any execution of any build failed.
    pub fn has_failures(&self) -> bool {
        self.total_failure() > 0
    }

    /// Fixed-width summary table, one row per build plus totals.
    pub fn render_table(&self) -> String {
        let name_width = self
            .rows
            .iter()
            .map(|r| r.build_name.len())
            .chain(["Build".len(), "TOTAL".len()])
            .max()
            .unwrap_or(5);

        let mut out = String::new();
        let _ = writeln!(out, "{:<w$}  {:>7}  {:>7}", "Build", "Success", "Failure", w = name_width);
        let _ = writeln!(out, "{}", "-".repeat(name_width + 18));
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<w$}  {:>7}  {:>7}",
                row.build_name,
                row.success,
                row.failure,
                w = name_width
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(name_width + 18));
        let _ = writeln!(
            out,
            "{:<w$}  {:>7}  {:>7}",
            "TOTAL",
            self.total_success(),
            self.total_failure(),
            w = name_width
        );
        out
    }
}
