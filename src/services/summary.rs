use crate::core::duplicate::DuplicateDecision;
use crate::core::image::Resolution;
use crate::core::scatter::PlacementPlan;
use crate::services::filesystem::Transfer;
use crate::services::materializer::Outcome;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// What a run decided and did, written with `--report`.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub dry_run: bool,
    pub inputs: usize,
    pub images: usize,
    #[serde(flatten)]
    pub details: RunDetails,
}

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum RunDetails {
    Dedup {
        threshold: f64,
        duplicates: Vec<DuplicateDecision>,
        deleted: Outcome,
    },
    Sort {
        transfer: Transfer,
        whitelist: Vec<String>,
        plan: PlacementPlan,
        directories_created: Outcome,
        placed: Outcome,
    },
}

impl RunDetails {
    pub fn sort(
        transfer: Transfer,
        whitelist: &BTreeSet<Resolution>,
        plan: PlacementPlan,
        directories_created: Outcome,
        placed: Outcome,
    ) -> Self {
        Self::Sort {
            transfer,
            whitelist: whitelist.iter().map(Resolution::to_string).collect(),
            plan,
            directories_created,
            placed,
        }
    }
}

impl RunSummary {
    pub fn new(dry_run: bool, inputs: usize, images: usize, details: RunDetails) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            dry_run,
            inputs,
            images,
            details,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))
    }
}
