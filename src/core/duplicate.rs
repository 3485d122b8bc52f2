// Duplicate detection by perceptual similarity.
//
// Clustering is a single greedy pass: each record is compared against the
// representatives kept so far, in the order they were kept, and the first
// match decides. Results depend on input order.

use crate::core::image::{ImageRecord, Resolution};
use crate::core::signature::SignatureProvider;
use crate::services::events::EventSink;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Relative tolerance on aspect ratio below which two images are worth comparing.
pub const ASPECT_TOLERANCE: f64 = 1e-3;

/// A path to delete, and the representative it duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateDecision {
    pub discarded: PathBuf,
    pub kept: PathBuf,
    pub distance: f64,
}

pub struct DuplicateDetector {
    pub threshold: f64,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Decides which records are duplicates of an earlier representative.
    ///
    /// When a record matches, the one with the larger resolution (compared
    /// width first, then height) stays as representative and the other is
    /// discarded. On equal resolution the incoming record is discarded.
    pub fn cluster(
        &self,
        records: &[ImageRecord],
        provider: &dyn SignatureProvider,
        sink: &dyn EventSink,
    ) -> Vec<DuplicateDecision> {
        let mut kept: Vec<&ImageRecord> = Vec::new();
        let mut decisions = Vec::new();

        for record in records {
            tracing::debug!(path = %record.path.display(), "Processing");

            let hit = kept.iter().enumerate().find_map(|(index, representative)| {
                self.match_distance(record, representative, provider, sink)
                    .map(|distance| (index, distance))
            });

            let Some((index, distance)) = hit else {
                kept.push(record);
                continue;
            };

            let representative = kept[index];
            let decision = if record.resolution > representative.resolution {
                kept[index] = record;
                DuplicateDecision {
                    discarded: representative.path.clone(),
                    kept: record.path.clone(),
                    distance,
                }
            } else {
                DuplicateDecision {
                    discarded: record.path.clone(),
                    kept: representative.path.clone(),
                    distance,
                }
            };
            sink.duplicate(&decision);
            decisions.push(decision);
        }

        tracing::debug!(
            records = records.len(),
            representatives = kept.len(),
            duplicates = decisions.len(),
            "Clustering complete"
        );
        decisions
    }

    /// Distance between the pair if they count as duplicates.
    fn match_distance(
        &self,
        record: &ImageRecord,
        representative: &ImageRecord,
        provider: &dyn SignatureProvider,
        sink: &dyn EventSink,
    ) -> Option<f64> {
        if !same_aspect(record.resolution, representative.resolution) {
            return None;
        }
        let a = record.signature(provider, sink)?;
        let b = representative.signature(provider, sink)?;
        let distance = provider.distance(a, b);
        tracing::debug!(
            a = %record.path.display(),
            b = %representative.path.display(),
            distance,
            "Compared"
        );
        (distance < self.threshold).then_some(distance)
    }
}

/// Convenience wrapper around [`DuplicateDetector::cluster`].
pub fn cluster(
    records: &[ImageRecord],
    threshold: f64,
    provider: &dyn SignatureProvider,
    sink: &dyn EventSink,
) -> Vec<DuplicateDecision> {
    DuplicateDetector::new(threshold).cluster(records, provider, sink)
}

/// Whether `candidate` has the aspect ratio of `reference`, within [`ASPECT_TOLERANCE`].
pub fn same_aspect(candidate: Resolution, reference: Resolution) -> bool {
    let reference_ratio = reference.ratio();
    (candidate.ratio() - reference_ratio).abs() / reference_ratio < ASPECT_TOLERANCE
}
