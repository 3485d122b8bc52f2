use crate::core::image::{ImageRecord, Resolution};
use crate::services::filesystem::Filesystem;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub const DEFAULT_MIN_COUNT: usize = 5;

/// Resolutions that occur at least `min_count` times among `records`.
pub fn whitelist(records: &[ImageRecord], min_count: usize) -> BTreeSet<Resolution> {
    let mut counts: HashMap<Resolution, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.resolution).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count >= min_count)
        .map(|(resolution, _)| resolution)
        .collect()
}

/// Directories to create and where each source should go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlacementPlan {
    pub directories: BTreeSet<PathBuf>,
    /// Source → destination, in input order. Distinct sources may share a
    /// destination; applying the mapping in order lets the last one win.
    pub mapping: Vec<(PathBuf, PathBuf)>,
}

/// Directory a record of `resolution` belongs in.
pub fn destination_dir(
    output_root: &Path,
    resolution: Resolution,
    whitelist: &BTreeSet<Resolution>,
) -> PathBuf {
    if whitelist.contains(&resolution) {
        output_root.join(resolution.to_string())
    } else {
        output_root.to_path_buf()
    }
}

/// Computes where every record should be placed under `output_root`.
///
/// Records that already sit at their destination (same underlying file)
/// are left out of the mapping, so re-running over a sorted tree is a no-op.
pub fn plan(
    records: &[ImageRecord],
    output_root: &Path,
    whitelist: &BTreeSet<Resolution>,
    fs: &dyn Filesystem,
) -> PlacementPlan {
    let mut directories = BTreeSet::from([output_root.to_path_buf()]);
    let mut mapping = Vec::with_capacity(records.len());

    for record in records {
        let Some(file_name) = record.file_name() else {
            tracing::debug!(path = %record.path.display(), "No file name; not placing");
            continue;
        };
        let dir = destination_dir(output_root, record.resolution, whitelist);
        let destination = dir.join(file_name);

        if fs.is_file(&destination) && fs.same_file(&record.path, &destination) {
            tracing::debug!(path = %record.path.display(), "Already in place");
            continue;
        }

        directories.insert(dir);
        mapping.push((record.path.clone(), destination));
    }

    PlacementPlan {
        directories,
        mapping,
    }
}
