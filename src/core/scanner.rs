use crate::core::image::{ImageDecoder, ImageRecord};
use crate::error::DecodeError;
use crate::services::events::EventSink;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Extensions picked up when an input names a directory.
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Resolves inputs to absolute paths, expanding directories into the images they hold.
///
/// Directories are read one level deep unless `recursive` is set. Files given
/// explicitly are kept whatever their extension. Repeated paths are dropped
/// after their first occurrence. Inputs and directory entries that cannot be
/// resolved are reported to `sink` and left out.
pub fn collect_inputs(inputs: &[PathBuf], recursive: bool, sink: &dyn EventSink) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for input in inputs {
        let input = match std::path::absolute(input) {
            Ok(input) => input,
            Err(e) => {
                sink.skipped(input, &DecodeError::Io(e));
                continue;
            }
        };
        if input.is_dir() {
            expand_dir(&input, recursive, sink, &mut seen, &mut paths);
        } else if seen.insert(input.clone()) {
            paths.push(input);
        }
    }

    paths
}

fn expand_dir(
    dir: &Path,
    recursive: bool,
    sink: &dyn EventSink,
    seen: &mut HashSet<PathBuf>,
    paths: &mut Vec<PathBuf>,
) {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                sink.skipped(&path, &DecodeError::Io(io::Error::from(e)));
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_file()
            && has_image_extension(path)
            && seen.insert(path.to_path_buf())
        {
            paths.push(path.to_path_buf());
        }
    }
}

/// Turns paths into [`ImageRecord`]s by probing their dimensions.
pub struct Ingestor<'a> {
    decoder: &'a dyn ImageDecoder,
    show_progress: bool,
}

impl<'a> Ingestor<'a> {
    pub fn new(decoder: &'a dyn ImageDecoder) -> Self {
        Self {
            decoder,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Probes every path in parallel. Returned records keep the input order;
    /// unreadable paths are reported to `sink` and left out.
    pub fn ingest(&self, paths: &[PathBuf], sink: &dyn EventSink) -> Vec<ImageRecord> {
        let progress_bar = self.progress_bar(paths.len() as u64);
        let start = Instant::now();

        let results: Vec<_> = paths
            .par_iter()
            .map(|path| {
                let result = self.decoder.dimensions(path);
                progress_bar.inc(1);
                result
            })
            .collect();
        progress_bar.finish_and_clear();

        let mut records = Vec::with_capacity(paths.len());
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(resolution) => {
                    tracing::debug!(path = %path.display(), %resolution, "Read metadata");
                    records.push(ImageRecord::new(path.clone(), resolution));
                }
                Err(error) => sink.skipped(path, &error),
            }
        }

        tracing::info!(
            images = records.len(),
            skipped = paths.len() - records.len(),
            elapsed = ?start.elapsed(),
            "Found {} images",
            records.len()
        );
        records
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            progress_bar.set_style(style.progress_chars("=> "));
        }
        progress_bar.set_message("Reading images…");
        progress_bar
    }
}
