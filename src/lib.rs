//! Wallpaper collection tooling.
//!
//! Two pipelines share the same ingestion step: `dedup` removes images that
//! are perceptually near-identical to a larger copy, and `sort` places images
//! into per-resolution directories for the resolutions common enough in the
//! batch to deserve one.

pub mod core;
pub mod error;
pub mod services;

pub use crate::core::duplicate::{cluster, DuplicateDecision, DuplicateDetector};
pub use crate::core::image::{ImageCrateDecoder, ImageDecoder, ImageRecord, Resolution, Signature};
pub use crate::core::scanner::{collect_inputs, Ingestor};
pub use crate::core::scatter::{plan, whitelist, PlacementPlan, DEFAULT_MIN_COUNT};
pub use crate::core::signature::{PerceptualHasher, SignatureProvider};
pub use crate::error::{DecodeError, FsOpError};
pub use crate::services::events::{Action, EventSink, MemorySink, TracingSink};
pub use crate::services::filesystem::{Filesystem, LocalFilesystem, Transfer};
pub use crate::services::materializer::{Materializer, Outcome};
