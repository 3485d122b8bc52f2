use crate::core::signature::SignatureProvider;
use crate::error::DecodeError;
use crate::services::events::EventSink;
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Pixel dimensions of an image. Ordering is lexicographic: width first, then height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Aspect ratio as width / height.
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid resolution {0:?}, expected WIDTHxHEIGHT (e.g. 1920x1080)")]
pub struct ParseResolutionError(String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseResolutionError(s.to_string());
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.parse().map_err(|_| invalid())?;
        let height: u32 = height.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Opaque perceptual descriptor produced by a [`SignatureProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Box<[u8]>);

impl Signature {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One decoded image under consideration for the current run.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub resolution: Resolution,
    // Filled on first comparison; `None` inside means extraction failed.
    signature: OnceCell<Option<Signature>>,
}

impl ImageRecord {
    pub fn new(path: impl Into<PathBuf>, resolution: Resolution) -> Self {
        Self {
            path: path.into(),
            resolution,
            signature: OnceCell::new(),
        }
    }

    /// Returns the memoized signature, extracting it on first use.
    ///
    /// Extraction happens at most once per record. A failure is reported to
    /// `sink` as a skipped input and remembered, so later calls return `None`
    /// without retrying.
    pub fn signature(
        &self,
        provider: &dyn SignatureProvider,
        sink: &dyn EventSink,
    ) -> Option<&Signature> {
        self.signature
            .get_or_init(|| match provider.signature(&self.path) {
                Ok(signature) => Some(signature),
                Err(error) => {
                    sink.skipped(&self.path, &error);
                    None
                }
            })
            .as_ref()
    }

    pub fn has_signature(&self) -> bool {
        matches!(self.signature.get(), Some(Some(_)))
    }

    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }
}

/// Reads image dimensions from a path.
pub trait ImageDecoder: Sync {
    fn dimensions(&self, path: &Path) -> Result<Resolution, DecodeError>;
}

/// [`ImageDecoder`] backed by the `image` crate. Only the header is read.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn dimensions(&self, path: &Path) -> Result<Resolution, DecodeError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage { width, height });
        }
        Ok(Resolution { width, height })
    }
}
