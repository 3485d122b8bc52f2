use crate::core::image::Signature;
use crate::error::DecodeError;
use image::ImageReader;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::path::Path;

/// Produces perceptual signatures and scores the distance between them.
pub trait SignatureProvider {
    fn signature(&self, path: &Path) -> Result<Signature, DecodeError>;

    /// Normalized distance in `[0, 1]`; lower means more similar.
    fn distance(&self, a: &Signature, b: &Signature) -> f64;
}

/// Gradient-hash signatures computed with `image_hasher`.
pub struct PerceptualHasher {
    hasher: Hasher,
}

impl PerceptualHasher {
    pub const DEFAULT_HASH_SIZE: u32 = 16;

    pub fn new() -> Self {
        Self::with_hash_size(Self::DEFAULT_HASH_SIZE)
    }

    pub fn with_hash_size(size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(size, size)
            .to_hasher();
        Self { hasher }
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureProvider for PerceptualHasher {
    fn signature(&self, path: &Path) -> Result<Signature, DecodeError> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let hash = self.hasher.hash_image(&img);
        Ok(Signature::new(hash.as_bytes()))
    }

    fn distance(&self, a: &Signature, b: &Signature) -> f64 {
        hamming_distance(a.as_bytes(), b.as_bytes())
    }
}

/// Fraction of differing bits. Mismatched lengths are maximally distant.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let differing: u32 = a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum();
    f64::from(differing) / (a.len() * 8) as f64
}
