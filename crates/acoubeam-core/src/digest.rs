//! Value-based fingerprints for pipeline inputs.
//!
//! A [`Digest`] is a SHA-256 over a canonical byte encoding of every value
//! that influences a result. Each part is written as a one-byte tag, a
//! little-endian length and the payload, so `["ab", "c"]` and `["a", "bc"]`
//! never collide. Floats are hashed by their IEEE754 bit pattern.
//!
//! Digests never depend on wall-clock time or object identity: two
//! independently built pipelines with equal inputs produce equal digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

const TAG_STR: u8 = 1;
const TAG_F64: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_F64S: u8 = 5;
const TAG_F32S: u8 = 6;
const TAG_DIGEST: u8 = 7;
const TAG_NONE: u8 = 8;

/// Hex-encoded SHA-256 fingerprint of a stage's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    /// Start building a digest.
    pub fn builder() -> DigestBuilder {
        DigestBuilder::new()
    }

    /// Hex string (64 lowercase characters).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a hex digest as found in cache file names.
    ///
    /// Returns `None` unless the input is exactly 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let valid = s.len() == 64
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(s.to_string()))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental digest computation.
///
/// ```rust
/// use acoubeam_core::Digest;
///
/// let a = Digest::builder().str("hanning").usize(1024).f64(343.0).finish();
/// let b = Digest::builder().str("hanning").usize(1024).f64(343.0).finish();
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct DigestBuilder {
    hasher: Sha256,
}

impl DigestBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    fn part(mut self, tag: u8, payload: &[u8]) -> Self {
        self.hasher.update([tag]);
        self.hasher.update((payload.len() as u64).to_le_bytes());
        self.hasher.update(payload);
        self
    }

    /// Add a string part.
    pub fn str(self, value: &str) -> Self {
        self.part(TAG_STR, value.as_bytes())
    }

    /// Add a float part (bit pattern, so `0.0` and `-0.0` differ).
    pub fn f64(self, value: f64) -> Self {
        self.part(TAG_F64, &value.to_le_bytes())
    }

    /// Add an unsigned integer part.
    pub fn usize(self, value: usize) -> Self {
        self.part(TAG_INT, &(value as u64).to_le_bytes())
    }

    /// Add a signed integer part.
    pub fn i64(self, value: i64) -> Self {
        self.part(TAG_INT, &value.to_le_bytes())
    }

    /// Add a boolean part.
    pub fn bool(self, value: bool) -> Self {
        self.part(TAG_BOOL, &[u8::from(value)])
    }

    /// Add a slice of doubles.
    pub fn f64s(self, values: &[f64]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 8);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.part(TAG_F64S, &bytes)
    }

    /// Add a slice of singles.
    pub fn f32s(self, values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.part(TAG_F32S, &bytes)
    }

    /// Chain an upstream digest.
    pub fn digest(self, upstream: &Digest) -> Self {
        self.part(TAG_DIGEST, upstream.as_str().as_bytes())
    }

    /// Chain an optional upstream digest; `None` hashes as a distinct marker.
    pub fn maybe_digest(self, upstream: Option<&Digest>) -> Self {
        match upstream {
            Some(d) => self.digest(d),
            None => self.part(TAG_NONE, &[]),
        }
    }

    /// Finish and hex-encode.
    pub fn finish(self) -> Digest {
        Digest(hex::encode(self.hasher.finalize()))
    }
}

impl Default for DigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_equal_digest() {
        let a = Digest::builder().str("x").f64(1.5).usize(3).finish();
        let b = Digest::builder().str("x").f64(1.5).usize(3).finish();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn part_boundaries_are_unambiguous() {
        let a = Digest::builder().str("ab").str("c").finish();
        let b = Digest::builder().str("a").str("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn order_matters() {
        let a = Digest::builder().f64(1.0).f64(2.0).finish();
        let b = Digest::builder().f64(2.0).f64(1.0).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn none_differs_from_empty_string() {
        let a = Digest::builder().maybe_digest(None).finish();
        let b = Digest::builder().str("").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn from_hex_validates() {
        let d = Digest::builder().str("x").finish();
        assert_eq!(Digest::from_hex(d.as_str()), Some(d.clone()));
        assert!(Digest::from_hex("abc").is_none());
        assert!(Digest::from_hex(&"G".repeat(64)).is_none());
        assert!(Digest::from_hex(&d.as_str().to_uppercase()).is_none());
    }
}
