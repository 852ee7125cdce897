//! Cache key derivation.

use std::fmt;

use crate::types::{SizeSpec, ToneParams};

/// Identifies one cached print: source content plus target size, and
/// optionally the tone parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    stem: String,
}

impl CacheKey {
    /// Key from a source content hash and a size.
    pub fn new(source_hash: &str, size: &SizeSpec) -> Self {
        Self {
            stem: format!("{}_{}", source_hash, sanitize(&size.id)),
        }
    }

    /// Key that also distinguishes non-identity tone parameters.
    pub fn with_tone(source_hash: &str, size: &SizeSpec, tone: &ToneParams) -> Self {
        let mut key = Self::new(source_hash, size);
        if !tone.is_identity() {
            // Shortest round-trip form, so distinct values never share a key.
            key.stem
                .push_str(&format!("_b{}_c{}", tone.brightness, tone.contrast));
        }
        key
    }

    /// File stem, without extension.
    pub fn as_str(&self) -> &str {
        &self.stem
    }

    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.stem)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem)
    }
}

/// Keep identifiers filesystem-safe. Letters in any script survive.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_hash_and_size_id() {
        let key = CacheKey::new("abc123", &SizeSpec::new("一寸", 295, 413));
        assert_eq!(key.as_str(), "abc123_一寸");
        assert_eq!(key.file_name(), "abc123_一寸.jpg");
    }

    #[test]
    fn test_same_inputs_same_key() {
        let size = SizeSpec::custom(600, 800);
        assert_eq!(CacheKey::new("h", &size), CacheKey::new("h", &size));
        assert_ne!(
            CacheKey::new("h", &size),
            CacheKey::new("h", &SizeSpec::custom(800, 600))
        );
    }

    #[test]
    fn test_path_separators_are_sanitized() {
        let key = CacheKey::new("h", &SizeSpec::new("../evil/size", 1, 1));
        assert_eq!(key.as_str(), "h____evil_size");
        assert!(!key.file_name().contains('/'));
    }

    #[test]
    fn test_tone_suffix_only_for_non_identity() {
        let size = SizeSpec::new("护照", 330, 420);
        assert_eq!(
            CacheKey::with_tone("h", &size, &ToneParams::default()),
            CacheKey::new("h", &size)
        );
        assert_eq!(
            CacheKey::with_tone("h", &size, &ToneParams::new(1.2, 0.8)).as_str(),
            "h_护照_b1.2_c0.8"
        );
    }

    #[test]
    fn test_nearby_tone_values_get_distinct_keys() {
        let size = SizeSpec::new("一寸", 295, 413);
        let a = CacheKey::with_tone("h", &size, &ToneParams::new(1.0004, 1.0));
        let b = CacheKey::with_tone("h", &size, &ToneParams::new(1.0001, 1.0));
        assert_ne!(a, b);
        assert_ne!(
            a,
            CacheKey::new("h", &size),
            "a non-identity tone must not share the plain key"
        );
    }
}
