//! Registry of named print sizes.

use crate::error::ConfigError;
use crate::types::SizeSpec;
use std::collections::HashMap;

/// Immutable lookup table from size identifier to [`SizeSpec`].
///
/// Built once from configuration. Custom sizes never enter the catalog.
#[derive(Debug, Clone)]
pub struct SizeCatalog {
    sizes: Vec<SizeSpec>,
    index: HashMap<String, usize>,
}

impl SizeCatalog {
    /// Build a catalog, rejecting duplicate identifiers and zero dimensions.
    pub fn new(sizes: Vec<SizeSpec>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(sizes.len());
        for (i, size) in sizes.iter().enumerate() {
            if size.width == 0 || size.height == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "size '{}' must have width and height > 0",
                    size.id
                )));
            }
            if index.insert(size.id.clone(), i).is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate size id '{}'",
                    size.id
                )));
            }
        }
        Ok(Self { sizes, index })
    }

    pub fn lookup(&self, id: &str) -> Option<&SizeSpec> {
        self.index.get(id).map(|&i| &self.sizes[i])
    }

    /// All sizes in registration order.
    pub fn list(&self) -> &[SizeSpec] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl Default for SizeCatalog {
    fn default() -> Self {
        let sizes = crate::config::default_sizes();
        let index = sizes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { sizes, index }
    }
}
