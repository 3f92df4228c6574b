//! Runtime configuration types.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Heap configuration: the size-class catalogue and block budget.
///
/// Loadable from a `heap.toml` file; every field has a default so a partial
/// file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapConfig {
    /// Ascending catalogue of cell sizes in bytes. Objects are rounded up to
    /// the smallest class that fits them.
    #[serde(default = "default_size_classes")]
    pub size_classes: Vec<usize>,
    /// Total byte budget of one block, subdivided into as many cells as fit.
    #[serde(default = "default_block_bytes")]
    pub block_bytes: usize,
    /// Print a summary line to stderr after each collection pass.
    #[serde(default)]
    pub gc_stats: bool,
}

fn default_size_classes() -> Vec<usize> {
    // 128..=1024 in 128-byte steps.
    (1..=8).map(|i| i * 128).collect()
}

fn default_block_bytes() -> usize {
    16 * 1024
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            size_classes: default_size_classes(),
            block_bytes: default_block_bytes(),
            gc_stats: false,
        }
    }
}

impl HeapConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let config: HeapConfig = toml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize heap config: {}", e))?;
        fs::write(path, content).map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }

    /// Structural validation: a non-empty, strictly ascending catalogue and
    /// a block budget that covers the largest class.
    pub fn validate(&self) -> Result<(), String> {
        if self.size_classes.is_empty() {
            return Err("failed to validate heap config: no size classes".to_string());
        }
        for pair in self.size_classes.windows(2) {
            if pair[0] >= pair[1] {
                return Err(format!(
                    "failed to validate heap config: size classes must be strictly ascending ({} then {})",
                    pair[0], pair[1]
                ));
            }
        }
        let largest = *self.size_classes.last().unwrap();
        if self.block_bytes < largest {
            return Err(format!(
                "failed to validate heap config: block budget {} is smaller than the largest cell size {}",
                self.block_bytes, largest
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let config = HeapConfig::default();
        assert_eq!(config.size_classes, vec![128, 256, 384, 512, 640, 768, 896, 1024]);
        assert_eq!(config.block_bytes, 16 * 1024);
        assert!(!config.gc_stats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unsorted_classes() {
        let config = HeapConfig {
            size_classes: vec![256, 128],
            ..HeapConfig::default()
        };
        assert!(config.validate().is_err());

        let duplicate = HeapConfig {
            size_classes: vec![128, 128],
            ..HeapConfig::default()
        };
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_undersized_block() {
        let config = HeapConfig {
            size_classes: vec![128, 256],
            block_bytes: 200,
            ..HeapConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: HeapConfig = toml::from_str("gc_stats = true").unwrap();
        assert!(config.gc_stats);
        assert_eq!(config.size_classes, HeapConfig::default().size_classes);
        assert_eq!(config.block_bytes, HeapConfig::default().block_bytes);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HeapConfig {
            size_classes: vec![128, 256, 512],
            block_bytes: 4096,
            gc_stats: true,
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: HeapConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.size_classes, config.size_classes);
        assert_eq!(parsed.block_bytes, config.block_bytes);
        assert_eq!(parsed.gc_stats, config.gc_stats);
    }
}
