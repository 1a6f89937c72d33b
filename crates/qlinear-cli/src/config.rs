//! Config - Configuration File Handling
//!
//! Handles parsing of qlinear configuration files.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::path::{Path, PathBuf};

use qlinear_quant::QuantConfig;
use serde::{Deserialize, Serialize};

use crate::error::CliResult;

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "qlinear.toml";

// =============================================================================
// File Configuration
// =============================================================================

/// Contents of `qlinear.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Quantization settings
    #[serde(default)]
    pub quantization: QuantConfig,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> CliResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: FileConfig = toml::from_str(&content)?;
        config.quantization.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given, else `./qlinear.toml` if it exists, else defaults
    pub fn resolve(explicit: Option<&Path>) -> CliResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Ok((Self::load(&default_path)?, Some(default_path)));
        }
        Ok((Self::default(), None))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qlinear_quant::StorageType;
    use tempfile::TempDir;

    #[test]
    fn test_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qlinear.toml");
        let config = FileConfig {
            quantization: QuantConfig::new(StorageType::QInt16)
                .with_symmetric(true)
                .with_min_real_range(0.01),
        };

        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(FileConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.quantization, QuantConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_combination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "[quantization]\nstorage_type = \"QFLOAT8E4M3FN\"\nreduce_range = true\n",
        )
        .unwrap();
        assert!(matches!(
            FileConfig::load(&path),
            Err(crate::error::CliError::Quant(_))
        ));
    }
}
