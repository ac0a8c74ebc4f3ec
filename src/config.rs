use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the managed photo library. Imported files are laid out
    /// below this directory as year/month/day.
    #[serde(default = "default_library_root")]
    pub library_root: PathBuf,

    #[serde(default)]
    pub import: ImportPreferences,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Flags controlling one import transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreferences {
    /// Copy files into the library tree. When disabled, photos are
    /// registered at their original location.
    #[serde(default = "default_true")]
    pub copy_files: bool,

    /// Delete the source files after a fully successful import.
    #[serde(default)]
    pub remove_originals: bool,

    /// Skip candidates whose content is already in the library.
    #[serde(default = "default_true")]
    pub duplicate_detect: bool,

    #[serde(default = "default_true")]
    pub recurse_subdirectories: bool,

    #[serde(default = "default_true")]
    pub ignore_symlinks: bool,

    /// Collapse adjacent RAW+JPEG pairs with the same base name into a
    /// single candidate with two versions.
    #[serde(default = "default_true")]
    pub merge_raw_and_jpeg: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ImportPreferences {
    fn default() -> Self {
        Self {
            copy_files: true,
            remove_originals: false,
            duplicate_detect: true,
            recurse_subdirectories: true,
            ignore_symlinks: true,
            merge_raw_and_jpeg: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_raw_extensions")]
    pub raw_extensions: Vec<String>,
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "tiff".to_string(),
        "tif".to_string(),
        "webp".to_string(),
        "cr2".to_string(),
        "nef".to_string(),
        "arw".to_string(),
        "dng".to_string(),
        "raf".to_string(),
        "orf".to_string(),
    ]
}

fn default_raw_extensions() -> Vec<String> {
    vec![
        "cr2".to_string(),
        "nef".to_string(),
        "arw".to_string(),
        "dng".to_string(),
        "raf".to_string(),
        "orf".to_string(),
    ]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            raw_extensions: default_raw_extensions(),
        }
    }
}

fn default_library_root() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shoebox")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_root: default_library_root(),
            import: ImportPreferences::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shoebox")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences() {
        let prefs = ImportPreferences::default();
        assert!(prefs.copy_files);
        assert!(prefs.duplicate_detect);
        assert!(prefs.merge_raw_and_jpeg);
        assert!(!prefs.remove_originals);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.library_root, config.library_root);
        assert_eq!(parsed.import.copy_files, config.import.copy_files);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("library_root = \"/photos\"").unwrap();
        assert_eq!(parsed.library_root, PathBuf::from("/photos"));
        assert!(parsed.import.duplicate_detect);
        assert!(parsed.scanner.image_extensions.iter().any(|e| e == "jpg"));
    }
}
