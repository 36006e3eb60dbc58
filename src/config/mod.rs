//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capture::Region;
use crate::detect::ComparisonMethod;
use crate::translate::TranslationSettings;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language pair
    pub languages: LanguageSettings,
    /// Translation backend and credentials
    pub translation: TranslationSettings,
    /// Capture region and polling
    pub capture: CaptureSettings,
    /// Change detection
    pub detection: DetectionSettings,
    /// Text appearance
    pub appearance: AppearanceSettings,
}

/// Source and target language codes
///
/// ISO two-letter codes with an optional region suffix; the source may be
/// the special value `auto`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// Source language, or `auto` to detect
    pub source: String,
    /// Target language
    pub target: String,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            source: "auto".to_string(),
            target: "de".to_string(),
        }
    }
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Screen region to capture
    pub region: Region,
    /// Polling interval in seconds for continuous mode
    pub update_interval_secs: f32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            region: Region::default(),
            update_interval_secs: 1.0,
        }
    }
}

/// Change-detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Frame comparison strategy
    pub method: ComparisonMethod,
    /// Change threshold as a fraction in (0, 1]
    pub change_threshold: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            method: ComparisonMethod::PixelDiff,
            change_threshold: 0.30,
        }
    }
}

/// Text appearance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceSettings {
    /// Font family for rendered translations
    pub font_family: String,
    /// Font size in fixed-size mode
    pub font_size: u32,
    /// Bold text
    pub bold: bool,
    /// Text color as `#RRGGBB`
    pub text_color: String,
    /// Use the configured size for every block instead of estimating from
    /// the source image
    pub use_fixed_font_size: bool,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 9,
            bold: true,
            text_color: "#FFFFFF".to_string(),
            use_fixed_font_size: true,
        }
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "overtext", "OverText")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslationService;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.languages.source, "auto");
        assert_eq!(config.languages.target, "de");

        assert_eq!(config.translation.service, TranslationService::Google);
        assert!(config.translation.deepl_api_key.is_none());

        assert_eq!(config.capture.region.width, 1020);
        assert!((config.capture.update_interval_secs - 1.0).abs() < 0.01);

        assert_eq!(config.detection.method, ComparisonMethod::PixelDiff);
        assert!((config.detection.change_threshold - 0.30).abs() < 0.01);

        assert_eq!(config.appearance.font_family, "Arial");
        assert_eq!(config.appearance.font_size, 9);
        assert!(config.appearance.bold);
        assert!(config.appearance.use_fixed_font_size);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.languages.target, parsed.languages.target);
        assert_eq!(config.translation.service, parsed.translation.service);
        assert_eq!(config.capture.region, parsed.capture.region);
        assert_eq!(config.detection.method, parsed.detection.method);
        assert_eq!(config.appearance.text_color, parsed.appearance.text_color);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.languages.source = "ja".to_string();
        config.languages.target = "en".to_string();
        config.translation.service = TranslationService::Deepl;
        config.translation.deepl_api_key = Some("key:fx".to_string());
        config.detection.method = ComparisonMethod::Histogram;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.languages.source, "ja");
        assert_eq!(parsed.translation.service, TranslationService::Deepl);
        assert_eq!(parsed.translation.deepl_api_key, Some("key:fx".to_string()));
        assert_eq!(parsed.detection.method, ComparisonMethod::Histogram);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.languages.target, loaded.languages.target);
        assert_eq!(config.capture.region, loaded.capture.region);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_comparison_method_names() {
        let toml_str = "method = \"text_hash\"\nchange_threshold = 0.5\n";
        let parsed: DetectionSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.method, ComparisonMethod::TextHash);
    }
}
