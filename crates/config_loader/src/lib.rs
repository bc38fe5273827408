//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON scene descriptions
//! - Validate configuration legality (including the sampling window fit)
//! - Generate `SceneConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let scene = ConfigLoader::load_from_path(Path::new("scene.toml")).unwrap();
//! println!("fov: {}", scene.plugin.fov);
//! ```

mod parser;
mod validator;

pub use contracts::SceneConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SceneConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<SceneConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built scene (e.g. after CLI overrides)
    pub fn validate(scene: &SceneConfig) -> Result<(), ContractError> {
        validator::validate(scene)
    }

    /// Serialize SceneConfig to TOML string
    pub fn to_toml(scene: &SceneConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(scene)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SceneConfig to JSON string
    pub fn to_json(scene: &SceneConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(scene)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SceneConfig, ContractError> {
        let scene = parser::parse(content, format)?;
        validator::validate(&scene)?;
        Ok(scene)
    }
}
