//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from an optional TOML file. Every field has a
//! default, so a missing file simply means "use defaults".
//!
//! Root folder priority:
//! 1. Command-line argument (highest priority)
//! 2. `SHIFTBOARD_ROOT` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::form::{FormDecoder, FormScheme};
use crate::model::ShiftVocabulary;
use crate::normalize::{Normalizer, LEGACY_WRAPPER_KEY};
use crate::roster::{RosterDirectory, DEFAULT_EMPLOYEES};
use crate::store::{EmptyUpdatePolicy, StoreOptions};
use crate::{Error, Result};

/// Environment variable overriding the data root
pub const ROOT_ENV_VAR: &str = "SHIFTBOARD_ROOT";

/// Top-level config (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftboardConfig {
    /// Data root holding one directory per store
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
    pub roster: RosterConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Form scheme by built-in name (`"day"`, `"e"`) or spelled out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormSchemeConfig {
    Named(String),
    Custom(FormScheme),
}

impl Default for FormSchemeConfig {
    fn default() -> Self {
        FormSchemeConfig::Named("day".to_string())
    }
}

impl FormSchemeConfig {
    pub fn resolve(&self) -> Result<FormScheme> {
        match self {
            FormSchemeConfig::Named(name) => FormScheme::builtin(name)
                .ok_or_else(|| Error::Config(format!("Unknown form scheme: {}", name))),
            FormSchemeConfig::Custom(scheme) => {
                if scheme.prefix.is_empty() || scheme.separator.is_empty() {
                    return Err(Error::Config(
                        "Custom form scheme needs a prefix and separator".to_string(),
                    ));
                }
                Ok(scheme.clone())
            }
        }
    }
}

/// Schedule storage and decoding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub empty_update_policy: EmptyUpdatePolicy,
    /// Keep a `.bak` copy of the previous month file on each save
    pub backup: bool,
    /// Scheme the edit form posts with
    pub form_scheme: FormSchemeConfig,
    /// Older schemes still accepted on submission
    pub fallback_schemes: Vec<FormSchemeConfig>,
    /// Wrapper keys unwrapped when reading legacy files
    pub legacy_wrapper_keys: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            empty_update_policy: EmptyUpdatePolicy::default(),
            backup: true,
            form_scheme: FormSchemeConfig::default(),
            fallback_schemes: Vec::new(),
            legacy_wrapper_keys: vec![LEGACY_WRAPPER_KEY.to_string()],
        }
    }
}

/// Employee roster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Roster written for a store the first time it is read
    pub default_employees: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            default_employees: DEFAULT_EMPLOYEES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ShiftboardConfig {
    /// Parse a config file; a malformed file is an error
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the explicit file, else the default location, else defaults
    ///
    /// An explicit path must exist. The default location is optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Primary form scheme plus fallbacks
    pub fn form_decoder(&self) -> Result<FormDecoder> {
        let mut decoder = FormDecoder::new(self.schedule.form_scheme.resolve()?);
        for fallback in &self.schedule.fallback_schemes {
            decoder = decoder.with_fallback(fallback.resolve()?);
        }
        Ok(decoder)
    }

    /// Normalizer accepting the configured wrapper keys and every form
    /// vocabulary in addition to the canonical ids and labels
    pub fn normalizer(&self) -> Result<Normalizer> {
        let mut normalizer = Normalizer::new(
            self.schedule.legacy_wrapper_keys.clone(),
            vec![ShiftVocabulary::Identifiers, ShiftVocabulary::Labels],
        );
        let decoder = self.form_decoder()?;
        normalizer = normalizer.with_vocabulary(decoder.primary().vocabulary.clone());
        for fallback in &self.schedule.fallback_schemes {
            normalizer = normalizer.with_vocabulary(fallback.resolve()?.vocabulary);
        }
        Ok(normalizer)
    }

    pub fn store_options(&self) -> Result<StoreOptions> {
        Ok(StoreOptions {
            empty_update_policy: self.schedule.empty_update_policy,
            backup: self.schedule.backup,
            normalizer: self.normalizer()?,
        })
    }

    pub fn roster_directory(&self, root: &Path) -> RosterDirectory {
        RosterDirectory::new(root, self.roster.default_employees.clone())
    }
}

/// Resolve the data root: CLI → environment → config file → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &ShiftboardConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// `<config dir>/shiftboard/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shiftboard").join("config.toml"))
}

/// OS-dependent default data root
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("shiftboard"))
        .unwrap_or_else(|| PathBuf::from("./shiftboard_data"))
}
