use pantry_core::{AggregationOptions, DensityPolicy, MissingPolicy, NestedBasis, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the Automerge documents
    pub data_dir: ConfigValue<PathBuf>,
    /// Deepest recipe nesting aggregation will follow
    pub max_depth: ConfigValue<usize>,
    /// What to do with references to missing foods or recipes
    pub on_missing: ConfigValue<MissingPolicy>,
    /// How volume lines are weighed
    pub density: ConfigValue<DensityPolicy>,
    /// How grams of a nested recipe map onto its nutrition
    pub nested_basis: ConfigValue<NestedBasis>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    max_depth: Option<usize>,
    on_missing: Option<MissingPolicy>,
    density: Option<DensityPolicy>,
    nested_basis: Option<NestedBasis>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading overrides through `env`.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut max_depth = ConfigValue::new(DEFAULT_MAX_DEPTH, ConfigSource::Default);
        let mut on_missing = ConfigValue::new(MissingPolicy::default(), ConfigSource::Default);
        let mut density = ConfigValue::new(DensityPolicy::default(), ConfigSource::Default);
        let mut nested_basis = ConfigValue::new(NestedBasis::default(), ConfigSource::Default);
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            // An empty file deserializes to nothing rather than an empty map.
            let file_config: ConfigFile = if contents.trim().is_empty() {
                ConfigFile::default()
            } else {
                serde_yaml::from_str(&contents)
                    .map_err(|e| ConfigError::ParseError(path.clone(), e))?
            };

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir.set(resolved, ConfigSource::File);
            }
            if let Some(depth) = file_config.max_depth {
                max_depth.set(depth, ConfigSource::File);
            }
            if let Some(policy) = file_config.on_missing {
                on_missing.set(policy, ConfigSource::File);
            }
            if let Some(policy) = file_config.density {
                density.set(policy, ConfigSource::File);
            }
            if let Some(basis) = file_config.nested_basis {
                nested_basis.set(basis, ConfigSource::File);
            }
        }

        if let Some(dir) = env("PANTRY_DATA_DIR") {
            data_dir.set(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(raw) = env("PANTRY_MAX_DEPTH") {
            max_depth.set(parse_env("PANTRY_MAX_DEPTH", &raw)?, ConfigSource::Environment);
        }
        if let Some(raw) = env("PANTRY_ON_MISSING") {
            on_missing.set(parse_env("PANTRY_ON_MISSING", &raw)?, ConfigSource::Environment);
        }
        if let Some(raw) = env("PANTRY_DENSITY") {
            density.set(parse_env("PANTRY_DENSITY", &raw)?, ConfigSource::Environment);
        }
        if let Some(raw) = env("PANTRY_NESTED_BASIS") {
            nested_basis.set(
                parse_env("PANTRY_NESTED_BASIS", &raw)?,
                ConfigSource::Environment,
            );
        }

        if max_depth.value == 0 {
            return Err(ConfigError::InvalidValue(
                "max_depth".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            data_dir,
            max_depth,
            on_missing,
            density,
            nested_basis,
            config_file,
        })
    }

    /// Engine options assembled from the configured policies.
    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            on_missing: self.on_missing.value,
            density: self.density.value,
            nested_basis: self.nested_basis.value,
            max_depth: self.max_depth.value,
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/pantry/
    /// - macOS: ~/Library/Application Support/pantry/
    /// - Windows: %APPDATA%/pantry/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pantry")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/pantry/
    /// - macOS: ~/Library/Application Support/pantry/
    /// - Windows: %APPDATA%/pantry/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pantry")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, e) => {
                write!(f, "Invalid configuration value for {}: {}", key, e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
