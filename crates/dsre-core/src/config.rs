//! DSRE Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Knowledge base locations and column layout
    pub kb: KbConfig,

    /// Candidate labeling options
    pub labeling: LabelingConfig,

    /// Vocabulary construction
    pub vocabulary: VocabularyConfig,

    /// Cross-validation runs
    pub cross_validation: CrossValidationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Knowledge base
        if let Ok(dir) = std::env::var("DSRE_DIRECTIONAL_DIR") {
            config.kb.directional_dir = dir.into();
        }
        if let Ok(dir) = std::env::var("DSRE_SYMMETRIC_DIR") {
            config.kb.symmetric_dir = dir.into();
        }
        if let Ok(path) = std::env::var("DSRE_SYNONYMS_FILE") {
            config.kb.synonyms_file = Some(path.into());
        }

        // Labeling
        if let Ok(path) = std::env::var("DSRE_STOP_LIST") {
            config.labeling.stop_list = Some(path.into());
        }
        if let Ok(entity) = std::env::var("DSRE_ENTITY_A") {
            config.labeling.entity_type_a = entity;
        }
        if let Ok(entity) = std::env::var("DSRE_ENTITY_B") {
            config.labeling.entity_type_b = entity;
        }

        // Vocabulary
        if let Ok(count) = std::env::var("DSRE_MIN_OCCURRENCE") {
            config.vocabulary.min_occurrence = parse_env("DSRE_MIN_OCCURRENCE", count)?;
        }
        if let Ok(encoding) = std::env::var("DSRE_ENCODING") {
            config.vocabulary.encoding = encoding.parse()?;
        }

        // Cross-validation
        if let Ok(folds) = std::env::var("DSRE_FOLDS") {
            config.cross_validation.folds = parse_env("DSRE_FOLDS", folds)?;
        }
        if let Ok(dir) = std::env::var("DSRE_SCRATCH_ROOT") {
            config.cross_validation.scratch_root = dir.into();
        }
        if let Ok(layers) = std::env::var("DSRE_HIDDEN_LAYERS") {
            config.cross_validation.hidden_layers = parse_layers(&layers)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        // Only override if env values differ from defaults
        if env_config.kb.directional_dir != KbConfig::default().directional_dir {
            self.kb.directional_dir = env_config.kb.directional_dir;
        }
        if env_config.kb.symmetric_dir != KbConfig::default().symmetric_dir {
            self.kb.symmetric_dir = env_config.kb.symmetric_dir;
        }
        if env_config.kb.synonyms_file.is_some() {
            self.kb.synonyms_file = env_config.kb.synonyms_file;
        }
        if env_config.labeling.stop_list.is_some() {
            self.labeling.stop_list = env_config.labeling.stop_list;
        }
        let labeling_defaults = LabelingConfig::default();
        if env_config.labeling.entity_type_a != labeling_defaults.entity_type_a {
            self.labeling.entity_type_a = env_config.labeling.entity_type_a;
        }
        if env_config.labeling.entity_type_b != labeling_defaults.entity_type_b {
            self.labeling.entity_type_b = env_config.labeling.entity_type_b;
        }
        if env_config.vocabulary.min_occurrence != VocabularyConfig::default().min_occurrence {
            self.vocabulary.min_occurrence = env_config.vocabulary.min_occurrence;
        }
        if env_config.vocabulary.encoding != EncodingKind::default() {
            self.vocabulary.encoding = env_config.vocabulary.encoding;
        }
        let cv_defaults = CrossValidationConfig::default();
        if env_config.cross_validation.folds != cv_defaults.folds {
            self.cross_validation.folds = env_config.cross_validation.folds;
        }
        if env_config.cross_validation.hidden_layers != cv_defaults.hidden_layers {
            self.cross_validation.hidden_layers = env_config.cross_validation.hidden_layers;
        }
        if env_config.cross_validation.scratch_root != cv_defaults.scratch_root {
            self.cross_validation.scratch_root = env_config.cross_validation.scratch_root;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }

        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_layers(value: &str) -> Result<Vec<usize>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DSRE_HIDDEN_LAYERS".to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Folder of relation files whose direction matters
    pub directional_dir: PathBuf,

    /// Folder of relation files whose direction is irrelevant
    pub symmetric_dir: PathBuf,

    /// Column holding the first entity id
    pub entity_a_column: usize,

    /// Column holding the second entity id
    pub entity_b_column: usize,

    /// Column holding the relation indicator (passive forms end in "by")
    pub relation_column: usize,

    /// Supplemental synonym dictionary
    pub synonyms_file: Option<PathBuf>,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            directional_dir: PathBuf::from("distant_supervision/directional"),
            symmetric_dir: PathBuf::from("distant_supervision/symmetric"),
            entity_a_column: 0,
            entity_b_column: 1,
            relation_column: 2,
            synonyms_file: None,
        }
    }
}

/// Candidate labeling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Stop-id list; candidates touching these ids are skipped
    pub stop_list: Option<PathBuf>,

    /// NER type of the first entity
    pub entity_type_a: String,

    /// NER type of the second entity
    pub entity_type_b: String,

    /// Allowlist of first-entity ids (tab-delimited, first column)
    pub entity_a_list: Option<PathBuf>,

    /// Allowlist of second-entity ids (tab-delimited, first column)
    pub entity_b_list: Option<PathBuf>,

    /// NER tag family that marks gene mentions
    pub gene_tag: String,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            stop_list: None,
            entity_type_a: "GENE".to_string(),
            entity_type_b: "GENE".to_string(),
            entity_a_list: None,
            entity_b_list: None,
            gene_tag: "GENE".to_string(),
        }
    }
}

/// Feature encoding used for model input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingKind {
    /// Multi-hot vector for the feed-forward model
    #[default]
    Flat,
    /// Fixed-length id sequences for the recurrent model
    Sequence,
}

impl std::str::FromStr for EncodingKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "sequence" | "lstm" => Ok(Self::Sequence),
            _ => Err(ConfigError::InvalidValue {
                key: "DSRE_ENCODING".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Sequence => write!(f, "sequence"),
        }
    }
}

/// Vocabulary construction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Terms seen fewer times than this are pruned
    pub min_occurrence: usize,

    /// Encoding to build vocabularies for
    pub encoding: EncodingKind,

    /// Pretrained word embeddings (word2vec text format) whose word order
    /// replaces the path-word vocabulary for the sequence encoding
    pub pretrained_embeddings: Option<PathBuf>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            min_occurrence: 100,
            encoding: EncodingKind::Flat,
            pretrained_embeddings: None,
        }
    }
}

/// Cross-validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    /// Number of folds
    pub folds: usize,

    /// Hidden layer sizes handed to the model trainer
    pub hidden_layers: Vec<usize>,

    /// Parent directory of per-fold scratch directories
    pub scratch_root: PathBuf,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            hidden_layers: vec![256],
            scratch_root: PathBuf::from("./model_building_meta_data"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.vocabulary.min_occurrence, 100);
        assert_eq!(config.cross_validation.folds, 10);
        assert_eq!(config.kb.relation_column, 2);
        assert_eq!(config.vocabulary.encoding, EncodingKind::Flat);
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("flat".parse::<EncodingKind>().unwrap(), EncodingKind::Flat);
        assert_eq!("LSTM".parse::<EncodingKind>().unwrap(), EncodingKind::Sequence);
        assert!("dense".parse::<EncodingKind>().is_err());
    }

    #[test]
    fn test_parse_layers() {
        assert_eq!(parse_layers("256, 128").unwrap(), vec![256, 128]);
        assert!(parse_layers("256,x").is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[vocabulary]
min_occurrence = 5
encoding = "sequence"

[cross_validation]
folds = 3
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.vocabulary.min_occurrence, 5);
        assert_eq!(config.vocabulary.encoding, EncodingKind::Sequence);
        assert_eq!(config.cross_validation.folds, 3);
        assert_eq!(config.cross_validation.hidden_layers, vec![256]);
        assert_eq!(config.labeling.gene_tag, "GENE");
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("/no/such/dsre.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
