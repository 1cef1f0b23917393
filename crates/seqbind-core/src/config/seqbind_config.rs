//! Top-level seqbind configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ParserConfig, PartitionConfig, ProgressConfig, TableConfig};
use crate::constants::MAX_KSIZE;
use crate::errors::ConfigError;

/// Name of the project-level configuration file.
pub const CONFIG_FILE_NAME: &str = "seqbind.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`SEQBIND_*`)
/// 2. Project config (`seqbind.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SeqbindConfig {
    pub tables: TableConfig,
    pub progress: ProgressConfig,
    pub partition: PartitionConfig,
    pub parser: ParserConfig,
}

impl SeqbindConfig {
    /// Load configuration with layered resolution.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(CONFIG_FILE_NAME);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &SeqbindConfig) -> Result<(), ConfigError> {
        if let Some(k) = config.tables.ksize {
            if k == 0 || k > MAX_KSIZE {
                return Err(ConfigError::ValidationFailed {
                    field: "tables.ksize".to_string(),
                    message: format!("must be between 1 and {MAX_KSIZE}"),
                });
            }
        }
        if config.tables.n_tables == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "tables.n_tables".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.tables.table_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "tables.table_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.progress.report_interval == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "progress.report_interval".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.partition.tag_density == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "partition.tag_density".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Err(e) = config.parser.effective_default_pairing() {
            return Err(ConfigError::ValidationFailed {
                field: "parser.default_pairing".to_string(),
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored.
    fn merge_toml_file(config: &mut SeqbindConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: SeqbindConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`, where `other` values override `base` values
    /// only when `other` has a `Some` value.
    fn merge(base: &mut SeqbindConfig, other: &SeqbindConfig) {
        // Tables
        if other.tables.ksize.is_some() {
            base.tables.ksize = other.tables.ksize;
        }
        if other.tables.n_tables.is_some() {
            base.tables.n_tables = other.tables.n_tables;
        }
        if other.tables.table_size.is_some() {
            base.tables.table_size = other.tables.table_size;
        }

        // Progress
        if other.progress.report_interval.is_some() {
            base.progress.report_interval = other.progress.report_interval;
        }

        // Partition
        if other.partition.tag_density.is_some() {
            base.partition.tag_density = other.partition.tag_density;
        }
        if other.partition.traversal_limit.is_some() {
            base.partition.traversal_limit = other.partition.traversal_limit;
        }
        if other.partition.stop_big_traversals.is_some() {
            base.partition.stop_big_traversals = other.partition.stop_big_traversals;
        }

        // Parser
        if other.parser.default_pairing.is_some() {
            base.parser.default_pairing = other.parser.default_pairing.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `SEQBIND_TABLES_KSIZE`, `SEQBIND_PROGRESS_REPORT_INTERVAL`, etc.
    fn apply_env_overrides(config: &mut SeqbindConfig) {
        if let Ok(val) = std::env::var("SEQBIND_TABLES_KSIZE") {
            if let Ok(v) = val.parse::<u32>() {
                config.tables.ksize = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEQBIND_TABLES_N_TABLES") {
            if let Ok(v) = val.parse::<u32>() {
                config.tables.n_tables = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEQBIND_TABLES_TABLE_SIZE") {
            if let Ok(v) = val.parse::<u64>() {
                config.tables.table_size = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEQBIND_PROGRESS_REPORT_INTERVAL") {
            if let Ok(v) = val.parse::<u64>() {
                config.progress.report_interval = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEQBIND_PARTITION_TAG_DENSITY") {
            if let Ok(v) = val.parse::<u32>() {
                config.partition.tag_density = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEQBIND_PARSER_DEFAULT_PAIRING") {
            config.parser.default_pairing = Some(val);
        }
    }
}
