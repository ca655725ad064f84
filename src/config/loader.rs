//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, and configuration merging: a base
//! `congregate-config.yaml` plus an optional `congregate-config.<env>.yaml`
//! override merged on top of it.

use super::error::{ConfigResult, ConfigurationError};
use super::OrchestrationConfig;
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const BASE_CONFIG_FILE: &str = "congregate-config.yaml";

/// Loaded configuration plus the context it was loaded from
pub struct ConfigManager {
    config: OrchestrationConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = crate::logging::get_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            environment = environment,
            "Configuration loaded and validated successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Environment the configuration was loaded for
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Directory the configuration was loaded from
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<OrchestrationConfig> {
        let base_path = config_directory.join(BASE_CONFIG_FILE);

        if !base_path.exists() {
            warn!(
                "No configuration file at {}; using built-in defaults",
                base_path.display()
            );
            return Ok(OrchestrationConfig::default());
        }

        let base_content = Self::read_config_file_safely(&base_path)?;
        let mut merged: YamlValue = serde_yaml::from_str(&base_content)
            .map_err(|e| ConfigurationError::parse_error(base_path.display().to_string(), e))?;

        let env_path =
            config_directory.join(format!("congregate-config.{environment}.yaml"));
        if env_path.exists() {
            let env_content = Self::read_config_file_safely(&env_path)?;
            let overlay: YamlValue = serde_yaml::from_str(&env_content)
                .map_err(|e| ConfigurationError::parse_error(env_path.display().to_string(), e))?;

            debug!("Merging environment override: {}", env_path.display());
            merged = Self::merge_values(merged, overlay);
        }

        serde_yaml::from_value(merged)
            .map_err(|e| ConfigurationError::parse_error(base_path.display().to_string(), e))
    }

    /// Safely read a configuration file with a size limit
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1MB limit

        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::FileTooLarge(path.to_path_buf()));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    /// Deep-merge `overlay` on top of `base`. Mappings merge recursively;
    /// every other value type is replaced wholesale.
    fn merge_values(base: YamlValue, overlay: YamlValue) -> YamlValue {
        match (base, overlay) {
            (YamlValue::Mapping(mut base_map), YamlValue::Mapping(overlay_map)) => {
                for (key, overlay_value) in overlay_map {
                    let merged_value = match base_map.remove(&key) {
                        Some(base_value) => Self::merge_values(base_value, overlay_value),
                        None => overlay_value,
                    };
                    base_map.insert(key, merged_value);
                }
                YamlValue::Mapping(base_map)
            }
            (_, overlay) => overlay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_config_directory_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(manager.config().circuit_breakers.failure_threshold, 5);
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_override_merges_on_top_of_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("congregate-config.yaml"),
            r#"
circuit_breakers:
  failure_threshold: 7
  reset_timeout_ms: 10000
health:
  check_interval_ms: 2000
  probe_timeout_ms: 1000
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("congregate-config.test.yaml"),
            r#"
circuit_breakers:
  failure_threshold: 2
"#,
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        // Overridden by environment file
        assert_eq!(manager.config().circuit_breakers.failure_threshold, 2);
        // Preserved from base file
        assert_eq!(manager.config().circuit_breakers.reset_timeout_ms, 10_000);
        assert_eq!(manager.config().health.check_interval_ms, 2_000);
        // Untouched sections fall back to defaults
        assert_eq!(manager.config().maintenance.max_recovery_attempts, 3);
    }

    #[test]
    fn test_invalid_config_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("congregate-config.yaml"),
            r#"
circuit_breakers:
  failure_threshold: 0
"#,
        )
        .unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(result.is_err());
    }
}
