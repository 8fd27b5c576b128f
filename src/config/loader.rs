//! Configuration Loader
//!
//! Environment-aware configuration loading. Layers, lowest precedence first:
//! `base.yaml`, `<environment>.yaml`, then `PROVISIONER__`-prefixed
//! environment variables (`PROVISIONER__ORCHESTRATOR__MAX_CONCURRENT_JOBS=4`).

use super::ProvisionerConfig;
use crate::error::Result;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CONFIG_DIR: &str = "config/provisioner";
const ENV_PREFIX: &str = "PROVISIONER";

/// Loaded, validated configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ProvisionerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful in tests to avoid touching process environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading provisioner configuration"
        );

        let config = Config::builder()
            .add_source(File::from(config_directory.join("base.yaml")).required(false))
            .add_source(
                File::from(config_directory.join(format!("{environment}.yaml"))).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<ProvisionerConfig>()?;

        config.validate()?;

        info!(
            environment = %environment,
            max_concurrent_jobs = config.orchestrator.max_concurrent_jobs,
            managed_workspaces = config.workspace.managed,
            region = %config.workspace.region,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: ProvisionerConfig, environment: &str) -> Result<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from(DEFAULT_CONFIG_DIR),
        }))
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Effective configuration as JSON, for diagnostics
    pub fn debug_config(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.config)?)
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("PROVISIONER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionerError;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_debug_config_exposes_every_section() {
        let manager = ConfigManager::from_config(ProvisionerConfig::default(), "test").unwrap();
        let effective = manager.debug_config().unwrap();

        assert_eq!(effective["orchestrator"]["max_concurrent_jobs"], 8);
        assert!(effective["templates"]["output_port"].is_array());
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().orchestrator.max_concurrent_jobs, 8);
        assert!(manager.config().workspace.managed);
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "base.yaml",
            "orchestrator:\n  max_concurrent_jobs: 4\nworkspace:\n  region: northeurope\n",
        );
        write(
            &dir,
            "production.yaml",
            "orchestrator:\n  max_concurrent_jobs: 16\nworkspace:\n  managed: false\n",
        );

        let manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "production",
        )
        .unwrap();

        let config = manager.config();
        assert_eq!(config.orchestrator.max_concurrent_jobs, 16);
        assert_eq!(config.workspace.region, "northeurope");
        assert!(!config.workspace.managed);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base.yaml", "orchestrator:\n  max_concurrent_jobs: 0\n");

        let err =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap_err();

        assert!(matches!(err, ProvisionerError::ConfigurationError(_)));
    }

    #[test]
    fn test_permission_levels_are_read_from_yaml() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "base.yaml",
            "permissions:\n  job:\n    owner: CAN_MANAGE\n    developers: CAN_VIEW\n",
        );

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(
            manager.config().permissions.job.developers,
            crate::models::resource::PermissionLevel::CanView
        );
    }
}
