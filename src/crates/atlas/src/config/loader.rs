//! Configuration loader with dual-location support
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.atlas/atlas.toml
//! 3. Project-level config: ./.atlas/atlas.toml
//! 4. Environment overrides (`ATLAS_COST_MODE`, `ATLAS_LOG_LEVEL`)
//!
//! Files are merged key by key, so a project file that only sets
//! `[routing]` keeps the user's `[providers]` block.

use crate::config::schema::AtlasConfig;
use crate::error::{AtlasError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_DIR: &str = ".atlas";
const CONFIG_FILE: &str = "atlas.toml";

/// Configuration loader that handles both user and project configs
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let user_config_path = dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE));
        let project_config_path = PathBuf::from(".").join(CONFIG_DIR).join(CONFIG_FILE);

        Self {
            user_config_path,
            project_config_path,
        }
    }

    /// Loader with explicit file locations.
    pub fn with_paths(user_config_path: Option<PathBuf>, project_config_path: PathBuf) -> Self {
        Self {
            user_config_path,
            project_config_path,
        }
    }

    /// Load configuration from both locations with project taking precedence
    pub async fn load(&self) -> Result<AtlasConfig> {
        let mut merged = default_table()?;

        let candidates = self
            .user_config_path
            .iter()
            .chain(std::iter::once(&self.project_config_path));

        for path in candidates {
            match Self::read_table(path).await? {
                Some(layer) => {
                    debug!(path = %path.display(), "Loaded config layer");
                    merge_values(&mut merged, layer);
                }
                None => debug!(path = %path.display(), "Config file not present"),
            }
        }

        let mut config: AtlasConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| AtlasError::Config(format!("Invalid configuration: {}", e)))?;

        config.resolve_env_vars();
        config.apply_env_overrides()?;

        info!(cost_mode = %config.routing.cost_mode, "Configuration loaded");
        Ok(config)
    }

    /// Load a single file on top of defaults.
    pub async fn load_file(path: &Path) -> Result<AtlasConfig> {
        let layer = Self::read_table(path).await?.ok_or_else(|| {
            AtlasError::Config(format!("Config file not found: {}", path.display()))
        })?;

        let mut merged = default_table()?;
        merge_values(&mut merged, layer);

        let mut config: AtlasConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| AtlasError::Config(format!("Invalid configuration in {}: {}", path.display(), e)))?;
        config.resolve_env_vars();
        Ok(config)
    }

    /// `Ok(None)` when the file does not exist; parse errors are fatal.
    async fn read_table(path: &Path) -> Result<Option<toml::Value>> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AtlasError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let value: toml::Value = toml::from_str(&content)
            .map_err(|e| AtlasError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        Ok(Some(value))
    }

    pub fn user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn project_config_path(&self) -> &Path {
        &self.project_config_path
    }
}

/// Defaults as a TOML tree, so a file may set a single key of any block.
fn default_table() -> Result<toml::Value> {
    toml::Value::try_from(AtlasConfig::default())
        .map_err(|e| AtlasError::Config(format!("Failed to encode default configuration: {}", e)))
}

/// Recursively overlay `layer` onto `base`. Tables merge; everything else replaces.
fn merge_values(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base_table), toml::Value::Table(layer_table)) => {
            for (key, value) in layer_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::CostMode;
    use tempfile::TempDir;

    async fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_defaults_when_no_files() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_paths(None, temp.path().join("missing.toml"));

        let config = loader.load().await.unwrap();

        assert_eq!(config.providers, AtlasConfig::default().providers);
        assert_eq!(config.workflow, AtlasConfig::default().workflow);
    }

    #[tokio::test]
    async fn test_project_overrides_user_key_by_key() {
        let temp = TempDir::new().unwrap();
        let user = write(
            &temp,
            "user.toml",
            r#"
            [providers.factory]
            base_url = "https://genai.fab12.internal/v1"
            api_key = "user-key"

            [workflow]
            max_invocation_retries = 1
            "#,
        )
        .await;
        let project = write(
            &temp,
            "project.toml",
            r#"
            [providers.factory]
            api_key = "project-key"

            [workflow]
            collect_timeout_secs = 300
            "#,
        )
        .await;

        let config = ConfigLoader::with_paths(Some(user), project).load().await.unwrap();

        assert_eq!(config.providers.factory.base_url, "https://genai.fab12.internal/v1");
        assert_eq!(config.providers.factory.api_key.as_deref(), Some("project-key"));
        assert_eq!(config.workflow.max_invocation_retries, 1);
        assert_eq!(config.workflow.collect_timeout_secs, Some(300));
    }

    #[tokio::test]
    async fn test_key_only_provider_block_keeps_default_url() {
        let temp = TempDir::new().unwrap();
        let project = write(
            &temp,
            "project.toml",
            r#"
            [providers.factory]
            api_key = "factory-key"
            "#,
        )
        .await;

        let config = ConfigLoader::with_paths(None, project.clone()).load().await.unwrap();
        let defaults = AtlasConfig::default();

        assert_eq!(config.providers.factory.base_url, defaults.providers.factory.base_url);
        assert_eq!(config.providers.factory.timeout_secs, defaults.providers.factory.timeout_secs);
        assert_eq!(config.providers.factory.api_key.as_deref(), Some("factory-key"));
        assert_eq!(config.providers.anthropic, defaults.providers.anthropic);

        let single = ConfigLoader::load_file(&project).await.unwrap();
        assert_eq!(single.providers.factory.base_url, defaults.providers.factory.base_url);
        assert_eq!(single.providers.factory.api_key.as_deref(), Some("factory-key"));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let project = write(&temp, "bad.toml", "[routing\ncost_mode = ").await;

        let err = ConfigLoader::with_paths(None, project).load().await.unwrap_err();
        assert!(matches!(err, AtlasError::Config(ref m) if m.contains("Failed to parse")));
    }

    #[tokio::test]
    async fn test_load_file() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "atlas.toml", "[routing]\ncost_mode = \"runtime\"\n").await;

        let config = ConfigLoader::load_file(&path).await.unwrap();
        assert_eq!(config.routing.cost_mode, CostMode::Runtime);

        let missing = ConfigLoader::load_file(&temp.path().join("nope.toml")).await;
        assert!(missing.is_err());
    }

    #[test]
    fn test_merge_values_replaces_scalars_and_merges_tables() {
        let mut base: toml::Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let layer: toml::Value = toml::from_str("a = 5\n[t]\ny = 3\n").unwrap();

        merge_values(&mut base, layer);

        assert_eq!(base["a"].as_integer(), Some(5));
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }
}
