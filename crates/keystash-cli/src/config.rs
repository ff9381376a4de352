use std::{
    env, fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use color_eyre::Result;
use dirs::config_dir;
use keystash_storage::aws::AwsSettings;
use serde::{Deserialize, Serialize};

/// Which store implementation the CLI talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Volatile in-process store; contents vanish when the command exits.
    #[default]
    Memory,
    /// AWS Secrets Manager behind a local cache.
    Aws,
}

/// User-level configuration loaded from `~/.config/keystash/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AwsConfig {
    /// Namespace prefix joined with every secret name.
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_delete: bool,
}

impl AwsConfig {
    pub fn settings(&self) -> AwsSettings {
        AwsSettings {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_delete: self.force_delete,
        }
    }
}

impl Config {
    /// Apply `--backend` / `--prefix` style overrides on top of loaded config.
    pub fn with_overrides(mut self, backend: Option<Backend>, prefix: Option<String>) -> Self {
        if let Some(backend) = backend {
            self.backend = backend;
        }
        if let Some(prefix) = prefix {
            self.aws.get_or_insert_with(AwsConfig::default).prefix = Some(prefix);
        }
        self
    }
}

/// Load config from the default path, then apply environment overrides.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    let config = load_from_path(path)?;
    apply_env(config, |key| env::var(key).ok())
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Apply `KEYSTASH_BACKEND` and `KEYSTASH_AWS_PREFIX`.
fn apply_env(config: Config, var: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let backend = var("KEYSTASH_BACKEND")
        .map(|raw| {
            Backend::from_str(&raw, true)
                .map_err(|err| color_eyre::eyre::eyre!("invalid KEYSTASH_BACKEND: {err}"))
        })
        .transpose()?;
    Ok(config.with_overrides(backend, var("KEYSTASH_AWS_PREFIX")))
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("keystash").join("config.toml"))
}

/// Write the given config to disk unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.backend, Backend::Memory);
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            backend = "aws"
            [aws]
            prefix = "app/prod"
            region = "eu-west-1"
            profile = "ops"
            endpoint_url = "http://localhost:4566"
            force_delete = true
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            Config {
                backend: Backend::Aws,
                aws: Some(AwsConfig {
                    prefix: Some("app/prod".into()),
                    region: Some("eu-west-1".into()),
                    profile: Some("ops".into()),
                    endpoint_url: Some("http://localhost:4566".into()),
                    force_delete: true,
                }),
            }
        );
        assert_eq!(
            cfg.aws.expect("aws section").settings(),
            AwsSettings {
                region: Some("eu-west-1".into()),
                profile: Some("ops".into()),
                endpoint_url: Some("http://localhost:4566".into()),
                force_delete: true,
            }
        );
    }

    #[test]
    fn env_overrides_backend_and_prefix() {
        let vars: HashMap<&str, &str> = [
            ("KEYSTASH_BACKEND", "AWS"),
            ("KEYSTASH_AWS_PREFIX", "app/staging"),
        ]
        .into_iter()
        .collect();

        let cfg = apply_env(Config::default(), |key| vars.get(key).map(|v| v.to_string()))
            .expect("apply env");

        assert_eq!(cfg.backend, Backend::Aws);
        assert_eq!(
            cfg.aws.and_then(|aws| aws.prefix).as_deref(),
            Some("app/staging")
        );
    }

    #[test]
    fn rejects_unknown_backend_in_env() {
        let result = apply_env(Config::default(), |key| {
            (key == "KEYSTASH_BACKEND").then(|| "vault".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn flag_overrides_win_over_file() {
        let cfg = Config {
            backend: Backend::Aws,
            aws: Some(AwsConfig {
                prefix: Some("from-file".into()),
                ..AwsConfig::default()
            }),
        }
        .with_overrides(Some(Backend::Memory), Some("from-flag".into()));

        assert_eq!(cfg.backend, Backend::Memory);
        assert_eq!(cfg.aws.and_then(|aws| aws.prefix).as_deref(), Some("from-flag"));
    }

    #[test]
    fn write_default_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keystash").join("config.toml");
        let cfg = Config {
            backend: Backend::Aws,
            aws: Some(AwsConfig {
                prefix: Some("app/prod".into()),
                ..AwsConfig::default()
            }),
        };

        write_to_path_if_missing(&cfg, &path).expect("write should succeed");
        let second = write_to_path_if_missing(&Config::default(), &path).expect("second write ok");
        assert_eq!(second, path);
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
