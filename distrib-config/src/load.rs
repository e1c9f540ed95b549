use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use std::{
    fmt, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::environment::Environment;

/// Default directory containing configuration files, relative to the working directory.
pub const CONFIGURATION_DIR: &str = "configuration";

/// Supported extensions for base and environment configuration files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Identifies which configuration file is being looked up.
#[derive(Debug, Clone, Copy)]
enum ConfigFileKind {
    /// Required file loaded first.
    Base,
    /// Optional per-environment overrides.
    Environment(Environment),
}

impl ConfigFileKind {
    fn stem(&self) -> &'static str {
        match self {
            ConfigFileKind::Base => "base",
            ConfigFileKind::Environment(env) => env.as_str(),
        }
    }
}

impl fmt::Display for ConfigFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileKind::Base => f.write_str("base configuration"),
            ConfigFileKind::Environment(env) => write!(f, "{env} environment configuration"),
        }
    }
}

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    #[error("could not locate {kind_description} in `{directory}`; attempted: {attempted}")]
    ConfigurationFileMissing {
        kind_description: String,
        directory: PathBuf,
        attempted: String,
    },

    #[error("failed to load {kind_description} from `{path}`: {source}")]
    ConfigurationFileLoad {
        kind_description: String,
        path: PathBuf,
        source: config::ConfigError,
    },

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("failed to build configuration: {0}")]
    Builder(#[source] config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads hierarchical configuration from `directory`.
///
/// Sources are layered in order: `base.(yaml|yml|json)` (required), then
/// `{environment}.(yaml|yml|json)` (optional), then `APP_`-prefixed environment variables.
/// Nested keys in environment variables use double underscores (`APP_SECTION__KEY`).
pub fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            directory.to_path_buf(),
        ));
    }

    let base_file = find_configuration_file(directory, ConfigFileKind::Base)?
        .ok_or_else(|| missing_file_error(directory, ConfigFileKind::Base))?;

    let builder = config::Config::builder().add_source(config::File::from(base_file.clone()));
    validate_configuration_source(&builder, ConfigFileKind::Base, &base_file)?;

    let environment_kind = ConfigFileKind::Environment(environment);
    let builder = match find_configuration_file(directory, environment_kind)? {
        Some(environment_file) => {
            let builder = builder.add_source(config::File::from(environment_file.clone()));
            validate_configuration_source(&builder, environment_kind, &environment_file)?;
            builder
        }
        None => builder,
    };

    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

/// Returns the first existing file for `kind` across the supported extensions.
fn find_configuration_file(
    directory: &Path,
    kind: ConfigFileKind,
) -> Result<Option<PathBuf>, LoadConfigError> {
    for extension in CONFIG_FILE_EXTENSIONS {
        let path = directory.join(format!("{}.{extension}", kind.stem()));
        if path.is_file() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn missing_file_error(directory: &Path, kind: ConfigFileKind) -> LoadConfigError {
    let attempted = CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| {
            format!(
                "`{}`",
                directory
                    .join(format!("{}.{extension}", kind.stem()))
                    .display()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    LoadConfigError::ConfigurationFileMissing {
        kind_description: kind.to_string(),
        directory: directory.to_path_buf(),
        attempted,
    }
}

fn validate_configuration_source(
    builder: &ConfigBuilder<DefaultState>,
    kind: ConfigFileKind,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map(|_| ())
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            kind_description: kind.to_string(),
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{DistribConfig, ShutdownMode};
    use std::fs;

    fn config_dir() -> tempfile::TempDir {
        tempfile::Builder::new()
            .prefix("distrib-config")
            .tempdir()
            .unwrap()
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = config_dir();
        let missing = dir.path().join("nope");

        let err = load_config_from::<DistribConfig>(&missing, Environment::Dev).unwrap_err();
        assert!(matches!(err, LoadConfigError::MissingConfigurationDirectory(_)));
    }

    #[test]
    fn test_missing_base_file_lists_attempts() {
        let dir = config_dir();

        let err = load_config_from::<DistribConfig>(dir.path(), Environment::Dev).unwrap_err();
        match err {
            LoadConfigError::ConfigurationFileMissing { attempted, .. } => {
                assert!(attempted.contains("base.yaml"));
                assert!(attempted.contains("base.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = config_dir();
        fs::write(
            dir.path().join("base.yaml"),
            "worker_count: 3\nwant: 4\nshutdown_mode: graceful_drain\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("prod.yaml"),
            "want: 8\nshutdown_mode: abandon\n",
        )
        .unwrap();

        let config: DistribConfig = load_config_from(dir.path(), Environment::Prod).unwrap();
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.want, 8);
        assert_eq!(config.shutdown_mode, ShutdownMode::Abandon);
        assert_eq!(config.task_timeout_ms, DistribConfig::DEFAULT_TASK_TIMEOUT_MS);
    }

    #[test]
    fn test_environment_file_is_optional() {
        let dir = config_dir();
        fs::write(dir.path().join("base.json"), r#"{"want": 2}"#).unwrap();

        let config: DistribConfig = load_config_from(dir.path(), Environment::Dev).unwrap();
        assert_eq!(config.want, 2);
        assert_eq!(config.worker_count, DistribConfig::DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn test_malformed_file_is_reported_with_path() {
        let dir = config_dir();
        fs::write(dir.path().join("base.yaml"), "worker_count: [unterminated\n").unwrap();

        let err = load_config_from::<DistribConfig>(dir.path(), Environment::Dev).unwrap_err();
        match err {
            LoadConfigError::ConfigurationFileLoad { path, .. } => {
                assert!(path.ends_with("base.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
