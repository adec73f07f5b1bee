//! Locating and reading `config.toml`.

use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};
use directories::ProjectDirs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Failures that stop configuration from loading at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `--config` was given and the platform has no config directory.
    #[error("no config path given and no platform config directory available")]
    NoConfigDir,
    /// The file exists but could not be read, or the default could not be written.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The default configuration could not be rendered.
    #[error("rendering default config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// How the returned configuration was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from an existing file.
    File,
    /// No file existed; defaults were written to it.
    CreatedDefault,
    /// The file was malformed and left untouched; defaults are in use.
    Fallback {
        /// Parser message.
        reason: String,
    },
}

/// Result of [`ConfigLoader::load`].
///
/// Loading usually happens before logging is set up, so the outcome is
/// carried here and reported with [`LoadedConfig::report`] afterwards.
#[derive(Debug)]
pub struct LoadedConfig {
    /// Effective file configuration.
    pub config: AppConfig,
    /// Where it came from.
    pub source: ConfigSource,
    /// File that was read or created.
    pub path: PathBuf,
}

impl LoadedConfig {
    /// Logs how the configuration was obtained.
    pub fn report(&self) {
        match &self.source {
            ConfigSource::File => info!(path = %self.path.display(), "Loaded configuration"),
            ConfigSource::CreatedDefault => {
                info!(path = %self.path.display(), "Wrote default configuration");
            }
            ConfigSource::Fallback { reason } => warn!(
                path = %self.path.display(),
                %reason,
                "Config file is malformed, using defaults"
            ),
        }
    }

    /// Returns true if a malformed file was ignored.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, ConfigSource::Fallback { .. })
    }
}

/// Reads one configuration file, creating it with defaults when missing.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Uses `path_override` when given, otherwise `config.toml` in the
    /// platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if there is no override and no
    /// platform directory.
    pub fn locate(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path_override {
            return Ok(Self::at(path.to_path_buf()));
        }

        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| Self::at(dirs.config_dir().join(CONFIG_FILE_NAME)))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Reads exactly `path`.
    #[must_use]
    pub const fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the file this loader reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration. A malformed file is not an error: it is left
    /// as is and reported through [`ConfigSource::Fallback`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on I/O failure.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let (config, source) = match std::fs::read_to_string(&self.path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => (config, ConfigSource::File),
                Err(e) => (
                    AppConfig::default(),
                    ConfigSource::Fallback {
                        reason: e.message().to_string(),
                    },
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = AppConfig::default();
                self.write_default(&config)?;
                (config, ConfigSource::CreatedDefault)
            }
            Err(source) => return Err(self.io_error(source)),
        };

        Ok(LoadedConfig {
            config,
            source,
            path: self.path.clone(),
        })
    }

    fn write_default(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(config)?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        // Written beside the target and renamed, so readers never see half a file.
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        staged
            .write_all(rendered.as_bytes())
            .map_err(|e| self.io_error(e))?;
        staged
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    use crate::infrastructure::config::LogLevel;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_by(loaded: &LoadedConfig) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || loaded.report());
        let bytes = captured.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let loaded = assert_ok!(ConfigLoader::at(path.clone()).load());

        assert_eq!(loaded.source, ConfigSource::CreatedDefault);
        assert_eq!(loaded.config, AppConfig::default());
        let written: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, AppConfig::default());
    }

    #[test]
    fn test_existing_file_is_parsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "log_level = \"warn\"\n[cache]\ncapacity = 12\n").unwrap();

        let loaded = assert_ok!(ConfigLoader::at(path).load());

        assert_eq!(loaded.source, ConfigSource::File);
        assert_eq!(loaded.config.cache.capacity, 12);
        assert_eq!(loaded.config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_malformed_file_falls_back_and_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[cache\ncapacity = ").unwrap();

        let loaded = assert_ok!(ConfigLoader::at(path.clone()).load());

        assert!(loaded.is_fallback());
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[cache\ncapacity = ");

        let output = logged_by(&loaded);
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("Config file is malformed, using defaults"), "{output}");
    }

    #[test]
    fn test_override_skips_platform_directory() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom.toml");

        let loader = assert_ok!(ConfigLoader::locate(Some(&custom)));

        assert_eq!(loader.path(), custom.as_path());
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a file.
        let err = assert_err!(ConfigLoader::at(dir.path().to_path_buf()).load());
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
