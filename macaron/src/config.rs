//! Configuration file support.
//!
//! Settings live in an INI file at `<config dir>/macaron/config.ini`:
//!
//! ```ini
//! [catalog]
//! url = https://swscan.apple.com/content/catalogs/...
//!
//! [download]
//! output_dir = /Users/me/BootCamp
//! temp_dir = /tmp
//! fetcher = curl
//! extractor = zip
//! timeout = 0
//! keep_working_dir = false
//!
//! [logging]
//! directory = /Users/me/.config/macaron/logs
//! level = info
//! ```
//!
//! A missing file yields the defaults. Command-line flags take precedence
//! over values from the file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::extractor::ExtractorKind;
use crate::fetch::FetcherKind;
use crate::DEFAULT_CATALOG_URL;

/// Name of the configuration file.
pub const CONFIG_FILENAME: &str = "config.ini";

/// Name of the application directory under the platform config dir.
const APP_DIRNAME: &str = "macaron";

/// Log levels accepted in `[logging] level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("failed to read config {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The file could not be written.
    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value failed validation.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The key is not a known setting.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[catalog]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Catalog URL.
    pub url: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_string(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadSettings {
    /// Directory landing directories are created in; current dir if unset.
    pub output_dir: Option<PathBuf>,
    /// Temp root for the catalog and working directories; system temp if unset.
    pub temp_dir: Option<PathBuf>,
    /// How URLs are fetched.
    pub fetcher: FetcherKind,
    /// How packages are unpacked.
    pub extractor: ExtractorKind,
    /// Per-request timeout in seconds; 0 disables it.
    pub timeout: u64,
    /// Keep working directories after a run.
    pub keep_working_dir: bool,
}

impl DownloadSettings {
    /// Timeout as a duration, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for the log file.
    pub directory: PathBuf,
    /// Default log level.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_dir().join("logs"),
            level: "info".to_string(),
        }
    }
}

/// Contents of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub catalog: CatalogSettings,
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = Self::default();

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|s| s.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Every user-editable setting, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CatalogUrl,
    DownloadOutputDir,
    DownloadTempDir,
    DownloadFetcher,
    DownloadExtractor,
    DownloadTimeout,
    DownloadKeepWorkingDir,
    LoggingDirectory,
    LoggingLevel,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::CatalogUrl,
            ConfigKey::DownloadOutputDir,
            ConfigKey::DownloadTempDir,
            ConfigKey::DownloadFetcher,
            ConfigKey::DownloadExtractor,
            ConfigKey::DownloadTimeout,
            ConfigKey::DownloadKeepWorkingDir,
            ConfigKey::LoggingDirectory,
            ConfigKey::LoggingLevel,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CatalogUrl => "catalog.url",
            Self::DownloadOutputDir => "download.output_dir",
            Self::DownloadTempDir => "download.temp_dir",
            Self::DownloadFetcher => "download.fetcher",
            Self::DownloadExtractor => "download.extractor",
            Self::DownloadTimeout => "download.timeout",
            Self::DownloadKeepWorkingDir => "download.keep_working_dir",
            Self::LoggingDirectory => "logging.directory",
            Self::LoggingLevel => "logging.level",
        }
    }

    /// INI section of the key.
    pub fn section(&self) -> &'static str {
        match self.name().split_once('.') {
            Some((section, _)) => section,
            None => "",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self.name().split_once('.') {
            Some((_, key)) => key,
            None => self.name(),
        }
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let path = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };

        match self {
            Self::CatalogUrl => config.catalog.url.clone(),
            Self::DownloadOutputDir => path(&config.download.output_dir),
            Self::DownloadTempDir => path(&config.download.temp_dir),
            Self::DownloadFetcher => config.download.fetcher.to_string(),
            Self::DownloadExtractor => config.download.extractor.to_string(),
            Self::DownloadTimeout => config.download.timeout.to_string(),
            Self::DownloadKeepWorkingDir => config.download.keep_working_dir.to_string(),
            Self::LoggingDirectory => config.logging.directory.display().to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validate and store a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> ConfigResult<()> {
        let value = value.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason,
        };
        let optional_path = |v: &str| (!v.is_empty()).then(|| PathBuf::from(v));

        match self {
            Self::CatalogUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid("expected an http(s) URL".to_string()));
                }
                config.catalog.url = value.to_string();
            }
            Self::DownloadOutputDir => config.download.output_dir = optional_path(value),
            Self::DownloadTempDir => config.download.temp_dir = optional_path(value),
            Self::DownloadFetcher => {
                config.download.fetcher = FetcherKind::from_str(value).map_err(invalid)?;
            }
            Self::DownloadExtractor => {
                config.download.extractor = ExtractorKind::from_str(value).map_err(invalid)?;
            }
            Self::DownloadTimeout => {
                config.download.timeout = value
                    .parse()
                    .map_err(|_| invalid("expected a number of seconds".to_string()))?;
            }
            Self::DownloadKeepWorkingDir => {
                config.download.keep_working_dir = parse_bool(value)
                    .ok_or_else(|| invalid("expected true or false".to_string()))?;
            }
            Self::LoggingDirectory => {
                if value.is_empty() {
                    return Err(invalid("directory must not be empty".to_string()));
                }
                config.logging.directory = PathBuf::from(value);
            }
            Self::LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(invalid(format!("expected one of {}", LOG_LEVELS.join(", "))));
                }
                config.logging.level = level;
            }
        }

        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Application configuration directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIRNAME)
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.catalog.url, DEFAULT_CATALOG_URL);
        assert_eq!(config.download.fetcher, FetcherKind::Curl);
        assert_eq!(config.download.extractor, ExtractorKind::Zip);
        assert_eq!(config.download.timeout(), None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_sections() {
        let config = ConfigFile::parse(
            "[catalog]\n\
             url = https://example.com/index.sucatalog\n\
             [download]\n\
             output_dir = /drivers\n\
             fetcher = http\n\
             extractor = 7z\n\
             timeout = 120\n\
             keep_working_dir = yes\n\
             [logging]\n\
             level = DEBUG\n",
        )
        .unwrap();

        assert_eq!(config.catalog.url, "https://example.com/index.sucatalog");
        assert_eq!(config.download.output_dir, Some(PathBuf::from("/drivers")));
        assert_eq!(config.download.temp_dir, None);
        assert_eq!(config.download.fetcher, FetcherKind::Http);
        assert_eq!(config.download.extractor, ExtractorKind::SevenZip);
        assert_eq!(config.download.timeout(), Some(Duration::from_secs(120)));
        assert!(config.download.keep_working_dir);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let err = ConfigFile::parse("[download]\nfetcher = ftp\n").unwrap_err();
        assert!(err.to_string().contains("download.fetcher"));

        assert!(ConfigFile::parse("[download]\ntimeout = soon\n").is_err());
        assert!(ConfigFile::parse("[catalog]\nurl = file:///etc/passwd\n").is_err());
        assert!(ConfigFile::parse("[logging]\nlevel = loud\n").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");

        let mut config = ConfigFile::default();
        config.download.output_dir = Some(PathBuf::from("/drivers"));
        config.download.timeout = 30;
        config.download.fetcher = FetcherKind::Wget;
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_key_parse() {
        assert_eq!(
            "download.fetcher".parse::<ConfigKey>().unwrap(),
            ConfigKey::DownloadFetcher
        );
        assert!(matches!(
            "download.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_config_key_parts() {
        assert_eq!(ConfigKey::DownloadTempDir.section(), "download");
        assert_eq!(ConfigKey::DownloadTempDir.key_name(), "temp_dir");
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_config_key_get_set() {
        let mut config = ConfigFile::default();

        ConfigKey::DownloadOutputDir
            .set(&mut config, "/srv/bootcamp")
            .unwrap();
        assert_eq!(ConfigKey::DownloadOutputDir.get(&config), "/srv/bootcamp");

        ConfigKey::DownloadOutputDir.set(&mut config, "").unwrap();
        assert_eq!(ConfigKey::DownloadOutputDir.get(&config), "");

        assert!(ConfigKey::DownloadKeepWorkingDir
            .set(&mut config, "maybe")
            .is_err());
    }
}
