//! Layered TOML configuration for mcpchat.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use mcpchat_mcp::ConnectionConfig;
use mcpchat_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use mcpchat_api::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Resolved configuration for a chat session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Server to connect to, if one was named on the command line or in the file.
    pub server: Option<ServerSettings>,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub server: Option<ServerSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The `[server]` section: a connection plus transport options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Positional server argument: a script path or an `http(s)://` endpoint.
    pub server: Option<String>,
    pub server_api_key: Option<String>,
}

/// Snapshot of the environment variables mcpchat reads.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub config_dir: Option<PathBuf>,
}

impl EnvVars {
    /// Read from the process environment. Empty values count as unset.
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL"),
            model: var("MCPCHAT_MODEL"),
            config_dir: var("MCPCHAT_CONFIG_DIR").map(PathBuf::from),
        }
    }
}

impl ChatConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (~/.mcpchat/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let env = EnvVars::from_process();
        let config_dir = config_dir(&env);
        let settings = load_settings_file(&config_dir.join("config.toml"));
        Self::resolve(overrides, env, settings, config_dir)
    }

    /// Merge already-gathered sources. `load` without the I/O.
    pub fn resolve(
        overrides: CliOverrides,
        env: EnvVars,
        settings: SettingsFile,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let api_key = overrides
            .api_key
            .or(env.api_key)
            .or(settings.api.api_key)
            .filter(|key| !key.trim().is_empty());

        let model = overrides
            .model
            .or(env.model)
            .or(settings.api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model".into(),
                message: "must not be empty".into(),
            });
        }

        let base_url = overrides
            .base_url
            .or(env.base_url)
            .or(settings.api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".into(),
                message: format!("'{base_url}' is not an http(s) URL"),
            });
        }

        if let Some(t) = settings.api.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::InvalidValue {
                    key: "temperature".into(),
                    message: format!("{t} is outside 0.0..=2.0"),
                });
            }
        }
        if settings.api.max_tokens == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_tokens".into(),
                message: "must be greater than zero".into(),
            });
        }

        let server = resolve_server(overrides.server, overrides.server_api_key, settings.server)?;

        Ok(ChatConfig {
            api_key,
            model,
            base_url,
            temperature: settings.api.temperature,
            max_tokens: settings.api.max_tokens,
            server,
            config_dir,
        })
    }

    /// The API credential, or a `MissingCredential` error naming where to set it.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential {
                hint: format!(
                    "set OPENAI_API_KEY or add api_key under [api] in {}",
                    self.config_dir.join("config.toml").display()
                ),
            })
    }
}

/// A positional argument replaces the file's connection but keeps its options.
fn resolve_server(
    arg: Option<String>,
    server_api_key: Option<String>,
    from_file: Option<ServerSettings>,
) -> Result<Option<ServerSettings>, ConfigError> {
    let request_timeout_ms = from_file.as_ref().and_then(|s| s.request_timeout_ms);
    if request_timeout_ms == Some(0) {
        return Err(ConfigError::InvalidValue {
            key: "server.request_timeout_ms".into(),
            message: "must be greater than zero".into(),
        });
    }

    let connection = match arg {
        Some(arg) => Some(ConnectionConfig::from_arg(&arg)),
        None => from_file.map(|s| s.connection),
    };

    Ok(connection.map(|connection| ServerSettings {
        connection: connection.with_api_key(server_api_key),
        request_timeout_ms,
    }))
}

/// Get the mcpchat config directory path (~/.mcpchat/).
pub fn config_dir(env: &EnvVars) -> PathBuf {
    if let Some(dir) = &env.config_dir {
        return dir.clone();
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcpchat")
}

/// Load and parse a TOML settings file, returning defaults on any error.
pub fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(overrides: CliOverrides, env: EnvVars, settings: SettingsFile) -> ChatConfig {
        ChatConfig::resolve(overrides, env, settings, PathBuf::from("/tmp/mcpchat-test")).unwrap()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = resolve(
            CliOverrides::default(),
            EnvVars::default(),
            SettingsFile::default(),
        );
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.temperature.is_none());
        assert!(config.server.is_none());
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let settings: SettingsFile = toml::from_str(
            r#"
[api]
api_key = "file-key"
model = "file-model"
base_url = "http://file.example.com/v1"
"#,
        )
        .unwrap();
        let env = EnvVars {
            api_key: Some("env-key".into()),
            model: Some("env-model".into()),
            ..EnvVars::default()
        };
        let overrides = CliOverrides {
            model: Some("cli-model".into()),
            ..CliOverrides::default()
        };

        let config = resolve(overrides, env, settings);
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.model, "cli-model");
        assert_eq!(config.base_url, "http://file.example.com/v1");
    }

    #[test]
    fn missing_credential_names_the_env_var() {
        let config = resolve(
            CliOverrides::default(),
            EnvVars::default(),
            SettingsFile::default(),
        );
        match config.require_api_key() {
            Err(ConfigError::MissingCredential { hint }) => {
                assert!(hint.contains("OPENAI_API_KEY"));
                assert!(hint.contains("config.toml"));
            }
            other => panic!("Expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let overrides = CliOverrides {
            api_key: Some("  ".into()),
            ..CliOverrides::default()
        };
        let config = resolve(overrides, EnvVars::default(), SettingsFile::default());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn server_section_parses() {
        let settings: SettingsFile = toml::from_str(
            r#"
[server]
kind = "remote_stream"
endpoint = "https://tools.example.com/sse"
api_key = "server-key"
request_timeout_ms = 30000
"#,
        )
        .unwrap();
        let server = settings.server.unwrap();
        assert_eq!(
            server.connection,
            ConnectionConfig::RemoteStream {
                endpoint: "https://tools.example.com/sse".into(),
                api_key: Some("server-key".into()),
            }
        );
        assert_eq!(server.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn local_server_section_parses() {
        let settings: SettingsFile = toml::from_str(
            r#"
[server]
kind = "local_process"
script_path = "servers/weather.py"
"#,
        )
        .unwrap();
        let server = settings.server.unwrap();
        assert!(matches!(
            server.connection,
            ConnectionConfig::LocalProcess { .. }
        ));
        assert!(server.request_timeout().is_none());
    }

    #[test]
    fn positional_server_replaces_file_connection() {
        let settings: SettingsFile = toml::from_str(
            r#"
[server]
kind = "local_process"
script_path = "servers/weather.py"
request_timeout_ms = 5000
"#,
        )
        .unwrap();
        let overrides = CliOverrides {
            server: Some("http://localhost:8080/sse".into()),
            server_api_key: Some("k".into()),
            ..CliOverrides::default()
        };
        let config = resolve(overrides, EnvVars::default(), settings);
        let server = config.server.unwrap();
        assert_eq!(
            server.connection,
            ConnectionConfig::RemoteStream {
                endpoint: "http://localhost:8080/sse".into(),
                api_key: Some("k".into()),
            }
        );
        assert_eq!(server.request_timeout_ms, Some(5000));
    }

    #[test]
    fn sampling_options_pass_through() {
        let settings: SettingsFile = toml::from_str(
            r#"
[api]
temperature = 0.2
max_tokens = 1024
"#,
        )
        .unwrap();
        let config = resolve(CliOverrides::default(), EnvVars::default(), settings);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(1024));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let settings: SettingsFile = toml::from_str("[api]\ntemperature = 3.5\n").unwrap();
        let err = ChatConfig::resolve(
            CliOverrides::default(),
            EnvVars::default(),
            settings,
            PathBuf::from("."),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "temperature"));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let overrides = CliOverrides {
            base_url: Some("ftp://example.com".into()),
            ..CliOverrides::default()
        };
        let err = ChatConfig::resolve(
            overrides,
            EnvVars::default(),
            SettingsFile::default(),
            PathBuf::from("."),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "base_url"));
    }

    #[test]
    fn env_config_dir_wins() {
        let env = EnvVars {
            config_dir: Some(PathBuf::from("/custom/dir")),
            ..EnvVars::default()
        };
        assert_eq!(config_dir(&env), PathBuf::from("/custom/dir"));
    }

    #[test]
    fn settings_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nmodel = \"gpt-4o-mini\"\n").unwrap();

        let settings = load_settings_file(&path);
        assert_eq!(settings.api.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn unparseable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nmodel = ").unwrap();

        let settings = load_settings_file(&path);
        assert!(settings.api.model.is_none());
        assert!(settings.server.is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_file(&dir.path().join("absent.toml"));
        assert!(settings.api.api_key.is_none());
    }
}
