//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::options::RenderOptionDefaults;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pdfmaker";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_API_BASE_URL: &str = "https://v2.api2pdf.com";
const DEFAULT_API_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Command-line arguments for the pdfmaker binary.
#[derive(Debug, Parser, Default)]
#[command(name = "pdfmaker", version, about = "pdfmaker rendering gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PDFMAKER_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the rendering API key.
    #[arg(long = "api-key", env = "PDFMAKER_API_KEY", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Override the rendering API base URL.
    #[arg(long = "api-base-url", value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Override the templates directory.
    #[arg(long = "templates-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub templates_directory: Option<PathBuf>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub api: ApiSettings,
    pub templates: TemplateSettings,
    pub options: RenderOptionDefaults,
    pub integrations: IntegrationSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Secret key for the rendering API, resolved from any `$ENV_VAR`
    /// reference in the configured value.
    pub key: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct IntegrationSettings {
    pub formie: bool,
    pub commerce: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PDFMAKER").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

    Settings::from_raw(raw)
}

/// Resolve configuration from the process arguments, returning both for
/// downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    api: RawApiSettings,
    templates: RawTemplateSettings,
    options: RawOptionSettings,
    integrations: RawIntegrationSettings,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        if let Some(host) = cli.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = cli.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
        if let Some(key) = cli.api_key.as_ref() {
            self.api.key = Some(key.clone());
        }
        if let Some(url) = cli.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(directory) = cli.templates_directory.as_ref() {
            self.templates.directory = Some(directory.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            api,
            templates,
            options,
            integrations,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            api: build_api_settings(api)?,
            templates: build_template_settings(templates)?,
            options: build_option_defaults(options),
            integrations: IntegrationSettings {
                formie: integrations.formie.unwrap_or(false),
                commerce: integrations.commerce.unwrap_or(false),
            },
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let candidate = format!("{host}:{port}");
    let addr = candidate
        .parse()
        .map_err(|err| LoadError::invalid("server.addr", format!("invalid address `{candidate}`: {err}")))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let key = expand_env(api.key.unwrap_or_default().trim())?;
    if key.is_empty() {
        return Err(LoadError::invalid(
            "api.key",
            "rendering API key must be set",
        ));
    }

    let base_url = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();
    if base_url.is_empty() {
        return Err(LoadError::invalid("api.base_url", "must not be empty"));
    }

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_API_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        key,
        base_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_template_settings(templates: RawTemplateSettings) -> Result<TemplateSettings, LoadError> {
    let directory = templates
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "templates.directory",
            "path must not be empty",
        ));
    }

    Ok(TemplateSettings { directory })
}

fn build_option_defaults(options: RawOptionSettings) -> RenderOptionDefaults {
    let mut defaults = RenderOptionDefaults::default();
    if let Some(pdf) = options.pdf {
        overlay(&mut defaults.pdf, pdf);
    }
    if let Some(image) = options.image {
        overlay(&mut defaults.image, image);
    }
    defaults
}

fn overlay(table: &mut Map<String, Value>, overrides: Map<String, Value>) {
    for (key, value) in overrides {
        table.insert(key, value);
    }
}

/// Expand a `$ENV_VAR` reference in a configured secret; any other value is
/// returned as-is.
fn expand_env(value: &str) -> Result<String, LoadError> {
    let Some(name) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };

    std::env::var(name).map_err(|_| {
        LoadError::invalid(
            "api.key",
            format!("environment variable `{name}` is not set"),
        )
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    key: Option<String>,
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTemplateSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOptionSettings {
    pdf: Option<Map<String, Value>>,
    image: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIntegrationSettings {
    formie: Option<bool>,
    commerce: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw_with_key() -> RawSettings {
        let mut raw = RawSettings::default();
        raw.api.key = Some("a2p-test-key".to_string());
        raw
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = raw_with_key();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let cli = CliArgs {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_cli_overrides(&cli);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let raw = RawSettings::default();
        let error = Settings::from_raw(raw).expect_err("missing key must fail");
        assert!(matches!(error, LoadError::Invalid { key: "api.key", .. }));
    }

    #[test]
    fn api_key_expands_environment_references() {
        // SAFETY: test-local variable name, no concurrent reader depends on it.
        unsafe { std::env::set_var("PDFMAKER_TEST_KEY", "expanded-secret") };
        let mut raw = RawSettings::default();
        raw.api.key = Some("$PDFMAKER_TEST_KEY".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.api.key, "expanded-secret");
    }

    #[test]
    fn unset_environment_reference_is_rejected() {
        let mut raw = RawSettings::default();
        raw.api.key = Some("$PDFMAKER_DEFINITELY_UNSET".to_string());

        let error = Settings::from_raw(raw).expect_err("unset env var must fail");
        assert!(matches!(error, LoadError::Invalid { key: "api.key", .. }));
    }

    #[test]
    fn api_base_url_trailing_slash_is_trimmed() {
        let mut raw = raw_with_key();
        raw.api.base_url = Some("https://v2.api2pdf.com/".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.api.base_url, "https://v2.api2pdf.com");
    }

    #[test]
    fn configured_options_overlay_the_builtin_table() {
        let mut raw = raw_with_key();
        let pdf = match json!({"landscape": true, "scale": 1.5}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        raw.options.pdf = Some(pdf);

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.options.pdf["landscape"], json!(true));
        assert_eq!(settings.options.pdf["scale"], json!(1.5));
        // Untouched defaults survive the overlay.
        assert_eq!(settings.options.pdf["width"], json!("8.27in"));
        assert_eq!(settings.options.image["fullPage"], json!(true));
    }

    #[test]
    fn integrations_default_to_disabled() {
        let settings = Settings::from_raw(raw_with_key()).expect("valid settings");
        assert!(!settings.integrations.formie);
        assert!(!settings.integrations.commerce);
    }

    #[test]
    fn parse_cli_overrides() {
        let args = CliArgs::parse_from([
            "pdfmaker",
            "--server-host",
            "0.0.0.0",
            "--api-base-url",
            "http://127.0.0.1:9900",
            "--log-json",
            "true",
        ]);

        assert_eq!(args.server_host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.api_base_url.as_deref(), Some("http://127.0.0.1:9900"));
        assert_eq!(args.log_json, Some(true));
    }
}
