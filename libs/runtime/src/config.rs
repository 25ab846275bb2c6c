use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main application configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Core server configuration.
    pub server: ServerConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Base directory for relative log file paths. Empty means the current directory.
    #[serde(default)]
    pub home_dir: String,
    pub host: String,
    pub port: u16,
    /// Development mode: verbose console logging.
    #[serde(default)]
    pub debug: bool,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/users.log"; empty disables file output
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB before rotation
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            debug: false,
        }
    }
}

/// Create a default logging configuration: console only, nothing written to disk.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: String::new(),
            file_level: "debug".to_string(),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Optional sections stay None unless explicitly provided by YAML/ENV.
        let base = AppConfig {
            server: ServerConfig::default(),
            logging: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            // Example: APP__SERVER__PORT=8080 maps to server.port
            .merge(Env::prefixed("APP__").split("__"));

        let config: AppConfig = figment
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from file or fall back to default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if args.debug {
            self.server.debug = true;
        }

        let debug = self.server.debug;
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 if debug && !is_at_least_debug(&default_section.console_level) => {
                    "debug".to_string()
                }
                0 => default_section.console_level.clone(),
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    /// Deserialize the named module's section into `T`.
    ///
    /// A missing section yields `T::default()`; a section that does not match `T` is an error.
    pub fn module_config<T: DeserializeOwned + Default>(&self, module_name: &str) -> Result<T> {
        match self.modules.get(module_name) {
            Some(raw) => serde_json::from_value::<T>(raw.clone())
                .with_context(|| format!("invalid {module_name} config")),
            None => Ok(T::default()),
        }
    }

    /// Socket address string the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Absolute base directory used to resolve relative paths (log files).
    pub fn home_dir(&self) -> Result<PathBuf> {
        resolve_home_dir(&self.server.home_dir)
    }
}

fn is_at_least_debug(level: &str) -> bool {
    matches!(level.to_ascii_lowercase().as_str(), "debug" | "trace")
}

/// Expand a leading `~` and make the path absolute against the current directory.
fn resolve_home_dir(raw: &str) -> Result<PathBuf> {
    let raw = raw.trim();
    let cwd = std::env::current_dir().context("current directory is not accessible")?;
    if raw.is_empty() {
        return Ok(cwd);
    }

    let expanded = match raw.strip_prefix('~') {
        Some(rest) => {
            let home = dirs::home_dir().context("cannot expand '~': no home directory")?;
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        None => PathBuf::from(raw),
    };

    Ok(if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    })
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct DemoModuleConfig {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        name: String,
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.home_dir, "");
        assert!(!config.server.debug);

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "");

        assert!(config.modules.is_empty());
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_load_layered_from_yaml() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = r#"
server:
  host: "0.0.0.0"
  port: 9090
  debug: true

logging:
  default:
    console_level: warn
    file: "logs/users.log"

modules:
  api_ingress:
    enable_docs: false
"#;
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert!(config.server.debug);

        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "warn");
        assert_eq!(logging["default"].file, "logs/users.log");
        assert!(config.modules.contains_key("api_ingress"));
    }

    #[test]
    fn test_load_layered_minimal_yaml_keeps_optional_sections_empty() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("minimal.yaml");
        fs::write(
            &cfg_path,
            r#"
server:
  host: "localhost"
  port: 8080
"#,
        )
        .unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8080);
        assert!(config.logging.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_missing_file_is_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_unknown_server_field_is_rejected() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("bad.yaml");
        fs::write(
            &cfg_path,
            r#"
server:
  host: "127.0.0.1"
  port: 5000
  workers: 4
"#,
        )
        .unwrap();

        assert!(AppConfig::load_layered(&cfg_path).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            port: Some(3000),
            verbose: 2,
            ..Default::default()
        };

        config.apply_cli_overrides(&args);

        assert_eq!(config.server.port, 3000);
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "trace");
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose_level, expected_log_level) in
            [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")]
        {
            let mut config = AppConfig::default();
            let args = CliArgs {
                verbose: verbose_level,
                ..Default::default()
            };

            config.apply_cli_overrides(&args);

            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected_log_level);
        }
    }

    #[test]
    fn test_debug_flag_raises_console_level() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs {
            debug: true,
            ..Default::default()
        });

        assert!(config.server.debug);
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "debug");

        // An explicit trace level is not lowered by debug mode.
        let mut config = AppConfig::default();
        config
            .logging
            .as_mut()
            .unwrap()
            .get_mut("default")
            .unwrap()
            .console_level = "trace".into();
        config.server.debug = true;
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(
            config.logging.as_ref().unwrap()["default"].console_level,
            "trace"
        );
    }

    #[test]
    fn test_module_config_extraction() {
        let mut config = AppConfig::default();

        let missing: DemoModuleConfig = config.module_config("demo").unwrap();
        assert_eq!(missing, DemoModuleConfig::default());

        config.modules.insert(
            "demo".into(),
            serde_json::json!({ "enabled": true, "name": "x" }),
        );
        let present: DemoModuleConfig = config.module_config("demo").unwrap();
        assert!(present.enabled);
        assert_eq!(present.name, "x");

        config
            .modules
            .insert("demo".into(), serde_json::json!({ "enabled": "nope" }));
        let err = config.module_config::<DemoModuleConfig>("demo").unwrap_err();
        assert!(err.to_string().contains("invalid demo config"));
    }

    #[test]
    fn test_home_dir_resolution() {
        let config = AppConfig::default();
        let resolved = config.home_dir().unwrap();
        assert_eq!(resolved, std::env::current_dir().unwrap());

        let tmp = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.server.home_dir = tmp.path().to_string_lossy().to_string();
        assert_eq!(config.home_dir().unwrap(), tmp.path());

        config.server.home_dir = "relative/dir".into();
        let resolved = config.home_dir().unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("relative/dir"));
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("server:"));
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.server.port, config.server.port);
    }

    #[test]
    fn test_invalid_yaml_missing_required_field() {
        let invalid_yaml = r#"
server:
  # Missing required host field
  port: 5000
"#;

        let result: Result<AppConfig, _> = serde_yaml::from_str(invalid_yaml);
        assert!(result.is_err());
    }
}
