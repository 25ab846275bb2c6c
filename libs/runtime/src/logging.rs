use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == subsystem or target starts with "subsystem::"
fn matches_subsystem(target: &str, subsystem: &str) -> bool {
    target == subsystem
        || (target.starts_with(subsystem) && target[subsystem.len()..].starts_with("::"))
}

/// Passes everything at or below `max_level` that no explicit subsystem section claims.
fn catch_all_filter(
    subsystems: Vec<String>,
    max_level: Level,
) -> FilterFn<impl Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static> {
    FilterFn::new(move |meta: &tracing::Metadata<'_>| {
        let target = meta.target();
        !subsystems.iter().any(|s| matches_subsystem(target, s)) && meta.level() <= &max_level
    })
}

// -------- rotating writer for files --------
type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

#[derive(Clone)]
struct RotWriter(SharedRotate);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file writer poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file writer poisoned"))?
            .flush()
    }
}

// A writer that may have no destination (drops writes)
struct RoutedWriter(Option<RotWriter>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes log records to files by target: a subsystem's own file when it has one,
/// otherwise the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_subsystem: HashMap<String, RotWriter>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriter> {
        self.by_subsystem
            .iter()
            .find(|(name, _)| matches_subsystem(target, name))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve_for(meta.target()))
    }
}

// -------- config extraction --------

struct SplitConfig<'a> {
    default_section: Option<&'a Section>,
    subsystems: Vec<(String, &'a Section)>,
}

impl SplitConfig<'_> {
    fn subsystem_names(&self) -> Vec<String> {
        self.subsystems.iter().map(|(n, _)| n.clone()).collect()
    }
}

fn split_config(cfg: &LoggingConfig) -> SplitConfig<'_> {
    let mut subsystems = cfg
        .iter()
        .filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
        .map(|(k, v)| (k.clone(), v))
        .collect::<Vec<_>>();
    subsystems.sort_by(|a, b| a.0.cmp(&b.0));

    SplitConfig {
        default_section: cfg.get(DEFAULT_SECTION),
        subsystems,
    }
}

// -------- path resolution helpers --------

/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Create a size-rotating writer, ensuring the parent directory exists.
fn create_rotating_writer_at_path(log_path: &Path, max_bytes: usize) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::Age(chrono::Duration::days(1))),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer_for(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes as usize) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.display(),
                e
            );
            None
        }
    }
}

fn build_file_router(config: &SplitConfig<'_>, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter {
        default: config
            .default_section
            .and_then(|s| file_writer_for(DEFAULT_SECTION, s, base_dir)),
        by_subsystem: HashMap::new(),
    };

    for (name, section) in &config.subsystems {
        if let Some(writer) = file_writer_for(name, section, base_dir) {
            router.by_subsystem.insert(name.clone(), writer);
        }
    }

    router
}

// -------- target filters --------

fn console_targets(config: &SplitConfig<'_>) -> Targets {
    config
        .subsystems
        .iter()
        .filter_map(|(name, s)| {
            parse_tracing_level(&s.console_level).map(|l| (name.clone(), LevelFilter::from_level(l)))
        })
        .fold(Targets::new().with_default(LevelFilter::OFF), |t, (name, level)| {
            t.with_target(name, level)
        })
}

fn file_targets(config: &SplitConfig<'_>) -> Targets {
    config
        .subsystems
        .iter()
        .filter(|(_, s)| !s.file.trim().is_empty())
        .filter_map(|(name, s)| {
            parse_tracing_level(&s.file_level).map(|l| (name.clone(), LevelFilter::from_level(l)))
        })
        .fold(Targets::new().with_default(LevelFilter::OFF), |t, (name, level)| {
            t.with_target(name, level)
        })
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: subsystem name → section; "default" catches everything unclaimed
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let config = split_config(cfg);
    let router = build_file_router(&config, base_dir);
    let layers = build_layers(&config, router);

    let _ = tracing_subscriber::registry().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

fn console_layer() -> impl Layer<Registry> + Send + Sync + 'static {
    fmt::layer()
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
}

fn build_layers(config: &SplitConfig<'_>, router: FileRouter) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer()
        .with_filter(console_targets(config))
        .boxed()];

    let json_file_layer = |writer: FileRouter| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
    };

    if !router.by_subsystem.is_empty() {
        layers.push(
            json_file_layer(router.clone())
                .with_filter(file_targets(config))
                .boxed(),
        );
    }

    let Some(default_section) = config.default_section else {
        return layers;
    };

    if let Some(level) = parse_tracing_level(&default_section.console_level) {
        layers.push(
            console_layer()
                .with_filter(catch_all_filter(config.subsystem_names(), level))
                .boxed(),
        );
    }

    if router.default.is_some() {
        if let Some(level) = parse_tracing_level(&default_section.file_level) {
            layers.push(
                json_file_layer(router)
                    .with_filter(catch_all_filter(config.subsystem_names(), level))
                    .boxed(),
            );
        }
    }

    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_logging_config, AppConfig};
    use std::fs;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Info"), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO));
    }

    #[test]
    fn test_subsystem_prefix_matching() {
        assert!(matches_subsystem("users_info", "users_info"));
        assert!(matches_subsystem("users_info::domain::service", "users_info"));
        assert!(!matches_subsystem("users_info_extra", "users_info"));
        assert!(!matches_subsystem("api_ingress", "users_info"));
    }

    #[test]
    fn test_split_config_separates_default() {
        let mut cfg = default_logging_config();
        cfg.insert("users_info".into(), section("info", "logs/users.log", "debug"));
        cfg.insert("api_ingress".into(), section("warn", "", "debug"));

        let data = split_config(&cfg);
        assert!(data.default_section.is_some());
        assert_eq!(
            data.subsystem_names(),
            vec!["api_ingress".to_string(), "users_info".to_string()]
        );
    }

    #[test]
    fn test_file_router_resolution() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.get_mut("default").unwrap().file = "logs/all.log".into();
        cfg.insert("users_info".into(), section("info", "logs/users.log", "debug"));
        cfg.insert("api_ingress".into(), section("info", "", "debug"));

        let data = split_config(&cfg);
        let router = build_file_router(&data, tmp.path());

        assert!(router.default.is_some());
        assert_eq!(router.by_subsystem.len(), 1);
        assert!(router.resolve_for("users_info::api").is_some());
        // api_ingress has no file of its own and falls back to the default file
        assert!(router.resolve_for("api_ingress").is_some());
        assert!(tmp.path().join("logs").exists());
    }

    #[test]
    fn test_empty_file_disables_router() {
        let tmp = tempdir().unwrap();
        let cfg = default_logging_config();
        let data = split_config(&cfg);
        let router = build_file_router(&data, tmp.path());
        assert!(router.default.is_none());
        assert!(router.by_subsystem.is_empty());
        assert!(router.resolve_for("anything").is_none());
    }

    #[test]
    fn test_build_layers_counts() {
        let tmp = tempdir().unwrap();

        let cfg = default_logging_config();
        let data = split_config(&cfg);
        let router = build_file_router(&data, tmp.path());
        // explicit console + default console
        assert_eq!(build_layers(&data, router).len(), 2);

        let mut cfg = default_logging_config();
        cfg.get_mut("default").unwrap().file = "logs/all.log".into();
        cfg.insert("users_info".into(), section("debug", "logs/users.log", "debug"));
        let data = split_config(&cfg);
        let router = build_file_router(&data, tmp.path());
        assert_eq!(build_layers(&data, router).len(), 4);
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let base_dir = tmp.path();

        let resolved = resolve_log_path("logs/test.log", base_dir);
        assert!(resolved.starts_with(base_dir));
        assert!(resolved.ends_with("logs/test.log"));

        let absolute = base_dir.join("abs.log");
        let kept = resolve_log_path(absolute.to_str().unwrap(), Path::new("/elsewhere"));
        assert_eq!(kept, absolute);
    }

    #[test]
    fn test_create_rotating_writer_at_path_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let mut writer = create_rotating_writer_at_path(&p, 128 * 1024).unwrap();
        assert!(p.parent().unwrap().exists(), "parent dir must be created");

        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "hello\n");
    }

    #[test]
    fn test_config_logging_integration_with_home_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.yaml");

        let yaml_content = format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 8088

logging:
  default:
    console_level: info
    file: ""
    file_level: debug
  api_ingress:
    console_level: debug
    file: "logs/api_test.log"
    file_level: warn
    max_size_mb: 5
"#,
            temp_dir.path().display()
        );

        fs::write(&config_path, yaml_content).unwrap();

        let config = AppConfig::load_layered(&config_path).unwrap();
        let home = config.home_dir().unwrap();

        let abs = resolve_log_path("logs/api_test.log", &home);
        assert!(abs.starts_with(temp_dir.path()));
        assert!(abs.ends_with("logs/api_test.log"));
    }
}
