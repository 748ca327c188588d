//! Logging setup.
//!
//! A [`LoggingContext`] is created once by the host entry point and owns the
//! "initialized" state for the run. The first successful
//! [`setup`](LoggingContext::setup) creates the run directory, activates the
//! console and file sinks, and returns the directory. Later calls only warn.
//!
//! Setup never fails the caller: environmental errors are printed to stderr
//! and reported as `None`.
//!
//! Suppression (`no_log`) is sticky. In global mode it flips a process-wide
//! switch that every sink built here checks, so it also silences a
//! subscriber that is already active. It cannot reach subscribers installed
//! by other code.

use crate::config::{ConsoleTarget, LoggingConfig, SetupOptions, LOG_FILE_NAME};
use crate::format::{ConsoleFormat, PlainFormat};
use crate::{boundary, Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_subscriber::filter::{filter_fn, FilterExt};
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::prelude::*;

/// Run directory timestamp, minute resolution (e.g. `2026-1017-1420`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m%d-%H%M";

/// Set by global-mode suppression; never cleared.
static SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Whether output has been suppressed process-wide.
pub fn output_suppressed() -> bool {
    SUPPRESSED.load(Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InstallMode {
    /// Process-wide default subscriber
    Global,
    /// Default subscriber for the current thread while the context lives
    Scoped,
}

/// Owner of the logging state for one run.
pub struct LoggingContext {
    mode: InstallMode,
    initialized: bool,
    suppressed: bool,
    log_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    guard: Option<DefaultGuard>,
}

impl Default for LoggingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingContext {
    /// Context that installs the process-wide subscriber.
    pub fn new() -> Self {
        Self::with_mode(InstallMode::Global)
    }

    /// Context that installs a thread-local subscriber, restored when the
    /// context is dropped. No panic hook is installed in this mode.
    pub fn scoped() -> Self {
        Self::with_mode(InstallMode::Scoped)
    }

    fn with_mode(mode: InstallMode) -> Self {
        Self {
            mode,
            initialized: false,
            suppressed: false,
            log_dir: None,
            log_file: None,
            guard: None,
        }
    }

    /// Whether a setup call has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a setup call asked for suppression.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Run directory of the active session.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Log file of the active session.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Configure logging for this run.
    ///
    /// Returns the run directory `log_dir/dataset/model/<timestamp>` on
    /// success. Returns `None` when already initialized (with a warning),
    /// when output is suppressed, or when setup failed (reported on stderr
    /// unless suppressed).
    ///
    /// A setup after suppression still creates the run directory and
    /// returns it, but output stays disabled.
    pub fn setup(&mut self, opts: &SetupOptions) -> Option<PathBuf> {
        if self.initialized {
            tracing::warn!("Logger has already been initialized.");
            return None;
        }

        if opts.no_log {
            self.suppress();
            return None;
        }

        match self.try_setup(opts) {
            Ok(dir) => Some(dir),
            Err(e) => {
                if !self.suppressed {
                    report_setup_failure(&e);
                }
                None
            }
        }
    }

    fn suppress(&mut self) {
        self.suppressed = true;
        match self.mode {
            InstallMode::Global => {
                SUPPRESSED.store(true, Ordering::Relaxed);
            }
            InstallMode::Scoped => {
                drop(self.guard.take());
                let subscriber = tracing_subscriber::registry().with(LevelFilter::OFF);
                self.guard = Some(tracing::subscriber::set_default(subscriber));
            }
        }
    }

    fn try_setup(&mut self, opts: &SetupOptions) -> Result<PathBuf> {
        // Checked before any filesystem change; `try_init` still settles races.
        if self.mode == InstallMode::Global && tracing::dispatcher::has_been_set() {
            return Err(Error::AlreadyActive);
        }

        let mut config = LoggingConfig::template();

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let subdir = run_dir(&opts.log_dir, &opts.dataset, &opts.model, &timestamp)?;
        fs::create_dir_all(&subdir).map_err(|source| Error::CreateDir {
            path: subdir.clone(),
            source,
        })?;

        config.file.path = subdir.join(LOG_FILE_NAME);
        config.console.level = opts.console_level;
        config.file.level = opts.file_level;

        match self.mode {
            InstallMode::Global => {
                build_subscriber(&config)?.try_init()?;
                if opts.install_panic_hook {
                    boundary::install_panic_hook();
                }
            }
            // A suppressed scoped context keeps its silent subscriber.
            InstallMode::Scoped if self.suppressed => {
                build_subscriber(&config)?;
            }
            InstallMode::Scoped => {
                let subscriber = build_subscriber(&config)?;
                drop(self.guard.take());
                self.guard = Some(tracing::subscriber::set_default(subscriber));
            }
        }

        self.initialized = true;
        tracing::info!(
            "Logger initialized. Log file at: {}",
            config.file.path.display()
        );

        self.log_dir = Some(subdir.clone());
        self.log_file = Some(config.file.path);
        Ok(subdir)
    }
}

/// `log_dir/dataset/model/timestamp`, with `dataset` and `model` checked to
/// be single path components.
pub fn run_dir(log_dir: &Path, dataset: &str, model: &str, timestamp: &str) -> Result<PathBuf> {
    Ok(log_dir
        .join(path_component("dataset", dataset)?)
        .join(path_component("model", model)?)
        .join(timestamp))
}

fn path_component<'a>(kind: &'static str, value: &'a str) -> Result<&'a str> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !value.contains(['/', '\\']) => Ok(value),
        _ => Err(Error::InvalidComponent {
            kind,
            value: value.to_string(),
        }),
    }
}

/// Build the console + file subscriber described by `config`.
///
/// Opens (and creates) the log file; the subscriber is not installed. Both
/// sinks go quiet once output is suppressed process-wide.
pub fn build_subscriber(
    config: &LoggingConfig,
) -> Result<impl Subscriber + Send + Sync + 'static> {
    let mut options = OpenOptions::new();
    if config.file.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let file = options
        .create(true)
        .open(&config.file.path)
        .map_err(|source| Error::OpenLogFile {
            path: config.file.path.clone(),
            source,
        })?;

    let (console_writer, console_ansi) = match config.console.target {
        ConsoleTarget::Stdout => (BoxMakeWriter::new(io::stdout), io::stdout().is_terminal()),
        ConsoleTarget::Stderr => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let console = fmt::layer()
        .with_ansi(console_ansi)
        .with_writer(console_writer)
        .event_format(ConsoleFormat {
            show_time: config.console.show_time,
            show_level: config.console.show_level,
            show_target: config.console.show_target,
            markup: config.console.markup,
        })
        .with_filter(config.console_filter().and(filter_fn(|_| !output_suppressed())));

    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .event_format(PlainFormat::new(config.file.strip_markup))
        .with_filter(config.file_filter().and(filter_fn(|_| !output_suppressed())));

    Ok(tracing_subscriber::registry().with(console).with(file))
}

/// Print a setup error and its causes straight to stderr; the logger is not
/// usable at this point.
fn report_setup_failure(err: &Error) {
    eprintln!("Failed to initialize logger: {}", err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
    let backtrace = std::backtrace::Backtrace::capture();
    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
        eprintln!("{}", backtrace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn quiet(dataset: &str, model: &str, log_dir: &Path) -> SetupOptions {
        SetupOptions::new(dataset, model)
            .log_dir(log_dir)
            .console_level(LevelFilter::OFF)
    }

    fn read_log(ctx: &LoggingContext) -> String {
        fs::read_to_string(ctx.log_file().unwrap()).unwrap()
    }

    #[test]
    fn test_timestamp_format() {
        let at = chrono::NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(14, 20, 59)
            .unwrap();
        assert_eq!(at.format(TIMESTAMP_FORMAT).to_string(), "2026-1017-1420");
    }

    #[test]
    fn test_run_dir_layout() {
        let dir = run_dir(Path::new("/logs"), "d", "m", "2026-1017-1420").unwrap();
        assert_eq!(dir, PathBuf::from("/logs/d/m/2026-1017-1420"));
    }

    #[test]
    fn test_run_dir_rejects_bad_components() {
        for bad in ["", ".", "..", "a/b", "/abs", "a\\b"] {
            assert!(
                matches!(
                    run_dir(Path::new("log"), bad, "m", "t"),
                    Err(Error::InvalidComponent { kind: "dataset", .. })
                ),
                "dataset {:?} should be rejected",
                bad
            );
        }
        assert!(matches!(
            run_dir(Path::new("log"), "d", "..", "t"),
            Err(Error::InvalidComponent { kind: "model", .. })
        ));
    }

    #[test]
    fn test_setup_creates_run_dir_and_log_file() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();

        let dir = ctx.setup(&quiet("d", "m", root.path())).unwrap();

        assert!(ctx.is_initialized());
        assert!(dir.is_dir());
        assert_eq!(dir.parent().unwrap(), root.path().join("d").join("m"));
        assert_eq!(ctx.log_dir(), Some(dir.as_path()));

        let log_file = dir.join("result.log");
        assert!(log_file.is_file());
        assert_eq!(ctx.log_file(), Some(log_file.as_path()));
        assert!(read_log(&ctx).contains(&format!(
            "Logger initialized. Log file at: {}",
            log_file.display()
        )));
    }

    #[test]
    fn test_file_sink_strips_markup() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();
        ctx.setup(&quiet("d", "m", root.path())).unwrap();

        tracing::info!("[bold]x[/bold]");

        assert_eq!(read_log(&ctx).lines().last(), Some("x"));
    }

    #[test]
    fn test_second_setup_is_noop() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();
        let first = ctx.setup(&quiet("d", "m", root.path())).unwrap();

        let other_root = root.path().join("other");
        assert_eq!(ctx.setup(&quiet("d2", "m2", &other_root)), None);

        assert!(!other_root.exists());
        assert_eq!(ctx.log_dir(), Some(first.as_path()));
        assert!(read_log(&ctx).ends_with("Logger has already been initialized.\n"));
    }

    #[test]
    fn test_no_log_suppresses_and_returns_none() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();

        assert_eq!(ctx.setup(&quiet("d", "m", root.path()).no_log(true)), None);
        assert!(!ctx.is_initialized());
        assert!(!root.path().join("d").exists());
        assert!(!tracing::enabled!(tracing::Level::ERROR));
    }

    #[test]
    fn test_setup_after_suppression_stays_silent() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();
        ctx.setup(&quiet("d", "m", root.path()).no_log(true));

        let dir = ctx.setup(&quiet("d", "m", root.path())).unwrap();
        assert!(ctx.is_initialized());
        assert!(ctx.is_suppressed());
        assert!(dir.join("result.log").is_file());

        tracing::error!("hidden");
        assert!(!tracing::enabled!(tracing::Level::ERROR));
        assert_eq!(read_log(&ctx), "");
    }

    #[test]
    fn test_invalid_name_fails_soft() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();

        assert_eq!(ctx.setup(&quiet("../escape", "m", root.path())), None);
        assert!(!ctx.is_initialized());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_log_dir_fails_soft() {
        let root = tempdir().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut ctx = LoggingContext::scoped();

        assert_eq!(ctx.setup(&quiet("d", "m", &blocker)), None);
        assert!(!ctx.is_initialized());
        assert!(ctx.log_file().is_none());
    }

    #[test]
    fn test_file_level_threshold() {
        let root = tempdir().unwrap();
        let mut ctx = LoggingContext::scoped();
        ctx.setup(&quiet("d", "m", root.path()).file_level(LevelFilter::WARN))
            .unwrap();

        tracing::info!("routine");
        tracing::warn!("unusual");
        tracing::debug!("noise");

        let log = read_log(&ctx);
        assert!(!log.contains("Logger initialized"));
        assert!(!log.contains("routine"));
        assert!(log.contains("unusual"));
        assert!(!log.contains("noise"));
    }

    #[test]
    fn test_file_appends_across_sessions() {
        let root = tempdir().unwrap();
        let mut config = LoggingConfig::template();
        config.file.path = root.path().join("result.log");
        config.console.level = LevelFilter::OFF;

        for message in ["first", "second"] {
            let subscriber = build_subscriber(&config).unwrap();
            tracing::subscriber::with_default(subscriber, || tracing::info!("{}", message));
        }

        let contents = fs::read_to_string(&config.file.path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_dropping_scoped_context_restores_previous_subscriber() {
        let root = tempdir().unwrap();
        {
            let mut ctx = LoggingContext::scoped();
            ctx.setup(&quiet("d", "m", root.path()).no_log(true));
            assert!(!tracing::enabled!(tracing::Level::ERROR));
        }
        let mut ctx = LoggingContext::scoped();
        assert!(ctx.setup(&quiet("d", "m", root.path())).is_some());
        tracing::info!("after");
        assert!(read_log(&ctx).contains("after"));
    }
}
