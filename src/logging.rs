//! Subscriber setup: a terminal layer and an optional persisted log file,
//! each with its own level taken from the environment descriptor.
use crate::config::EnvConfig;
use crate::util::now_epoch_ms;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Map a descriptor level (`all`, `info`, `warn`, `error`, `prod`) onto a
/// filter directive. Unknown or empty levels log everything.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "info" => "info",
        "warn" => "warn",
        "error" | "prod" => "error",
        _ => "debug",
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub print_at: String,
    pub log_at: String,
    pub logs_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl LogSettings {
    pub fn from_env(env: &EnvConfig, verbose: bool) -> Self {
        Self {
            print_at: env.bat.print_at.clone(),
            log_at: env.bat.log_at.clone(),
            logs_dir: env.logs_dir(),
            verbose,
        }
    }

    fn filter(&self, level: &str) -> EnvFilter {
        if std::env::var_os("RUST_LOG").is_some() {
            return EnvFilter::from_default_env();
        }
        let directive = if self.verbose {
            "debug"
        } else {
            level_directive(level)
        };
        EnvFilter::new(directive)
    }
}

/// Install the global subscriber. Returns the log file path when one was
/// opened.
pub fn init(settings: &LogSettings) -> Result<Option<PathBuf>> {
    let terminal = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(settings.filter(&settings.print_at));

    let (file_layer, log_path) = match &settings.logs_dir {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
            let path = dir.join(format!("bops-{}.log", now_epoch_ms()?));
            let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(settings.filter(&settings.log_at));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(terminal)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!("install tracing subscriber: {err}"))?;
    Ok(log_path)
}
