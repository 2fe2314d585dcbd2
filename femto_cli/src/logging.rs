//! Tracing setup: console layer plus an optional JSON-lines file layer.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::FILE_GUARD;

/// Pick the filter: RUST_LOG, then `--log-level`, then `[logging].level`, then info.
fn env_filter(cli_level: Option<&str>, cfg_level: Option<&str>) -> EnvFilter {
    if let Ok(f) = EnvFilter::try_from_default_env() {
        return f;
    }
    let level = cli_level.or(cfg_level).unwrap_or("info");
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_appender(path: &Path, rotation: Option<&str>) -> tracing_appender::rolling::RollingFileAppender {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file = path
        .file_name()
        .map_or_else(|| "femto.log".into(), |f| f.to_string_lossy().into_owned());
    match rotation {
        Some("daily") => tracing_appender::rolling::daily(dir, file),
        Some("hourly") => tracing_appender::rolling::hourly(dir, file),
        _ => tracing_appender::rolling::never(dir, file),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(json: bool, cli_level: Option<&str>, logging: Option<&femto_config::Logging>) {
    let filter = env_filter(cli_level, logging.and_then(|l| l.level.as_deref()));

    let file_layer = logging.and_then(|l| l.file.as_deref()).map(|path| {
        let appender = file_appender(Path::new(path), logging.and_then(|l| l.rotation.as_deref()));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_writer(writer).with_ansi(false)
    });

    // Console output goes to stderr so stdout stays clean for reports.
    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}
