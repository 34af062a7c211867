use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// Quiet by default, chatty where the engine actually does work.
const DEFAULT_FILTER: &str =
    "warn,crosschess::search=debug,crosschess::game=debug,crosschess::moves=info";

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Route `tracing` output for the whole process into the file at
/// `path`, once. `RUST_LOG` overrides `filter`, which overrides the
/// engine default above. Later calls are no-ops, so tests and the CLI
/// can both call this without coordinating.
pub fn init_logging<P: AsRef<Path>>(path: P, filter: Option<&str>) {
    GUARD.get_or_init(|| {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| OsStr::new("crosschess.log"));
        let _ = std::fs::create_dir_all(dir);

        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

        let env_filter = match std::env::var("RUST_LOG") {
            Ok(spec) => EnvFilter::try_new(spec),
            Err(_) => EnvFilter::try_new(filter.unwrap_or(DEFAULT_FILTER)),
        }
        .unwrap_or_else(|_| EnvFilter::new("info"));

        // try_init keeps this harmless when a subscriber already exists.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(false)
            .compact()
            .try_init();

        guard
    });
}
