#[cfg(any(feature = "app", test))]
use std::any::Any;
#[cfg(any(feature = "app", test))]
use std::panic::Location;
use std::path::{Path, PathBuf};

pub const LOG_ENV: &str = "GROCERY_LOG";
pub const LOG_FILE_BASENAME: &str = "grocery-list";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;

/// Log files live next to the item table in a `logs/` subdirectory.
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// `GROCERY_LOG`, then `RUST_LOG`, then the built-in default. Blank values are skipped.
pub fn log_spec(lookup: impl Fn(&str) -> Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,grocery_list_lib=debug,grocery_list=debug"
    } else {
        "warn,grocery_list_lib=info,grocery_list=info"
    };
    [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(feature = "app")]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    let directory = log_directory(data_dir);
    std::fs::create_dir_all(&directory)?;

    let spec = log_spec(|key| std::env::var(key).ok());
    Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(&directory)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stdout(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::Warn
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        directory.display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(())
}

/// Text of a panic payload. `panic!` produces either a `&str` or a formatted `String`.
#[cfg(any(feature = "app", test))]
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(any(feature = "app", test))]
fn panic_report(thread: Option<&str>, message: &str, location: Option<&Location<'_>>) -> String {
    let thread = thread.unwrap_or("unnamed");
    match location {
        Some(location) => format!("thread {thread} panicked at {location}: {message}"),
        None => format!("thread {thread} panicked: {message}"),
    }
}

/// Sends panics to the log file before the previous hook prints them to stderr.
#[cfg(feature = "app")]
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let current = std::thread::current();
        let report = panic_report(current.name(), panic_message(info.payload()), info.location());
        log::error!("{report}\n{}", std::backtrace::Backtrace::capture());
        previous(info);
    }));
}
