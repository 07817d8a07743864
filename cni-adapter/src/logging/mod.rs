use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Path of the per-container log file
pub fn log_file_path(log_dir: &Path, handle: &str) -> PathBuf {
    log_dir.join(format!("{}.log", handle))
}

/// Open (creating if needed) the per-container log file for appending
pub fn open_log_file(log_dir: &Path, handle: &str) -> Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("unable to create log dir {:?}", log_dir))?;

    let path = log_file_path(log_dir, handle);
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("unable to create log file {:?}", path))?;
    Ok((path, file))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Set up tracing to stderr and, with a log dir, to `<log_dir>/<handle>.log`
pub fn init(log_dir: Option<&Path>, handle: &str) -> Result<()> {
    match log_dir {
        Some(dir) => {
            let (path, file) = open_log_file(dir, handle)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(io::stderr.and(Mutex::new(file)))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set default subscriber")?;
            info!("started logging to {}", path.display());
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter())
                .with_writer(io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set default subscriber")?;
        }
    }
    Ok(())
}
