// log_utils.rs
use std::error::Error;
use std::fs::File;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs a console logger as the global subscriber. `filter` is an env-filter
/// directive string such as "info" or "fusetools=debug". Errors if a global
/// subscriber is already installed.
pub fn init_console(filter: &str) -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .try_init()
        .map_err(|e| -> Box<dyn Error> { e })?;
    Ok(())
}

/// Installs a JSON file logger as the global subscriber, appending to `path`.
/// Errors if a global subscriber is already installed.
pub fn init_file(filter: &str, path: &str) -> Result<(), Box<dyn Error>> {
    let file = File::options().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| -> Box<dyn Error> { e })?;
    Ok(())
}
