use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::monitor_config::PathsConfig;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("cannot create {role} directory {}: {source}", path.display())]
    CreateDir {
        role: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot load {role} model {}: {message}", path.display())]
    ModelLoad {
        role: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Creates the alert and log directories (and any missing parents).
pub fn prepare_output_dirs(paths: &PathsConfig) -> Result<(), StartupError> {
    create_dir("alerts", &paths.alerts_dir)?;
    create_dir("logs", &paths.logs_dir)?;
    Ok(())
}

fn create_dir(role: &'static str, path: &Path) -> Result<(), StartupError> {
    std::fs::create_dir_all(path).map_err(|source| StartupError::CreateDir {
        role,
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Using {role} directory {}", path.display());
    Ok(())
}
