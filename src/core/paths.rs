use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "jenkins-artifact";

/// Base config directory (~/.config/jenkins-artifact/ on all Unix-like platforms)
pub fn config_root() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR))
    }
}

/// Deploy targets directory
pub fn targets() -> Result<PathBuf> {
    Ok(config_root()?.join("targets"))
}

/// Deploy target file path
pub fn target(id: &str) -> Result<PathBuf> {
    Ok(targets()?.join(format!("{}.json", id)))
}
