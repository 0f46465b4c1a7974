use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;
use crate::variables::DeployVariables;

/// A deploy target: where releases land and the variables that drive the deploy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(skip_deserializing, default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<Server>,
    #[serde(default)]
    pub variables: DeployVariables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub host: String,
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl Server {
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty()
    }

    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.host.is_empty() {
            missing.push("host".to_string());
        }
        if self.user.is_empty() {
            missing.push("user".to_string());
        }
        missing
    }
}

impl Target {
    /// The configured server, or an error naming what is missing.
    pub fn require_server(&self) -> Result<&Server> {
        match &self.server {
            Some(server) if server.is_valid() => Ok(server),
            Some(server) => Err(Error::ssh_server_invalid(&self.id, server.missing_fields())),
            None => Err(Error::ssh_server_invalid(
                &self.id,
                vec!["server".to_string()],
            )),
        }
    }
}

/// Load a target by ID from the config directory.
pub fn load(id: &str) -> Result<Target> {
    let path = paths::target(id)?;
    load_from(id, &path).map_err(|err| {
        if err.code == crate::ErrorCode::TargetNotFound {
            err.with_hint(format!("Create {} to define this target", path.display()))
        } else {
            err
        }
    })
}

/// Load a target from an explicit file path. The ID defaults to the file stem.
pub fn load_path(path: &Path) -> Result<Target> {
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("target")
        .to_string();
    load_from(&id, path)
}

fn load_from(id: &str, path: &Path) -> Result<Target> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::target_not_found(id)),
        Err(e) => {
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("read {}", path.display())),
            ))
        }
    };

    let mut target: Target = serde_json::from_str(&raw)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
    target.id = id.to_string();
    Ok(target)
}

/// IDs of every target file in the config directory, sorted.
pub fn list_ids() -> Result<Vec<String>> {
    list_ids_in(&paths::targets()?)
}

fn list_ids_in(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("read {}", dir.display())),
            ))
        }
    };

    let mut ids: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path: PathBuf| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
        })
        .collect();
    ids.sort();
    Ok(ids)
}
