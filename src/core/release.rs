//! Release naming and the remote extraction command.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::utils::shell;

const RELEASE_NAME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Clock used to turn the build timestamp into a release name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseZone {
    #[default]
    Local,
    Utc,
}

impl FromStr for ReleaseZone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ReleaseZone::Local),
            "utc" => Ok(ReleaseZone::Utc),
            _ => Err(Error::config_invalid_value(
                "release_timezone",
                Some(s.to_string()),
                "Expected 'local' or 'utc'",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub name: String,
    pub path: String,
}

impl Release {
    pub fn from_build_timestamp(
        timestamp_ms: i64,
        releases_path: &str,
        zone: ReleaseZone,
    ) -> Result<Self> {
        let name = match zone {
            ReleaseZone::Local => release_name(timestamp_ms, &Local)?,
            ReleaseZone::Utc => release_name(timestamp_ms, &Utc)?,
        };
        let path = join_release_path(releases_path, &name);
        Ok(Self { name, path })
    }
}

/// `YYYYMMDDHHMMSS` for a build timestamp in epoch milliseconds.
/// Sub-second precision is dropped.
pub fn release_name<Tz>(timestamp_ms: i64, zone: &Tz) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let seconds = timestamp_ms.div_euclid(1000);
    let at: DateTime<Tz> = zone.timestamp_opt(seconds, 0).earliest().ok_or_else(|| {
        Error::internal_unexpected(format!("Build timestamp {} is out of range", timestamp_ms))
    })?;

    Ok(at.format(RELEASE_NAME_FORMAT).to_string())
}

fn join_release_path(releases_path: &str, name: &str) -> String {
    let root = releases_path.trim();
    if root.ends_with('/') {
        format!("{}{}", root, name)
    } else {
        format!("{}/{}", root, name)
    }
}

/// Shell command that creates the release directory and streams the artifact
/// into `tar` without touching local disk.
///
/// `--strip-components` is only passed for a positive strip level.
pub fn extract_command(
    release: &Release,
    artifact_url: &str,
    compression: Compression,
    strip_level: Option<i64>,
) -> String {
    let release_path = shell::quote_arg(&release.path);

    let mut tar_args = Vec::new();
    if let Some(level) = strip_level.filter(|level| *level > 0) {
        tar_args.push(format!("--strip-components={}", level));
    }
    tar_args.push("-C".to_string());
    tar_args.push(release_path.clone());
    tar_args.push(format!("-{}xf", compression.tar_switch()));
    tar_args.push("-".to_string());

    format!(
        "mkdir -p {} && (curl -s {} | tar {})",
        release_path,
        shell::quote_arg(artifact_url),
        tar_args.join(" ")
    )
}
