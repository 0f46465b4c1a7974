use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Archive compression, as far as `tar` needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
    Bzip2,
    Xz,
    Raw,
}

impl Compression {
    /// Guess from an artifact file name or URL path, case-insensitively.
    ///
    /// Anything unrecognised is treated as bzip2, not rejected.
    pub fn guess(filename: &str) -> Self {
        let name = filename.to_ascii_lowercase();
        let has = |suffixes: &[&str]| suffixes.iter().any(|s| name.ends_with(s));

        if has(&[".tar.gz", ".tgz"]) {
            Compression::Gzip
        } else if has(&[".tar.bz2", ".tbz"]) {
            Compression::Bzip2
        } else if has(&[".tar.xz", ".txz"]) {
            Compression::Xz
        } else if has(&[".tar"]) {
            Compression::Raw
        } else {
            Compression::Bzip2
        }
    }

    /// Explicit override when present, otherwise a guess from `filename`.
    pub fn resolve(explicit: Option<Self>, filename: &str) -> Self {
        explicit.unwrap_or_else(|| Self::guess(filename))
    }

    /// Single-letter `tar` decompression switch; empty for a plain tarball.
    pub fn tar_switch(&self) -> &'static str {
        match self {
            Compression::Gzip => "z",
            Compression::Bzip2 => "j",
            Compression::Xz => "J",
            Compression::Raw => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Raw => "raw",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Values written as `:gzip` are accepted as well.
        match s.trim().trim_start_matches(':') {
            "gzip" => Ok(Compression::Gzip),
            "bzip2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            "raw" => Ok(Compression::Raw),
            _ => Err(Error::config_invalid_value(
                "artifact_compression_type",
                Some(s.to_string()),
                format!("Invalid compression type: {}", s),
            )
            .with_hint("Use one of: gzip, bzip2, xz, raw")),
        }
    }
}
