//! Jenkins build lookup and artifact URL resolution.
//!
//! `JenkinsClient` is a local adapter over a blocking HTTP client. The
//! workflow only needs two things from Jenkins: the last successful build of
//! a job, and a download URL for one of that build's artifacts.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Left as-is when escaping: the URI unreserved and reserved characters.
/// `%` is not in the set, so input is always treated as unescaped.
const URI_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'[')
    .remove(b']');

/// Last successful build record as returned by `/lastSuccessfulBuild/api/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Build start, epoch milliseconds.
    pub timestamp: i64,
    pub url: String,
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_path: Option<String>,
}

impl Artifact {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            file_name: None,
            display_path: None,
        }
    }
}

/// Which artifact of a build to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSelector {
    /// The first artifact, in the order Jenkins lists them.
    First,
    /// The first artifact whose relative path matches exactly.
    RelativePath(String),
}

impl ArtifactSelector {
    pub fn from_filter(relative_path: Option<String>) -> Self {
        match relative_path {
            Some(path) => Self::RelativePath(path),
            None => Self::First,
        }
    }

    pub fn select<'a>(&self, artifacts: &'a [Artifact]) -> Option<&'a Artifact> {
        match self {
            Self::First => artifacts.first(),
            Self::RelativePath(path) => artifacts.iter().find(|a| a.relative_path == *path),
        }
    }

    fn filter(&self) -> Option<String> {
        match self {
            Self::First => None,
            Self::RelativePath(path) => Some(path.clone()),
        }
    }
}

/// Anything that can report a job's last successful build.
pub trait BuildSource {
    fn last_successful_build(&self, job: &str) -> Result<Build>;
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub api_token: String,
}

/// HTTP client bound to one Jenkins origin.
pub struct JenkinsClient {
    client: Client,
    origin: Url,
    credentials: Option<Credentials>,
}

impl JenkinsClient {
    /// No request timeout is set; a hung server blocks until the caller gives up.
    pub fn new(origin: Url, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("jenkins-artifact/{}", VERSION))
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some("create HTTP client".to_string()))
            })?;

        Ok(Self {
            client,
            origin,
            credentials,
        })
    }

    pub fn last_successful_build_url(&self, job: &str) -> Result<Url> {
        let endpoint = format!(
            "{}/job/{}/lastSuccessfulBuild/api/json",
            self.origin.as_str().trim_end_matches('/'),
            escape_uri(job)
        );

        Url::parse(&endpoint).map_err(|e| {
            Error::config_invalid_value("jenkins_origin", Some(endpoint.clone()), e.to_string())
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut request = self.client.get(url.clone());

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.user, Some(&credentials.api_token));
        }

        let response = request
            .send()
            .map_err(|e| Error::remote_api_failed(url.as_str(), None, e.to_string()))?;
        parse_json_response(url.as_str(), response)
    }
}

impl BuildSource for JenkinsClient {
    fn last_successful_build(&self, job: &str) -> Result<Build> {
        let url = self.last_successful_build_url(job)?;
        self.get_json(url)
    }
}

fn parse_json_response<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| Error::remote_api_failed(url, Some(status.as_u16()), e.to_string()))?;

    if !status.is_success() {
        return Err(Error::remote_api_failed(url, Some(status.as_u16()), body));
    }

    serde_json::from_str(&body).map_err(|e| {
        Error::remote_api_failed(
            url,
            Some(status.as_u16()),
            format!("Invalid JSON response: {}", e),
        )
    })
}

/// Parse and validate the configured Jenkins origin.
pub fn parse_origin(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        Error::config_invalid_value("jenkins_origin", Some(raw.to_string()), e.to_string())
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::config_invalid_value(
            "jenkins_origin",
            Some(raw.to_string()),
            "Expected an absolute http(s) URL",
        ));
    }

    Ok(url)
}

/// Fetch the last successful build of `job`. Failures are not retried.
pub fn fetch_last_successful_build<S: BuildSource + ?Sized>(
    source: &S,
    job: &str,
) -> Result<Build> {
    if job.trim().is_empty() {
        return Err(Error::config_missing_key("build_project")
            .with_hint("Set build_project, or branch with is_multibranch_job"));
    }

    log_status!("jenkins", "Obtaining last successful build of {}", job);
    source.last_successful_build(job)
}

/// Download URL of the selected artifact, served from `origin`.
///
/// Jenkins reports build URLs using its own configured root URL, which may be
/// an address the deploying machine cannot reach, so scheme, host and port
/// are replaced with the origin's.
pub fn resolve_artifact_url(
    build: &Build,
    selector: &ArtifactSelector,
    origin: &Url,
    job: &str,
) -> Result<Url> {
    let not_found = || {
        Error::artifact_not_found(
            job,
            selector.filter(),
            build
                .artifacts
                .iter()
                .map(|a| a.relative_path.clone())
                .collect(),
        )
    };

    let artifact = selector.select(&build.artifacts).ok_or_else(not_found)?;

    if build.url.trim().is_empty() {
        return Err(not_found());
    }

    let raw = escape_uri(&format!("{}artifact/{}", build.url, artifact.relative_path));
    let url = Url::parse(&raw)
        .map_err(|e| Error::remote_api_failed(&raw, None, format!("Invalid build URL: {}", e)))?;

    rebase_onto_origin(url, origin)
}

fn rebase_onto_origin(mut url: Url, origin: &Url) -> Result<Url> {
    let original = url.to_string();
    let rebase_error = |field: &str| {
        Error::config_invalid_value(
            "jenkins_origin",
            Some(origin.to_string()),
            format!("Cannot apply origin {} to {}", field, original),
        )
    };

    if url.set_scheme(origin.scheme()).is_err() {
        return Err(rebase_error("scheme"));
    }
    if url.set_host(origin.host_str()).is_err() {
        return Err(rebase_error("host"));
    }
    if url.set_port(origin.port()).is_err() {
        return Err(rebase_error("port"));
    }

    Ok(url)
}

/// Percent-encode everything outside the URI unreserved and reserved sets.
fn escape_uri(value: &str) -> String {
    utf8_percent_encode(value, URI_SAFE).to_string()
}
