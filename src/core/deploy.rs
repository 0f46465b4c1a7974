//! The artifact deploy workflow.
//!
//! Strictly sequential: settings → last successful build → artifact URL →
//! compression → release → extraction command → remote run. Every setting is
//! validated before Jenkins is contacted, and every value is computed once and
//! handed to the next step.

use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::jenkins::{self, ArtifactSelector, Build, BuildSource, Credentials, JenkinsClient};
use crate::release::{self, Release, ReleaseZone};
use crate::ssh::{RemoteShell, SshClient};
use crate::target::{self, Target};
use crate::variables::DeployVariables;

pub const DEFAULT_STRIP_LEVEL: i64 = 1;

/// Variable names read and written by the workflow.
pub mod keys {
    pub const JENKINS_ORIGIN: &str = "jenkins_origin";
    pub const JENKINS_USER: &str = "jenkins_user";
    pub const JENKINS_API_TOKEN: &str = "jenkins_api_token";
    pub const IS_MULTIBRANCH_JOB: &str = "is_multibranch_job";
    pub const BRANCH: &str = "branch";
    pub const BUILD_PROJECT: &str = "build_project";
    pub const ARTIFACT_RELATIVE_PATH: &str = "artifact_relative_path";
    pub const ARTIFACT_COMPRESSION_TYPE: &str = "artifact_compression_type";
    pub const ARTIFACT_STRIP_LEVEL: &str = "artifact_strip_level";
    pub const RELEASES_PATH: &str = "releases_path";
    pub const RELEASE_TIMEZONE: &str = "release_timezone";

    pub const ARTIFACT_URL: &str = "artifact_url";
    pub const RELEASE_NAME: &str = "release_name";
    pub const RELEASE_PATH: &str = "release_path";
    pub const LATEST_RELEASE: &str = "latest_release";
}

/// Everything the workflow reads from the deploy variables, validated.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub origin: Url,
    pub credentials: Option<Credentials>,
    pub job: String,
    pub selector: ArtifactSelector,
    pub compression: Option<Compression>,
    pub strip_level: Option<i64>,
    pub releases_path: String,
    pub release_zone: ReleaseZone,
}

impl DeploySettings {
    pub fn from_variables(vars: &DeployVariables) -> Result<Self> {
        let origin = jenkins::parse_origin(&vars.required_string(keys::JENKINS_ORIGIN)?)?;
        let credentials = credentials(vars)?;
        let job = job_name(vars)?;

        let selector = ArtifactSelector::from_filter(vars.string(keys::ARTIFACT_RELATIVE_PATH)?);

        let compression = vars
            .string(keys::ARTIFACT_COMPRESSION_TYPE)?
            .map(|value| value.parse::<Compression>())
            .transpose()?;

        // Unset means the default; an explicit null disables stripping.
        let strip_level = if vars.exists(keys::ARTIFACT_STRIP_LEVEL) {
            vars.integer(keys::ARTIFACT_STRIP_LEVEL)?
        } else {
            Some(DEFAULT_STRIP_LEVEL)
        };

        let releases_path = vars.required_string(keys::RELEASES_PATH)?;

        let release_zone = vars
            .string(keys::RELEASE_TIMEZONE)?
            .map(|value| value.parse::<ReleaseZone>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            origin,
            credentials,
            job,
            selector,
            compression,
            strip_level,
            releases_path,
            release_zone,
        })
    }
}

/// The branch for multibranch jobs, the build project otherwise.
fn job_name(vars: &DeployVariables) -> Result<String> {
    if vars.bool(keys::IS_MULTIBRANCH_JOB)?.unwrap_or(false) {
        vars.required_string(keys::BRANCH)
    } else {
        vars.required_string(keys::BUILD_PROJECT)
    }
}

fn credentials(vars: &DeployVariables) -> Result<Option<Credentials>> {
    match (
        vars.string(keys::JENKINS_USER)?,
        vars.string(keys::JENKINS_API_TOKEN)?,
    ) {
        (Some(user), Some(api_token)) => Ok(Some(Credentials { user, api_token })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(Error::config_missing_key(keys::JENKINS_API_TOKEN)
            .with_hint("jenkins_user and jenkins_api_token must be set together")),
        (None, Some(_)) => Err(Error::config_missing_key(keys::JENKINS_USER)
            .with_hint("jenkins_user and jenkins_api_token must be set together")),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    pub timestamp: i64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl From<&Build> for BuildSummary {
    fn from(build: &Build) -> Self {
        Self {
            number: build.number,
            timestamp: build.timestamp,
            url: build.url.clone(),
            result: build.result.clone(),
        }
    }
}

/// Everything resolved for one deploy, before anything runs remotely.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPlan {
    pub job: String,
    pub build: BuildSummary,
    pub artifact_url: String,
    pub compression: Compression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_level: Option<i64>,
    pub release: Release,
    pub command: String,
}

impl DeployPlan {
    /// Values later deploy stages read back.
    pub fn produced_variables(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (keys::ARTIFACT_URL.to_string(), self.artifact_url.clone()),
            (keys::RELEASE_NAME.to_string(), self.release.name.clone()),
            (keys::RELEASE_PATH.to_string(), self.release.path.clone()),
            (keys::LATEST_RELEASE.to_string(), self.release.path.clone()),
        ])
    }
}

/// Resolve build, artifact, compression and release without running anything.
pub fn plan<S: BuildSource + ?Sized>(source: &S, settings: &DeploySettings) -> Result<DeployPlan> {
    let build = jenkins::fetch_last_successful_build(source, &settings.job)?;

    let artifact_url =
        jenkins::resolve_artifact_url(&build, &settings.selector, &settings.origin, &settings.job)?;
    log_status!("deploy", "Artifact: {}", artifact_url);

    let compression = Compression::resolve(settings.compression, artifact_url.path());

    let release = Release::from_build_timestamp(
        build.timestamp,
        &settings.releases_path,
        settings.release_zone,
    )?;

    let artifact_url = artifact_url.to_string();
    let command =
        release::extract_command(&release, &artifact_url, compression, settings.strip_level);

    Ok(DeployPlan {
        job: settings.job.clone(),
        build: BuildSummary::from(&build),
        artifact_url,
        compression,
        strip_level: settings.strip_level.filter(|level| *level > 0),
        release,
        command,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    #[serde(flatten)]
    pub plan: DeployPlan,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    pub produced: BTreeMap<String, String>,
}

/// Run the workflow against the given collaborators.
///
/// Produced values are written back into `vars`. With no shell nothing is
/// executed and the outcome is a dry run.
pub fn deploy_with(
    source: &dyn BuildSource,
    shell: Option<&dyn RemoteShell>,
    vars: &mut DeployVariables,
) -> Result<DeployOutcome> {
    let settings = DeploySettings::from_variables(vars)?;
    let plan = plan(source, &settings)?;

    let produced = plan.produced_variables();
    for (key, value) in &produced {
        vars.set(key.clone(), value.clone());
    }

    let stdout = match shell {
        Some(shell) => {
            log_status!("deploy", "Extracting into {}", plan.release.path);
            let output = shell.run(&plan.command)?;
            log_status!("deploy", "Release {} ready", plan.release.name);
            Some(output.stdout)
        }
        None => {
            log_status!("deploy", "Dry run, not executing: {}", plan.command);
            None
        }
    };

    Ok(DeployOutcome {
        plan,
        dry_run: shell.is_none(),
        stdout,
        produced,
    })
}

/// Where to read a deploy target from.
#[derive(Debug, Clone)]
pub enum TargetRef {
    Id(String),
    Path(PathBuf),
}

impl TargetRef {
    pub fn load(&self) -> Result<Target> {
        match self {
            TargetRef::Id(id) => target::load(id),
            TargetRef::Path(path) => target::load_path(path),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// `key=value` variable overrides applied on top of the target file.
    pub assignments: Vec<String>,
    pub dry_run: bool,
}

/// Load a target and deploy its latest successful build over SSH.
pub fn run(target_ref: &TargetRef, options: &DeployOptions) -> Result<DeployOutcome> {
    let mut target = target_ref.load()?;
    target.variables.apply_assignments(&options.assignments)?;

    let settings = DeploySettings::from_variables(&target.variables)?;

    let ssh = if options.dry_run {
        None
    } else {
        Some(SshClient::from_server(target.require_server()?, &target.id)?)
    };

    let client = JenkinsClient::new(settings.origin, settings.credentials)?;
    let shell = ssh.as_ref().map(|ssh| ssh as &dyn RemoteShell);

    deploy_with(&client, shell, &mut target.variables)
}

/// Load a target and resolve what a deploy would do, without SSH.
pub fn resolve(target_ref: &TargetRef, assignments: &[String]) -> Result<DeployPlan> {
    let mut target = target_ref.load()?;
    target.variables.apply_assignments(assignments)?;

    let settings = DeploySettings::from_variables(&target.variables)?;
    let client = JenkinsClient::new(settings.origin.clone(), settings.credentials.clone())?;

    plan(&client, &settings)
}
