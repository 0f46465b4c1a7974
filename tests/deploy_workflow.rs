use std::cell::{Cell, RefCell};
use std::fs;

use jenkins_artifact::deploy::{self, keys, DeployOptions, TargetRef};
use jenkins_artifact::error::RemoteCommandFailedDetails;
use jenkins_artifact::jenkins::{Artifact, Build, BuildSource};
use jenkins_artifact::ssh::{CommandOutput, RemoteShell};
use jenkins_artifact::variables::DeployVariables;
use jenkins_artifact::{Error, ErrorCode, Result};
use serde_json::Value;
use tempfile::TempDir;

struct FakeJenkins {
    build: Result<Build>,
    calls: Cell<usize>,
    jobs: RefCell<Vec<String>>,
}

impl FakeJenkins {
    fn with_artifacts(paths: &[&str]) -> Self {
        Self::returning(Ok(Build {
            timestamp: 1_700_000_000_000,
            url: "http://10.0.0.5:8080/job/app/42/".to_string(),
            artifacts: paths.iter().map(|p| Artifact::new(*p)).collect(),
            number: Some(42),
            id: Some("42".to_string()),
            result: Some("SUCCESS".to_string()),
        }))
    }

    fn returning(build: Result<Build>) -> Self {
        Self {
            build,
            calls: Cell::new(0),
            jobs: RefCell::new(Vec::new()),
        }
    }
}

impl BuildSource for FakeJenkins {
    fn last_successful_build(&self, job: &str) -> Result<Build> {
        self.calls.set(self.calls.get() + 1);
        self.jobs.borrow_mut().push(job.to_string());
        self.build.clone()
    }
}

#[derive(Default)]
struct RecordingShell {
    commands: RefCell<Vec<String>>,
    fail_with: Option<i32>,
}

impl RemoteShell for RecordingShell {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command.to_string());
        let output = CommandOutput {
            stdout: String::new(),
            stderr: if self.fail_with.is_some() {
                "curl: (22) The requested URL returned error: 404".to_string()
            } else {
                String::new()
            },
            success: self.fail_with.is_none(),
            exit_code: self.fail_with.unwrap_or(0),
        };
        output.into_remote_result(command, Some("web1.example.com".to_string()))
    }
}

fn vars() -> DeployVariables {
    let mut vars = DeployVariables::new();
    vars.set(keys::JENKINS_ORIGIN, "https://ci.example.com");
    vars.set(keys::BUILD_PROJECT, "app");
    vars.set(keys::RELEASES_PATH, "/srv/app/releases");
    vars.set(keys::RELEASE_TIMEZONE, "utc");
    vars
}

#[test]
fn deploys_first_artifact_into_timestamped_release() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz", "b.tar.gz"]);
    let shell = RecordingShell::default();
    let mut vars = vars();

    let outcome = deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap();

    assert_eq!(*jenkins.jobs.borrow(), vec!["app".to_string()]);
    assert_eq!(
        outcome.plan.artifact_url,
        "https://ci.example.com/job/app/42/artifact/a.tar.gz"
    );
    assert_eq!(outcome.plan.release.name, "20231114221320");
    assert!(!outcome.dry_run);

    let commands = shell.commands.borrow();
    assert_eq!(commands.len(), 1);
    assert_eq!(
        commands[0],
        "mkdir -p /srv/app/releases/20231114221320 && \
         (curl -s https://ci.example.com/job/app/42/artifact/a.tar.gz | \
         tar --strip-components=1 -C /srv/app/releases/20231114221320 -zxf -)"
    );
}

#[test]
fn produced_variables_are_written_back() {
    let jenkins = FakeJenkins::with_artifacts(&["dist/app.tar.xz"]);
    let shell = RecordingShell::default();
    let mut vars = vars();

    deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap();

    assert_eq!(
        vars.string(keys::ARTIFACT_URL).unwrap().as_deref(),
        Some("https://ci.example.com/job/app/42/artifact/dist/app.tar.xz")
    );
    assert_eq!(
        vars.string(keys::RELEASE_NAME).unwrap().as_deref(),
        Some("20231114221320")
    );
    assert_eq!(
        vars.string(keys::RELEASE_PATH).unwrap(),
        vars.string(keys::LATEST_RELEASE).unwrap()
    );
    assert!(shell.commands.borrow()[0].contains("-Jxf -"));
}

#[test]
fn relative_path_filter_selects_matching_artifact() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz", "b.tar.gz"]);
    let shell = RecordingShell::default();
    let mut vars = vars();
    vars.set(keys::ARTIFACT_RELATIVE_PATH, "b.tar.gz");

    let outcome = deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap();
    assert!(outcome.plan.artifact_url.ends_with("/artifact/b.tar.gz"));
}

#[test]
fn missing_origin_fails_before_any_request() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz"]);
    let shell = RecordingShell::default();
    let mut vars = vars();
    vars.remove(keys::JENKINS_ORIGIN);

    let err = deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(jenkins.calls.get(), 0);
    assert!(shell.commands.borrow().is_empty());
}

#[test]
fn build_without_artifacts_aborts_before_remote_command() {
    let jenkins = FakeJenkins::with_artifacts(&[]);
    let shell = RecordingShell::default();
    let mut vars = vars();

    let err = deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap_err();

    assert_eq!(err.code, ErrorCode::ArtifactNotFound);
    assert!(shell.commands.borrow().is_empty());
    assert!(!vars.exists(keys::RELEASE_PATH));
}

#[test]
fn api_failure_is_not_retried() {
    let jenkins = FakeJenkins::returning(Err(Error::remote_api_failed(
        "https://ci.example.com/job/app/lastSuccessfulBuild/api/json",
        Some(503),
        "Service Unavailable",
    )));
    let shell = RecordingShell::default();
    let mut vars = vars();

    let err = deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap_err();

    assert_eq!(err.code, ErrorCode::RemoteApiFailed);
    assert_eq!(jenkins.calls.get(), 1);
    assert!(shell.commands.borrow().is_empty());
}

#[test]
fn remote_failure_surfaces_from_shell() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tgz"]);
    let shell = RecordingShell {
        fail_with: Some(2),
        ..RecordingShell::default()
    };
    let mut vars = vars();

    let err = deploy::deploy_with(&jenkins, Some(&shell), &mut vars).unwrap_err();

    assert_eq!(err.code, ErrorCode::RemoteCommandFailed);
    assert_eq!(err.details["exitCode"], 2);
    assert_eq!(shell.commands.borrow().len(), 1);
}

#[test]
fn dry_run_resolves_without_running() {
    let jenkins = FakeJenkins::with_artifacts(&["app.zip"]);
    let mut vars = vars();

    let outcome = deploy::deploy_with(&jenkins, None, &mut vars).unwrap();

    assert!(outcome.dry_run);
    assert!(outcome.stdout.is_none());
    // Unknown extensions fall back to bzip2.
    assert!(outcome.plan.command.contains("-jxf -"));
    assert_eq!(
        outcome.produced.get(keys::RELEASE_NAME).map(String::as_str),
        Some("20231114221320")
    );
    assert!(vars.exists(keys::LATEST_RELEASE));
}

#[test]
fn strip_level_controls_flag() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz"]);

    let mut vars = vars();
    vars.set(keys::ARTIFACT_STRIP_LEVEL, 0);
    let outcome = deploy::deploy_with(&jenkins, None, &mut vars).unwrap();
    assert!(!outcome.plan.command.contains("--strip-components"));

    let mut vars = self::vars();
    vars.set(keys::ARTIFACT_STRIP_LEVEL, 2);
    let outcome = deploy::deploy_with(&jenkins, None, &mut vars).unwrap();
    assert!(outcome.plan.command.contains("--strip-components=2"));
}

#[test]
fn compression_override_beats_extension() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz"]);
    let mut vars = vars();
    vars.set(keys::ARTIFACT_COMPRESSION_TYPE, "raw");

    let outcome = deploy::deploy_with(&jenkins, None, &mut vars).unwrap();
    assert!(outcome.plan.command.ends_with("-C /srv/app/releases/20231114221320 -xf -)"));
}

#[test]
fn multibranch_job_fetches_branch_build() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz"]);
    let mut vars = vars();
    vars.set(keys::IS_MULTIBRANCH_JOB, true);
    vars.set(keys::BRANCH, "release/2.1");

    deploy::deploy_with(&jenkins, None, &mut vars).unwrap();
    assert_eq!(*jenkins.jobs.borrow(), vec!["release/2.1".to_string()]);
}

#[test]
fn numeric_looking_branch_from_assignment_is_fetched_verbatim() {
    for branch in ["1.10", "007", "2e3"] {
        let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz"]);
        let mut vars = vars();
        vars.set(keys::IS_MULTIBRANCH_JOB, true);
        vars.apply_assignments(&[format!("branch={}", branch)]).unwrap();

        deploy::deploy_with(&jenkins, None, &mut vars).unwrap();
        assert_eq!(*jenkins.jobs.borrow(), vec![branch.to_string()]);
    }
}

#[test]
fn outcome_serializes_plan_fields_flat() {
    let jenkins = FakeJenkins::with_artifacts(&["a.tar.gz"]);
    let mut vars = vars();

    let outcome = deploy::deploy_with(&jenkins, None, &mut vars).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["job"], "app");
    assert_eq!(json["compression"], "gzip");
    assert_eq!(json["build"]["number"], 42);
    assert_eq!(json["release"]["path"], "/srv/app/releases/20231114221320");
    assert_eq!(json["dryRun"], true);
    assert_eq!(json["produced"]["latest_release"], "/srv/app/releases/20231114221320");
}

fn write_target(dir: &TempDir, body: &str) -> TargetRef {
    let path = dir.path().join("production.json");
    fs::write(&path, body).unwrap();
    TargetRef::Path(path)
}

#[test]
fn run_rejects_target_without_origin_before_network() {
    let dir = TempDir::new().unwrap();
    let target = write_target(
        &dir,
        r#"{ "variables": { "build_project": "app", "releases_path": "/srv/app/releases" } }"#,
    );

    let err = deploy::run(&target, &DeployOptions::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissingKey);
    assert_eq!(err.details["key"], "jenkins_origin");
}

#[test]
fn run_requires_server_unless_dry_run() {
    let dir = TempDir::new().unwrap();
    let target = write_target(
        &dir,
        r#"{ "variables": {
            "jenkins_origin": "https://ci.example.com",
            "build_project": "app",
            "releases_path": "/srv/app/releases"
        } }"#,
    );

    let err = deploy::run(&target, &DeployOptions::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::SshServerInvalid);
}

#[test]
fn run_applies_set_overrides() {
    let dir = TempDir::new().unwrap();
    let target = write_target(
        &dir,
        r#"{ "variables": {
            "jenkins_origin": "https://ci.example.com",
            "build_project": "app",
            "releases_path": "/srv/app/releases"
        } }"#,
    );

    let options = DeployOptions {
        assignments: vec!["artifact_compression_type=zip".to_string()],
        dry_run: true,
    };

    let err = deploy::run(&target, &options).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    assert_eq!(err.details["value"], Value::from("zip"));
}

#[test]
fn remote_command_failed_details_round_out_error() {
    let err = Error::remote_command_failed(RemoteCommandFailedDetails {
        command: "mkdir -p /srv/app/releases/1".to_string(),
        exit_code: 1,
        stdout: String::new(),
        stderr: "mkdir: Permission denied".to_string(),
        host: None,
    });
    assert!(err.details.get("host").is_none());
    assert_eq!(err.details["stderr"], "mkdir: Permission denied");
}
