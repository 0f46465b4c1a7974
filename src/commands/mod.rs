use clap::Args;
use std::path::PathBuf;

use jenkins_artifact::deploy::TargetRef;

pub type CmdResult<T> = jenkins_artifact::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Target selection and variable overrides shared by deploy-style commands.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Target ID (reads ~/.config/jenkins-artifact/targets/<id>.json)
    #[arg(required_unless_present = "config")]
    pub target: Option<String>,

    /// Read the target from this file instead
    #[arg(long, value_name = "PATH", conflicts_with = "target")]
    pub config: Option<PathBuf>,

    /// Override a deploy variable (repeatable), e.g. --set branch=release/2.1
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub assignments: Vec<String>,
}

impl TargetArgs {
    pub fn target_ref(&self) -> jenkins_artifact::Result<TargetRef> {
        match (&self.target, &self.config) {
            (_, Some(path)) => Ok(TargetRef::Path(path.clone())),
            (Some(id), None) => Ok(TargetRef::Id(id.clone())),
            (None, None) => Err(jenkins_artifact::Error::validation_invalid_argument(
                "target",
                "Provide a target ID or --config <path>",
                None,
            )),
        }
    }
}

pub mod deploy;
pub mod resolve;
pub mod targets;
