use clap::Args;
use serde::Serialize;

use jenkins_artifact::deploy::{self, DeployOptions, DeployOutcome};

use super::{CmdResult, TargetArgs};

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Resolve and print the extraction command without running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    pub action: String,
    #[serde(flatten)]
    pub outcome: DeployOutcome,
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let target_ref = args.target.target_ref()?;
    let options = DeployOptions {
        assignments: args.target.assignments,
        dry_run: args.dry_run,
    };

    let outcome = deploy::run(&target_ref, &options)?;

    Ok((
        DeployOutput {
            action: "deploy.run".to_string(),
            outcome,
        },
        0,
    ))
}
