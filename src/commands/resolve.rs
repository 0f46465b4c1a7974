use clap::Args;
use serde::Serialize;

use jenkins_artifact::deploy::{self, DeployPlan};

use super::{CmdResult, TargetArgs};

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    pub action: String,
    #[serde(flatten)]
    pub plan: DeployPlan,
}

pub fn run(args: ResolveArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ResolveOutput> {
    let target_ref = args.target.target_ref()?;
    let plan = deploy::resolve(&target_ref, &args.target.assignments)?;

    Ok((
        ResolveOutput {
            action: "deploy.resolve".to_string(),
            plan,
        },
        0,
    ))
}
