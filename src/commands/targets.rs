use clap::Args;
use serde::Serialize;

use jenkins_artifact::target;

use super::CmdResult;

#[derive(Args)]
pub struct TargetsArgs {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetsOutput {
    pub action: String,
    pub targets: Vec<String>,
}

pub fn run(_args: TargetsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<TargetsOutput> {
    let targets = target::list_ids()?;

    Ok((
        TargetsOutput {
            action: "targets.list".to_string(),
            targets,
        },
        0,
    ))
}
