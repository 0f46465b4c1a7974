use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{deploy, resolve, targets};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "jenkins-artifact")]
#[command(version = VERSION)]
#[command(about = "Deploy the latest successful Jenkins build artifact to a release directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the last successful build's artifact into a new release on the target
    Deploy(deploy::DeployArgs),
    /// Show the build, artifact and command a deploy would use
    Resolve(resolve::ResolveArgs),
    /// List configured deploy targets
    Targets(targets::TargetsArgs),
}

fn run_json(
    command: Commands,
    global: &GlobalArgs,
) -> (jenkins_artifact::Result<serde_json::Value>, i32) {
    match command {
        Commands::Deploy(args) => output::map_cmd_result_to_json(deploy::run(args, global)),
        Commands::Resolve(args) => output::map_cmd_result_to_json(resolve::run(args, global)),
        Commands::Targets(args) => output::map_cmd_result_to_json(targets::run(args, global)),
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = run_json(cli.command, &global);

    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
