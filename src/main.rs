use anyhow::Result;
use clap::Parser;
use packer_deploy::{
    config::DeployPlan,
    interrupt,
    pipeline::{Pipeline, Runner},
    settings::Settings,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "packer-deploy",
    about = "Run Packer init, validate and build for the AWS and Google Cloud templates",
    version
)]
struct Args {
    #[command(flatten)]
    settings: Settings,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout belongs to the status lines and Packer.
    let filter = if args.verbose {
        "packer_deploy=debug,info"
    } else {
        "packer_deploy=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Settings: {:#?}", args.settings);

    // Registered before any child exists so a terminal Ctrl-C is never
    // handled by the default disposition.
    let ctrl_c = interrupt::listen_for_ctrl_c()?;

    let plan = DeployPlan::packer(&args.settings)?;

    println!("Packer deploy started.");

    let mut runner = Runner::new(ctrl_c).dry_run(args.settings.dry_run);
    let mut pipeline = Pipeline::new(plan);

    match pipeline.execute(&mut runner).await {
        Ok(summary) => {
            tracing::info!(
                "All {} steps finished in {:.1?}",
                summary.steps_run,
                summary.elapsed
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Deploy aborted after {} steps: {}", pipeline.attempted(), e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
