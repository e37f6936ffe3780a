//! Command-line entry point run as a GitHub Actions step.

use std::process::ExitCode;

use optimizer_gate::{
    env::ProcessEnv,
    gate, logging,
    report::{GithubOutput, Reporter},
    shutdown,
};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let env = ProcessEnv;
    logging::init(&env);

    let cancel = shutdown::cancel_on_signal();
    let reporter = Reporter::new(GithubOutput::from_env(&env));

    match gate::run(&env, reporter, &cancel).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
