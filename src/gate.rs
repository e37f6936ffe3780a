//! The top-level flow of one invocation: filter, build, ask, publish.

use std::panic::AssertUnwindSafe;

use anyhow::{Context as _, anyhow};
use futures::FutureExt as _;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::Configuration,
    decision::Decision,
    env::Env,
    optimizer::{OptimizerClient, RequestPayload},
    report::{Output, Reporter},
    workflow::{
        InvocationContext, TriggerEvent,
        trigger::{self, NotApplicable, Trigger},
    },
};

/// Works out the decision for the invocation described by `env`.
///
/// Failures of the optimizer exchange are folded into a decision to run the full workflow. Only errors that make the
/// invocation itself invalid are returned.
///
/// # Errors
///
/// Returns an error if the runner environment or the action inputs are missing or invalid. No request is sent then.
pub async fn decide<E>(env: &E, cancel: &CancellationToken) -> anyhow::Result<Decision>
where
    E: Env,
{
    let event = TriggerEvent::from_env(env).context("failed to read the triggering event")?;

    let pr = match trigger::filter(&event) {
        Trigger::Applicable { pr } => pr,
        Trigger::NotApplicable(reason) => {
            match reason {
                NotApplicable::Dispatch => info!("{reason}"),
                NotApplicable::NoPullRequest => warn!("{reason}"),
            }
            return Ok(Decision::run(reason.to_string()));
        }
    };

    let context =
        InvocationContext::for_event(event, env).context("failed to read the workflow context")?;

    let config = Configuration::from_env(env)?;
    debug!(
        "checking {}/{}#{pr} at {} with {config:?}",
        &context.repository.owner, &context.repository.name, &context.sha
    );

    let client = OptimizerClient::new(&config).context("failed to create the HTTP client")?;
    let payload = RequestPayload::new(&config.token, &context);

    Ok(client.decide(&payload, cancel).await)
}

/// Runs the gate and publishes exactly one decision.
///
/// If deciding fails or panics, a decision to run the full workflow is published before the error is returned, so
/// the `skip` output is never left unset.
///
/// # Errors
///
/// Returns the error that made the invocation fail, or an error if the output cannot be written.
pub async fn run<E, O>(
    env: &E,
    reporter: Reporter<O>,
    cancel: &CancellationToken,
) -> anyhow::Result<Decision>
where
    E: Env,
    O: Output,
{
    let result = AssertUnwindSafe(decide(env, cancel))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("An unknown error occurred"));
            Err(anyhow!(message))
        });

    match result {
        Ok(decision) => {
            reporter
                .publish(&decision)
                .context("failed to write the skip output")?;
            Ok(decision)
        }
        Err(err) => {
            if let Err(output_err) = reporter.publish(&Decision::run(format!("{err:#}"))) {
                error!("failed to write the skip output: {output_err}");
            }
            Err(err)
        }
    }
}
