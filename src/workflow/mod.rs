//! Data models of the GitHub Actions run invoking the gate.

use std::{fs, path::Path};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::env::Env;

pub mod trigger;

/// A runner variable that is missing or malformed.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// A variable the runner always sets is missing.
    #[error("{0} not set in environment, is this running inside GitHub Actions?")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid {key} `{value}`: expected {expected}")]
    Malformed {
        /// The variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// A description of the accepted format.
        expected: &'static str,
    },
}

/// Represents the repository a workflow runs in.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Repository {
    /// The user or organization owning the repository.
    pub owner: String,
    /// The repository name without its owner.
    pub name: String,
}

impl Repository {
    /// Splits an `owner/name` slug.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Malformed`] if the slug does not consist of two non-empty parts.
    pub fn from_slug(slug: &str) -> Result<Self, ContextError> {
        match slug.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                })
            }
            _ => Err(ContextError::Malformed {
                key: "GITHUB_REPOSITORY",
                value: slug.to_owned(),
                expected: "`owner/name`",
            }),
        }
    }
}

/// Identifies the workflow run and job being gated.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RunIds {
    /// The workflow name, or its file path if it has none.
    pub workflow: String,
    /// The id of the current job.
    pub job: String,
    /// The unique number of the workflow run.
    pub run: u64,
}

/// What triggered the workflow. This is all the trigger filter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    /// The name of the event, e.g. `pull_request`.
    pub name: String,
    /// The pull request number, if the event carries one.
    pub pull_request: Option<u64>,
}

impl TriggerEvent {
    /// Reads `GITHUB_EVENT_NAME` and the pull request number from the event payload at `GITHUB_EVENT_PATH`.
    ///
    /// A payload that cannot be read is not an error: the invocation is then treated as not being a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Missing`] if `GITHUB_EVENT_NAME` is not set.
    pub fn from_env<E>(env: &E) -> Result<Self, ContextError>
    where
        E: Env,
    {
        let name = env
            .non_empty("GITHUB_EVENT_NAME")
            .ok_or(ContextError::Missing("GITHUB_EVENT_NAME"))?;

        let pull_request = match env.non_empty("GITHUB_EVENT_PATH") {
            Some(path) => read_pull_request_number(&path),
            None => {
                debug!("GITHUB_EVENT_PATH not set, assuming no pull request");
                None
            }
        };

        Ok(Self { name, pull_request })
    }
}

/// Everything the gate knows about the current invocation.
///
/// Built once from the runner environment and passed around by reference, so the payload builder stays a pure
/// function of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// The name of the event that triggered the workflow, e.g. `pull_request`.
    pub event_name: String,
    /// The pull request number, if the event carries one.
    pub pull_request: Option<u64>,
    /// The commit SHA that triggered the workflow.
    pub sha: String,
    /// The fully-formed ref that triggered the workflow, e.g. `refs/pull/42/merge`.
    pub git_ref: String,
    /// The source branch of a pull request, absent for other events.
    pub head_ref: Option<String>,
    /// The workflow, job and run being gated.
    pub run: RunIds,
    /// The repository the workflow runs in.
    pub repository: Repository,
}

impl InvocationContext {
    /// Reads the context from the `GITHUB_*` variables of the runner.
    ///
    /// # Errors
    ///
    /// Returns a [`ContextError`] if a variable the runner always sets is missing or malformed.
    pub fn from_env<E>(env: &E) -> Result<Self, ContextError>
    where
        E: Env,
    {
        Self::for_event(TriggerEvent::from_env(env)?, env)
    }

    /// Completes an already read trigger event with the rest of the runner variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ContextError`] if a variable the runner always sets is missing or malformed.
    pub fn for_event<E>(event: TriggerEvent, env: &E) -> Result<Self, ContextError>
    where
        E: Env,
    {
        let required = |key: &'static str| env.non_empty(key).ok_or(ContextError::Missing(key));

        let run_id = required("GITHUB_RUN_ID")?;
        let run = match run_id.parse::<u64>() {
            Ok(run) => run,
            Err(_) => {
                return Err(ContextError::Malformed {
                    key: "GITHUB_RUN_ID",
                    value: run_id,
                    expected: "a positive integer",
                });
            }
        };

        Ok(Self {
            event_name: event.name,
            pull_request: event.pull_request,
            sha: required("GITHUB_SHA")?,
            git_ref: required("GITHUB_REF")?,
            head_ref: env.non_empty("GITHUB_HEAD_REF"),
            run: RunIds {
                workflow: required("GITHUB_WORKFLOW")?,
                job: required("GITHUB_JOB")?,
                run,
            },
            repository: Repository::from_slug(&required("GITHUB_REPOSITORY")?)?,
        })
    }
}

/// Reads `pull_request.number` from the webhook payload the runner stored at `path`.
fn read_pull_request_number<P>(path: P) -> Option<u64>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let payload = match fs::read_to_string(path) {
        Ok(payload) => payload,
        Err(err) => {
            debug!("failed to read event payload at {}: {err}", path.display());
            return None;
        }
    };

    match serde_json::from_str::<serde_json::Value>(&payload) {
        Ok(event) => event.pointer("/pull_request/number")?.as_u64(),
        Err(err) => {
            debug!("failed to parse event payload at {}: {err}", path.display());
            None
        }
    }
}
