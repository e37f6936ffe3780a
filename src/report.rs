//! Publishes the decision as the `skip` step output.

use std::{
    fmt::Debug,
    fs::OpenOptions,
    io::{self, Write as _},
    path::PathBuf,
};

use tracing::{debug, info};

use crate::{decision::Decision, env::Env};

/// The name of the step output carrying the decision.
pub const SKIP_OUTPUT: &str = "skip";

/// A channel step outputs are written to.
pub trait Output: Debug + Send {
    /// Sets a step output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn set_output(&mut self, name: &str, value: &str) -> io::Result<()>;
}

impl<O> Output for &mut O
where
    O: Output + ?Sized,
{
    fn set_output(&mut self, name: &str, value: &str) -> io::Result<()> {
        (**self).set_output(name, value)
    }
}

/// Writes outputs to the file named by `GITHUB_OUTPUT`, or to stdout when run outside a runner.
#[derive(Debug, Clone, Default)]
pub struct GithubOutput {
    path: Option<PathBuf>,
}

impl GithubOutput {
    /// Locates the output file of the current step.
    pub fn from_env<E>(env: &E) -> Self
    where
        E: Env,
    {
        Self {
            path: env.non_empty("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }
}

impl Output for GithubOutput {
    fn set_output(&mut self, name: &str, value: &str) -> io::Result<()> {
        match &self.path {
            Some(path) => {
                debug!("writing output {name} to {}", path.display());
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{name}={value}")
            }
            None => writeln!(io::stdout().lock(), "{name}={value}"),
        }
    }
}

/// Keeps outputs in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryOutput {
    /// Every output set so far, as `(name, value)` in write order.
    pub outputs: Vec<(String, String)>,
}

impl Output for MemoryOutput {
    fn set_output(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.outputs.push((name.to_owned(), value.to_owned()));
        Ok(())
    }
}

/// Publishes the decision of an invocation.
///
/// Publishing consumes the reporter, so a decision can only be published once.
#[derive(Debug)]
pub struct Reporter<O> {
    output: O,
}

impl<O> Reporter<O>
where
    O: Output,
{
    /// Creates a reporter writing to `output`.
    pub fn new(output: O) -> Self {
        Self { output }
    }

    /// Publishes the decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn publish(mut self, decision: &Decision) -> io::Result<()> {
        info!("skip: {}", decision.skip);
        self.output
            .set_output(SKIP_OUTPUT, if decision.skip { "true" } else { "false" })
    }
}
