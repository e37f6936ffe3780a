//! Renders `tracing` events as GitHub Actions workflow commands.

#![cfg(feature = "cli")]

use std::fmt::{self, Write as _};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    registry::LookupSpan,
};

use crate::env::Env;

/// The variable overriding the log filter, in [`EnvFilter`] syntax.
pub const LOG_ENV: &str = "OPTIMIZER_GATE_LOG";

/// Formats warnings, errors and debug messages as `::warning::`, `::error::` and `::debug::` commands so the runner
/// annotates them. Info messages are printed as plain lines, none of which can start a command.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkflowCommands;

impl<S, N> FormatEvent<S, N> for WorkflowCommands
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();
        ctx.field_format()
            .format_fields(Writer::new(&mut message), event)?;

        match command(*event.metadata().level()) {
            Some(command) => writeln!(writer, "::{command}::{}", escape_data(&message)),
            None => writeln!(writer, "{}", escape_plain(&message)),
        }
    }
}

/// The workflow command a level maps to, if any.
fn command(level: Level) -> Option<&'static str> {
    match level {
        Level::ERROR => Some("error"),
        Level::WARN => Some("warning"),
        Level::INFO => None,
        Level::DEBUG | Level::TRACE => Some("debug"),
    }
}

/// Escapes a message so a workflow command stays on one line.
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Keeps every line of a plain message from being read as a workflow command.
///
/// The runner treats any line starting with `::` after leading whitespace as a command, so that prefix is encoded.
fn escape_plain(message: &str) -> String {
    message
        .split('\n')
        .map(|line| {
            let body = line.trim_start();
            match body.strip_prefix("::") {
                Some(rest) => format!("{}%3A%3A{rest}", &line[..line.len() - body.len()]),
                None => line.to_owned(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Installs the global subscriber.
///
/// The filter is read from [`LOG_ENV`]. Without it, debug messages of this crate are shown only when the runner has
/// debug logging enabled.
pub fn init<E>(env: &E)
where
    E: Env,
{
    let filter = match env.non_empty(LOG_ENV) {
        Some(directives) => EnvFilter::new(directives),
        None if env.var("RUNNER_DEBUG").as_deref() == Some("1") => {
            EnvFilter::new(format!("{}=debug,info", env!("CARGO_CRATE_NAME")))
        }
        None => EnvFilter::new("info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(WorkflowCommands)
        .with_writer(std::io::stdout)
        .init();
}
