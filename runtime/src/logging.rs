//! Logging decorator.

use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::handler::{CommandHandler, HandlerFuture};
use crate::metrics::PipelineMetrics;

/// Logs the start, completion and failure of every command it wraps, and
/// counts each command once by outcome.
///
/// Errors are logged and returned unchanged.
pub struct WithLogging<H> {
    inner: H,
}

impl<H> WithLogging<H> {
    /// Wraps `inner`.
    #[must_use]
    pub const fn new(inner: H) -> Self {
        Self { inner }
    }
}

/// Log text for a command: its own description, or one built from its type.
pub fn description_of<C: Command>(command: &C) -> String {
    command
        .describe()
        .unwrap_or_else(|| format!("'{}' command", command.command_type()))
}

impl<C: Command, H: CommandHandler<C>> CommandHandler<C> for WithLogging<H> {
    fn handle<'a>(&'a self, command: &'a C, cancel: &'a CancellationToken) -> HandlerFuture<'a> {
        Box::pin(async move {
            let command_type = command.command_type();
            let description = description_of(command);
            let started = Instant::now();

            tracing::info!(command = command_type, "Start handle {description}");

            match self.inner.handle(command, cancel).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    tracing::info!(
                        command = command_type,
                        duration_ms = elapsed.as_millis(),
                        "End handle {description}"
                    );
                    PipelineMetrics::record_command(command_type, "success", elapsed);
                    Ok(())
                }
                Err(error) => {
                    tracing::error!(
                        command = command_type,
                        error = %error,
                        "Error handling {description}"
                    );
                    PipelineMetrics::record_command(command_type, error.kind(), started.elapsed());
                    Err(error)
                }
            }
        })
    }
}
