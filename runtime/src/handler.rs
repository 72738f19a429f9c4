//! The handler abstraction every pipeline layer implements.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::CommandError;

/// Boxed future returned by [`CommandHandler::handle`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>>;

/// Handles one command type.
///
/// Decorators and domain handlers share this trait, so a pipeline is a chain of
/// boxed handlers each delegating to the next.
///
/// # Dyn Compatibility
///
/// `handle` returns a boxed future so a pipeline can hold its layers as
/// `Box<dyn CommandHandler<C>>`.
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Handles the command.
    ///
    /// The token is observed while waiting for locks and retry delays. Once a
    /// domain handler has started mutating, it runs to completion.
    ///
    /// # Errors
    ///
    /// Returns the first [`CommandError`] that is not absorbed by a decorator.
    fn handle<'a>(&'a self, command: &'a C, cancel: &'a CancellationToken) -> HandlerFuture<'a>;
}

impl<C: Command, H: CommandHandler<C> + ?Sized> CommandHandler<C> for Box<H> {
    fn handle<'a>(&'a self, command: &'a C, cancel: &'a CancellationToken) -> HandlerFuture<'a> {
        (**self).handle(command, cancel)
    }
}

impl<C: Command, H: CommandHandler<C> + ?Sized> CommandHandler<C> for Arc<H> {
    fn handle<'a>(&'a self, command: &'a C, cancel: &'a CancellationToken) -> HandlerFuture<'a> {
        (**self).handle(command, cancel)
    }
}
