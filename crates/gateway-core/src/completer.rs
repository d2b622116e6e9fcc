//! The completion contract shared by backends and routers.

use crate::accumulator::Accumulator;
use crate::delta::Delta;
use crate::error::GatewayResult;
use crate::message::Message;
use crate::options::CompleteOptions;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;

/// Lazy, single-consumption sequence of deltas.
///
/// An `Err` item ends the sequence; nothing follows it.
pub type DeltaStream = BoxStream<'static, GatewayResult<Delta>>;

/// Anything that turns a conversation into a stream of deltas.
///
/// Implementations must not do any work before the returned stream is first
/// polled. Routers implement this trait too, so they nest.
pub trait Completer: Send + Sync {
    /// Start a completion
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream;
}

impl<T: Completer + ?Sized> Completer for Arc<T> {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        (**self).complete(messages, options)
    }
}

impl<T: Completer + ?Sized> Completer for Box<T> {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        (**self).complete(messages, options)
    }
}

/// Drive a completion to its end and return the accumulated result.
///
/// The stream callback in `options`, if any, sees every delta first; an error
/// from it aborts the completion.
///
/// # Errors
/// Returns the first error raised by the completer or the callback
pub async fn complete_to_end<C>(
    completer: &C,
    messages: Vec<Message>,
    options: CompleteOptions,
) -> GatewayResult<Delta>
where
    C: Completer + ?Sized,
{
    let handler = options.stream.clone();
    let mut stream = completer.complete(messages, options);
    let mut acc = Accumulator::new();

    while let Some(item) = stream.next().await {
        let delta = item?;
        if let Some(handler) = handler.as_ref() {
            handler(&delta)?;
        }
        acc.add(&delta);
    }

    Ok(acc.result())
}
