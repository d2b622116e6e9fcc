//! Server-sent event responses driven by a [`StreamEmitter`].

use axum::response::{
    sse::{Event, KeepAlive, Sse},
    IntoResponse, Response,
};
use futures::StreamExt;
use gateway_core::{Delta, DeltaStream, GatewayResult};
use gateway_protocols::{FrameWriter, ProtocolEvent, StreamEmitter};
use std::convert::Infallible;
use tracing::{debug, warn};

fn to_event<E: ProtocolEvent>(event: &E) -> Event {
    let frame = event.frame();
    let sse = Event::default().data(frame.data);
    match frame.event {
        Some(name) => sse.event(name),
        None => sse,
    }
}

/// Wait for the first delta so that failures before any output can still be
/// reported with an HTTP status instead of an in-stream error event.
///
/// # Errors
/// Returns the error raised before the first delta
pub async fn first_delta(mut deltas: DeltaStream) -> GatewayResult<(Option<Delta>, DeltaStream)> {
    match deltas.next().await {
        Some(Ok(delta)) => Ok((Some(delta), deltas)),
        Some(Err(e)) => Err(e),
        None => Ok((None, deltas)),
    }
}

/// Stream a completion as SSE through `emitter`
///
/// Mid-stream errors become the protocol's error event and end the stream.
pub fn respond<W>(first: Option<Delta>, mut deltas: DeltaStream, mut emitter: StreamEmitter<W>) -> Response
where
    W: FrameWriter + Send + 'static,
    W::Event: Send,
{
    let events = async_stream::stream! {
        if let Some(delta) = first {
            for event in emitter.push(delta) {
                yield Ok::<_, Infallible>(to_event(&event));
            }
        }

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    for event in emitter.push(delta) {
                        yield Ok(to_event(&event));
                    }
                }
                Err(e) => {
                    warn!(response = %emitter.meta().id, error = %e, "Completion failed mid-stream");
                    for event in emitter.fail(&e) {
                        yield Ok(to_event(&event));
                    }
                    return;
                }
            }
        }

        debug!(response = %emitter.meta().id, "Completion streamed");
        for event in emitter.finish() {
            yield Ok(to_event(&event));
        }
    };

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}
