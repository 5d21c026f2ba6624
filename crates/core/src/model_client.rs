use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use techflow_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type DeltaFn = Box<dyn Fn(&str) + Send + Sync + 'static>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, DeltaFn) -> BoxedSendRequestFuture + Send + Sync
>;

/// A provider behind a type-erased handler, so the clients can hold any
/// [`ModelProvider`] without a generic parameter.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(trace_span!("provider request")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and collects the whole response.
    ///
    /// `on_delta` is called with every piece of text as it arrives.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> SendRequestResult {
        (self.handler_fn)(req, Box::new(on_delta)).await
    }
}

/// A reply collected from all of its events.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// All text deltas, joined.
    pub text: String,
    /// `None` if the stream ended without a `Completed` event.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: DeltaFn,
) -> SendRequestResult {
    let resp = resp_or_err.map_err(|err| {
        error!("request failed: {err:?}");
        Box::new(err) as Box<dyn ModelProviderError>
    })?;

    let mut collected = ModelClientResponse {
        text: String::new(),
        finish_reason: None,
    };
    let mut resp = pin!(resp);

    trace!("receiving reply");
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .map_err(|err| {
            error!("reply interrupted: {err:?}");
            Box::new(err) as Box<dyn ModelProviderError>
        })?
    {
        trace!("reply event: {event:?}");
        match event {
            ModelResponseEvent::TextDelta(delta) => {
                on_delta(&delta);
                collected.text.push_str(&delta);
            }
            ModelResponseEvent::Completed(reason) => {
                collected.finish_reason = Some(reason);
            }
        }
    }
    trace!("reply received, {} bytes", collected.text.len());

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use techflow_model::ErrorKind;
    use techflow_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::TextDelta("How ".to_owned()),
                PresetEvent::TextDelta("are ".to_owned()),
                PresetEvent::TextDelta("you?".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider.clone());

        for _ in 0..3 {
            let deltas = Arc::new(Mutex::new(Vec::new()));
            let resp = model_client
                .send_request(ModelRequest::with_prompt("Hi"), {
                    let deltas = Arc::clone(&deltas);
                    move |delta| {
                        deltas.lock().unwrap().push(delta.to_owned());
                    }
                })
                .await
                .unwrap();
            assert_eq!(resp.text, "How are you?");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert_eq!(deltas.lock().unwrap().len(), 3);
        }
        assert_eq!(model_provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(ModelRequest::with_prompt("Hi"), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
