use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use techflow_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::GenerateContentResponse;

struct PartialState {
    sse: Sse,
    response_id: Option<String>,
    // Set when a chunk carries both text and a finish reason. The text is
    // emitted first, and the finish reason on the next poll.
    pending_finish_reason: Option<ModelFinishReason>,
    completed: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            response_id: None,
            pending_finish_reason: None,
            completed: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        partial_state.completed = true;
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        let mut chunk =
            serde_json::from_str::<GenerateContentResponse>(&sse_event)
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(err) = chunk.error.take() {
            return Err(err.into());
        }
        if let Some(id) = &chunk.response_id {
            if partial_state.response_id.get_or_insert_with(|| id.clone()) != id
            {
                return Err(Error::new(
                    "response id mismatch",
                    ErrorKind::Other,
                ));
            }
        }

        if partial_state.completed {
            // Nothing follows `Completed`. Trailing chunks (usage metadata)
            // may still arrive and are dropped.
            trace!("dropping chunk after completion");
            continue;
        }

        match (chunk.text(), chunk.finish_reason()) {
            (Some(text), reason) => {
                partial_state.pending_finish_reason = reason;
                return Ok((
                    Some(ModelResponseEvent::TextDelta(text)),
                    partial_state,
                ));
            }
            (None, Some(reason)) => {
                partial_state.completed = true;
                return Ok((
                    Some(ModelResponseEvent::Completed(reason)),
                    partial_state,
                ));
            }
            (None, None) => continue,
        }
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use techflow_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        chunks: Vec<Bytes>,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = pin!(GeminiResponse::from_sse(sse));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        // Polling after completion keeps returning `None`.
        assert!(
            poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await?
                .is_none()
        );
        Ok(events)
    }

    #[tokio::test]
    async fn test_simple_events() {
        let events = collect_events(vec![Bytes::from_static(include_bytes!(
            "../fixtures/test_response.txt"
        ))])
        .await
        .unwrap();

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            text,
            "Hold the Power button for 5 seconds to restart your X-2000."
        );
        assert_eq!(
            events.last(),
            Some(&ModelResponseEvent::Completed(ModelFinishReason::Stop))
        );
        let completed = events
            .iter()
            .filter(|e| matches!(e, ModelResponseEvent::Completed(_)))
            .count();
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_nothing_after_completed() {
        let events = collect_events(vec![Bytes::from_static(
            b"data: {\"candidates\": [{\"content\": {\"parts\": []}, \
              \"finishReason\": \"STOP\"}]}\n\n\
              data: {\"candidates\": [{\"content\": {\"parts\": \
              [{\"text\": \"late\"}]}, \"finishReason\": \"STOP\"}]}\n\n",
        )])
        .await
        .unwrap();
        assert_eq!(
            events,
            vec![ModelResponseEvent::Completed(ModelFinishReason::Stop)]
        );
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let events = collect_events(vec![Bytes::from_static(
            b"data: {\"promptFeedback\": {\"blockReason\": \"SAFETY\"}}\r\n\r\n",
        )])
        .await
        .unwrap();
        assert_eq!(
            events,
            vec![ModelResponseEvent::Completed(ModelFinishReason::Blocked)]
        );
    }

    #[tokio::test]
    async fn test_error_chunk() {
        let err = collect_events(vec![Bytes::from_static(
            b"data: {\"error\": {\"code\": 429, \"status\": \"RESOURCE_EXHAUSTED\"}}\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }

    #[tokio::test]
    async fn test_invalid_chunk() {
        let err = collect_events(vec![Bytes::from_static(b"data: {oops\n\n")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
