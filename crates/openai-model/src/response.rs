use std::pin::Pin;
use std::task::{Context, Poll, ready};

use math_assistant_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::io::Sse;
use crate::proto::{self, ChatCompletionChunk};
use crate::Error;

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Cleared once the completed event has been returned.
    pending_finish_reason: Option<ModelFinishReason>,
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streaming completion from [`crate::OpenAIProvider`].
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            pending_finish_reason: None,
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
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

        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));
        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    while !partial_state.finished {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            break;
        }

        let chunk = match serde_json::from_str::<ChatCompletionChunk>(&sse_event)
        {
            Ok(chunk) => chunk,
            Err(err) => {
                let message = proto::error_message(&sse_event)
                    .unwrap_or_else(|| format!("{err}"));
                return Err(Error::new(message, ErrorKind::Other));
            }
        };
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // The trailing usage chunk carries no choices.
        let Some(choice) = chunk.choices.into_iter().next() else {
            continue;
        };

        if let Some(finish_reason) = choice.finish_reason {
            partial_state.finished = true;
            partial_state.pending_finish_reason = Some(match finish_reason.as_str() {
                "length" => ModelFinishReason::Length,
                _ => ModelFinishReason::Stop,
            });
        }

        // A delta may arrive in the same chunk as the finish reason, so the
        // delta goes out first and the completed event on the next poll.
        match choice.delta.content {
            Some(content) if !content.is_empty() => {
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(content)),
                    partial_state,
                ));
            }
            _ => {}
        }

        if let Some(finish_reason) = partial_state.pending_finish_reason.take()
        {
            return Ok((
                Some(ModelResponseEvent::Completed(finish_reason)),
                partial_state,
            ));
        }
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: &[&'static [u8]],
    ) -> Result<(String, Vec<ModelFinishReason>), Error> {
        let chunks = chunks.iter().map(|&c| Bytes::from_static(c));
        let sse = Sse::new(Chunks::from_buffered(chunks));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let mut text = String::new();
        let mut reasons = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => {
                    text.push_str(&delta)
                }
                ModelResponseEvent::Completed(reason) => reasons.push(reason),
            }
        }
        Ok((text, reasons))
    }

    #[tokio::test]
    async fn test_fixture_stream() {
        let (text, reasons) =
            collect(&[include_bytes!("../fixtures/test_response.txt")])
                .await
                .unwrap();
        assert_eq!(
            text,
            "Thought: I need to calculate this.\nAction: Calculator\nAction Input: 37593 * 67"
        );
        assert_eq!(reasons, vec![ModelFinishReason::Stop]);
    }

    #[tokio::test]
    async fn test_delta_with_finish_reason() {
        let (text, reasons) = collect(&[
            b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"4\"},\"finish_reason\":\"length\"}]}\n\n",
            b"data: [DONE]\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(text, "4");
        assert_eq!(reasons, vec![ModelFinishReason::Length]);
    }

    #[tokio::test]
    async fn test_error_event() {
        let err = collect(&[
            b"data: {\"error\":{\"message\":\"model overloaded\"}}\n\n",
        ])
        .await
        .unwrap_err();
        assert_eq!(err.message(), "model overloaded");
    }

    #[tokio::test]
    async fn test_id_mismatch() {
        let err = collect(&[
            b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"x\"},\"finish_reason\":null}]}\n\n",
            b"data: {\"id\":\"b\",\"choices\":[{\"delta\":{\"content\":\"y\"},\"finish_reason\":null}]}\n\n",
        ])
        .await
        .unwrap_err();
        assert_eq!(err.message(), "chunk id mismatch");
    }
}
