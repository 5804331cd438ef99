//! Incremental delivery of an assistant reply.
//!
//! The backend answers in one piece; the UI wants it typed out. A
//! [`ReplyStream`] yields cumulative [`ReplyChunk`]s one character at a time
//! with a fixed delay between them, and can be cancelled at any point
//! through its [`AbortHandle`].

use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::stream::{self, AbortHandle, Abortable, LocalBoxStream, Stream, StreamExt};
use serde::Serialize;

use counsel_types::event::ClientEvent;

use crate::event_bus::EventBus;
use crate::ports::TimerPort;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyChunk {
    /// Everything delivered so far, not just the newest character
    pub content: String,
    pub is_complete: bool,
}

/// Character-by-character stream over `text`. An empty reply yields a
/// single complete, empty chunk.
pub fn reply_stream(
    text: &str,
    timer: Rc<dyn TimerPort>,
    delay_ms: u64,
) -> LocalBoxStream<'static, ReplyChunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return stream::iter([ReplyChunk {
            content: String::new(),
            is_complete: true,
        }])
        .boxed_local();
    }

    stream::unfold((chars, 0usize, String::new()), move |(chars, index, mut content)| {
        let timer = timer.clone();
        async move {
            if index >= chars.len() {
                return None;
            }
            if index > 0 && delay_ms > 0 {
                timer.sleep(delay_ms).await;
            }
            content.push(chars[index]);
            let chunk = ReplyChunk {
                content: content.clone(),
                is_complete: index + 1 == chars.len(),
            };
            Some((chunk, (chars, index + 1, content)))
        }
    })
    .boxed_local()
}

pub struct ReplyStream {
    inner: Abortable<LocalBoxStream<'static, ReplyChunk>>,
    handle: AbortHandle,
}

impl ReplyStream {
    pub fn new(text: &str, timer: Rc<dyn TimerPort>, delay_ms: u64) -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            inner: Abortable::new(reply_stream(text, timer, delay_ms), registration),
            handle,
        }
    }

    /// Handle that ends the stream at its next poll.
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Publish every chunk on `events`. Returns the full reply, or `None` if
    /// the stream was aborted first.
    pub async fn drain_into(mut self, events: &EventBus) -> Option<String> {
        while let Some(chunk) = self.next().await {
            if chunk.is_complete {
                events.emit(ClientEvent::ReplyComplete {
                    content: chunk.content.clone(),
                });
                return Some(chunk.content);
            }
            events.emit(ClientEvent::ReplyDelta {
                content: chunk.content,
            });
        }
        log::debug!("Reply stream aborted");
        None
    }
}

impl Stream for ReplyStream {
    type Item = ReplyChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ReplyChunk>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
