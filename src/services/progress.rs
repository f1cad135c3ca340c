use crate::models::ProgressEvent;
use crate::services::notifier::{NotificationChannel, NotifyError, ON_UPLOAD_EVENT};
use crate::services::throttle::{Clock, ThrottleState};
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Counts the bytes of one file and publishes throttled progress to its session room.
pub struct ProgressMeter {
    file_name: String,
    channel: Arc<dyn NotificationChannel>,
    session_id: Option<String>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    throttle: ThrottleState,
    processed: u64,
}

impl ProgressMeter {
    /// The throttle window starts now, not at the first chunk.
    pub fn new(
        file_name: impl Into<String>,
        channel: Arc<dyn NotificationChannel>,
        session_id: Option<String>,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let throttle = ThrottleState::new(clock.now());
        Self {
            file_name: file_name.into(),
            channel,
            session_id,
            interval,
            clock,
            throttle,
            processed: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Accounts for a chunk and emits an event if the throttle window allows it.
    pub fn observe(&mut self, chunk_len: usize) {
        self.processed += chunk_len as u64;

        if !self.throttle.try_emit(self.clock.now(), self.interval) {
            return;
        }

        let Some(room) = self.session_id.as_deref() else {
            tracing::trace!(
                "{}: {} bytes processed, no session to notify",
                self.file_name,
                self.processed
            );
            return;
        };

        let event = ProgressEvent {
            processed_already: self.processed,
            filename: self.file_name.clone(),
        };

        // Progress delivery is best-effort; the upload carries on regardless
        let published = serde_json::to_value(&event)
            .map_err(NotifyError::from)
            .and_then(|payload| self.channel.publish(room, ON_UPLOAD_EVENT, payload));
        if let Err(e) = published {
            tracing::debug!("Progress event for {} dropped: {}", self.file_name, e);
        }
    }
}

/// Pass-through stream stage that feeds every chunk's length into a [`ProgressMeter`].
///
/// Chunks and errors are forwarded untouched and in order; nothing is buffered.
pub struct ProgressTransform<S> {
    inner: S,
    meter: ProgressMeter,
}

impl<S> ProgressTransform<S> {
    pub fn new(inner: S, meter: ProgressMeter) -> Self {
        Self { inner, meter }
    }

    pub fn meter(&self) -> &ProgressMeter {
        &self.meter
    }
}

impl<S, E> Stream for ProgressTransform<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.meter.observe(chunk.len());
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
