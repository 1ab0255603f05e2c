//! Cancellable event streams returned by advertise and scan

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use log::debug;

use crate::bluetooth::types::{AdvertiseResponse, ScanningResponse};

type BoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;
type CancelHook = Box<dyn FnOnce() + Send>;

/// A lazy stream owned by the role that started it
///
/// The stream yields events until it is cancelled. Cancelling drops the
/// underlying stream and runs the release hook exactly once; further
/// cancels are no-ops. Dropping the stream cancels it.
pub struct CancellableStream<T> {
    label: &'static str,
    inner: Option<BoxedStream<T>>,
    on_cancel: Option<CancelHook>,
}

/// Stream of connection events on an advertising set
pub type AdvertiseStream = CancellableStream<AdvertiseResponse>;

/// Stream of observed advertisements
pub type ScanStream = CancellableStream<ScanningResponse>;

impl<T> CancellableStream<T> {
    /// Wrap a stream with a release hook
    pub fn new<S, F>(label: &'static str, stream: S, on_cancel: F) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self {
            label,
            inner: Some(Box::pin(stream)),
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Wrap a stream that holds no external resources
    pub fn from_stream<S>(label: &'static str, stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::new(label, stream, || {})
    }

    /// Wait for the next event; `None` once cancelled or exhausted
    pub async fn next_event(&mut self) -> Option<T> {
        match self.inner.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    /// Release the stream
    pub fn cancel(&mut self) {
        if self.inner.take().is_some() {
            debug!("Cancelled {} stream", self.label);
        }
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_none()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T> Stream for CancellableStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.inner.as_mut() {
            Some(stream) => stream.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl<T> Drop for CancellableStream<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> std::fmt::Debug for CancellableStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellableStream")
            .field("label", &self.label)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
