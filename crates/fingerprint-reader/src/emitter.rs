//! Serialized status notifications.
//!
//! All status events and capture results leave the reader through one
//! notification task. Publishers on any thread (caller, device worker, timer)
//! only enqueue; the task delivers in enqueue order to whichever subscriber is
//! current when the item is reached. Because results travel through the same
//! queue, a capture's terminal status is always observed before its result.
//!
//! ```text
//! caller ──┐
//! worker ──┼──► notification queue ──► notification task ──► subscriber
//! timer  ──┘                                     └──────────► result futures
//! ```

use fingerprint_core::StatusEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Work item for the notification task.
enum Notification {
    Publish(StatusEvent),
    Subscribe(Option<mpsc::UnboundedSender<StatusEvent>>),
    Deliver(Box<dyn FnOnce() + Send>),
}

/// Handle to the notification context.
///
/// Cheap to clone. The task exits once every clone is dropped.
#[derive(Clone)]
pub struct StatusEmitter {
    tx: mpsc::UnboundedSender<Notification>,
}

impl StatusEmitter {
    /// Spawn the notification task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self { tx }
    }

    /// Queue an event for the current subscriber. Never blocks.
    ///
    /// Events published while nobody is subscribed are dropped.
    pub fn publish(&self, event: StatusEvent) {
        self.send(Notification::Publish(event));
    }

    /// Register a new subscriber, replacing (and ending) the previous one.
    pub fn subscribe(&self) -> StatusStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(Notification::Subscribe(Some(tx)));
        StatusStream { rx }
    }

    /// Drop the current subscriber, ending its stream.
    pub fn unsubscribe(&self) {
        self.send(Notification::Subscribe(None));
    }

    /// Complete `reply` from the notification context, after everything
    /// published before this call.
    pub(crate) fn deliver<T: Send + 'static>(&self, reply: oneshot::Sender<T>, value: T) {
        self.send(Notification::Deliver(Box::new(move || {
            // The caller may have stopped waiting.
            let _ = reply.send(value);
        })));
    }

    fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification task gone, dropping item");
        }
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Notification>) {
    let mut subscriber: Option<mpsc::UnboundedSender<StatusEvent>> = None;

    while let Some(notification) = rx.recv().await {
        match notification {
            Notification::Publish(event) => {
                let Some(sink) = subscriber.as_ref() else {
                    continue;
                };
                if sink.send(event).is_err() {
                    debug!("Status subscriber went away");
                    subscriber = None;
                }
            }
            Notification::Subscribe(sink) => {
                debug!(subscribed = sink.is_some(), "Status subscriber replaced");
                subscriber = sink;
            }
            Notification::Deliver(complete) => complete(),
        }
    }

    debug!("Notification task stopped");
}

/// Status events for one subscription.
///
/// Ends (yields `None`) when a newer subscription replaces it, on
/// `unsubscribe`, or when the reader is dropped.
#[derive(Debug)]
pub struct StatusStream {
    rx: mpsc::UnboundedReceiver<StatusEvent>,
}

impl StatusStream {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<StatusEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for StatusStream {
    type Item = StatusEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
