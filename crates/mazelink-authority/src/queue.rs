//! Forward queue: an isolated Tokio task that owns the authority link.
//!
//! Connection handlers never talk to the authority directly. They enqueue
//! a request on a bounded channel and carry on; a single worker drains the
//! channel in order and reports each outcome back on a oneshot "reply
//! channel". This is the actor model again: the worker is the only code
//! that ever waits on the authority.
//!
//! Because there is one worker draining one FIFO channel, events enqueued
//! by the same connection reach the authority in the order they were
//! enqueued.
//!
//! The same property means head-of-line blocking: the worker sleeps
//! through one event's retry backoff before it looks at the next, so
//! while the authority is unreachable every queued event waits behind the
//! head, for up to `max_attempts` connect timeouts plus backoff each.
//! Producers feel this as backpressure once the queue is full. Keep
//! `max_attempts` and the forward timeout small when latency matters more
//! than delivery.

use tokio::sync::{mpsc, oneshot};

use crate::{Authority, ForwardError, RetryPolicy};

/// A request handed from a producer to the worker.
struct ForwardRequest {
    event: String,
    reply: oneshot::Sender<Result<(), ForwardError>>,
}

/// The pending outcome of an enqueued event.
///
/// Dropping a `Completion` does not cancel the forward; the worker still
/// delivers (and logs) the event.
#[derive(Debug)]
pub struct Completion {
    reply: oneshot::Receiver<Result<(), ForwardError>>,
}

impl Completion {
    /// Waits until the worker has finished with the event, including any
    /// retries, and returns the final outcome.
    pub async fn wait(self) -> Result<(), ForwardError> {
        self.reply.await.map_err(|_| ForwardError::QueueClosed)?
    }
}

/// Handle to a running forward worker. Cheap to clone.
///
/// The worker stops once every handle has been dropped and the queue has
/// drained.
#[derive(Debug, Clone)]
pub struct ForwardQueue {
    sender: mpsc::Sender<ForwardRequest>,
}

impl ForwardQueue {
    /// Spawns the worker task and returns a handle to it.
    ///
    /// `capacity` bounds the number of queued events (values below 1
    /// behave as 1). When the queue is full, [`submit`](Self::submit)
    /// waits and [`try_submit`](Self::try_submit) fails.
    pub fn spawn<A: Authority>(
        authority: A,
        policy: RetryPolicy,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let worker = ForwardWorker {
            authority,
            policy,
            receiver: rx,
        };
        tokio::spawn(worker.run());

        Self { sender: tx }
    }

    /// Enqueues an event, waiting for queue capacity if necessary.
    ///
    /// Returns as soon as the event is queued; the delivery outcome comes
    /// from the returned [`Completion`].
    ///
    /// # Errors
    /// [`ForwardError::QueueClosed`] if the worker has stopped.
    pub async fn submit(
        &self,
        event: impl Into<String>,
    ) -> Result<Completion, ForwardError> {
        let (request, completion) = request(event.into());
        self.sender
            .send(request)
            .await
            .map_err(|_| ForwardError::QueueClosed)?;
        Ok(completion)
    }

    /// Enqueues an event without waiting. Usable from synchronous code.
    ///
    /// # Errors
    /// - [`ForwardError::QueueFull`] if the queue is at capacity
    /// - [`ForwardError::QueueClosed`] if the worker has stopped
    pub fn try_submit(
        &self,
        event: impl Into<String>,
    ) -> Result<Completion, ForwardError> {
        let (request, completion) = request(event.into());
        self.sender.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ForwardError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ForwardError::QueueClosed,
        })?;
        Ok(completion)
    }
}

fn request(event: String) -> (ForwardRequest, Completion) {
    let (reply_tx, reply_rx) = oneshot::channel();
    (
        ForwardRequest {
            event,
            reply: reply_tx,
        },
        Completion { reply: reply_rx },
    )
}

/// The worker state. Runs inside a Tokio task.
struct ForwardWorker<A: Authority> {
    authority: A,
    policy: RetryPolicy,
    receiver: mpsc::Receiver<ForwardRequest>,
}

impl<A: Authority> ForwardWorker<A> {
    /// Drains requests one at a time until every handle is gone.
    async fn run(mut self) {
        tracing::debug!("forward worker started");

        while let Some(ForwardRequest { event, reply }) =
            self.receiver.recv().await
        {
            let result = self.deliver(&event).await;
            if let Err(e) = &result {
                tracing::warn!(%event, error = %e, "forward to authority failed");
            }
            // The producer may not be waiting for the outcome.
            let _ = reply.send(result);
        }

        tracing::debug!("forward worker stopped");
    }

    /// One event, retried per the policy while failures are retryable.
    async fn deliver(&self, event: &str) -> Result<(), ForwardError> {
        let attempts = self.policy.attempts();
        let mut attempt = 1;
        loop {
            match self.authority.forward(event).await {
                Ok(()) => {
                    tracing::debug!(%event, attempt, "forwarded to authority");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.policy.delay(attempt);
                    tracing::debug!(
                        %event,
                        attempt,
                        ?delay,
                        error = %e,
                        "forward failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Scripted authority: pops one outcome per call and records every
    /// event it was asked to deliver.
    #[derive(Clone, Default)]
    struct ScriptedAuthority {
        outcomes: Arc<Mutex<VecDeque<Result<(), ForwardError>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedAuthority {
        fn with(outcomes: Vec<Result<(), ForwardError>>) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.into())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Authority for ScriptedAuthority {
        async fn forward(&self, event: &str) -> Result<(), ForwardError> {
            self.calls.lock().unwrap().push(event.to_owned());
            self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn refused() -> Result<(), ForwardError> {
        Err(ForwardError::ConnectionRefused {
            addr: "127.0.0.1:8080".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_delivered_in_submit_order() {
        let authority = ScriptedAuthority::default();
        let queue = ForwardQueue::spawn(authority.clone(), RetryPolicy::none(), 8);

        let mut completions = Vec::new();
        for event in ["Bob:connect", "Bob:up", "Bob:left"] {
            completions.push(queue.submit(event).await.unwrap());
        }
        for completion in completions {
            completion.wait().await.unwrap();
        }

        assert_eq!(authority.calls(), ["Bob:connect", "Bob:up", "Bob:left"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failures_are_retried() {
        let authority = ScriptedAuthority::with(vec![refused(), refused(), Ok(())]);
        let queue = ForwardQueue::spawn(authority.clone(), RetryPolicy::default(), 8);

        queue.submit("Bob:up").await.unwrap().wait().await.unwrap();
        assert_eq!(authority.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_stop_at_max_attempts() {
        let authority =
            ScriptedAuthority::with(vec![refused(), refused(), refused(), refused()]);
        let queue = ForwardQueue::spawn(authority.clone(), RetryPolicy::default(), 8);

        let result = queue.submit("Bob:up").await.unwrap().wait().await;
        assert!(matches!(result, Err(ForwardError::ConnectionRefused { .. })));
        assert_eq!(authority.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_events_wait_behind_head_retries() {
        let authority = ScriptedAuthority::with(vec![refused(), refused(), Ok(()), Ok(())]);
        let queue = ForwardQueue::spawn(authority.clone(), RetryPolicy::default(), 8);

        let head = queue.submit("Ann:up").await.unwrap();
        let next = queue.submit("Bob:up").await.unwrap();
        next.wait().await.unwrap();
        head.wait().await.unwrap();

        // Bob's event is attempted only once Ann's retries are done.
        assert_eq!(authority.calls(), ["Ann:up", "Ann:up", "Ann:up", "Bob:up"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_write_is_not_retried() {
        let authority = ScriptedAuthority::with(vec![Err(
            ForwardError::PartialWrite {
                written: 3,
                expected: 6,
            },
        )]);
        let queue = ForwardQueue::spawn(authority.clone(), RetryPolicy::default(), 8);

        let result = queue.submit("Bob:up").await.unwrap().wait().await;
        assert!(matches!(result, Err(ForwardError::PartialWrite { .. })));
        assert_eq!(authority.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_completion_still_delivers() {
        let authority = ScriptedAuthority::default();
        let queue = ForwardQueue::spawn(authority.clone(), RetryPolicy::none(), 8);

        drop(queue.submit("Bob:down").await.unwrap());
        queue.submit("Bob:up").await.unwrap().wait().await.unwrap();

        assert_eq!(authority.calls(), ["Bob:down", "Bob:up"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_submit_reports_full_queue() {
        /// Never finishes a delivery, so the queue cannot drain.
        struct StuckAuthority;

        impl Authority for StuckAuthority {
            async fn forward(&self, _event: &str) -> Result<(), ForwardError> {
                std::future::pending().await
            }
        }

        let queue = ForwardQueue::spawn(StuckAuthority, RetryPolicy::none(), 1);

        // The worker takes the first event and blocks on it; the second
        // fills the single slot.
        let _first = queue.try_submit("a:up").unwrap();
        tokio::task::yield_now().await;
        let _second = queue.try_submit("a:down").unwrap();

        assert!(matches!(
            queue.try_submit("a:left"),
            Err(ForwardError::QueueFull)
        ));
    }
}
