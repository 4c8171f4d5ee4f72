//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Pending request table correlating replies with waiting callers."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::envelope::Message;
use crate::{MessagingError, Result};

type Outcome = Result<Box<dyn Message>>;

/// Correlation id to waiting caller.
///
/// Each entry is removed exactly once, by whichever of reply delivery,
/// cancellation, timeout or dropping the [`PendingReply`] claims it first.
/// The waiter is notified after the lock has been released.
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: AtomicI64,
    last_token: AtomicU64,
    waiters: Mutex<HashMap<i64, Waiter>>,
}

struct Waiter {
    token: u64,
    issued_at: Instant,
    sender: oneshot::Sender<Outcome>,
}

impl PendingRequests {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh correlation id. Ids start at 1.
    pub fn next_request_id(&self) -> i64 {
        self.inner.last_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Start waiting for the reply to `request_id`.
    pub fn register(&self, request_id: i64) -> Result<PendingReply> {
        let (sender, receiver) = oneshot::channel();
        let issued_at = Instant::now();
        let token = self.inner.last_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut waiters = self.inner.waiters.lock();
            if waiters.contains_key(&request_id) {
                return Err(MessagingError::DuplicateRequestId(request_id));
            }
            waiters.insert(
                request_id,
                Waiter {
                    token,
                    issued_at,
                    sender,
                },
            );
        }
        Ok(PendingReply {
            request_id,
            token,
            issued_at,
            receiver,
            table: self.clone(),
        })
    }

    /// Deliver a reply to the caller waiting on its correlation id.
    ///
    /// Returns the correlation id on success. A reply nobody is waiting for
    /// is reported as [`MessagingError::OrphanReply`].
    pub fn complete(&self, reply: Box<dyn Message>) -> Result<i64> {
        self.deliver(reply).map(|(request_id, _)| request_id)
    }

    /// Like [`PendingRequests::complete`], also reporting how long the request waited.
    pub(crate) fn deliver(&self, reply: Box<dyn Message>) -> Result<(i64, Duration)> {
        let message_type = reply.message_type();
        let request_id = reply
            .as_reply()
            .ok_or(MessagingError::NotAReply(message_type))?
            .request_id()?
            .ok_or(MessagingError::MissingRequestId(message_type))?;

        let Some(waiter) = self.claim(request_id) else {
            return Err(MessagingError::OrphanReply {
                request_id,
                message_type,
            });
        };
        let latency = waiter.issued_at.elapsed();
        if waiter.sender.send(Ok(reply)).is_err() {
            debug!(request_id, "reply arrived after the caller stopped waiting");
        }
        Ok((request_id, latency))
    }

    /// Release the caller waiting on `request_id` with a cancellation.
    ///
    /// Returns `false` when the request already completed or never existed.
    pub fn cancel(&self, request_id: i64) -> bool {
        self.resolve(request_id, MessagingError::Cancelled { request_id })
    }

    /// Release the caller waiting on `request_id` with a timeout.
    pub fn expire(&self, request_id: i64) -> bool {
        self.resolve(request_id, MessagingError::TimedOut { request_id })
    }

    /// Cancel every pending request, e.g. on shutdown. Returns how many were released.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.inner.waiters.lock().drain().collect();
        let count = drained.len();
        for (request_id, waiter) in drained {
            let _ = waiter.sender.send(Err(MessagingError::Cancelled { request_id }));
        }
        count
    }

    /// Drop the entry registered under `token`, leaving a later registration
    /// that reuses `request_id` alone.
    fn forget_registration(&self, request_id: i64, token: u64) {
        let mut waiters = self.inner.waiters.lock();
        if waiters.get(&request_id).is_some_and(|w| w.token == token) {
            waiters.remove(&request_id);
            debug!(request_id, "caller stopped waiting");
        }
    }

    /// Whether `request_id` is still waiting.
    pub fn contains(&self, request_id: i64) -> bool {
        self.inner.waiters.lock().contains_key(&request_id)
    }

    /// Number of requests in flight.
    pub fn len(&self) -> usize {
        self.inner.waiters.lock().len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim(&self, request_id: i64) -> Option<Waiter> {
        self.inner.waiters.lock().remove(&request_id)
    }

    fn resolve(&self, request_id: i64, error: MessagingError) -> bool {
        match self.claim(request_id) {
            Some(waiter) => {
                let _ = waiter.sender.send(Err(error));
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequests")
            .field("in_flight", &self.len())
            .finish()
    }
}

/// Handle held by the caller of an in-flight request.
///
/// Dropping the handle withdraws the request; a reply arriving afterwards is
/// an orphan.
#[derive(Debug)]
pub struct PendingReply {
    request_id: i64,
    token: u64,
    issued_at: Instant,
    receiver: oneshot::Receiver<Outcome>,
    table: PendingRequests,
}

impl PendingReply {
    /// Correlation id being waited on.
    pub fn request_id(&self) -> i64 {
        self.request_id
    }

    /// Time since the request was registered.
    pub fn elapsed(&self) -> Duration {
        self.issued_at.elapsed()
    }

    /// Wait for the reply, a cancellation, or an external expiry.
    pub async fn wait(mut self) -> Result<Box<dyn Message>> {
        let request_id = self.request_id;
        (&mut self.receiver)
            .await
            .unwrap_or(Err(MessagingError::Cancelled { request_id }))
    }

    /// Wait at most `timeout`.
    ///
    /// On expiry the entry is claimed for the timeout; if a reply claimed it
    /// first, that reply is returned instead.
    pub async fn wait_timeout(mut self, timeout: Duration) -> Result<Box<dyn Message>> {
        let request_id = self.request_id;
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(outcome) => outcome.unwrap_or(Err(MessagingError::Cancelled { request_id })),
            Err(_) => {
                self.table.expire(request_id);
                (&mut self.receiver)
                    .await
                    .unwrap_or(Err(MessagingError::TimedOut { request_id }))
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.table.forget_registration(self.request_id, self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{EchoReply, EchoRequest};

    fn reply_for(request_id: i64) -> Box<dyn Message> {
        let mut reply = EchoReply::new();
        reply.reply_mut().set_request_id(Some(request_id));
        Box::new(reply)
    }

    #[tokio::test]
    async fn reply_is_delivered_to_its_caller() {
        let table = PendingRequests::new();
        let id = table.next_request_id();
        let pending = table.register(id).unwrap();

        assert_eq!(table.complete(reply_for(id)).unwrap(), id);
        let reply = pending.wait().await.unwrap();
        assert_eq!(reply.as_reply().unwrap().request_id().unwrap(), Some(id));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn second_reply_for_same_id_is_an_orphan() {
        let table = PendingRequests::new();
        let pending = table.register(5).unwrap();
        table.complete(reply_for(5)).unwrap();
        assert!(matches!(
            table.complete(reply_for(5)),
            Err(MessagingError::OrphanReply { request_id: 5, .. })
        ));
        assert!(pending.wait().await.is_ok());
    }

    #[test]
    fn unknown_id_is_an_orphan() {
        let table = PendingRequests::new();
        assert!(matches!(
            table.complete(reply_for(99)),
            Err(MessagingError::OrphanReply { request_id: 99, .. })
        ));
    }

    #[test]
    fn requests_and_id_less_replies_are_rejected() {
        let table = PendingRequests::new();
        assert!(matches!(
            table.complete(Box::new(EchoRequest::new())),
            Err(MessagingError::NotAReply(_))
        ));
        assert!(matches!(
            table.complete(Box::new(EchoReply::new())),
            Err(MessagingError::MissingRequestId(_))
        ));
    }

    #[test]
    fn duplicate_in_flight_id_is_rejected() {
        let table = PendingRequests::new();
        let _pending = table.register(1).unwrap();
        assert!(matches!(
            table.register(1),
            Err(MessagingError::DuplicateRequestId(1))
        ));
    }

    #[tokio::test]
    async fn cancel_releases_waiter_once() {
        let table = PendingRequests::new();
        let pending = table.register(3).unwrap();
        assert!(table.cancel(3));
        assert!(!table.cancel(3));
        assert!(matches!(
            table.complete(reply_for(3)),
            Err(MessagingError::OrphanReply { .. })
        ));
        assert!(matches!(
            pending.wait().await,
            Err(MessagingError::Cancelled { request_id: 3 })
        ));
    }

    #[tokio::test]
    async fn timeout_loses_to_an_earlier_reply() {
        let table = PendingRequests::new();
        let pending = table.register(8).unwrap();
        table.complete(reply_for(8)).unwrap();
        let reply = pending.wait_timeout(Duration::from_millis(1)).await;
        assert!(reply.is_ok());
    }

    #[tokio::test]
    async fn timeout_claims_unanswered_request() {
        let table = PendingRequests::new();
        let pending = table.register(9).unwrap();
        assert!(matches!(
            pending.wait_timeout(Duration::from_millis(5)).await,
            Err(MessagingError::TimedOut { request_id: 9 })
        ));
        assert!(!table.contains(9));
        assert!(matches!(
            table.complete(reply_for(9)),
            Err(MessagingError::OrphanReply { .. })
        ));
    }

    #[tokio::test]
    async fn cancel_all_drains_the_table() {
        let table = PendingRequests::new();
        let a = table.register(1).unwrap();
        let b = table.register(2).unwrap();
        assert_eq!(table.cancel_all(), 2);
        assert!(a.wait().await.is_err());
        assert!(matches!(
            b.wait().await,
            Err(MessagingError::Cancelled { request_id: 2 })
        ));
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let table = PendingRequests::new();
        let ids: Vec<_> = (0..4).map(|_| table.next_request_id()).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
    }

    #[test]
    fn dropped_handles_leave_no_entries() {
        let table = PendingRequests::new();
        for _ in 0..1000 {
            let pending = table.register(table.next_request_id()).unwrap();
            drop(pending);
        }
        assert!(table.is_empty());
    }

    #[test]
    fn reply_after_handle_dropped_is_an_orphan() {
        let table = PendingRequests::new();
        drop(table.register(4).unwrap());
        assert!(matches!(
            table.complete(reply_for(4)),
            Err(MessagingError::OrphanReply { request_id: 4, .. })
        ));
    }

    #[tokio::test]
    async fn stale_handle_does_not_withdraw_a_reused_id() {
        let table = PendingRequests::new();
        let stale = table.register(6).unwrap();
        assert!(table.cancel(6));
        let fresh = table.register(6).unwrap();

        drop(stale);
        assert!(table.contains(6));
        table.complete(reply_for(6)).unwrap();
        assert!(fresh.wait().await.is_ok());
    }
}
