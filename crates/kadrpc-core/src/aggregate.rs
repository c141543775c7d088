//! DHT-level "put future" aggregation (§4.8).
//!
//! A DHT PUT fans out up to `R` per-peer RPCs concurrently after routing.
//! This module correlates their individual completions into one logical
//! result: `minReached` against a configured threshold, a join primitive
//! that waits for every outstanding RPC to finish or be cancelled,
//! idempotent cancellation, and a retained handle to the routing future
//! that preceded the fan-out.
//!
//! Cancellation is modeled as a token propagated to every outstanding send
//! (§9 "Aggregation future cancellation") via an atomic flag plus a
//! [`tokio::sync::Notify`] rather than an external lock, and per-peer
//! completions arrive over an `mpsc` channel rather than shared mutable
//! state.

use crate::key::Number480;
use crate::key::Number160;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// One per-peer RPC's outcome, sent over the completion channel as each
/// fan-out send resolves.
pub enum PeerCompletion {
    /// The peer acknowledged storing this set of `(loc, dom, content)` keys.
    Success { peer: Number160, stored: HashSet<Number480> },
    /// The RPC failed or timed out (§5 "Timeouts"): counts toward the
    /// aggregate's `min` arithmetic as a non-success.
    Failure { peer: Number160 },
}

/// Shared cancellation handle. Cloning shares the same underlying flag;
/// cancelling through any clone cancels all of them.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    fn new() -> Self {
        CancelHandle { cancelled: Arc::new(AtomicBool::new(false)), notify: Arc::new(Notify::new()) }
    }

    /// Cancel all still-pending per-peer operations. Idempotent; a second
    /// call after the first (or after the aggregate has already reached a
    /// terminal state) is a no-op.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The aggregate's terminal outcome (§4.8): `OK` iff `minReached`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalOutcome {
    Ok,
    Failed,
}

/// The joined result of a DHT PUT fan-out.
pub struct AggregateResult {
    pub outcome: TerminalOutcome,
    pub min_reached: bool,
    /// Peers that acknowledged storage, each with the keys they stored.
    pub successful_peers: Vec<(Number160, HashSet<Number480>)>,
    /// `true` if the join returned early because of cancellation rather
    /// than every per-peer RPC resolving.
    pub cancelled: bool,
}

/// Correlates per-peer completions for one logical DHT PUT.
///
/// Holds an opaque handle to the routing future that preceded this
/// aggregation (§4.8) — routing itself is out of scope for this core (§1),
/// so `R` is whatever handle the caller's routing layer hands back; this
/// type only retains it so a caller can later inspect which peers were
/// contacted, without this crate needing to know routing's shape.
pub struct PutFutureAggregate<R> {
    min: usize,
    routing_future: R,
}

impl<R> PutFutureAggregate<R> {
    /// `min` is the configured minimum number of successful peers for
    /// `minReached` to hold. `routing_future` is the caller's handle to the
    /// routing lookup that produced the peer set being fanned out to.
    pub fn new(min: usize, routing_future: R) -> (Self, CancelHandle) {
        (PutFutureAggregate { min, routing_future }, CancelHandle::new())
    }

    /// The routing future that preceded this aggregation (§4.8).
    pub fn routing_future(&self) -> &R {
        &self.routing_future
    }

    /// Waits until every one of `total` outstanding per-peer RPCs is either
    /// complete or cancellation has been requested (§4.8 "join primitive").
    /// Cancellation after a terminal state has already been reached by this
    /// call is moot — `join` only runs once per aggregate.
    pub async fn join(
        &self,
        total: usize,
        mut completions: mpsc::Receiver<PeerCompletion>,
        cancel: &CancelHandle,
    ) -> AggregateResult {
        let mut successful_peers = Vec::new();
        let mut completed = 0usize;
        let mut cancelled = false;

        while completed < total {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            tokio::select! {
                _ = cancel.notify.notified() => {
                    cancelled = true;
                    break;
                }
                maybe = completions.recv() => {
                    match maybe {
                        Some(PeerCompletion::Success { peer, stored }) => {
                            successful_peers.push((peer, stored));
                            completed += 1;
                        }
                        Some(PeerCompletion::Failure { .. }) => {
                            completed += 1;
                        }
                        None => break,
                    }
                }
            }
        }

        let min_reached = successful_peers.len() >= self.min;
        let outcome = if min_reached { TerminalOutcome::Ok } else { TerminalOutcome::Failed };
        AggregateResult { outcome, min_reached, successful_peers, cancelled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(b: u8) -> Number160 {
        Number160::from_bytes([b; 20])
    }

    #[tokio::test]
    async fn min_reached_when_enough_peers_succeed() {
        let (aggregate, cancel) = PutFutureAggregate::new(2, "routing-handle");
        let (tx, rx) = mpsc::channel(4);
        tx.send(PeerCompletion::Success { peer: peer(1), stored: HashSet::new() }).await.expect("test");
        tx.send(PeerCompletion::Success { peer: peer(2), stored: HashSet::new() }).await.expect("test");
        tx.send(PeerCompletion::Failure { peer: peer(3) }).await.expect("test");
        drop(tx);

        let result = aggregate.join(3, rx, &cancel).await;
        assert_eq!(result.outcome, TerminalOutcome::Ok);
        assert!(result.min_reached);
        assert_eq!(result.successful_peers.len(), 2);
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn failed_when_shortfall_against_min() {
        let (aggregate, cancel) = PutFutureAggregate::new(3, "routing-handle");
        let (tx, rx) = mpsc::channel(4);
        tx.send(PeerCompletion::Success { peer: peer(1), stored: HashSet::new() }).await.expect("test");
        tx.send(PeerCompletion::Failure { peer: peer(2) }).await.expect("test");
        drop(tx);

        let result = aggregate.join(2, rx, &cancel).await;
        assert_eq!(result.outcome, TerminalOutcome::Failed);
        assert!(!result.min_reached);
    }

    #[tokio::test]
    async fn cancellation_unblocks_join_before_all_peers_complete() {
        let (aggregate, cancel) = PutFutureAggregate::new(1, "routing-handle");
        let (_tx, rx) = mpsc::channel(4);
        let cancel_clone = cancel.clone();
        cancel_clone.cancel();

        let result = aggregate.join(5, rx, &cancel).await;
        assert!(result.cancelled);
    }

    #[test]
    fn aggregate_retains_its_routing_future_handle() {
        let (aggregate, _cancel) = PutFutureAggregate::new(1, vec![peer(1), peer(2)]);
        assert_eq!(aggregate.routing_future(), &vec![peer(1), peer(2)]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        cancel.cancel();
        assert!(cancel.is_cancelled());
    }
}
