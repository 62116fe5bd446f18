//   Copyright 2024 The Walrus Project
//   SPDX-License-Identifier: BSD-3-Clause

//! The quorum dispatch engine: fans weighted per-node tasks out across a committee, accounts for
//! successes and classified failures by shard weight, and resolves as soon as the outcome is
//! decided.
//!
//! The decision order after every completion is fixed: caller abort, caller success, quorum of
//! authoritative absence, exhaustion of the optimistic upper bound. Completions are processed one
//! at a time on the dispatching task, so accept-then-check is a single critical section and a
//! count-required dispatch accepts exactly the requested number of results.

use std::collections::{HashMap, VecDeque};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use log::*;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use walrus_common_types::is_quorum_weight;
use walrus_storage_node_client::StorageNodeClientError;

const LOG_TARGET: &str = "walrus::client::dispatch";

/// Aggregate classification of a node failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The node authoritatively does not have the object.
    NotFound,
    /// The node refuses to serve the object.
    Blocked,
    /// The caller's cancellation reached the node call.
    Aborted,
    /// Transient transport or node trouble.
    Other,
}

pub fn classify(err: &StorageNodeClientError) -> FailureKind {
    match err {
        StorageNodeClientError::NotFound => FailureKind::NotFound,
        StorageNodeClientError::LegallyUnavailable => FailureKind::Blocked,
        _ => FailureKind::Other,
    }
}

/// Caller decision after a successful completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Keep,
    Done,
}

/// The requirement a dispatch must meet to resolve successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required {
    /// A number of accepted results (metadata, sliver reads).
    Count(usize),
    /// An accepted shard weight (writes, statuses).
    Weight(usize),
}

/// Shard-weighted outcome accounting shared by every dispatch.
#[derive(Debug, Clone)]
pub struct QuorumAccounting {
    n_shards: u16,
    ok_weight: usize,
    ok_count: usize,
    not_found_weight: usize,
    blocked_weight: usize,
    error_count: usize,
}

impl QuorumAccounting {
    pub fn new(n_shards: u16) -> Self {
        Self {
            n_shards,
            ok_weight: 0,
            ok_count: 0,
            not_found_weight: 0,
            blocked_weight: 0,
            error_count: 0,
        }
    }

    pub fn record_success(&mut self, weight: usize) {
        self.ok_weight += weight;
        self.ok_count += 1;
    }

    pub fn record_failure(&mut self, weight: usize, kind: FailureKind) {
        match kind {
            FailureKind::NotFound => self.not_found_weight += weight,
            FailureKind::Blocked => self.blocked_weight += weight,
            FailureKind::Aborted | FailureKind::Other => {},
        }
        self.error_count += 1;
    }

    pub fn ok_weight(&self) -> usize {
        self.ok_weight
    }

    pub fn ok_count(&self) -> usize {
        self.ok_count
    }

    pub fn not_found_weight(&self) -> usize {
        self.not_found_weight
    }

    pub fn blocked_weight(&self) -> usize {
        self.blocked_weight
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// More than two thirds of the shard weight authoritatively lacks or withholds the blob, the
    /// dual of the success quorum: the blob cannot be certified.
    pub fn is_unavailable_quorum(&self) -> bool {
        is_quorum_weight(self.not_found_weight + self.blocked_weight, self.n_shards)
    }

    /// Which absence dominates once [`QuorumAccounting::is_unavailable_quorum`] holds.
    pub fn unavailability(&self) -> FailureKind {
        if self.not_found_weight >= self.blocked_weight {
            FailureKind::NotFound
        } else {
            FailureKind::Blocked
        }
    }

    pub fn is_satisfied(&self, required: Required) -> bool {
        match required {
            Required::Count(count) => self.ok_count >= count,
            Required::Weight(weight) => self.ok_weight >= weight,
        }
    }

    /// Whether the requirement is unreachable even if everything still outstanding succeeds.
    pub fn is_exhausted(&self, required: Required, remaining_count: usize, remaining_weight: usize) -> bool {
        match required {
            Required::Count(count) => self.ok_count + remaining_count < count,
            Required::Weight(weight) => self.ok_weight + remaining_weight < weight,
        }
    }
}

/// One unit of work against one committee member.
pub struct DispatchTask<'a, T> {
    pub node_index: u16,
    pub weight: usize,
    pub future: BoxFuture<'a, Result<T, StorageNodeClientError>>,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Maximum in-flight tasks.
    pub concurrency: usize,
    /// Cap in-flight work at what is still needed to meet a count requirement, so a dispatch with
    /// prompt responses issues exactly `count` requests.
    pub conserve_requests: bool,
    /// Launch a single task and widen to `concurrency` only after its completion. Used by
    /// first-success reads that expect the first node to answer.
    pub probe_first: bool,
    /// Hold the success resolution until every task has completed or failed; only `accept`
    /// returning `Done` resolves earlier. Writes certify with every confirmation received, not
    /// just the first quorum of them, and status polls resolve on a per-status validity check
    /// rather than the aggregate success weight.
    pub drain: bool,
}

impl DispatchOptions {
    pub fn all_fanout(n_tasks: usize) -> Self {
        Self {
            concurrency: n_tasks.max(1),
            conserve_requests: false,
            probe_first: false,
            drain: false,
        }
    }
}

#[derive(Debug)]
pub enum DispatchOutcome<T> {
    /// The requirement was met; carries every accepted result.
    Complete(Vec<T>),
    /// A quorum of weight replied not-found/blocked, with not-found dominating.
    NotCertified,
    /// A quorum of weight replied not-found/blocked, with blocked dominating.
    Blocked,
    Aborted,
    /// The requirement became unreachable; carries the results gathered so far.
    Insufficient(Vec<T>),
}

/// Drives one weighted fan-out to its aggregate outcome.
pub struct QuorumDispatcher {
    n_shards: u16,
    options: DispatchOptions,
}

impl QuorumDispatcher {
    pub fn new(n_shards: u16, options: DispatchOptions) -> Self {
        Self { n_shards, options }
    }

    /// Runs `tasks` in order under the configured concurrency until the outcome is decided.
    ///
    /// A node's first failure blacklists it: its queued tasks are failed with the same
    /// classification without being launched. Outstanding work is dropped (aborting the
    /// underlying requests) as soon as the dispatch resolves. `cancel` is the caller's token; a
    /// private child observes it so sibling dispatches are unaffected.
    pub async fn run<'a, T, A>(
        &self,
        tasks: Vec<DispatchTask<'a, T>>,
        required: Required,
        cancel: &CancellationToken,
        mut accept: A,
    ) -> DispatchOutcome<T>
    where
        A: FnMut(&T) -> Acceptance,
    {
        let cancel = cancel.child_token();
        let mut accounting = QuorumAccounting::new(self.n_shards);
        let mut results = Vec::new();
        let mut remaining_count = tasks.len();
        let mut remaining_weight = tasks.iter().map(|task| task.weight).sum::<usize>();
        let mut queue = tasks.into_iter().collect::<VecDeque<_>>();
        let mut failed_nodes = HashMap::<u16, FailureKind>::new();
        let mut in_flight = FuturesUnordered::new();
        let mut first_completed = !self.options.probe_first;

        'dispatch: loop {
            if cancel.is_cancelled() {
                return DispatchOutcome::Aborted;
            }
            let work_left = !queue.is_empty() || !in_flight.is_empty();
            if accounting.is_satisfied(required) && !(self.options.drain && work_left) {
                debug!(
                    target: LOG_TARGET,
                    "Dispatch complete: {} results, weight {} of {} shards",
                    accounting.ok_count(),
                    accounting.ok_weight(),
                    self.n_shards
                );
                return DispatchOutcome::Complete(results);
            }
            if accounting.is_unavailable_quorum() {
                warn!(
                    target: LOG_TARGET,
                    "Quorum of absence: not-found weight {}, blocked weight {} of {} shards",
                    accounting.not_found_weight(),
                    accounting.blocked_weight(),
                    self.n_shards
                );
                return match accounting.unavailability() {
                    FailureKind::Blocked => DispatchOutcome::Blocked,
                    _ => DispatchOutcome::NotCertified,
                };
            }
            if accounting.is_exhausted(required, remaining_count, remaining_weight) {
                warn!(
                    target: LOG_TARGET,
                    "Dispatch exhausted: {} accepted (weight {}), {} outstanding (weight {}), {} errors",
                    accounting.ok_count(),
                    accounting.ok_weight(),
                    remaining_count,
                    remaining_weight,
                    accounting.error_count()
                );
                return DispatchOutcome::Insufficient(results);
            }

            let limit = self.launch_limit(required, &accounting, first_completed);
            while in_flight.len() < limit {
                let Some(task) = queue.pop_front() else {
                    break;
                };
                if let Some(kind) = failed_nodes.get(&task.node_index).copied() {
                    // The node already failed once; fail its queued work without another request.
                    remaining_count -= 1;
                    remaining_weight -= task.weight;
                    accounting.record_failure(task.weight, kind);
                    continue 'dispatch;
                }
                let DispatchTask {
                    node_index,
                    weight,
                    future,
                } = task;
                in_flight.push(future.map(move |result| (node_index, weight, result)));
            }

            if in_flight.is_empty() {
                return if accounting.is_satisfied(required) {
                    DispatchOutcome::Complete(results)
                } else {
                    DispatchOutcome::Insufficient(results)
                };
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(target: LOG_TARGET, "Dispatch aborted by the caller");
                    return DispatchOutcome::Aborted;
                },
                Some((node_index, weight, result)) = in_flight.next() => {
                    first_completed = true;
                    remaining_count -= 1;
                    remaining_weight -= weight;
                    match result {
                        Ok(value) => {
                            accounting.record_success(weight);
                            let acceptance = accept(&value);
                            results.push(value);
                            if acceptance == Acceptance::Done {
                                return DispatchOutcome::Complete(results);
                            }
                        },
                        Err(err) => {
                            let kind = classify(&err);
                            if kind == FailureKind::Aborted {
                                return DispatchOutcome::Aborted;
                            }
                            debug!(
                                target: LOG_TARGET,
                                "Node {} failed ({:?}) with weight {}: {}", node_index, kind, weight, err
                            );
                            failed_nodes.insert(node_index, kind);
                            accounting.record_failure(weight, kind);
                        },
                    }
                },
            }
        }
    }

    fn launch_limit(&self, required: Required, accounting: &QuorumAccounting, first_completed: bool) -> usize {
        if !first_completed {
            return 1;
        }
        let mut limit = self.options.concurrency.max(1);
        if self.options.conserve_requests {
            if let Required::Count(count) = required {
                limit = limit.min(count.saturating_sub(accounting.ok_count()));
            }
        }
        limit
    }
}

/// Randomizes `items` with higher weights more likely to come first, so heavier nodes serve more
/// of the early requests.
pub fn weighted_shuffle<T, R: Rng>(rng: &mut R, items: Vec<(usize, T)>) -> Vec<T> {
    let mut keyed = items
        .into_iter()
        .map(|(weight, item)| {
            let weight = weight.max(1) as f64;
            (rng.gen::<f64>().powf(1.0 / weight), item)
        })
        .collect::<Vec<_>>();
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    keyed.into_iter().map(|(_, item)| item).collect()
}
