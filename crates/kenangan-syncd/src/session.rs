//! Per-client sync session: identity plus the race/staleness guard.
//!
//! A pull that lands while a local edit has not yet reached the store would
//! revert that edit, because a pull replaces the replica wholesale. The
//! session tracks everything needed to veto such pulls:
//!
//! - pushes queued or in flight,
//! - the time the last push finished (success or failure), for the quiet period,
//! - local operations such as uploads that will end in a mutation,
//! - a write epoch, bumped by every mutation, so a pull that started before a
//!   mutation can be discarded when it returns.
//!
//! This is a client-local heuristic. The store has no locking, and two clients
//! pushing concurrently still race: the last push to land wins.

use std::time::Duration;
use tokio::time::Instant;

/// Why a scheduled pull did not touch the replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Veto {
    PushInFlight,
    /// Mutations applied locally but not yet pushed
    PendingPushes(usize),
    LocalOperation,
    /// The last push finished less than the quiet period ago
    QuietPeriod { remaining: Duration },
    /// A mutation happened while the pull was outstanding
    Superseded,
}

#[derive(Debug)]
pub struct SyncSession {
    author: Option<String>,
    quiet_period: Duration,
    push_in_flight: bool,
    pending_pushes: usize,
    local_operations: usize,
    last_write: Option<Instant>,
    write_epoch: u64,
}

impl SyncSession {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            author: None,
            quiet_period,
            push_in_flight: false,
            pending_pushes: 0,
            local_operations: 0,
            last_write: None,
            write_epoch: 0,
        }
    }

    /// Display name supplied by the identity gate
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn sign_in(&mut self, author: impl Into<String>) {
        self.author = Some(author.into());
    }

    pub fn sign_out(&mut self) {
        self.author = None;
    }

    pub fn pending_pushes(&self) -> usize {
        self.pending_pushes
    }

    pub fn write_epoch(&self) -> u64 {
        self.write_epoch
    }

    /// Whether a scheduled pull must be skipped at `now`
    pub fn pull_veto(&self, now: Instant) -> Option<Veto> {
        if self.push_in_flight {
            return Some(Veto::PushInFlight);
        }
        if self.pending_pushes > 0 {
            return Some(Veto::PendingPushes(self.pending_pushes));
        }
        if self.local_operations > 0 {
            return Some(Veto::LocalOperation);
        }
        if let Some(last_write) = self.last_write {
            let elapsed = now.saturating_duration_since(last_write);
            if elapsed < self.quiet_period {
                return Some(Veto::QuietPeriod {
                    remaining: self.quiet_period - elapsed,
                });
            }
        }
        None
    }

    /// A mutation was applied locally and queued for push
    pub fn record_mutation(&mut self) {
        self.write_epoch += 1;
        self.pending_pushes += 1;
    }

    /// A queued push could not be handed to the push worker
    pub fn abandon_push(&mut self) {
        self.pending_pushes = self.pending_pushes.saturating_sub(1);
    }

    pub fn begin_push(&mut self) {
        self.push_in_flight = true;
    }

    /// Called whether the push succeeded or failed: either way the replica is
    /// the freshest known truth
    pub fn finish_push(&mut self, now: Instant) {
        self.push_in_flight = false;
        self.pending_pushes = self.pending_pushes.saturating_sub(1);
        self.last_write = Some(now);
    }

    pub fn begin_local_operation(&mut self) {
        self.local_operations += 1;
    }

    pub fn finish_local_operation(&mut self) {
        self.local_operations = self.local_operations.saturating_sub(1);
    }
}
