use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Coarse sync indicator shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Nothing exchanged with the store yet
    Idle,
    Syncing,
    /// Last exchange with the store succeeded
    Live,
    /// Last exchange failed; local edits are kept and may not be shared yet
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Time of the last successful pull or push
    pub last_sync: Option<DateTime<Utc>>,
    pub pending_changes: usize,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
            last_sync: None,
            pending_changes: 0,
        }
    }
}

impl SyncStatus {
    pub fn is_error(&self) -> bool {
        matches!(self.state, SyncState::Error(_))
    }

    /// One-word label for status bars
    pub fn label(&self) -> &'static str {
        match self.state {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Live => "live",
            SyncState::Error(_) => "error",
        }
    }
}

/// Publishing side of the status signal.
///
/// Every state change bumps a generation counter, bumped inside the channel's
/// write lock so it orders with the writes themselves.
pub(crate) struct StatusBoard {
    tx: watch::Sender<SyncStatus>,
    generation: AtomicU64,
}

impl StatusBoard {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::default());
        Self {
            tx,
            generation: AtomicU64::new(0),
        }
    }

    fn write_state(&self, f: impl FnOnce(&mut SyncStatus)) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|status| {
            f(status);
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        });
        generation
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    /// Returns the generation of this write, for [`StatusBoard::rewind`]
    pub(crate) fn mark_syncing(&self, pending_changes: usize) -> u64 {
        self.write_state(|status| {
            status.state = SyncState::Syncing;
            status.pending_changes = pending_changes;
        })
    }

    pub(crate) fn mark_live(&self, pending_changes: usize) {
        self.write_state(|status| {
            status.state = SyncState::Live;
            status.last_sync = Some(Utc::now());
            status.pending_changes = pending_changes;
        });
    }

    pub(crate) fn mark_error(&self, error: String, pending_changes: usize) {
        self.write_state(|status| {
            status.state = SyncState::Error(error);
            status.pending_changes = pending_changes;
        });
    }

    pub(crate) fn set_pending(&self, pending_changes: usize) {
        self.tx.send_modify(|status| status.pending_changes = pending_changes);
    }

    /// Put `state` back, but only if no state change happened since the write
    /// at `generation`. Otherwise just the pending count is updated.
    /// Returns whether the state was put back.
    pub(crate) fn rewind(&self, generation: u64, state: SyncState, pending_changes: usize) -> bool {
        let mut rewound = false;
        self.tx.send_modify(|status| {
            if self.generation.load(Ordering::SeqCst) == generation {
                status.state = state;
                rewound = true;
            }
            status.pending_changes = pending_changes;
        });
        rewound
    }
}
