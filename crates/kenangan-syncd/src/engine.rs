//! Local replica and sync scheduler.
//!
//! All changes funnel through [`SyncEngine::mutate`]: the transformation is
//! applied to the replica immediately and the resulting snapshot is queued for
//! a push. A single worker drains the queue, so pushes reach the store one at
//! a time and in the order the mutations produced them.
//!
//! Pulls replace the replica wholesale. There is no field-level merge, so the
//! effective consistency model is last-writer-wins at the granularity of
//! "latest confirmed push or latest allowed pull". Scheduled pulls consult the
//! [`SyncSession`] guard first; forced pulls (initial load, sign in) skip it.

use kenangan_core::{now_millis, EntityRef, Mutation, ReplicaCache, Snapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::session::{SyncSession, Veto};
use crate::status::{StatusBoard, SyncStatus};
use crate::store::DocumentStore;

/// Tunables for a [`SyncEngine`]
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Scheduled pulls stay suppressed this long after a push completes
    pub quiet_period: Duration,
    /// Interval used by [`SyncEngine::spawn_poller`]
    pub poll_interval: Duration,
    /// Optional on-disk mirror of the replica
    pub cache: Option<ReplicaCache>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_secs(3),
            poll_interval: Duration::from_secs(15),
            cache: None,
        }
    }
}

/// Result of one pull attempt
#[derive(Debug, Clone)]
pub enum PullOutcome {
    /// The replica now equals the remote document
    Applied {
        /// False when the key did not exist and the replica became empty
        found: bool,
        albums: usize,
        /// Whether the replica differed before the pull
        changed: bool,
    },
    /// Skipped by the guard; the replica is untouched
    Vetoed(Veto),
    /// The store could not be read; the replica is untouched
    Failed(SyncError),
}

impl PullOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PullOutcome::Applied { .. })
    }
}

/// Completion of the push triggered by one mutation.
///
/// Dropping it is fine; the push still happens.
#[derive(Debug)]
pub struct PushHandle {
    rx: oneshot::Receiver<SyncResult<()>>,
}

impl PushHandle {
    fn ready() -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Ok(()));
        Self { rx }
    }

    /// Wait for the store to accept or reject the snapshot
    pub async fn outcome(self) -> SyncResult<()> {
        self.rx.await.unwrap_or(Err(SyncError::Shutdown))
    }
}

/// Marks a local operation (e.g. an upload) that will end in a mutation.
/// Scheduled pulls are vetoed until it is dropped.
pub struct LocalOperation {
    shared: Arc<Shared>,
}

impl Drop for LocalOperation {
    fn drop(&mut self) {
        self.shared.session().finish_local_operation();
    }
}

struct PushJob {
    snapshot: Snapshot,
    done: oneshot::Sender<SyncResult<()>>,
}

/// State shared with the push worker
struct Shared {
    store: Arc<dyn DocumentStore>,
    session: Mutex<SyncSession>,
    status: StatusBoard,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, SyncSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> usize {
        self.session().pending_pushes()
    }
}

/// Sets the in-flight flag for its lifetime. Clearing happens in `Drop`, so it
/// runs whether the push succeeds, fails or is cancelled.
struct InFlight<'a> {
    shared: &'a Shared,
}

impl<'a> InFlight<'a> {
    fn begin(shared: &'a Shared) -> Self {
        shared.session().begin_push();
        Self { shared }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.shared.session().finish_push(Instant::now());
    }
}

async fn push_worker(shared: Arc<Shared>, mut jobs: mpsc::UnboundedReceiver<PushJob>) {
    while let Some(job) = jobs.recv().await {
        let result = {
            let _in_flight = InFlight::begin(&shared);
            shared.status.mark_syncing(shared.pending());
            shared.store.push(&job.snapshot).await
        };

        let pending = shared.pending();
        match result {
            Ok(()) => {
                info!(albums = job.snapshot.albums.len(), pending, "snapshot pushed");
                shared.status.mark_live(pending);
            }
            Err(ref e) => {
                warn!(error = %e, pending, "push failed, local changes kept");
                shared.status.mark_error(e.to_string(), pending);
            }
        }
        let _ = job.done.send(result);
    }
    debug!("push worker stopped");
}

struct Inner {
    shared: Arc<Shared>,
    replica: RwLock<Snapshot>,
    /// Held across a cache write so writes land one at a time
    cache: Option<Mutex<ReplicaCache>>,
    jobs: mpsc::UnboundedSender<PushJob>,
    poll_interval: Duration,
}

/// Handle to a client replica. Cheap to clone; clones share the replica.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    /// Start an engine and its push worker. Must be called inside a tokio
    /// runtime.
    ///
    /// When a cache is configured the replica starts from the cached snapshot;
    /// callers are expected to follow up with [`SyncEngine::force_pull`] or
    /// [`SyncEngine::sign_in`].
    pub fn start(store: Arc<dyn DocumentStore>, options: SyncOptions) -> Self {
        let seed = match options.cache {
            Some(ref cache) => match cache.load() {
                Ok(Some(snapshot)) => {
                    info!(
                        path = %cache.path().display(),
                        albums = snapshot.albums.len(),
                        "replica seeded from cache"
                    );
                    snapshot
                }
                Ok(None) => Snapshot::default(),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable replica cache");
                    Snapshot::default()
                }
            },
            None => Snapshot::default(),
        };

        let shared = Arc::new(Shared {
            store,
            session: Mutex::new(SyncSession::new(options.quiet_period)),
            status: StatusBoard::new(),
        });
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(push_worker(shared.clone(), rx));

        Self {
            inner: Arc::new(Inner {
                shared,
                replica: RwLock::new(seed),
                cache: options.cache.map(Mutex::new),
                jobs,
                poll_interval: options.poll_interval,
            }),
        }
    }

    fn replica(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.inner.replica.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replica_mut(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.inner.replica.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> MutexGuard<'_, SyncSession> {
        self.inner.shared.session()
    }

    /// Write the current replica to the cache. Call without holding the
    /// replica lock; the file always ends on the newest replica even when
    /// writers race.
    fn mirror(&self) {
        if let Some(ref cache) = self.inner.cache {
            let cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            let snapshot = self.snapshot();
            if let Err(e) = cache.save(&snapshot) {
                warn!(error = %e, "failed to update replica cache");
            }
        }
    }

    /// Copy of the current replica
    pub fn snapshot(&self) -> Snapshot {
        self.replica().clone()
    }

    /// Borrow the replica without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.replica())
    }

    /// Apply `transform` to the replica now and queue the result for a push.
    ///
    /// `transform` runs under the replica lock and must not call back into the
    /// engine. A transformation that leaves the snapshot unchanged is not
    /// pushed.
    pub fn mutate<F>(&self, transform: F) -> PushHandle
    where
        F: FnOnce(Snapshot) -> Snapshot,
    {
        let mut replica = self.replica_mut();
        let next = transform(replica.clone());
        if next == *replica {
            return PushHandle::ready();
        }
        *replica = next.clone();

        let (done, rx) = oneshot::channel();
        let pending = {
            let mut session = self.session();
            session.record_mutation();
            // Still under the replica lock, so queue order matches replica order
            if let Err(mpsc::error::SendError(job)) = self.inner.jobs.send(PushJob { snapshot: next, done }) {
                session.abandon_push();
                let _ = job.done.send(Err(SyncError::Shutdown));
            }
            session.pending_pushes()
        };
        drop(replica);

        self.mirror();
        self.inner.shared.status.set_pending(pending);
        PushHandle { rx }
    }

    pub fn apply(&self, mutation: Mutation) -> PushHandle {
        debug!(mutation = mutation.label(), "applying local mutation");
        self.mutate(move |snapshot| mutation.apply(snapshot))
    }

    /// Soft delete an album or photo
    pub fn archive(&self, target: EntityRef) -> PushHandle {
        self.warn_if_unknown(&target);
        self.apply(Mutation::Archive {
            target,
            at: now_millis(),
        })
    }

    pub fn restore(&self, target: EntityRef) -> PushHandle {
        self.warn_if_unknown(&target);
        self.apply(Mutation::Restore(target))
    }

    fn warn_if_unknown(&self, target: &EntityRef) {
        if !self.read(|snapshot| target.exists_in(snapshot)) {
            warn!(?target, "target not in replica, nothing to change");
        }
    }

    /// Scheduled pull; a no-op while the guard vetoes it
    pub async fn pull(&self) -> PullOutcome {
        self.pull_with(false).await
    }

    /// Pull that bypasses the guard. Only for points where no local write can
    /// be in flight, such as startup and sign in.
    pub async fn force_pull(&self) -> PullOutcome {
        self.pull_with(true).await
    }

    async fn pull_with(&self, force: bool) -> PullOutcome {
        let shared = &self.inner.shared;
        let (epoch, previous_state, pending) = {
            let session = shared.session();
            if !force {
                if let Some(veto) = session.pull_veto(Instant::now()) {
                    debug!(?veto, "scheduled pull skipped");
                    return PullOutcome::Vetoed(veto);
                }
            }
            (
                session.write_epoch(),
                shared.status.current().state,
                session.pending_pushes(),
            )
        };
        let generation = shared.status.mark_syncing(pending);

        let remote = match shared.store.pull().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "pull failed, keeping last known snapshot");
                shared.status.mark_error(e.to_string(), shared.pending());
                return PullOutcome::Failed(e);
            }
        };
        let found = remote.is_found();
        let snapshot = remote.into_snapshot();

        let mut replica = self.replica_mut();
        if !force {
            let session = shared.session();
            let veto = if session.write_epoch() != epoch {
                Some(Veto::Superseded)
            } else {
                session.pull_veto(Instant::now())
            };
            if let Some(veto) = veto {
                debug!(?veto, "discarding pull that raced a local write");
                // A push may have reported since; its outcome stays
                shared
                    .status
                    .rewind(generation, previous_state, session.pending_pushes());
                return PullOutcome::Vetoed(veto);
            }
        }

        let albums = snapshot.albums.len();
        let changed = *replica != snapshot;
        *replica = snapshot;
        drop(replica);
        if changed {
            self.mirror();
        }

        shared.status.mark_live(shared.pending());
        if changed {
            info!(found, albums, forced = force, "replica replaced by remote snapshot");
        } else {
            debug!(found, albums, forced = force, "replica already up to date");
        }
        PullOutcome::Applied {
            found,
            albums,
            changed,
        }
    }

    /// Record the identity supplied by the identity gate and refresh the
    /// replica so a newly joined client does not sit on stale data
    pub async fn sign_in(&self, author: impl Into<String>) -> PullOutcome {
        let author = author.into();
        info!(%author, "signed in");
        self.session().sign_in(author);
        self.force_pull().await
    }

    pub fn sign_out(&self) {
        self.session().sign_out();
    }

    /// Display name to stamp on new photos and comments
    pub fn author(&self) -> Option<String> {
        self.session().author().map(str::to_string)
    }

    /// Veto scheduled pulls until the returned guard is dropped
    pub fn begin_local_operation(&self) -> LocalOperation {
        self.session().begin_local_operation();
        LocalOperation {
            shared: self.inner.shared.clone(),
        }
    }

    pub fn pending_pushes(&self) -> usize {
        self.inner.shared.pending()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.shared.status.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.shared.status.subscribe()
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Run scheduled pulls every poll interval until the handle is aborted
    pub fn spawn_poller(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let every = self.inner.poll_interval;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                engine.pull().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SyncState;
    use crate::store::MemoryDocumentStore;
    use kenangan_core::{Album, Photo};

    const QUIET: Duration = Duration::from_secs(3);

    fn engine_on(store: &MemoryDocumentStore) -> SyncEngine {
        SyncEngine::start(
            Arc::new(store.clone()),
            SyncOptions {
                quiet_period: QUIET,
                poll_interval: Duration::from_secs(10),
                cache: None,
            },
        )
    }

    fn create(id: &str, name: &str, created_at: i64) -> Mutation {
        Mutation::CreateAlbum(Album::new(id, name, created_at))
    }

    fn ids(snapshot: &Snapshot) -> Vec<String> {
        snapshot.albums.iter().map(|a| a.id.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_is_visible_before_push_resolves() {
        let store = MemoryDocumentStore::new();
        store.set_latency(Duration::from_secs(1));
        let engine = engine_on(&store);

        let before = engine.snapshot();
        let handle = engine.apply(create("1", "Trip", 1000));
        let expected = create("1", "Trip", 1000).apply(before);

        assert_eq!(engine.snapshot(), expected);
        assert_eq!(store.stored().unwrap(), None);
        assert_eq!(engine.pending_pushes(), 1);

        handle.outcome().await.unwrap();
        assert_eq!(store.stored().unwrap(), Some(expected));
        assert_eq!(engine.pending_pushes(), 0);
        assert_eq!(engine.status().state, SyncState::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_pull_vetoed_from_push_start_until_quiet_period_ends() {
        let store = MemoryDocumentStore::new();
        store.set_latency(Duration::from_millis(500));
        let engine = engine_on(&store);

        let handle = engine.apply(create("1", "Trip", 1000));
        assert!(matches!(engine.pull().await, PullOutcome::Vetoed(Veto::PendingPushes(1))));

        tokio::task::yield_now().await;
        assert!(matches!(engine.pull().await, PullOutcome::Vetoed(Veto::PushInFlight)));

        handle.outcome().await.unwrap();
        let other = Snapshot::new(vec![Album::new("9", "From another client", 5)]);
        store.replace(&other).unwrap();

        time::advance(Duration::from_secs(2)).await;
        assert!(matches!(
            engine.pull().await,
            PullOutcome::Vetoed(Veto::QuietPeriod { .. })
        ));
        assert_eq!(ids(&engine.snapshot()), vec!["1"]);

        time::advance(Duration::from_secs(1)).await;
        assert!(engine.pull().await.is_applied());
        assert_eq!(engine.snapshot(), other);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_started_before_a_mutation_is_discarded() {
        let remote = Snapshot::new(vec![Album::new("r", "Remote", 1)]);
        let store = MemoryDocumentStore::with_snapshot(&remote).unwrap();
        store.set_latency(Duration::from_secs(1));
        let engine = engine_on(&store);

        let pulling = tokio::spawn({
            let engine = engine.clone();
            async move { engine.pull().await }
        });
        time::sleep(Duration::from_millis(10)).await;

        let handle = engine.apply(create("1", "Trip", 1000));
        let outcome = pulling.await.unwrap();

        assert!(matches!(outcome, PullOutcome::Vetoed(Veto::Superseded)));
        assert_eq!(ids(&engine.snapshot()), vec!["1"]);
        handle.outcome().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_discarded_pull_keeps_push_failure_on_status() {
        let store = MemoryDocumentStore::new();
        store.set_latency(Duration::from_secs(1));
        store.fail_pushes(true);
        let engine = engine_on(&store);

        let pulling = tokio::spawn({
            let engine = engine.clone();
            async move { engine.pull().await }
        });
        time::sleep(Duration::from_millis(10)).await;

        // The push fails right away while the pull is still out
        store.set_latency(Duration::ZERO);
        let result = engine.apply(create("1", "Trip", 1000)).outcome().await;
        assert!(matches!(result, Err(SyncError::Network(_))));
        assert!(engine.status().is_error());

        let outcome = pulling.await.unwrap();
        assert!(matches!(outcome, PullOutcome::Vetoed(Veto::Superseded)));
        assert!(engine.status().is_error());
        assert_eq!(ids(&engine.snapshot()), vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_pull_bypasses_guard() {
        let remote = Snapshot::new(vec![Album::new("r", "Remote", 1)]);
        let store = MemoryDocumentStore::with_snapshot(&remote).unwrap();
        let engine = engine_on(&store);
        let _upload = engine.begin_local_operation();

        assert!(matches!(engine.pull().await, PullOutcome::Vetoed(Veto::LocalOperation)));
        assert!(matches!(
            engine.force_pull().await,
            PullOutcome::Applied { found: true, albums: 1, changed: true }
        ));
        assert_eq!(engine.snapshot(), remote);
    }

    #[tokio::test]
    async fn test_local_operation_guard_releases_on_drop() {
        let store = MemoryDocumentStore::new();
        let engine = engine_on(&store);
        {
            let _upload = engine.begin_local_operation();
            assert!(!engine.pull().await.is_applied());
        }
        assert!(engine.pull().await.is_applied());
    }

    #[tokio::test]
    async fn test_pulling_same_snapshot_twice_is_idempotent() {
        let remote = Snapshot::new(vec![Album::new("1", "Trip", 1000)]);
        let store = MemoryDocumentStore::with_snapshot(&remote).unwrap();
        let engine = engine_on(&store);

        assert!(matches!(engine.pull().await, PullOutcome::Applied { changed: true, .. }));
        assert_eq!(engine.snapshot(), remote);
        assert!(matches!(engine.pull().await, PullOutcome::Applied { changed: false, .. }));
        assert_eq!(engine.snapshot(), remote);
    }

    #[tokio::test]
    async fn test_failed_push_keeps_optimistic_change() {
        let store = MemoryDocumentStore::new();
        store.fail_pushes(true);
        let engine = engine_on(&store);

        let result = engine.apply(create("1", "Trip", 1000)).outcome().await;
        assert!(matches!(result, Err(SyncError::Network(_))));
        assert_eq!(ids(&engine.snapshot()), vec!["1"]);
        assert!(engine.status().is_error());
        assert_eq!(store.stored().unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_pull_keeps_last_known_snapshot() {
        let remote = Snapshot::new(vec![Album::new("1", "Trip", 1000)]);
        let store = MemoryDocumentStore::with_snapshot(&remote).unwrap();
        let engine = engine_on(&store);
        engine.force_pull().await;

        store.fail_pulls(true);
        assert!(matches!(engine.force_pull().await, PullOutcome::Failed(_)));
        assert_eq!(engine.snapshot(), remote);
        assert!(engine.status().is_error());

        store.fail_pulls(false);
        assert!(engine.force_pull().await.is_applied());
        assert_eq!(engine.status().state, SyncState::Live);
    }

    #[tokio::test]
    async fn test_oversized_snapshot_reported_to_mutation_caller() {
        let store = MemoryDocumentStore::new();
        store.set_max_payload_bytes(Some(200));
        let engine = engine_on(&store);
        engine.apply(create("1", "Trip", 1000)).outcome().await.unwrap();

        let photos = (0..5).map(|i| Photo::new(format!("cdn://photo-{i}"), None)).collect();
        let err = engine
            .apply(Mutation::AddPhotos {
                album_id: "1".into(),
                photos,
            })
            .outcome()
            .await
            .unwrap_err();

        assert!(err.is_payload_too_large());
        assert!(err.to_string().contains("fewer or smaller photos"));
        assert_eq!(engine.snapshot().album("1").unwrap().photos.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_land_in_mutation_order() {
        let store = MemoryDocumentStore::new();
        store.set_latency(Duration::from_millis(200));
        let engine = engine_on(&store);

        engine.apply(create("1", "Trip", 1000));
        engine.apply(Mutation::RenameAlbum {
            album_id: "1".into(),
            name: "Bali".into(),
        });
        let last = engine.archive(EntityRef::album("1"));
        assert_eq!(engine.pending_pushes(), 3);

        last.outcome().await.unwrap();
        assert_eq!(store.push_count(), 3);
        assert_eq!(store.stored().unwrap(), Some(engine.snapshot()));
        assert!(engine.snapshot().album("1").unwrap().is_archived());
    }

    #[tokio::test]
    async fn test_archiving_unknown_target_is_not_pushed() {
        let store = MemoryDocumentStore::new();
        let engine = engine_on(&store);
        engine.apply(create("1", "Trip", 1000)).outcome().await.unwrap();

        engine.archive(EntityRef::album("404")).outcome().await.unwrap();
        engine.restore(EntityRef::photo("1", "404")).outcome().await.unwrap();
        assert_eq!(store.push_count(), 1);

        engine.archive(EntityRef::album("1")).outcome().await.unwrap();
        assert_eq!(store.push_count(), 2);
        assert!(engine.snapshot().album("1").unwrap().is_archived());
    }

    #[tokio::test]
    async fn test_no_op_mutation_is_not_pushed() {
        let store = MemoryDocumentStore::new();
        let engine = engine_on(&store);

        engine.archive(EntityRef::album("missing")).outcome().await.unwrap();
        engine.restore(EntityRef::photo("missing", "p")).outcome().await.unwrap();
        assert_eq!(store.push_count(), 0);
        assert_eq!(engine.pending_pushes(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_records_author_and_refreshes() {
        let remote = Snapshot::new(vec![Album::new("1", "Trip", 1000)]);
        let store = MemoryDocumentStore::with_snapshot(&remote).unwrap();
        let engine = engine_on(&store);

        assert!(engine.sign_in("Ani").await.is_applied());
        assert_eq!(engine.author().as_deref(), Some("Ani"));
        assert_eq!(engine.snapshot(), remote);

        engine.sign_out();
        assert_eq!(engine.author(), None);
    }

    #[tokio::test]
    async fn test_cache_seeds_replica_and_follows_changes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReplicaCache::new(dir.path().join("replica.json"));
        let cached = Snapshot::new(vec![Album::new("old", "Cached", 1)]);
        cache.save(&cached).unwrap();

        let remote = Snapshot::new(vec![Album::new("new", "Remote", 2)]);
        let store = MemoryDocumentStore::with_snapshot(&remote).unwrap();
        let engine = SyncEngine::start(
            Arc::new(store.clone()),
            SyncOptions {
                cache: Some(cache.clone()),
                ..Default::default()
            },
        );
        assert_eq!(engine.snapshot(), cached);

        engine.force_pull().await;
        assert_eq!(cache.load().unwrap(), Some(remote));

        engine.apply(create("2", "Party", 3)).outcome().await.unwrap();
        assert_eq!(cache.load().unwrap(), Some(engine.snapshot()));
    }

    #[tokio::test]
    async fn test_cache_ends_on_newest_replica() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReplicaCache::new(dir.path().join("replica.json"));
        let store = MemoryDocumentStore::new();
        let engine = SyncEngine::start(
            Arc::new(store.clone()),
            SyncOptions {
                cache: Some(cache.clone()),
                ..Default::default()
            },
        );

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                tokio::task::spawn_blocking(move || {
                    engine.apply(create(&i.to_string(), "Trip", i))
                })
            })
            .collect();
        let mut handles = Vec::new();
        for writer in writers {
            handles.push(writer.await.unwrap());
        }
        for handle in handles {
            handle.outcome().await.unwrap();
        }

        assert_eq!(engine.snapshot().albums.len(), 8);
        assert_eq!(cache.load().unwrap(), Some(engine.snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_absorbs_remote_changes() {
        let store = MemoryDocumentStore::new();
        let engine = engine_on(&store);
        let poller = engine.spawn_poller();

        let other = Snapshot::new(vec![Album::new("9", "Elsewhere", 5)]);
        store.replace(&other).unwrap();
        assert!(engine.snapshot().is_empty());

        time::sleep(engine.poll_interval() + Duration::from_secs(1)).await;
        assert_eq!(engine.snapshot(), other);
        poller.abort();
    }

    #[tokio::test]
    async fn test_status_signal_reports_transitions() {
        let store = MemoryDocumentStore::new();
        let engine = engine_on(&store);
        let mut rx = engine.subscribe();
        assert_eq!(rx.borrow().state, SyncState::Idle);

        engine.force_pull().await;
        assert!(rx.has_changed().unwrap());
        let status = rx.borrow_and_update().clone();
        assert_eq!(status.state, SyncState::Live);
        assert!(status.last_sync.is_some());
        assert_eq!(status.label(), "live");
    }
}
