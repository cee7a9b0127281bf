//! Per-document sync session.
//!
//! A [`SyncSession`] lives from document open to document close. It drives the
//! [`ReconcileState`] machine from sync-core once, executes the actions it
//! returns against the client and the collaborators, then turns later local
//! movement into debounced pushes through a [`PushScheduler`].
//!
//! Reconciliation outcome and the last-pushed cache live only as long as the
//! session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sync_core::{
    decode_remote, encode, Action, ConflictDetails, DocumentIdentity, Event, Layout,
    LocalSnapshot, Position, PushContext, PushDecision, PushGate, ReconcilePolicy,
    ReconcileState, RemoteTarget, WireProgress,
};
use sync_types::{RemoteProgress, SessionId};

use crate::client::KoSyncClient;
use crate::collab::Collaborators;
use crate::scheduler::{PushScheduler, DEFAULT_PUSH_DELAY};
use crate::transport::Transport;

/// Session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Quiet period before a progress change is pushed
    pub push_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            push_delay: DEFAULT_PUSH_DELAY,
        }
    }
}

struct Shared<T: Transport> {
    client: Arc<KoSyncClient<T>>,
    document: DocumentIdentity,
    collab: Collaborators,
    state: Mutex<ReconcileState>,
    gate: Mutex<PushGate>,
}

impl<T: Transport> Shared<T> {
    fn state(&self) -> MutexGuard<'_, ReconcileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self) -> MutexGuard<'_, PushGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_synced(&self) -> bool {
        self.state().is_synced()
    }

    fn transition(&self, event: Event) -> Vec<Action> {
        let mut state = self.state();
        let from = state.name();
        let (next, actions) = std::mem::take(&mut *state).on_event(event);
        if next.name() != from {
            tracing::debug!(title = %self.document.title, from, to = next.name(), "reconcile transition");
        }
        *state = next;
        actions
    }

    fn layout(&self) -> Layout {
        Layout::from_format(&self.collab.config.document_state().format)
    }

    fn local_snapshot(&self) -> LocalSnapshot {
        let doc = self.collab.config.document_state();
        let view = self.collab.view.progress();
        let (current, total) = view.page.map_or((0, 0), |p| (p.current, p.total));
        let position = match Layout::from_format(&doc.format) {
            Layout::Fixed => Position::page(current, total),
            Layout::Reflowable => Position::flowing(doc.location, current, total),
        };
        LocalSnapshot {
            position,
            updated_at_ms: doc.updated_at_ms,
            section_label: view.section_label,
        }
    }

    fn encode_current(&self) -> WireProgress {
        let snapshot = self.local_snapshot();
        let encoded = encode(&snapshot.position, self.collab.view.translator());
        if let Some(err) = encoded.degradation {
            tracing::warn!(title = %self.document.title, error = %err, "sending untranslated pointer");
        }
        encoded.wire
    }

    fn adopt_baseline(&self) {
        let wire = self.encode_current();
        tracing::debug!(title = %self.document.title, progress = %wire.progress, "positions agree");
        self.gate().record(wire.progress);
    }

    fn apply_remote(&self, remote: &RemoteProgress) {
        let layout = self.layout();
        let local_total = match layout {
            Layout::Fixed => self
                .collab
                .view
                .progress()
                .page
                .map_or(0, |p| p.total),
            Layout::Reflowable => 0,
        };

        let view = &self.collab.view;
        let decoded = decode_remote(remote, layout, local_total, view.translator());
        if let Some(err) = decoded.degradation {
            tracing::warn!(title = %self.document.title, error = %err, "navigating by percentage");
        }

        match decoded.target {
            RemoteTarget::Page(index) => view.go_to_page(index),
            RemoteTarget::Pointer(pointer) => view.go_to_pointer(&pointer),
            RemoteTarget::Fraction(fraction) => view.go_to_fraction(fraction),
            RemoteTarget::None => {
                tracing::debug!(title = %self.document.title, "remote record has no usable position");
            }
        }
    }

    fn gate_decision(&self, wire: &WireProgress) -> PushDecision {
        let strategy = self.collab.settings.settings().strategy;
        self.gate().check(PushContext {
            strategy,
            has_credentials: self.client.has_credentials(),
            has_digest: self.client.digest(&self.document).is_some(),
            progress: &wire.progress,
        })
    }

    async fn push_current(&self) {
        if !self.is_synced() {
            tracing::debug!(title = %self.document.title, "not reconciled, push skipped");
            return;
        }

        let strategy = self.collab.settings.settings().strategy;
        if !strategy.allows_push() {
            tracing::debug!(title = %self.document.title, %strategy, "strategy never pushes");
            return;
        }

        let wire = self.encode_current();
        if let PushDecision::Suppressed(reason) = self.gate_decision(&wire) {
            tracing::debug!(title = %self.document.title, ?reason, "push suppressed");
            return;
        }

        if self
            .client
            .update_progress(&self.document, &wire.progress, wire.percentage)
            .await
        {
            self.gate().record(wire.progress);
        }
    }
}

/// Sync state of one open document.
pub struct SyncSession<T: Transport + 'static> {
    id: SessionId,
    shared: Arc<Shared<T>>,
    scheduler: PushScheduler,
    reconciled: AtomicBool,
}

impl<T: Transport + 'static> SyncSession<T> {
    /// Start a session for a freshly opened document.
    pub fn open(
        client: Arc<KoSyncClient<T>>,
        document: DocumentIdentity,
        collab: Collaborators,
        options: SessionOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            client,
            document,
            collab,
            state: Mutex::new(ReconcileState::new()),
            gate: Mutex::new(PushGate::new()),
        });

        let weak = Arc::downgrade(&shared);
        let scheduler = PushScheduler::new(options.push_delay, move || {
            let weak = weak.clone();
            async move {
                if let Some(shared) = weak.upgrade() {
                    shared.push_current().await;
                }
            }
        });

        let id = SessionId::new();
        tracing::debug!(session = %id, title = %shared.document.title, "sync session opened");
        Self {
            id,
            shared,
            scheduler,
            reconciled: AtomicBool::new(false),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current reconciliation state.
    pub fn state(&self) -> ReconcileState {
        self.shared.state().clone()
    }

    /// Conflict details while the session waits for a choice.
    pub fn conflict(&self) -> Option<ConflictDetails> {
        self.shared.state().conflict().cloned()
    }

    /// Last value the server accepted during this session.
    pub fn last_pushed(&self) -> Option<String> {
        self.shared.gate().last_pushed().map(str::to_string)
    }

    /// Reconcile local and remote progress.
    ///
    /// Runs once per session; later calls return the current state.
    pub async fn reconcile(&self) -> ReconcileState {
        if self.reconciled.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let settings = self.shared.collab.settings.settings();
        let policy = ReconcilePolicy {
            strategy: settings.strategy,
            tolerance: settings.percentage_tolerance,
        };
        let ready = self.shared.client.has_credentials()
            && self.shared.client.digest(&self.shared.document).is_some();

        let actions = self.shared.transition(Event::Opened { policy, ready });
        self.run_actions(actions).await;
        self.state()
    }

    async fn run_actions(&self, actions: Vec<Action>) {
        let mut queue: VecDeque<Action> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::FetchRemote => {
                    let event = match self.shared.client.fetch_progress(&self.shared.document).await
                    {
                        Ok(remote) => Event::RemoteFetched {
                            remote,
                            local: self.shared.local_snapshot(),
                        },
                        Err(err) => {
                            tracing::warn!(title = %self.shared.document.title, error = %err, "remote progress unavailable");
                            Event::FetchFailed {
                                error: err.to_string(),
                            }
                        }
                    };
                    queue.extend(self.shared.transition(event));
                }
                Action::SchedulePush => self.scheduler.schedule(),
                Action::PushNow => {
                    self.scheduler.run_now().await;
                }
                Action::AdoptLocalBaseline => self.shared.adopt_baseline(),
                Action::ApplyRemote(remote) => self.shared.apply_remote(&remote),
                Action::Notify(notice) => self.shared.collab.events.emit(notice),
            }
        }
    }

    /// Local position moved.
    ///
    /// Schedules a debounced push once reconciled, if the strategy allows it.
    pub fn progress_changed(&self) {
        if !self.shared.is_synced() {
            return;
        }
        if !self.shared.collab.settings.settings().strategy.allows_push() {
            return;
        }
        self.scheduler.schedule();
    }

    /// Push any pending change now. Returns whether a push was attempted.
    pub async fn flush(&self) -> bool {
        self.scheduler.flush().await
    }

    /// Keep the local position: pushes it immediately.
    pub async fn resolve_with_local(&self) -> ReconcileState {
        let actions = self.shared.transition(Event::ResolvedWithLocal);
        self.run_actions(actions).await;
        self.state()
    }

    /// Take the remote position: navigates to it and pushes nothing.
    pub async fn resolve_with_remote(&self) -> ReconcileState {
        let actions = self.shared.transition(Event::ResolvedWithRemote);
        self.run_actions(actions).await;
        self.state()
    }

    /// End the session: one best-effort flush, then the timer is disarmed.
    pub async fn close(self) {
        self.scheduler.flush().await;
        self.scheduler.cancel();
        tracing::debug!(session = %self.id, title = %self.shared.document.title, "sync session closed");
    }
}
