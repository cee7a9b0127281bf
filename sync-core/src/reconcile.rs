//! Reconciliation state machine for kosync.
//!
//! Decides, once per opened document, whether local and remote progress agree
//! and if not which one wins. Like the rest of this crate the machine takes
//! events and returns a new state plus a list of actions; fetching, pushing and
//! navigating are performed by sync-client.
//!
//! ```text
//! idle ──opened──▶ checking ──fetched──▶ synced | conflict
//!   │                  └──fetch failed──▶ error
//!   └──opened (send)──▶ synced
//! conflict ──resolved──▶ synced
//! ```

use sync_types::{RemoteProgress, SyncStrategy};

use crate::position::{local_preview, positions_equal, remote_preview, Layout, Position};

/// Local side of a reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSnapshot {
    /// Current position
    pub position: Position,
    /// When the position was last changed locally, in Unix milliseconds
    pub updated_at_ms: i64,
    /// Label of the current section (chapter title), if any
    pub section_label: Option<String>,
}

/// Strategy and tolerance in force for one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePolicy {
    /// Reconciliation policy
    pub strategy: SyncStrategy,
    /// Equality threshold between completion fractions
    pub tolerance: f64,
}

/// Everything a conflict prompt needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictDetails {
    /// Preview of the local position
    pub local_preview: String,
    /// Preview of the remote position
    pub remote_preview: String,
    /// Canonical local pointer, if any
    pub local_pointer: Option<String>,
    /// The remote record as fetched
    pub remote: RemoteProgress,
}

/// Reconciliation state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileState {
    /// Nothing has happened yet, or sync is inactive for this document.
    Idle,
    /// Waiting for the remote record.
    Checking {
        /// Policy captured when the document was opened.
        policy: ReconcilePolicy,
    },
    /// Positions differ and the user must choose.
    Conflict(Box<ConflictDetails>),
    /// Reconciled; local movement may be pushed.
    Synced,
    /// The remote record could not be fetched.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ReconcileState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Idle
            (Self::Idle, Event::Opened { policy, ready }) => {
                if !ready || policy.strategy == SyncStrategy::Disabled {
                    (Self::Idle, vec![])
                } else if policy.strategy == SyncStrategy::Send {
                    (Self::Synced, vec![Action::SchedulePush])
                } else {
                    (Self::Checking { policy }, vec![Action::FetchRemote])
                }
            }

            // From Checking
            (Self::Checking { policy }, Event::RemoteFetched { remote, local }) => {
                decide(policy, remote, local)
            }
            (Self::Checking { .. }, Event::FetchFailed { error }) => {
                (Self::Error { message: error }, vec![])
            }

            // From Conflict
            (Self::Conflict(_), Event::ResolvedWithLocal) => (Self::Synced, vec![Action::PushNow]),
            (Self::Conflict(details), Event::ResolvedWithRemote) => (
                Self::Synced,
                vec![
                    Action::ApplyRemote(details.remote),
                    Action::Notify(SyncNotice::ProgressSynced),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Whether local movement may now be pushed.
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }

    /// Whether reconciliation has run to an outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Synced | Self::Conflict(_) | Self::Error { .. })
    }

    /// Conflict details, while in conflict.
    pub fn conflict(&self) -> Option<&ConflictDetails> {
        match self {
            Self::Conflict(details) => Some(details),
            _ => None,
        }
    }

    /// Short lowercase name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking { .. } => "checking",
            Self::Conflict(_) => "conflict",
            Self::Synced => "synced",
            Self::Error { .. } => "error",
        }
    }
}

impl Default for ReconcileState {
    fn default() -> Self {
        Self::new()
    }
}

fn decide(
    policy: ReconcilePolicy,
    remote: Option<RemoteProgress>,
    local: LocalSnapshot,
) -> (ReconcileState, Vec<Action>) {
    let remote = match remote.filter(|r| r.has_document() && r.is_usable()) {
        Some(remote) => remote,
        None => {
            // Never synced: local stands and goes out right away.
            let actions = if policy.strategy == SyncStrategy::Receive {
                vec![]
            } else {
                vec![Action::PushNow]
            };
            return (ReconcileState::Synced, actions);
        }
    };

    if positions_equal(&local.position, &remote, policy.tolerance) {
        return (ReconcileState::Synced, vec![Action::AdoptLocalBaseline]);
    }

    let remote_is_newer = remote
        .timestamp_millis()
        .is_some_and(|remote_ms| remote_ms > local.updated_at_ms);

    match policy.strategy {
        SyncStrategy::Receive => apply_remote(remote),
        SyncStrategy::Silent if remote_is_newer => apply_remote(remote),
        SyncStrategy::Prompt => {
            let layout = local.position.layout();
            let local_total = if layout == Layout::Fixed {
                local.position.page_total()
            } else {
                0
            };
            let details = ConflictDetails {
                local_preview: local_preview(&local.position, local.section_label.as_deref()),
                remote_preview: remote_preview(&remote, layout, local_total),
                local_pointer: local.position.pointer().map(str::to_string),
                remote,
            };
            (
                ReconcileState::Conflict(Box::new(details)),
                vec![Action::Notify(SyncNotice::ConflictDetected)],
            )
        }
        // Local wins silently.
        _ => (ReconcileState::Synced, vec![]),
    }
}

fn apply_remote(remote: RemoteProgress) -> (ReconcileState, Vec<Action>) {
    (
        ReconcileState::Synced,
        vec![
            Action::ApplyRemote(remote),
            Action::Notify(SyncNotice::ProgressSynced),
        ],
    )
}

/// Events that drive reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The document was opened.
    Opened {
        /// Strategy and tolerance from the settings.
        policy: ReconcilePolicy,
        /// Credentials and a digest are both present.
        ready: bool,
    },
    /// The remote fetch completed (`None` = never synced).
    RemoteFetched {
        /// The remote record.
        remote: Option<RemoteProgress>,
        /// The local side at the time the fetch completed.
        local: LocalSnapshot,
    },
    /// The remote fetch failed.
    FetchFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The user kept the local position.
    ResolvedWithLocal,
    /// The user took the remote position.
    ResolvedWithRemote,
}

/// Actions to be executed by the sync-client.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Fetch the remote record.
    FetchRemote,
    /// Schedule a debounced push of the current position.
    SchedulePush,
    /// Push the current position now, bypassing the debounce.
    PushNow,
    /// Treat the current local position as already pushed.
    AdoptLocalBaseline,
    /// Navigate the view to the remote record's position.
    ApplyRemote(RemoteProgress),
    /// Emit a notice to the application.
    Notify(SyncNotice),
}

/// Notices emitted to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncNotice {
    /// The view was moved to the synced position ("Reading Progress Synced").
    ProgressSynced,
    /// Local and remote disagree and the user must choose.
    ConflictDetected,
}
