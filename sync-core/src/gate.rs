//! Push gating for kosync.
//!
//! Every outbound push passes through [`PushGate::check`] right before it is
//! sent. The gate holds the last value actually sent during this session so
//! that pushing an unchanged position is a no-op.

use sync_types::SyncStrategy;

/// Why a push was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Strategy is `receive` or `disabled`
    StrategyForbids,
    /// No username or userkey
    MissingCredentials,
    /// No digest could be derived for the document
    MissingDigest,
    /// Same encoded position as the last push
    Unchanged,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    /// Go ahead.
    Send,
    /// Do not send.
    Suppressed(SuppressReason),
}

impl PushDecision {
    /// Whether the push should go out.
    pub fn is_send(&self) -> bool {
        matches!(self, PushDecision::Send)
    }
}

/// What the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct PushContext<'a> {
    /// Strategy currently configured
    pub strategy: SyncStrategy,
    /// Username and userkey are present
    pub has_credentials: bool,
    /// A digest is derivable
    pub has_digest: bool,
    /// Encoded `progress` value about to be sent
    pub progress: &'a str,
}

/// Last-pushed cache for one document session.
#[derive(Debug, Clone, Default)]
pub struct PushGate {
    last_pushed: Option<String>,
}

impl PushGate {
    /// Create an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a push may go out.
    pub fn check(&self, ctx: PushContext<'_>) -> PushDecision {
        if !ctx.strategy.allows_push() {
            PushDecision::Suppressed(SuppressReason::StrategyForbids)
        } else if !ctx.has_credentials {
            PushDecision::Suppressed(SuppressReason::MissingCredentials)
        } else if !ctx.has_digest {
            PushDecision::Suppressed(SuppressReason::MissingDigest)
        } else if self.last_pushed.as_deref() == Some(ctx.progress) {
            PushDecision::Suppressed(SuppressReason::Unchanged)
        } else {
            PushDecision::Send
        }
    }

    /// Remember a value the server accepted (or that is known to match it).
    pub fn record(&mut self, progress: impl Into<String>) {
        self.last_pushed = Some(progress.into());
    }

    /// Last value recorded.
    pub fn last_pushed(&self) -> Option<&str> {
        self.last_pushed.as_deref()
    }
}
