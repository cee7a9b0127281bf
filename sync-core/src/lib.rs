//! # sync-core
//!
//! Pure logic for kosync (no I/O, instant tests).
//!
//! This crate implements the algorithms and the reconciliation state machine
//! for reading-progress sync without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, timers, the reader view) is handled by
//! `sync-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod digest;
pub mod gate;
pub mod position;
pub mod reconcile;

pub use digest::{
    document_digest, filename_stem, partial_md5, partial_md5_reader, DocumentIdentity,
};
pub use gate::{PushContext, PushDecision, PushGate, SuppressReason};
pub use position::{
    collapse_to_start, decode_remote, encode, local_preview, positions_equal, remote_preview,
    Decoded, Encoded, Layout, PointerTranslator, Position, RemoteTarget, TranslationError,
    WireProgress,
};
pub use reconcile::{
    Action, ConflictDetails, Event, LocalSnapshot, ReconcilePolicy, ReconcileState, SyncNotice,
};
