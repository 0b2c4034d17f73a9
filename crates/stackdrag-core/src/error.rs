#![forbid(unsafe_code)]

//! Errors for host-side protocol misuse.
//!
//! Pickup precondition failures are *not* errors; they surface as
//! [`PickUp::Aborted`](crate::PickUp::Aborted). A `DragError` means the host
//! delivered an event the current phase cannot accept.

use thiserror::Error;

use crate::session::DragPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DragError {
    /// A new drag was started while another session is live.
    #[error("a drag session is already active (phase: {phase})")]
    Busy { phase: DragPhase },
    /// A move, release, or cancel arrived with no session.
    #[error("no drag session is active")]
    NoSession,
    /// The session already committed to a target and waits for `done`.
    #[error("drag session already committed; waiting for completion")]
    Committed,
}
