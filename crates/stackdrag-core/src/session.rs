#![forbid(unsafe_code)]

//! Drag session values: phases, abort reasons, and the per-gesture state.
//!
//! # State Machine
//!
//! ```text
//!            pickup checks pass
//!   Idle ─────────────────────────► Armed ──move──► Tracking
//!    ▲  │                             │                 │
//!    │  │ pickup checks fail          └──── release ────┤
//!    │  ▼                                               ▼
//!    │ Aborted ◄──── cancel (Armed / Tracking) ──── Resolving
//!    │  │                                               │
//!    ├──┘                                               ▼
//!    │                                            Transitioning
//!    │                                                  │
//!    └────────────── done() ────────────── Completing ◄─┘
//! ```
//!
//! `Resolving` and `Transitioning` are entered and left within a single
//! release call. `Completing` is the only phase that waits on a collaborator.

use std::fmt;

use web_time::Instant;

use crate::capability::AdaptedContainer;
use crate::cell::{ContainerId, DragCell};
use crate::completion::CompletionSource;
use crate::resolver::Resolution;

// ---------------------------------------------------------------------------
// DragPhase
// ---------------------------------------------------------------------------

/// Phase of the coordinator's current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DragPhase {
    /// No session.
    #[default]
    Idle,
    /// A registered, relevant cell was picked up.
    Armed,
    /// The pointer has moved; the candidate surface is being tracked.
    Tracking,
    /// Released; searching the stack for an equivalent entry.
    Resolving,
    /// The navigation layer is pushing or replacing.
    Transitioning,
    /// Waiting for the source container's `done`.
    Completing,
    /// The session ended without committing to a target.
    Aborted,
}

impl DragPhase {
    /// Whether a new gesture may start.
    #[must_use]
    pub const fn accepts_new_drag(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the session may still be cancelled by the gesture layer.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Armed | Self::Tracking)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Tracking => "tracking",
            Self::Resolving => "resolving",
            Self::Transitioning => "transitioning",
            Self::Completing => "completing",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for DragPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: DragPhase,
    pub to: DragPhase,
}

impl PhaseTransition {
    #[must_use]
    pub const fn new(from: DragPhase, to: DragPhase) -> Self {
        Self { from, to }
    }
}

// ---------------------------------------------------------------------------
// AbortReason
// ---------------------------------------------------------------------------

/// Why a session ended without committing.
///
/// None of these are errors; the gesture layer simply cancels the visual
/// drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// The row never registered for dragging, or has since been dropped.
    NotRegistered,
    /// The cell's container is not in the navigation stack.
    UnknownContainer,
    /// The owning screen does not implement the drag capability.
    MissingCapability,
    /// The row is not part of the container's list widget.
    ForeignRow,
    /// The container's dragging-allowed check said no.
    DraggingDisallowed,
    /// The container rejected the cell.
    CellNotRelevant,
    /// The gesture layer cancelled before release.
    Cancelled,
}

impl AbortReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRegistered => "not_registered",
            Self::UnknownContainer => "unknown_container",
            Self::MissingCapability => "missing_capability",
            Self::ForeignRow => "foreign_row",
            Self::DraggingDisallowed => "dragging_disallowed",
            Self::CellNotRelevant => "cell_not_relevant",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DropSurface
// ---------------------------------------------------------------------------

/// What the pointer is currently over, as reported by the gesture layer.
///
/// Used for visual feedback only; resolution happens on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropSurface {
    /// The list of a container.
    Container(ContainerId),
    /// The navigation bar's back control.
    BackButton,
}

// ---------------------------------------------------------------------------
// DragSession
// ---------------------------------------------------------------------------

/// State of one drag gesture, from pickup to completion.
pub struct DragSession {
    pub(crate) source: AdaptedContainer,
    pub(crate) cell: DragCell,
    pub(crate) candidate: Option<DropSurface>,
    pub(crate) phase: DragPhase,
    pub(crate) resolution: Option<Resolution>,
    pub(crate) completion: Option<CompletionSource>,
    pub(crate) started_at: Instant,
    pub(crate) completing_since: Option<Instant>,
    pub(crate) stall_reported: bool,
}

impl fmt::Debug for DragSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragSession")
            .field("source", &self.source.id())
            .field("cell", &self.cell.id)
            .field("candidate", &self.candidate)
            .field("phase", &self.phase)
            .field("resolution", &self.resolution)
            .finish()
    }
}

impl DragSession {
    pub(crate) fn new(source: AdaptedContainer, cell: DragCell, now: Instant) -> Self {
        Self {
            source,
            cell,
            candidate: None,
            phase: DragPhase::Armed,
            resolution: None,
            completion: None,
            started_at: now,
            completing_since: None,
            stall_reported: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    #[must_use]
    pub fn cell(&self) -> &DragCell {
        &self.cell
    }

    #[must_use]
    pub fn source(&self) -> &AdaptedContainer {
        &self.source
    }

    /// Surface the pointer was last reported over.
    #[must_use]
    pub fn candidate(&self) -> Option<DropSurface> {
        self.candidate
    }

    /// Committed resolution, once released.
    #[must_use]
    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub(crate) fn is_fulfilled(&self) -> bool {
        self.completion
            .as_ref()
            .is_some_and(CompletionSource::is_fulfilled)
    }

    /// Every `DoneHandle` is gone and `done` never fired.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.completion
            .as_ref()
            .is_some_and(CompletionSource::is_abandoned)
    }
}
