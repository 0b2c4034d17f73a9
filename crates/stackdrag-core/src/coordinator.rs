#![forbid(unsafe_code)]

//! The drag session coordinator.
//!
//! [`DragCoordinator`] owns at most one [`DragSession`] and advances it in
//! response to discrete events from the gesture layer. It consults the
//! [`DragRegistry`] and the source container's capabilities on pickup, runs
//! equivalence resolution on release, drives the [`Navigator`], and then
//! hands the committed drag to the source container together with a
//! single-use [`DoneHandle`].
//!
//! # Invariants
//!
//! 1. At most one session exists. `drag_started` outside `Idle` is rejected
//!    with [`DragError::Busy`].
//! 2. Every session ends in exactly one of: aborted (pickup checks fail or
//!    the gesture layer cancels before release), or finished (`done` fired
//!    while `Completing`).
//! 3. `Resolving` and `Transitioning` never outlive a `drag_released` call.
//! 4. The navigation stack is mutated only in `Transitioning`.
//! 5. `done` is the only way out of `Completing`; no timeout applies.
//! 6. A second `done` has no effect: the session is finished exactly once.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Fallback |
//! |---------|-------|----------|
//! | Pickup precondition fails | unregistered row, dragging disallowed, ... | `PickUp::Aborted`, nothing else happens |
//! | Gesture cancelled before release | released outside any surface | session aborted, no completion callback |
//! | `done` never called | collaborator contract violation | session stays in `Completing`; warning logged once after the stall threshold |
//! | every `DoneHandle` dropped unfired | collaborator contract violation | session stays in `Completing`; warning logged on the next poll |
//!
//! # Example
//!
//! ```ignore
//! let mut coordinator = DragCoordinator::new(CoordinatorConfig::default());
//! row.register_for_dragging(coordinator.registry_mut());
//!
//! match coordinator.drag_started(&row.cell(), &nav)? {
//!     PickUp::Armed => {}
//!     PickUp::Aborted(_) => return Ok(()), // gesture layer cancels visually
//! }
//! coordinator.drag_moved_over(Some(DropSurface::BackButton))?;
//! let release = coordinator.drag_released(&mut nav)?;
//! if release.finished.is_none() {
//!     // later, from the event loop:
//!     let finished = coordinator.poll();
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use web_time::{Duration, Instant};

use crate::capability::AdaptedContainer;
use crate::cell::{ContainerId, DragCell};
use crate::completion::CompletionSource;
use crate::config::CoordinatorConfig;
use crate::error::DragError;
use crate::navigation::Navigator;
use crate::registry::DragRegistry;
use crate::resolver::Resolution;
use crate::session::{AbortReason, DragPhase, DragSession, DropSurface, PhaseTransition};

/// Callback used to wake the host event loop when a completion arrives.
pub type CompletionWaker = Arc<dyn Fn() + Send + Sync>;

/// Outcome of a pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickUp {
    /// The session is live; move, cancel, or release events may follow.
    Armed,
    /// Preconditions failed; the gesture should be cancelled visually.
    Aborted(AbortReason),
}

/// A session that reached `done`.
#[derive(Debug, Clone)]
pub struct FinishedDrag {
    pub cell: DragCell,
    pub source: ContainerId,
    pub resolution: Resolution,
    /// Time from pickup to `done`.
    pub duration: Duration,
}

/// Result of a release.
#[derive(Debug, Clone)]
pub struct Release {
    pub resolution: Resolution,
    /// Set when the collaborator called `done` before returning.
    pub finished: Option<FinishedDrag>,
}

/// Drives drag sessions from pickup to completion.
pub struct DragCoordinator {
    config: CoordinatorConfig,
    registry: DragRegistry,
    session: Option<DragSession>,
    transitions: VecDeque<PhaseTransition>,
    waker: Option<CompletionWaker>,
}

impl fmt::Debug for DragCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragCoordinator")
            .field("phase", &self.phase())
            .field("session", &self.session)
            .field("registered", &self.registry.len())
            .finish()
    }
}

impl Default for DragCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl DragCoordinator {
    #[must_use]
    pub fn new(config: CoordinatorConfig) -> Self {
        let registry = DragRegistry::with_prune_watermark(config.registry_prune_watermark);
        Self {
            transitions: VecDeque::with_capacity(config.transition_log_capacity.min(64)),
            config,
            registry,
            session: None,
            waker: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &DragRegistry {
        &self.registry
    }

    /// Registry handed to rows for `register_for_dragging`.
    pub fn registry_mut(&mut self) -> &mut DragRegistry {
        &mut self.registry
    }

    /// Install a callback run (possibly from another thread) when a
    /// committed drag's `done` fires, so the host knows to call
    /// [`poll`](Self::poll).
    pub fn set_completion_waker(&mut self, waker: impl Fn() + Send + Sync + 'static) {
        self.waker = Some(Arc::new(waker));
    }

    /// Current phase; `Idle` when there is no session.
    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.session
            .as_ref()
            .map_or(DragPhase::Idle, DragSession::phase)
    }

    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// Take the recorded phase transitions, oldest first.
    pub fn drain_transitions(&mut self) -> Vec<PhaseTransition> {
        self.transitions.drain(..).collect()
    }

    // ========================================================================
    // Gesture events
    // ========================================================================

    /// A drag began on `cell`.
    ///
    /// Pickup checks run in order: registration, owning container present
    /// in the stack, drag capability present, row belongs to the container's
    /// list widget, dragging allowed, cell relevant. The first failure aborts
    /// the session before it is armed.
    pub fn drag_started<N: Navigator + ?Sized>(
        &mut self,
        cell: &DragCell,
        nav: &N,
    ) -> Result<PickUp, DragError> {
        let phase = self.phase();
        if !phase.accepts_new_drag() {
            return Err(DragError::Busy { phase });
        }

        let source = match self.pickup_source(cell, nav) {
            Ok(source) => source,
            Err(reason) => {
                tracing::debug!(cell = %cell.id, container = %cell.container, %reason, "drag pickup aborted");
                self.record(DragPhase::Idle, DragPhase::Aborted);
                self.record(DragPhase::Aborted, DragPhase::Idle);
                return Ok(PickUp::Aborted(reason));
            }
        };

        tracing::debug!(cell = %cell.id, source = %source.id(), "drag armed");
        self.session = Some(DragSession::new(source, *cell, Instant::now()));
        self.record(DragPhase::Idle, DragPhase::Armed);
        Ok(PickUp::Armed)
    }

    /// The pointer moved over `surface` (`None`: over nothing droppable).
    pub fn drag_moved_over(&mut self, surface: Option<DropSurface>) -> Result<(), DragError> {
        let session = self.live_session_mut()?;
        let from = session.phase;
        session.candidate = surface;
        if from == DragPhase::Armed {
            session.phase = DragPhase::Tracking;
            self.record(from, DragPhase::Tracking);
        }
        Ok(())
    }

    /// The gesture layer abandoned the drag before release.
    ///
    /// No completion callback is invoked.
    pub fn drag_cancelled(&mut self) -> Result<(), DragError> {
        let from = self.live_session_mut()?.phase;
        if let Some(session) = self.session.take() {
            tracing::debug!(cell = %session.cell.id, reason = %AbortReason::Cancelled, "drag cancelled");
        }
        self.record(from, DragPhase::Aborted);
        self.record(DragPhase::Aborted, DragPhase::Idle);
        Ok(())
    }

    /// The drag was released: resolve, navigate, and hand the result to the
    /// source container.
    pub fn drag_released<N: Navigator + ?Sized>(
        &mut self,
        nav: &mut N,
    ) -> Result<Release, DragError> {
        let from = self.live_session_mut()?.phase;
        let Some(mut session) = self.session.take() else {
            return Err(DragError::NoSession);
        };

        let span = tracing::debug_span!(
            "drag.session",
            cell = %session.cell.id,
            source = %session.source.id(),
            resolution = tracing::field::Empty,
        );
        let _guard = span.enter();

        // Resolving
        session.phase = DragPhase::Resolving;
        self.record(from, DragPhase::Resolving);
        let stack = nav.entries();
        let resolution = Resolution::resolve(
            &session.cell,
            &session.source,
            &stack,
            self.config.equivalence_scan_limit,
        );
        span.record("resolution", resolution.kind());

        // Transitioning
        session.phase = DragPhase::Transitioning;
        self.record(DragPhase::Resolving, DragPhase::Transitioning);
        let target = Rc::clone(resolution.target());
        let title = target.drag_title();
        match &resolution {
            Resolution::PushNew { .. } => {
                tracing::debug!(target = %target.id(), %title, "navigation push");
                nav.push(Rc::clone(&target), &title);
            }
            Resolution::PopToExisting {
                index, replaced, ..
            } => {
                tracing::debug!(index, %replaced, target = %target.id(), %title, "navigation pop to existing");
                nav.replace_from(*index, Rc::clone(&target), &title);
            }
        }

        // Completing
        session.phase = DragPhase::Completing;
        self.record(DragPhase::Transitioning, DragPhase::Completing);
        let completion = CompletionSource::new();
        if let Some(waker) = &self.waker {
            let waker = Arc::clone(waker);
            completion.set_waker(move || waker());
        }
        let done = completion.handle();
        session.completion = Some(completion);
        session.resolution = Some(resolution.clone());
        session.completing_since = Some(Instant::now());

        let source = session.source.clone();
        let cell = session.cell;
        self.session = Some(session);
        source.complete_drag_of_cell(&cell, &target, done);

        let finished = self.poll();
        Ok(Release {
            resolution,
            finished,
        })
    }

    /// Check whether the committed drag's `done` has fired.
    ///
    /// Returns the finished session exactly once. While still waiting, logs a
    /// single warning: at once if every `DoneHandle` was dropped unfired,
    /// otherwise after the configured stall threshold.
    pub fn poll(&mut self) -> Option<FinishedDrag> {
        let session = self.session.as_mut()?;
        if session.phase != DragPhase::Completing {
            return None;
        }

        if !session.is_fulfilled() {
            if session.stall_reported {
                return None;
            }
            if session.is_abandoned() {
                session.stall_reported = true;
                tracing::warn!(
                    cell = %session.cell.id,
                    source = %session.source.id(),
                    "drag completion abandoned: every done handle dropped; new drags are blocked"
                );
                return None;
            }
            if let (Some(threshold), Some(since)) =
                (self.config.stall_warning_after(), session.completing_since)
            {
                let waited = since.elapsed();
                if waited >= threshold {
                    session.stall_reported = true;
                    tracing::warn!(
                        cell = %session.cell.id,
                        source = %session.source.id(),
                        waited_ms = waited.as_millis() as u64,
                        "drag completion has not called done(); new drags are blocked"
                    );
                }
            }
            return None;
        }

        let session = self.session.take()?;
        self.record(DragPhase::Completing, DragPhase::Idle);
        let resolution = session.resolution?;
        let duration = session.started_at.elapsed();
        tracing::debug!(
            cell = %session.cell.id,
            source = %session.source.id(),
            resolution = resolution.kind(),
            duration_us = duration.as_micros() as u64,
            "drag finished"
        );
        Some(FinishedDrag {
            cell: session.cell,
            source: session.source.id(),
            resolution,
            duration,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn pickup_source<N: Navigator + ?Sized>(
        &self,
        cell: &DragCell,
        nav: &N,
    ) -> Result<AdaptedContainer, AbortReason> {
        if !self.registry.is_registered(cell) {
            return Err(AbortReason::NotRegistered);
        }
        let entry = nav.find(cell.container).ok_or(AbortReason::UnknownContainer)?;
        let container = entry.capability.ok_or(AbortReason::MissingCapability)?;
        let source = AdaptedContainer::adapt(container);
        if source.container_view() != cell.view {
            return Err(AbortReason::ForeignRow);
        }
        if !source.dragging_allowed() {
            return Err(AbortReason::DraggingDisallowed);
        }
        if !source.is_drag_cell_relevant(cell) {
            return Err(AbortReason::CellNotRelevant);
        }
        Ok(source)
    }

    /// The session, if it can still take gesture events.
    fn live_session_mut(&mut self) -> Result<&mut DragSession, DragError> {
        match self.session.as_mut() {
            None => Err(DragError::NoSession),
            Some(session) if session.phase.is_cancellable() => Ok(session),
            Some(_) => Err(DragError::Committed),
        }
    }

    fn record(&mut self, from: DragPhase, to: DragPhase) {
        tracing::debug!(%from, %to, "drag phase transition");
        if self.transitions.len() >= self.config.transition_log_capacity.max(1) {
            self.transitions.pop_front();
        }
        self.transitions.push_back(PhaseTransition::new(from, to));
    }
}
