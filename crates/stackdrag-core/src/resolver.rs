#![forbid(unsafe_code)]

//! Equivalence resolution against the live navigation stack.
//!
//! On release the coordinator must decide whether the dragged cell's target
//! already lives somewhere in the stack. If it does, the drag resolves to
//! *pop-to-existing* and no duplicate entry is ever pushed; otherwise it
//! resolves to *push-new*.
//!
//! # Invariants
//!
//! 1. The scan runs from the most recently pushed entry towards the bottom;
//!    the first match wins, so the nearest equivalent screen is preferred.
//! 2. Entries without the drag capability, and entries the source container
//!    deems irrelevant, are skipped before any mandatory method is called.
//! 3. The whole stack is always scanned. A `limit` only marks the check
//!    count past which a single warning is logged for the release.
//!
//! # Failure Modes
//!
//! - Two mutually equivalent entries in the stack are not detected; the
//!   upper one wins. Always resolving before pushing keeps this from arising.

use std::fmt;
use std::rc::Rc;

use crate::capability::{AdaptedContainer, DragContainer};
use crate::cell::{ContainerId, DragCell};
use crate::navigation::StackEntry;

/// A stack entry equivalent to the dragged cell's target.
#[derive(Clone)]
pub struct EquivalentEntry {
    /// Slot of the entry, counted from the bottom of the stack.
    pub index: usize,
    pub container: Rc<dyn DragContainer>,
}

impl fmt::Debug for EquivalentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquivalentEntry")
            .field("index", &self.index)
            .field("container", &self.container.id())
            .finish()
    }
}

/// Find the nearest stack entry that already represents `cell`'s target.
///
/// `stack` is ordered bottom first. Exceeding `limit` equivalence checks
/// logs one warning and the scan carries on to the bottom of the stack.
#[must_use]
pub fn find_equivalent_in_stack(
    cell: &DragCell,
    source: &AdaptedContainer,
    stack: &[StackEntry],
    limit: Option<usize>,
) -> Option<EquivalentEntry> {
    let mut checks = 0usize;
    for (index, entry) in stack.iter().enumerate().rev() {
        let Some(candidate) = entry.capability.as_ref() else {
            continue;
        };
        if !source.is_view_relevant(&**candidate) {
            continue;
        }
        checks += 1;
        if let Some(max) = limit.filter(|&max| checks - 1 == max) {
            tracing::warn!(cell = %cell.id, limit = max, depth = stack.len(), "equivalence scan exceeded its check limit; continuing");
        }
        if source.is_cell_equivalent_to_target(cell, &**candidate) {
            tracing::debug!(cell = %cell.id, index, target = %entry.id, checks, "equivalent entry found");
            return Some(EquivalentEntry {
                index,
                container: Rc::clone(candidate),
            });
        }
    }
    tracing::debug!(cell = %cell.id, checks, "no equivalent entry in stack");
    None
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// How a released drag lands in the navigation hierarchy.
#[derive(Clone)]
pub enum Resolution {
    /// A fresh container from `drag_target_from_cell` is pushed.
    PushNew { target: Rc<dyn DragContainer> },
    /// The stack is truncated to `index` and a fresh container representing
    /// the equivalent entry takes its slot. The old instance is discarded.
    PopToExisting {
        index: usize,
        replaced: ContainerId,
        target: Rc<dyn DragContainer>,
    },
}

impl Resolution {
    /// Decide between push-new and pop-to-existing for `cell`.
    ///
    /// Target containers are always fresh instances produced by `source`.
    #[must_use]
    pub fn resolve(
        cell: &DragCell,
        source: &AdaptedContainer,
        stack: &[StackEntry],
        limit: Option<usize>,
    ) -> Self {
        match find_equivalent_in_stack(cell, source, stack, limit) {
            Some(existing) => Self::PopToExisting {
                index: existing.index,
                replaced: existing.container.id(),
                target: source.drag_target_for(&*existing.container),
            },
            None => Self::PushNew {
                target: source.drag_target_from_cell(cell),
            },
        }
    }

    /// The container the navigation layer will show.
    #[must_use]
    pub fn target(&self) -> &Rc<dyn DragContainer> {
        match self {
            Self::PushNew { target } | Self::PopToExisting { target, .. } => target,
        }
    }

    #[must_use]
    pub fn is_push_new(&self) -> bool {
        matches!(self, Self::PushNew { .. })
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PushNew { .. } => "push_new",
            Self::PopToExisting { .. } => "pop_to_existing",
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushNew { target } => f
                .debug_struct("PushNew")
                .field("target", &target.id())
                .finish(),
            Self::PopToExisting {
                index,
                replaced,
                target,
            } => f
                .debug_struct("PopToExisting")
                .field("index", index)
                .field("replaced", replaced)
                .field("target", &target.id())
                .finish(),
        }
    }
}
