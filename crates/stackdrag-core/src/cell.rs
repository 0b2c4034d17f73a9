#![forbid(unsafe_code)]

//! Identities for containers, list widgets, and draggable rows.
//!
//! Rows are recycled by the rendering layer far more often than the data
//! behind them changes, so a [`CellId`] identifies a *visual row*, not the
//! item it currently shows. The rendering layer owns each [`Row`]; the core
//! only ever sees [`DragCell`] snapshots, which refer to their container by
//! [`ContainerId`] rather than holding it.
//!
//! # Invariants
//!
//! 1. Ids minted by `next()` are unique for the lifetime of the process.
//! 2. A `DragCell` never owns or keeps alive its container.
//! 3. A `Row`'s identity is stable across [`Row::reuse`]; only the index moves.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::DragRegistry;

static CONTAINER_COUNTER: AtomicU64 = AtomicU64::new(1);
static VIEW_COUNTER: AtomicU64 = AtomicU64::new(1);
static CELL_COUNTER: AtomicU64 = AtomicU64::new(1);

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Mint a fresh, process-unique id.
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Wrap a raw value (replay and tests).
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw numeric value.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a container (a screen participating in dragging).
    ContainerId,
    CONTAINER_COUNTER,
    "container"
);

id_type!(
    /// Identity of the list widget a container exposes through
    /// [`DragContainer::container_view`](crate::DragContainer::container_view).
    ListViewId,
    VIEW_COUNTER,
    "view"
);

id_type!(
    /// Identity of a visual row. Stable per row, not per data item.
    CellId,
    CELL_COUNTER,
    "cell"
);

// ---------------------------------------------------------------------------
// DragCell
// ---------------------------------------------------------------------------

/// Snapshot of a row handed across the capability boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DragCell {
    /// Identity of the visual row.
    pub id: CellId,
    /// Lookup key of the owning container.
    pub container: ContainerId,
    /// List widget the row is displayed in.
    pub view: ListViewId,
    /// Row index at the time of the snapshot.
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct RowInner {
    pub(crate) id: CellId,
    container: ContainerId,
    view: ListViewId,
    index: std::cell::Cell<usize>,
}

/// A visual row owned by the rendering layer.
///
/// Cloning a `Row` clones the handle, not the identity. When the last handle
/// is dropped the row is gone and any registry entry for it stops counting
/// as registered.
#[derive(Debug, Clone)]
pub struct Row {
    inner: Rc<RowInner>,
}

impl Row {
    /// Create a row with a fresh identity.
    #[must_use]
    pub fn new(container: ContainerId, view: ListViewId, index: usize) -> Self {
        Self::with_id(CellId::next(), container, view, index)
    }

    /// Create a row with an explicit identity.
    #[must_use]
    pub fn with_id(id: CellId, container: ContainerId, view: ListViewId, index: usize) -> Self {
        Self {
            inner: Rc::new(RowInner {
                id,
                container,
                view,
                index: std::cell::Cell::new(index),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    #[must_use]
    pub fn container(&self) -> ContainerId {
        self.inner.container
    }

    /// Current row index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.inner.index.get()
    }

    /// Point a recycled row at a new index. Identity is unchanged.
    pub fn reuse(&self, index: usize) {
        self.inner.index.set(index);
    }

    /// Snapshot for handing to the coordinator.
    #[must_use]
    pub fn cell(&self) -> DragCell {
        DragCell {
            id: self.inner.id,
            container: self.inner.container,
            view: self.inner.view,
            index: self.inner.index.get(),
        }
    }

    /// Opt this row into dragging.
    ///
    /// Safe to call on every reuse cycle; repeated calls do not accumulate
    /// state.
    pub fn register_for_dragging(&self, registry: &mut DragRegistry) {
        registry.register(self);
    }

    pub(crate) fn downgrade(&self) -> Weak<RowInner> {
        Rc::downgrade(&self.inner)
    }
}
