#![forbid(unsafe_code)]

//! Registry of rows that opted into drag participation.
//!
//! Rows are recreated and reused by the rendering layer constantly, and each
//! reuse cycle calls [`Row::register_for_dragging`]. Registration therefore
//! has to be cheap, idempotent, and must not keep dead rows alive.
//!
//! # Invariants
//!
//! 1. Registering the same row N ≥ 1 times is indistinguishable from
//!    registering it once.
//! 2. Absence means "not draggable".
//! 3. Entries hold the row weakly: once the rendering layer drops a row, its
//!    entry no longer counts as registered and is swept on the next prune.
//!
//! # Memory Model
//!
//! ```text
//! register(row)          entries: { cell#1 → weak(row1), cell#2 → weak(row2) }
//! drop(row1)             entries: { cell#1 → dead,       cell#2 → weak(row2) }
//! len() == watermark     prune → { cell#2 → weak(row2) }, watermark = max(2·live, base)
//! ```

use std::rc::Weak;

use ahash::AHashMap;

use crate::cell::{CellId, DragCell, Row, RowInner};

/// Default size at which dead entries are swept.
pub const DEFAULT_PRUNE_WATERMARK: usize = 256;

/// Tracks which rows may start a drag.
#[derive(Debug)]
pub struct DragRegistry {
    entries: AHashMap<CellId, Weak<RowInner>>,
    base_watermark: usize,
    watermark: usize,
}

impl Default for DragRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DragRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_prune_watermark(DEFAULT_PRUNE_WATERMARK)
    }

    /// Create a registry that sweeps dead rows once it holds `watermark`
    /// entries. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_prune_watermark(watermark: usize) -> Self {
        let watermark = watermark.max(1);
        Self {
            entries: AHashMap::new(),
            base_watermark: watermark,
            watermark,
        }
    }

    /// Mark a row as draggable. Idempotent.
    pub fn register(&mut self, row: &Row) {
        let id = row.id();
        match self.entries.get(&id) {
            Some(existing) if existing.strong_count() > 0 => return,
            _ => {}
        }
        self.entries.insert(id, row.downgrade());
        tracing::trace!(cell = %id, entries = self.entries.len(), "row registered for dragging");

        if self.entries.len() >= self.watermark {
            self.prune();
        }
    }

    /// Whether the row behind `cell` is registered and still alive.
    #[must_use]
    pub fn is_registered(&self, cell: &DragCell) -> bool {
        self.is_registered_id(cell.id)
    }

    /// Same as [`is_registered`](Self::is_registered), keyed by id.
    #[must_use]
    pub fn is_registered_id(&self, id: CellId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Drop entries whose rows no longer exist. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        let removed = before - self.entries.len();
        self.watermark = (self.entries.len() * 2).max(self.base_watermark);
        tracing::trace!(
            removed,
            live = self.entries.len(),
            watermark = self.watermark,
            "drag registry pruned"
        );
        removed
    }

    /// Number of entries, including dead ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries whose rows are still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
