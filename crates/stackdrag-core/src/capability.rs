#![forbid(unsafe_code)]

//! The capability contract containers implement to take part in dragging.
//!
//! A container is any screen that hosts a list widget of rows. Implementing
//! [`DragContainer`] lets its rows be dragged out of it and lets it be a
//! destination. Two capabilities are optional; they are declared through
//! [`OptionalCapabilities`] and resolved exactly once, when the container is
//! wrapped into an [`AdaptedContainer`]. The session state machine never asks
//! whether a container "supports" something.
//!
//! # Contract
//!
//! | Method | Cost | Notes |
//! |--------|------|-------|
//! | `is_drag_cell_relevant` | cheap | pickup pre-check |
//! | `is_cell_equivalent_to_target` | cheap | runs against every stack entry on release |
//! | `drag_target_from_cell` | factory | must return a fresh instance |
//! | `drag_target_for` | factory | must return a fresh instance, even though `existing` is live |
//! | `complete_drag_of_cell` | unbounded | must call `done` on every exit path |
//!
//! Nothing here returns `Result`: every fallible check is a boolean.
//!
//! # Example
//!
//! ```ignore
//! struct Folder { id: ContainerId, view: ListViewId, path: String }
//!
//! impl DragContainer for Folder {
//!     fn id(&self) -> ContainerId { self.id }
//!     fn container_view(&self) -> ListViewId { self.view }
//!     fn is_drag_cell_relevant(&self, cell: &DragCell) -> bool { self.entry(cell).is_some() }
//!     // ...
//!     fn complete_drag_of_cell(&self, cell: &DragCell, target: &Rc<dyn DragContainer>, done: DoneHandle) {
//!         let result = self.move_entry(cell, target);
//!         if let Err(err) = result { self.show_error(err); }
//!         done.done();
//!     }
//! }
//! ```

use std::fmt;
use std::rc::Rc;

use crate::cell::{ContainerId, DragCell, ListViewId};
use crate::completion::DoneHandle;

/// Relevance of another container as a drag destination.
pub type RelevanceCheck = Rc<dyn Fn(&dyn DragContainer) -> bool>;

/// Whether dragging out of this container is currently allowed.
pub type AllowedCheck = Rc<dyn Fn() -> bool>;

// ---------------------------------------------------------------------------
// DragContainer
// ---------------------------------------------------------------------------

/// Mandatory capability set of a container participating in dragging.
pub trait DragContainer {
    /// Stable identity of this container instance.
    fn id(&self) -> ContainerId;

    /// The list widget whose rows may originate drags.
    fn container_view(&self) -> ListViewId;

    /// Quick check whether `cell` may be picked up at all.
    fn is_drag_cell_relevant(&self, cell: &DragCell) -> bool;

    /// Whether dropping `cell` would land on something `target` already
    /// represents. Must be cheap.
    fn is_cell_equivalent_to_target(&self, cell: &DragCell, target: &dyn DragContainer) -> bool;

    /// Fresh container representing the content of `cell`.
    ///
    /// Used when dragging deeper into the hierarchy. Called on the container
    /// holding the cell.
    fn drag_target_from_cell(&self, cell: &DragCell) -> Rc<dyn DragContainer>;

    /// Fresh container representing the content of `existing`.
    ///
    /// Used when dragging back out to a screen already in the stack. A new
    /// instance is required even though `existing` is live.
    fn drag_target_for(&self, existing: &dyn DragContainer) -> Rc<dyn DragContainer>;

    /// Title shown in navigation chrome while this container is current.
    fn drag_title(&self) -> String;

    /// Perform the result of the drag. Called on the container where the
    /// drag started.
    ///
    /// `done` must be called on every exit path, success or failure, or the
    /// drag session is never left.
    fn complete_drag_of_cell(&self, cell: &DragCell, target: &Rc<dyn DragContainer>, done: DoneHandle);

    /// Optional capabilities. Defaults to none implemented.
    fn optional_capabilities(&self) -> OptionalCapabilities {
        OptionalCapabilities::default()
    }
}

// ---------------------------------------------------------------------------
// OptionalCapabilities
// ---------------------------------------------------------------------------

/// Optional hooks a container may provide.
///
/// `None` means "not implemented"; [`AdaptedContainer::adapt`] substitutes
/// the defaults.
#[derive(Clone, Default)]
pub struct OptionalCapabilities {
    /// Whether another container is a relevant destination.
    /// Default: every container implementing [`DragContainer`] is relevant.
    pub view_relevance: Option<RelevanceCheck>,
    /// Whether dragging is currently allowed from this container.
    /// Default: always allowed.
    pub dragging_allowed: Option<AllowedCheck>,
}

impl fmt::Debug for OptionalCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionalCapabilities")
            .field("view_relevance", &self.view_relevance.is_some())
            .field("dragging_allowed", &self.dragging_allowed.is_some())
            .finish()
    }
}

impl OptionalCapabilities {
    /// Provide a custom destination relevance check.
    #[must_use]
    pub fn with_view_relevance(mut self, check: impl Fn(&dyn DragContainer) -> bool + 'static) -> Self {
        self.view_relevance = Some(Rc::new(check));
        self
    }

    /// Provide a dragging-enabled check.
    #[must_use]
    pub fn with_dragging_allowed(mut self, check: impl Fn() -> bool + 'static) -> Self {
        self.dragging_allowed = Some(Rc::new(check));
        self
    }
}

// ---------------------------------------------------------------------------
// AdaptedContainer
// ---------------------------------------------------------------------------

fn always_relevant(_: &dyn DragContainer) -> bool {
    true
}

fn always_allowed() -> bool {
    true
}

/// A container with its optional capabilities resolved to concrete checks.
///
/// This is the only form the coordinator and resolver consume.
#[derive(Clone)]
pub struct AdaptedContainer {
    inner: Rc<dyn DragContainer>,
    view_relevance: RelevanceCheck,
    dragging_allowed: AllowedCheck,
}

impl fmt::Debug for AdaptedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptedContainer")
            .field("id", &self.inner.id())
            .finish()
    }
}

impl AdaptedContainer {
    /// Resolve `container`'s optional capabilities, applying defaults.
    #[must_use]
    pub fn adapt(container: Rc<dyn DragContainer>) -> Self {
        let options = container.optional_capabilities();
        let view_relevance: RelevanceCheck = match options.view_relevance {
            Some(check) => check,
            None => Rc::new(always_relevant),
        };
        let dragging_allowed: AllowedCheck = match options.dragging_allowed {
            Some(check) => check,
            None => Rc::new(always_allowed),
        };
        Self {
            inner: container,
            view_relevance,
            dragging_allowed,
        }
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.inner.id()
    }

    /// The wrapped container.
    #[must_use]
    pub fn container(&self) -> &Rc<dyn DragContainer> {
        &self.inner
    }

    #[must_use]
    pub fn dragging_allowed(&self) -> bool {
        (self.dragging_allowed)()
    }

    /// Whether `other` is a relevant destination from this container.
    #[must_use]
    pub fn is_view_relevant(&self, other: &dyn DragContainer) -> bool {
        (self.view_relevance)(other)
    }
}

impl std::ops::Deref for AdaptedContainer {
    type Target = dyn DragContainer;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Bare {
        id: ContainerId,
        options: OptionalCapabilities,
    }

    impl DragContainer for Bare {
        fn id(&self) -> ContainerId {
            self.id
        }
        fn container_view(&self) -> ListViewId {
            ListViewId::from_raw(self.id.raw())
        }
        fn is_drag_cell_relevant(&self, _cell: &DragCell) -> bool {
            true
        }
        fn is_cell_equivalent_to_target(&self, _cell: &DragCell, _target: &dyn DragContainer) -> bool {
            false
        }
        fn drag_target_from_cell(&self, _cell: &DragCell) -> Rc<dyn DragContainer> {
            Rc::new(Bare {
                id: ContainerId::next(),
                options: OptionalCapabilities::default(),
            })
        }
        fn drag_target_for(&self, _existing: &dyn DragContainer) -> Rc<dyn DragContainer> {
            self.drag_target_from_cell(&DragCell {
                id: crate::cell::CellId::from_raw(0),
                container: self.id,
                view: self.container_view(),
                index: 0,
            })
        }
        fn drag_title(&self) -> String {
            format!("bare {}", self.id)
        }
        fn complete_drag_of_cell(&self, _cell: &DragCell, _target: &Rc<dyn DragContainer>, done: DoneHandle) {
            done.done();
        }
        fn optional_capabilities(&self) -> OptionalCapabilities {
            self.options.clone()
        }
    }

    fn bare(options: OptionalCapabilities) -> Rc<dyn DragContainer> {
        Rc::new(Bare {
            id: ContainerId::next(),
            options,
        })
    }

    #[test]
    fn defaults_allow_everything() {
        let adapted = AdaptedContainer::adapt(bare(OptionalCapabilities::default()));
        let other = bare(OptionalCapabilities::default());
        assert!(adapted.dragging_allowed());
        assert!(adapted.is_view_relevant(&*other));
    }

    #[test]
    fn custom_dragging_allowed_is_used() {
        let allowed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&allowed);
        let adapted = AdaptedContainer::adapt(bare(
            OptionalCapabilities::default().with_dragging_allowed(move || flag.get()),
        ));
        assert!(!adapted.dragging_allowed());
        allowed.set(true);
        assert!(adapted.dragging_allowed());
    }

    #[test]
    fn custom_relevance_is_used() {
        let excluded = bare(OptionalCapabilities::default());
        let excluded_id = excluded.id();
        let adapted = AdaptedContainer::adapt(bare(
            OptionalCapabilities::default().with_view_relevance(move |c| c.id() != excluded_id),
        ));
        assert!(!adapted.is_view_relevant(&*excluded));
        assert!(adapted.is_view_relevant(&*bare(OptionalCapabilities::default())));
    }

    #[test]
    fn options_resolved_once_at_adaptation() {
        struct Counting {
            inner: Bare,
            calls: Rc<Cell<u32>>,
        }
        impl DragContainer for Counting {
            fn id(&self) -> ContainerId {
                self.inner.id()
            }
            fn container_view(&self) -> ListViewId {
                self.inner.container_view()
            }
            fn is_drag_cell_relevant(&self, cell: &DragCell) -> bool {
                self.inner.is_drag_cell_relevant(cell)
            }
            fn is_cell_equivalent_to_target(&self, cell: &DragCell, target: &dyn DragContainer) -> bool {
                self.inner.is_cell_equivalent_to_target(cell, target)
            }
            fn drag_target_from_cell(&self, cell: &DragCell) -> Rc<dyn DragContainer> {
                self.inner.drag_target_from_cell(cell)
            }
            fn drag_target_for(&self, existing: &dyn DragContainer) -> Rc<dyn DragContainer> {
                self.inner.drag_target_for(existing)
            }
            fn drag_title(&self) -> String {
                self.inner.drag_title()
            }
            fn complete_drag_of_cell(&self, cell: &DragCell, target: &Rc<dyn DragContainer>, done: DoneHandle) {
                self.inner.complete_drag_of_cell(cell, target, done);
            }
            fn optional_capabilities(&self) -> OptionalCapabilities {
                self.calls.set(self.calls.get() + 1);
                OptionalCapabilities::default()
            }
        }

        let calls = Rc::new(Cell::new(0));
        let adapted = AdaptedContainer::adapt(Rc::new(Counting {
            inner: Bare {
                id: ContainerId::next(),
                options: OptionalCapabilities::default(),
            },
            calls: Rc::clone(&calls),
        }));
        for _ in 0..5 {
            assert!(adapted.dragging_allowed());
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn deref_reaches_mandatory_methods() {
        let inner = bare(OptionalCapabilities::default());
        let id = inner.id();
        let adapted = AdaptedContainer::adapt(inner);
        assert_eq!(adapted.drag_title(), format!("bare {id}"));
        assert_eq!(adapted.id(), id);
    }
}
