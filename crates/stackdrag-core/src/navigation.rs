#![forbid(unsafe_code)]

//! The navigation stack as seen by the drag core.
//!
//! The navigation layer owns the stack, its order, and its animations. The
//! core reads it through [`Navigator::entries`] and mutates it through
//! exactly two operations, and only from the coordinator's `Transitioning`
//! step:
//!
//! ```text
//! push-new:         [A, B, C]  ── push(T) ──────────────►  [A, B, C, T]
//! pop-to-existing:  [A, B, C]  ── replace_from(1, B') ──►  [A, B']
//! ```

use std::fmt;
use std::rc::Rc;

use crate::capability::DragContainer;
use crate::cell::ContainerId;

/// One slot of the navigation stack.
///
/// Screens that do not implement [`DragContainer`] still occupy a slot; they
/// carry no capability and are never consulted.
#[derive(Clone)]
pub struct StackEntry {
    pub id: ContainerId,
    pub capability: Option<Rc<dyn DragContainer>>,
}

impl StackEntry {
    /// Entry for a screen that participates in dragging.
    #[must_use]
    pub fn container(container: Rc<dyn DragContainer>) -> Self {
        Self {
            id: container.id(),
            capability: Some(container),
        }
    }

    /// Entry for a screen without the drag capability.
    #[must_use]
    pub fn opaque(id: ContainerId) -> Self {
        Self {
            id,
            capability: None,
        }
    }
}

impl fmt::Debug for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackEntry")
            .field("id", &self.id)
            .field("capable", &self.capability.is_some())
            .finish()
    }
}

/// External navigation collaborator.
pub trait Navigator {
    /// Current stack, bottom first.
    fn entries(&self) -> Vec<StackEntry>;

    /// Push `target` on top of the stack.
    fn push(&mut self, target: Rc<dyn DragContainer>, title: &str);

    /// Truncate the stack to `index` entries, then push `target`, so that
    /// `target` occupies slot `index`.
    fn replace_from(&mut self, index: usize, target: Rc<dyn DragContainer>, title: &str);

    /// Look up an entry by id.
    fn find(&self, id: ContainerId) -> Option<StackEntry> {
        self.entries().into_iter().find(|entry| entry.id == id)
    }
}
