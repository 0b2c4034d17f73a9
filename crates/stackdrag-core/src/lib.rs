// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: drag sessions that relocate list rows between stacked containers.
//!
//! # Role in stackdrag
//! `stackdrag-core` sits between an external gesture layer (which decides
//! that a drag started, where the pointer is, and when it was released) and
//! an external navigation stack (which owns the screens and animates push
//! and pop). It owns nothing visual; it only decides *what* should happen.
//!
//! # Primary responsibilities
//! - **DragRegistry**: which rows opted into dragging (idempotent, leak-free).
//! - **DragContainer**: the capability contract every participating screen
//!   implements, adapted once into [`AdaptedContainer`].
//! - **Equivalence resolution**: finding a stack entry that already
//!   represents the dragged cell's target, nearest first.
//! - **DragCoordinator**: the session state machine, from pickup to the
//!   collaborator's single-use `done` signal.
//!
//! # How it fits in the system
//! ```text
//! gesture layer ──► DragCoordinator ──► resolver ──► Navigator (push / replace)
//!                        │                                │
//!                        └──── DragContainer::complete_drag_of_cell(done)
//! ```

pub mod capability;
pub mod cell;
pub mod completion;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod navigation;
pub mod registry;
pub mod resolver;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use capability::{AdaptedContainer, DragContainer, OptionalCapabilities};
pub use cell::{CellId, ContainerId, DragCell, ListViewId, Row};
pub use completion::{CompletionSource, DoneHandle};
pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{DragCoordinator, FinishedDrag, PickUp, Release};
pub use error::DragError;
pub use navigation::{Navigator, StackEntry};
pub use registry::DragRegistry;
pub use resolver::{Resolution, find_equivalent_in_stack};
pub use session::{AbortReason, DragPhase, DragSession, DropSurface, PhaseTransition};
