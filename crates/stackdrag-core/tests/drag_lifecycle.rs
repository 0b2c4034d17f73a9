#![forbid(unsafe_code)]

//! End-to-end drag sessions against in-memory folders and navigation.
//!
//! Covers:
//! - every session ends aborted or finished, never parked mid-release
//! - push-new pushes exactly the factory's instance
//! - pop-to-existing truncates and replaces with a fresh instance
//! - a check limit on the scan never turns pop-to-existing into a duplicate push
//! - a doubled `done` finishes the session once
//! - dragging disallowed never arms, for any cell
//!
//! Run:
//!   cargo test -p stackdrag-core --features test-helpers --test drag_lifecycle

use std::cell::Cell;
use std::rc::Rc;

use stackdrag_core::testing::{CompletionMode, FolderContainer, FolderTree, MemoryNavigator, NavOp};
use stackdrag_core::{
    AbortReason, CoordinatorConfig, DragCell, DragContainer, DragCoordinator, DragPhase,
    DropSurface, Navigator, PickUp, Resolution, Row,
};

// ============================================================================
// Helpers
// ============================================================================

struct World {
    tree: FolderTree,
    nav: MemoryNavigator,
    coordinator: DragCoordinator,
}

impl World {
    fn with_stack(paths: &[&str]) -> Self {
        let tree = FolderTree::new();
        let mut nav = MemoryNavigator::new();
        for path in paths {
            nav.push_container(FolderContainer::open(&tree, path));
        }
        Self {
            tree,
            nav,
            coordinator: DragCoordinator::default(),
        }
    }

    fn top(&self) -> Rc<dyn DragContainer> {
        self.nav.top().expect("stack has a draggable top")
    }

    fn register(&mut self, row: &Row) -> DragCell {
        row.register_for_dragging(self.coordinator.registry_mut());
        row.cell()
    }

    fn child(&mut self, name: &str) -> DragCell {
        let row = self.tree.child_row(&self.top(), name);
        self.register(&row)
    }

    fn link(&mut self, path: &str) -> DragCell {
        let row = self.tree.link_row(&self.top(), path);
        self.register(&row)
    }

    fn drag(&mut self, cell: &DragCell) -> stackdrag_core::Release {
        assert_eq!(
            self.coordinator.drag_started(cell, &self.nav),
            Ok(PickUp::Armed)
        );
        self.coordinator
            .drag_moved_over(Some(DropSurface::BackButton))
            .expect("tracking");
        self.coordinator.drag_released(&mut self.nav).expect("release")
    }

    fn paths(&self) -> Vec<String> {
        self.nav
            .entries()
            .iter()
            .filter_map(|entry| entry.capability.as_ref())
            .filter_map(|container| self.tree.path_of(container))
            .collect()
    }
}

// ============================================================================
// Session outcomes
// ============================================================================

#[test]
fn every_session_ends_aborted_or_finished() {
    let mut world = World::with_stack(&["/", "/a"]);
    world.tree.set_completion(CompletionMode::Deferred);

    // Aborted at pickup.
    let stray = world.tree.child_row(&world.top(), "unregistered").cell();
    assert!(matches!(
        world.coordinator.drag_started(&stray, &world.nav),
        Ok(PickUp::Aborted(AbortReason::NotRegistered))
    ));
    assert_eq!(world.coordinator.phase(), DragPhase::Idle);

    // Aborted by the gesture layer.
    let cell = world.child("x");
    world.coordinator.drag_started(&cell, &world.nav).unwrap();
    world.coordinator.drag_cancelled().unwrap();
    assert_eq!(world.coordinator.phase(), DragPhase::Idle);

    // Finished via done.
    let release = world.drag(&cell);
    assert!(release.finished.is_none());
    assert_eq!(world.coordinator.phase(), DragPhase::Completing);
    for done in world.tree.take_pending() {
        done.done();
    }
    assert!(world.coordinator.poll().is_some());

    let transitions = world.coordinator.drain_transitions();
    let ended = transitions.iter().filter(|t| t.to == DragPhase::Idle).count();
    assert_eq!(ended, 3);
    for pair in transitions.windows(2) {
        if pair[0].to == DragPhase::Resolving {
            assert_eq!(pair[1].to, DragPhase::Transitioning);
        }
        if pair[0].to == DragPhase::Transitioning {
            assert_eq!(pair[1].to, DragPhase::Completing);
        }
    }
    assert_eq!(world.coordinator.phase(), DragPhase::Idle);
}

#[test]
fn release_never_leaves_session_mid_release() {
    for mode in [
        CompletionMode::Immediate,
        CompletionMode::Twice,
        CompletionMode::Deferred,
        CompletionMode::Never,
    ] {
        let mut world = World::with_stack(&["/"]);
        world.tree.set_completion(mode);
        let cell = world.child("docs");
        world.drag(&cell);
        let phase = world.coordinator.phase();
        assert!(
            matches!(phase, DragPhase::Idle | DragPhase::Completing),
            "{mode:?} left phase {phase}"
        );
    }
}

#[test]
fn handle_dropped_without_done_stalls_session() {
    let mut world = World::with_stack(&["/"]);
    world.tree.set_completion(CompletionMode::Never);
    let cell = world.child("docs");
    let release = world.drag(&cell);
    assert!(release.finished.is_none());
    assert!(world.coordinator.poll().is_none());
    assert_eq!(world.coordinator.phase(), DragPhase::Completing);

    let next = world.child("more");
    assert!(world.coordinator.drag_started(&next, &world.nav).is_err());
}

// ============================================================================
// Push-new
// ============================================================================

#[test]
fn push_new_pushes_factory_instance_once() {
    let mut world = World::with_stack(&["/", "/a"]);
    let cell = world.child("fresh");
    let release = world.drag(&cell);

    let Resolution::PushNew { target } = &release.resolution else {
        panic!("expected push-new, got {:?}", release.resolution);
    };
    assert_eq!(
        world.nav.ops(),
        &[NavOp::Push {
            target: target.id(),
            title: "fresh".to_owned(),
        }]
    );
    let top = world.top();
    assert!(Rc::ptr_eq(&top, target));
    assert_eq!(world.paths(), vec!["/", "/a", "/a/fresh"]);
}

#[test]
fn completion_runs_on_source_container() {
    let mut world = World::with_stack(&["/", "/a"]);
    let cell = world.child("fresh");
    world.drag(&cell);
    let moves = world.tree.moves();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].cell, cell.id);
    assert_eq!(moves[0].from, "/a");
    assert_eq!(moves[0].to, "/a/fresh");
}

// ============================================================================
// Pop-to-existing
// ============================================================================

#[test]
fn pop_to_existing_replaces_with_fresh_instance() {
    let mut world = World::with_stack(&["/", "/b", "/b/c", "/b/c/d"]);
    let original_b = world.nav.entries()[1]
        .capability
        .clone()
        .expect("draggable");
    let cell = world.link("/b");
    let release = world.drag(&cell);

    match &release.resolution {
        Resolution::PopToExisting {
            index,
            replaced,
            target,
        } => {
            assert_eq!(*index, 1);
            assert_eq!(*replaced, original_b.id());
            assert!(!Rc::ptr_eq(target, &original_b));
        }
        other => panic!("expected pop-to-existing, got {other:?}"),
    }
    assert_eq!(world.paths(), vec!["/", "/b"]);
    assert_ne!(world.nav.ids()[1], original_b.id());
    assert!(matches!(world.nav.ops(), [NavOp::ReplaceFrom { index: 1, .. }]));
}

#[test]
fn nearest_equivalent_entry_wins() {
    let mut world = World::with_stack(&["/x", "/y", "/x", "/z"]);
    let cell = world.link("/x");
    let release = world.drag(&cell);
    assert!(matches!(
        release.resolution,
        Resolution::PopToExisting { index: 2, .. }
    ));
    assert_eq!(world.paths(), vec!["/x", "/y", "/x"]);
}

#[test]
fn scan_limit_still_pops_to_existing() {
    let mut world = World::with_stack(&["/", "/a", "/a/b"]);
    world.coordinator =
        DragCoordinator::new(CoordinatorConfig::default().with_equivalence_scan_limit(Some(1)));
    let cell = world.link("/");
    let release = world.drag(&cell);
    assert!(matches!(
        release.resolution,
        Resolution::PopToExisting { index: 0, .. }
    ));
    assert_eq!(world.paths(), vec!["/"]);
}

#[test]
fn opaque_entries_do_not_block_resolution() {
    let mut world = World::with_stack(&["/"]);
    world.nav.push_opaque(stackdrag_core::ContainerId::next());
    world
        .nav
        .push_container(FolderContainer::open(&world.tree, "/deep"));
    let cell = world.link("/");
    let release = world.drag(&cell);
    assert!(matches!(
        release.resolution,
        Resolution::PopToExisting { index: 0, .. }
    ));
    assert_eq!(world.nav.len(), 1);
}

// ============================================================================
// Doubled done
// ============================================================================

#[test]
fn second_done_is_a_no_op() {
    let mut world = World::with_stack(&["/"]);
    world.tree.set_completion(CompletionMode::Deferred);
    let cell = world.child("docs");
    world.drag(&cell);

    let pending = world.tree.take_pending();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].done());
    assert!(world.coordinator.poll().is_some());

    assert!(!pending[0].done());
    assert!(world.coordinator.poll().is_none());

    // A new drag starts cleanly after the stray second done.
    let next = world.child("again");
    assert_eq!(
        world.coordinator.drag_started(&next, &world.nav),
        Ok(PickUp::Armed)
    );
    let finishes = world
        .coordinator
        .drain_transitions()
        .iter()
        .filter(|t| t.from == DragPhase::Completing)
        .count();
    assert_eq!(finishes, 1);
}

// ============================================================================
// Dragging disallowed
// ============================================================================

#[test]
fn dragging_disallowed_never_arms() {
    let tree = FolderTree::new();
    let allowed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&allowed);
    let locked = FolderContainer::open_with(&tree, "/locked", move |options| {
        let flag = Rc::clone(&flag);
        options.with_dragging_allowed(move || flag.get())
    });
    let mut nav = MemoryNavigator::new();
    nav.push_container(Rc::clone(&locked));
    let mut coordinator = DragCoordinator::default();

    let rows: Vec<Row> = (0..8)
        .map(|i| tree.child_row(&locked, &format!("item{i}")))
        .collect();
    for row in &rows {
        row.register_for_dragging(coordinator.registry_mut());
        assert_eq!(
            coordinator.drag_started(&row.cell(), &nav),
            Ok(PickUp::Aborted(AbortReason::DraggingDisallowed))
        );
    }
    assert!(
        coordinator
            .drain_transitions()
            .iter()
            .all(|t| t.to != DragPhase::Armed)
    );

    // The check is evaluated per pickup, not cached at adaptation.
    allowed.set(true);
    assert_eq!(
        coordinator.drag_started(&rows[0].cell(), &nav),
        Ok(PickUp::Armed)
    );
}

#[test]
fn custom_relevance_limits_destinations() {
    let tree = FolderTree::new();
    let root = FolderContainer::open(&tree, "/");
    let excluded = root.id();
    let source = FolderContainer::open_with(&tree, "/a", move |options| {
        options.with_view_relevance(move |other| other.id() != excluded)
    });
    let mut nav = MemoryNavigator::new();
    nav.push_container(root);
    nav.push_container(Rc::clone(&source));
    let mut coordinator = DragCoordinator::default();

    let row = tree.link_row(&source, "/");
    row.register_for_dragging(coordinator.registry_mut());
    coordinator.drag_started(&row.cell(), &nav).unwrap();
    let release = coordinator.drag_released(&mut nav).unwrap();
    // The root is skipped, so the link is pushed as a new "/" screen.
    assert!(release.resolution.is_push_new());
    assert_eq!(nav.len(), 3);
}

// ============================================================================
// Row reuse
// ============================================================================

#[test]
fn recycled_rows_stay_registered_after_reuse() {
    let mut world = World::with_stack(&["/"]);
    let row = world.tree.child_row(&world.top(), "reused");
    for index in 0..5 {
        row.reuse(index);
        row.register_for_dragging(world.coordinator.registry_mut());
    }
    assert_eq!(world.coordinator.registry().len(), 1);
    let cell = row.cell();
    assert_eq!(cell.index, 4);
    assert_eq!(
        world.coordinator.drag_started(&cell, &world.nav),
        Ok(PickUp::Armed)
    );
}

#[test]
fn destroyed_rows_stop_counting_as_registered() {
    let tree = FolderTree::new();
    let root = FolderContainer::open(&tree, "/");
    let mut nav = MemoryNavigator::new();
    nav.push_container(Rc::clone(&root));
    let mut coordinator = DragCoordinator::default();

    let cell = {
        let row = tree.child_row(&root, "gone");
        row.register_for_dragging(coordinator.registry_mut());
        row.cell()
    };
    tree.forget_rows();
    assert_eq!(
        coordinator.drag_started(&cell, &nav),
        Ok(PickUp::Aborted(AbortReason::NotRegistered))
    );
}

#[test]
fn waker_runs_when_done_arrives_later() {
    let mut world = World::with_stack(&["/"]);
    world.tree.set_completion(CompletionMode::Deferred);
    let woken = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&woken);
    world
        .coordinator
        .set_completion_waker(move || flag.store(true, std::sync::atomic::Ordering::SeqCst));
    let cell = world.child("docs");
    world.drag(&cell);

    let handle = world.tree.take_pending().pop().expect("deferred handle");
    std::thread::spawn(move || {
        handle.done();
    })
    .join()
    .unwrap();

    assert!(woken.load(std::sync::atomic::Ordering::SeqCst));
    let finished = world.coordinator.poll().expect("finished");
    assert_eq!(finished.cell, cell);
}
