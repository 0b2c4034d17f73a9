#![forbid(unsafe_code)]

//! In-memory fixtures: a folder hierarchy and a navigation stack.
//!
//! [`FolderTree`] models a tree of folders addressed by absolute path.
//! Each [`FolderContainer`] is one open folder screen. Rows are either
//! *children* (dragging one drills into `path/name`) or *links* (shortcuts
//! to an absolute path, which is how a drag lands on a screen already in
//! the stack). [`MemoryNavigator`] is a plain vector stack that records the
//! operations applied to it.
//!
//! Enabled for unit tests and with the `test-helpers` feature.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::capability::{DragContainer, OptionalCapabilities};
use crate::cell::{CellId, ContainerId, DragCell, ListViewId, Row};
use crate::completion::DoneHandle;
use crate::navigation::{Navigator, StackEntry};

// ---------------------------------------------------------------------------
// FolderTree
// ---------------------------------------------------------------------------

/// How [`FolderContainer::complete_drag_of_cell`] treats its `done` handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Call `done` before returning.
    #[default]
    Immediate,
    /// Call `done` twice before returning.
    Twice,
    /// Keep the handle; release it with [`FolderTree::take_pending`].
    Deferred,
    /// Drop the handle without calling `done`.
    Never,
}

/// A move performed by a completed drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMove {
    pub cell: CellId,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
enum RowKind {
    Child(String),
    Link(String),
}

#[derive(Default)]
struct TreeState {
    paths: AHashMap<ContainerId, String>,
    rows: AHashMap<CellId, RowKind>,
    live_rows: Vec<Row>,
    locked: AHashSet<CellId>,
    moves: Vec<FolderMove>,
    completion: CompletionMode,
    pending: Vec<DoneHandle>,
}

/// Shared state behind every [`FolderContainer`] opened from it.
#[derive(Clone, Default)]
pub struct FolderTree {
    state: Rc<RefCell<TreeState>>,
}

impl fmt::Debug for FolderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FolderTree")
            .field("containers", &state.paths.len())
            .field("rows", &state.rows.len())
            .field("moves", &state.moves.len())
            .finish()
    }
}

fn join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

impl FolderTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path shown by `container`, if it was opened from this tree.
    #[must_use]
    pub fn path_of(&self, container: &Rc<dyn DragContainer>) -> Option<String> {
        self.path_of_id(container.id())
    }

    #[must_use]
    pub fn path_of_id(&self, id: ContainerId) -> Option<String> {
        self.state.borrow().paths.get(&id).cloned()
    }

    /// Add a child row named `name` to `container`. The tree keeps the row
    /// alive until [`forget_rows`](Self::forget_rows).
    pub fn child_row(&self, container: &Rc<dyn DragContainer>, name: &str) -> Row {
        self.add_row(container, RowKind::Child(name.to_owned()))
    }

    /// Add a shortcut row to the absolute `path`.
    pub fn link_row(&self, container: &Rc<dyn DragContainer>, path: &str) -> Row {
        self.add_row(container, RowKind::Link(path.to_owned()))
    }

    pub fn row_cell(&self, container: &Rc<dyn DragContainer>, name: &str) -> DragCell {
        self.child_row(container, name).cell()
    }

    pub fn link_cell(&self, container: &Rc<dyn DragContainer>, path: &str) -> DragCell {
        self.link_row(container, path).cell()
    }

    fn add_row(&self, container: &Rc<dyn DragContainer>, kind: RowKind) -> Row {
        let mut state = self.state.borrow_mut();
        let index = state
            .live_rows
            .iter()
            .filter(|row| row.container() == container.id())
            .count();
        let row = Row::new(container.id(), container.container_view(), index);
        state.rows.insert(row.id(), kind);
        state.live_rows.push(row.clone());
        row
    }

    /// Release the tree's handles on every row it created.
    pub fn forget_rows(&self) {
        self.state.borrow_mut().live_rows.clear();
    }

    /// Make `cell` fail the pickup relevance check.
    pub fn lock_row(&self, cell: CellId) {
        self.state.borrow_mut().locked.insert(cell);
    }

    pub fn set_completion(&self, mode: CompletionMode) {
        self.state.borrow_mut().completion = mode;
    }

    /// Handles held back by [`CompletionMode::Deferred`].
    pub fn take_pending(&self) -> Vec<DoneHandle> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    #[must_use]
    pub fn moves(&self) -> Vec<FolderMove> {
        self.state.borrow().moves.clone()
    }

    /// Path a drag of `cell` leads to.
    fn target_path(&self, cell: &DragCell) -> Option<String> {
        let state = self.state.borrow();
        match state.rows.get(&cell.id)? {
            RowKind::Link(path) => Some(path.clone()),
            RowKind::Child(name) => state.paths.get(&cell.container).map(|base| join(base, name)),
        }
    }
}

// ---------------------------------------------------------------------------
// FolderContainer
// ---------------------------------------------------------------------------

type OptionsHook = Rc<dyn Fn(OptionalCapabilities) -> OptionalCapabilities>;

/// One open folder screen.
pub struct FolderContainer {
    id: ContainerId,
    view: ListViewId,
    path: String,
    tree: FolderTree,
    options: Option<OptionsHook>,
}

impl fmt::Debug for FolderContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderContainer")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl FolderContainer {
    /// Open a fresh screen showing `path`.
    pub fn open(tree: &FolderTree, path: &str) -> Rc<dyn DragContainer> {
        Rc::new(Self::build(tree, path, None))
    }

    /// Open a screen whose optional capabilities are produced by `options`.
    pub fn open_with(
        tree: &FolderTree,
        path: &str,
        options: impl Fn(OptionalCapabilities) -> OptionalCapabilities + 'static,
    ) -> Rc<dyn DragContainer> {
        Rc::new(Self::build(tree, path, Some(Rc::new(options))))
    }

    fn build(tree: &FolderTree, path: &str, options: Option<OptionsHook>) -> Self {
        let id = ContainerId::next();
        tree.state.borrow_mut().paths.insert(id, path.to_owned());
        Self {
            id,
            view: ListViewId::next(),
            path: path.to_owned(),
            tree: tree.clone(),
            options,
        }
    }
}

impl DragContainer for FolderContainer {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn container_view(&self) -> ListViewId {
        self.view
    }

    fn is_drag_cell_relevant(&self, cell: &DragCell) -> bool {
        let state = self.tree.state.borrow();
        cell.container == self.id
            && state.rows.contains_key(&cell.id)
            && !state.locked.contains(&cell.id)
    }

    fn is_cell_equivalent_to_target(&self, cell: &DragCell, target: &dyn DragContainer) -> bool {
        match (self.tree.target_path(cell), self.tree.path_of_id(target.id())) {
            (Some(wanted), Some(shown)) => wanted == shown,
            _ => false,
        }
    }

    fn drag_target_from_cell(&self, cell: &DragCell) -> Rc<dyn DragContainer> {
        let path = self
            .tree
            .target_path(cell)
            .unwrap_or_else(|| self.path.clone());
        Self::open(&self.tree, &path)
    }

    fn drag_target_for(&self, existing: &dyn DragContainer) -> Rc<dyn DragContainer> {
        let path = self
            .tree
            .path_of_id(existing.id())
            .unwrap_or_else(|| self.path.clone());
        Self::open(&self.tree, &path)
    }

    fn drag_title(&self) -> String {
        match self.path.rsplit('/').find(|segment| !segment.is_empty()) {
            Some(name) => name.to_owned(),
            None => "/".to_owned(),
        }
    }

    fn complete_drag_of_cell(&self, cell: &DragCell, target: &Rc<dyn DragContainer>, done: DoneHandle) {
        let mode = {
            let mut state = self.tree.state.borrow_mut();
            let to = state.paths.get(&target.id()).cloned().unwrap_or_default();
            state.moves.push(FolderMove {
                cell: cell.id,
                from: self.path.clone(),
                to,
            });
            state.completion
        };
        match mode {
            CompletionMode::Immediate => {
                done.done();
            }
            CompletionMode::Twice => {
                done.done();
                done.done();
            }
            CompletionMode::Deferred => self.tree.state.borrow_mut().pending.push(done),
            CompletionMode::Never => drop(done),
        }
    }

    fn optional_capabilities(&self) -> OptionalCapabilities {
        match &self.options {
            Some(hook) => hook(OptionalCapabilities::default()),
            None => OptionalCapabilities::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryNavigator
// ---------------------------------------------------------------------------

/// A navigation operation applied to [`MemoryNavigator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOp {
    Push {
        target: ContainerId,
        title: String,
    },
    ReplaceFrom {
        index: usize,
        target: ContainerId,
        title: String,
    },
}

/// Vector-backed navigation stack.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    entries: Vec<StackEntry>,
    titles: Vec<String>,
    ops: Vec<NavOp>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stack without recording an operation.
    pub fn push_container(&mut self, container: Rc<dyn DragContainer>) {
        self.titles.push(container.drag_title());
        self.entries.push(StackEntry::container(container));
    }

    /// Seed a screen without the drag capability.
    pub fn push_opaque(&mut self, id: ContainerId) {
        self.titles.push(format!("opaque {id}"));
        self.entries.push(StackEntry::opaque(id));
    }

    /// Topmost entry's container, if it has the drag capability.
    #[must_use]
    pub fn top(&self) -> Option<Rc<dyn DragContainer>> {
        self.entries.last()?.capability.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ContainerId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    #[must_use]
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Operations applied through [`Navigator`], oldest first.
    #[must_use]
    pub fn ops(&self) -> &[NavOp] {
        &self.ops
    }
}

impl Navigator for MemoryNavigator {
    fn entries(&self) -> Vec<StackEntry> {
        self.entries.clone()
    }

    fn push(&mut self, target: Rc<dyn DragContainer>, title: &str) {
        self.ops.push(NavOp::Push {
            target: target.id(),
            title: title.to_owned(),
        });
        self.titles.push(title.to_owned());
        self.entries.push(StackEntry::container(target));
    }

    fn replace_from(&mut self, index: usize, target: Rc<dyn DragContainer>, title: &str) {
        self.ops.push(NavOp::ReplaceFrom {
            index,
            target: target.id(),
            title: title.to_owned(),
        });
        self.entries.truncate(index);
        self.titles.truncate(index);
        self.titles.push(title.to_owned());
        self.entries.push(StackEntry::container(target));
    }
}
