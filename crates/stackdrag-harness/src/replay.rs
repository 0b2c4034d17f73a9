//! Runs a [`Scenario`] against a live [`DragCoordinator`].

use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use stackdrag_core::testing::{FolderContainer, FolderTree, MemoryNavigator};
use stackdrag_core::{
    CoordinatorConfig, DragContainer, DragCoordinator, DropSurface, Navigator, PickUp, Resolution,
};

use crate::error::{HarnessError, Result};
use crate::scenario::{Outcome, RowSpec, Scenario, Surface};

/// What happened to one scripted drag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DragReport {
    Aborted { reason: String },
    Cancelled,
    PushedNew { target: String },
    PoppedToExisting { index: usize, target: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub drags: Vec<DragReport>,
    /// Folder paths left in the stack, bottom first.
    pub stack: Vec<String>,
    /// `from -> to` for every phase change, across all drags.
    pub transitions: Vec<String>,
    /// Moves performed by completed drags, as `from -> to`.
    pub moves: Vec<String>,
    /// Times the completion waker fired.
    pub wakeups: usize,
}

impl ReplayReport {
    /// Plain-text rendering for the terminal.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, drag) in self.drags.iter().enumerate() {
            let line = match drag {
                DragReport::Aborted { reason } => format!("aborted ({reason})"),
                DragReport::Cancelled => "cancelled".to_owned(),
                DragReport::PushedNew { target } => format!("pushed {target}"),
                DragReport::PoppedToExisting { index, target } => {
                    format!("popped to {target} at {index}")
                }
            };
            out.push_str(&format!("drag {index}: {line}\n"));
        }
        out.push_str(&format!("stack: {}\n", self.stack.join(" > ")));
        for entry in &self.moves {
            out.push_str(&format!("moved: {entry}\n"));
        }
        out
    }
}

/// Replay `scenario`. `config` overrides any config embedded in the file.
pub fn replay(scenario: &Scenario, config: Option<CoordinatorConfig>) -> Result<ReplayReport> {
    scenario.validate()?;
    let config = config
        .or_else(|| scenario.config.clone())
        .unwrap_or_default()
        .validated()?;

    let tree = FolderTree::new();
    tree.set_completion(scenario.completion.into());
    let mut nav = MemoryNavigator::new();
    for path in &scenario.stack {
        nav.push_container(FolderContainer::open(&tree, path));
    }

    let wakeups = Arc::new(AtomicUsize::new(0));
    let mut coordinator = DragCoordinator::new(config);
    {
        let wakeups = Arc::clone(&wakeups);
        coordinator.set_completion_waker(move || {
            wakeups.fetch_add(1, Ordering::Relaxed);
        });
    }

    let mut drags = Vec::with_capacity(scenario.drags.len());
    let mut transitions = Vec::new();
    for (index, step) in scenario.drags.iter().enumerate() {
        let _span = tracing::info_span!("replay.drag", index).entered();
        let top = nav
            .top()
            .ok_or_else(|| HarnessError::invalid(format!("drag {index}: top of stack is not a folder")))?;
        let row = match &step.row {
            RowSpec::Child(name) => tree.child_row(&top, name),
            RowSpec::Link(path) => tree.link_row(&top, path),
        };
        if step.register {
            row.register_for_dragging(coordinator.registry_mut());
        }

        let drag_err = |source| HarnessError::Drag { index, source };
        let report = match coordinator.drag_started(&row.cell(), &nav).map_err(drag_err)? {
            PickUp::Aborted(reason) => DragReport::Aborted {
                reason: reason.to_string(),
            },
            PickUp::Armed => {
                for surface in &step.over {
                    coordinator
                        .drag_moved_over(surface_for(*surface, &nav))
                        .map_err(drag_err)?;
                }
                match step.outcome {
                    Outcome::Cancel => {
                        coordinator.drag_cancelled().map_err(drag_err)?;
                        DragReport::Cancelled
                    }
                    Outcome::Release => {
                        let release = coordinator.drag_released(&mut nav).map_err(drag_err)?;
                        if release.finished.is_none() {
                            finish_deferred(&tree, &mut coordinator, index)?;
                        }
                        describe(&tree, &release.resolution)
                    }
                }
            }
        };
        tracing::info!(?report, "drag replayed");
        drags.push(report);
        transitions.extend(
            coordinator
                .drain_transitions()
                .into_iter()
                .map(|t| format!("{} -> {}", t.from, t.to)),
        );
    }

    let stack = nav
        .entries()
        .iter()
        .filter_map(|entry| entry.capability.as_ref())
        .filter_map(|container| tree.path_of(container))
        .collect();
    let moves = tree
        .moves()
        .into_iter()
        .map(|m| format!("{} -> {}", m.from, m.to))
        .collect();

    Ok(ReplayReport {
        drags,
        stack,
        transitions,
        moves,
        wakeups: wakeups.load(Ordering::Relaxed),
    })
}

fn surface_for(surface: Surface, nav: &MemoryNavigator) -> Option<DropSurface> {
    match surface {
        Surface::BackButton => Some(DropSurface::BackButton),
        Surface::Entry(index) => nav.ids().get(index).copied().map(DropSurface::Container),
        Surface::Nothing => None,
    }
}

/// Fire any held-back `done` handles and collect the finished session.
///
/// A session whose handle was dropped unfired can never finish; the replay
/// stops there instead of blocking every later drag.
fn finish_deferred(
    tree: &FolderTree,
    coordinator: &mut DragCoordinator,
    index: usize,
) -> Result<()> {
    for done in tree.take_pending() {
        done.done();
    }
    match coordinator.poll() {
        Some(finished) => {
            tracing::debug!(index, duration_us = finished.duration.as_micros() as u64, "deferred drag finished");
            Ok(())
        }
        None => Err(HarnessError::invalid(format!(
            "drag {index}: completion never called done(); later drags would be blocked"
        ))),
    }
}

fn describe(tree: &FolderTree, resolution: &Resolution) -> DragReport {
    let target = path_or_id(tree, resolution.target());
    match resolution {
        Resolution::PushNew { .. } => DragReport::PushedNew { target },
        Resolution::PopToExisting { index, .. } => DragReport::PoppedToExisting {
            index: *index,
            target,
        },
    }
}

fn path_or_id(tree: &FolderTree, container: &Rc<dyn DragContainer>) -> String {
    tree.path_of(container)
        .unwrap_or_else(|| container.id().to_string())
}
