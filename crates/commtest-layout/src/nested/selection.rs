use commtest_model::{CellContent, CellPosition, NestedTableLayout};

use super::ops::{reduce, LayoutPath, NestedAction};
use crate::error::{LayoutError, LayoutErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Click(CellPosition),
    ShiftClick(CellPosition),
    RightClick(CellPosition),
    /// Merge mode: the selected cell, or the next clicked one, becomes the
    /// merge start and the following click its destination.
    ArmMerge,
    DragStart(CellPosition),
    DragOver(CellPosition),
    DragEnd,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    None,
    Selected(CellPosition),
    MergeArmed(CellPosition),
    Merge { from: CellPosition, to: CellPosition },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    start: CellPosition,
    current: CellPosition,
}

/// Builder selection: the cell being configured, a pending two-click merge
/// start, and an in-progress drag rectangle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuilderSelection {
    selected: Option<CellPosition>,
    merge_start: Option<CellPosition>,
    arming: bool,
    drag: Option<Drag>,
}

impl BuilderSelection {
    #[must_use]
    pub const fn selected(&self) -> Option<CellPosition> {
        self.selected
    }

    #[must_use]
    pub const fn merge_start(&self) -> Option<CellPosition> {
        self.merge_start
    }

    /// Corners of the drag rectangle, when dragging.
    #[must_use]
    pub fn drag_corners(&self) -> Option<(CellPosition, CellPosition)> {
        self.drag.map(|d| (d.start, d.current))
    }

    pub fn apply(&mut self, gesture: Gesture) -> GestureOutcome {
        match gesture {
            Gesture::Click(pos) => match self.merge_start.take() {
                Some(start) if start != pos => {
                    self.arming = false;
                    self.selected = Some(start);
                    GestureOutcome::Merge {
                        from: start,
                        to: pos,
                    }
                }
                None if self.arming => self.arm(pos),
                _ => {
                    self.arming = false;
                    self.select(pos)
                }
            },
            Gesture::ShiftClick(pos) => match self.selected {
                Some(current) if current != pos => {
                    self.merge_start = None;
                    GestureOutcome::Merge {
                        from: current,
                        to: pos,
                    }
                }
                _ => self.select(pos),
            },
            Gesture::RightClick(pos) => self.arm(pos),
            Gesture::ArmMerge => match self.selected {
                Some(current) => self.arm(current),
                None => {
                    self.arming = true;
                    GestureOutcome::None
                }
            },
            Gesture::DragStart(pos) => {
                self.drag = Some(Drag {
                    start: pos,
                    current: pos,
                });
                GestureOutcome::None
            }
            Gesture::DragOver(pos) => {
                if let Some(drag) = &mut self.drag {
                    drag.current = pos;
                }
                GestureOutcome::None
            }
            Gesture::DragEnd => match self.drag.take() {
                Some(Drag { start, current }) if start != current => {
                    self.selected = Some(start);
                    GestureOutcome::Merge {
                        from: start,
                        to: current,
                    }
                }
                Some(Drag { start, .. }) => self.select(start),
                None => GestureOutcome::None,
            },
            Gesture::Cancel => {
                self.merge_start = None;
                self.arming = false;
                self.drag = None;
                GestureOutcome::None
            }
        }
    }

    fn arm(&mut self, pos: CellPosition) -> GestureOutcome {
        self.arming = true;
        self.selected = Some(pos);
        self.merge_start = Some(pos);
        GestureOutcome::MergeArmed(pos)
    }

    fn select(&mut self, pos: CellPosition) -> GestureOutcome {
        self.selected = Some(pos);
        GestureOutcome::Selected(pos)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Interactive editor over one nested layout. Gestures resolve into
/// reducer actions against the grid currently opened by `path`.
#[derive(Debug, Clone)]
pub struct NestedBuilder {
    layout: NestedTableLayout,
    path: LayoutPath,
    selection: BuilderSelection,
}

impl NestedBuilder {
    #[must_use]
    pub fn new(layout: NestedTableLayout) -> Self {
        Self {
            layout,
            path: LayoutPath::root(),
            selection: BuilderSelection::default(),
        }
    }

    #[must_use]
    pub const fn layout(&self) -> &NestedTableLayout {
        &self.layout
    }

    #[must_use]
    pub fn into_layout(self) -> NestedTableLayout {
        self.layout
    }

    #[must_use]
    pub const fn path(&self) -> &LayoutPath {
        &self.path
    }

    #[must_use]
    pub const fn selection(&self) -> &BuilderSelection {
        &self.selection
    }

    pub fn dispatch(&mut self, action: NestedAction) -> Result<(), LayoutError> {
        self.layout = reduce(&self.layout, &self.path, action)?;
        Ok(())
    }

    pub fn gesture(&mut self, gesture: Gesture) -> Result<GestureOutcome, LayoutError> {
        let outcome = self.selection.apply(gesture);
        if let GestureOutcome::Merge { from, to } = outcome {
            self.dispatch(NestedAction::Merge { from, to })?;
            let anchor = self
                .layout
                .sublayout(self.path.as_slice())
                .and_then(|grid| grid.covering(from))
                .map(|cell| cell.position());
            self.selection.selected = anchor;
        }
        Ok(outcome)
    }

    /// Opens the nested table held by the cell at `at` in the current grid.
    pub fn enter(&mut self, at: CellPosition) -> Result<(), LayoutError> {
        let is_table = self
            .layout
            .sublayout(self.path.as_slice())
            .and_then(|grid| grid.anchor_at(at))
            .is_some_and(|cell| matches!(cell.content, CellContent::NestedTable { .. }));
        if !is_table {
            return Err(LayoutError::new(
                LayoutErrorCode::PathNotFound,
                format!("cell {at} does not hold a nested table"),
            ));
        }
        self.path = self.path.child(at);
        self.selection.reset();
        Ok(())
    }

    /// Returns to the parent grid; false when already at the root.
    pub fn leave(&mut self) -> bool {
        match self.path.parent() {
            Some(parent) => {
                self.path = parent;
                self.selection.reset();
                true
            }
            None => false,
        }
    }
}
