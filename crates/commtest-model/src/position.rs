use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Zero-based grid coordinate inside one table level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct CellPosition {
    pub row_index: usize,
    pub column_index: usize,
}

impl CellPosition {
    #[must_use]
    pub const fn new(row_index: usize, column_index: usize) -> Self {
        Self {
            row_index,
            column_index,
        }
    }
}

impl Display for CellPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row_index, self.column_index)
    }
}

/// Inclusive rectangle of grid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl CellRect {
    /// Bounding rectangle of two corners given in any order.
    #[must_use]
    pub fn spanning(a: CellPosition, b: CellPosition) -> Self {
        Self {
            top: a.row_index.min(b.row_index),
            left: a.column_index.min(b.column_index),
            bottom: a.row_index.max(b.row_index),
            right: a.column_index.max(b.column_index),
        }
    }

    /// Rectangle covered by a cell anchored at `anchor`; far edges saturate
    /// at `usize::MAX` instead of wrapping.
    #[must_use]
    pub fn from_anchor(anchor: CellPosition, row_span: usize, col_span: usize) -> Self {
        Self {
            top: anchor.row_index,
            left: anchor.column_index,
            bottom: anchor.row_index.saturating_add(row_span.max(1) - 1),
            right: anchor.column_index.saturating_add(col_span.max(1) - 1),
        }
    }

    /// Like [`CellRect::from_anchor`], but `None` when an edge overflows.
    #[must_use]
    pub fn checked_from_anchor(
        anchor: CellPosition,
        row_span: usize,
        col_span: usize,
    ) -> Option<Self> {
        Some(Self {
            top: anchor.row_index,
            left: anchor.column_index,
            bottom: anchor.row_index.checked_add(row_span.max(1) - 1)?,
            right: anchor.column_index.checked_add(col_span.max(1) - 1)?,
        })
    }

    /// Part of the rectangle inside a `rows x columns` grid.
    #[must_use]
    pub fn clip(&self, rows: usize, columns: usize) -> Option<Self> {
        if rows == 0 || columns == 0 || self.top >= rows || self.left >= columns {
            return None;
        }
        Some(Self {
            bottom: self.bottom.min(rows - 1),
            right: self.right.min(columns - 1),
            ..*self
        })
    }

    #[must_use]
    pub const fn anchor(&self) -> CellPosition {
        CellPosition::new(self.top, self.left)
    }

    #[must_use]
    pub const fn row_span(&self) -> usize {
        (self.bottom - self.top).saturating_add(1)
    }

    #[must_use]
    pub const fn col_span(&self) -> usize {
        (self.right - self.left).saturating_add(1)
    }

    #[must_use]
    pub const fn contains(&self, pos: CellPosition) -> bool {
        pos.row_index >= self.top
            && pos.row_index <= self.bottom
            && pos.column_index >= self.left
            && pos.column_index <= self.right
    }

    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.top <= other.bottom
            && other.top <= self.bottom
            && self.left <= other.right
            && other.left <= self.right
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }

    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.top == self.bottom && self.left == self.right
    }

    /// Row-major iteration over every covered position.
    pub fn positions(&self) -> impl Iterator<Item = CellPosition> + '_ {
        (self.top..=self.bottom).flat_map(move |r| {
            (self.left..=self.right).map(move |c| CellPosition::new(r, c))
        })
    }
}
