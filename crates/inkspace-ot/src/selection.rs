//! Selections and how they move when the text under them changes.

use crate::operation::{Op, Operation};
use serde::{Deserialize, Serialize};

/// A cursor or selection range as character offsets into the current text.
///
/// `anchor` may be greater than `head` for a backward selection. Equal
/// values describe a collapsed cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A collapsed cursor at `position`.
    pub fn cursor(position: usize) -> Self {
        Self::new(position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Map this selection into the text produced by `operation`.
    pub fn transform(&self, operation: &Operation) -> Self {
        transform_selection(*self, operation)
    }
}

/// Map a selection through `operation`.
///
/// A collapsed cursor stays collapsed.
pub fn transform_selection(selection: Selection, operation: &Operation) -> Selection {
    let anchor = transform_index(selection.anchor, operation);
    if selection.is_collapsed() {
        return Selection::cursor(anchor);
    }
    Selection::new(anchor, transform_index(selection.head, operation))
}

fn transform_index(index: usize, operation: &Operation) -> usize {
    let mut budget = index as isize;
    let mut mapped = index as isize;

    for op in operation.ops() {
        match op {
            Op::Retain(n) => budget -= *n as isize,
            Op::Insert(text) => mapped += text.chars().count() as isize,
            Op::Delete(n) => {
                mapped -= budget.min(*n as isize);
                budget -= *n as isize;
            }
        }
        if budget < 0 {
            break;
        }
    }

    mapped.max(0) as usize
}
