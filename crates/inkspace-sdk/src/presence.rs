//! Remote selections remembered by a session.
//!
//! Selections are kept in local text coordinates. Every operation applied
//! to the local text, local or remote, must be run through
//! [`RemoteSelections::transform_all`] so they keep pointing at the same
//! characters.

use inkspace_ot::{ClientId, Operation, Selection};
use std::collections::HashMap;

/// Last known selection of every other replica in the room.
#[derive(Clone, Debug, Default)]
pub struct RemoteSelections {
    selections: HashMap<ClientId, Selection>,
}

impl RemoteSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, client_id: ClientId, selection: Selection) {
        self.selections.insert(client_id, selection);
    }

    pub fn get(&self, client_id: ClientId) -> Option<Selection> {
        self.selections.get(&client_id).copied()
    }

    pub fn remove(&mut self, client_id: ClientId) -> Option<Selection> {
        self.selections.remove(&client_id)
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientId, Selection)> + '_ {
        self.selections.iter().map(|(id, sel)| (*id, *sel))
    }

    /// Move every remembered selection through an applied operation.
    pub fn transform_all(&mut self, operation: &Operation) {
        for selection in self.selections.values_mut() {
            *selection = selection.transform(operation);
        }
    }
}
