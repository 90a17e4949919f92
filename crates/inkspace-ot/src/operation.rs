//! Operation - a normalized Retain/Insert/Delete edit script over flat text.
//!
//! An operation walks its input from left to right. `Retain(n)` copies the
//! next `n` characters, `Insert(s)` emits `s`, `Delete(n)` skips the next
//! `n` characters. Lengths are counted in `char`s.
//!
//! Operations are only ever produced by [`OperationBuilder`], which keeps
//! the script in canonical form:
//! - adjacent ops of the same kind are merged
//! - an insert appended after a trailing delete is placed before it
//!
//! Canonical form makes two scripts with the same effect compare equal,
//! which `transform` relies on.

use crate::codec::OperationData;
use crate::error::{OtError, Result};
use serde::{Deserialize, Serialize};

/// Identifier of the replica that produced an operation.
///
/// Only used to break ties between concurrent inserts.
pub type ClientId = u64;

/// One primitive of an edit script.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Keep the next `n` characters.
    Retain(usize),
    /// Emit the given text.
    Insert(String),
    /// Drop the next `n` characters.
    Delete(usize),
}

impl Op {
    /// Number of characters this op covers (inserted text length for inserts).
    pub fn len(&self) -> usize {
        match self {
            Op::Retain(n) | Op::Delete(n) => *n,
            Op::Insert(text) => text.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_retain(&self) -> bool {
        matches!(self, Op::Retain(_))
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Op::Insert(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Op::Delete(_))
    }
}

/// A finished, immutable edit script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OperationData", into = "OperationData")]
pub struct Operation {
    ops: Vec<Op>,
    base_len: usize,
    target_len: usize,
    client_id: ClientId,
}

impl Operation {
    /// Start building a new operation.
    pub fn builder() -> OperationBuilder {
        OperationBuilder::new()
    }

    /// The operation that leaves a string of `len` characters untouched.
    pub fn identity(len: usize) -> Self {
        Self::builder().retain(len).build()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Length of the string this operation can be applied to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of the string this operation produces.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Stamp the originating replica.
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn set_client_id(&mut self, client_id: ClientId) {
        self.client_id = client_id;
    }

    /// True when applying this operation never changes its input.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(Op::is_retain)
    }

    /// Assemble an operation without the builder's normalization or length
    /// bookkeeping, for tests that need malformed scripts.
    #[cfg(test)]
    pub(crate) fn from_raw(ops: Vec<Op>, base_len: usize, target_len: usize) -> Self {
        Self {
            ops,
            base_len,
            target_len,
            client_id: 0,
        }
    }

    /// Replay the script against `text`.
    pub fn apply(&self, text: &str) -> Result<String> {
        let length = text.chars().count();
        if length != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual: length,
            });
        }

        let mut result = String::with_capacity(text.len());
        let mut chars = text.chars();
        let mut consumed = 0;

        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    if consumed + n > length {
                        return Err(OtError::RetainOverflow {
                            offset: consumed,
                            count: *n,
                            length,
                        });
                    }
                    result.extend(chars.by_ref().take(*n));
                    consumed += n;
                }
                Op::Insert(inserted) => result.push_str(inserted),
                Op::Delete(n) => {
                    chars.by_ref().take(*n).for_each(drop);
                    consumed += n;
                }
            }
        }

        if consumed != length {
            return Err(OtError::Incomplete { consumed, length });
        }
        Ok(result)
    }
}

/// Incremental, normalizing builder for [`Operation`].
#[derive(Debug, Default)]
pub struct OperationBuilder {
    operation: Operation,
}

impl OperationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(&mut self, client_id: ClientId) -> &mut Self {
        self.operation.client_id = client_id;
        self
    }

    /// Keep the next `n` characters.
    pub fn retain(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        let op = &mut self.operation;
        op.base_len += n;
        op.target_len += n;
        match op.ops.last_mut() {
            Some(Op::Retain(last)) => *last += n,
            _ => op.ops.push(Op::Retain(n)),
        }
        self
    }

    /// Insert `text` at the current position.
    pub fn insert(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        let op = &mut self.operation;
        op.target_len += text.chars().count();
        push_insert(&mut op.ops, text);
        self
    }

    /// Drop the next `n` characters.
    pub fn delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        let op = &mut self.operation;
        op.base_len += n;
        match op.ops.last_mut() {
            Some(Op::Delete(last)) => *last += n,
            _ => op.ops.push(Op::Delete(n)),
        }
        self
    }

    /// Append a primitive through the normalizing path.
    pub fn push(&mut self, op: &Op) -> &mut Self {
        match op {
            Op::Retain(n) => self.retain(*n),
            Op::Insert(text) => self.insert(text),
            Op::Delete(n) => self.delete(*n),
        }
    }

    /// Take the finished operation, leaving the builder empty.
    pub fn build(&mut self) -> Operation {
        std::mem::take(&mut self.operation)
    }
}

// Insert-then-delete at one position commutes with delete-then-insert, so
// the insert always goes first.
fn push_insert(ops: &mut Vec<Op>, text: &str) {
    match ops.as_mut_slice() {
        [.., Op::Insert(last)] => return last.push_str(text),
        [.., Op::Insert(prev), Op::Delete(_)] => return prev.push_str(text),
        _ => {}
    }
    match ops.pop() {
        Some(Op::Delete(n)) => {
            ops.push(Op::Insert(text.to_owned()));
            ops.push(Op::Delete(n));
        }
        last => {
            ops.extend(last);
            ops.push(Op::Insert(text.to_owned()));
        }
    }
}
