//! Transform - reconcile two concurrent operations.
//!
//! Given `a` and `b` made against the same text, `transform(a, b)` returns
//! `(a', b')` such that applying `a` then `b'` gives the same text as
//! applying `b` then `a'`:
//!
//! ```text
//!          a
//!     S ------> Sa
//!     |         |
//!   b |         | b'
//!     v         v
//!     Sb -----> S'
//!          a'
//! ```
//!
//! When both sides insert at the same position, the operation with the
//! larger client id goes first.

use crate::error::{OtError, Result};
use crate::operation::{Op, Operation};
use std::slice;

/// Remaining part of the op under a cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Piece<'a> {
    Retain(usize),
    Insert(&'a str),
    Delete(usize),
}

impl<'a> Piece<'a> {
    fn from_op(op: &'a Op) -> Self {
        match op {
            Op::Retain(n) => Piece::Retain(*n),
            Op::Insert(text) => Piece::Insert(text),
            Op::Delete(n) => Piece::Delete(*n),
        }
    }
}

/// Pull-based cursor over an operation's ops.
struct Cursor<'a> {
    ops: slice::Iter<'a, Op>,
    head: Option<Piece<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(operation: &'a Operation) -> Self {
        let mut ops = operation.ops().iter();
        let head = ops.next().map(Piece::from_op);
        Self { ops, head }
    }

    /// The current piece, or `None` once exhausted.
    fn peek(&self) -> Option<Piece<'a>> {
        self.head
    }

    fn advance(&mut self) {
        self.head = self.ops.next().map(Piece::from_op);
    }

    /// Consume `n` units of the current retain/delete.
    fn consume(&mut self, n: usize) {
        let remaining = match self.head {
            Some(Piece::Retain(len)) => Piece::Retain(len - n),
            Some(Piece::Delete(len)) => Piece::Delete(len - n),
            _ => return,
        };
        match remaining {
            Piece::Retain(0) | Piece::Delete(0) => self.advance(),
            piece => self.head = Some(piece),
        }
    }
}

/// Transform two operations made against the same base text.
pub fn transform(a: &Operation, b: &Operation) -> Result<(Operation, Operation)> {
    if a.base_len() != b.base_len() {
        return Err(OtError::LengthMismatch {
            expected: a.base_len(),
            actual: b.base_len(),
        });
    }

    let mut a_prime = Operation::builder();
    a_prime.client_id(a.client_id());
    let mut b_prime = Operation::builder();
    b_prime.client_id(b.client_id());

    let a_first = a.client_id() > b.client_id();
    let mut ca = Cursor::new(a);
    let mut cb = Cursor::new(b);

    loop {
        match (ca.peek(), cb.peek()) {
            (None, None) => break,
            (Some(Piece::Insert(text)), other)
                if a_first || !matches!(other, Some(Piece::Insert(_))) =>
            {
                a_prime.insert(text);
                b_prime.retain(text.chars().count());
                ca.advance();
            }
            (_, Some(Piece::Insert(text))) => {
                a_prime.retain(text.chars().count());
                b_prime.insert(text);
                cb.advance();
            }
            (None, Some(_)) => {
                return Err(OtError::incompatible("first operation is too short"));
            }
            (Some(_), None) => {
                return Err(OtError::incompatible("first operation is too long"));
            }
            (Some(pa), Some(pb)) => {
                let n = match (pa, pb) {
                    (Piece::Retain(x), Piece::Retain(y)) => {
                        let n = x.min(y);
                        a_prime.retain(n);
                        b_prime.retain(n);
                        n
                    }
                    (Piece::Delete(x), Piece::Delete(y)) => x.min(y),
                    (Piece::Delete(x), Piece::Retain(y)) => {
                        let n = x.min(y);
                        a_prime.delete(n);
                        n
                    }
                    (Piece::Retain(x), Piece::Delete(y)) => {
                        let n = x.min(y);
                        b_prime.delete(n);
                        n
                    }
                    _ => return Err(OtError::incompatible("unexpected insert")),
                };
                ca.consume(n);
                cb.consume(n);
            }
        }
    }

    Ok((a_prime.build(), b_prime.build()))
}
