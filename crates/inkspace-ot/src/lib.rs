//! # inkspace-ot
//!
//! Operational transformation over flat text.
//!
//! - [`operation`] - the Retain/Insert/Delete edit script and its builder
//! - [`codec`] - compact JSON wire format for operations
//! - [`diff`] - turns a before/after text pair into an operation
//! - [`transform`] - reconciles two concurrent operations
//! - [`selection`] - keeps cursors and selections valid across edits
//!
//! ```rust
//! use inkspace_ot::{diff, transform, Operation};
//!
//! let base = "ab";
//! let a = Operation::builder().client_id(1).insert("X").retain(2).build();
//! let b = Operation::builder().client_id(2).delete(1).retain(1).build();
//!
//! let (a_prime, b_prime) = transform(&a, &b).unwrap();
//! let left = b_prime.apply(&a.apply(base).unwrap()).unwrap();
//! let right = a_prime.apply(&b.apply(base).unwrap()).unwrap();
//! assert_eq!(left, "Xb");
//! assert_eq!(left, right);
//!
//! let edit = diff("hello", "hallo");
//! assert_eq!(edit.apply("hello").unwrap(), "hallo");
//! ```

pub mod codec;
pub mod diff;
pub mod error;
pub mod operation;
pub mod selection;
pub mod transform;

pub use codec::{OperationData, WireOp};
pub use diff::diff;
pub use error::{OtError, Result};
pub use operation::{ClientId, Op, Operation, OperationBuilder};
pub use selection::{transform_selection, Selection};
pub use transform::transform;
