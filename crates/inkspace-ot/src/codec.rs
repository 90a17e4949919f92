//! Compact JSON wire format for operations.
//!
//! ```json
//! {"cid": 7, "base": 5, "target": 5, "ops": [1, -1, "a", 3]}
//! ```
//!
//! A positive integer retains, a negative integer deletes (count negated),
//! a string inserts. Zero is never emitted and is rejected on decode.

use crate::error::{OtError, Result};
use crate::operation::{ClientId, Op, Operation};
use serde::{Deserialize, Serialize};

/// One encoded primitive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOp {
    Count(i64),
    Text(String),
}

impl From<&Op> for WireOp {
    fn from(op: &Op) -> Self {
        match op {
            Op::Retain(n) => WireOp::Count(*n as i64),
            Op::Insert(text) => WireOp::Text(text.clone()),
            Op::Delete(n) => WireOp::Count(-(*n as i64)),
        }
    }
}

/// Encoded operation as it travels between replicas and the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationData {
    pub cid: ClientId,
    pub base: usize,
    pub target: usize,
    pub ops: Vec<WireOp>,
}

impl OperationData {
    /// Decode into an [`Operation`], validating every entry and the
    /// declared lengths.
    pub fn decode(&self) -> Result<Operation> {
        let mut builder = Operation::builder();
        builder.client_id(self.cid);

        for (index, raw) in self.ops.iter().enumerate() {
            let invalid = |reason: &str| OtError::InvalidWireOp {
                index,
                reason: reason.to_string(),
            };
            match raw {
                WireOp::Text(text) if text.is_empty() => return Err(invalid("empty insert")),
                WireOp::Text(text) => {
                    builder.insert(text);
                }
                WireOp::Count(0) => return Err(invalid("0 is not a valid op")),
                WireOp::Count(n) => {
                    let count = usize::try_from(n.unsigned_abs())
                        .map_err(|_| invalid("count out of range"))?;
                    if *n > 0 {
                        builder.retain(count);
                    } else {
                        builder.delete(count);
                    }
                }
            }
        }

        let operation = builder.build();
        if operation.base_len() != self.base {
            return Err(OtError::WireLengthMismatch {
                field: "base",
                declared: self.base,
                actual: operation.base_len(),
            });
        }
        if operation.target_len() != self.target {
            return Err(OtError::WireLengthMismatch {
                field: "target",
                declared: self.target,
                actual: operation.target_len(),
            });
        }
        Ok(operation)
    }
}

impl From<&Operation> for OperationData {
    fn from(operation: &Operation) -> Self {
        Self {
            cid: operation.client_id(),
            base: operation.base_len(),
            target: operation.target_len(),
            ops: operation.ops().iter().map(WireOp::from).collect(),
        }
    }
}

impl From<Operation> for OperationData {
    fn from(operation: Operation) -> Self {
        Self::from(&operation)
    }
}

impl TryFrom<OperationData> for Operation {
    type Error = OtError;

    fn try_from(data: OperationData) -> Result<Self> {
        data.decode()
    }
}
