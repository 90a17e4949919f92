//! Diff engine - synthesize an operation from a before/after text pair.
//!
//! The common prefix and suffix are retained as-is. Only the middle region
//! goes through the quadratic LCS walk, which keeps typical single edits
//! cheap.

use crate::operation::{Operation, OperationBuilder};

/// Build the operation that turns `source` into `target`.
///
/// The result always satisfies `diff(s, t).apply(s) == Ok(t)`.
pub fn diff(source: &str, target: &str) -> Operation {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();

    let min_len = source.len().min(target.len());
    let prefix = source
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = source[prefix..]
        .iter()
        .rev()
        .zip(target[prefix..].iter().rev())
        .take(min_len - prefix)
        .take_while(|(a, b)| a == b)
        .count();

    let source_mid = &source[prefix..source.len() - suffix];
    let target_mid = &target[prefix..target.len() - suffix];

    let mut builder = Operation::builder();
    builder.retain(prefix);
    edit_middle(&mut builder, source_mid, target_mid);
    builder.retain(suffix);
    builder.build()
}

fn edit_middle(builder: &mut OperationBuilder, source: &[char], target: &[char]) {
    match (source.is_empty(), target.is_empty()) {
        (true, true) => return,
        (true, false) => {
            builder.insert(&target.iter().collect::<String>());
            return;
        }
        (false, true) => {
            builder.delete(source.len());
            return;
        }
        (false, false) => {}
    }

    let table = lcs_table(source, target);
    let (mut i, mut j) = (0, 0);
    while i < source.len() && j < target.len() {
        if source[i] == target[j] {
            builder.retain(1);
            i += 1;
            j += 1;
        } else if table.get(i, j) == table.get(i + 1, j) {
            builder.delete(1);
            i += 1;
        } else {
            let mut buf = [0u8; 4];
            builder.insert(target[j].encode_utf8(&mut buf));
            j += 1;
        }
    }

    builder.delete(source.len() - i);
    builder.insert(&target[j..].iter().collect::<String>());
}

/// `get(i, j)` is the LCS length of `source[i..]` and `target[j..]`.
struct LcsTable {
    width: usize,
    cells: Vec<usize>,
}

impl LcsTable {
    fn get(&self, i: usize, j: usize) -> usize {
        self.cells[i * self.width + j]
    }
}

fn lcs_table(source: &[char], target: &[char]) -> LcsTable {
    let width = target.len() + 1;
    let mut cells = vec![0; (source.len() + 1) * width];

    for i in (0..source.len()).rev() {
        for j in (0..target.len()).rev() {
            cells[i * width + j] = if source[i] == target[j] {
                1 + cells[(i + 1) * width + j + 1]
            } else {
                cells[(i + 1) * width + j].max(cells[i * width + j + 1])
            };
        }
    }

    LcsTable { width, cells }
}
