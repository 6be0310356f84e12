//! Linear Algebra Engine - Row-Parallel Tree Reduction
//!
//! Each step takes one resolvable node, loads its operands into the two
//! reusable matrix slots, fans the operator out into one task per row of
//! the left slot and writes the left slot back into the tree. Row tasks
//! only mutate their own left row and only read the right slot, so the
//! tasks of one step are independent of each other.

use crate::error::{LaeError, LaeResult};
use crate::memory::LockedMatrix;
use crate::scheduling::{
    ExecutorConfig, ExecutorReport, FatigueExecutor, SequentialExecutor, Task, TaskExecutor,
};
use crate::tree::{ExpressionNode, NodeKind};
use crate::types::Orientation;
use log::debug;
use std::sync::Arc;

/// Configuration for the engine
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Worker pool settings (ignored when `parallel` is false)
    pub executor: ExecutorConfig,
    /// Run row tasks on the fatigue executor rather than inline
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            parallel: true,
        }
    }
}

/// Reduces expression trees to a single literal matrix
pub struct LinearAlgebraEngine {
    left: Arc<LockedMatrix>,
    right: Arc<LockedMatrix>,
    executor: Box<dyn TaskExecutor>,
}

impl LinearAlgebraEngine {
    /// Engine backed by a fatigue executor with `num_threads` workers
    pub fn new(num_threads: usize) -> LaeResult<Self> {
        Self::with_config(EngineConfig {
            executor: ExecutorConfig::with_threads(num_threads),
            parallel: true,
        })
    }

    pub fn with_config(config: EngineConfig) -> LaeResult<Self> {
        let executor: Box<dyn TaskExecutor> = if config.parallel {
            Box::new(FatigueExecutor::with_config(config.executor)?)
        } else {
            Box::new(SequentialExecutor::new(1)?)
        };
        Ok(Self::with_executor(executor))
    }

    pub fn with_executor(executor: Box<dyn TaskExecutor>) -> Self {
        Self {
            left: Arc::new(LockedMatrix::new()),
            right: Arc::new(LockedMatrix::new()),
            executor,
        }
    }

    /// Reduce `root` until it is a literal matrix
    pub fn run<N: ExpressionNode>(&mut self, mut root: N) -> LaeResult<N> {
        while root.kind() != NodeKind::Matrix {
            self.load_and_compute(&mut root)?;
        }
        Ok(root)
    }

    /// Evaluate one resolvable node somewhere under `node`
    pub fn load_and_compute<N: ExpressionNode>(&mut self, node: &mut N) -> LaeResult<()> {
        if node.kind() == NodeKind::Matrix {
            return Ok(());
        }
        node.associative_nesting();
        let target = node.find_resolvable().ok_or_else(|| {
            LaeError::InvalidArgument("expression has an operator with no operands".to_string())
        })?;

        let kind = target.kind();
        let tasks = match kind {
            NodeKind::Add => {
                let (a, b) = binary_operands(target)?;
                self.left.load_row_major(a)?;
                self.right.load_row_major(b)?;
                self.create_add_tasks()?
            }
            NodeKind::Multiply => {
                let (a, b) = binary_operands(target)?;
                self.left.load_row_major(a)?;
                self.right.load_column_major(b)?;
                self.create_multiply_tasks()?
            }
            NodeKind::Negate => {
                self.left.load_row_major(unary_operand(target)?)?;
                self.create_negate_tasks()?
            }
            NodeKind::Transpose => {
                self.left.load_row_major(unary_operand(target)?)?;
                self.create_transpose_tasks()?
            }
            NodeKind::Matrix => {
                return Err(LaeError::UnsupportedOperation(
                    "literal matrix selected as an operator".to_string(),
                ))
            }
        };

        debug!("resolving '{}' node with {} row tasks", kind, tasks.len());
        self.executor.submit_all(tasks)?;
        target.resolve(self.left.read_row_major()?);
        Ok(())
    }

    /// One task per left row: `left[i] += right[i]`
    pub fn create_add_tasks(&self) -> LaeResult<Vec<Task>> {
        let rows = require_rows(&self.left, "add")?;
        require_rows(&self.right, "add")?;
        require_orientation(&self.left, Orientation::Row)?;
        require_orientation(&self.right, Orientation::Row)?;

        if self.right.len() != rows {
            return Err(LaeError::DimensionMismatch {
                expected: rows,
                found: self.right.len(),
            });
        }
        let (left_width, right_width) = (self.left.get(0)?.len(), self.right.get(0)?.len());
        if left_width != right_width {
            return Err(LaeError::DimensionMismatch {
                expected: left_width,
                found: right_width,
            });
        }

        (0..rows)
            .map(|i| {
                let row = self.left.get(i)?;
                let other = self.right.get(i)?;
                Ok(Box::new(move || row.add(&other)) as Task)
            })
            .collect()
    }

    /// One task per left row: `left[i] = left[i] × right`
    pub fn create_multiply_tasks(&self) -> LaeResult<Vec<Task>> {
        let rows = require_rows(&self.left, "multiply")?;
        require_rows(&self.right, "multiply")?;
        require_orientation(&self.left, Orientation::Row)?;
        require_orientation(&self.right, Orientation::Column)?;

        // Left width must equal right height, i.e. the length of a right column
        let (left_width, right_height) = (self.left.get(0)?.len(), self.right.get(0)?.len());
        if left_width != right_height {
            return Err(LaeError::DimensionMismatch {
                expected: left_width,
                found: right_height,
            });
        }

        (0..rows)
            .map(|i| {
                let row = self.left.get(i)?;
                let right = Arc::clone(&self.right);
                Ok(Box::new(move || row.vec_mat_mul(&right)) as Task)
            })
            .collect()
    }

    /// One task per left row: `left[i] = -left[i]`
    pub fn create_negate_tasks(&self) -> LaeResult<Vec<Task>> {
        let rows = require_rows(&self.left, "negate")?;
        (0..rows)
            .map(|i| {
                let row = self.left.get(i)?;
                Ok(Box::new(move || {
                    row.negate();
                    Ok(())
                }) as Task)
            })
            .collect()
    }

    /// One task per left row: relabel the row as a column
    pub fn create_transpose_tasks(&self) -> LaeResult<Vec<Task>> {
        let rows = require_rows(&self.left, "transpose")?;
        (0..rows)
            .map(|i| {
                let row = self.left.get(i)?;
                Ok(Box::new(move || {
                    row.transpose();
                    Ok(())
                }) as Task)
            })
            .collect()
    }

    /// Worker activity so far
    pub fn report(&self) -> ExecutorReport {
        self.executor.report()
    }

    /// Worker activity so far, one line per worker plus the fairness factor
    pub fn worker_report(&self) -> String {
        self.executor.report().to_string()
    }

    /// Stop the executor. The engine cannot compute afterwards.
    pub fn shutdown(&self) -> LaeResult<()> {
        self.executor.shutdown()
    }
}

fn require_rows(matrix: &LockedMatrix, op: &str) -> LaeResult<usize> {
    match matrix.len() {
        0 => Err(LaeError::InvalidArgument(format!("cannot {op} an empty matrix"))),
        rows => Ok(rows),
    }
}

fn require_orientation(matrix: &LockedMatrix, expected: Orientation) -> LaeResult<()> {
    let found = matrix.orientation()?;
    if found != expected {
        return Err(LaeError::orientation(expected, found));
    }
    Ok(())
}

fn operand<N: ExpressionNode>(node: &N, index: usize) -> LaeResult<&[Vec<f64>]> {
    node.children()
        .get(index)
        .and_then(|child| child.matrix())
        .ok_or_else(|| {
            LaeError::InvalidArgument(format!(
                "operator '{}' is missing literal operand {}",
                node.kind(),
                index
            ))
        })
}

fn expect_arity<N: ExpressionNode>(node: &N, arity: usize) -> LaeResult<()> {
    let count = node.children().len();
    if count != arity {
        return Err(LaeError::InvalidArgument(format!(
            "operator '{}' expects {} operand(s), found {}",
            node.kind(),
            arity,
            count
        )));
    }
    Ok(())
}

fn unary_operand<N: ExpressionNode>(node: &N) -> LaeResult<&[Vec<f64>]> {
    expect_arity(node, 1)?;
    operand(node, 0)
}

fn binary_operands<N: ExpressionNode>(node: &N) -> LaeResult<(&[Vec<f64>], &[Vec<f64>])> {
    expect_arity(node, 2)?;
    Ok((operand(node, 0)?, operand(node, 1)?))
}
