//! Tree - Expression Trees Over Matrices
//!
//! The engine reduces a tree one resolvable node at a time through the
//! `ExpressionNode` capability trait. `ComputationNode` is the owned tree
//! used by the driver; `input` and `output` move trees and results in and
//! out of JSON files.

pub mod input;
mod node;
pub mod output;

pub use node::{ComputationNode, ExpressionNode, NodeKind};
pub use output::RunOutput;
