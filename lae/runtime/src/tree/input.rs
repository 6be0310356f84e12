//! JSON expression input.
//!
//! A node is either a literal 2-D array or
//! `{"operator": "+" | "*" | "-" | "T", "operands": [node, ...]}`.

use super::node::{ComputationNode, NodeKind};
use crate::error::{LaeError, LaeResult};
use crate::types::{validate_rectangular, MatrixData};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
    Literal(MatrixData),
    Operation {
        operator: String,
        operands: Vec<RawNode>,
    },
}

/// Parse an expression tree from JSON text
pub fn parse_str(json: &str) -> LaeResult<ComputationNode> {
    let raw: RawNode = serde_json::from_str(json)?;
    build(raw)
}

/// Parse an expression tree from a JSON file
pub fn parse_file(path: impl AsRef<Path>) -> LaeResult<ComputationNode> {
    let text = fs::read_to_string(path)?;
    parse_str(&text)
}

fn build(raw: RawNode) -> LaeResult<ComputationNode> {
    match raw {
        RawNode::Literal(data) => {
            validate_rectangular(&data)?;
            Ok(ComputationNode::literal(data))
        }
        RawNode::Operation { operator, operands } => {
            let kind = NodeKind::from_symbol(&operator).ok_or_else(|| {
                LaeError::InvalidArgument(format!("unknown operator '{operator}'"))
            })?;
            check_arity(kind, operands.len())?;
            let children = operands
                .into_iter()
                .map(build)
                .collect::<LaeResult<Vec<_>>>()?;
            Ok(ComputationNode::operator(kind, children))
        }
    }
}

fn check_arity(kind: NodeKind, count: usize) -> LaeResult<()> {
    let ok = match kind {
        NodeKind::Add | NodeKind::Multiply => count >= 2,
        NodeKind::Negate | NodeKind::Transpose => count == 1,
        NodeKind::Matrix => false,
    };
    if ok {
        Ok(())
    } else {
        Err(LaeError::InvalidArgument(format!(
            "operator '{}' cannot take {} operand(s)",
            kind, count
        )))
    }
}
