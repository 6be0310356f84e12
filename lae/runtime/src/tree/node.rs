//! Computation nodes: literal matrices and the operators over them

use crate::types::MatrixData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an expression tree node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Matrix,
    Add,
    Negate,
    Multiply,
    Transpose,
}

impl NodeKind {
    /// Operator symbol used in the JSON input format
    pub fn symbol(self) -> &'static str {
        match self {
            NodeKind::Matrix => "matrix",
            NodeKind::Add => "+",
            NodeKind::Negate => "-",
            NodeKind::Multiply => "*",
            NodeKind::Transpose => "T",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(NodeKind::Add),
            "-" => Some(NodeKind::Negate),
            "*" => Some(NodeKind::Multiply),
            "T" => Some(NodeKind::Transpose),
            _ => None,
        }
    }

    /// Operators that may be regrouped into nested binary nodes
    pub fn is_associative(self) -> bool {
        matches!(self, NodeKind::Add | NodeKind::Multiply)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// What the engine needs from an expression tree
pub trait ExpressionNode: Sized {
    fn kind(&self) -> NodeKind;

    /// Operands, in order
    fn children(&self) -> &[Self];

    /// Row-major payload of a literal node
    fn matrix(&self) -> Option<&[Vec<f64>]>;

    /// Regroup the tree so that every operator node is unary or binary
    fn associative_nesting(&mut self);

    /// Some operator node whose operands are all literals
    fn find_resolvable(&mut self) -> Option<&mut Self>;

    /// Replace this node (and its subtree) with a literal
    fn resolve(&mut self, data: MatrixData);
}

/// Owned expression tree node
#[derive(Clone, Debug, PartialEq)]
pub struct ComputationNode {
    kind: NodeKind,
    matrix: Option<MatrixData>,
    children: Vec<ComputationNode>,
}

impl ComputationNode {
    /// Literal matrix leaf
    pub fn literal(data: MatrixData) -> Self {
        Self {
            kind: NodeKind::Matrix,
            matrix: Some(data),
            children: Vec::new(),
        }
    }

    /// Operator node over `children`
    pub fn operator(kind: NodeKind, children: Vec<ComputationNode>) -> Self {
        Self {
            kind,
            matrix: None,
            children,
        }
    }

    pub fn add(left: ComputationNode, right: ComputationNode) -> Self {
        Self::operator(NodeKind::Add, vec![left, right])
    }

    pub fn multiply(left: ComputationNode, right: ComputationNode) -> Self {
        Self::operator(NodeKind::Multiply, vec![left, right])
    }

    pub fn negate(operand: ComputationNode) -> Self {
        Self::operator(NodeKind::Negate, vec![operand])
    }

    pub fn transpose(operand: ComputationNode) -> Self {
        Self::operator(NodeKind::Transpose, vec![operand])
    }

    pub fn is_literal(&self) -> bool {
        self.kind == NodeKind::Matrix
    }

    /// Take the payload of a literal node
    pub fn into_matrix(self) -> Option<MatrixData> {
        self.matrix
    }

    fn is_resolvable(&self) -> bool {
        !self.is_literal() && !self.children.is_empty() && self.children.iter().all(Self::is_literal)
    }

    /// Child indices leading to the leftmost, deepest-first resolvable node
    fn resolvable_path(&self) -> Option<Vec<usize>> {
        if self.is_resolvable() {
            return Some(Vec::new());
        }
        self.children.iter().enumerate().find_map(|(i, child)| {
            child.resolvable_path().map(|mut path| {
                path.insert(0, i);
                path
            })
        })
    }
}

impl ExpressionNode for ComputationNode {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn matrix(&self) -> Option<&[Vec<f64>]> {
        self.matrix.as_deref()
    }

    fn associative_nesting(&mut self) {
        for child in &mut self.children {
            child.associative_nesting();
        }
        if !self.kind.is_associative() || self.children.len() <= 2 {
            return;
        }

        // a op b op c op d  =>  ((a op b) op c) op d
        let kind = self.kind;
        let mut operands = std::mem::take(&mut self.children).into_iter();
        let mut nested = match (operands.next(), operands.next()) {
            (Some(first), Some(second)) => Self::operator(kind, vec![first, second]),
            _ => return,
        };
        for operand in operands {
            nested = Self::operator(kind, vec![nested, operand]);
        }
        *self = nested;
    }

    fn find_resolvable(&mut self) -> Option<&mut Self> {
        let path = self.resolvable_path()?;
        let mut node = self;
        for index in path {
            node = &mut node.children[index];
        }
        Some(node)
    }

    fn resolve(&mut self, data: MatrixData) {
        self.kind = NodeKind::Matrix;
        self.matrix = Some(data);
        self.children.clear();
    }
}
