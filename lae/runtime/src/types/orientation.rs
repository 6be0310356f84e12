use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a vector is stored as a row or a column of its matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    /// The other orientation
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Row => write!(f, "row"),
            Orientation::Column => write!(f, "column"),
        }
    }
}
