//! JSON result output: `{"result": [[...]]}` or `{"error": "..."}`

use crate::error::LaeResult;
use crate::types::MatrixData;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Outcome of one engine run, as written to the output file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutput {
    Result(MatrixData),
    Error(String),
}

impl RunOutput {
    pub fn to_json(&self) -> LaeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> LaeResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
