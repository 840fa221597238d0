//! Non-fatal problems found during a run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage that raised an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Loading and placing the mesh.
    Transform,
    /// Plane intersection.
    Slice,
    /// Contour reconstruction.
    Contours,
    /// Hatch generation.
    Hatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Transform => "transform",
            Stage::Slice => "slice",
            Stage::Contours => "contours",
            Stage::Hatch => "hatch",
        })
    }
}

/// A problem that did not stop the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineIssue {
    /// Stage that raised the issue.
    pub stage: Stage,
    /// Model the issue belongs to.
    pub model_index: usize,
    /// Layer the issue belongs to, if it is layer specific.
    pub layer_index: Option<usize>,
    /// Description.
    pub message: String,
}

impl PipelineIssue {
    /// Create an issue and log it at `warn`.
    pub fn raise(
        stage: Stage,
        model_index: usize,
        layer_index: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        let issue = Self {
            stage,
            model_index,
            layer_index,
            message: message.into(),
        };
        tracing::warn!(
            stage = %issue.stage,
            model = issue.model_index,
            layer = ?issue.layer_index,
            "{}",
            issue.message
        );
        issue
    }
}

impl fmt::Display for PipelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] model {}", self.stage, self.model_index)?;
        if let Some(layer) = self.layer_index {
            write!(f, ", layer {layer}")?;
        }
        write!(f, ": {}", self.message)
    }
}
