use thiserror::Error;

use crate::constants::StageIndex;

#[derive(Error, Debug)]
pub enum StageTrackError {
    #[error("Closest-point query against an empty candidate set")]
    EmptyCandidateSet,

    #[error("Point key not found: {0}")]
    KeyNotFound(String),

    #[error("Stage {0} reappears after a different stage was seen")]
    NonContiguousStage(StageIndex),

    #[error("Stage {0} is missing from the stage clouds")]
    MissingStage(StageIndex),

    #[error("Export line has {found} fields, expected at least {expected}: {line}")]
    ExportLineTooShort {
        line: String,
        found: usize,
        expected: usize,
    },

    #[error("Could not parse field {field} of export line as a number: {value}")]
    InvalidExportField { field: usize, value: String },

    #[error("Invalid point key, expected \"(x, y, z)\": {0}")]
    InvalidPointKey(String),

    #[error("Invalid tracking parameter: {0}")]
    InvalidTrackParams(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PartialEq for StageTrackError {
    fn eq(&self, other: &Self) -> bool {
        use StageTrackError::*;
        match (self, other) {
            (EmptyCandidateSet, EmptyCandidateSet) => true,
            (KeyNotFound(a), KeyNotFound(b)) => a == b,
            (NonContiguousStage(a), NonContiguousStage(b)) => a == b,
            (MissingStage(a), MissingStage(b)) => a == b,
            (
                ExportLineTooShort { line: a, .. },
                ExportLineTooShort { line: b, .. },
            ) => a == b,
            (
                InvalidExportField { field: a, value: av },
                InvalidExportField { field: b, value: bv },
            ) => a == b && av == bv,
            (InvalidPointKey(a), InvalidPointKey(b)) => a == b,
            (InvalidTrackParams(a), InvalidTrackParams(b)) => a == b,

            // Wrapped foreign errors are not comparable: equal if same variant
            (IoError(_), IoError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}
