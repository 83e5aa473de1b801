use std::io;

use thiserror::Error;

use crate::types::CubeId;

/// Error type for serial resolution and cube-list loading failures.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("cube '{cube_id}' label is missing keyword '{keyword}'")]
    MissingKeyword { cube_id: CubeId, keyword: String },
    #[error("cube '{cube_id}' has no usable label: {reason}")]
    UnreadableLabel { cube_id: CubeId, reason: String },
    #[error("no serial registered for cube '{cube_id}'")]
    UnknownCube { cube_id: CubeId },
    #[error(transparent)]
    Io(#[from] io::Error),
}
