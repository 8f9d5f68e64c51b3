//! Error types for the retargeting crate.

use crate::joint::JointPosition;
use crate::skeleton::HumanBone;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetargetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown joint '{0}' in calibration")]
    UnknownJoint(String),

    #[error("no calibration entry for joint {0}")]
    MissingCalibration(JointPosition),

    #[error("source skeleton has no {0} bone")]
    MissingBone(HumanBone),

    #[error("rest pose has not been recorded")]
    RestPoseNotRecorded,
}

pub type RetargetResult<T> = Result<T, RetargetError>;
