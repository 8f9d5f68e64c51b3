//! Runtime options of the retargeting engine.
//!
//! ```json
//! {"mask": 1, "singularity_threshold_deg": 2.0}
//! ```
//!
//! Every key is optional.

use crate::error::RetargetResult;
use crate::joint::ServosMask;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default half-width (degrees) of the straight-limb dead zone.
pub const DEFAULT_SINGULARITY_THRESHOLD_DEG: f32 = 1.0;

fn default_singularity_threshold() -> f32 {
    DEFAULT_SINGULARITY_THRESHOLD_DEG
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetargetConfig {
    /// Body regions left untouched by [`crate::RetargetEngine::update`].
    #[serde(default)]
    pub mask: ServosMask,
    /// A shoulder or elbow bent less than this (degrees) keeps the twist
    /// it already has.
    #[serde(default = "default_singularity_threshold")]
    pub singularity_threshold_deg: f32,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            mask: ServosMask::empty(),
            singularity_threshold_deg: DEFAULT_SINGULARITY_THRESHOLD_DEG,
        }
    }
}

impl RetargetConfig {
    pub fn load(path: &Path) -> RetargetResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> RetargetResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config: RetargetConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RetargetConfig::default());
        let config: RetargetConfig = serde_json::from_str(r#"{"mask": 2}"#).unwrap();
        assert_eq!(config.mask, ServosMask::LOWER_BODY);
        assert_eq!(config.singularity_threshold_deg, 1.0);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retarget.json");
        let config = RetargetConfig {
            mask: ServosMask::UPPER_BODY,
            singularity_threshold_deg: 2.5,
        };
        config.save(&path).unwrap();
        assert_eq!(RetargetConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RetargetConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, crate::error::RetargetError::Io(_)));
    }
}
