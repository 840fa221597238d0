//! TOML job configuration.
//!
//! ```toml
//! layer_thickness = 0.05
//! pattern = "lines"
//!
//! [hatching]
//! hatch_spacing = 0.1
//! layer_rotation = 67.0
//!
//! [[models]]
//! mesh = "part.json"
//! transform = { position = [10.0, 0.0, 0.0], rotation = [0.0, 45.0, 0.0] }
//! ```

use std::path::{Path, PathBuf};

use pbf_hatch::{HatchPattern, HatchingParameters};
use pbf_mesh::ModelTransform;
use pbf_slicer::{SliceSettings, DEFAULT_POINT_QUANTUM, DEFAULT_SECTION_TOLERANCE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a job file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// File is not valid TOML for a job.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One model of the build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the mesh hand-off JSON.
    pub mesh: PathBuf,
    /// Placement on the build surface.
    #[serde(default)]
    pub transform: ModelTransform,
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Layer thickness (mm).
    pub layer_thickness: f64,
    /// Height of the build surface (world Y).
    pub build_surface_y: f64,
    /// Outline tolerance for section grouping (mm).
    pub section_tolerance: f64,
    /// Endpoint merge grid for contour reconstruction (mm).
    pub point_quantum: f64,
    /// Hatching strategy.
    pub pattern: HatchPattern,
    /// Hatching parameters.
    pub hatching: HatchingParameters,
    /// Models to process.
    pub models: Vec<ModelConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layer_thickness: 0.2,
            build_surface_y: 0.0,
            section_tolerance: DEFAULT_SECTION_TOLERANCE,
            point_quantum: DEFAULT_POINT_QUANTUM,
            pattern: HatchPattern::default(),
            hatching: HatchingParameters::default(),
            models: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a job from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a job file. Relative mesh paths are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            for model in &mut config.models {
                if model.mesh.is_relative() {
                    model.mesh = base.join(&model.mesh);
                }
            }
        }
        Ok(config)
    }

    /// Slicer settings carried by this job.
    pub fn slice_settings(&self) -> SliceSettings {
        SliceSettings {
            layer_thickness: self.layer_thickness,
            build_surface_y: self.build_surface_y,
            section_tolerance: self.section_tolerance,
            point_quantum: self.point_quantum,
        }
    }

    /// Check value ranges.
    ///
    /// Hatching parameters are not checked here: out-of-range values yield
    /// empty hatching and a reported issue rather than a failed load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.slice_settings()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for (i, model) in self.models.iter().enumerate() {
            let scale = model.transform.scale;
            if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "model {i}: scale must be finite and non-zero, got {scale:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    const JOB: &str = r#"
layer_thickness = 0.05
pattern = "grid"

[hatching]
hatch_spacing = 0.08
layer_rotation = 90.0
contour_count = 2

[[models]]
mesh = "bracket.json"
transform = { position = [5.0, 0.0, -5.0], rotation = [0.0, 30.0, 0.0] }

[[models]]
mesh = "/abs/pin.json"
"#;

    #[test]
    fn test_parse_job() {
        let config = PipelineConfig::from_toml_str(JOB).unwrap();
        assert_relative_eq!(config.layer_thickness, 0.05);
        assert_eq!(config.pattern, HatchPattern::Grid);
        assert_relative_eq!(config.hatching.hatch_spacing, 0.08);
        assert_eq!(config.hatching.contour_count, 2);
        assert!(config.hatching.enable_contours);
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].transform.rotation, [0.0, 30.0, 0.0]);
        assert_eq!(config.models[1].transform, ModelTransform::default());
        assert_relative_eq!(config.slice_settings().section_tolerance, DEFAULT_SECTION_TOLERANCE);
    }

    #[test]
    fn test_empty_job_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("layer_thickness = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("pattern = \"zigzag\""),
            Err(ConfigError::Parse(_))
        ));
        let zero_scale = "[[models]]\nmesh = \"a.json\"\ntransform = { scale = [1.0, 0.0, 1.0] }\n";
        assert!(matches!(
            PipelineConfig::from_toml_str(zero_scale),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_resolves_relative_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(JOB.as_bytes()).unwrap();
        drop(file);

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.models[0].mesh, dir.path().join("bracket.json"));
        assert_eq!(config.models[1].mesh, PathBuf::from("/abs/pin.json"));

        let missing = PipelineConfig::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
