//! Slicing and hatching of a whole build.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use pbf_export::LayerHatching;
use pbf_hatch::{HatchLine, HatchPattern, HatchingEngine, HatchingParameters};
use pbf_mesh::{Aabb, Mesh, ModelTransform, WorldMesh};
use pbf_slicer::{
    build_contours, group_islands, group_sections, LayerPlan, LayerSlice, Section, SliceSettings,
    SliceTriangles,
};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::issue::{PipelineIssue, Stage};
use crate::job::{CancelToken, Progress};

/// Layers sliced between cancellation checks.
pub const LAYER_CHUNK: usize = 32;

/// Read a mesh hand-off JSON file.
pub fn load_mesh(path: &Path) -> Result<Mesh> {
    let text = std::fs::read_to_string(path).map_err(|source| PipelineError::MeshRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh: Mesh = serde_json::from_str(&text).map_err(|source| PipelineError::MeshFormat {
        path: path.to_path_buf(),
        source,
    })?;
    mesh.validate()?;
    tracing::debug!(path = %path.display(), triangles = mesh.num_triangles(), "loaded mesh");
    Ok(mesh)
}

/// A model to process.
#[derive(Debug, Clone)]
pub struct ModelInput {
    /// Mesh in model coordinates.
    pub mesh: Mesh,
    /// Placement snapshot.
    pub transform: ModelTransform,
}

/// Slicing output of one model.
#[derive(Debug, Clone)]
pub struct SlicedModel {
    /// World-space bounds after placement.
    pub world_bounds: Aabb,
    /// Planned layers.
    pub plan: LayerPlan,
    /// Raw segments per layer, bottom to top.
    pub layers: Vec<LayerSlice>,
    /// Runs of layers sharing an outline.
    pub sections: Vec<Section>,
}

/// Everything produced for one model, keyed by layer index for rendering.
#[derive(Debug, Clone)]
pub struct ModelResult {
    /// Index of the model in the input list.
    pub model_index: usize,
    /// Slicing output.
    pub sliced: SlicedModel,
    /// Hatch lines per layer.
    pub hatching: LayerHatching,
}

impl ModelResult {
    /// Raw segments per layer.
    pub fn layers(&self) -> &[LayerSlice] {
        &self.sliced.layers
    }
}

/// Output of a full run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Models that completed, in input order.
    pub models: Vec<ModelResult>,
    /// Problems met along the way.
    pub issues: Vec<PipelineIssue>,
}

impl RunReport {
    /// Hatching of all models merged per layer index, in model order.
    pub fn combined_hatching(&self) -> LayerHatching {
        let mut combined = LayerHatching::new();
        for model in &self.models {
            for (&layer, lines) in &model.hatching {
                combined.entry(layer).or_default().extend_from_slice(lines);
            }
        }
        combined
    }
}

/// Hatch lines of one section, per layer.
struct SectionHatching {
    layers: Vec<(usize, Vec<HatchLine>)>,
    open_chains: usize,
}

/// Slices and hatches models with fixed settings.
#[derive(Debug)]
pub struct Pipeline {
    settings: SliceSettings,
    pattern: HatchPattern,
    params: HatchingParameters,
    engine: HatchingEngine,
}

impl Pipeline {
    /// A pipeline with the built-in strategies.
    pub fn new(settings: SliceSettings, pattern: HatchPattern, params: HatchingParameters) -> Self {
        Self::with_engine(settings, pattern, params, HatchingEngine::default())
    }

    /// A pipeline using a caller-supplied engine.
    pub fn with_engine(
        settings: SliceSettings,
        pattern: HatchPattern,
        params: HatchingParameters,
        engine: HatchingEngine,
    ) -> Self {
        Self {
            settings,
            pattern,
            params,
            engine,
        }
    }

    /// A pipeline for a job file.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.slice_settings(), config.pattern, config.hatching.clone())
    }

    /// Slicer settings.
    pub fn settings(&self) -> &SliceSettings {
        &self.settings
    }

    /// Hatching parameters.
    pub fn params(&self) -> &HatchingParameters {
        &self.params
    }

    /// Slice and hatch every model.
    ///
    /// A model that fails to slice is reported and skipped. Cancellation
    /// ends the run with [`PipelineError::Cancelled`].
    pub fn run(
        &self,
        models: &[ModelInput],
        cancel: &CancelToken,
        progress: &Progress,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();

        for (model_index, model) in models.iter().enumerate() {
            cancel.check()?;
            progress.report(
                model_index,
                models.len(),
                format!("Processing model {}/{}", model_index + 1, models.len()),
            );

            let sliced = match self.slice_model(
                model_index,
                model,
                cancel,
                progress,
                &mut report.issues,
            ) {
                Ok(sliced) => sliced,
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) => {
                    report.issues.push(PipelineIssue::raise(
                        Stage::Transform,
                        model_index,
                        None,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            let hatching =
                self.hatch_model(model_index, &sliced, cancel, progress, &mut report.issues)?;
            report.models.push(ModelResult {
                model_index,
                sliced,
                hatching,
            });
        }

        progress.report(models.len(), models.len(), "Done");
        tracing::info!(
            models = report.models.len(),
            issues = report.issues.len(),
            "pipeline run finished"
        );
        Ok(report)
    }

    /// Place a model, slice it in chunks and group the layers into sections.
    pub fn slice_model(
        &self,
        model_index: usize,
        model: &ModelInput,
        cancel: &CancelToken,
        progress: &Progress,
        issues: &mut Vec<PipelineIssue>,
    ) -> Result<SlicedModel> {
        self.settings.validate()?;
        let world = WorldMesh::from_mesh(&model.mesh, &model.transform, self.settings.build_surface_y)?;
        let plan = LayerPlan::for_mesh(&world, self.settings.layer_thickness)?;
        let triangles = SliceTriangles::new(&world)?;

        let mut layers = Vec::with_capacity(plan.count);
        for start in (0..plan.count).step_by(LAYER_CHUNK) {
            cancel.check()?;
            let end = (start + LAYER_CHUNK).min(plan.count);
            layers.extend(triangles.slice_range(&plan, start..end));
            progress.report(end, plan.count, format!("Slicing layer {end}/{}", plan.count));
        }

        for layer in layers.iter().filter(|l| l.defects > 0) {
            issues.push(PipelineIssue::raise(
                Stage::Slice,
                model_index,
                Some(layer.layer_index),
                format!("{} triangle(s) produced an invalid plane intersection", layer.defects),
            ));
        }

        let sections = group_sections(&layers, self.settings.section_tolerance);
        tracing::info!(
            model_index,
            layers = layers.len(),
            sections = sections.len(),
            "sliced model"
        );

        Ok(SlicedModel {
            world_bounds: world.bounds,
            plan,
            layers,
            sections,
        })
    }

    /// Rebuild contours once per section and hatch every layer of it.
    ///
    /// Panics inside a section are caught and reported; the remaining
    /// sections are still hatched.
    pub fn hatch_model(
        &self,
        model_index: usize,
        sliced: &SlicedModel,
        cancel: &CancelToken,
        progress: &Progress,
        issues: &mut Vec<PipelineIssue>,
    ) -> Result<LayerHatching> {
        let mut hatching = LayerHatching::new();

        if let Err(e) = self.params.validate() {
            issues.push(PipelineIssue::raise(Stage::Hatch, model_index, None, e.to_string()));
            return Ok(hatching);
        }

        let total = sliced.plan.count;
        for section in &sliced.sections {
            cancel.check()?;

            match catch_unwind(AssertUnwindSafe(|| self.hatch_section(section))) {
                Ok(Ok(done)) => {
                    if done.open_chains > 0 {
                        issues.push(PipelineIssue::raise(
                            Stage::Contours,
                            model_index,
                            Some(section.start_layer),
                            format!(
                                "{} open contour chain(s) in layers {}-{}",
                                done.open_chains, section.start_layer, section.end_layer
                            ),
                        ));
                    }
                    hatching.extend(done.layers);
                }
                Ok(Err(e)) => return Err(e),
                Err(payload) => {
                    issues.push(PipelineIssue::raise(
                        Stage::Hatch,
                        model_index,
                        Some(section.start_layer),
                        format!(
                            "hatching layers {}-{} panicked: {}",
                            section.start_layer,
                            section.end_layer,
                            panic_message(payload.as_ref())
                        ),
                    ));
                }
            }

            progress.report(
                section.end_layer + 1,
                total,
                format!("Generated hatching for layer {}/{total}", section.end_layer + 1),
            );
        }

        Ok(hatching)
    }

    fn hatch_section(&self, section: &Section) -> Result<SectionHatching> {
        let rebuilt = build_contours(&section.segments, self.settings.point_quantum);
        let islands = group_islands(&rebuilt.contours);

        let mut by_key: HashMap<u64, Vec<HatchLine>> = HashMap::new();
        let mut layers = Vec::with_capacity(section.layer_count());
        for layer in section.layers() {
            let key = self.engine.reuse_key(self.pattern, &self.params, layer)?;
            let lines = match key.and_then(|k| by_key.get(&k)) {
                Some(template) => template
                    .iter()
                    .map(|l| HatchLine {
                        layer_index: layer,
                        ..*l
                    })
                    .collect(),
                None => {
                    let lines =
                        self.engine
                            .generate_islands(self.pattern, &islands, &self.params, layer)?;
                    if let Some(k) = key {
                        by_key.insert(k, lines.clone());
                    }
                    lines
                }
            };
            layers.push((layer, lines));
        }

        tracing::debug!(
            start = section.start_layer,
            end = section.end_layer,
            islands = islands.len(),
            variants = by_key.len(),
            "hatched section"
        );

        Ok(SectionHatching {
            layers,
            open_chains: rebuilt.open_chains.len(),
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
