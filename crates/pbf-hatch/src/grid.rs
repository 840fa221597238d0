//! Cross hatching.

use pbf_slicer::Polygon;

use crate::lines::parallel_infill;
use crate::region::Region;
use crate::strategy::{
    accept, effective_angle, emit_contours, finish, HatchLine, HatchStrategy, HatchingParameters,
};

/// Two perpendicular sets of parallel lines per layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridHatching;

impl HatchStrategy for GridHatching {
    fn name(&self) -> &str {
        "Grid Hatching"
    }

    fn description(&self) -> &str {
        "Crossed scan lines at the effective angle and 90 degrees to it"
    }

    fn generate(
        &self,
        contours: &[Polygon],
        params: &HatchingParameters,
        layer_index: usize,
    ) -> Vec<HatchLine> {
        if !accept(params, self.name()) {
            return Vec::new();
        }
        let Some(region) = Region::from_contours(contours) else {
            return Vec::new();
        };

        let mut lines = emit_contours(contours, params, layer_index);

        let angle = effective_angle(params.hatch_angle, layer_index, params.layer_rotation);
        if let Some(infill) = region.eroded(params.infill_erosion()) {
            lines.extend(parallel_infill(&infill, params, angle, layer_index));
            lines.extend(parallel_infill(&infill, params, angle + 90.0, layer_index));
        }

        finish(lines, params)
    }
}
