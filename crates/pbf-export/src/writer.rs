//! Pluggable layer record serializers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pbf_hatch::HatchingParameters;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::record::LayerRecord;

/// Version written into JSON documents.
pub const FORMAT_VERSION: u32 = 1;

/// Build-wide values written alongside the layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportMetadata {
    /// Layer thickness (mm).
    pub layer_thickness: f64,
    /// Speed of non-scanning moves (mm/s).
    pub jump_speed: f64,
    /// Beam off during jumps.
    pub skywriting: bool,
}

impl ExportMetadata {
    /// Metadata for a build sliced at `layer_thickness` and hatched with `params`.
    pub fn from_parameters(layer_thickness: f64, params: &HatchingParameters) -> Self {
        Self {
            layer_thickness,
            jump_speed: params.jump_speed,
            skywriting: params.enable_skywriting,
        }
    }
}

/// Serializes layer records to a byte stream.
pub trait LayerWriter {
    /// Short format name, e.g. `"json"`.
    fn format_name(&self) -> &str;

    /// Write `records` to `out`.
    fn write_layers(
        &self,
        records: &[LayerRecord],
        metadata: &ExportMetadata,
        out: &mut dyn Write,
    ) -> Result<()>;

    /// Write `records` to a file, creating or truncating it.
    fn write_to_path(
        &self,
        records: &[LayerRecord],
        metadata: &ExportMetadata,
        path: &Path,
    ) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_layers(records, metadata, &mut out)?;
        out.flush()?;
        tracing::info!(path = %path.display(), layers = records.len(), format = self.format_name(), "wrote layer records");
        Ok(())
    }
}

/// On-disk shape of a JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    /// See [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Layer thickness (mm).
    pub layer_thickness: f64,
    /// Speed of non-scanning moves (mm/s).
    pub jump_speed: f64,
    /// Beam off during jumps.
    pub skywriting: bool,
    /// Layer records, ordered by layer index.
    pub layers: Vec<LayerRecord>,
}

/// Writes records as a single JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLayerWriter {
    /// Indent the output.
    pub pretty: bool,
}

impl LayerWriter for JsonLayerWriter {
    fn format_name(&self) -> &str {
        "json"
    }

    fn write_layers(
        &self,
        records: &[LayerRecord],
        metadata: &ExportMetadata,
        out: &mut dyn Write,
    ) -> Result<()> {
        if !metadata.layer_thickness.is_finite() || metadata.layer_thickness <= 0.0 {
            return Err(ExportError::InvalidSettings(format!(
                "layer_thickness must be positive, got {}",
                metadata.layer_thickness
            )));
        }

        let document = JsonDocument {
            format_version: FORMAT_VERSION,
            layer_thickness: metadata.layer_thickness,
            jump_speed: metadata.jump_speed,
            skywriting: metadata.skywriting,
            layers: records.to_vec(),
        };
        if self.pretty {
            serde_json::to_writer_pretty(out, &document)?;
        } else {
            serde_json::to_writer(out, &document)?;
        }
        Ok(())
    }
}
