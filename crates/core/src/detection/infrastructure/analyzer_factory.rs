use std::path::Path;

use thiserror::Error;

use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::shared::constants::{
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use crate::shared::device::Device;

use super::model_resolver::{self, ModelSpec};
use super::onnx_face_analyzer::OnnxFaceAnalyzer;

pub const DETECTOR_MODEL: ModelSpec = ModelSpec {
    name: DETECTOR_MODEL_NAME,
    url: DETECTOR_MODEL_URL,
};

pub const EMBEDDING_MODEL: ModelSpec = ModelSpec {
    name: EMBEDDING_MODEL_NAME,
    url: EMBEDDING_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("face analyzer unavailable: {0}")]
    OracleUnavailable(String),
}

/// Download progress: `(model_name, bytes_downloaded, total_bytes)`.
pub type DownloadProgress = fn(&str, u64, u64);

/// Creates the ONNX face analyzer, failing fast if either model cannot be
/// resolved or loaded.
///
/// This is the only startup check for the backend: callers get a working
/// analyzer or an [`AnalyzerError::OracleUnavailable`] naming what is missing.
pub fn create_analyzer(
    device: Device,
    confidence: f64,
    bundled_dir: Option<&Path>,
    on_download: Option<DownloadProgress>,
) -> Result<Box<dyn FaceAnalyzer>, AnalyzerError> {
    let detector_path = resolve_model(&DETECTOR_MODEL, bundled_dir, on_download)?;
    let embedder_path = resolve_model(&EMBEDDING_MODEL, bundled_dir, on_download)?;

    log::info!(
        "Loading face models {} and {} on {device}",
        DETECTOR_MODEL.name,
        EMBEDDING_MODEL.name
    );
    let analyzer = OnnxFaceAnalyzer::new(&detector_path, &embedder_path, device, confidence)
        .map_err(|e| AnalyzerError::OracleUnavailable(format!("failed to load models: {e}")))?;
    Ok(Box::new(analyzer))
}

fn resolve_model(
    model: &ModelSpec,
    bundled_dir: Option<&Path>,
    on_download: Option<DownloadProgress>,
) -> Result<std::path::PathBuf, AnalyzerError> {
    let name = model.name;
    let progress = on_download.map(|cb| -> model_resolver::ProgressFn {
        Box::new(move |done: u64, total: u64| cb(name, done, total))
    });
    model_resolver::resolve(model, bundled_dir, progress)
        .map_err(|e| AnalyzerError::OracleUnavailable(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_specs_point_at_onnx_files() {
        assert!(DETECTOR_MODEL.name.ends_with(".onnx"));
        assert!(EMBEDDING_MODEL.name.ends_with(".onnx"));
        assert!(EMBEDDING_MODEL.url.ends_with(EMBEDDING_MODEL.name));
        assert!(DETECTOR_MODEL.url.ends_with(DETECTOR_MODEL.name));
    }

    #[test]
    fn test_error_message_names_condition() {
        let err = AnalyzerError::OracleUnavailable("w600k_r50.onnx: missing".into());
        assert_eq!(
            err.to_string(),
            "face analyzer unavailable: w600k_r50.onnx: missing"
        );
    }
}
