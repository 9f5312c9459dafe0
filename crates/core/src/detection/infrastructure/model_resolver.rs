use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Overrides the model cache directory when set.
pub const MODEL_DIR_ENV: &str = "FACE_EXTRACT_MODEL_DIR";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create model directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine model directory")]
    NoCacheDir,
}

/// A model file and where to fetch it from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub url: &'static str,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Locates `model` on disk, downloading it into the model directory if no
/// copy exists yet.
///
/// Lookup order: model directory, then `bundled_dir`, then download.
pub fn resolve(
    model: &ModelSpec,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_dir()?, model, bundled_dir, progress)
}

fn resolve_in(
    model_dir: &Path,
    model: &ModelSpec,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = model_dir.join(model.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(bundled_path) = bundled_dir
        .map(|dir| dir.join(model.name))
        .filter(|p| p.exists())
    {
        return Ok(bundled_path);
    }

    fs::create_dir_all(model_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {}", model.name, model.url);
    download(model.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Directory models are cached in.
///
/// `$FACE_EXTRACT_MODEL_DIR` if set, otherwise a platform directory:
/// - macOS: `~/Library/Application Support/FaceExtract/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceExtract/models/` or `~/.cache/FaceExtract/models/`
/// - Windows: `%LOCALAPPDATA%/FaceExtract/models/`
pub fn model_dir() -> Result<PathBuf, ModelResolveError> {
    if let Some(dir) = std::env::var_os(MODEL_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();
    base.map(|d| d.join("FaceExtract").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = download_inner(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    // Stream in chunks; the embedding model alone is well over 100MB.
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_MODEL: ModelSpec = ModelSpec {
        name: "test_model.onnx",
        url: "http://invalid.nonexistent.example.com/model.onnx",
    };

    #[test]
    fn test_resolve_prefers_model_dir() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join(TEST_MODEL.name);
        fs::write(&cached, b"cached").unwrap();

        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join(TEST_MODEL.name), b"bundled").unwrap();

        let path = resolve_in(tmp.path(), &TEST_MODEL, Some(&bundled), None).unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn test_resolve_falls_back_to_bundled() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join(TEST_MODEL.name), b"bundled").unwrap();

        let path = resolve_in(&tmp.path().join("cache"), &TEST_MODEL, Some(&bundled), None).unwrap();
        assert_eq!(path, bundled.join(TEST_MODEL.name));
    }

    #[test]
    fn test_resolve_unreachable_download_fails_cleanly() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let result = resolve_in(&cache, &TEST_MODEL, None, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!cache.join(TEST_MODEL.name).exists());
        assert!(!cache.join("test_model.part").exists());
    }

    #[test]
    fn test_model_dir_names_app() {
        if std::env::var_os(MODEL_DIR_ENV).is_some() {
            return;
        }
        let path = model_dir().unwrap();
        assert!(path.to_string_lossy().contains("FaceExtract"));
        assert!(path.ends_with("models"));
    }
}
