use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file {0} does not exist")]
    Missing(PathBuf),
    #[error("model {name} not found; pass --model or place it in {cache_dir}")]
    NotFound { name: String, cache_dir: PathBuf },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Locates an ONNX model.
///
/// Resolution order:
/// 1. `explicit` path, which must exist
/// 2. `<model cache dir>/<name>`
///
/// Models are never downloaded.
pub fn resolve(name: &str, explicit: Option<&Path>) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::Missing(path.to_path_buf()))
        };
    }
    resolve_in(name, &model_cache_dir()?)
}

fn resolve_in(name: &str, cache_dir: &Path) -> Result<PathBuf, ModelResolveError> {
    let cached = cache_dir.join(name);
    if cached.is_file() {
        log::debug!("Using cached model {}", cached.display());
        return Ok(cached);
    }
    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        cache_dir: cache_dir.to_path_buf(),
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/ShelfWatch/models/`
/// - Linux: `$XDG_CACHE_HOME/ShelfWatch/models/` or `~/.cache/ShelfWatch/models/`
/// - Windows: `%LOCALAPPDATA%/ShelfWatch/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("ShelfWatch").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("custom.onnx");
        std::fs::write(&model, b"onnx").unwrap();
        assert_eq!(resolve("yolov8n.onnx", Some(&model)).unwrap(), model);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let err = resolve("yolov8n.onnx", Some(Path::new("/nonexistent/m.onnx"))).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(_)));
    }

    #[test]
    fn test_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yolov8n.onnx"), b"onnx").unwrap();
        assert_eq!(
            resolve_in("yolov8n.onnx", dir.path()).unwrap(),
            dir.path().join("yolov8n.onnx")
        );
    }

    #[test]
    fn test_cache_miss_names_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in("yolov8n.onnx", dir.path()).unwrap_err();
        assert!(err.to_string().contains("yolov8n.onnx"));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn test_cache_dir_ends_with_app_models() {
        if let Ok(dir) = model_cache_dir() {
            assert!(dir.ends_with("ShelfWatch/models"));
        }
    }
}
