use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{HenkanError, Result};
use crate::formats::Container;

/// What to do when the output path already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputPolicy {
    /// Append a `_YYYYmmdd_HHMMSS` suffix
    #[default]
    Rename,
    Overwrite,
    Refuse,
}

/// `<dir>/<input stem>.<target extension>`, where `dir` defaults to the
/// input's own directory.
pub fn default_output_path(input: &Path, target: Container, output_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        HenkanError::Validation(format!("Cannot derive an output name from {}", input.display()))
    })?;

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(target.extension());
    Ok(dir.join(file_name))
}

/// Settle on the path the encoder will write to.
///
/// Creates the parent directory and applies `policy` when `requested`
/// already exists.
pub fn resolve_output(input: &Path, requested: PathBuf, policy: OutputPolicy) -> Result<PathBuf> {
    if same_file(&requested, input) {
        return Err(HenkanError::Validation(format!(
            "Output path must differ from the input: {}",
            requested.display()
        )));
    }

    if let Some(parent) = requested.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating output directory {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    if !requested.exists() {
        return Ok(requested);
    }

    match policy {
        OutputPolicy::Overwrite => {
            info!("Overwriting {}", requested.display());
            Ok(requested)
        }
        OutputPolicy::Refuse => Err(HenkanError::Validation(format!(
            "Output already exists: {}",
            requested.display()
        ))),
        OutputPolicy::Rename => {
            let renamed = timestamped_path(&requested, Local::now());
            info!(
                "{} exists, writing {} instead",
                requested.display(),
                renamed.display()
            );
            Ok(renamed)
        }
    }
}

/// Like [`resolve_output`], for a path derived by [`default_output_path`].
///
/// A same-format target derives the input's own path. Under
/// [`OutputPolicy::Rename`] that collision gets a timestamped name instead
/// of an error.
pub fn resolve_default_output(input: &Path, derived: PathBuf, policy: OutputPolicy) -> Result<PathBuf> {
    if policy == OutputPolicy::Rename && same_file(&derived, input) {
        let renamed = timestamped_path(&derived, Local::now());
        info!(
            "{} is the input, writing {} instead",
            derived.display(),
            renamed.display()
        );
        return Ok(renamed);
    }
    resolve_output(input, derived, policy)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn timestamped_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let base = format!("{}_{}", stem, now.format("%Y%m%d_%H%M%S"));

    let mut candidate = path.with_file_name(format!("{}{}", base, extension));
    let mut counter = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{}_{}{}", base, counter, extension));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use chrono::TimeZone;

    #[test]
    fn test_default_output_next_to_input() {
        let path = default_output_path(Path::new("/videos/holiday.MOV"), Container::Mp4, None).unwrap();
        assert_eq!(path, PathBuf::from("/videos/holiday.mp4"));
    }

    #[test]
    fn test_default_output_in_directory() {
        let path = default_output_path(
            Path::new("/videos/holiday.mov"),
            Container::Mp3,
            Some(Path::new("/music")),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/music/holiday.mp3"));
    }

    #[test]
    fn test_output_equal_to_input_is_refused() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("clip.mp4");
        input.touch().unwrap();

        let result = resolve_output(input.path(), input.path().to_path_buf(), OutputPolicy::Overwrite);
        assert!(matches!(result, Err(HenkanError::Validation(_))));
    }

    #[test]
    fn test_derived_path_equal_to_input_is_renamed() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("clip.mp4");
        input.touch().unwrap();
        let derived = default_output_path(input.path(), Container::Mp4, None).unwrap();

        let resolved = resolve_default_output(input.path(), derived.clone(), OutputPolicy::Rename).unwrap();
        assert_ne!(resolved, input.path());
        assert_eq!(resolved.parent(), Some(temp.path()));
        let name = resolved.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("clip_"));
        assert!(name.ends_with(".mp4"));

        let overwrite = resolve_default_output(input.path(), derived, OutputPolicy::Overwrite);
        assert!(matches!(overwrite, Err(HenkanError::Validation(_))));
    }

    #[test]
    fn test_equal_paths_are_compared_after_resolution() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("clip.mp4");
        input.touch().unwrap();
        let dotted = temp.path().join(".").join("clip.mp4");

        let result = resolve_output(input.path(), dotted, OutputPolicy::Overwrite);
        assert!(matches!(result, Err(HenkanError::Validation(_))));
    }

    #[test]
    fn test_missing_directories_are_created() {
        let temp = TempDir::new().unwrap();
        let requested = temp.child("a/b/clip.mkv");

        let resolved = resolve_output(
            Path::new("/in/clip.mp4"),
            requested.path().to_path_buf(),
            OutputPolicy::Rename,
        )
        .unwrap();
        assert_eq!(resolved, requested.path());
        assert!(temp.child("a/b").path().is_dir());
    }

    #[test]
    fn test_existing_output_policies() {
        let temp = TempDir::new().unwrap();
        let existing = temp.child("clip.mkv");
        existing.write_str("old").unwrap();
        let input = Path::new("/in/clip.mp4");

        let kept = resolve_output(input, existing.path().to_path_buf(), OutputPolicy::Overwrite).unwrap();
        assert_eq!(kept, existing.path());

        let refused = resolve_output(input, existing.path().to_path_buf(), OutputPolicy::Refuse);
        assert!(matches!(refused, Err(HenkanError::Validation(_))));

        let renamed = resolve_output(input, existing.path().to_path_buf(), OutputPolicy::Rename).unwrap();
        assert_ne!(renamed, existing.path());
        let name = renamed.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("clip_"));
        assert!(name.ends_with(".mkv"));
    }

    #[test]
    fn test_timestamp_suffix_and_counter() {
        let temp = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().unwrap();
        let path = temp.child("clip.mp4");

        let first = timestamped_path(path.path(), now);
        assert_eq!(first.file_name().unwrap(), "clip_20240309_140507.mp4");

        std::fs::write(&first, b"x").unwrap();
        let second = timestamped_path(path.path(), now);
        assert_eq!(second.file_name().unwrap(), "clip_20240309_140507_1.mp4");
    }
}
