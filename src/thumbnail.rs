//! Thumbnails of saved previews.
//!
//! Conversion is delegated to ImageMagick's `convert`, called as
//!
//! ```text
//! convert <saved> -thumbnail x144 <saved stem>_thumb.<ext>
//! ```
//!
//! which scales to 144 px high and keeps the aspect ratio.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ConfigError, ThumbnailError};

/// ImageMagick geometry: 144 px high, width follows.
const THUMBNAIL_GEOMETRY: &str = "x144";

const THUMBNAIL_SUFFIX: &str = "_thumb";

/// Capability to turn one image file into a smaller one.
pub trait Thumbnailer {
    fn thumbnail(&self, input: &Path, output: &Path) -> Result<(), ThumbnailError>;
}

/// What [`generate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    Created(PathBuf),
    /// Thumbnails are switched off.
    Skipped,
}

/// Produce the thumbnail for `saved` if `enabled`.
///
/// The saved image itself is never touched, whatever the outcome.
pub fn generate(
    thumbnailer: &dyn Thumbnailer,
    saved: &Path,
    enabled: bool,
) -> Result<ThumbnailOutcome, ThumbnailError> {
    if !enabled {
        return Ok(ThumbnailOutcome::Skipped);
    }
    let output = thumbnail_path(saved);
    thumbnailer.thumbnail(saved, &output)?;
    Ok(ThumbnailOutcome::Created(output))
}

/// `dir/name.ext` becomes `dir/name_thumb.ext`.
pub fn thumbnail_path(saved: &Path) -> PathBuf {
    let stem = saved.file_stem().unwrap_or_default().to_string_lossy();
    let name = match saved.extension() {
        Some(ext) => format!("{stem}{THUMBNAIL_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{THUMBNAIL_SUFFIX}"),
    };
    saved.with_file_name(name)
}

/// Runs ImageMagick's `convert` (or a compatible program).
#[derive(Debug, Clone)]
pub struct ConvertThumbnailer {
    program: String,
}

impl ConvertThumbnailer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Make sure the program can be started, by running `<program> -version`.
    pub fn check_available(&self) -> Result<(), ConfigError> {
        let unavailable = |reason: String| ConfigError::ConvertUnavailable {
            program: self.program.clone(),
            reason,
        };

        let status = Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| unavailable(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(unavailable(format!("`-version` exited with {status}")))
        }
    }
}

impl Thumbnailer for ConvertThumbnailer {
    fn thumbnail(&self, input: &Path, output: &Path) -> Result<(), ThumbnailError> {
        let result = Command::new(&self.program)
            .arg(input)
            .args(["-thumbnail", THUMBNAIL_GEOMETRY])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ThumbnailError::NotFound {
                    program: self.program.clone(),
                })
            }
            Err(source) => {
                return Err(ThumbnailError::Io {
                    program: self.program.clone(),
                    source,
                })
            }
        };

        if !out.status.success() {
            return Err(ThumbnailError::Failed {
                program: self.program.clone(),
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records calls instead of running anything.
    #[derive(Default)]
    struct RecordingThumbnailer {
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl Thumbnailer for RecordingThumbnailer {
        fn thumbnail(&self, input: &Path, output: &Path) -> Result<(), ThumbnailError> {
            self.calls
                .borrow_mut()
                .push((input.to_path_buf(), output.to_path_buf()));
            Ok(())
        }
    }

    const MISSING_PROGRAM: &str = "ttv-snap-test-no-such-convert";

    #[test]
    fn thumbnail_path_appends_suffix_before_extension() {
        assert_eq!(
            thumbnail_path(Path::new("/out/2024-01-01/2024-01-01_12-00-00.jpg")),
            PathBuf::from("/out/2024-01-01/2024-01-01_12-00-00_thumb.jpg")
        );
        assert_eq!(
            thumbnail_path(Path::new("out/shot")),
            PathBuf::from("out/shot_thumb")
        );
    }

    #[test]
    fn disabled_never_invokes_thumbnailer() {
        let stub = RecordingThumbnailer::default();
        let outcome = generate(&stub, Path::new("out/a.jpg"), false).unwrap();

        assert_eq!(outcome, ThumbnailOutcome::Skipped);
        assert!(stub.calls.borrow().is_empty());
    }

    #[test]
    fn enabled_invokes_once_with_derived_output() {
        let stub = RecordingThumbnailer::default();
        let outcome = generate(&stub, Path::new("out/a.jpg"), true).unwrap();

        assert_eq!(outcome, ThumbnailOutcome::Created(PathBuf::from("out/a_thumb.jpg")));
        assert_eq!(
            *stub.calls.borrow(),
            vec![(PathBuf::from("out/a.jpg"), PathBuf::from("out/a_thumb.jpg"))]
        );
    }

    #[test]
    fn missing_program_is_not_found() {
        let convert = ConvertThumbnailer::new(MISSING_PROGRAM);
        let err = convert
            .thumbnail(Path::new("in.jpg"), Path::new("out.jpg"))
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn missing_program_fails_availability_check() {
        let err = ConvertThumbnailer::new(MISSING_PROGRAM)
            .check_available()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConvertUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_failure() {
        let err = ConvertThumbnailer::new("false")
            .thumbnail(Path::new("in.jpg"), Path::new("out.jpg"))
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Failed { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        ConvertThumbnailer::new("true")
            .thumbnail(Path::new("in.jpg"), Path::new("out.jpg"))
            .unwrap();
        ConvertThumbnailer::new("true").check_available().unwrap();
    }
}
