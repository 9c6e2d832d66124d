//! Whisper model catalog and path resolution.
//!
//! The five standard OpenAI Whisper GGML sizes are the only valid values
//! for `whisper.model`; [`ModelSize`] is the canonical parser.
//! [`ModelPaths`] resolves the on-disk location of a model file given the
//! application's models directory.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// ModelSize
// ---------------------------------------------------------------------------

/// The five standard Whisper GGML model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    /// ~75 MB file / ~390 MB RAM — fastest, lowest accuracy.
    Tiny,
    /// ~142 MB file / ~500 MB RAM — good default for dictation.
    Base,
    /// ~466 MB file / ~1 GB RAM.
    Small,
    /// ~1.5 GB file / ~2.6 GB RAM.
    Medium,
    /// ~2.9 GB file / ~4.7 GB RAM — highest accuracy, slowest.
    Large,
}

/// All sizes, smallest first.
pub const ALL_SIZES: &[ModelSize] = &[
    ModelSize::Tiny,
    ModelSize::Base,
    ModelSize::Small,
    ModelSize::Medium,
    ModelSize::Large,
];

/// Returned when a string names no known model size.
#[derive(Debug, Error)]
#[error("unknown whisper model size: {0:?}")]
pub struct ParseModelError(pub String);

impl ModelSize {
    /// Canonical configuration name (`"tiny"` … `"large"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }

    /// GGML file name under the models directory (e.g. `"ggml-base.bin"`).
    pub fn file_name(&self) -> String {
        format!("ggml-{}.bin", self.as_str())
    }

    /// Approximate GGML file size in megabytes.
    pub fn file_size_mb(&self) -> u64 {
        match self {
            ModelSize::Tiny => 75,
            ModelSize::Base => 142,
            ModelSize::Small => 466,
            ModelSize::Medium => 1_500,
            ModelSize::Large => 2_900,
        }
    }

    /// Approximate RAM needed to run inference, in megabytes.
    pub fn ram_required_mb(&self) -> u64 {
        match self {
            ModelSize::Tiny => 390,
            ModelSize::Base => 500,
            ModelSize::Small => 1_000,
            ModelSize::Medium => 2_600,
            ModelSize::Large => 4_700,
        }
    }

    /// Source repository for the GGML files.
    pub fn source_url(&self) -> &'static str {
        "https://huggingface.co/ggerganov/whisper.cpp"
    }
}

impl std::str::FromStr for ModelSize {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(ParseModelError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
///
/// ```rust,no_run
/// use speaktype::config::AppPaths;
/// use speaktype::stt::{ModelPaths, ModelSize};
///
/// let paths = ModelPaths::from_app_paths(&AppPaths::new());
/// if !paths.is_available(ModelSize::Base) {
///     eprintln!("download ggml-base.bin into {}", paths.models_dir.display());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Build a [`ModelPaths`] from the application's [`AppPaths`].
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    /// Construct directly from a models directory path (useful in tests).
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model size.
    pub fn model_path(&self, size: ModelSize) -> PathBuf {
        self.models_dir.join(size.file_name())
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, size: ModelSize) -> bool {
        self.model_path(size).exists()
    }

    /// All sizes whose GGML file is present on disk.
    pub fn list_local_models(&self) -> Vec<ModelSize> {
        ALL_SIZES
            .iter()
            .copied()
            .filter(|s| self.is_available(*s))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_five_sizes_parse() {
        for name in ["tiny", "base", "small", "medium", "large"] {
            let size: ModelSize = name.parse().expect("should parse");
            assert_eq!(size.as_str(), name);
        }
    }

    #[test]
    fn unknown_size_fails_to_parse() {
        let err = "huge".parse::<ModelSize>().unwrap_err();
        assert!(err.to_string().contains("huge"));
    }

    #[test]
    fn file_names_follow_ggml_convention() {
        assert_eq!(ModelSize::Tiny.file_name(), "ggml-tiny.bin");
        assert_eq!(ModelSize::Large.file_name(), "ggml-large.bin");
    }

    #[test]
    fn sizes_are_ordered_smallest_first() {
        let mbs: Vec<u64> = ALL_SIZES.iter().map(|s| s.file_size_mb()).collect();
        let mut sorted = mbs.clone();
        sorted.sort_unstable();
        assert_eq!(mbs, sorted);
    }

    #[test]
    fn model_paths_non_existent_returns_false() {
        let mp = ModelPaths::new("/nonexistent/path");
        assert!(!mp.is_available(ModelSize::Base));
        assert!(mp.list_local_models().is_empty());
    }

    #[test]
    fn model_path_joins_file_name() {
        let mp = ModelPaths::new("/models");
        let p = mp.model_path(ModelSize::Medium);
        assert!(p.to_str().unwrap().ends_with("ggml-medium.bin"));
    }
}
