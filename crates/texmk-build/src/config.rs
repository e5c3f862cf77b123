use crate::request::{CompileRequest, PdfEngine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project defaults read from `texmk.json`.
///
/// Every field is optional; anything left unset falls back to the
/// [`CompileRequest`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub output_dir: Option<PathBuf>,
    pub tex_input_dir: Option<PathBuf>,
    pub engine: PdfEngine,
    pub min_runs: Option<u32>,
    pub max_runs: Option<u32>,
    pub auto_install: Option<bool>,
    pub quiet: Option<bool>,
    pub clean: Option<bool>,
}

impl BuildConfig {
    pub const FILE_NAME: &'static str = "texmk.json";

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Loads `texmk.json` from `dir` if there is one.
    pub fn discover(dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(Self::FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        log::debug!("Using configuration from {}", path.display());
        Self::load(&path).map(Some)
    }

    /// Builds the request for `input` from these defaults.
    pub fn into_request(self, input: impl Into<PathBuf>) -> CompileRequest {
        let mut request = CompileRequest::new(input).with_engine(self.engine);
        request.output_dir = self.output_dir;
        request.tex_input_dir = self.tex_input_dir;
        if let Some(min_runs) = self.min_runs {
            request.min_runs = min_runs;
        }
        if let Some(max_runs) = self.max_runs {
            request.max_runs = max_runs;
        }
        if let Some(auto_install) = self.auto_install {
            request.auto_install = auto_install;
        }
        request.quiet = self.quiet.unwrap_or(false);
        request.clean = self.clean.unwrap_or(false);
        request
    }
}
